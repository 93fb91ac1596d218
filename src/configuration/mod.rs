use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

mod error;
pub mod watcher;

use crate::authc::strategy::StrategyKind;
use crate::realm::RealmConfig;
pub use error::Error;

#[derive(Clone, Debug, Deserialize)]
pub struct Configuration {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default, rename = "realm")]
    pub realms: Vec<RealmConfig>, // ordered: realms are consulted in file order
    #[serde(default)]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "GlobalConfig::default_worker_threads")]
    pub worker_threads: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        GlobalConfig {
            strategy: StrategyKind::default(),
            worker_threads: GlobalConfig::default_worker_threads(),
        }
    }
}

impl GlobalConfig {
    fn default_worker_threads() -> usize {
        4
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: Option<TracingConfig>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TracingConfig {
    pub endpoint: String,
    pub sampling_rate: f64,
}

impl Configuration {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let config_str = fs::read_to_string(path)?;
        Self::load_from_str(&config_str)
    }

    pub fn load_from_str(slice: &str) -> Result<Self, Error> {
        let config: Configuration = toml::from_str(slice).map_err(|e| {
            println!("Configuration file format error:");
            println!("{e}");
            Error::ConfigurationFileFormat(e.to_string())
        })?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.global.worker_threads == 0 {
            return Err(Error::ConfigurationFileFormat(
                "global.worker_threads must be at least 1".to_string(),
            ));
        }

        if self.realms.is_empty() {
            return Err(Error::InvalidRealm(
                "At least one [[realm]] section is required".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for realm in &self.realms {
            realm.validate()?;
            if !names.insert(realm.name()) {
                return Err(Error::InvalidRealm(format!(
                    "Duplicate realm name '{}'",
                    realm.name()
                )));
            }
        }

        Ok(())
    }

    /// Certificate and key files referenced by webhook realms.
    pub fn tls_paths(&self) -> Vec<PathBuf> {
        self.realms
            .iter()
            .filter_map(|realm| match realm {
                RealmConfig::Webhook(config) => Some(config.tls_paths().cloned()),
                RealmConfig::Memory(_) => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_minimal_config() {
        let config = r#"
        [[realm]]
        name = "local"
        type = "memory"
        "#;

        let config = Configuration::load_from_str(config).unwrap();

        assert_eq!(config.global.strategy, StrategyKind::AtLeastOneSuccessful);
        assert_eq!(config.global.worker_threads, 4);
        assert_eq!(config.realms.len(), 1);
        assert_eq!(config.realms[0].name(), "local");
        assert!(config.observability.is_none());
        assert!(config.tls_paths().is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let config = r#"
        [global]
        strategy = "all_successful"
        worker_threads = 2

        [[realm]]
        name = "local"
        type = "memory"

        [realm.users.alice]
        password = "$argon2id$v=19$m=19456,t=2,p=1$9pxWwg0VtZzDXno/25417Q$e+cuKy9VisJVxec/EEuKvvfIIIOy5yDGRzYKiuDLjx0"
        roles = ["admin"]

        [realm.roles.admin]
        permissions = ["registry:*"]

        [[realm]]
        name = "corp"
        type = "webhook"
        url = "https://auth.example.com/verify"
        timeout_ms = 2000
        server_ca_bundle = "/etc/realmgate/ca.pem"

        [observability.tracing]
        endpoint = "http://otel:4317"
        sampling_rate = 0.5
        "#;

        let config = Configuration::load_from_str(config).unwrap();

        assert_eq!(config.global.strategy, StrategyKind::AllSuccessful);
        assert_eq!(config.global.worker_threads, 2);

        let names: Vec<_> = config.realms.iter().map(RealmConfig::name).collect();
        assert_eq!(names, vec!["local", "corp"]);

        match &config.realms[0] {
            RealmConfig::Memory(memory) => {
                assert!(memory.users.contains_key("alice"));
                assert!(memory.roles.contains_key("admin"));
            }
            RealmConfig::Webhook(_) => panic!("Expected memory realm first"),
        }

        match &config.realms[1] {
            RealmConfig::Webhook(webhook) => assert_eq!(webhook.timeout_ms, 2000),
            RealmConfig::Memory(_) => panic!("Expected webhook realm second"),
        }

        assert_eq!(
            config.tls_paths(),
            vec![PathBuf::from("/etc/realmgate/ca.pem")]
        );

        let tracing = config.observability.unwrap().tracing.unwrap();
        assert_eq!(tracing.endpoint, "http://otel:4317");
    }

    #[test]
    fn test_load_rejects_missing_realms() {
        let result = Configuration::load_from_str("[global]\nstrategy = \"first_successful\"\n");
        assert!(matches!(result, Err(Error::InvalidRealm(_))));
    }

    #[test]
    fn test_load_rejects_zero_worker_threads() {
        let config = r#"
        [global]
        worker_threads = 0

        [[realm]]
        name = "local"
        type = "memory"
        "#;

        let result = Configuration::load_from_str(config);
        assert!(matches!(result, Err(Error::ConfigurationFileFormat(_))));
    }

    #[test]
    fn test_load_rejects_duplicate_realm_names() {
        let config = r#"
        [[realm]]
        name = "local"
        type = "memory"

        [[realm]]
        name = "local"
        type = "webhook"
        url = "https://auth.example.com/verify"
        "#;

        let result = Configuration::load_from_str(config);
        assert!(matches!(result, Err(Error::InvalidRealm(_))));
    }

    #[test]
    fn test_load_rejects_incomplete_client_certificate() {
        let config = r#"
        [[realm]]
        name = "corp"
        type = "webhook"
        url = "https://auth.example.com/verify"
        client_certificate_bundle = "/cert.pem"
        "#;

        let result = Configuration::load_from_str(config);
        assert!(matches!(result, Err(Error::InvalidRealm(_))));
    }

    #[test]
    fn test_load_rejects_unknown_strategy_and_realm_type() {
        let config = r#"
        [global]
        strategy = "majority"

        [[realm]]
        name = "local"
        type = "memory"
        "#;
        assert!(matches!(
            Configuration::load_from_str(config),
            Err(Error::ConfigurationFileFormat(_))
        ));

        let config = r#"
        [[realm]]
        name = "dir"
        type = "ldap"
        "#;
        assert!(matches!(
            Configuration::load_from_str(config),
            Err(Error::ConfigurationFileFormat(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[realm]]\nname = \"local\"\ntype = \"memory\"").unwrap();

        let config = Configuration::load(file.path()).unwrap();
        assert_eq!(config.realms[0].name(), "local");

        let missing = Configuration::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
