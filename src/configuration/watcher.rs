use crate::authc::ModularRealmAuthenticator;
use crate::configuration::{Configuration, Error};
use crate::mgt::SecurityManager;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

pub struct ConfigWatcher {
    _handle: tokio::task::JoinHandle<()>,
}

impl ConfigWatcher {
    pub fn new(config_path: &str, manager: Arc<SecurityManager>) -> Result<Self, Error> {
        info!("Setting up config watcher for: {}", config_path);

        let config_file_path = std::fs::canonicalize(PathBuf::from(config_path))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = watch_config_loop(config_file_path, manager).await {
                error!("Config watcher failed: {}", e);
            }
        });

        Ok(Self { _handle: handle })
    }
}

fn get_tls_paths(config: &Configuration, config_dir: &Path) -> HashSet<PathBuf> {
    config
        .tls_paths()
        .into_iter()
        .filter_map(|path| {
            let resolved = if path.is_absolute() {
                path
            } else {
                config_dir.join(path)
            };
            resolved.canonicalize().ok()
        })
        .collect()
}

async fn watch_config_loop(
    config_path: PathBuf,
    manager: Arc<SecurityManager>,
) -> Result<(), Error> {
    use notify::event::ModifyKind;
    use tokio::sync::mpsc;

    let (tx, mut rx) = mpsc::channel::<Event>(100);

    loop {
        let config_dir = config_path.parent().unwrap_or(Path::new("."));

        let tx_clone = tx.clone();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx_clone.blocking_send(event);
            }
        })?;

        watcher.watch(&config_path, RecursiveMode::NonRecursive)?;

        let current_config = Configuration::load(&config_path)?;
        let watched_tls_paths = get_tls_paths(&current_config, config_dir);
        for path in &watched_tls_paths {
            watcher.watch(path, RecursiveMode::NonRecursive)?;
            info!("Watching TLS file: {:?}", path);
        }

        let mut should_restart_watcher = false;

        while !should_restart_watcher {
            match rx.recv().await {
                Some(event)
                    if matches!(
                        event.kind,
                        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any)
                    ) =>
                {
                    if event.paths.iter().any(|p| p == &config_path) {
                        info!("Configuration file changed, reloading");

                        let Ok(new_config) = Configuration::load(&config_path) else {
                            error!("Failed to reload configuration");
                            continue;
                        };

                        if get_tls_paths(&new_config, config_dir) != watched_tls_paths {
                            info!("TLS file paths changed, recreating watchers");
                            should_restart_watcher = true;
                        }

                        apply_configuration(&manager, &new_config);
                    } else if event.paths.iter().any(|p| watched_tls_paths.contains(p)) {
                        info!("TLS certificate changed, reloading");
                        if let Err(e) = reload(&manager, &config_path) {
                            error!("Failed to reload realms: {e}");
                        }
                    }
                }
                None => {
                    error!("Config watcher channel closed");
                    return Ok(());
                }
                _ => {}
            }
        }

        drop(watcher);
    }
}

fn apply_configuration(manager: &SecurityManager, config: &Configuration) {
    match ModularRealmAuthenticator::from_configuration(config) {
        Ok(authenticator) => {
            manager.reconfigure(authenticator);
            info!("Configuration reloaded");
        }
        Err(e) => error!("Failed to build realms from new configuration: {e}"),
    }
}

/// Reloads the configuration file and swaps in freshly built realms.
///
/// On error the manager keeps its current realms.
pub fn reload(manager: &SecurityManager, config_path: &Path) -> Result<(), Error> {
    let config = Configuration::load(config_path)?;
    let authenticator = ModularRealmAuthenticator::from_configuration(&config)?;
    manager.reconfigure(authenticator);
    Ok(())
}
