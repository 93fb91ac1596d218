use std::net::IpAddr;
use std::sync::Arc;

use argh::FromArgs;
use tracing::info;

use crate::authc::AuthenticationToken;
use crate::authz::{AuthorizationInfo, Permission};
use crate::command;
use crate::metrics_provider::METRICS_PROVIDER;
use crate::mgt::{SecurityManager, Subject};
use crate::secret::Secret;

#[derive(FromArgs, PartialEq, Debug)]
#[allow(clippy::struct_excessive_bools)]
#[argh(
    subcommand,
    name = "login",
    description = "Authenticate against the configured realms and print the resulting subject"
)]
pub struct Options {
    #[argh(option, short = 'u')]
    /// the username to log in with, prompts when omitted
    pub username: Option<String>,
    #[argh(switch, short = 'b')]
    /// submit a bearer token instead of a username and password
    pub bearer: bool,
    #[argh(option)]
    /// source address attached to the login attempt
    pub host: Option<IpAddr>,
    #[argh(switch)]
    /// flag the attempt as a remember-me login
    pub remember_me: bool,
    #[argh(option, short = 'p')]
    /// permission the subject must be granted, may be repeated
    pub permission: Vec<String>,
    #[argh(option, short = 'r')]
    /// role the subject must hold, may be repeated
    pub role: Vec<String>,
    #[argh(switch, short = 'm')]
    /// print the collected metrics after the attempt
    pub metrics: bool,
}

pub struct Command {
    manager: Arc<SecurityManager>,
    permissions: Vec<Permission>,
}

impl Command {
    pub fn new(options: &Options, manager: Arc<SecurityManager>) -> Result<Self, command::Error> {
        let permissions = options
            .permission
            .iter()
            .map(|p| p.parse())
            .collect::<Result<Vec<Permission>, _>>()?;

        Ok(Self {
            manager,
            permissions,
        })
    }

    pub async fn run(&self, options: &Options) -> Result<(), command::Error> {
        let token = prompt_token(options)?;
        let result = self.login(token, &options.role).await;

        if options.metrics {
            let (_, metrics) = METRICS_PROVIDER.gather()?;
            println!("{}", String::from_utf8_lossy(&metrics));
        }

        let subject = result?;
        println!("{}", serde_json::to_string_pretty(&subject)?);
        Ok(())
    }

    async fn login(
        &self,
        token: AuthenticationToken,
        roles: &[String],
    ) -> Result<Subject, command::Error> {
        let subject = self.manager.login(token).await?;
        info!("Logged in as {subject}");

        for role in roles {
            subject.check_role(role)?;
        }
        for permission in &self.permissions {
            subject.check_permission(permission)?;
        }

        Ok(subject)
    }
}

fn build_token(
    options: &Options,
    username: Option<String>,
    secret: Secret<String>,
) -> AuthenticationToken {
    let token = match username {
        Some(username) if !options.bearer => {
            AuthenticationToken::username_password(username, secret)
        }
        _ => AuthenticationToken::bearer(secret),
    };

    let token = match options.host {
        Some(host) => token.with_host(host),
        None => token,
    };

    token.with_remember_me(options.remember_me)
}

fn prompt_token(options: &Options) -> Result<AuthenticationToken, command::Error> {
    if options.bearer {
        let secret = Secret::new(rpassword::prompt_password("Token: ")?);
        return Ok(build_token(options, None, secret));
    }

    let username = match &options.username {
        Some(username) => username.clone(),
        None => {
            let mut username = String::new();
            eprint!("Username: ");
            std::io::stdin().read_line(&mut username)?;
            username.trim().to_string()
        }
    };

    let secret = Secret::new(rpassword::prompt_password("Password: ")?);
    Ok(build_token(options, Some(username), secret))
}
