use std::io::{self, BufRead, Write};
use std::sync::Arc;

use argh::FromArgs;
use tokio::task::spawn_blocking;
use tracing::{debug, error};

use crate::authc::AuthenticationToken;
use crate::command;
use crate::mgt::SecurityManager;
use crate::secret::Secret;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "console",
    description = "Run repeated interactive logins, reloading realms when the configuration changes"
)]
pub struct Options {
    #[argh(switch)]
    /// log every subject out right after a successful login
    pub logout: bool,
}

pub struct Command {
    manager: Arc<SecurityManager>,
    logout: bool,
}

enum Prompt {
    Credentials(String, Secret<String>),
    Exit,
}

impl Command {
    pub fn new(options: &Options, manager: Arc<SecurityManager>) -> Self {
        Self {
            manager,
            logout: options.logout,
        }
    }

    pub async fn run(&self) -> Result<(), command::Error> {
        println!("Enter an empty username to exit.");

        loop {
            let prompt = spawn_blocking(prompt_credentials)
                .await
                .map_err(io::Error::other)??;

            let Prompt::Credentials(username, password) = prompt else {
                debug!("Console session ended");
                return Ok(());
            };

            let token = AuthenticationToken::username_password(username, password);
            match self.manager.login(token).await {
                Ok(subject) => {
                    println!("{}", serde_json::to_string_pretty(&subject)?);
                    if self.logout {
                        self.manager.logout(&subject).await;
                    }
                }
                Err(e) => {
                    error!(kind = e.kind(), "Login failed");
                    println!("Login failed: {e}");
                }
            }
        }
    }
}

fn prompt_credentials() -> Result<Prompt, io::Error> {
    let stdin = io::stdin();
    let Some(username) = read_username(&mut stdin.lock(), &mut io::stderr())? else {
        return Ok(Prompt::Exit);
    };

    let password = rpassword::prompt_password("Password: ")?;
    Ok(Prompt::Credentials(username, Secret::new(password)))
}

fn read_username(
    reader: &mut impl BufRead,
    prompt: &mut impl Write,
) -> Result<Option<String>, io::Error> {
    write!(prompt, "Username: ")?;
    prompt.flush()?;

    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }

    let username = line.trim();
    if username.is_empty() {
        Ok(None)
    } else {
        Ok(Some(username.to_string()))
    }
}
