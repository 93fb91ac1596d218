mod error;

use std::io::{self, BufRead};

use argh::FromArgs;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHasher, Version};
use zeroize::Zeroize;

use crate::secret::Secret;
pub use error::Error;

#[derive(FromArgs, PartialEq, Debug)]
#[argh(
    subcommand,
    name = "argon",
    description = "Hash a password for a memory realm user following the argon2id algorithm"
)]
pub struct Options {
    #[argh(option, default = "Params::DEFAULT_M_COST")]
    /// memory cost in KiB
    pub memory_cost: u32,
    #[argh(option, default = "Params::DEFAULT_T_COST")]
    /// number of iterations
    pub time_cost: u32,
    #[argh(option, default = "Params::DEFAULT_P_COST")]
    /// degree of parallelism
    pub parallelism: u32,
    #[argh(switch)]
    /// read the password from the first line of stdin instead of prompting
    pub stdin: bool,
}

pub struct Command {
    params: Params,
}

impl Command {
    pub fn new(options: &Options) -> Result<Self, Error> {
        let params = Params::new(
            options.memory_cost,
            options.time_cost,
            options.parallelism,
            None,
        )?;

        Ok(Self { params })
    }

    pub fn run(&self, options: &Options) -> Result<(), Error> {
        let password = if options.stdin {
            read_password(io::stdin().lock())?
        } else {
            prompt_password()?
        };

        let hash = self.hash_password(&password)?;
        println!("{hash}");
        Ok(())
    }

    fn hash_password(&self, password: &Secret<String>) -> Result<String, Error> {
        if password.is_empty() {
            return Err(Error::Input("Password cannot be empty".to_string()));
        }

        let salt = SaltString::generate(OsRng);
        let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let hash = argon.hash_password(password.expose().as_bytes(), &salt)?;

        Ok(hash.to_string())
    }
}

fn prompt_password() -> Result<Secret<String>, Error> {
    let password = Secret::new(rpassword::prompt_password("Input Password: ")?);
    let confirmation = Secret::new(rpassword::prompt_password("Confirm Password: ")?);

    if password.expose() != confirmation.expose() {
        return Err(Error::Mismatch);
    }

    Ok(password)
}

fn read_password(mut reader: impl BufRead) -> Result<Secret<String>, Error> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    line.zeroize();

    Ok(Secret::new(password))
}
