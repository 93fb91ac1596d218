use argon2::password_hash;
use std::{fmt, io};

#[derive(Debug, PartialEq)]
pub enum Error {
    Input(String),
    Mismatch,
    Hashing(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Input(err) => write!(f, "Unable to read password: {err}"),
            Error::Mismatch => write!(f, "Passwords do not match"),
            Error::Hashing(err) => write!(f, "Unable to hash password: {err}"),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Input(err.to_string())
    }
}

impl From<password_hash::Error> for Error {
    fn from(err: password_hash::Error) -> Self {
        Error::Hashing(err.to_string())
    }
}

impl From<argon2::Error> for Error {
    fn from(err: argon2::Error) -> Self {
        Error::Hashing(err.to_string())
    }
}
