pub mod argon;
pub mod console;
mod error;
pub mod login;

pub use error::Error;
