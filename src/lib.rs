#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

pub mod authc;
pub mod authz;
pub mod command;
pub mod configuration;
pub mod metrics_provider;
pub mod mgt;
pub mod realm;
pub mod secret;
