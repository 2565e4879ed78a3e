pub mod cache;
pub mod cli;
pub mod cmds;
pub mod config;
pub mod error;
pub mod http;
pub mod io;
pub mod logging;
pub mod test;
pub mod time;
pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;

#[macro_use]
extern crate log;

#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate derive_builder;

pub const USER_AGENT: &str = concat!("hpc/", env!("CARGO_PKG_VERSION"));
