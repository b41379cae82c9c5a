pub mod cache;
pub mod chain;
pub mod config;
pub mod devents;
pub mod explorer;
pub mod protocol;

pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
