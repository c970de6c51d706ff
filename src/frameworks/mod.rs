// Frameworks layer: runtime bootstrap and environment configuration.

pub mod client;
pub mod config;
