//! Configuration module
//!
//! Loads the TOML server configuration: listener, database, uploads,
//! stage allowlists, admin accounts, mirror sink and CORS settings.

pub mod server;

pub use server::{
    AdminAccount, AllowlistConfig, CorsConfig, DatabaseConfig, MirrorConfig, ServerConfig,
    ServerConfigError, ServerInfoConfig, UploadConfig,
};
