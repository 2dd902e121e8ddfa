//! Server configuration for breakdown-server
//!
//! Loads and parses breakdown-server.toml.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Server identification and listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfoConfig {
    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerInfoConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_server_name() -> String {
    "breakdown-server".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file path
    pub path: String,
}

/// Uploaded media storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory holding uploaded files
    #[serde(default = "default_upload_dir")]
    pub dir: PathBuf,
    /// Prefix stored in media references, e.g. `/uploads/<file>`
    #[serde(default = "default_public_prefix")]
    pub public_prefix: String,
    /// Maximum request body size for multipart uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            public_prefix: default_public_prefix(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_public_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

/// Pre-approved codes per stage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowlistConfig {
    /// Codes accepted on the temporary stage
    #[serde(default)]
    pub maintenance: Vec<String>,
    /// Codes accepted on the closure stage
    #[serde(default)]
    pub closure: Vec<String>,
    /// Codes accepted on the approval stage
    #[serde(default)]
    pub approval: Vec<String>,
}

/// An administrator allowed through the admin gate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminAccount {
    pub admin_id: String,
    pub username: String,
    /// Hex-encoded SHA-256 of the password
    pub password_sha256: String,
    #[serde(default)]
    pub full_name: String,
    pub role: String,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// External spreadsheet mirror
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Endpoint receiving the full row set
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Bearer token (can be overridden by MIRROR_TOKEN environment variable)
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_mirror_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            token: None,
            timeout_secs: default_mirror_timeout_secs(),
        }
    }
}

fn default_mirror_timeout_secs() -> u64 {
    30
}

impl MirrorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the bearer token, checking environment variable first
    pub fn get_token(&self) -> Option<String> {
        std::env::var("MIRROR_TOKEN")
            .ok()
            .or_else(|| self.token.clone())
            .filter(|token| !token.is_empty())
    }
}

/// Cross-origin settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins. Empty means permissive.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerInfoConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    pub allowlists: AllowlistConfig,
    #[serde(default)]
    pub admins: Vec<AdminAccount>,
    #[serde(default)]
    pub mirror: MirrorConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ServerConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(ServerConfigError::ReadError)?;
        Self::from_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self, ServerConfigError> {
        toml::from_str(content).map_err(ServerConfigError::ParseError)
    }

    /// Load configuration from default location or environment
    ///
    /// Searches for config in:
    /// 1. CONFIG_PATH environment variable
    /// 2. ./config/breakdown-server.toml
    /// 3. ./breakdown-server.toml
    pub fn load() -> Result<Self, ServerConfigError> {
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Self::from_file(config_path);
        }

        let paths = [
            PathBuf::from("config/breakdown-server.toml"),
            PathBuf::from("./breakdown-server.toml"),
        ];

        for path in &paths {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(ServerConfigError::InvalidConfig(
            "Configuration file not found. Set CONFIG_PATH or place breakdown-server.toml in config/".to_string(),
        ))
    }

    /// Check cross-field constraints that serde cannot express
    pub fn validate(&self) -> Result<(), ServerConfigError> {
        let lists = [
            ("maintenance", &self.allowlists.maintenance),
            ("closure", &self.allowlists.closure),
            ("approval", &self.allowlists.approval),
        ];
        for (name, codes) in lists {
            if codes.iter().all(|code| code.trim().is_empty()) {
                return Err(ServerConfigError::InvalidConfig(format!(
                    "allowlists.{} must contain at least one code",
                    name
                )));
            }
        }

        if self.mirror.enabled
            && self.mirror.endpoint.as_deref().map_or(true, |e| e.trim().is_empty())
        {
            return Err(ServerConfigError::InvalidConfig(
                "mirror.endpoint is required when mirror.enabled = true".to_string(),
            ));
        }

        let prefix = self.uploads.public_prefix.trim_end_matches('/');
        if !prefix.starts_with('/') || prefix.starts_with("/api") {
            return Err(ServerConfigError::InvalidConfig(format!(
                "uploads.public_prefix must be an absolute path outside /api, got {}",
                self.uploads.public_prefix
            )));
        }

        let mut usernames = HashSet::new();
        for admin in &self.admins {
            if !usernames.insert(admin.username.as_str()) {
                return Err(ServerConfigError::InvalidConfig(format!(
                    "duplicate admin username: {}",
                    admin.username
                )));
            }
            let digest = &admin.password_sha256;
            if digest.len() != 64 || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(ServerConfigError::InvalidConfig(format!(
                    "admin {} password_sha256 must be 64 hex characters",
                    admin.username
                )));
            }
        }

        Ok(())
    }

    /// Listener host, `HOST` environment variable first
    pub fn host(&self) -> String {
        std::env::var("HOST").unwrap_or_else(|_| self.server.host.clone())
    }

    /// Listener port, `PORT` environment variable first
    pub fn port(&self) -> Result<u16, ServerConfigError> {
        match std::env::var("PORT") {
            Ok(port) => port.parse::<u16>().map_err(|_| {
                ServerConfigError::InvalidConfig(format!("PORT must be a valid u16, got {}", port))
            }),
            Err(_) => Ok(self.server.port),
        }
    }

    /// Get database URL from configuration
    pub fn database_url(&self) -> String {
        format!("sqlite://{}", self.database.path)
    }
}
