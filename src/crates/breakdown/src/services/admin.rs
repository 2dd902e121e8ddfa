//! Admin capability gate
//!
//! Admin endpoints authenticate with HTTP Basic credentials checked against
//! the configured admin accounts. Passwords are stored as SHA-256 hex digests.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AdminAccount;

/// Reasons an admin request is refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("Admin credentials required")]
    MissingCredentials,

    #[error("Malformed admin credentials")]
    MalformedCredentials,

    #[error("Invalid admin credentials")]
    InvalidCredentials,
}

impl GateError {
    /// Whether the caller supplied no usable credentials at all
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, GateError::MissingCredentials | GateError::MalformedCredentials)
    }
}

/// An authenticated admin
///
/// Only the gate can construct one, so holding an identity proves the
/// credentials were checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity {
    id: String,
    username: String,
    role: String,
}

impl AdminIdentity {
    pub(crate) fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            role: role.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> &str {
        &self.role
    }
}

/// Hex-encoded SHA-256 digest of a password
pub fn password_digest(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// Checks Basic credentials against the admin accounts
#[derive(Debug, Clone, Default)]
pub struct AdminGate {
    accounts: HashMap<String, AdminAccount>,
}

impl AdminGate {
    pub fn new(accounts: impl IntoIterator<Item = AdminAccount>) -> Self {
        Self {
            accounts: accounts
                .into_iter()
                .map(|account| (account.username.clone(), account))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Authenticate an `Authorization` header value
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AdminIdentity, GateError> {
        let header = authorization
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(GateError::MissingCredentials)?;
        let (username, password) = parse_basic(header)?;

        let account = match self.accounts.get(&username) {
            Some(account) if account.active => account,
            Some(_) => {
                warn!(username = %username, "inactive admin account rejected");
                return Err(GateError::InvalidCredentials);
            }
            None => {
                debug!(username = %username, "unknown admin username");
                return Err(GateError::InvalidCredentials);
            }
        };

        if !password_digest(&password).eq_ignore_ascii_case(account.password_sha256.trim()) {
            warn!(username = %username, "admin password mismatch");
            return Err(GateError::InvalidCredentials);
        }

        Ok(AdminIdentity::new(
            &account.admin_id,
            &account.username,
            &account.role,
        ))
    }
}

fn parse_basic(header: &str) -> Result<(String, String), GateError> {
    let (scheme, encoded) = header
        .split_once(' ')
        .ok_or(GateError::MalformedCredentials)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(GateError::MalformedCredentials);
    }
    let decoded = BASE64
        .decode(encoded.trim())
        .map_err(|_| GateError::MalformedCredentials)?;
    let decoded = String::from_utf8(decoded).map_err(|_| GateError::MalformedCredentials)?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or(GateError::MalformedCredentials)?;
    Ok((username.to_string(), password.to_string()))
}
