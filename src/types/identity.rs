//! Caller identity used for rate-limit accounting

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Who a request is accounted to.
///
/// Identities are supplied by the caller, not verified. A user identifier
/// takes precedence; the network address is the documented fallback when no
/// identifier is given.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    User(String),
    Address(IpAddr),
}

impl Identity {
    /// Create a user identity.
    pub fn user(id: impl Into<String>) -> Self {
        Identity::User(id.into())
    }

    /// Pick the user identifier if present and non-blank, else the address.
    pub fn resolve(user_id: Option<&str>, addr: IpAddr) -> Self {
        match user_id.map(str::trim) {
            Some(id) if !id.is_empty() => Identity::User(id.to_string()),
            _ => Identity::Address(addr),
        }
    }

    /// Rate-limit bucket key.
    ///
    /// Prefixed by kind so a user named `127.0.0.1` does not share a bucket
    /// with the loopback address.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identity::User(id) => write!(f, "user:{id}"),
            Identity::Address(addr) => write!(f, "addr:{addr}"),
        }
    }
}

impl From<IpAddr> for Identity {
    fn from(addr: IpAddr) -> Self {
        Identity::Address(addr)
    }
}
