//! Per-host credential records.
//!
//! Sessions are constructed from a credential store keyed by host address.
//! The store is typically loaded from a JSON file of the form:
//!
//! ```json
//! {
//!     "hosts": {
//!         "10.1.3.203": { "password": "secret" },
//!         "10.1.3.204": { "port": 2222, "username": "operator", "password": "secret" }
//!     }
//! }
//! ```
//!
//! Port and username are optional and default to 22 and `admin`. A missing
//! record for a requested host is a construction-time failure.

use std::collections::HashMap;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Login parameters for a single OLT host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HostCredentials {
    /// SSH port, defaults to 22.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login username, defaults to "admin".
    #[serde(default = "default_username")]
    pub username: String,

    /// Login password. Required; there is no key-based fallback on these devices.
    pub password: String,
}

fn default_port() -> u16 {
    22
}

fn default_username() -> String {
    "admin".to_string()
}

/// Credential records for all known hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CredentialStore {
    /// Host address (as dialed) to credential record.
    pub hosts: HashMap<String, HostCredentials>,
}

impl CredentialStore {
    /// Loads a credential store from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SessionError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a credential store from a JSON string.
    pub fn from_json(text: &str) -> Result<Self, SessionError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Looks up the credential record for a host.
    pub fn host(&self, host: &str) -> Option<&HostCredentials> {
        self.hosts.get(host)
    }
}
