use crate::behavior::{default_behaviors, DiscoveryBehavior};
use crate::domain::head::{Head, Revision};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Configuration store interface
pub trait ConfigStore: Send + Sync {
    /// Load configuration from storage
    fn load(&self) -> Result<SourceConfig>;

    /// Save configuration to storage
    fn save(&self, config: &SourceConfig) -> Result<()>;
}

/// Store for the heads known from previous runs
pub trait HeadStore: Send + Sync {
    fn load_heads(&self) -> Result<Vec<StoredHead>>;

    fn save_heads(&self, heads: &[StoredHead]) -> Result<()>;
}

/// Configuration of one head source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub version: u32,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub server_url: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credentials_id: Option<String>,
    /// Only heads containing this file are reported as matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    #[serde(default = "default_behaviors")]
    pub behaviors: Vec<DiscoveryBehavior>,
    #[serde(default)]
    pub credentials: BTreeMap<String, CredentialConfig>,
}

/// Credentials the app resolves into an authentication before the core runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum CredentialConfig {
    Basic { username: String, password: String },
    Bearer { token: String },
}

/// A head with the revision it had when last observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredHead {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub head: Head,
}

impl StoredHead {
    pub fn revision(&self) -> Option<Revision> {
        self.revision
            .as_ref()
            .map(|marker| Revision::new(self.head.clone(), marker.clone()))
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            version: 1,
            id: String::new(),
            server_url: String::new(),
            repository: String::new(),
            credentials_id: None,
            required_file: None,
            state_file: None,
            behaviors: default_behaviors(),
            credentials: BTreeMap::new(),
        }
    }
}

impl SourceConfig {
    /// Check that the required fields are present
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::CoreError;

        if self.id.trim().is_empty() {
            return Err(CoreError::configuration("id is required"));
        }
        if self.server_url.trim().is_empty() {
            return Err(CoreError::configuration("serverUrl is required"));
        }
        if self.repository.trim().is_empty() {
            return Err(CoreError::configuration("repository is required"));
        }
        if let Some(id) = &self.credentials_id {
            if !self.credentials.contains_key(id) {
                return Err(CoreError::configuration(format!(
                    "credentials '{id}' are not defined"
                )));
            }
        }
        Ok(())
    }
}
