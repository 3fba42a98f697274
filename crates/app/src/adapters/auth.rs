use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use headsync_core::ports::{Authentication, CredentialConfig, OutgoingRequest, SourceConfig};
use std::sync::Arc;
use tracing::debug;

/// Sends requests without credentials
#[derive(Debug, Default, Clone, Copy)]
pub struct AnonymousAuthentication;

impl Authentication for AnonymousAuthentication {
    fn apply(&self, _request: &mut OutgoingRequest) {}
}

/// HTTP basic authentication
#[derive(Clone)]
pub struct BasicAuthentication {
    username: String,
    password: String,
}

impl BasicAuthentication {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for BasicAuthentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthentication")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Authentication for BasicAuthentication {
    fn apply(&self, request: &mut OutgoingRequest) {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        request.add_header("Authorization", format!("Basic {encoded}"));
    }
}

/// Token authentication, e.g. with an access token of the server
#[derive(Clone)]
pub struct BearerAuthentication {
    token: String,
}

impl BearerAuthentication {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl std::fmt::Debug for BearerAuthentication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerAuthentication")
    }
}

impl Authentication for BearerAuthentication {
    fn apply(&self, request: &mut OutgoingRequest) {
        request.add_header("Authorization", format!("Bearer {}", self.token));
    }
}

/// Resolve the configured credentials into an authentication
pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn Authentication>> {
    let Some(id) = config.credentials_id.as_deref() else {
        debug!("No credentials configured, using anonymous access");
        return Ok(Arc::new(AnonymousAuthentication));
    };

    let credentials = config
        .credentials
        .get(id)
        .with_context(|| format!("Credentials '{id}' are not defined"))?;

    debug!("Using credentials '{}'", id);
    Ok(match credentials {
        CredentialConfig::Basic { username, password } => {
            Arc::new(BasicAuthentication::new(username, password))
        }
        CredentialConfig::Bearer { token } => Arc::new(BearerAuthentication::new(token)),
    })
}
