use crate::domain::link::LinkBuilder;
use crate::error::{CoreError, Result};
use crate::ports::{RemoteError, RemoteRepositoryClient};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::debug;

/// Namespace and name of a repository on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespaceAndName {
    namespace: String,
    name: String,
}

impl NamespaceAndName {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `namespace/name` pair.
    ///
    /// The display form `namespace/name (type)` is rejected as well.
    pub fn parse(repository: &str) -> Result<Self> {
        if repository.contains(['(', ')']) {
            return Err(CoreError::configuration(format!(
                "Repository '{repository}' must not carry a type suffix"
            )));
        }

        let parts: Vec<&str> = repository.split('/').map(str::trim).collect();
        match parts.as_slice() {
            [namespace, name] if is_relative(namespace) || is_relative(name) => {
                Err(CoreError::configuration(format!(
                    "Repository '{repository}' must not contain relative path segments"
                )))
            }
            [namespace, name] if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(*namespace, *name))
            }
            [_, _, _, ..] => Err(CoreError::configuration(format!(
                "Repositories must not contain a slash: '{repository}'"
            ))),
            _ => Err(CoreError::configuration(format!(
                "Repository '{repository}' must have the form namespace/name"
            ))),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_relative(segment: &str) -> bool {
    matches!(segment, "." | "..")
}

impl FromStr for NamespaceAndName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for NamespaceAndName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Identity of a remote repository.
///
/// The namespace/name pair is fixed at construction. The version control type
/// is only known after [`RepositoryIdentity::resolve_type`] asked the server
/// once; the answer is kept for the lifetime of the identity.
#[derive(Debug)]
pub struct RepositoryIdentity {
    server_url: String,
    repository: NamespaceAndName,
    vcs_type: OnceLock<String>,
}

impl RepositoryIdentity {
    pub fn new(server_url: impl Into<String>, repository: &str) -> Result<Self> {
        let server_url = server_url.into();
        if server_url.trim().is_empty() {
            return Err(CoreError::configuration("server url is required"));
        }
        let repository = NamespaceAndName::parse(repository)?;
        debug!("Created repository identity {} on {}", repository, server_url);
        Ok(Self {
            server_url,
            repository,
            vcs_type: OnceLock::new(),
        })
    }

    /// Identity whose type is already known, e.g. restored from a previous run
    pub fn with_type(
        server_url: impl Into<String>,
        repository: &str,
        vcs_type: impl Into<String>,
    ) -> Result<Self> {
        let identity = Self::new(server_url, repository)?;
        let _ = identity.vcs_type.set(vcs_type.into());
        Ok(identity)
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub fn repository(&self) -> &NamespaceAndName {
        &self.repository
    }

    /// Resolve the repository type with one remote call, or return the cached value.
    ///
    /// Concurrent first calls may each reach the server; whichever answer lands
    /// first is kept.
    pub fn resolve_type(&self, client: &dyn RemoteRepositoryClient) -> Result<&str> {
        if let Some(vcs_type) = self.vcs_type.get() {
            return Ok(vcs_type);
        }

        let remote = client
            .get_repository(&self.repository)
            .map_err(|source| match source {
                RemoteError::Transport { message } => CoreError::Transport { message },
                source => CoreError::TypeResolution {
                    repository: self.repository.to_string(),
                    source,
                },
            })?;

        debug!("Resolved type of {} to {}", self.repository, remote.vcs_type);
        Ok(self.vcs_type.get_or_init(|| remote.vcs_type))
    }

    /// The resolved type; fails if [`Self::resolve_type`] has not succeeded yet
    pub fn vcs_type(&self) -> Result<&str> {
        self.vcs_type
            .get()
            .map(String::as_str)
            .ok_or_else(|| CoreError::TypeNotResolved {
                repository: self.repository.to_string(),
            })
    }

    pub fn link_builder(&self) -> LinkBuilder {
        LinkBuilder::new(&self.server_url, self.repository.clone())
    }

    /// Address used to clone the repository
    pub fn clone_url(&self) -> String {
        self.link_builder().repo()
    }
}

impl std::fmt::Display for RepositoryIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.vcs_type.get() {
            Some(vcs_type) => write!(f, "{} ({})", self.repository, vcs_type),
            None => write!(f, "{}", self.repository),
        }
    }
}
