use crate::domain::repo::NamespaceAndName;
use thiserror::Error;

/// Failure reported by a remote repository client.
///
/// `NotFound` is a normal outcome meaning the requested repository, head or
/// content does not exist (anymore). `Transport` means the server could not be
/// asked at all and must never be read as "no heads".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("transport failure: {message}")]
    Transport { message: String },
}

impl RemoteError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// Repository metadata as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRepository {
    pub namespace: String,
    pub name: String,
    pub vcs_type: String,
}

/// A named reference (branch or tag) and the revision it points to.
/// An empty revision means the server could not resolve one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    pub name: String,
    pub revision: String,
}

impl RemoteRef {
    pub fn new(name: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            revision: revision.into(),
        }
    }
}

/// An open pull request as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePullRequest {
    pub id: String,
    pub source: String,
    pub target: String,
    pub revision: String,
    /// Clone address of the source repository when the pull request comes from a fork
    pub fork_url: Option<String>,
}

/// Revision a probe inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeTarget {
    /// The head's own revision
    Revision(String),
    /// Synthetic merge of the pull request revision into its target branch
    Merge { head: String, target_branch: String },
}

/// Content inspection bound to one revision.
///
/// Dropping the probe releases whatever it holds (sessions, temporary trees).
pub trait Probe {
    fn target(&self) -> &ProbeTarget;

    /// Whether a file or directory exists at `path`
    fn exists(&self, path: &str) -> Result<bool, RemoteError>;

    /// Content of the file at `path`, `None` if there is no such file
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, RemoteError>;
}

/// Port for querying a remote repository server.
///
/// Calls are blocking; callers run them off any async executor.
pub trait RemoteRepositoryClient: Send + Sync {
    /// Base url of the server, used to derive browser links
    fn base_url(&self) -> &str;

    fn get_repository(&self, repository: &NamespaceAndName) -> Result<RemoteRepository, RemoteError>;

    fn list_branches(&self, repository: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError>;

    fn list_tags(&self, repository: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError>;

    fn list_pull_requests(
        &self,
        repository: &NamespaceAndName,
    ) -> Result<Vec<RemotePullRequest>, RemoteError>;

    fn get_branch(&self, repository: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError>;

    fn get_tag(&self, repository: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError>;

    fn get_pull_request(
        &self,
        repository: &NamespaceAndName,
        id: &str,
    ) -> Result<RemotePullRequest, RemoteError>;

    fn open_probe<'a>(
        &'a self,
        repository: &NamespaceAndName,
        target: &ProbeTarget,
    ) -> Result<Box<dyn Probe + 'a>, RemoteError>;
}
