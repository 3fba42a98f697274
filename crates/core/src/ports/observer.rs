use crate::domain::head::{Head, Revision};
use crate::ports::remote::{Probe, RemoteError};

/// Heads an observer wants to hear about
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Includes {
    #[default]
    All,
    Only(Vec<Head>),
}

impl Includes {
    /// The single head a targeted refresh can be limited to
    pub fn single(&self) -> Option<&Head> {
        match self {
            Self::Only(heads) if heads.len() == 1 => heads.first(),
            _ => None,
        }
    }
}

/// Receives the outcome of a synchronization run
pub trait HeadObserver {
    fn includes(&self) -> Includes {
        Includes::All
    }

    /// Heads the observer knows from earlier runs
    fn known_heads(&self) -> Vec<Head>;

    /// Report a head with its revision and whether it met the criteria.
    /// Returns `false` once the observer has seen enough.
    fn submit(&mut self, head: &Head, revision: &Revision, is_match: bool) -> bool;

    /// A previously known head no longer exists on the server
    fn removed(&mut self, head: &Head);
}

/// Externally supplied test a head must pass to be wanted
pub trait Criteria: Send + Sync {
    fn matches(&self, probe: &dyn Probe) -> Result<bool, RemoteError>;
}

/// Accepts heads whose revision contains a given file, e.g. a pipeline definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileExistsCriteria {
    path: String,
}

impl FileExistsCriteria {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Criteria for FileExistsCriteria {
    fn matches(&self, probe: &dyn Probe) -> Result<bool, RemoteError> {
        probe.exists(&self.path)
    }
}
