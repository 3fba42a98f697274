use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Category a head belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadCategory {
    Branch,
    Tag,
    PullRequest,
}

impl HeadCategory {
    pub const ALL: [HeadCategory; 3] = [Self::Branch, Self::Tag, Self::PullRequest];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Branch => "Branches",
            Self::Tag => "Tags",
            Self::PullRequest => "Pull Requests",
        }
    }
}

impl std::fmt::Display for HeadCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Version control type and address needed to clone a head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneInformation {
    vcs_type: String,
    url: String,
}

impl CloneInformation {
    pub fn new(vcs_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            vcs_type: vcs_type.into(),
            url: url.into(),
        }
    }

    pub fn vcs_type(&self) -> &str {
        &self.vcs_type
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Pull request specific head attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    id: String,
    source: String,
    target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fork_url: Option<String>,
}

impl PullRequest {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            fork_url: None,
        }
    }

    pub fn with_fork_url(mut self, fork_url: Option<String>) -> Self {
        self.fork_url = fork_url;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Clone address of the fork the pull request comes from, if it is not the origin
    pub fn fork_url(&self) -> Option<&str> {
        self.fork_url.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum HeadKind {
    Branch,
    Tag,
    PullRequest(PullRequest),
}

impl HeadKind {
    pub fn category(&self) -> HeadCategory {
        match self {
            Self::Branch => HeadCategory::Branch,
            Self::Tag => HeadCategory::Tag,
            Self::PullRequest(_) => HeadCategory::PullRequest,
        }
    }
}

/// A discoverable reference of a remote repository.
///
/// Two heads are equal when category and name match; clone information and
/// pull request details do not take part in identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Head {
    name: String,
    kind: HeadKind,
    clone: CloneInformation,
}

impl Head {
    pub fn branch(clone: CloneInformation, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: HeadKind::Branch,
            clone,
        }
    }

    pub fn tag(clone: CloneInformation, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: HeadKind::Tag,
            clone,
        }
    }

    pub fn pull_request(
        clone: CloneInformation,
        id: impl Into<String>,
        source: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::from_pull_request(clone, PullRequest::new(id, source, target))
    }

    pub fn from_pull_request(clone: CloneInformation, pull_request: PullRequest) -> Self {
        Self {
            name: format!("PR-{}", pull_request.id()),
            kind: HeadKind::PullRequest(pull_request),
            clone,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &HeadKind {
        &self.kind
    }

    pub fn category(&self) -> HeadCategory {
        self.kind.category()
    }

    pub fn clone_information(&self) -> &CloneInformation {
        &self.clone
    }

    pub fn pull_request_details(&self) -> Option<&PullRequest> {
        match &self.kind {
            HeadKind::PullRequest(pr) => Some(pr),
            _ => None,
        }
    }

    pub fn with_clone_information(mut self, clone: CloneInformation) -> Self {
        self.clone = clone;
        self
    }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.category() == other.category() && self.name == other.name
    }
}

impl Eq for Head {}

impl Hash for Head {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.category().hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Display for Head {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// A revision bound to exactly one head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    head: Head,
    marker: String,
}

impl Revision {
    pub fn new(head: Head, marker: impl Into<String>) -> Self {
        Self {
            head,
            marker: marker.into(),
        }
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    /// Commit hash or revision number
    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl std::fmt::Display for Revision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.head, self.marker)
    }
}

/// A head paired with its revision, as produced by the retriever.
///
/// A head whose revision marker could not be resolved still travels as a
/// candidate so it can be logged as skipped and is not mistaken for a removed
/// head, but it is never submitted to the observer.
#[derive(Debug, Clone)]
pub struct Candidate {
    head: Head,
    revision: Option<Revision>,
}

impl Candidate {
    pub(crate) fn new(head: Head, marker: Option<String>) -> Self {
        let revision = marker
            .filter(|marker| !marker.trim().is_empty())
            .map(|marker| Revision::new(head.clone(), marker));
        Self { head, revision }
    }

    pub fn head(&self) -> &Head {
        &self.head
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// Replace the clone information of the head and its bound revision
    pub(crate) fn with_clone_information(self, clone: CloneInformation) -> Self {
        let head = self.head.with_clone_information(clone);
        let revision = self.revision.map(|revision| Revision {
            head: head.clone(),
            marker: revision.marker,
        });
        Self { head, revision }
    }
}
