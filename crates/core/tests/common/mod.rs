//! In-memory remote server shared by the synchronization tests

#![allow(dead_code)]

use headsync_core::ports::{
    Probe, ProbeTarget, RemoteError, RemotePullRequest, RemoteRef, RemoteRepository,
    RemoteRepositoryClient,
};
use headsync_core::NamespaceAndName;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const SERVER_URL: &str = "https://scm.example.com/scm";

#[derive(Debug, Default, Clone)]
pub struct RemoteState {
    pub vcs_type: String,
    pub branches: Vec<RemoteRef>,
    pub tags: Vec<RemoteRef>,
    pub pull_requests: Vec<RemotePullRequest>,
    /// Files per revision marker; merge probes use `<head>+<target branch>`
    pub files: HashMap<String, HashSet<String>>,
    pub unreachable: bool,
}

#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
    repository_lookups: AtomicUsize,
    probes: Mutex<Vec<ProbeTarget>>,
}

impl FakeRemote {
    pub fn git() -> Self {
        Self::with_type("git")
    }

    pub fn with_type(vcs_type: &str) -> Self {
        let remote = Self::default();
        remote.update(|state| state.vcs_type = vcs_type.to_string());
        remote
    }

    pub fn with_branches(self, branches: &[(&str, &str)]) -> Self {
        self.update(|state| {
            state.branches = branches
                .iter()
                .map(|(name, revision)| RemoteRef::new(*name, *revision))
                .collect()
        });
        self
    }

    pub fn with_tags(self, tags: &[(&str, &str)]) -> Self {
        self.update(|state| {
            state.tags = tags
                .iter()
                .map(|(name, revision)| RemoteRef::new(*name, *revision))
                .collect()
        });
        self
    }

    pub fn with_pull_request(self, id: &str, source: &str, target: &str, revision: &str) -> Self {
        self.update(|state| {
            state.pull_requests.push(RemotePullRequest {
                id: id.to_string(),
                source: source.to_string(),
                target: target.to_string(),
                revision: revision.to_string(),
                fork_url: None,
            })
        });
        self
    }

    pub fn with_file(self, revision: &str, path: &str) -> Self {
        self.update(|state| {
            state
                .files
                .entry(revision.to_string())
                .or_default()
                .insert(path.to_string());
        });
        self
    }

    pub fn update(&self, change: impl FnOnce(&mut RemoteState)) {
        let mut state = self.state.lock().unwrap();
        change(&mut state);
    }

    pub fn repository_lookups(&self) -> usize {
        self.repository_lookups.load(Ordering::SeqCst)
    }

    pub fn probed_targets(&self) -> Vec<ProbeTarget> {
        self.probes.lock().unwrap().clone()
    }

    fn read<T>(&self, f: impl FnOnce(&RemoteState) -> T) -> Result<T, RemoteError> {
        let state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(RemoteError::transport("connection refused"));
        }
        Ok(f(&state))
    }
}

struct FakeProbe {
    target: ProbeTarget,
    files: HashSet<String>,
}

impl Probe for FakeProbe {
    fn target(&self) -> &ProbeTarget {
        &self.target
    }

    fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        Ok(self.files.contains(path))
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        Ok(self.files.contains(path).then(Vec::new))
    }
}

impl RemoteRepositoryClient for FakeRemote {
    fn base_url(&self) -> &str {
        SERVER_URL
    }

    fn get_repository(&self, repository: &NamespaceAndName) -> Result<RemoteRepository, RemoteError> {
        self.repository_lookups.fetch_add(1, Ordering::SeqCst);
        let vcs_type = self.read(|state| state.vcs_type.clone())?;
        if vcs_type.is_empty() {
            return Err(RemoteError::not_found(format!("repository {repository}")));
        }
        Ok(RemoteRepository {
            namespace: repository.namespace().to_string(),
            name: repository.name().to_string(),
            vcs_type,
        })
    }

    fn list_branches(&self, _: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError> {
        self.read(|state| state.branches.clone())
    }

    fn list_tags(&self, _: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError> {
        self.read(|state| state.tags.clone())
    }

    fn list_pull_requests(&self, _: &NamespaceAndName) -> Result<Vec<RemotePullRequest>, RemoteError> {
        self.read(|state| state.pull_requests.clone())
    }

    fn get_branch(&self, _: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError> {
        self.read(|state| state.branches.iter().find(|b| b.name == name).cloned())?
            .ok_or_else(|| RemoteError::not_found(format!("branch {name}")))
    }

    fn get_tag(&self, _: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError> {
        self.read(|state| state.tags.iter().find(|t| t.name == name).cloned())?
            .ok_or_else(|| RemoteError::not_found(format!("tag {name}")))
    }

    fn get_pull_request(&self, _: &NamespaceAndName, id: &str) -> Result<RemotePullRequest, RemoteError> {
        self.read(|state| state.pull_requests.iter().find(|pr| pr.id == id).cloned())?
            .ok_or_else(|| RemoteError::not_found(format!("pull request {id}")))
    }

    fn open_probe<'a>(
        &'a self,
        _: &NamespaceAndName,
        target: &ProbeTarget,
    ) -> Result<Box<dyn Probe + 'a>, RemoteError> {
        self.probes.lock().unwrap().push(target.clone());
        let key = match target {
            ProbeTarget::Revision(revision) => revision.clone(),
            ProbeTarget::Merge { head, target_branch } => format!("{head}+{target_branch}"),
        };
        let files = self.read(|state| state.files.get(&key).cloned())?;
        let files = files.ok_or_else(|| RemoteError::not_found(format!("revision {key}")))?;
        Ok(Box::new(FakeProbe {
            target: target.clone(),
            files,
        }))
    }
}
