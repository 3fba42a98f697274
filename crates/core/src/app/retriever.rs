use crate::behavior::RequestConfig;
use crate::cancel::CancellationToken;
use crate::domain::head::{Candidate, CloneInformation, Head, HeadCategory, HeadKind, PullRequest};
use crate::domain::repo::NamespaceAndName;
use crate::error::Result;
use crate::ports::remote::{Probe, RemoteError, RemotePullRequest, RemoteRef, RemoteRepositoryClient};
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Turns remote listings into candidates for one repository
pub struct Retriever<'a> {
    client: &'a dyn RemoteRepositoryClient,
    repository: &'a NamespaceAndName,
    clone: CloneInformation,
    config: &'a RequestConfig,
    categories: Vec<HeadCategory>,
    cancel: &'a CancellationToken,
}

impl<'a> Retriever<'a> {
    pub fn new(
        client: &'a dyn RemoteRepositoryClient,
        repository: &'a NamespaceAndName,
        clone: CloneInformation,
        config: &'a RequestConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            client,
            repository,
            clone,
            config,
            categories: config.categories(),
            cancel,
        }
    }

    /// Restrict enumeration to categories the repository type can have
    pub fn with_categories(mut self, categories: Vec<HeadCategory>) -> Self {
        self.categories.retain(|category| categories.contains(category));
        self
    }

    pub fn categories(&self) -> &[HeadCategory] {
        &self.categories
    }

    /// Lazily list every enabled category, one remote call per category.
    ///
    /// The sequence ends after the first error.
    pub fn all_candidates(&self) -> Candidates<'_, 'a> {
        Candidates {
            retriever: self,
            pending: self.categories.iter().copied().collect(),
            current: Vec::new().into_iter(),
            pull_requests: None,
            sources: None,
            failed: false,
        }
    }

    /// Look up one head. A head the server no longer knows yields no candidate.
    pub fn specific_candidates(&self, head: &Head) -> Result<Vec<Candidate>> {
        if !self.categories.contains(&head.category()) {
            debug!("Category of {} is not enabled, nothing to look up", head.name());
            return Ok(Vec::new());
        }
        self.cancel.check()?;

        let found = match head.kind() {
            HeadKind::Branch => self
                .client
                .get_branch(self.repository, head.name())
                .map(|r| self.branch(r)),
            HeadKind::Tag => self
                .client
                .get_tag(self.repository, head.name())
                .map(|r| self.tag(r)),
            HeadKind::PullRequest(pr) => self
                .client
                .get_pull_request(self.repository, pr.id())
                .map(|pr| self.pull_request(pr)),
        };

        let candidate = match found {
            Ok(candidate) => candidate,
            Err(RemoteError::NotFound { what }) => {
                debug!("{} not found on the server: {}", head.name(), what);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let sources = if candidate.head().category() == HeadCategory::Branch
            && self.config.needs_pull_request_sources()
        {
            let pull_requests = self.client.list_pull_requests(self.repository)?;
            pull_request_sources(&pull_requests)
        } else {
            HashSet::new()
        };

        Ok(self
            .config
            .decorate_candidate(candidate, &sources)
            .into_iter()
            .collect())
    }

    /// Open a probe for the candidate's revision, or for the synthetic merge
    /// revision when the pull request strategy asks for it
    pub fn probe(&self, candidate: &Candidate) -> std::result::Result<Box<dyn Probe + 'a>, RemoteError> {
        let revision = candidate
            .revision()
            .ok_or_else(|| RemoteError::not_found(format!("revision of {}", candidate.head())))?;
        let target = self.config.probe_target(candidate.head(), revision);
        self.client.open_probe(self.repository, &target)
    }

    fn branch(&self, remote: RemoteRef) -> Candidate {
        Candidate::new(Head::branch(self.clone.clone(), remote.name), Some(remote.revision))
    }

    fn tag(&self, remote: RemoteRef) -> Candidate {
        Candidate::new(Head::tag(self.clone.clone(), remote.name), Some(remote.revision))
    }

    fn pull_request(&self, remote: RemotePullRequest) -> Candidate {
        let pull_request =
            PullRequest::new(remote.id, remote.source, remote.target).with_fork_url(remote.fork_url);
        Candidate::new(
            Head::from_pull_request(self.clone.clone(), pull_request),
            Some(remote.revision),
        )
    }
}

/// Origin branches that are the source of an open pull request
fn pull_request_sources(pull_requests: &[RemotePullRequest]) -> HashSet<String> {
    pull_requests
        .iter()
        .filter(|pr| pr.fork_url.is_none())
        .map(|pr| pr.source.clone())
        .collect()
}

/// Single-pass candidate sequence produced by [`Retriever::all_candidates`]
pub struct Candidates<'r, 'a> {
    retriever: &'r Retriever<'a>,
    pending: VecDeque<HeadCategory>,
    current: std::vec::IntoIter<Candidate>,
    pull_requests: Option<Vec<RemotePullRequest>>,
    sources: Option<HashSet<String>>,
    failed: bool,
}

impl Candidates<'_, '_> {
    fn pull_requests(&mut self) -> Result<&[RemotePullRequest]> {
        if self.pull_requests.is_none() {
            let retriever = self.retriever;
            let listed = retriever.client.list_pull_requests(retriever.repository)?;
            debug!("Listed {} pull requests of {}", listed.len(), retriever.repository);
            self.pull_requests = Some(listed);
        }
        Ok(self.pull_requests.as_deref().unwrap_or_default())
    }

    fn load(&mut self, category: HeadCategory) -> Result<Vec<Candidate>> {
        let retriever = self.retriever;
        let candidates: Vec<Candidate> = match category {
            HeadCategory::Branch => {
                if retriever.config.needs_pull_request_sources() && self.sources.is_none() {
                    let sources = pull_request_sources(self.pull_requests()?);
                    self.sources = Some(sources);
                }
                retriever
                    .client
                    .list_branches(retriever.repository)?
                    .into_iter()
                    .map(|r| retriever.branch(r))
                    .collect()
            }
            HeadCategory::Tag => retriever
                .client
                .list_tags(retriever.repository)?
                .into_iter()
                .map(|r| retriever.tag(r))
                .collect(),
            HeadCategory::PullRequest => {
                let listed = self.pull_requests.take();
                let listed = match listed {
                    Some(listed) => listed,
                    None => retriever.client.list_pull_requests(retriever.repository)?,
                };
                listed.into_iter().map(|pr| retriever.pull_request(pr)).collect()
            }
        };
        debug!("Loaded {} {} of {}", candidates.len(), category, retriever.repository);
        Ok(candidates)
    }
}

impl Iterator for Candidates<'_, '_> {
    type Item = Result<Candidate>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            if let Some(candidate) = self.current.next() {
                let empty = HashSet::new();
                let sources = self.sources.as_ref().unwrap_or(&empty);
                match self.retriever.config.decorate_candidate(candidate, sources) {
                    Some(candidate) => return Some(Ok(candidate)),
                    None => continue,
                }
            }

            let category = self.pending.pop_front()?;
            let loaded = self
                .retriever
                .cancel
                .check()
                .and_then(|()| self.load(category));
            match loaded {
                Ok(candidates) => self.current = candidates.into_iter(),
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
