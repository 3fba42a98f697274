use anyhow::{bail, Result};
use git2::{
    Cred, CredentialType, ErrorClass, ErrorCode, FetchOptions, FetchPrune, ObjectType, Oid,
    RemoteCallbacks, Repository as GitRepository,
};
use headsync_core::ports::{
    Authentication, OutgoingRequest, Probe, ProbeTarget, RemoteError, RemotePullRequest, RemoteRef,
    RemoteRepository, RemoteRepositoryClient,
};
use headsync_core::{LinkBuilder, NamespaceAndName};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

const FETCH_REFSPECS: [&str; 2] = ["+refs/heads/*:refs/heads/*", "+refs/tags/*:refs/tags/*"];

/// Remote client that mirrors git repositories with git2 and answers
/// listings and probes from the local mirror.
///
/// Repositories live at `<server>/repo/<namespace>/<name>`, the same address
/// used as clone url. Plain git has no pull requests, so none are reported.
pub struct GitMirrorClient {
    server_url: String,
    cache_dir: PathBuf,
    auth: Arc<dyn Authentication>,
    /// Serializes fetches into the mirrors
    fetch_lock: Mutex<()>,
}

impl GitMirrorClient {
    pub fn new(
        server_url: impl Into<String>,
        cache_dir: impl AsRef<Path>,
        auth: Arc<dyn Authentication>,
    ) -> Result<Self> {
        let server_url = server_url.into();
        if !is_supported_url(&server_url) {
            bail!("Unsupported server url '{}': expected http(s), ssh, git, file or an absolute path", server_url);
        }
        Ok(Self {
            server_url,
            cache_dir: cache_dir.as_ref().to_path_buf(),
            auth,
            fetch_lock: Mutex::new(()),
        })
    }

    fn remote_url(&self, repository: &NamespaceAndName) -> String {
        LinkBuilder::new(&self.server_url, repository.clone()).repo()
    }

    fn mirror_path(&self, repository: &NamespaceAndName) -> PathBuf {
        self.cache_dir
            .join(repository.namespace())
            .join(format!("{}.git", repository.name()))
    }

    fn open_mirror(&self, repository: &NamespaceAndName) -> Result<GitRepository, RemoteError> {
        let path = self.mirror_path(repository);
        GitRepository::open_bare(&path).map_err(|err| {
            RemoteError::not_found(format!("mirror of {} at {}: {}", repository, path.display(), err.message()))
        })
    }

    /// Bring the mirror up to date with the server, creating it on first use
    fn refresh(&self, repository: &NamespaceAndName) -> Result<GitRepository, RemoteError> {
        let url = self.remote_url(repository);
        if let Some(local) = local_path(&url) {
            if !local.exists() {
                return Err(RemoteError::not_found(format!("repository {repository}")));
            }
        }

        let _guard = self.fetch_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let path = self.mirror_path(repository);
        let mirror = match GitRepository::open_bare(&path) {
            Ok(mirror) => mirror,
            Err(_) => {
                debug!("Creating mirror of {} at {}", repository, path.display());
                GitRepository::init_bare(&path)
                    .map_err(|err| RemoteError::transport(format!("cannot create mirror: {}", err.message())))?
            }
        };

        let mut request = OutgoingRequest::new(url.clone());
        self.auth.apply(&mut request);
        let headers: Vec<String> = request
            .headers()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        let header_refs: Vec<&str> = headers.iter().map(String::as_str).collect();

        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(single_attempt_credentials());

        // Branches and tags the server stopped advertising are dropped from the mirror
        let mut fetch_options = FetchOptions::new();
        fetch_options
            .remote_callbacks(callbacks)
            .custom_headers(&header_refs)
            .prune(FetchPrune::On);

        debug!("Fetching {} into {}", request.url(), path.display());
        {
            let mut remote = mirror.remote_anonymous(&url).map_err(fetch_error)?;
            remote
                .fetch(&FETCH_REFSPECS, Some(&mut fetch_options), None)
                .map_err(fetch_error)?;
        }

        Ok(mirror)
    }
}

impl RemoteRepositoryClient for GitMirrorClient {
    fn base_url(&self) -> &str {
        &self.server_url
    }

    fn get_repository(&self, repository: &NamespaceAndName) -> Result<RemoteRepository, RemoteError> {
        self.refresh(repository)?;
        Ok(RemoteRepository {
            namespace: repository.namespace().to_string(),
            name: repository.name().to_string(),
            vcs_type: "git".to_string(),
        })
    }

    fn list_branches(&self, repository: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError> {
        let mirror = self.refresh(repository)?;
        list_refs(&mirror, "refs/heads/")
    }

    fn list_tags(&self, repository: &NamespaceAndName) -> Result<Vec<RemoteRef>, RemoteError> {
        let mirror = self.refresh(repository)?;
        list_refs(&mirror, "refs/tags/")
    }

    fn list_pull_requests(
        &self,
        _repository: &NamespaceAndName,
    ) -> Result<Vec<RemotePullRequest>, RemoteError> {
        Ok(Vec::new())
    }

    fn get_branch(&self, repository: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError> {
        let mirror = self.refresh(repository)?;
        find_ref(&mirror, &format!("refs/heads/{name}"), name)
    }

    fn get_tag(&self, repository: &NamespaceAndName, name: &str) -> Result<RemoteRef, RemoteError> {
        let mirror = self.refresh(repository)?;
        find_ref(&mirror, &format!("refs/tags/{name}"), name)
    }

    fn get_pull_request(
        &self,
        repository: &NamespaceAndName,
        id: &str,
    ) -> Result<RemotePullRequest, RemoteError> {
        Err(RemoteError::not_found(format!("pull request {id} of {repository}")))
    }

    fn open_probe<'a>(
        &'a self,
        repository: &NamespaceAndName,
        target: &ProbeTarget,
    ) -> Result<Box<dyn Probe + 'a>, RemoteError> {
        let mirror = self.open_mirror(repository)?;
        let tree = match target {
            ProbeTarget::Revision(revision) => commit_tree(&mirror, revision)?,
            ProbeTarget::Merge { head, target_branch } => merge_tree(&mirror, head, target_branch)?,
        };
        Ok(Box::new(GitProbe {
            mirror,
            tree,
            target: target.clone(),
        }))
    }
}

/// Inspects one tree of a mirror
struct GitProbe {
    mirror: GitRepository,
    tree: Oid,
    target: ProbeTarget,
}

impl Probe for GitProbe {
    fn target(&self) -> &ProbeTarget {
        &self.target
    }

    fn exists(&self, path: &str) -> Result<bool, RemoteError> {
        let tree = self.mirror.find_tree(self.tree).map_err(content_error)?;
        match tree.get_path(Path::new(path)) {
            Ok(_) => Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => Ok(false),
            Err(err) => Err(content_error(err)),
        }
    }

    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, RemoteError> {
        let tree = self.mirror.find_tree(self.tree).map_err(content_error)?;
        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Ok(None),
            Err(err) => return Err(content_error(err)),
        };
        if entry.kind() != Some(ObjectType::Blob) {
            return Ok(None);
        }
        let blob = self.mirror.find_blob(entry.id()).map_err(content_error)?;
        Ok(Some(blob.content().to_vec()))
    }
}

fn list_refs(mirror: &GitRepository, prefix: &str) -> Result<Vec<RemoteRef>, RemoteError> {
    let mut refs = Vec::new();
    for reference in mirror.references().map_err(content_error)? {
        let reference = reference.map_err(content_error)?;
        let Some(name) = reference.name().and_then(|name| name.strip_prefix(prefix)) else {
            continue;
        };
        let name = name.to_string();
        // An unresolvable ref still shows up, with an empty revision
        let revision = match reference.peel_to_commit() {
            Ok(commit) => commit.id().to_string(),
            Err(err) => {
                warn!("Cannot resolve {}: {}", name, err.message());
                String::new()
            }
        };
        refs.push(RemoteRef::new(name, revision));
    }
    Ok(refs)
}

fn find_ref(mirror: &GitRepository, full_name: &str, name: &str) -> Result<RemoteRef, RemoteError> {
    let reference = mirror.find_reference(full_name).map_err(content_error)?;
    let commit = reference.peel_to_commit().map_err(content_error)?;
    Ok(RemoteRef::new(name, commit.id().to_string()))
}

fn commit_tree(mirror: &GitRepository, revision: &str) -> Result<Oid, RemoteError> {
    let oid = Oid::from_str(revision).map_err(content_error)?;
    let commit = mirror.find_commit(oid).map_err(content_error)?;
    Ok(commit.tree_id())
}

/// Tree of the head revision merged into the target branch, built in memory
fn merge_tree(mirror: &GitRepository, head: &str, target_branch: &str) -> Result<Oid, RemoteError> {
    let theirs = mirror
        .find_commit(Oid::from_str(head).map_err(content_error)?)
        .map_err(content_error)?;
    let ours = mirror
        .find_reference(&format!("refs/heads/{target_branch}"))
        .and_then(|reference| reference.peel_to_commit())
        .map_err(content_error)?;

    let mut index = mirror.merge_commits(&ours, &theirs, None).map_err(content_error)?;
    if index.has_conflicts() {
        return Err(RemoteError::not_found(format!(
            "conflict free merge of {head} into {target_branch}"
        )));
    }
    index.write_tree_to(mirror).map_err(content_error)
}

/// Failures reaching the server are transport failures; a missing repository is not
fn fetch_error(err: git2::Error) -> RemoteError {
    let missing = err.code() == ErrorCode::NotFound
        || (err.class() == ErrorClass::Http
            && err.code() != ErrorCode::Auth
            && err.message().contains("404"));
    if missing {
        RemoteError::not_found(err.message())
    } else {
        RemoteError::transport(err.message())
    }
}

/// Credentials callback that answers every credential type once.
///
/// libgit2 asks again after the server rejected an answer; repeating the same
/// agent key would never end, so the second request fails the fetch.
fn single_attempt_credentials(
) -> impl FnMut(&str, Option<&str>, CredentialType) -> Result<Cred, git2::Error> {
    let mut attempted = false;
    move |_url: &str, username: Option<&str>, allowed: CredentialType| {
        if allowed.contains(CredentialType::USERNAME) {
            return Cred::username(username.unwrap_or("git"));
        }
        if attempted {
            return Err(git2::Error::from_str("authentication was rejected by the server"));
        }
        attempted = true;
        if allowed.contains(CredentialType::SSH_KEY) {
            Cred::ssh_key_from_agent(username.unwrap_or("git"))
        } else {
            Cred::default()
        }
    }
}

/// Failures reading from the mirror mean the content is not there
fn content_error(err: git2::Error) -> RemoteError {
    match err.class() {
        ErrorClass::Net | ErrorClass::Http | ErrorClass::Ssh | ErrorClass::Ssl | ErrorClass::Os => {
            RemoteError::transport(err.message())
        }
        _ => RemoteError::not_found(err.message()),
    }
}

/// Filesystem location of a server reached without a network transport
fn local_path(url: &str) -> Option<&Path> {
    let path = Path::new(url.strip_prefix("file://").unwrap_or(url));
    path.is_absolute().then_some(path)
}

fn is_supported_url(url: &str) -> bool {
    ["http://", "https://", "ssh://", "git://", "file://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
        || Path::new(url).is_absolute()
}
