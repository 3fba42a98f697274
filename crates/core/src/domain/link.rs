use super::{
    head::{Head, HeadKind, Revision},
    repo::NamespaceAndName,
};

/// Builds browser links for a repository on the server.
///
/// The repository link doubles as the clone address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkBuilder {
    base_url: String,
    repository: NamespaceAndName,
}

impl LinkBuilder {
    pub fn new(base_url: &str, repository: NamespaceAndName) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            repository,
        }
    }

    pub fn repo(&self) -> String {
        format!(
            "{}/repo/{}/{}",
            self.base_url,
            self.repository.namespace(),
            self.repository.name()
        )
    }

    pub fn head(&self, head: &Head) -> String {
        match head.kind() {
            HeadKind::Branch | HeadKind::Tag => {
                format!("{}/code/sources/{}/", self.repo(), encode_segment(head.name()))
            }
            HeadKind::PullRequest(pr) => format!("{}/pull-request/{}/", self.repo(), pr.id()),
        }
    }

    pub fn revision(&self, revision: &Revision) -> String {
        format!("{}/code/changeset/{}", self.repo(), revision.marker())
    }
}

// Branch names may contain slashes which must not split the path
fn encode_segment(segment: &str) -> String {
    segment.replace('%', "%25").replace('/', "%2F")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::head::CloneInformation;

    fn builder() -> LinkBuilder {
        LinkBuilder::new("https://scm.example.com/scm/", NamespaceAndName::new("space", "demo"))
    }

    fn clone_info() -> CloneInformation {
        CloneInformation::new("git", "https://scm.example.com/scm/repo/space/demo")
    }

    #[test]
    fn test_repo_link() {
        assert_eq!(builder().repo(), "https://scm.example.com/scm/repo/space/demo");
    }

    #[test]
    fn test_branch_link_encodes_slashes() {
        let head = Head::branch(clone_info(), "feature/x");
        assert_eq!(
            builder().head(&head),
            "https://scm.example.com/scm/repo/space/demo/code/sources/feature%2Fx/"
        );
    }

    #[test]
    fn test_pull_request_and_revision_links() {
        let head = Head::pull_request(clone_info(), "42", "feature/x", "main");
        assert_eq!(
            builder().head(&head),
            "https://scm.example.com/scm/repo/space/demo/pull-request/42/"
        );

        let revision = Revision::new(head, "abc123");
        assert_eq!(
            builder().revision(&revision),
            "https://scm.example.com/scm/repo/space/demo/code/changeset/abc123"
        );
    }
}
