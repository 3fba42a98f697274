//! Discovery behaviors.
//!
//! A behavior is a piece of configuration that enables a head category and/or
//! shapes how a synchronization run retrieves, filters and probes heads, and
//! how the build target is assembled. Behaviors are applied in declaration
//! order as pure transformations, so a later behavior overrides what an
//! earlier one wired up.

use crate::app::build::BuildTargetBuilder;
use crate::domain::head::{Candidate, CloneInformation, Head, HeadCategory, Revision};
use crate::ports::remote::ProbeTarget;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Which revision of a pull request is probed and built
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// The pull request's own head revision
    #[default]
    Head,
    /// The pull request merged into its target branch
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DiscoveryBehavior {
    BranchDiscovery,
    TagDiscovery,
    PullRequestDiscovery {
        #[serde(default)]
        exclude_branches_with_pull_requests: bool,
    },
    PullRequestStrategy {
        strategy: MergeStrategy,
    },
    /// Clone pull requests from their fork instead of the origin
    ForkCloneUrl,
    CloneOptions {
        #[serde(default)]
        shallow_depth: Option<u32>,
        #[serde(default)]
        clean: bool,
    },
}

/// Behaviors used when nothing is configured
pub fn default_behaviors() -> Vec<DiscoveryBehavior> {
    vec![
        DiscoveryBehavior::BranchDiscovery,
        DiscoveryBehavior::PullRequestDiscovery {
            exclude_branches_with_pull_requests: false,
        },
    ]
}

impl DiscoveryBehavior {
    /// The head category this behavior enables, if any
    pub fn category(&self) -> Option<HeadCategory> {
        match self {
            Self::BranchDiscovery => Some(HeadCategory::Branch),
            Self::TagDiscovery => Some(HeadCategory::Tag),
            Self::PullRequestDiscovery { .. } => Some(HeadCategory::PullRequest),
            Self::PullRequestStrategy { .. } | Self::ForkCloneUrl | Self::CloneOptions { .. } => {
                None
            }
        }
    }

    pub fn decorate_request(&self, config: RequestConfig) -> RequestConfig {
        match self {
            Self::BranchDiscovery => RequestConfig {
                fetch_branches: true,
                ..config
            },
            Self::TagDiscovery => RequestConfig {
                fetch_tags: true,
                ..config
            },
            Self::PullRequestDiscovery {
                exclude_branches_with_pull_requests,
            } => RequestConfig {
                fetch_pull_requests: true,
                exclude_branches_with_pull_requests: *exclude_branches_with_pull_requests,
                ..config
            },
            Self::PullRequestStrategy { strategy } => RequestConfig {
                merge_strategy: *strategy,
                ..config
            },
            Self::ForkCloneUrl => RequestConfig {
                prefer_fork_url: true,
                ..config
            },
            Self::CloneOptions { .. } => config,
        }
    }

    pub fn decorate_build(&self, builder: BuildTargetBuilder) -> BuildTargetBuilder {
        match self {
            Self::PullRequestStrategy { strategy } => builder.with_merge_strategy(*strategy),
            Self::CloneOptions {
                shallow_depth,
                clean,
            } => builder.with_shallow_depth(*shallow_depth).with_clean(*clean),
            _ => builder,
        }
    }
}

/// Whether any behavior enables the category
pub fn is_category_behavior_enabled(behaviors: &[DiscoveryBehavior], category: HeadCategory) -> bool {
    behaviors.iter().any(|b| b.category() == Some(category))
}

/// Fold behaviors into a request configuration, in declaration order
pub fn configure(config: RequestConfig, behaviors: &[DiscoveryBehavior]) -> RequestConfig {
    behaviors
        .iter()
        .fold(config, |config, behavior| behavior.decorate_request(config))
}

/// What a synchronization run retrieves and how it treats candidates.
///
/// Starts with nothing enabled: a category without a behavior is never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestConfig {
    fetch_branches: bool,
    fetch_tags: bool,
    fetch_pull_requests: bool,
    exclude_branches_with_pull_requests: bool,
    merge_strategy: MergeStrategy,
    prefer_fork_url: bool,
}

impl RequestConfig {
    pub fn is_fetching(&self, category: HeadCategory) -> bool {
        match category {
            HeadCategory::Branch => self.fetch_branches,
            HeadCategory::Tag => self.fetch_tags,
            HeadCategory::PullRequest => self.fetch_pull_requests,
        }
    }

    /// Enabled categories, in the order they are enumerated
    pub fn categories(&self) -> Vec<HeadCategory> {
        HeadCategory::ALL
            .into_iter()
            .filter(|category| self.is_fetching(*category))
            .collect()
    }

    pub fn merge_strategy(&self) -> MergeStrategy {
        self.merge_strategy
    }

    /// Branch filtering needs the source branches of open pull requests
    pub fn needs_pull_request_sources(&self) -> bool {
        self.fetch_branches && self.fetch_pull_requests && self.exclude_branches_with_pull_requests
    }

    /// Veto or rewrite a freshly retrieved candidate.
    ///
    /// `pull_request_sources` holds the origin branches that are the source of
    /// an open pull request; it is only filled when
    /// [`Self::needs_pull_request_sources`] is true.
    pub fn decorate_candidate(
        &self,
        candidate: Candidate,
        pull_request_sources: &HashSet<String>,
    ) -> Option<Candidate> {
        let head = candidate.head();
        match head.category() {
            HeadCategory::Branch
                if self.needs_pull_request_sources() && pull_request_sources.contains(head.name()) =>
            {
                debug!("Excluding branch {} which is the source of a pull request", head.name());
                None
            }
            HeadCategory::PullRequest if self.prefer_fork_url => {
                let fork = head
                    .pull_request_details()
                    .and_then(|pr| pr.fork_url())
                    .map(|url| CloneInformation::new(head.clone_information().vcs_type(), url));
                match fork {
                    Some(clone) => Some(candidate.with_clone_information(clone)),
                    None => Some(candidate),
                }
            }
            _ => Some(candidate),
        }
    }

    /// Revision a probe for the head should resolve against
    pub fn probe_target(&self, head: &Head, revision: &Revision) -> ProbeTarget {
        match (head.pull_request_details(), self.merge_strategy) {
            (Some(pr), MergeStrategy::Merge) => ProbeTarget::Merge {
                head: revision.marker().to_string(),
                target_branch: pr.target().to_string(),
            },
            _ => ProbeTarget::Revision(revision.marker().to_string()),
        }
    }
}
