//! Build-target resolution.
//!
//! Maps the version control type of a repository to the provider that knows
//! how to check out heads of that type. Providers are registered explicitly
//! at startup; a type without a provider cannot be built at all.

use crate::behavior::MergeStrategy;
use crate::domain::head::{Head, HeadCategory, HeadKind, Revision};
use crate::domain::link::LinkBuilder;
use crate::error::{CoreError, Result};
use crate::ports::remote::RemoteRepository;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Version control systems a checkout can be configured for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VcsKind {
    Git,
    Mercurial,
    Subversion,
}

impl VcsKind {
    pub const ALL: [VcsKind; 3] = [Self::Git, Self::Mercurial, Self::Subversion];

    /// Type string the server uses for this kind
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Mercurial => "hg",
            Self::Subversion => "svn",
        }
    }

    pub fn from_type(vcs_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name().eq_ignore_ascii_case(vcs_type))
    }
}

impl std::fmt::Display for VcsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Everything a provider needs to configure the checkout of one head
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub link_builder: &'a LinkBuilder,
    pub head: &'a Head,
    pub revision: Option<&'a Revision>,
    pub credentials_id: Option<&'a str>,
}

/// Creates checkout builders for one version control type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildTargetProvider {
    kind: VcsKind,
    display_name: String,
    categories: Vec<HeadCategory>,
}

impl BuildTargetProvider {
    pub fn new(kind: VcsKind, display_name: impl Into<String>, categories: Vec<HeadCategory>) -> Self {
        Self {
            kind,
            display_name: display_name.into(),
            categories,
        }
    }

    pub fn git() -> Self {
        Self::new(VcsKind::Git, "Git", HeadCategory::ALL.to_vec())
    }

    pub fn mercurial() -> Self {
        Self::new(
            VcsKind::Mercurial,
            "Mercurial",
            vec![HeadCategory::Branch, HeadCategory::Tag],
        )
    }

    pub fn subversion() -> Self {
        Self::new(VcsKind::Subversion, "Subversion", vec![HeadCategory::Branch])
    }

    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn vcs_type(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Whether heads of the category can be built with this type
    pub fn is_supported(&self, category: HeadCategory) -> bool {
        self.categories.contains(&category)
    }

    pub fn create(&self, context: &BuildContext<'_>) -> BuildTargetBuilder {
        BuildTargetBuilder {
            kind: self.kind,
            head: context.head.clone(),
            revision: context.revision.map(|revision| revision.marker().to_string()),
            clone_url: context.head.clone_information().url().to_string(),
            credentials_id: context.credentials_id.map(str::to_string),
            browser_url: context.link_builder.head(context.head),
            merge_strategy: MergeStrategy::Head,
            shallow_depth: None,
            clean: false,
        }
    }
}

/// Capability table from version control kind to provider
#[derive(Debug, Clone, Default)]
pub struct BuildTargetRegistry {
    providers: BTreeMap<VcsKind, BuildTargetProvider>,
}

impl BuildTargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with git, mercurial and subversion providers
    pub fn with_defaults() -> Self {
        Self::new()
            .register(BuildTargetProvider::git())
            .register(BuildTargetProvider::mercurial())
            .register(BuildTargetProvider::subversion())
    }

    /// Add a provider, replacing any earlier one for the same kind
    pub fn register(mut self, provider: BuildTargetProvider) -> Self {
        self.providers.insert(provider.kind(), provider);
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &BuildTargetProvider> {
        self.providers.values()
    }

    /// Provider for a type string, matched case-insensitively
    pub fn resolve(&self, vcs_type: &str) -> Result<&BuildTargetProvider> {
        VcsKind::from_type(vcs_type)
            .and_then(|kind| self.providers.get(&kind))
            .ok_or_else(|| CoreError::UnsupportedType {
                vcs_type: vcs_type.to_string(),
            })
    }

    /// Whether the repository can be offered at all
    pub fn is_supported(&self, repository: &RemoteRepository) -> bool {
        self.resolve(&repository.vcs_type).is_ok()
    }

    /// Builder for the head, chosen by the type in its clone information
    pub fn create(&self, context: &BuildContext<'_>) -> Result<BuildTargetBuilder> {
        let provider = self.resolve(context.head.clone_information().vcs_type())?;
        Ok(provider.create(context))
    }

    pub fn display_name(&self) -> String {
        let types: Vec<&str> = self.providers().map(BuildTargetProvider::vcs_type).collect();
        format!("SCM-Manager ({})", types.join(", "))
    }
}

/// Checkout configuration under construction; behaviors decorate it before [`Self::build`]
#[derive(Debug, Clone)]
pub struct BuildTargetBuilder {
    kind: VcsKind,
    head: Head,
    revision: Option<String>,
    clone_url: String,
    credentials_id: Option<String>,
    browser_url: String,
    merge_strategy: MergeStrategy,
    shallow_depth: Option<u32>,
    clean: bool,
}

impl BuildTargetBuilder {
    pub fn kind(&self) -> VcsKind {
        self.kind
    }

    pub fn with_merge_strategy(mut self, strategy: MergeStrategy) -> Self {
        self.merge_strategy = strategy;
        self
    }

    pub fn with_shallow_depth(mut self, depth: Option<u32>) -> Self {
        self.shallow_depth = depth;
        self
    }

    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn build(self) -> BuildTargetConfig {
        let checkout = match self.kind {
            VcsKind::Git => self.git_checkout(),
            VcsKind::Mercurial => self.mercurial_checkout(),
            VcsKind::Subversion => {
                if self.shallow_depth.is_some() || self.clean {
                    debug!("Clone options are ignored for subversion checkouts");
                }
                Checkout::Subversion {
                    path: self.head.name().to_string(),
                }
            }
        };

        BuildTargetConfig {
            vcs: self.kind,
            head: self.head.name().to_string(),
            clone_url: self.clone_url,
            credentials_id: self.credentials_id,
            revision: self.revision,
            browser_url: self.browser_url,
            checkout,
        }
    }

    fn git_checkout(&self) -> Checkout {
        let (refspecs, reference, merge_target) = match self.head.kind() {
            HeadKind::Branch => (vec![branch_refspec(self.head.name())], self.head.name(), None),
            HeadKind::Tag => (
                vec![format!("+refs/tags/{0}:refs/tags/{0}", self.head.name())],
                self.head.name(),
                None,
            ),
            HeadKind::PullRequest(pr) => match self.merge_strategy {
                MergeStrategy::Head => (vec![branch_refspec(pr.source())], pr.source(), None),
                MergeStrategy::Merge => (
                    vec![branch_refspec(pr.source()), branch_refspec(pr.target())],
                    pr.source(),
                    Some(pr.target().to_string()),
                ),
            },
        };

        Checkout::Git {
            refspecs,
            reference: reference.to_string(),
            merge_target,
            shallow_depth: self.shallow_depth,
            clean: self.clean,
        }
    }

    fn mercurial_checkout(&self) -> Checkout {
        if self.shallow_depth.is_some() {
            debug!("Shallow clones are not supported for mercurial, ignoring depth");
        }
        let branch = match self.head.kind() {
            HeadKind::Branch => Some(self.head.name().to_string()),
            HeadKind::Tag => None,
            HeadKind::PullRequest(pr) => Some(pr.source().to_string()),
        };
        Checkout::Mercurial {
            branch,
            clean: self.clean,
        }
    }
}

fn branch_refspec(branch: &str) -> String {
    format!("+refs/heads/{0}:refs/remotes/origin/{0}", branch)
}

/// Type-specific part of a checkout configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "vcs", rename_all = "kebab-case")]
pub enum Checkout {
    Git {
        refspecs: Vec<String>,
        reference: String,
        merge_target: Option<String>,
        shallow_depth: Option<u32>,
        clean: bool,
    },
    Mercurial {
        branch: Option<String>,
        clean: bool,
    },
    Subversion {
        path: String,
    },
}

/// Everything an external builder needs to check out an accepted head
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTargetConfig {
    pub vcs: VcsKind,
    pub head: String,
    pub clone_url: String,
    pub credentials_id: Option<String>,
    pub revision: Option<String>,
    pub browser_url: String,
    pub checkout: Checkout,
}
