use crate::app::build::{BuildContext, BuildTargetConfig, BuildTargetRegistry};
use crate::app::request::{SyncReport, SynchronizationRequest};
use crate::app::retriever::Retriever;
use crate::behavior::{configure, default_behaviors, is_category_behavior_enabled, DiscoveryBehavior, RequestConfig};
use crate::cancel::CancellationToken;
use crate::domain::events::HeadEvent;
use crate::domain::head::{Candidate, CloneInformation, Head, HeadCategory, Revision};
use crate::domain::link::LinkBuilder;
use crate::domain::repo::RepositoryIdentity;
use crate::error::Result;
use crate::ports::observer::{Criteria, HeadObserver};
use crate::ports::remote::{Probe, RemoteRepositoryClient};
use std::sync::Arc;
use tracing::{debug, info};

/// Discovers the heads of one remote repository and turns accepted heads into
/// checkout configurations.
///
/// The remote client, the build provider registry and the behavior list are
/// all handed in; nothing is looked up from global state.
pub struct HeadSource {
    identity: RepositoryIdentity,
    credentials_id: Option<String>,
    behaviors: Vec<DiscoveryBehavior>,
    client: Arc<dyn RemoteRepositoryClient>,
    registry: Arc<BuildTargetRegistry>,
}

impl HeadSource {
    pub fn new(
        identity: RepositoryIdentity,
        client: Arc<dyn RemoteRepositoryClient>,
        registry: Arc<BuildTargetRegistry>,
    ) -> Self {
        Self {
            identity,
            credentials_id: None,
            behaviors: default_behaviors(),
            client,
            registry,
        }
    }

    pub fn with_behaviors(mut self, behaviors: Vec<DiscoveryBehavior>) -> Self {
        self.behaviors = behaviors;
        self
    }

    pub fn with_credentials_id(mut self, credentials_id: Option<String>) -> Self {
        self.credentials_id = credentials_id;
        self
    }

    pub fn identity(&self) -> &RepositoryIdentity {
        &self.identity
    }

    pub fn behaviors(&self) -> &[DiscoveryBehavior] {
        &self.behaviors
    }

    pub fn credentials_id(&self) -> Option<&str> {
        self.credentials_id.as_deref()
    }

    /// Ask the server for the repository type once; later calls are served from cache
    pub fn resolve_type(&self) -> Result<&str> {
        self.identity.resolve_type(self.client.as_ref())
    }

    /// Clone information of the origin repository
    pub fn clone_information(&self) -> Result<CloneInformation> {
        let vcs_type = self.resolve_type()?;
        Ok(CloneInformation::new(vcs_type, self.identity.clone_url()))
    }

    pub fn link_builder(&self) -> LinkBuilder {
        self.identity.link_builder()
    }

    fn request_config(&self) -> RequestConfig {
        configure(RequestConfig::default(), &self.behaviors)
    }

    /// Categories the repository type can carry. A type without a provider
    /// keeps every category; it only fails once something is built.
    fn supported_categories(&self, vcs_type: &str) -> Vec<HeadCategory> {
        match self.registry.resolve(vcs_type) {
            Ok(provider) => HeadCategory::ALL
                .into_iter()
                .filter(|category| provider.is_supported(*category))
                .collect(),
            Err(_) => HeadCategory::ALL.to_vec(),
        }
    }

    /// Synchronize the observer with the server.
    ///
    /// A single included head outside of a removal event is looked up on its
    /// own and never prunes. Otherwise every enabled category is listed, and
    /// heads the observer knew but the server no longer reports are removed.
    /// The listing completes before the observer hears anything, so a
    /// transport failure leaves the observer untouched.
    pub fn retrieve(
        &self,
        criteria: Option<&dyn Criteria>,
        observer: &mut dyn HeadObserver,
        event: Option<&HeadEvent>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let clone = self.clone_information()?;
        let categories = self.supported_categories(clone.vcs_type());
        let config = self.request_config();

        let retriever = Retriever::new(
            self.client.as_ref(),
            self.identity.repository(),
            clone,
            &config,
            cancel,
        )
        .with_categories(categories);

        let mut request =
            SynchronizationRequest::new(criteria, observer, event, cancel.clone());

        let candidates: Vec<Candidate> = match request.targeted_head() {
            Some(head) => {
                info!("Refreshing {} of {}", head.name(), self.identity);
                retriever.specific_candidates(&head)?
            }
            None => {
                info!(
                    "Scanning {} of {}",
                    describe(retriever.categories()),
                    self.identity
                );
                let candidates = retriever.all_candidates().collect::<Result<Vec<_>>>()?;
                request.prepare_for_full_scan(&candidates);
                candidates
            }
        };

        for candidate in &candidates {
            if request.process(candidate, |candidate| retriever.probe(candidate))? {
                debug!("Observer has seen enough, stopping after {}", candidate.head());
                break;
            }
        }

        let report = request.close();
        info!(
            "Synchronized {}: {} matched, {} removed",
            self.identity,
            report.matched(),
            report.removed.len()
        );
        Ok(report)
    }

    /// Probe content of a discovered head, e.g. before building it
    pub fn create_probe(&self, head: &Head, revision: &Revision) -> Result<Box<dyn Probe + '_>> {
        let target = self.request_config().probe_target(head, revision);
        Ok(self
            .client
            .open_probe(self.identity.repository(), &target)?)
    }

    /// Checkout configuration for a previously discovered head
    pub fn build(&self, head: &Head, revision: Option<&Revision>) -> Result<BuildTargetConfig> {
        let link_builder = self.link_builder();
        let context = BuildContext {
            link_builder: &link_builder,
            head,
            revision,
            credentials_id: self.credentials_id(),
        };
        let builder = self.registry.create(&context)?;
        let builder = self
            .behaviors
            .iter()
            .fold(builder, |builder, behavior| behavior.decorate_build(builder));
        Ok(builder.build())
    }

    /// Whether the category is enabled by a behavior and the repository type
    /// supports it. Without a behavior the server is not asked.
    pub fn is_category_enabled(&self, category: HeadCategory) -> Result<bool> {
        if !is_category_behavior_enabled(&self.behaviors, category) {
            return Ok(false);
        }
        let vcs_type = self.resolve_type()?;
        Ok(self.registry.resolve(vcs_type)?.is_supported(category))
    }
}

fn describe(categories: &[HeadCategory]) -> String {
    if categories.is_empty() {
        return "no categories".to_string();
    }
    categories
        .iter()
        .map(|category| category.display_name().to_lowercase())
        .collect::<Vec<_>>()
        .join(", ")
}
