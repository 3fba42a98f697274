use anyhow::{Context, Result};
use headsync_core::app::{BuildTargetConfig, Command, HeadProjection, HeadSource, SyncReport};
use headsync_core::cancel::CancellationToken;
use headsync_core::ports::{Criteria, HeadObserver, HeadStore, Includes, StoredHead};
use headsync_core::{Head, HeadEvent};
use std::sync::Arc;
use tracing::info;

/// Result of a handled command
#[derive(Debug)]
pub enum CommandOutcome {
    Synchronized(SyncReport),
    Built(BuildTargetConfig),
}

/// Runs commands against one head source and persists what it learned.
///
/// Remote access is blocking, so every command runs on the blocking pool.
pub struct SyncService {
    // Ports (dependency injection)
    source: Arc<HeadSource>,
    head_store: Arc<dyn HeadStore>,
    criteria: Option<Arc<dyn Criteria>>,

    cancel: CancellationToken,
}

impl SyncService {
    pub fn new(source: Arc<HeadSource>, head_store: Arc<dyn HeadStore>) -> Self {
        Self {
            source,
            head_store,
            criteria: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_criteria(mut self, criteria: Arc<dyn Criteria>) -> Self {
        self.criteria = Some(criteria);
        self
    }

    /// Token that aborts the running synchronization when cancelled
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Heads known from the last run
    pub async fn known_heads(&self) -> Result<Vec<StoredHead>> {
        let store = self.head_store.clone();
        tokio::task::spawn_blocking(move || store.load_heads())
            .await
            .context("Head store task panicked")?
    }

    /// Resolve a head by name: a known head keeps its category, anything else
    /// is taken to be a branch of the repository
    pub async fn head_named(&self, name: &str) -> Result<Head> {
        let known = self.known_heads().await?;
        if let Some(stored) = known.into_iter().find(|stored| stored.head.name() == name) {
            return Ok(stored.head);
        }

        let source = self.source.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || -> Result<Head> {
            let clone = source.clone_information()?;
            Ok(Head::branch(clone, name))
        })
        .await
        .context("Type resolution task panicked")?
    }

    /// Handle a command (CQRS Command side)
    pub async fn handle_command(&self, cmd: Command) -> Result<CommandOutcome> {
        match cmd {
            Command::FullScan => {
                info!("Starting full scan of {}", self.source.identity());
                self.synchronize(Includes::All, None).await
            }
            Command::Refresh { head } => {
                info!("Refreshing {}", head);
                self.synchronize(Includes::Only(vec![head]), None).await
            }
            Command::HandleEvent { event } => {
                info!("Handling {:?} event for {} heads", event.event_type(), event.heads().len());
                let includes = match event.heads() {
                    [head] => Includes::Only(vec![head.clone()]),
                    _ => Includes::All,
                };
                self.synchronize(includes, Some(event)).await
            }
            Command::Build { head } => {
                info!("Building {}", head);
                self.build(head).await
            }
        }
    }

    async fn synchronize(
        &self,
        includes: Includes,
        event: Option<HeadEvent>,
    ) -> Result<CommandOutcome> {
        let source = self.source.clone();
        let store = self.head_store.clone();
        let criteria = self.criteria.clone();
        let cancel = self.cancel.clone();

        let report = tokio::task::spawn_blocking(move || -> Result<SyncReport> {
            let stored = store.load_heads()?;
            let mut projection = HeadProjection::from_stored(stored).with_includes(includes);

            let report = source.retrieve(
                criteria.as_deref(),
                &mut projection,
                event.as_ref(),
                &cancel,
            )?;

            store.save_heads(&projection.stored())?;
            Ok(report)
        })
        .await
        .context("Synchronization task panicked")??;

        Ok(CommandOutcome::Synchronized(report))
    }

    async fn build(&self, head: Head) -> Result<CommandOutcome> {
        let source = self.source.clone();
        let store = self.head_store.clone();

        let config = tokio::task::spawn_blocking(move || -> Result<BuildTargetConfig> {
            let projection = HeadProjection::from_stored(store.load_heads()?);
            let known = projection
                .known_heads()
                .into_iter()
                .find(|candidate| *candidate == head)
                .with_context(|| format!("Head {head} is not known, run a scan first"))?;

            Ok(source.build(&known, projection.revision(&known))?)
        })
        .await
        .context("Build task panicked")??;

        Ok(CommandOutcome::Built(config))
    }
}
