//! Composition root: wires configuration, adapters and the sync service

use anyhow::{Context, Result};
use directories::ProjectDirs;
use headsync_core::app::{BuildTargetRegistry, Command, HeadSource, SyncReport};
use headsync_core::cancel::CancellationToken;
use headsync_core::ports::{
    ConfigStore, FileExistsCriteria, HeadStore, RemoteRepositoryClient, SourceConfig,
};
use headsync_core::{HeadEvent, RepositoryIdentity};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::adapters::{
    auth,
    git::GitMirrorClient,
    persistence::{FileConfigStore, FileHeadStore},
};
use crate::cli::{CliArgs, CliCommand};
use crate::services::sync_service::{CommandOutcome, SyncService};

/// The application: one configured head source and its sync service
pub struct HeadSyncApp {
    config: SourceConfig,
    service: SyncService,
}

impl HeadSyncApp {
    /// Load configuration, apply command line overrides and wire the adapters
    pub fn new(args: &CliArgs) -> Result<Self> {
        let config_store: Arc<dyn ConfigStore> = match &args.config {
            Some(path) => Arc::new(FileConfigStore::with_path(path)),
            None => Arc::new(FileConfigStore::new()?),
        };

        let mut config = config_store.load()?;
        args.apply_overrides(&mut config);

        let cache_dir = match &args.cache_dir {
            Some(dir) => dir.clone(),
            None => default_cache_dir()?,
        };

        Self::from_config(config, &cache_dir)
    }

    /// This is the composition root - where dependency injection happens
    pub fn from_config(config: SourceConfig, cache_dir: &Path) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let authentication = auth::from_config(&config)?;
        let client: Arc<dyn RemoteRepositoryClient> = Arc::new(GitMirrorClient::new(
            config.server_url.clone(),
            cache_dir,
            authentication,
        )?);

        let identity = RepositoryIdentity::new(config.server_url.clone(), &config.repository)?;
        let source = HeadSource::new(identity, client, Arc::new(BuildTargetRegistry::with_defaults()))
            .with_behaviors(config.behaviors.clone())
            .with_credentials_id(config.credentials_id.clone());

        let head_store: Arc<dyn HeadStore> = match &config.state_file {
            Some(path) => Arc::new(FileHeadStore::with_path(path)),
            None => Arc::new(FileHeadStore::for_source(&config.id)?),
        };

        let mut service = SyncService::new(Arc::new(source), head_store);
        if let Some(path) = &config.required_file {
            service = service.with_criteria(Arc::new(FileExistsCriteria::new(path.clone())));
        }

        info!("Configured source {} for {}", config.id, config.repository);
        Ok(Self { config, service })
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }

    pub fn service(&self) -> &SyncService {
        &self.service
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.service.cancellation()
    }

    /// Run one command line command, writing its result to `out`
    pub async fn run(&self, command: CliCommand, out: &mut impl Write) -> Result<()> {
        match command {
            CliCommand::Sync { head: None } => {
                let outcome = self.service.handle_command(Command::FullScan).await?;
                write_outcome(out, &outcome)
            }
            CliCommand::Sync { head: Some(name) } => {
                let head = self.service.head_named(&name).await?;
                let outcome = self.service.handle_command(Command::Refresh { head }).await?;
                write_outcome(out, &outcome)
            }
            CliCommand::Event { kind, branches } => {
                let mut heads = Vec::with_capacity(branches.len());
                for name in &branches {
                    heads.push(self.service.head_named(name).await?);
                }
                let event = HeadEvent::new(kind.into(), heads);
                let outcome = self.service.handle_command(Command::HandleEvent { event }).await?;
                write_outcome(out, &outcome)
            }
            CliCommand::Build { head } => {
                let head = self.service.head_named(&head).await?;
                let outcome = self.service.handle_command(Command::Build { head }).await?;
                write_outcome(out, &outcome)
            }
            CliCommand::Heads => {
                for stored in self.service.known_heads().await? {
                    writeln!(
                        out,
                        "{}\t{}\t{}",
                        stored.head.category(),
                        stored.head.name(),
                        stored.revision.as_deref().unwrap_or("-")
                    )?;
                }
                Ok(())
            }
        }
    }
}

fn write_outcome(out: &mut impl Write, outcome: &CommandOutcome) -> Result<()> {
    match outcome {
        CommandOutcome::Synchronized(report) => write_report(out, report),
        CommandOutcome::Built(config) => {
            let rendered =
                toml::to_string_pretty(config).context("Failed to serialize build target to TOML")?;
            write!(out, "{rendered}")?;
            Ok(())
        }
    }
}

fn write_report(out: &mut impl Write, report: &SyncReport) -> Result<()> {
    for entry in &report.witness {
        writeln!(out, "{entry}")?;
    }
    for head in &report.removed {
        writeln!(out, "    {}: Removed", head.name())?;
    }
    writeln!(
        out,
        "{} matched, {} removed",
        report.matched(),
        report.removed.len()
    )?;
    Ok(())
}

fn default_cache_dir() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "headsync").context("Failed to determine project directories")?;
    Ok(proj_dirs.cache_dir().join("mirrors"))
}
