use clap::{Parser, Subcommand, ValueEnum};
use headsync_core::ports::SourceConfig;
use headsync_core::EventType;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "headsync")]
#[command(about = "Discover branches, tags and pull requests of a repository and keep track of them")]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Server base url (overrides config)
    #[arg(long)]
    pub server_url: Option<String>,

    /// Repository as namespace/name (overrides config)
    #[arg(long)]
    pub repository: Option<String>,

    /// File the known heads are stored in (overrides config)
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Directory holding the repository mirrors
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum CliCommand {
    /// Synchronize the known heads with the server (the default)
    Sync {
        /// Refresh only this head, without pruning
        #[arg(long)]
        head: Option<String>,
    },

    /// React to a change notification for branches
    Event {
        #[arg(value_enum)]
        kind: CliEventType,

        /// Names of the changed branches
        #[arg(required = true)]
        branches: Vec<String>,
    },

    /// Print the checkout configuration of a known head
    Build { head: String },

    /// List the heads known from the last run
    Heads,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliEventType {
    Created,
    Updated,
    Removed,
}

impl From<CliEventType> for EventType {
    fn from(kind: CliEventType) -> Self {
        match kind {
            CliEventType::Created => EventType::Created,
            CliEventType::Updated => EventType::Updated,
            CliEventType::Removed => EventType::Removed,
        }
    }
}

impl CliArgs {
    /// Command to run; a bare invocation synchronizes everything
    pub fn command(&self) -> CliCommand {
        match &self.command {
            Some(CliCommand::Sync { head }) => CliCommand::Sync { head: head.clone() },
            Some(CliCommand::Event { kind, branches }) => CliCommand::Event {
                kind: *kind,
                branches: branches.clone(),
            },
            Some(CliCommand::Build { head }) => CliCommand::Build { head: head.clone() },
            Some(CliCommand::Heads) => CliCommand::Heads,
            None => CliCommand::Sync { head: None },
        }
    }

    /// Apply command line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut SourceConfig) {
        if let Some(server_url) = &self.server_url {
            config.server_url = server_url.clone();
        }
        if let Some(repository) = &self.repository {
            config.repository = repository.clone();
        }
        if let Some(state) = &self.state {
            config.state_file = Some(state.clone());
        }
        if config.id.trim().is_empty() && !config.repository.trim().is_empty() {
            config.id = config.repository.replace('/', "-");
        }
    }
}
