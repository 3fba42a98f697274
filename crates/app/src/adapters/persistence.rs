use anyhow::{Context, Result};
use directories::ProjectDirs;
use headsync_core::ports::{ConfigStore, HeadStore, SourceConfig, StoredHead};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File-based configuration store that implements ConfigStore
pub struct FileConfigStore {
    config_path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Result<Self> {
        let config_path = Self::get_default_config_path()?;
        Ok(Self { config_path })
    }

    pub fn with_path<P: AsRef<Path>>(config_path: P) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn get_default_config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("headsync.toml"))
    }

    /// Create default config if it doesn't exist
    fn ensure_config_exists(&self, default_config: &SourceConfig) -> Result<()> {
        if !self.config_path.exists() {
            if let Some(parent) = self.config_path.parent() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
            debug!("Writing default config to {}", self.config_path.display());
            self.save(default_config)?;
        }
        Ok(())
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<SourceConfig> {
        self.ensure_config_exists(&SourceConfig::default())?;

        let contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file: {}", self.config_path.display()))?;

        let config: SourceConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", self.config_path.display()))?;

        Ok(config)
    }

    fn save(&self, config: &SourceConfig) -> Result<()> {
        let contents = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;

        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write config file: {}", self.config_path.display()))?;

        Ok(())
    }
}

/// On-disk layout of the head store
#[derive(Debug, Default, Serialize, Deserialize)]
struct HeadFile {
    version: u32,
    #[serde(default)]
    heads: Vec<StoredHead>,
}

/// Keeps the heads seen by the last run in a TOML file, so removals are
/// detected across invocations
pub struct FileHeadStore {
    state_path: PathBuf,
}

impl FileHeadStore {
    pub fn with_path<P: AsRef<Path>>(state_path: P) -> Self {
        Self {
            state_path: state_path.as_ref().to_path_buf(),
        }
    }

    /// Store under the platform data directory, one file per source id
    pub fn for_source(id: &str) -> Result<Self> {
        let proj_dirs = project_dirs()?;
        Ok(Self::with_path(proj_dirs.data_dir().join(format!("{id}.heads.toml"))))
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }
}

impl HeadStore for FileHeadStore {
    fn load_heads(&self) -> Result<Vec<StoredHead>> {
        if !self.state_path.exists() {
            debug!("No head store at {}, starting empty", self.state_path.display());
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.state_path)
            .with_context(|| format!("Failed to read head store: {}", self.state_path.display()))?;
        let file: HeadFile = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse head store: {}", self.state_path.display()))?;

        Ok(file.heads)
    }

    fn save_heads(&self, heads: &[StoredHead]) -> Result<()> {
        if let Some(parent) = self.state_path.parent() {
            fs::create_dir_all(parent).context("Failed to create head store directory")?;
        }

        let file = HeadFile {
            version: 1,
            heads: heads.to_vec(),
        };
        let contents = toml::to_string_pretty(&file).context("Failed to serialize heads to TOML")?;

        fs::write(&self.state_path, contents)
            .with_context(|| format!("Failed to write head store: {}", self.state_path.display()))?;

        Ok(())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", "headsync").context("Failed to determine project directories")
}
