use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const DEFAULT_THRESHOLD: u8 = 85;
pub const DEFAULT_SEASON: u32 = 1;
pub const DEFAULT_OFFSET: i64 = 0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("threshold must be between 1 and 100, got {0}")]
    Threshold(u8),
    #[error("at least one valid extension is required")]
    NoExtensions,
    #[error("destination must not be empty")]
    NoDestination,
    #[error("invalid mode `{0}`, expected an octal string such as `755`")]
    Mode(String),
    #[error("invalid show name `{0}`, it must be usable as a directory name")]
    ShowName(String),
    #[error("show `{show}` declares an empty alias")]
    EmptyAlias { show: String },
    #[error("alias `{alias}` is claimed by both `{first}` and `{second}`")]
    AliasCollision {
        alias: String,
        first: String,
        second: String,
    },
}

/// Owner and permission bits applied to relocated files and created
/// directories.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
    pub mode: String,
}

impl Ownership {
    pub fn mode_bits(&self) -> Result<u32, ConfigError> {
        match u32::from_str_radix(self.mode.trim(), 8) {
            Ok(bits) if bits <= 0o7777 => Ok(bits),
            _ => Err(ConfigError::Mode(self.mode.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub valid_extensions: Vec<String>,
    pub destination: PathBuf,
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_clean")]
    pub clean: bool,
    #[serde(default)]
    pub user: Option<Ownership>,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_clean() -> bool {
    true
}

/// Per-show overrides. Every field is optional; a `null` entry in the
/// document is the same as an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ShowDefinition {
    pub season: Option<u32>,
    #[serde(alias = "episode_offset")]
    pub offset: Option<i64>,
    pub names: Vec<String>,
    pub tmdb_id: Option<i32>,
}

impl ShowDefinition {
    pub fn season(&self) -> u32 {
        self.season.unwrap_or(DEFAULT_SEASON)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(DEFAULT_OFFSET)
    }
}

#[derive(Debug, Deserialize)]
struct Document {
    config: Settings,
    #[serde(default)]
    shows: Option<BTreeMap<String, Option<ShowDefinition>>>,
}

/// Validated configuration, loaded once per run and shared read-only with
/// every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub settings: Settings,
    pub shows: BTreeMap<String, ShowDefinition>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let document: Document = serde_yaml::from_str(contents)?;
        let shows = document
            .shows
            .unwrap_or_default()
            .into_iter()
            .map(|(name, show)| (name, show.unwrap_or_default()))
            .collect();

        let mut config = Self {
            settings: document.config,
            shows,
        };
        config.settings.valid_extensions = config
            .settings
            .valid_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let settings = &self.settings;
        if !(1..=100).contains(&settings.threshold) {
            return Err(ConfigError::Threshold(settings.threshold));
        }
        if settings.valid_extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        if settings.destination.as_os_str().is_empty() {
            return Err(ConfigError::NoDestination);
        }
        if let Some(user) = &settings.user {
            user.mode_bits()?;
        }

        for (name, show) in &self.shows {
            // Show names become directory names and file name prefixes under
            // the destination, so they must survive sanitizing unchanged.
            let trimmed = name.trim();
            if trimmed.is_empty()
                || trimmed == "."
                || trimmed == ".."
                || name.contains(['/', '\\'])
                || sanitize_filename::sanitize(name) != *name
            {
                return Err(ConfigError::ShowName(name.clone()));
            }
            if show.names.iter().any(|alias| alias.trim().is_empty()) {
                return Err(ConfigError::EmptyAlias { show: name.clone() });
            }
        }
        Ok(())
    }

    pub fn show(&self, name: &str) -> Option<&ShowDefinition> {
        self.shows.get(name)
    }
}
