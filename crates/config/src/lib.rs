//! Configuration for locating the MIME database.
//!
//! Sources are layered, later ones overriding earlier ones:
//!
//! 1. built-in defaults (the XDG data directories)
//! 2. `config.toml` in the platform configuration directory
//! 3. `MIMER_`-prefixed environment variables (`MIMER_DATABASE=/path/to/mime.cache`)

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::{BaseDirs, ProjectDirs};
use exn::Exn;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Prefix of the environment variables read by [`Config::figment`].
pub const ENV_PREFIX: &str = "MIMER_";
/// Location of the cache relative to an XDG data directory.
pub const CACHE_FILE: &str = "mime/mime.cache";
const DEFAULT_DATA_DIRS: &str = "/usr/local/share:/usr/share";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Explicit database path. Skips the search when set.
    pub database: Option<PathBuf>,
    /// Candidate database files, in order of preference.
    pub search_paths: Vec<PathBuf>,
}

impl Config {
    /// Defaults for the current environment.
    pub fn defaults() -> Self {
        let data_home = BaseDirs::new().map(|dirs| dirs.data_dir().to_path_buf());
        let data_dirs = std::env::var("XDG_DATA_DIRS").ok();
        Self { database: None, search_paths: search_paths(data_home.as_deref(), data_dirs.as_deref()) }
    }

    /// The layered configuration sources.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::defaults()));
        if let Some(file) = config_file() {
            tracing::trace!(file = %file.display(), "Configuration file");
            figment = figment.merge(Toml::file(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load the configuration from every source.
    pub fn load() -> Result<Self> {
        Self::from_figment(Self::figment())
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment.extract().map_err(|e| Exn::from(ErrorKind::Invalid(e.to_string())))
    }

    /// The database to load: the explicit path if configured, otherwise the
    /// first search path that exists.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(database) = &self.database {
            return Ok(database.clone());
        }
        let found = self.search_paths.iter().find(|path| path.is_file()).cloned();
        match found {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Found MIME database");
                Ok(path)
            },
            None => exn::bail!(ErrorKind::DatabaseNotFound),
        }
    }
}

/// shared-mime-info lookup order: the user's data directory, then each
/// system data directory (`$XDG_DATA_DIRS`, colon separated).
pub fn search_paths(data_home: Option<&Path>, data_dirs: Option<&str>) -> Vec<PathBuf> {
    let data_dirs = data_dirs.filter(|dirs| !dirs.is_empty()).unwrap_or(DEFAULT_DATA_DIRS);
    data_home
        .into_iter()
        .chain(data_dirs.split(':').filter(|dir| !dir.is_empty()).map(Path::new))
        .map(|dir| dir.join(CACHE_FILE))
        .collect()
}

fn config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "mimer").map(|dirs| dirs.config_dir().join("config.toml"))
}
