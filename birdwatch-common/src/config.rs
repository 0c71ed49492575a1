//! Configuration loading and root folder resolution
//!
//! Every setting is resolved in the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file is never fatal: resolution falls
//! through to the compiled defaults.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "BIRDWATCH_ROOT_FOLDER";
/// Environment variable overriding the HTTP port
pub const ENV_PORT: &str = "BIRDWATCH_PORT";
/// Environment variable overriding the bind address
pub const ENV_BIND: &str = "BIRDWATCH_BIND";
/// Environment variable overriding the CSV bootstrap directory
pub const ENV_BOOTSTRAP_DIR: &str = "BIRDWATCH_BOOTSTRAP_DIR";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "birdwatch.db";

/// Compiled defaults, used when nothing else provides a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub port: u16,
    pub bind_address: String,
    pub log_level: String,
    pub session_ttl_secs: u64,
    pub require_identity: bool,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            port: 5780,
            bind_address: "127.0.0.1".to_string(),
            log_level: "info".to_string(),
            session_ttl_secs: 24 * 60 * 60,
            require_identity: true,
        }
    }
}

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub bootstrap_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub session_ttl_secs: Option<u64>,
    pub require_identity: Option<bool>,
}

impl TomlConfig {
    /// Parse a config file, failing on I/O or syntax errors
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Load the explicit path if given, else the first platform config file found
    ///
    /// Never fails: an unreadable file yields an empty config plus a warning
    /// the caller logs once tracing is up.
    pub fn discover(explicit: Option<&Path>) -> ConfigSource {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_file(),
        };

        let Some(path) = path else {
            return ConfigSource::default();
        };

        match Self::load(&path) {
            Ok(config) => ConfigSource {
                config,
                path: Some(path),
                warning: None,
            },
            Err(e) => ConfigSource {
                config: Self::default(),
                warning: Some(format!("Ignoring config file {}: {}", path.display(), e)),
                path: Some(path),
            },
        }
    }
}

/// Result of config file discovery
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    pub config: TomlConfig,
    /// File that was read (or attempted)
    pub path: Option<PathBuf>,
    pub warning: Option<String>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_folder: Option<PathBuf>,
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub bootstrap_dir: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub root_folder: PathBuf,
    pub port: u16,
    pub bind_address: String,
    /// Directory holding species.csv, sightings.csv and checklist.csv
    pub bootstrap_dir: PathBuf,
    pub log_level: String,
    pub session_ttl_secs: u64,
    pub require_identity: bool,
}

impl ServiceConfig {
    /// Resolve every setting from CLI, environment, TOML and compiled defaults
    pub fn resolve(cli: CliOverrides, file: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let root_folder = cli
            .root_folder
            .or_else(|| env_var(ENV_ROOT_FOLDER).map(PathBuf::from))
            .or(file.root_folder)
            .unwrap_or(defaults.root_folder);

        let port = cli
            .port
            .or_else(|| env_parsed::<u16>(ENV_PORT))
            .or(file.port)
            .unwrap_or(defaults.port);

        let bind_address = cli
            .bind_address
            .or_else(|| env_var(ENV_BIND))
            .or(file.bind_address)
            .unwrap_or(defaults.bind_address);

        // Bootstrap CSVs live next to the database unless told otherwise
        let bootstrap_dir = cli
            .bootstrap_dir
            .or_else(|| env_var(ENV_BOOTSTRAP_DIR).map(PathBuf::from))
            .or(file.bootstrap_dir)
            .unwrap_or_else(|| root_folder.clone());

        Self {
            root_folder,
            port,
            bind_address,
            bootstrap_dir,
            log_level: file.log_level.unwrap_or(defaults.log_level),
            session_ttl_secs: file.session_ttl_secs.unwrap_or(defaults.session_ttl_secs),
            require_identity: file.require_identity.unwrap_or(defaults.require_identity),
        }
    }

    /// Path of the SQLite database file
    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Create the root folder if it does not exist yet
    pub fn ensure_root_folder(&self) -> Result<()> {
        if !self.root_folder.exists() {
            std::fs::create_dir_all(&self.root_folder)?;
        }
        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = env_var(name)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

/// First existing platform config file
///
/// Linux checks `~/.config/birdwatch/config.toml` then `/etc/birdwatch/config.toml`.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("birdwatch").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/birdwatch/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/birdwatch (or /var/lib/birdwatch for system-wide)
        dirs::data_local_dir()
            .map(|d| d.join("birdwatch"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/birdwatch"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("birdwatch"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/birdwatch"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("birdwatch"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\birdwatch"))
    } else {
        PathBuf::from("./birdwatch_data")
    }
}
