//! Configuration file management for salon.
//!
//! Provides a TOML-based config file at `~/.config/salon/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use salon_db::config::DbConfig;

// -----------------------------------------------------------------------
// Backend selectors
// -----------------------------------------------------------------------

/// Where bookings are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Postgres,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        })
    }
}

impl FromStr for StorageBackend {
    type Err = BackendParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(BackendParseError {
                kind: "storage",
                value: other.to_owned(),
            }),
        }
    }
}

/// Where portfolio images are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortfolioBackend {
    #[default]
    Disk,
    Memory,
}

impl fmt::Display for PortfolioBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Disk => "disk",
            Self::Memory => "memory",
        })
    }
}

impl FromStr for PortfolioBackend {
    type Err = BackendParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" => Ok(Self::Disk),
            "memory" => Ok(Self::Memory),
            other => Err(BackendParseError {
                kind: "portfolio",
                value: other.to_owned(),
            }),
        }
    }
}

/// Error returned when a backend name is not recognised.
#[derive(Debug, Clone)]
pub struct BackendParseError {
    kind: &'static str,
    value: String,
}

impl fmt::Display for BackendParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} backend: {:?}", self.kind, self.value)
    }
}

impl std::error::Error for BackendParseError {}

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_IMAGE_DIR: &str = "image";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub server: ServerSection,
    pub storage: StorageSection,
    pub database: DatabaseSection,
    pub portfolio: PortfolioSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_owned(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_owned(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioSection {
    pub backend: PortfolioBackend,
    pub dir: PathBuf,
}

impl Default for PortfolioSection {
    fn default() -> Self {
        Self {
            backend: PortfolioBackend::default(),
            dir: PathBuf::from(DEFAULT_IMAGE_DIR),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the salon config directory: `$XDG_CONFIG_HOME/salon` or
/// `~/.config/salon`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("salon");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("salon")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// The file may hold database credentials, so it is made owner-only on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub storage: Option<StorageBackend>,
    pub database_url: Option<String>,
    pub portfolio: Option<PortfolioBackend>,
    pub image_dir: Option<PathBuf>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug, Clone)]
pub struct SalonConfig {
    pub bind: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub db_config: DbConfig,
    pub portfolio: PortfolioBackend,
    pub image_dir: PathBuf,
}

/// Read and parse an environment variable, `None` when unset.
fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        Err(_) => Ok(None),
    }
}

impl SalonConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config
    /// file > default. A missing config file is not an error; a malformed
    /// one is.
    pub fn resolve(cli: &CliOverrides) -> Result<Self> {
        let file = if config_path().exists() {
            load_config()?
        } else {
            ConfigFile::default()
        };

        let bind = match &cli.bind {
            Some(bind) => bind.clone(),
            None => env_parsed("SALON_BIND")?.unwrap_or(file.server.bind),
        };
        let port = match cli.port {
            Some(port) => port,
            None => env_parsed("SALON_PORT")?.unwrap_or(file.server.port),
        };
        let storage = match cli.storage {
            Some(storage) => storage,
            None => env_parsed("SALON_STORAGE")?.unwrap_or(file.storage.backend),
        };
        let database_url = match &cli.database_url {
            Some(url) => url.clone(),
            None => env_parsed("SALON_DATABASE_URL")?.unwrap_or(file.database.url),
        };
        let portfolio = match cli.portfolio {
            Some(portfolio) => portfolio,
            None => env_parsed("SALON_PORTFOLIO")?.unwrap_or(file.portfolio.backend),
        };
        let image_dir = match &cli.image_dir {
            Some(dir) => dir.clone(),
            None => env_parsed("SALON_IMAGE_DIR")?.unwrap_or(file.portfolio.dir),
        };

        Ok(Self {
            bind,
            port,
            storage,
            db_config: DbConfig::new(database_url),
            portfolio,
            image_dir,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
