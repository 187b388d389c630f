//! Configuration for kvgate
//!
//! Centralized configuration with sensible defaults. Values come from the
//! builder, an optional TOML file, and finally command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;

use crate::auth::{Capability, User, UserDirectory};
use crate::error::{GateError, Result};

/// Main configuration for a kvgate instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Database directory handed to the embedded engine
    pub data_dir: PathBuf,

    /// Which storage backend to open
    pub engine: EngineKind,

    /// How often committed writes are flushed to disk
    pub sync_strategy: SyncStrategy,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Idle read bound per connection (milliseconds, 0 = unbounded)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = unbounded)
    pub write_timeout_ms: u64,

    /// Longest accepted command line, excluding the terminator
    pub max_line_bytes: usize,

    // -------------------------------------------------------------------------
    // Identity Configuration
    // -------------------------------------------------------------------------
    /// Users known to the server
    pub users: Vec<User>,

    /// User bound to every connection; `None` leaves connections anonymous
    pub default_user: Option<String>,
}

/// Durability policy for the embedded engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// Flush after every committed write (safest, slowest)
    EveryWrite,

    /// Let the engine flush in the background every `interval_ms`
    Periodic { interval_ms: u64 },
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Durable on-disk engine
    Sled,

    /// Volatile in-process map
    Memory,
}

impl FromStr for EngineKind {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sled" => Ok(EngineKind::Sled),
            "memory" => Ok(EngineKind::Memory),
            other => Err(GateError::Config(format!("unknown engine '{}'", other))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./kvgate_data"),
            engine: EngineKind::Sled,
            sync_strategy: SyncStrategy::EveryWrite,
            listen_addr: "127.0.0.1:6379".to_string(),
            max_connections: 1024,
            read_timeout_ms: 300_000,
            write_timeout_ms: 5000,
            max_line_bytes: 64 * 1024,
            users: vec![User::admin()],
            default_user: Some("admin".to_string()),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load a TOML config file on top of the defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GateError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML config text on top of the defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)
            .map_err(|e| GateError::Config(format!("invalid TOML: {}", e)))?;
        let config = file.apply(Config::default())?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(GateError::Config("max_connections must be positive".into()));
        }
        if self.max_line_bytes == 0 {
            return Err(GateError::Config("max_line_bytes must be positive".into()));
        }
        if let Some(name) = &self.default_user {
            if !self.users.iter().any(|u| &u.username == name) {
                return Err(GateError::Config(format!(
                    "default_user '{}' is not a configured user",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Build the user directory from the configured users
    pub fn user_directory(&self) -> Result<UserDirectory> {
        UserDirectory::from_users(self.users.iter().cloned())
    }

    /// Resolve the identity bound to new connections
    pub fn default_identity(&self, directory: &UserDirectory) -> Result<Option<Arc<User>>> {
        match &self.default_user {
            None => Ok(None),
            Some(name) => directory.get(name).map(Some).ok_or_else(|| {
                GateError::Config(format!("default_user '{}' is not a configured user", name))
            }),
        }
    }
}

/// On-disk shape of the config file; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    data_dir: Option<PathBuf>,
    engine: Option<String>,
    sync: Option<String>,
    flush_interval_ms: Option<u64>,
    listen_addr: Option<String>,
    max_connections: Option<usize>,
    read_timeout_ms: Option<u64>,
    write_timeout_ms: Option<u64>,
    max_line_bytes: Option<usize>,
    default_user: Option<String>,
    users: Option<Vec<FileUser>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileUser {
    username: String,
    #[serde(default)]
    permissions: Vec<String>,
}

impl FileConfig {
    fn apply(self, mut config: Config) -> Result<Config> {
        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(engine) = self.engine {
            config.engine = engine.parse()?;
        }
        config.sync_strategy = match (self.sync.as_deref(), self.flush_interval_ms) {
            (None, None) => config.sync_strategy,
            (None | Some("periodic"), Some(interval_ms)) => SyncStrategy::Periodic { interval_ms },
            (Some("periodic"), None) => SyncStrategy::Periodic { interval_ms: 500 },
            (Some("every_write"), None) => SyncStrategy::EveryWrite,
            (Some("every_write"), Some(_)) => {
                return Err(GateError::Config(
                    "flush_interval_ms only applies to sync = \"periodic\"".into(),
                ))
            }
            (Some(other), _) => {
                return Err(GateError::Config(format!("unknown sync strategy '{}'", other)))
            }
        };
        if let Some(addr) = self.listen_addr {
            config.listen_addr = addr;
        }
        if let Some(count) = self.max_connections {
            config.max_connections = count;
        }
        if let Some(ms) = self.read_timeout_ms {
            config.read_timeout_ms = ms;
        }
        if let Some(ms) = self.write_timeout_ms {
            config.write_timeout_ms = ms;
        }
        if let Some(limit) = self.max_line_bytes {
            config.max_line_bytes = limit;
        }

        // An explicit user list replaces the sample admin, and with it the
        // implicit default binding.
        if let Some(users) = self.users {
            config.users = users
                .into_iter()
                .map(|u| {
                    let permissions = u
                        .permissions
                        .iter()
                        .map(|p| p.parse::<Capability>())
                        .collect::<Result<Vec<_>>>()?;
                    Ok(User::new(u.username, permissions))
                })
                .collect::<Result<Vec<_>>>()?;
            config.default_user = None;
        }
        if let Some(name) = self.default_user {
            config.default_user = Some(name);
        }

        Ok(config)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Start from an existing config (used to layer CLI overrides)
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Set the database directory
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the storage backend
    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.config.engine = engine;
        self
    }

    /// Set the sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the idle read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the maximum command line length
    pub fn max_line_bytes(mut self, limit: usize) -> Self {
        self.config.max_line_bytes = limit;
        self
    }

    /// Replace the configured users
    pub fn users(mut self, users: Vec<User>) -> Self {
        self.config.users = users;
        self
    }

    /// Add one user
    pub fn user(mut self, user: User) -> Self {
        self.config.users.push(user);
        self
    }

    /// Bind every connection to `username`, or leave them anonymous with `None`
    pub fn default_user(mut self, username: Option<&str>) -> Self {
        self.config.default_user = username.map(str::to_string);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
