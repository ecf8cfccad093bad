//! TOML-based configuration for an lrpc node.
//!
//! Every field has a default, so a node starts without any config file and
//! an older file missing newer keys still loads:
//!
//! ```toml
//! [server]
//! bind_address = "127.0.0.1"
//! port = 7070
//! max_body_len = 16777216
//! read_timeout_ms = 0        # 0 = no timeout
//!
//! [pool]
//! max_idle = 1024
//!
//! [log]
//! level = "info"
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// `server.bind_address` is not an IP address.
    #[error("invalid bind address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NodeConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Listener and per-connection limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    /// IP address to listen on.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// TCP port; 0 asks the OS for a free port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Frames declaring a larger body are rejected before any allocation.
    #[serde(default = "default_max_body_len")]
    pub max_body_len: u32,
    /// Idle read timeout per connection in milliseconds; 0 disables it.
    #[serde(default)]
    pub read_timeout_ms: u64,
}

/// Shared message pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PoolConfig {
    #[serde(default = "default_max_idle")]
    pub max_idle: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"lrpc_node=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    7070
}
fn default_max_body_len() -> u32 {
    16 * 1024 * 1024
}
fn default_max_idle() -> usize {
    lrpc_core::protocol::pool::DEFAULT_MAX_IDLE
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
            max_body_len: default_max_body_len(),
            read_timeout_ms: 0,
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle: default_max_idle(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// The address to bind the listener to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidAddress`] if `bind_address` does not
    /// parse as an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|source| ConfigError::InvalidAddress {
                address: self.bind_address.clone(),
                source,
            })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads `NodeConfig` from `path`, returning `NodeConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<NodeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NodeConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &NodeConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("lrpc_config_{}_{name}", std::process::id()))
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = NodeConfig::default();

        // Assert
        assert_eq!(cfg.server.bind_address, "127.0.0.1");
        assert_eq!(cfg.server.port, 7070);
        assert_eq!(cfg.server.max_body_len, 16_777_216);
        assert_eq!(cfg.server.read_timeout(), None);
        assert_eq!(cfg.pool.max_idle, 1024);
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn test_socket_addr_combines_address_and_port() {
        let cfg = ServerConfig {
            bind_address: "0.0.0.0".to_string(),
            port: 9000,
            ..Default::default()
        };
        assert_eq!(cfg.socket_addr().unwrap(), "0.0.0.0:9000".parse().unwrap());
    }

    #[test]
    fn test_socket_addr_rejects_hostnames() {
        let cfg = ServerConfig {
            bind_address: "localhost".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            cfg.socket_addr(),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: NodeConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn test_partial_server_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[server]
port = 9999
read_timeout_ms = 2500
"#;

        // Act
        let cfg: NodeConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.server.port, 9999);
        assert_eq!(cfg.server.read_timeout(), Some(Duration::from_millis(2500)));
        // Unspecified fields keep their defaults
        assert_eq!(cfg.server.bind_address, "127.0.0.1");
        assert_eq!(cfg.pool.max_idle, 1024);
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let dir = temp_dir("invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lrpc.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    // ── load / save ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/lrpc.toml");

        let cfg = load_config(&path).expect("missing file is not an error");

        assert_eq!(cfg, NodeConfig::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        // Arrange
        let dir = temp_dir("round_trip");
        let path = dir.join("nested").join("lrpc.toml");
        let mut cfg = NodeConfig::default();
        cfg.server.port = 12345;
        cfg.pool.max_idle = 8;
        cfg.log.level = "debug".to_string();

        // Act
        save_config(&cfg, &path).expect("save");
        let loaded = load_config(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }
}
