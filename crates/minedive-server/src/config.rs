//! Server configuration: TOML file + CLI overrides.

use minedive_core::{RelayError, RelayResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;

/// Top-level config file structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSection,
}

/// `[server]` section of the config TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    #[serde(default)]
    pub first_client_id: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            max_message_size: default_max_message_size(),
            outbound_queue: default_outbound_queue(),
            first_client_id: 0,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    6501
}
fn default_max_message_size() -> usize {
    65_536
}
fn default_outbound_queue() -> usize {
    64
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub bind: Option<String>,
    pub port: Option<u16>,
    pub max_message_size: Option<usize>,
    pub outbound_queue: Option<usize>,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub max_message_size: usize,
    pub outbound_queue: usize,
    pub first_client_id: u64,
}

impl ServerConfig {
    /// Load config from a TOML file, then apply CLI overrides.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load(config_path: Option<&Path>, overrides: CliOverrides) -> RelayResult<Self> {
        let file_config = match config_path.map(expand_tilde) {
            Some(path) if path.exists() => {
                info!(path = %path.display(), "loading config file");
                let content = std::fs::read_to_string(&path)?;
                parse_config(&content)?
            }
            Some(path) => {
                info!(path = %path.display(), "config file not found, using defaults");
                ConfigFile::default()
            }
            None => ConfigFile::default(),
        };
        Self::resolve(file_config.server, overrides)
    }

    fn resolve(server: ServerSection, overrides: CliOverrides) -> RelayResult<Self> {
        let bind = overrides.bind.unwrap_or(server.bind);
        let port = overrides.port.unwrap_or(server.port);
        let bind_addr = format!("{bind}:{port}")
            .parse::<SocketAddr>()
            .or_else(|_| format!("[{bind}]:{port}").parse::<SocketAddr>())
            .map_err(|e| RelayError::Config(format!("invalid bind address {bind}:{port}: {e}")))?;

        let outbound_queue = overrides.outbound_queue.unwrap_or(server.outbound_queue);
        if outbound_queue == 0 {
            return Err(RelayError::Config("outbound_queue must be at least 1".into()));
        }

        // The counter must be able to advance past the first id.
        if server.first_client_id == u64::MAX {
            return Err(RelayError::Config(format!(
                "first_client_id must be below {}",
                u64::MAX
            )));
        }

        Ok(Self {
            bind_addr,
            max_message_size: overrides.max_message_size.unwrap_or(server.max_message_size),
            outbound_queue,
            first_client_id: server.first_client_id,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], default_port())),
            max_message_size: default_max_message_size(),
            outbound_queue: default_outbound_queue(),
            first_client_id: 0,
        }
    }
}

fn parse_config(content: &str) -> RelayResult<ConfigFile> {
    toml::from_str::<ConfigFile>(content)
        .map_err(|e| RelayError::Config(format!("config parse error: {e}")))
}

/// Expand `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::resolve(ServerSection::default(), CliOverrides::default()).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:6501".parse().unwrap());
        assert_eq!(cfg.max_message_size, 65_536);
        assert_eq!(cfg.outbound_queue, 64);
        assert_eq!(cfg.first_client_id, 0);
    }

    #[test]
    fn file_values_and_partial_sections() {
        let file = parse_config(
            r#"
            [server]
            port = 7000
            first_client_id = 5
            "#,
        )
        .unwrap();
        let cfg = ServerConfig::resolve(file.server, CliOverrides::default()).unwrap();
        assert_eq!(cfg.bind_addr.port(), 7000);
        assert_eq!(cfg.first_client_id, 5);
        assert_eq!(cfg.outbound_queue, 64);
    }

    #[test]
    fn cli_overrides_file() {
        let file = parse_config("[server]\nport = 7000\nbind = \"127.0.0.1\"\n").unwrap();
        let cfg = ServerConfig::resolve(
            file.server,
            CliOverrides {
                port: Some(8000),
                max_message_size: Some(1024),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:8000".parse().unwrap());
        assert_eq!(cfg.max_message_size, 1024);
    }

    #[test]
    fn ipv6_bind() {
        let cfg = ServerConfig::resolve(
            ServerSection::default(),
            CliOverrides {
                bind: Some("::1".into()),
                port: Some(9000),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(cfg.bind_addr, "[::1]:9000".parse().unwrap());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(parse_config("[server]\nport = \"high\"\n").is_err());
        let bad_bind = CliOverrides {
            bind: Some("not an address".into()),
            ..Default::default()
        };
        assert!(matches!(
            ServerConfig::resolve(ServerSection::default(), bad_bind),
            Err(RelayError::Config(_))
        ));
        let zero_queue = CliOverrides {
            outbound_queue: Some(0),
            ..Default::default()
        };
        assert!(ServerConfig::resolve(ServerSection::default(), zero_queue).is_err());
    }

    #[test]
    fn rejects_unusable_first_client_id() {
        let file = parse_config(&format!("[server]\nfirst_client_id = {}\n", u64::MAX)).unwrap();
        assert!(matches!(
            ServerConfig::resolve(file.server, CliOverrides::default()),
            Err(RelayError::Config(_))
        ));

        let file = parse_config(&format!("[server]\nfirst_client_id = {}\n", u64::MAX - 1)).unwrap();
        let cfg = ServerConfig::resolve(file.server, CliOverrides::default()).unwrap();
        assert_eq!(cfg.first_client_id, u64::MAX - 1);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("minedive-no-such-config.toml");
        let cfg = ServerConfig::load(Some(&path), CliOverrides::default()).unwrap();
        assert_eq!(cfg.bind_addr.port(), 6501);
    }

    #[test]
    fn loads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("minedive-config-{}.toml", std::process::id()));
        std::fs::write(&path, "[server]\nport = 6600\noutbound_queue = 8\n").unwrap();
        let cfg = ServerConfig::load(Some(&path), CliOverrides::default()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(cfg.bind_addr.port(), 6600);
        assert_eq!(cfg.outbound_queue, 8);
    }
}
