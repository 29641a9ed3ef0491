//! Client configuration.
//!
//! All settings live in a single `config.toml` file at
//! `~/.config/wsrpc/config.toml` by default:
//!
//! ```toml
//! [client]
//! url = "ws://127.0.0.1:3000"
//! timeout_secs = 5
//!
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//! max_connections = 100
//! handshake_timeout_secs = 30
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use wsrpc_server::{DEFAULT_PORT, ServerConfig};

/// Configuration for the wsrpc command-line tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Settings used when calling a server.
    pub client: ClientSettings,

    /// Settings used by `wsrpc server`.
    pub server: ServerSettings,
}

/// Connection settings for outgoing calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Server URL.
    pub url: String,

    /// Connect and per-call timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            url: wsrpc_server::server_url(wsrpc_server::default_listen_addr()),
            timeout_secs: 5,
        }
    }
}

impl ClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Listener settings for the foreground server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address to bind.
    pub host: IpAddr,

    /// Port to bind.
    pub port: u16,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// WebSocket handshake timeout in seconds.
    pub handshake_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            max_connections: 100,
            handshake_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Converts to the server crate's configuration.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig::new(SocketAddr::new(self.host, self.port))
            .with_max_connections(self.max_connections)
            .with_handshake_timeout(Duration::from_secs(self.handshake_timeout_secs))
    }
}

impl ClientConfig {
    /// Loads configuration from the default path, or defaults if the file
    /// does not exist.
    pub fn load() -> Result<Self, String> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("failed to read config: {}", e))?;
        toml::from_str(&content).map_err(|e| format!("failed to parse config: {}", e))
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        Self::default_config_dir().join("config.toml")
    }

    /// Returns the default configuration directory.
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("wsrpc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.client.url, "ws://127.0.0.1:3000");
        assert_eq!(config.client.timeout(), Duration::from_secs(5));

        let server = config.server.to_server_config();
        assert_eq!(server.listen_addr, wsrpc_server::default_listen_addr());
        assert_eq!(server.max_connections, 100);
        assert_eq!(server.handshake_timeout, Duration::from_secs(30));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[client]
url = "ws://10.0.0.5:9000"
timeout_secs = 2

[server]
host = "0.0.0.0"
port = 9000
max_connections = 8
"#
        )
        .unwrap();

        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.client.url, "ws://10.0.0.5:9000");
        assert_eq!(config.client.timeout_secs, 2);

        let server = config.server.to_server_config();
        assert_eq!(server.listen_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(server.max_connections, 8);
        // Unset keys keep their defaults.
        assert_eq!(server.handshake_timeout, Duration::from_secs(30));
    }

    #[test]
    fn empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = ClientConfig::load_from(file.path()).unwrap();
        assert_eq!(config.client.url, ClientSettings::default().url);
        assert_eq!(config.server.port, DEFAULT_PORT);
    }

    #[test]
    fn invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[client\nurl = ").unwrap();
        let err = ClientConfig::load_from(file.path()).unwrap_err();
        assert!(err.contains("failed to parse config"), "{err}");
    }

    #[test]
    fn missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.contains("failed to read config"), "{err}");
    }

    #[test]
    fn round_trips_through_toml() {
        let config = ClientConfig::default();
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("[client]"));
        assert!(text.contains("[server]"));
        let back: ClientConfig = toml::from_str(&text).unwrap();
        assert_eq!(back.server.port, config.server.port);
    }

    #[test]
    fn default_path_ends_with_wsrpc() {
        let path = ClientConfig::default_path();
        assert!(path.ends_with("wsrpc/config.toml"));
    }
}
