//! Layered server configuration: defaults, then YAML, then `APP__*` environment, then CLI.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "APP__";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub hal: HalConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8087,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence when set
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalConfig {
    /// Where the discovery document is served
    pub discovery_path: String,
    /// Serve generated documentation for auto-documented namespaces
    pub serve_docs: bool,
}

impl Default for HalConfig {
    fn default() -> Self {
        Self {
            discovery_path: "/api".to_owned(),
            serve_docs: true,
        }
    }
}

impl AppConfig {
    /// Load the layered configuration, reading `path` when given.
    ///
    /// # Errors
    /// Returns an error if a layer cannot be parsed or holds values of the wrong type.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    /// Apply `--port` and `-v` flags on top of the loaded configuration.
    pub fn apply_cli_overrides(&mut self, port: Option<u16>, verbose: u8) {
        if let Some(port) = port {
            self.server.port = port;
        }
        let level = match verbose {
            0 => return,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        level.clone_into(&mut self.logging.level);
    }

    /// Socket address the HTTP server binds to.
    ///
    /// # Errors
    /// Returns an error if `server.host` is not an IP address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let host = &self.server.host;
        let ip: IpAddr = host
            .parse()
            .with_context(|| format!("invalid server.host '{host}'"))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    /// Render the effective configuration as YAML.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_without_layers() {
        temp_env::with_vars_unset(["APP__SERVER__PORT", "APP__HAL__DISCOVERY_PATH"], || {
            let config = AppConfig::load_or_default(None).unwrap();
            assert_eq!(config, AppConfig::default());
            assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8087");
        });
    }

    #[test]
    fn yaml_overrides_defaults() {
        let file = yaml_file("server:\n  port: 9000\nlogging:\n  format: json\n");
        temp_env::with_vars_unset(["APP__SERVER__PORT"], || {
            let config = AppConfig::load_or_default(Some(file.path())).unwrap();
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.server.host, "127.0.0.1");
            assert_eq!(config.logging.format, LogFormat::Json);
        });
    }

    #[test]
    fn environment_overrides_yaml() {
        let file = yaml_file("server:\n  port: 9000\n");
        temp_env::with_vars(
            [
                ("APP__SERVER__PORT", Some("9100")),
                ("APP__HAL__DISCOVERY_PATH", Some("/discover")),
            ],
            || {
                let config = AppConfig::load_or_default(Some(file.path())).unwrap();
                assert_eq!(config.server.port, 9100);
                assert_eq!(config.hal.discovery_path, "/discover");
            },
        );
    }

    #[test]
    fn cli_overrides_everything() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(Some(7000), 2);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.logging.level, "debug");

        config.apply_cli_overrides(None, 0);
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let file = yaml_file("server:\n  port: not-a-number\n");
        temp_env::with_vars_unset(["APP__SERVER__PORT"], || {
            assert!(AppConfig::load_or_default(Some(file.path())).is_err());
        });

        let mut config = AppConfig::default();
        config.server.host = "localhost:80".to_owned();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn yaml_rendering_round_trips() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        let parsed: AppConfig = serde_saphyr::from_str(&yaml).unwrap();
        assert_eq!(parsed, AppConfig::default());
    }
}
