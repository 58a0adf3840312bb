//! CLI configuration types

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sun_bridge::BridgeGatewayConfig;
use sun_client::DEFAULT_FEE_LIMIT;

/// Prefix of environment overrides, e.g. `SUN__BRIDGE__SIDE_CHAIN_ID`
pub const ENV_PREFIX: &str = "SUN";

/// Complete CLI configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SunConfig {
    /// Main chain nodes
    #[serde(default = "default_main_endpoints")]
    pub main: NodeEndpoints,

    /// Side chain nodes
    #[serde(default = "default_side_endpoints")]
    pub side: NodeEndpoints,

    /// Gateway contracts and side chain identity
    #[serde(default)]
    pub bridge: BridgeSettings,

    /// Signing identity and fee defaults
    #[serde(default)]
    pub client: ClientSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl SunConfig {
    /// Load `path` (optional) with `SUN__` environment overrides on top
    pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Same as [`SunConfig::load`], reading overrides from `env` instead of the process
    pub fn load_with_env(path: &Path, env: Option<HashMap<String, String>>) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()
    }
}

impl Default for SunConfig {
    fn default() -> Self {
        Self {
            main: default_main_endpoints(),
            side: default_side_endpoints(),
            bridge: BridgeSettings::default(),
            client: ClientSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Full and solidity node of one chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEndpoints {
    pub full_node: String,

    pub solidity_node: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Sent as the `TRON-PRO-API-KEY` header
    #[serde(default)]
    pub api_key: Option<String>,
}

impl NodeEndpoints {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn headers(&self) -> HashMap<String, String> {
        self.api_key
            .iter()
            .map(|key| ("TRON-PRO-API-KEY".to_string(), key.clone()))
            .collect()
    }
}

fn default_main_endpoints() -> NodeEndpoints {
    NodeEndpoints {
        full_node: "https://api.trongrid.io".to_string(),
        solidity_node: "https://api.trongrid.io".to_string(),
        timeout_secs: default_timeout_secs(),
        api_key: None,
    }
}

fn default_side_endpoints() -> NodeEndpoints {
    NodeEndpoints {
        full_node: "https://sun.tronex.io".to_string(),
        solidity_node: "https://sun.tronex.io".to_string(),
        timeout_secs: default_timeout_secs(),
        api_key: None,
    }
}

fn default_timeout_secs() -> u64 {
    30
}

/// Gateway settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSettings {
    #[serde(default = "default_main_gateway")]
    pub main_gateway: String,

    #[serde(default = "default_side_gateway")]
    pub side_gateway: String,

    #[serde(default = "default_side_chain_id")]
    pub side_chain_id: String,
}

impl BridgeSettings {
    pub fn gateway_config(&self) -> BridgeGatewayConfig {
        BridgeGatewayConfig::new(&self.main_gateway, &self.side_gateway, &self.side_chain_id)
    }
}

fn default_main_gateway() -> String {
    "TWaPZru6PR5VjgT4sJrrZ481Zgp3iJ8Rfo".to_string()
}

fn default_side_gateway() -> String {
    "TGKotco6YoULzbYisTBuP6DWXDjEgJSpYz".to_string()
}

fn default_side_chain_id() -> String {
    "41E209E4DE650F0150788E8EC5CAFA240A23EB8EB7".to_string()
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            main_gateway: default_main_gateway(),
            side_gateway: default_side_gateway(),
            side_chain_id: default_side_chain_id(),
        }
    }
}

/// Client context settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Default fee limit in sun
    #[serde(default = "default_fee_limit")]
    pub fee_limit: i64,

    /// Hex private key of the default identity
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

fn default_fee_limit() -> i64 {
    DEFAULT_FEE_LIMIT
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            fee_limit: default_fee_limit(),
            private_key: None,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SunConfig::load_with_env(&dir.path().join("absent.toml"), no_env()).unwrap();

        assert_eq!(config.main, default_main_endpoints());
        assert_eq!(config.side, default_side_endpoints());
        assert_eq!(config.bridge, BridgeSettings::default());
        assert_eq!(config.client.fee_limit, DEFAULT_FEE_LIMIT);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
            [side]
            full_node = "http://127.0.0.1:8090"
            solidity_node = "http://127.0.0.1:8091"

            [client]
            fee_limit = 20000000
            "#,
        );
        let config = SunConfig::load_with_env(file.path(), no_env()).unwrap();

        assert_eq!(config.side.full_node, "http://127.0.0.1:8090");
        assert_eq!(config.side.timeout_secs, 30);
        assert_eq!(config.main, default_main_endpoints());
        assert_eq!(config.client.fee_limit, 20_000_000);
        assert_eq!(config.bridge.main_gateway, default_main_gateway());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_config(
            r#"
            [bridge]
            side_chain_id = "01"
            "#,
        );
        let env = HashMap::from([
            ("SUN__BRIDGE__SIDE_CHAIN_ID".to_string(), "0a0b".to_string()),
            ("SUN__CLIENT__FEE_LIMIT".to_string(), "5000000".to_string()),
        ]);
        let config = SunConfig::load_with_env(file.path(), Some(env)).unwrap();

        assert_eq!(config.bridge.side_chain_id, "0a0b");
        assert_eq!(config.client.fee_limit, 5_000_000);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_config("[client\nfee_limit = ");
        assert!(SunConfig::load_with_env(file.path(), no_env()).is_err());
    }

    #[test]
    fn test_default_gateways_validate() {
        let gateways = BridgeSettings::default().gateway_config().validate().unwrap();
        assert_eq!(gateways.main.to_base58(), default_main_gateway());
        assert_eq!(gateways.chain_id.len(), 21);
    }

    #[test]
    fn test_private_key_never_serialized() {
        let mut config = SunConfig::default();
        config.client.private_key = Some("00".repeat(32));
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("private_key"));
    }

    #[test]
    fn test_api_key_header() {
        let mut endpoints = default_main_endpoints();
        assert!(endpoints.headers().is_empty());
        endpoints.api_key = Some("k".into());
        assert_eq!(endpoints.headers().get("TRON-PRO-API-KEY").map(String::as_str), Some("k"));
    }
}
