//! Application configuration and environment.

use crate::error::{AppError, AppResult};
use maker_mm::MakerConfig;
use maker_oracle::OracleConfig;
use maker_risk::RiskConfig;
use maker_telemetry::LogConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default venue gateway endpoint.
const DEFAULT_WEB_SERVER_URL: &str = "wss://gateway.perp.trade/ws";

/// Default RPC endpoint (mainnet).
const DEFAULT_RPC_ENDPOINT: &str = "https://api.mainnet-beta.solana.com";

/// Process-group supervision settings. The supervisor itself runs outside
/// this binary; workers only honor the env-provided market split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Disjoint market-id groups, one worker per group.
    #[serde(default)]
    pub process_groups: Vec<Vec<u32>>,
    #[serde(default = "default_restart_delay_ms")]
    pub worker_restart_delay_ms: u64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
}

fn default_restart_delay_ms() -> u64 {
    5_000
}

fn default_max_restarts() -> u32 {
    5
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            process_groups: Vec::new(),
            worker_restart_delay_ms: default_restart_delay_ms(),
            max_restarts: default_max_restarts(),
        }
    }
}

impl ClusterConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.enabled {
            if self.process_groups.is_empty() {
                return Err(
                    "cluster.process_groups must be non-empty when cluster is enabled".to_string(),
                );
            }
            if self.process_groups.iter().any(|g| g.is_empty()) {
                return Err("cluster.process_groups must not contain empty groups".to_string());
            }
        }
        Ok(())
    }
}

/// Root configuration, one section per component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub maker: MakerConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub cluster: ClusterConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl AppConfig {
    /// Load from `path`, or `MAKER_CONFIG`, or `config/default.toml`;
    /// missing files fall back to defaults. Always validated.
    pub fn load(path: Option<&str>) -> AppResult<Self> {
        let path = path
            .map(str::to_string)
            .or_else(|| std::env::var("MAKER_CONFIG").ok())
            .unwrap_or_else(|| "config/default.toml".to_string());

        let config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| AppError::Config(format!("failed to read {path}: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| AppError::Config(format!("failed to parse {path}: {e}")))?
        } else {
            tracing::warn!(path, "config file not found, using defaults");
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    /// Run section validators in order; the first violation is the error.
    pub fn validate(&self) -> AppResult<()> {
        self.maker.validate().map_err(AppError::Config)?;
        self.risk.validate().map_err(AppError::Config)?;
        self.oracle.validate().map_err(AppError::Config)?;
        self.cluster.validate().map_err(AppError::Config)?;
        Ok(())
    }
}

/// Environment-sourced settings.
#[derive(Debug, Clone)]
pub struct EnvSettings {
    /// Signing key; required for live trading and connectivity checks.
    pub private_key: Option<String>,
    pub rpc_endpoint: String,
    pub web_server_url: String,
    /// Set when this process is a supervised worker.
    pub is_worker: bool,
    pub worker_id: Option<String>,
    /// Market split assigned by the supervisor (`MARKETS` JSON array).
    pub worker_markets: Option<Vec<u32>>,
}

impl EnvSettings {
    pub fn load() -> AppResult<Self> {
        let worker_markets = match std::env::var("MARKETS") {
            Ok(raw) => Some(serde_json::from_str::<Vec<u32>>(&raw).map_err(|e| {
                AppError::BadEnv {
                    name: "MARKETS",
                    detail: format!("expected a JSON integer array: {e}"),
                }
            })?),
            Err(_) => None,
        };

        Ok(Self {
            private_key: std::env::var("PRIVATE_KEY_BASE58").ok(),
            rpc_endpoint: std::env::var("RPC_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_RPC_ENDPOINT.to_string()),
            web_server_url: std::env::var("WEB_SERVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEB_SERVER_URL.to_string()),
            is_worker: std::env::var("IS_WORKER").map(|v| v == "1" || v == "true").unwrap_or(false),
            worker_id: std::env::var("WORKER_ID").ok(),
            worker_markets,
        })
    }

    /// The signing key, or the fatal error live mode reports.
    pub fn require_private_key(&self) -> AppResult<&str> {
        self.private_key
            .as_deref()
            .ok_or(AppError::MissingEnv("PRIVATE_KEY_BASE58"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cluster_requires_groups_when_enabled() {
        let config = AppConfig {
            cluster: ClusterConfig {
                enabled: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("process_groups"));
    }

    #[test]
    fn test_cluster_rejects_empty_group() {
        let cluster = ClusterConfig {
            enabled: true,
            process_groups: vec![vec![0, 1], vec![]],
            ..Default::default()
        };
        assert!(cluster.validate().is_err());
    }

    #[test]
    fn test_toml_sections_parse() {
        let config: AppConfig = toml::from_str(
            r#"
            [maker]
            quantity_mode = "tiered"
            tiered_multipliers = [0.5, 0.3, 0.2]
            max_levels = 3

            [maker.spread]
            min = 0.0015
            max = 0.0125
            depth_levels = 5

            [risk]
            min_margin_fraction = 0.18
            max_exposure_per_side = 0.5
            max_exposure_per_market = 0.2
            max_total_exposure = 0.8
            min_free_collateral = 100.0

            [oracle]
            enabled = true
            sources = ["binance", "coinbase"]

            [cluster]
            enabled = true
            process_groups = [[0, 1], [2]]
            "#,
        )
        .unwrap();

        assert_eq!(config.maker.tiered_multipliers.len(), 3);
        assert_eq!(config.oracle.sources.len(), 2);
        assert_eq!(config.cluster.process_groups, vec![vec![0, 1], vec![2]]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_order_reports_maker_first() {
        let config = AppConfig {
            maker: MakerConfig {
                max_levels: 0,
                ..Default::default()
            },
            risk: RiskConfig {
                min_margin_fraction: 2.0,
                ..Default::default()
            },
            ..Default::default()
        };
        // Both sections are invalid; the maker violation surfaces first.
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_levels"));
    }
}
