use datatruth_core::domain::{
    DEFAULT_ALERT_THRESHOLD_PERCENTAGE, DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE,
};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorKind {
    ProcNetDev,
    Synthetic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticConfig {
    pub daily_mobile_bytes: i64,
    pub daily_wifi_bytes: i64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            daily_mobile_bytes: 150_000_000,
            daily_wifi_bytes: 600_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    pub kind: MonitorKind,
    pub operator_name: String,
    /// Override for tests and non-standard proc mounts.
    pub proc_net_dev_path: Option<String>,
    pub synthetic: Option<SyntheticConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    pub provider_name: String,
    pub data_limit_bytes: i64,
    pub billing_cycle_start_day: u8,
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold_percentage: f64,
    #[serde(default = "default_discrepancy_threshold")]
    pub discrepancy_threshold_percentage: f64,
}

fn default_alert_threshold() -> f64 {
    DEFAULT_ALERT_THRESHOLD_PERCENTAGE
}

fn default_discrepancy_threshold() -> f64 {
    DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub monitor: MonitorConfig,
    pub provider: ProviderConfig,
    /// Seeded into the record store on first start when no plan exists yet.
    pub plan: Option<PlanConfig>,
    pub metrics: Option<MetricsConfig>,
    /// Run a single capture/fetch pass when absent.
    pub poll_interval_secs: Option<u64>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path =
            env::var("DATATRUTH_CONFIG").unwrap_or_else(|_| "datatruth-config.toml".to_string());
        let contents = fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&contents)?;
        Ok(cfg)
    }
}
