use crate::models::ClickType;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the totemwatch engine and daemon
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine-wide settings
    pub settings: Settings,
    /// Per-check thresholds
    pub checks: ChecksConfig,
    /// Event input configuration
    pub input: InputConfig,
    /// Output configuration
    pub output: OutputConfig,
    /// Webhook alerting configuration
    pub alerting: AlertConfig,
    /// Alert storage configuration
    pub persistence: PersistenceConfig,
}

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Minutes between global violation resets
    pub reset_violations_interval_minutes: u64,
    /// Capacity of each player's totem interval history
    pub interval_history_size: usize,
    /// Skip Bedrock (Geyser) players
    pub exempt_bedrock_players: bool,
    /// Players that are never checked
    pub exempt_players: Vec<Uuid>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            reset_violations_interval_minutes: 30,
            interval_history_size: 30,
            exempt_bedrock_players: true,
            exempt_players: Vec::new(),
        }
    }
}

/// Settings shared by every check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSettings {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
}

macro_rules! check_settings {
    ($($config:ty),+ $(,)?) => {
        $(
            impl $config {
                pub fn settings(&self) -> CheckSettings {
                    CheckSettings {
                        enabled: self.enabled,
                        punishable: self.punishable,
                        max_violations: self.max_violations,
                    }
                }
            }
        )+
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemAConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    /// Upper bound (ms) between the totem pop and the off-hand swap
    pub normal_check_time_ms: i64,
    /// Click-to-swap times at or below this value (ms) are flagged
    pub click_time_difference_ms: i64,
    /// Raw inventory slot of the off hand
    pub offhand_slot: i32,
}

impl Default for AutoTotemAConfig {
    fn default() -> Self {
        AutoTotemAConfig {
            enabled: true,
            punishable: true,
            max_violations: 2,
            normal_check_time_ms: 1500,
            click_time_difference_ms: 75,
            offhand_slot: 45,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemBConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    pub standard_deviation_threshold: f64,
    pub mean_threshold: f64,
    /// Consecutive low standard deviations before flagging
    pub consecutive_low_sd_count: u32,
}

impl Default for AutoTotemBConfig {
    fn default() -> Self {
        AutoTotemBConfig {
            enabled: true,
            punishable: true,
            max_violations: 6,
            standard_deviation_threshold: 30.0,
            mean_threshold: 500.0,
            consecutive_low_sd_count: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemCConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    /// Average standard deviation differences below this are consistent
    pub consistent_sd_range: f64,
    pub consecutive_violations: u32,
}

impl Default for AutoTotemCConfig {
    fn default() -> Self {
        AutoTotemCConfig {
            enabled: true,
            punishable: true,
            max_violations: 3,
            consistent_sd_range: 1.0,
            consecutive_violations: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemDConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    /// Expected average time per packet of a scripted re-totem (ms)
    pub expected_average_ms: i64,
    pub acceptable_variation_ms: i64,
}

impl Default for AutoTotemDConfig {
    fn default() -> Self {
        AutoTotemDConfig {
            enabled: true,
            punishable: true,
            max_violations: 2,
            expected_average_ms: 50,
            acceptable_variation_ms: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemEConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    pub standard_deviation_threshold: f64,
    pub average_standard_deviation_threshold: f64,
}

impl Default for AutoTotemEConfig {
    fn default() -> Self {
        AutoTotemEConfig {
            enabled: true,
            punishable: true,
            max_violations: 4,
            standard_deviation_threshold: 10.0,
            average_standard_deviation_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemFConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    /// Interactions at most this long (ms) after a totem click are flagged
    pub time_difference_ms: i64,
    pub valid_click_types: Vec<ClickType>,
}

impl Default for AutoTotemFConfig {
    fn default() -> Self {
        AutoTotemFConfig {
            enabled: true,
            punishable: false,
            max_violations: 6,
            time_difference_ms: 1500,
            valid_click_types: vec![
                ClickType::Left,
                ClickType::Right,
                ClickType::ShiftLeft,
                ClickType::ShiftRight,
                ClickType::NumberKey,
                ClickType::SwapOffhand,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemGConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    pub normal_check_time_ms: i64,
    pub click_to_swap_time_difference_ms: i64,
}

impl Default for AutoTotemGConfig {
    fn default() -> Self {
        AutoTotemGConfig {
            enabled: true,
            punishable: true,
            max_violations: 2,
            normal_check_time_ms: 1500,
            click_to_swap_time_difference_ms: 75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoTotemHConfig {
    pub enabled: bool,
    pub punishable: bool,
    pub max_violations: u32,
    /// Only swaps within this many ms of the totem pop are sampled
    pub min_check_time_ms: i64,
    pub standard_deviation_threshold: f64,
    pub mean_threshold: f64,
    pub consecutive_low_sd_count: u32,
    pub offhand_slot: i32,
}

impl Default for AutoTotemHConfig {
    fn default() -> Self {
        AutoTotemHConfig {
            enabled: true,
            punishable: true,
            max_violations: 3,
            min_check_time_ms: 1500,
            standard_deviation_threshold: 15.0,
            mean_threshold: 150.0,
            consecutive_low_sd_count: 3,
            offhand_slot: 45,
        }
    }
}

check_settings!(
    AutoTotemAConfig,
    AutoTotemBConfig,
    AutoTotemCConfig,
    AutoTotemDConfig,
    AutoTotemEConfig,
    AutoTotemFConfig,
    AutoTotemGConfig,
    AutoTotemHConfig,
);

/// Thresholds for all checks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub auto_totem_a: AutoTotemAConfig,
    pub auto_totem_b: AutoTotemBConfig,
    pub auto_totem_c: AutoTotemCConfig,
    pub auto_totem_d: AutoTotemDConfig,
    pub auto_totem_e: AutoTotemEConfig,
    pub auto_totem_f: AutoTotemFConfig,
    pub auto_totem_g: AutoTotemGConfig,
    pub auto_totem_h: AutoTotemHConfig,
}

impl ChecksConfig {
    /// Look up the shared settings of a check by name
    pub fn check_settings(&self, check_name: &str) -> Option<CheckSettings> {
        self.all_settings()
            .into_iter()
            .find(|(name, _)| *name == check_name)
            .map(|(_, settings)| settings)
    }

    fn all_settings(&self) -> [(&'static str, CheckSettings); 8] {
        [
            ("AutoTotemA", self.auto_totem_a.settings()),
            ("AutoTotemB", self.auto_totem_b.settings()),
            ("AutoTotemC", self.auto_totem_c.settings()),
            ("AutoTotemD", self.auto_totem_d.settings()),
            ("AutoTotemE", self.auto_totem_e.settings()),
            ("AutoTotemF", self.auto_totem_f.settings()),
            ("AutoTotemG", self.auto_totem_g.settings()),
            ("AutoTotemH", self.auto_totem_h.settings()),
        ]
    }
}

/// Event input configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// JSON-lines file of recorded events
    pub file_path: Option<PathBuf>,
    /// Keep following the file for new events
    pub follow: bool,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (if format is not "console")
    pub file_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: "console".to_string(),
            file_path: None,
        }
    }
}

/// Webhook alerting configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub discord: Option<DiscordConfig>,
    pub webhooks: Vec<WebhookConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscordConfig {
    pub webhook_url: String,
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub name: String,
    pub url: String,
    pub method: Option<String>,
    pub headers: Option<HashMap<String, String>>,
}

/// Alert storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub database_path: Option<PathBuf>,
    /// Stored alerts older than this are pruned
    pub retention_days: i64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        PersistenceConfig {
            database_path: None,
            retention_days: 30,
        }
    }
}

/// Longest accepted alert retention, about a hundred years
pub const MAX_RETENTION_DAYS: i64 = 36_500;
const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

impl PersistenceConfig {
    /// Timestamp (ms) before which stored alerts have expired
    pub fn retention_cutoff(&self, now_ms: i64) -> i64 {
        let days = self.retention_days.clamp(1, MAX_RETENTION_DAYS);
        now_ms.saturating_sub(days * MILLIS_PER_DAY)
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values that would make a check misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings.interval_history_size < 2 {
            return Err(ConfigError::Invalid(
                "settings.interval_history_size must be at least 2".to_string(),
            ));
        }
        if self.settings.reset_violations_interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "settings.reset_violations_interval_minutes must be positive".to_string(),
            ));
        }
        for (name, settings) in self.checks.all_settings() {
            if settings.max_violations == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{}: max_violations must be positive",
                    name
                )));
            }
        }
        if self.checks.auto_totem_b.consecutive_low_sd_count == 0
            || self.checks.auto_totem_c.consecutive_violations == 0
            || self.checks.auto_totem_h.consecutive_low_sd_count == 0
        {
            return Err(ConfigError::Invalid(
                "consecutive counts must be positive".to_string(),
            ));
        }
        if !(1..=MAX_RETENTION_DAYS).contains(&self.persistence.retention_days) {
            return Err(ConfigError::Invalid(format!(
                "persistence.retention_days must be between 1 and {}",
                MAX_RETENTION_DAYS
            )));
        }
        if self.checks.auto_totem_d.acceptable_variation_ms < 0 {
            return Err(ConfigError::Invalid(
                "AutoTotemD: acceptable_variation_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Shared, reloadable view of the configuration
///
/// Checks read through the handle on every evaluation so a reload applies
/// to running players without rebuilding their checks.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<Config>>>,
}

impl ConfigHandle {
    pub fn new(config: Config) -> Self {
        ConfigHandle {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        }
    }

    /// Snapshot of the current configuration
    pub fn current(&self) -> Arc<Config> {
        self.inner.read().clone()
    }

    pub fn replace(&self, config: Config) {
        *self.inner.write() = Arc::new(config);
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
