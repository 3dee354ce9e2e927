//! Configuration management for Pegwatch
//!
//! This module provides:
//! - The TOML-backed service configuration and its defaults
//! - Configuration validation
//! - A shutdown broadcast shared by background tasks

use crate::cache::maintenance::DEFAULT_CLEANUP_INTERVAL;
use crate::rate_limit::LimitKind;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

/// Pegwatch service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PegwatchConfig {
    /// Cache maintenance settings
    pub cache: CacheSettings,
    /// Rate limiting settings
    pub rate_limits: RateLimitSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Expiry sweep interval in seconds
    pub cleanup_interval_secs: u64,
    /// Stats report interval in seconds
    pub stats_interval_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Rate limiting enabled
    pub enabled: bool,
    pub api_calls: RateLimitRule,
    pub risk_assessments: RateLimitRule,
    pub heavy_operations: RateLimitRule,
}

/// Requests allowed per identifier within one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    pub limit: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level
    pub level: LogLevel,
    /// Log format
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl LogLevel {
    /// Directive understood by `EnvFilter`
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl CacheSettings {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_secs)
    }
}

impl RateLimitSettings {
    /// Rule governing `kind`
    pub fn rule(&self, kind: LimitKind) -> RateLimitRule {
        match kind {
            LimitKind::ApiCalls => self.api_calls,
            LimitKind::RiskAssessments => self.risk_assessments,
            LimitKind::HeavyOperations => self.heavy_operations,
        }
    }
}

impl RateLimitRule {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for PegwatchConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings {
                cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL.as_secs(),
                stats_interval_secs: 300,
            },
            rate_limits: RateLimitSettings::default(),
            logging: LoggingSettings {
                level: LogLevel::Info,
                format: LogFormat::Text,
            },
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_calls: RateLimitRule {
                limit: 100,
                window_secs: 3600,
            },
            risk_assessments: RateLimitRule {
                limit: 20,
                window_secs: 3600,
            },
            heavy_operations: RateLimitRule {
                limit: 5,
                window_secs: 3600,
            },
        }
    }
}

/// Configuration manager
pub struct ConfigManager {
    /// Current configuration
    config: Arc<RwLock<PegwatchConfig>>,
    /// Configuration file path
    config_path: PathBuf,
    /// Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
}

impl ConfigManager {
    /// Load the configuration at `config_path`, writing the defaults there
    /// first if the file does not exist
    pub fn new(config_path: PathBuf) -> Result<Self> {
        let config = if config_path.exists() {
            Self::load_config(&config_path)?
        } else {
            let default_config = PegwatchConfig::default();
            Self::save_config(&config_path, &default_config)?;
            info!("Wrote default configuration to {}", config_path.display());
            default_config
        };

        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
            shutdown_tx,
        })
    }

    /// Get current configuration
    pub async fn get_config(&self) -> PegwatchConfig {
        self.config.read().await.clone()
    }

    /// Apply `updater`, validate the result and persist it
    pub async fn update_config<F>(&self, section: &str, updater: F) -> Result<()>
    where
        F: FnOnce(&mut PegwatchConfig),
    {
        let mut config = self.config.write().await;
        let mut updated = config.clone();
        updater(&mut updated);

        Self::validate_config(&updated)
            .with_context(|| format!("Rejected update to section '{}'", section))?;
        Self::save_config(&self.config_path, &updated)?;
        *config = updated;

        info!("Configuration updated: section={}", section);
        Ok(())
    }

    /// Subscribe to shutdown signal
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Signal every subscriber to stop
    pub fn shutdown(&self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(()) {
            warn!("Failed to broadcast shutdown signal: {}", e);
        }
    }

    /// Validate configuration
    pub fn validate_config(config: &PegwatchConfig) -> Result<()> {
        if config.cache.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!("Cache cleanup interval cannot be 0"));
        }

        if config.cache.stats_interval_secs == 0 {
            return Err(anyhow::anyhow!("Cache stats interval cannot be 0"));
        }

        for kind in LimitKind::ALL {
            let rule = config.rate_limits.rule(kind);
            if rule.limit == 0 {
                return Err(anyhow::anyhow!("Rate limit for {} cannot be 0", kind));
            }
            if rule.window_secs == 0 {
                return Err(anyhow::anyhow!("Rate limit window for {} cannot be 0", kind));
            }
        }

        Ok(())
    }

    /// Load configuration from file
    fn load_config(path: &Path) -> Result<PegwatchConfig> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PegwatchConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Save configuration to file
    fn save_config(path: &Path, config: &PegwatchConfig) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(config)
            .context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
