//! 配置管理模块
//!
//! 分层加载配置文件并允许环境变量覆盖，提供类型安全的配置访问。

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::{Result, SharedError};
use crate::observability::ObservabilityConfig;
use crate::retry::RetryPolicy;

/// 消息派发配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 单次派发中发送的最大尝试次数（含首次）
    pub max_send_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    /// 扫描待派发消息的间隔
    pub poll_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: 4,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
            poll_interval_ms: 5_000,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_send_attempts == 0 {
            return Err(SharedError::InvalidConfig {
                field: "dispatch.max_send_attempts",
                message: "至少为 1".to_string(),
            });
        }
        if self.backoff_multiplier < 1.0 {
            return Err(SharedError::InvalidConfig {
                field: "dispatch.backoff_multiplier",
                message: "必须大于等于 1".to_string(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(SharedError::InvalidConfig {
                field: "dispatch.poll_interval_ms",
                message: "必须大于 0".to_string(),
            });
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(SharedError::InvalidConfig {
                field: "dispatch.initial_backoff_ms",
                message: format!("不能超过 max_backoff_ms={}", self.max_backoff_ms),
            });
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_send_attempts.saturating_sub(1),
            initial_delay: Duration::from_millis(self.initial_backoff_ms),
            max_delay: Duration::from_millis(self.max_backoff_ms),
            multiplier: self.backoff_multiplier,
        }
    }
}

impl From<&DispatchConfig> for RetryPolicy {
    fn from(config: &DispatchConfig) -> Self {
        config.retry_policy()
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NUNTIUS_ 前缀，如 NUNTIUS_DISPATCH__MAX_SEND_ATTEMPTS -> dispatch.max_send_attempts）
    pub fn load(service_name: &str) -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("NUNTIUS_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), service_name, &env)
    }

    /// 从指定目录加载，便于测试
    pub fn load_from(
        config_dir: &Path,
        service_name: &str,
        env: &str,
    ) -> std::result::Result<Self, ConfigError> {
        let mut config: Self = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{env}.toml"))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{service_name}.toml"))).required(false),
            )
            // 字段名本身含下划线，层级分隔用双下划线
            .add_source(
                Environment::with_prefix("NUNTIUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        // 日志里的服务名跟随顶层配置
        if config.observability.service_name != config.service_name {
            config.observability.service_name = config.service_name.clone();
        }

        Ok(config)
    }

    /// 加载并校验
    pub fn load_validated(service_name: &str) -> Result<Self> {
        let config = Self::load(service_name)?;
        config.dispatch.validate()?;
        Ok(config)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
