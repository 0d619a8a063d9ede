//! 可观测性模块
//!
//! 统一初始化结构化日志并登记业务指标的描述。
//! 指标通过 `metrics` 门面记录，是否导出以及导出到哪里由进程安装的 recorder 决定。

pub mod metrics;
pub mod tracing;

use ::tracing::info;
use serde::Deserialize;

use crate::error::Result;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    /// 服务名称，写入每条日志的 service 字段
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// 日志级别（如 "info", "nuntius_core=debug"），`RUST_LOG` 优先
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json_logs: bool,
}

fn default_service_name() -> String {
    "nuntius".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// 从环境变量加载配置
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| default_log_level()),
            json_logs: std::env::var("JSON_LOGS")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

/// 可观测性资源守卫
///
/// 持有到进程退出，drop 时记录关闭日志。
pub struct ObservabilityGuard {
    service_name: String,
}

impl ObservabilityGuard {
    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!(service = %self.service_name, "可观测性组件关闭");
    }
}

/// 统一初始化可观测性
///
/// ```ignore
/// use nuntius_shared::observability::{init, ObservabilityConfig};
///
/// let config = ObservabilityConfig::from_env("nuntius-worker");
/// let _guard = init(&config)?;
/// ```
pub fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;
    metrics::describe_metrics();

    info!(
        service = %config.service_name,
        log_level = %config.log_level,
        json_logs = config.json_logs,
        "可观测性初始化完成"
    );

    Ok(ObservabilityGuard {
        service_name: config.service_name.clone(),
    })
}
