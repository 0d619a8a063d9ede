//! 基础设施错误
//!
//! 只覆盖共享库自身的失败（配置加载、日志初始化）；领域错误由各业务 crate 定义。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SharedError {
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("日志初始化失败: {0}")]
    Observability(String),

    #[error("无效的配置项: {field} - {message}")]
    InvalidConfig { field: &'static str, message: String },
}

pub type Result<T> = std::result::Result<T, SharedError>;

impl SharedError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Observability(_) => "OBSERVABILITY_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
        }
    }

    /// 基础设施初始化错误都需要人工介入
    pub fn is_retryable(&self) -> bool {
        false
    }
}
