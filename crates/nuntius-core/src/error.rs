//! 核心错误类型
//!
//! 校验与状态流转失败以 `ValidationOutcome` 作为普通返回值处理；
//! 本模块只覆盖查找失败（配置/部署问题）与协作方（存储、引擎）失败。

use thiserror::Error;

use crate::engines::EngineKind;
use crate::validation::ValidationOutcome;

#[derive(Debug, Error)]
pub enum NuntiusError {
    #[error("引擎未找到: kind={kind}, engine_id={engine_id}")]
    EngineNotFound { kind: EngineKind, engine_id: String },

    #[error("记录未找到: {entity} id={id}")]
    EntityNotFound { entity: &'static str, id: String },

    #[error("无效的枚举值: {kind}={value}")]
    InvalidEnumValue { kind: &'static str, value: i32 },

    #[error("存储错误: {0}")]
    Store(String),

    #[error("引擎执行失败: engine_id={engine_id}, 原因={reason}")]
    Engine { engine_id: String, reason: String },

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Validation(#[from] ValidationOutcome),
}

pub type Result<T> = std::result::Result<T, NuntiusError>;

impl NuntiusError {
    pub fn engine(engine_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Engine {
            engine_id: engine_id.into(),
            reason: reason.into(),
        }
    }

    /// 存储与引擎错误可能是瞬时的，其余均为确定性失败
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Engine { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EngineNotFound { .. } => "ENGINE_NOT_FOUND",
            Self::EntityNotFound { .. } => "ENTITY_NOT_FOUND",
            Self::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            Self::Store(_) => "STORE_ERROR",
            Self::Engine { .. } => "ENGINE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
