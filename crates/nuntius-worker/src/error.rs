//! worker 错误类型
//!
//! 区分查找/协作方失败（来自核心）、状态流转被拒绝和启动期配置问题，
//! 便于派发循环决定是跳过、稍后重试还是直接退出。

use nuntius_core::{NuntiusError, ValidationOutcome};
use nuntius_shared::SharedError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Core(#[from] NuntiusError),

    #[error("配置加载失败: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Shared(#[from] SharedError),

    #[error("消息缺少引用: message_id={message_id}, 字段={field}")]
    MissingReference {
        message_id: i64,
        field: &'static str,
    },

    #[error("操作被拒绝: message_id={message_id}, {outcome}")]
    Rejected {
        message_id: i64,
        outcome: ValidationOutcome,
    },
}

pub type Result<T> = std::result::Result<T, WorkerError>;

impl WorkerError {
    pub fn rejected(message_id: i64, outcome: ValidationOutcome) -> Self {
        Self::Rejected {
            message_id,
            outcome,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Core(e) => e.error_code(),
            Self::Config(_) => "CONFIG_ERROR",
            Self::Shared(e) => e.error_code(),
            Self::MissingReference { .. } => "MISSING_REFERENCE",
            Self::Rejected { .. } => "OPERATION_REJECTED",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Core(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 被拒绝时的校验结果，用于判断是配置实体被禁用还是消息状态不符
    pub fn outcome(&self) -> Option<&ValidationOutcome> {
        match self {
            Self::Rejected { outcome, .. } => Some(outcome),
            Self::Core(NuntiusError::Validation(outcome)) => Some(outcome),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorkerError::MissingReference {
            message_id: 7,
            field: "template_id",
        };
        assert_eq!(err.to_string(), "消息缺少引用: message_id=7, 字段=template_id");
        assert_eq!(err.error_code(), "MISSING_REFERENCE");

        let err = WorkerError::rejected(3, ValidationOutcome::failure("Status", "ELEMENT_NOT_ENABLED"));
        assert_eq!(
            err.to_string(),
            "操作被拒绝: message_id=3, validation failed: Status: ELEMENT_NOT_ENABLED"
        );
        assert!(err.outcome().is_some_and(|o| o.has_error_for("Status")));
    }

    #[test]
    fn test_retryable_follows_core() {
        let err: WorkerError = NuntiusError::engine("SMTP", "timeout").into();
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "ENGINE_ERROR");

        let err: WorkerError = NuntiusError::EngineNotFound {
            kind: nuntius_core::EngineKind::Send,
            engine_id: "FAX".to_string(),
        }
        .into();
        assert!(!err.is_retryable());
    }
}
