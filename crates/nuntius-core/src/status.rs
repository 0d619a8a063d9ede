//! 配置实体的状态生命周期
//!
//! 所有配置实体（Sender、Renderer、Template、DataFetcher）共用同一套状态机：
//! Enabled ⇄ Disabled，任意状态 → Archived，Archived 为终态。
//! 变更到当前状态视为错误；失败时不修改状态。

use tracing::debug;

use crate::models::ElementStatus;
use crate::validation::{ValidationOutcome, Validator};

pub const CANNOT_CHANGE_STATUS: &str = "CANNOT_CHANGE_STATUS";
pub const CANNOT_CHANGE_FROM_ARCHIVED: &str = "CANNOT_CHANGE_FROM_ARCHIVED";
pub const ELEMENT_NOT_ENABLED: &str = "ELEMENT_NOT_ENABLED";

/// 状态变更校验：目标不能等于当前，当前不能是 Archived
pub fn validate_status_change(current: ElementStatus, target: ElementStatus) -> ValidationOutcome {
    Validator::new()
        .field("new_status", target)
        .condition(|t| *t != current, CANNOT_CHANGE_STATUS)
        .field("current_status", current)
        .condition(|c| *c != ElementStatus::Archived, CANNOT_CHANGE_FROM_ARCHIVED)
        .finish()
}

/// 带状态生命周期的实体
pub trait Lifecycle {
    fn status(&self) -> ElementStatus;

    fn status_mut(&mut self) -> &mut ElementStatus;

    fn enable(&mut self) -> ValidationOutcome {
        self.change_status(ElementStatus::Enabled)
    }

    fn disable(&mut self) -> ValidationOutcome {
        self.change_status(ElementStatus::Disabled)
    }

    fn archive(&mut self) -> ValidationOutcome {
        self.change_status(ElementStatus::Archived)
    }

    fn change_status(&mut self, target: ElementStatus) -> ValidationOutcome {
        let current = self.status();
        let outcome = validate_status_change(current, target);
        if outcome.is_success() {
            *self.status_mut() = target;
            debug!(from = %current, to = %target, "实体状态已变更");
        }
        outcome
    }

    /// `Update` 前置守卫：仅 Enabled 状态允许修改，错误上下文为 "Status"
    fn validate_enabled(&self) -> ValidationOutcome {
        Validator::new()
            .field("Status", self.status())
            .equal_to(ElementStatus::Enabled, ELEMENT_NOT_ENABLED)
            .finish()
    }
}
