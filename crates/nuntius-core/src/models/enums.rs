//! 封闭枚举类型定义
//!
//! 每个枚举都带有稳定的整数编码（用于持久化），`from_value` 遇到未知编码时返回错误，
//! 不接受开放字符串常量。JSON 中以变体名序列化。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{NuntiusError, Result};

/// 配置实体状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementStatus {
    /// 启用 - 可被使用和修改
    #[default]
    Enabled,
    /// 禁用 - 暂停使用，可重新启用
    Disabled,
    /// 已归档 - 终态，不允许再变更
    Archived,
}

impl ElementStatus {
    pub const ALL: [Self; 3] = [Self::Enabled, Self::Disabled, Self::Archived];

    pub fn value(self) -> i32 {
        match self {
            Self::Enabled => 0,
            Self::Disabled => 1,
            Self::Archived => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
            Self::Archived => "Archived",
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.value() == value)
            .ok_or(NuntiusError::InvalidEnumValue {
                kind: "ElementStatus",
                value,
            })
    }
}

/// 消息类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// 纯文本（短信等）
    Text,
    #[default]
    Email,
    /// 推送通知
    Notification,
}

impl MessageType {
    pub const ALL: [Self; 3] = [Self::Text, Self::Email, Self::Notification];

    pub fn value(self) -> i32 {
        match self {
            Self::Text => 0,
            Self::Email => 1,
            Self::Notification => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Email => "Email",
            Self::Notification => "Notification",
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.value() == value)
            .ok_or(NuntiusError::InvalidEnumValue {
                kind: "MessageType",
                value,
            })
    }
}

/// 消息创建方式
///
/// 记录在消息载荷的 `mode` 字段中，标识消息从哪个流水线阶段开始
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageCreationMode {
    /// 取数 + 模板渲染
    FromBuilder,
    /// 已有正文载荷 + 模板渲染
    FromTemplate,
    /// 已渲染完成，跳过模板
    FromRenderedMessage,
}

impl MessageCreationMode {
    pub const ALL: [Self; 3] = [
        Self::FromBuilder,
        Self::FromTemplate,
        Self::FromRenderedMessage,
    ];

    pub fn value(self) -> i32 {
        match self {
            Self::FromBuilder => 0,
            Self::FromTemplate => 1,
            Self::FromRenderedMessage => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::FromBuilder => "FromBuilder",
            Self::FromTemplate => "FromTemplate",
            Self::FromRenderedMessage => "FromRenderedMessage",
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|m| m.value() == value)
            .ok_or(NuntiusError::InvalidEnumValue {
                kind: "MessageCreationMode",
                value,
            })
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// 消息优先级，编码越小越优先
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessagePriority {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl MessagePriority {
    pub const ALL: [Self; 4] = [Self::Critical, Self::High, Self::Normal, Self::Low];

    pub fn value(self) -> i32 {
        match self {
            Self::Critical => 1,
            Self::High => 10,
            Self::Normal => 50,
            Self::Low => 99,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.value() == value)
            .ok_or(NuntiusError::InvalidEnumValue {
                kind: "MessagePriority",
                value,
            })
    }
}

/// 消息状态
///
/// `New → Built → Rendered → {Sent | Fault}`，Fault 可重试回到 Sent。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    #[default]
    New,
    Built,
    Rendered,
    Sent,
    Fault,
}

impl MessageStatus {
    pub const ALL: [Self; 5] = [
        Self::New,
        Self::Built,
        Self::Rendered,
        Self::Sent,
        Self::Fault,
    ];

    pub fn value(self) -> i32 {
        match self {
            Self::New => 0,
            Self::Built => 1,
            Self::Rendered => 2,
            Self::Sent => 3,
            Self::Fault => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::Built => "Built",
            Self::Rendered => "Rendered",
            Self::Sent => "Sent",
            Self::Fault => "Fault",
        }
    }

    pub fn from_value(value: i32) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.value() == value)
            .ok_or(NuntiusError::InvalidEnumValue {
                kind: "MessageStatus",
                value,
            })
    }

    /// 流水线是否已走到末端（Sent 或 Fault）
    ///
    /// 仅用于展示；Fault 仍可通过重试转为 Sent。
    pub fn is_end_status(self) -> bool {
        matches!(self, Self::Sent | Self::Fault)
    }

    /// 是否可进入发送流程
    pub fn is_sendable(self) -> bool {
        matches!(self, Self::Rendered | Self::Fault)
    }
}

macro_rules! impl_named_enum {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                /// 全部取值，按编码顺序
                pub fn all() -> &'static [Self] {
                    &Self::ALL
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.name())
                }
            }
        )*
    };
}

impl_named_enum!(
    ElementStatus,
    MessageType,
    MessageCreationMode,
    MessagePriority,
    MessageStatus,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_round_trips_every_variant() {
        for &status in ElementStatus::all() {
            assert_eq!(ElementStatus::from_value(status.value()).unwrap(), status);
        }
        for &status in MessageStatus::all() {
            assert_eq!(MessageStatus::from_value(status.value()).unwrap(), status);
        }
        for &priority in MessagePriority::all() {
            assert_eq!(MessagePriority::from_value(priority.value()).unwrap(), priority);
        }
        assert_eq!(MessageType::all().len(), 3);
        assert_eq!(MessageCreationMode::all()[2], MessageCreationMode::FromRenderedMessage);
    }

    #[test]
    fn test_from_value_rejects_unknown_codes() {
        assert!(matches!(
            ElementStatus::from_value(3),
            Err(NuntiusError::InvalidEnumValue { kind: "ElementStatus", value: 3 })
        ));
        assert!(MessageType::from_value(-1).is_err());
        assert!(MessageCreationMode::from_value(7).is_err());
        // 优先级编码不连续
        assert!(MessagePriority::from_value(2).is_err());
        assert!(MessageStatus::from_value(5).is_err());
    }

    #[test]
    fn test_message_type_codes() {
        assert_eq!(MessageType::from_value(0).unwrap(), MessageType::Text);
        assert_eq!(MessageType::from_value(1).unwrap(), MessageType::Email);
        assert_eq!(MessageType::from_value(2).unwrap(), MessageType::Notification);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(ElementStatus::default(), ElementStatus::Enabled);
        assert_eq!(MessageStatus::default(), MessageStatus::New);
        assert_eq!(MessagePriority::default(), MessagePriority::Normal);
    }

    #[test]
    fn test_message_status_predicates() {
        assert!(MessageStatus::Sent.is_end_status());
        assert!(MessageStatus::Fault.is_end_status());
        assert!(!MessageStatus::Rendered.is_end_status());

        assert!(MessageStatus::Rendered.is_sendable());
        assert!(MessageStatus::Fault.is_sendable());
        assert!(!MessageStatus::Sent.is_sendable());
        assert!(!MessageStatus::Built.is_sendable());
    }

    #[test]
    fn test_serialization_uses_variant_names() {
        assert_eq!(
            serde_json::to_string(&MessageCreationMode::FromBuilder).unwrap(),
            "\"FromBuilder\""
        );
        assert_eq!(
            serde_json::from_str::<ElementStatus>("\"Archived\"").unwrap(),
            ElementStatus::Archived
        );
        assert_eq!(MessageStatus::Fault.to_string(), "Fault");
        assert_eq!(
            MessageCreationMode::from_name("FromTemplate"),
            Some(MessageCreationMode::FromTemplate)
        );
    }
}
