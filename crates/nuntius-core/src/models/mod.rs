//! 领域枚举与值类型

pub mod enums;

pub use enums::{ElementStatus, MessageCreationMode, MessagePriority, MessageStatus, MessageType};
