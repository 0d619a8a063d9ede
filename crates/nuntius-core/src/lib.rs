//! Nuntius 消息核心
//!
//! 描述一条外发通知从取数、渲染到发送的生命周期，每一步都委托给按标识查找的可插拔引擎。
//!
//! ## 核心功能
//!
//! - **校验管道**：字段级链式校验，错误以 (字段上下文, 错误码) 形式累积返回
//! - **状态生命周期**：配置实体的 Enabled / Disabled / Archived 流转
//! - **配置实体**：Sender、Renderer、Template、DataFetcher
//! - **消息状态机**：New → Built → Rendered → Sent，失败进入 Fault 并计数重试
//! - **引擎注册表**：按种类与标识解析取数、渲染、发送引擎
//!
//! ## 模块结构
//!
//! - `validation`: 校验管道
//! - `status`: 状态生命周期
//! - `entities`: 配置实体
//! - `message`: 消息聚合
//! - `engines`: 引擎接口与注册表
//! - `store`: 存储接口与内存实现
//! - `models`: 枚举类型
//! - `error`: 错误类型
//!
//! 校验与状态流转失败是普通返回值（`ValidationOutcome`），不会以错误形式抛出；
//! `NuntiusError` 只用于查找失败和存储、引擎等协作方的失败。

pub mod engines;
pub mod entities;
pub mod error;
pub mod message;
pub mod models;
pub mod status;
pub mod store;
pub mod validation;

pub use engines::{EngineKind, EngineRegistry, FetchEngine, RenderEngine, SendEngine};
pub use entities::{
    ConfigurationEntity, DataFetcher, Renderer, Sender, Template, TemplateContext,
};
pub use error::{NuntiusError, Result};
pub use message::{Message, MessageRecipients, RenderedMessage};
pub use models::*;
pub use status::Lifecycle;
pub use store::{EntityStore, InMemoryMessageStore, InMemoryStore, MessageStore};
pub use validation::{FieldError, ValidationOutcome, Validator};
