//! 存储接口
//!
//! 核心不关心持久化细节，只依赖这里的异步接口；存储错误原样向上传播。
//! `memory` 子模块提供基于 DashMap 的内存实现。

pub mod memory;

use async_trait::async_trait;

use crate::entities::ConfigurationEntity;
use crate::error::{NuntiusError, Result};
use crate::message::Message;
use crate::models::MessageStatus;

pub use memory::{InMemoryMessageStore, InMemoryStore};

/// 配置实体仓储接口，按字符串标识存取
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EntityStore<E: ConfigurationEntity>: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<E>>;
    async fn get_all(&self) -> Result<Vec<E>>;
    /// 按标识插入或覆盖
    async fn save(&self, entity: &E) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

/// 消息仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<Message>>;
    async fn get_all(&self) -> Result<Vec<Message>>;
    async fn list_by_status(&self, status: MessageStatus) -> Result<Vec<Message>>;
    /// 新消息（id 为 0）分配标识后插入，其余按标识覆盖；返回消息标识
    async fn save(&self, message: &mut Message) -> Result<i64>;
    async fn delete(&self, id: i64) -> Result<()>;
}

/// 读取配置实体，不存在时返回 `EntityNotFound`
pub async fn require_entity<E: ConfigurationEntity>(
    store: &dyn EntityStore<E>,
    id: &str,
) -> Result<E> {
    store
        .get_by_id(id)
        .await?
        .ok_or_else(|| NuntiusError::EntityNotFound {
            entity: E::KIND,
            id: id.to_string(),
        })
}

/// 读取消息，不存在时返回 `EntityNotFound`
pub async fn require_message(store: &dyn MessageStore, id: i64) -> Result<Message> {
    store
        .get_by_id(id)
        .await?
        .ok_or_else(|| NuntiusError::EntityNotFound {
            entity: "Message",
            id: id.to_string(),
        })
}
