//! 内存存储实现
//!
//! 用于测试和 worker 的默认装配。读写都是克隆，调用方拿到的是快照，
//! 修改后需重新 `save` 才会生效。

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{EntityStore, MessageStore};
use crate::entities::ConfigurationEntity;
use crate::error::{NuntiusError, Result};
use crate::message::Message;
use crate::models::MessageStatus;

pub struct InMemoryStore<E> {
    entries: DashMap<String, E>,
}

impl<E: ConfigurationEntity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// 预置实体，便于启动装配
    pub fn with_entities(entities: impl IntoIterator<Item = E>) -> Self {
        let store = Self::new();
        for entity in entities {
            store.entries.insert(entity.id().to_string(), entity);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: ConfigurationEntity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: ConfigurationEntity> EntityStore<E> for InMemoryStore<E> {
    async fn get_by_id(&self, id: &str) -> Result<Option<E>> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<E>> {
        let mut all: Vec<E> = self.entries.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(all)
    }

    async fn save(&self, entity: &E) -> Result<()> {
        self.entries.insert(entity.id().to_string(), entity.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.entries.remove(id);
        Ok(())
    }
}

pub struct InMemoryMessageStore {
    messages: DashMap<i64, Message>,
    next_id: AtomicI64,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn get_by_id(&self, id: i64) -> Result<Option<Message>> {
        Ok(self.messages.get(&id).map(|entry| entry.value().clone()))
    }

    async fn get_all(&self) -> Result<Vec<Message>> {
        let mut all: Vec<Message> = self.messages.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(Message::id);
        Ok(all)
    }

    async fn list_by_status(&self, status: MessageStatus) -> Result<Vec<Message>> {
        let mut matched: Vec<Message> = self
            .messages
            .iter()
            .filter(|e| e.value().status() == status)
            .map(|e| e.value().clone())
            .collect();
        matched.sort_by_key(Message::id);
        Ok(matched)
    }

    async fn save(&self, message: &mut Message) -> Result<i64> {
        if message.is_new() {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            if !message.assign_id(id) {
                return Err(NuntiusError::Store(format!("无法为消息分配标识: {id}")));
            }
        }
        self.messages.insert(message.id(), message.clone());
        Ok(message.id())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.messages.remove(&id);
        Ok(())
    }
}
