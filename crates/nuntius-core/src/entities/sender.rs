//! 发送器配置
//!
//! 描述使用哪个发送引擎以及引擎的配置（JSON 文本），并限定其可发送的消息类型。
//! 名称与引擎标识均转为大写保存。

use serde::{Deserialize, Serialize};

use super::{ConfigurationEntity, IdentifierChecks, normalize_engine_id};
use crate::models::{ElementStatus, MessageType};
use crate::status::Lifecycle;
use crate::validation::{ValidationOutcome, Validator};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sender {
    id: String,
    name: String,
    engine_id: String,
    settings: String,
    message_type: MessageType,
    status: ElementStatus,
}

impl Sender {
    pub const NAME_MAX_LEN: usize = 100;

    pub fn create(
        id: &str,
        name: &str,
        engine_id: &str,
        settings: &str,
        message_type: MessageType,
    ) -> Result<Self, ValidationOutcome> {
        Self::validate(id, name, engine_id, settings).into_result(|| Self {
            id: id.to_string(),
            name: name.to_uppercase(),
            engine_id: normalize_engine_id(engine_id),
            settings: settings.to_string(),
            message_type,
            status: ElementStatus::Enabled,
        })
    }

    pub fn update(&mut self, name: &str, engine_id: &str, settings: &str) -> ValidationOutcome {
        self.validate_enabled()
            .then(|| Self::validate(&self.id, name, engine_id, settings))
            .if_success(|| {
                self.name = name.to_uppercase();
                self.engine_id = normalize_engine_id(engine_id);
                self.settings = settings.to_string();
            })
    }

    fn validate(id: &str, name: &str, engine_id: &str, settings: &str) -> ValidationOutcome {
        Validator::new()
            .field("id", id)
            .valid_id()
            .field("name", name)
            .required()
            .max_len(Self::NAME_MAX_LEN)
            .field("engine_id", engine_id)
            .valid_id()
            .field("settings", settings)
            .valid_json()
            .finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &str {
        &self.settings
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }
}

impl Lifecycle for Sender {
    fn status(&self) -> ElementStatus {
        self.status
    }

    fn status_mut(&mut self) -> &mut ElementStatus {
        &mut self.status
    }
}

impl ConfigurationEntity for Sender {
    const KIND: &'static str = "Sender";

    fn id(&self) -> &str {
        &self.id
    }

    fn engine_id(&self) -> &str {
        &self.engine_id
    }
}

impl PartialEq for Sender {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Sender {}
