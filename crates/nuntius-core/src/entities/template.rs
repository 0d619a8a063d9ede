//! 消息模板配置
//!
//! 模板携带标题、正文和语言上下文，`engine_id` 指定渲染引擎。
//! 名称与引擎标识转为大写保存。

use serde::{Deserialize, Serialize};

use super::{ConfigurationEntity, IdentifierChecks, normalize_engine_id};
use crate::models::{ElementStatus, MessageType};
use crate::status::Lifecycle;
use crate::validation::{ValidationOutcome, Validator};

/// 模板上下文：语言代码（必填，最多 2 个字符）与可选作用域
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateContext {
    pub language: String,
    pub scope: Option<String>,
}

impl TemplateContext {
    pub const LANGUAGE_MAX_LEN: usize = 2;
    pub const SCOPE_MAX_LEN: usize = 50;

    pub fn new(language: impl Into<String>, scope: Option<&str>) -> Self {
        Self {
            language: language.into(),
            scope: scope.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    id: String,
    name: String,
    engine_id: String,
    context: TemplateContext,
    subject: String,
    content: String,
    message_type: MessageType,
    status: ElementStatus,
}

impl Template {
    pub const NAME_MAX_LEN: usize = 100;
    pub const SUBJECT_MAX_LEN: usize = 100;

    pub fn create(
        id: &str,
        name: &str,
        engine_id: &str,
        context: TemplateContext,
        subject: &str,
        content: &str,
        message_type: MessageType,
    ) -> Result<Self, ValidationOutcome> {
        Self::validate(id, name, engine_id, &context, subject, content).into_result(|| Self {
            id: id.to_string(),
            name: name.to_uppercase(),
            engine_id: normalize_engine_id(engine_id),
            context,
            subject: subject.to_string(),
            content: content.to_string(),
            message_type,
            status: ElementStatus::Enabled,
        })
    }

    /// 修改渲染引擎、标题与正文；名称、上下文和消息类型保持不变
    pub fn update(&mut self, engine_id: &str, subject: &str, content: &str) -> ValidationOutcome {
        self.validate_enabled()
            .then(|| {
                Self::validate(&self.id, &self.name, engine_id, &self.context, subject, content)
            })
            .if_success(|| {
                self.engine_id = normalize_engine_id(engine_id);
                self.subject = subject.to_string();
                self.content = content.to_string();
            })
    }

    fn validate(
        id: &str,
        name: &str,
        engine_id: &str,
        context: &TemplateContext,
        subject: &str,
        content: &str,
    ) -> ValidationOutcome {
        Validator::new()
            .field("id", id)
            .valid_id()
            .field("name", name)
            .required()
            .max_len(Self::NAME_MAX_LEN)
            .field("engine_id", engine_id)
            .valid_id()
            .field("context.language", context.language.as_str())
            .required()
            .max_len(TemplateContext::LANGUAGE_MAX_LEN)
            .field("context.scope", context.scope.as_deref())
            .max_len(TemplateContext::SCOPE_MAX_LEN)
            .field("subject", subject)
            .required()
            .max_len(Self::SUBJECT_MAX_LEN)
            .field("content", content)
            .required()
            .finish()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }
}

impl Lifecycle for Template {
    fn status(&self) -> ElementStatus {
        self.status
    }

    fn status_mut(&mut self) -> &mut ElementStatus {
        &mut self.status
    }
}

impl ConfigurationEntity for Template {
    const KIND: &'static str = "Template";

    fn id(&self) -> &str {
        &self.id
    }

    fn engine_id(&self) -> &str {
        &self.engine_id
    }
}

impl PartialEq for Template {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Template {}
