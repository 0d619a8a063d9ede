//! 消息聚合
//!
//! 消息记录通知从取数、渲染到发送的进度，状态机为：
//!
//! ```text
//! New ──set_as_built──▶ Built ──set_as_rendered──▶ Rendered ──set_as_sent──▶ Sent
//!                                                     │  ▲
//!                                      mark_retry_failure│  │set_as_sent
//!                                                     ▼  │
//!                                                    Fault ──mark_retry_failure (retries ≤ 3)
//! ```
//!
//! 三个工厂分别从不同阶段开始：`create`（New）、`create_after_build`（Built）、
//! `create_after_render`（Rendered）。所有流转都先校验前置条件，失败时不做任何修改。
//! 重试只做计数和上限控制，何时重试由调用方决定。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::entities::{ConfigurationEntity, DataFetcher, Sender, Template};
use crate::models::{MessageCreationMode, MessageStatus, MessageType};
use crate::validation::{ValidationOutcome, Validator};

pub const MESSAGE_ALREADY_COMPILED: &str = "MESSAGE_ALREADY_COMPILED";
pub const MESSAGE_NOT_COMPILED: &str = "MESSAGE_NOT_COMPILED";
pub const MESSAGE_NOT_SENDABLE: &str = "MESSAGE_NOT_SENDABLE";
pub const MESSAGE_RETRIES_EXCEEDED: &str = "MESSAGE_RETRIES_EXCEEDED";
pub const CC_NOT_VALID: &str = "CC_NOT_VALID";
pub const BCC_NOT_VALID: &str = "BCC_NOT_VALID";

/// 允许再次标记失败的最大已重试次数（比较发生在自增之前，因此最多累计 4 次）
pub const RETRY_CEILING: u32 = 3;

/// 地址字段（发件人、收件人、抄送、密送）的最大长度
pub const ADDRESS_MAX_LEN: usize = 150;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecipients {
    pub to: String,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
}

impl MessageRecipients {
    pub fn to(to: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            ..Default::default()
        }
    }

    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc.push(cc.into());
        self
    }

    pub fn with_bcc(mut self, bcc: impl Into<String>) -> Self {
        self.bcc.push(bcc.into());
        self
    }
}

/// 渲染引擎产出的最终标题与正文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub content: String,
}

impl RenderedMessage {
    pub const SUBJECT_MAX_LEN: usize = 100;

    pub fn new(subject: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            content: content.into(),
        }
    }
}

fn addresses_within_bound(addresses: &[String]) -> bool {
    addresses
        .iter()
        .all(|a| a.chars().count() <= ADDRESS_MAX_LEN)
}

fn validate_addressing(from: &str, recipients: &MessageRecipients) -> Validator {
    let outcome = Validator::new()
        .field("from", from)
        .required()
        .max_len(ADDRESS_MAX_LEN)
        .field("recipients.to", recipients.to.as_str())
        .required()
        .max_len(ADDRESS_MAX_LEN)
        .field("recipients.cc", recipients.cc.as_slice())
        .condition(|cc| addresses_within_bound(cc), CC_NOT_VALID)
        .field("recipients.bcc", recipients.bcc.as_slice())
        .condition(|bcc| addresses_within_bound(bcc), BCC_NOT_VALID)
        .finish();
    Validator::from(outcome)
}

fn validate_rendered(validator: Validator, rendered: &RenderedMessage) -> Validator {
    let outcome = validator
        .field("rendered_message.subject", rendered.subject.as_str())
        .required()
        .max_len(RenderedMessage::SUBJECT_MAX_LEN)
        .field("rendered_message.content", rendered.content.as_str())
        .required()
        .finish();
    Validator::from(outcome)
}

/// 解析已通过校验的 JSON 片段
fn parse_fragment(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or(Value::Null)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredMessage")]
pub struct Message {
    id: i64,
    data_fetcher_id: Option<String>,
    template_id: Option<String>,
    sender_id: String,
    from: String,
    recipients: MessageRecipients,
    payload: String,
    rendered_message: Option<RenderedMessage>,
    message_type: MessageType,
    status: MessageStatus,
    created_on: DateTime<Utc>,
    compiled_on: Option<DateTime<Utc>>,
    generated_on: Option<DateTime<Utc>>,
    sent_on: Option<DateTime<Utc>>,
    retries: u32,
}

/// 存储中读回的消息，转换为 [`Message`] 前检查信封和状态是否一致
#[derive(Deserialize)]
struct StoredMessage {
    id: i64,
    data_fetcher_id: Option<String>,
    template_id: Option<String>,
    sender_id: String,
    from: String,
    recipients: MessageRecipients,
    payload: String,
    rendered_message: Option<RenderedMessage>,
    message_type: MessageType,
    status: MessageStatus,
    created_on: DateTime<Utc>,
    compiled_on: Option<DateTime<Utc>>,
    generated_on: Option<DateTime<Utc>>,
    sent_on: Option<DateTime<Utc>>,
    retries: u32,
}

impl TryFrom<StoredMessage> for Message {
    type Error = String;

    fn try_from(stored: StoredMessage) -> Result<Self, Self::Error> {
        let envelope: Value = serde_json::from_str(&stored.payload)
            .map_err(|e| format!("消息 {} 的载荷不是合法 JSON: {e}", stored.id))?;
        let Value::Object(sections) = &envelope else {
            return Err(format!("消息 {} 的载荷必须是 JSON 对象", stored.id));
        };

        let mode = sections.get("mode").and_then(Value::as_str);
        if mode.and_then(MessageCreationMode::from_name).is_none() {
            return Err(format!("消息 {} 的载荷缺少有效的 mode", stored.id));
        }
        if !sections.contains_key("header") {
            return Err(format!("消息 {} 的载荷缺少 header", stored.id));
        }
        if stored.status != MessageStatus::New && !sections.contains_key("body") {
            return Err(format!("消息 {} 处于 {} 状态但载荷缺少 body", stored.id, stored.status));
        }
        let needs_rendered = matches!(
            stored.status,
            MessageStatus::Rendered | MessageStatus::Sent | MessageStatus::Fault
        );
        if needs_rendered && stored.rendered_message.is_none() {
            return Err(format!("消息 {} 处于 {} 状态但缺少渲染结果", stored.id, stored.status));
        }

        Ok(Self {
            id: stored.id,
            data_fetcher_id: stored.data_fetcher_id,
            template_id: stored.template_id,
            sender_id: stored.sender_id,
            from: stored.from,
            recipients: stored.recipients,
            payload: stored.payload,
            rendered_message: stored.rendered_message,
            message_type: stored.message_type,
            status: stored.status,
            created_on: stored.created_on,
            compiled_on: stored.compiled_on,
            generated_on: stored.generated_on,
            sent_on: stored.sent_on,
            retries: stored.retries,
        })
    }
}

impl Message {
    fn new(
        data_fetcher_id: Option<String>,
        template_id: Option<String>,
        sender_id: String,
        from: &str,
        recipients: &MessageRecipients,
        message_type: MessageType,
        payload: Value,
    ) -> Self {
        Self {
            id: 0,
            data_fetcher_id,
            template_id,
            sender_id,
            from: from.to_string(),
            recipients: recipients.clone(),
            payload: payload.to_string(),
            rendered_message: None,
            message_type,
            status: MessageStatus::New,
            created_on: Utc::now(),
            compiled_on: None,
            generated_on: None,
            sent_on: None,
            retries: 0,
        }
    }

    /// 从取数阶段开始：状态 New，载荷只有 `mode` 与 `header`
    pub fn create(
        fetcher: &DataFetcher,
        template: &Template,
        sender: &Sender,
        from: &str,
        recipients: &MessageRecipients,
        message_type: MessageType,
        header_payload: &str,
    ) -> Result<Self, ValidationOutcome> {
        validate_addressing(from, recipients)
            .field("header_payload", header_payload)
            .valid_json()
            .finish()
            .into_result(|| {
                Self::new(
                    Some(fetcher.id().to_string()),
                    Some(template.id().to_string()),
                    sender.id().to_string(),
                    from,
                    recipients,
                    message_type,
                    json!({
                        "mode": MessageCreationMode::FromBuilder.name(),
                        "header": parse_fragment(header_payload),
                    }),
                )
            })
    }

    /// 已有正文载荷：状态直接为 Built
    pub fn create_after_build(
        template: &Template,
        sender: &Sender,
        from: &str,
        recipients: &MessageRecipients,
        message_type: MessageType,
        body_payload: &str,
    ) -> Result<Self, ValidationOutcome> {
        validate_addressing(from, recipients)
            .field("body_payload", body_payload)
            .valid_json()
            .finish()
            .into_result(|| {
                let mut message = Self::new(
                    None,
                    Some(template.id().to_string()),
                    sender.id().to_string(),
                    from,
                    recipients,
                    message_type,
                    json!({
                        "mode": MessageCreationMode::FromTemplate.name(),
                        "header": {},
                        "body": parse_fragment(body_payload),
                    }),
                );
                message.status = MessageStatus::Built;
                message.compiled_on = Some(message.created_on);
                message
            })
    }

    /// 已渲染完成：状态直接为 Rendered，跳过取数与模板
    pub fn create_after_render(
        sender: &Sender,
        from: &str,
        recipients: &MessageRecipients,
        message_type: MessageType,
        rendered_message: RenderedMessage,
    ) -> Result<Self, ValidationOutcome> {
        validate_rendered(validate_addressing(from, recipients), &rendered_message)
            .finish()
            .into_result(|| {
                let mut message = Self::new(
                    None,
                    None,
                    sender.id().to_string(),
                    from,
                    recipients,
                    message_type,
                    json!({
                        "mode": MessageCreationMode::FromRenderedMessage.name(),
                        "header": {},
                        "body": {},
                    }),
                );
                message.status = MessageStatus::Rendered;
                message.rendered_message = Some(rendered_message);
                message.compiled_on = Some(message.created_on);
                message.generated_on = Some(message.created_on);
                message
            })
    }

    /// New → Built，把正文载荷合并进信封
    pub fn set_as_built(&mut self, body_payload: &str) -> ValidationOutcome {
        let outcome = Validator::new()
            .field("body_payload", body_payload)
            .valid_json()
            .field("Status", self.status)
            .equal_to(MessageStatus::New, MESSAGE_ALREADY_COMPILED)
            .finish();
        self.log_transition("built", &outcome);

        outcome.if_success(|| {
            let mut envelope = parse_fragment(&self.payload);
            if let Value::Object(map) = &mut envelope {
                map.insert("body".to_string(), parse_fragment(body_payload));
            }
            self.payload = envelope.to_string();
            self.status = MessageStatus::Built;
            self.compiled_on = Some(Utc::now());
        })
    }

    /// Built → Rendered
    pub fn set_as_rendered(&mut self, rendered_message: RenderedMessage) -> ValidationOutcome {
        let outcome = validate_rendered(Validator::new(), &rendered_message)
            .field("Status", self.status)
            .equal_to(MessageStatus::Built, MESSAGE_NOT_COMPILED)
            .finish();
        self.log_transition("rendered", &outcome);

        outcome.if_success(|| {
            self.rendered_message = Some(rendered_message);
            self.status = MessageStatus::Rendered;
            self.generated_on = Some(Utc::now());
        })
    }

    /// 发送失败：Rendered/Fault → Fault，重试次数加一
    ///
    /// 上限检查 `retries <= 3` 在自增之前进行，所以第 5 次调用会被拒绝。
    pub fn mark_retry_failure(&mut self) -> ValidationOutcome {
        let outcome = Validator::new()
            .field("Status", self.status)
            .one_of(
                &[MessageStatus::Rendered, MessageStatus::Fault],
                MESSAGE_NOT_SENDABLE,
            )
            .field("Retries", self.retries)
            .at_most(RETRY_CEILING, MESSAGE_RETRIES_EXCEEDED)
            .finish();
        self.log_transition("fault", &outcome);

        outcome.if_success(|| {
            self.status = MessageStatus::Fault;
            self.retries += 1;
        })
    }

    /// Rendered/Fault → Sent，重试次数清零
    pub fn set_as_sent(&mut self) -> ValidationOutcome {
        let outcome = Validator::new()
            .field("Status", self.status)
            .one_of(
                &[MessageStatus::Rendered, MessageStatus::Fault],
                MESSAGE_NOT_SENDABLE,
            )
            .finish();
        self.log_transition("sent", &outcome);

        outcome.if_success(|| {
            self.retries = 0;
            self.status = MessageStatus::Sent;
            self.sent_on = Some(Utc::now());
        })
    }

    fn log_transition(&self, target: &str, outcome: &ValidationOutcome) {
        if outcome.is_success() {
            debug!(
                message_id = self.id,
                from_status = %self.status,
                target,
                "消息状态流转"
            );
        } else {
            warn!(
                message_id = self.id,
                status = %self.status,
                target,
                errors = %outcome,
                "消息状态流转被拒绝"
            );
        }
    }

    /// 由存储在首次持久化时分配标识；已分配过的消息返回 false 且不做修改
    pub fn assign_id(&mut self, id: i64) -> bool {
        if self.id != 0 || id <= 0 {
            return false;
        }
        self.id = id;
        true
    }

    pub fn is_new(&self) -> bool {
        self.id == 0
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn data_fetcher_id(&self) -> Option<&str> {
        self.data_fetcher_id.as_deref()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.template_id.as_deref()
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn recipients(&self) -> &MessageRecipients {
        &self.recipients
    }

    /// 原始 JSON 信封文本
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn payload_header(&self) -> Option<Value> {
        self.payload_section("header")
    }

    pub fn payload_body(&self) -> Option<Value> {
        self.payload_section("body")
    }

    pub fn creation_mode(&self) -> Option<MessageCreationMode> {
        self.payload_section("mode")
            .as_ref()
            .and_then(Value::as_str)
            .and_then(MessageCreationMode::from_name)
    }

    fn payload_section(&self, key: &str) -> Option<Value> {
        serde_json::from_str::<Value>(&self.payload)
            .ok()?
            .get(key)
            .cloned()
    }

    pub fn rendered_message(&self) -> Option<&RenderedMessage> {
        self.rendered_message.as_ref()
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn status(&self) -> MessageStatus {
        self.status
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    pub fn compiled_on(&self) -> Option<DateTime<Utc>> {
        self.compiled_on
    }

    pub fn generated_on(&self) -> Option<DateTime<Utc>> {
        self.generated_on
    }

    pub fn sent_on(&self) -> Option<DateTime<Utc>> {
        self.sent_on
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }
}
