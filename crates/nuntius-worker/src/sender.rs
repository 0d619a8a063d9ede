//! 模拟发送引擎
//!
//! 通过 `SendEngine` trait 抽象投递行为，各渠道（邮件、短信、推送）提供独立实现。
//! 当前版本只记录日志，便于在无外部依赖的情况下验证派发管道的完整性。
//! 替换为真实 SDK 调用时只需实现同一 trait。

use async_trait::async_trait;
use nuntius_core::{
    ConfigurationEntity, Message, MessageType, NuntiusError, RenderedMessage, Result, SendEngine,
    Sender,
};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

pub const SMTP_ENGINE_ID: &str = "SMTP";
pub const SMS_ENGINE_ID: &str = "SMS";
pub const PUSH_ENGINE_ID: &str = "PUSH";

/// 只有已渲染的消息可以投递
fn rendered_of<'a>(engine_id: &str, message: &'a Message) -> Result<&'a RenderedMessage> {
    message
        .rendered_message()
        .ok_or_else(|| NuntiusError::engine(engine_id, format!("消息 {} 尚未渲染", message.id())))
}

/// 发送配置必须是 JSON 对象，具体键由各渠道检查
fn settings_of(engine_id: &str, sender: &Sender) -> Result<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(sender.settings())? {
        Value::Object(map) => Ok(map),
        _ => Err(NuntiusError::engine(engine_id, "发送配置必须是 JSON 对象")),
    }
}

// ---------------------------------------------------------------------------
// 邮件
// ---------------------------------------------------------------------------

/// 模拟 SMTP 发送引擎
///
/// 发送配置需包含 `host`
pub struct SmtpSendEngine;

#[async_trait]
impl SendEngine for SmtpSendEngine {
    fn id(&self) -> &str {
        SMTP_ENGINE_ID
    }

    async fn send(&self, sender: &Sender, message: &Message) -> Result<()> {
        let settings = settings_of(SMTP_ENGINE_ID, sender)?;
        let host = settings
            .get("host")
            .and_then(Value::as_str)
            .ok_or_else(|| NuntiusError::engine(SMTP_ENGINE_ID, "发送配置缺少 host"))?;
        let rendered = rendered_of(SMTP_ENGINE_ID, message)?;
        let delivery_id = Uuid::now_v7().to_string();

        info!(
            engine = SMTP_ENGINE_ID,
            sender_id = %sender.id(),
            message_id = message.id(),
            delivery_id = %delivery_id,
            host = %host,
            from = %message.from(),
            to = %message.recipients().to,
            cc = message.recipients().cc.len(),
            bcc = message.recipients().bcc.len(),
            subject = %rendered.subject,
            "模拟发送邮件"
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 短信
// ---------------------------------------------------------------------------

/// 模拟短信发送引擎
///
/// 短信只投递纯文本消息，正文原样发送
pub struct SmsSendEngine;

#[async_trait]
impl SendEngine for SmsSendEngine {
    fn id(&self) -> &str {
        SMS_ENGINE_ID
    }

    async fn send(&self, sender: &Sender, message: &Message) -> Result<()> {
        if message.message_type() != MessageType::Text {
            return Err(NuntiusError::engine(
                SMS_ENGINE_ID,
                format!("不支持的消息类型: {}", message.message_type()),
            ));
        }
        let rendered = rendered_of(SMS_ENGINE_ID, message)?;
        let delivery_id = Uuid::now_v7().to_string();

        info!(
            engine = SMS_ENGINE_ID,
            sender_id = %sender.id(),
            message_id = message.id(),
            delivery_id = %delivery_id,
            to = %message.recipients().to,
            body = %rendered.content,
            "模拟发送短信"
        );

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// 推送
// ---------------------------------------------------------------------------

/// 模拟 APP 推送引擎
pub struct PushSendEngine;

#[async_trait]
impl SendEngine for PushSendEngine {
    fn id(&self) -> &str {
        PUSH_ENGINE_ID
    }

    async fn send(&self, sender: &Sender, message: &Message) -> Result<()> {
        let settings = settings_of(PUSH_ENGINE_ID, sender)?;
        let rendered = rendered_of(PUSH_ENGINE_ID, message)?;
        let delivery_id = Uuid::now_v7().to_string();

        info!(
            engine = PUSH_ENGINE_ID,
            sender_id = %sender.id(),
            message_id = message.id(),
            delivery_id = %delivery_id,
            app = ?settings.get("app"),
            device = %message.recipients().to,
            title = %rendered.subject,
            "模拟发送 APP 推送"
        );

        Ok(())
    }
}
