//! 占位符渲染引擎
//!
//! 模板标题与正文中的 `{{key}}` 替换为消息载荷中的同名字段：
//! 先查 body，再查 header。找不到的变量保留原样并记录告警，
//! 避免因上游数据不完整导致整条消息渲染失败。

use std::sync::LazyLock;

use async_trait::async_trait;
use nuntius_core::{
    ConfigurationEntity, Message, NuntiusError, RenderEngine, RenderedMessage, Renderer, Result,
    Template,
};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

pub const PLACEHOLDER_ENGINE_ID: &str = "PLACEHOLDER";

// 变量名支持字母、数字、下划线和点号（点号用于访问嵌套字段）
static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w.]+)\s*\}\}").expect("placeholder pattern compiles"));

pub struct PlaceholderRenderEngine;

impl PlaceholderRenderEngine {
    /// 用给定的变量源渲染一段文本
    pub fn render_text(text: &str, sources: &[&Value]) -> String {
        VARIABLE
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                match sources.iter().find_map(|source| lookup(source, name)) {
                    Some(value) => value,
                    None => {
                        warn!(variable = name, "模板变量未找到，保留原样");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

/// 按点号路径取值；字符串原样输出，其余类型输出 JSON 表示，null 视为缺失
fn lookup(source: &Value, path: &str) -> Option<String> {
    let value = path
        .split('.')
        .try_fold(source, |current, key| current.get(key))?;
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[async_trait]
impl RenderEngine for PlaceholderRenderEngine {
    fn id(&self) -> &str {
        PLACEHOLDER_ENGINE_ID
    }

    async fn render(
        &self,
        renderer: &Renderer,
        template: &Template,
        message: &Message,
    ) -> Result<RenderedMessage> {
        let body = message.payload_body().ok_or_else(|| {
            NuntiusError::engine(
                PLACEHOLDER_ENGINE_ID,
                format!("消息 {} 缺少正文载荷", message.id()),
            )
        })?;
        let header = message.payload_header().unwrap_or(Value::Null);
        let sources = [&body, &header];

        debug!(
            renderer_id = %renderer.id(),
            template_id = %template.id(),
            message_id = message.id(),
            "渲染模板"
        );

        Ok(RenderedMessage::new(
            Self::render_text(template.subject(), &sources),
            Self::render_text(template.content(), &sources),
        ))
    }
}
