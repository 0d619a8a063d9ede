//! 静态取数引擎
//!
//! 不访问外部数据源：把取数配置中的 JSON 对象与消息头载荷合并作为正文载荷，
//! 同名字段以消息头为准。适合固定内容的通知和本地联调。

use async_trait::async_trait;
use nuntius_core::{ConfigurationEntity, DataFetcher, FetchEngine, Message, NuntiusError, Result};
use serde_json::{Map, Value};
use tracing::debug;

pub const STATIC_ENGINE_ID: &str = "STATIC";

pub struct StaticFetchEngine;

fn as_object(value: Value, what: &str) -> Result<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(NuntiusError::engine(
            STATIC_ENGINE_ID,
            format!("{what}必须是 JSON 对象"),
        )),
    }
}

#[async_trait]
impl FetchEngine for StaticFetchEngine {
    fn id(&self) -> &str {
        STATIC_ENGINE_ID
    }

    async fn fetch_data(&self, fetcher: &DataFetcher, message: &Message) -> Result<String> {
        let mut body = as_object(serde_json::from_str(fetcher.settings())?, "取数配置")?;
        let header = as_object(message.payload_header().unwrap_or(Value::Null), "消息头载荷")?;
        body.extend(header);

        debug!(
            fetcher_id = %fetcher.id(),
            message_id = message.id(),
            fields = body.len(),
            "静态取数完成"
        );

        Ok(Value::Object(body).to_string())
    }
}
