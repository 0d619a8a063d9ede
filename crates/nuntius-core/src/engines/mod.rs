//! 引擎抽象
//!
//! 取数、渲染、发送三类引擎都以 `id()` 标识，由 [`EngineRegistry`] 按种类和标识精确查找。
//! 配置实体的 `engine_id` 保存为大写，因此引擎应以大写标识注册。
//! 引擎本身不修改消息状态，状态流转由调用方根据返回值驱动。

pub mod registry;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::{DataFetcher, Renderer, Sender, Template};
use crate::error::Result;
use crate::message::{Message, RenderedMessage};

pub use registry::EngineRegistry;

/// 引擎种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Fetch,
    Render,
    Send,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Fetch => "fetch",
            Self::Render => "render",
            Self::Send => "send",
        })
    }
}

/// 取数引擎：根据取数配置和消息头载荷产出正文载荷（JSON 文本）
#[async_trait]
pub trait FetchEngine: Send + Sync {
    fn id(&self) -> &str;

    async fn fetch_data(&self, fetcher: &DataFetcher, message: &Message) -> Result<String>;
}

/// 渲染引擎：把模板与消息载荷合成为最终标题和正文
#[async_trait]
pub trait RenderEngine: Send + Sync {
    fn id(&self) -> &str;

    async fn render(
        &self,
        renderer: &Renderer,
        template: &Template,
        message: &Message,
    ) -> Result<RenderedMessage>;
}

/// 发送引擎：把已渲染的消息投递到外部渠道
#[async_trait]
pub trait SendEngine: Send + Sync {
    fn id(&self) -> &str;

    async fn send(&self, sender: &Sender, message: &Message) -> Result<()>;
}
