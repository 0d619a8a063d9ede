//! 消息派发 worker
//!
//! 驱动消息走完取数、渲染、发送流水线，并提供一组参考引擎：
//! 静态取数、占位符渲染和模拟发送（邮件、短信、推送）。

pub mod dispatcher;
pub mod error;
pub mod fetchers;
pub mod sender;
pub mod templates;

use std::sync::Arc;

use nuntius_core::{EngineRegistry, FetchEngine, RenderEngine, SendEngine};

pub use dispatcher::{ConfigurationStores, DispatchOutcome, MessageDispatcher};
pub use error::{Result, WorkerError};

/// 注册全部参考引擎
pub fn default_registry() -> EngineRegistry {
    let fetchers: Vec<Arc<dyn FetchEngine>> = vec![Arc::new(fetchers::StaticFetchEngine)];
    let renderers: Vec<Arc<dyn RenderEngine>> = vec![Arc::new(templates::PlaceholderRenderEngine)];
    let senders: Vec<Arc<dyn SendEngine>> = vec![
        Arc::new(sender::SmtpSendEngine),
        Arc::new(sender::SmsSendEngine),
        Arc::new(sender::PushSendEngine),
    ];
    EngineRegistry::new(fetchers, renderers, senders)
}
