//! 消息派发 worker
//!
//! 加载配置、初始化日志，装配参考引擎与内存存储后定时派发待处理消息。

use std::sync::Arc;

use nuntius_core::{DataFetcher, InMemoryMessageStore, InMemoryStore, Renderer, Sender, Template};
use nuntius_shared::config::AppConfig;
use nuntius_shared::observability;
use nuntius_worker::{ConfigurationStores, MessageDispatcher, default_registry};
use tokio::sync::watch;
use tracing::info;

const SERVICE_NAME: &str = "nuntius-worker";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_validated(SERVICE_NAME)?;
    let _guard = observability::init(&config.observability)?;

    info!(
        environment = %config.environment,
        max_send_attempts = config.dispatch.max_send_attempts,
        "Starting nuntius-worker..."
    );

    let stores = ConfigurationStores {
        fetchers: Arc::new(InMemoryStore::<DataFetcher>::new()),
        renderers: Arc::new(InMemoryStore::<Renderer>::new()),
        templates: Arc::new(InMemoryStore::<Template>::new()),
        senders: Arc::new(InMemoryStore::<Sender>::new()),
    };
    let dispatcher = Arc::new(MessageDispatcher::new(
        Arc::new(default_registry()),
        stores,
        Arc::new(InMemoryMessageStore::new()),
        config.dispatch.retry_policy(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(dispatcher.run(config.dispatch.poll_interval(), shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("收到退出信号，等待派发器停止");
    shutdown_tx.send(true)?;
    worker.await?;

    Ok(())
}
