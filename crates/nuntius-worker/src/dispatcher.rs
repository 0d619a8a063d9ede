//! 消息派发器
//!
//! 读取一条消息并尽可能向前推进：New 取数、Built 渲染、Rendered/Fault 发送。
//! 每次状态流转后立即保存。发送失败时先在消息上记录失败，再按退避策略重试，
//! 消息自身的重试上限拒绝记录时停止。

use std::sync::Arc;
use std::time::Duration;

use nuntius_core::message::RETRY_CEILING;
use nuntius_core::store::{require_entity, require_message};
use nuntius_core::{
    ConfigurationEntity, DataFetcher, EngineRegistry, EntityStore, Lifecycle, Message,
    MessageStatus, MessageStore, NuntiusError, Renderer, Sender, Template,
};
use nuntius_shared::observability::metrics;
use nuntius_shared::retry::{RetryPolicy, retry_with_policy};
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::{Result, WorkerError};

/// 派发器依赖的配置实体存储
#[derive(Clone)]
pub struct ConfigurationStores {
    pub fetchers: Arc<dyn EntityStore<DataFetcher>>,
    pub renderers: Arc<dyn EntityStore<Renderer>>,
    pub templates: Arc<dyn EntityStore<Template>>,
    pub senders: Arc<dyn EntityStore<Sender>>,
}

/// 单次派发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 投递成功
    Sent { attempts: u32 },
    /// 本轮尝试用尽，消息停在 Fault，稍后可再次派发
    Deferred { retries: u32 },
    /// 消息已达到重试上限
    Exhausted { retries: u32 },
    /// 消息已发送过，无事可做
    AlreadySent,
}

pub struct MessageDispatcher {
    registry: Arc<EngineRegistry>,
    stores: ConfigurationStores,
    messages: Arc<dyn MessageStore>,
    policy: RetryPolicy,
}

impl MessageDispatcher {
    pub fn new(
        registry: Arc<EngineRegistry>,
        stores: ConfigurationStores,
        messages: Arc<dyn MessageStore>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            stores,
            messages,
            policy,
        }
    }

    /// 派发一条消息
    pub async fn process(&self, message_id: i64) -> Result<DispatchOutcome> {
        let store: &dyn MessageStore = self.messages.as_ref();
        let mut message = retry_with_policy(
            &self.policy,
            "load_message",
            NuntiusError::is_retryable,
            move || require_message(store, message_id),
        )
        .await?;

        metrics::record_dispatched(message.status().name());
        info!(message_id, status = %message.status(), "开始派发消息");

        if message.status() == MessageStatus::New {
            self.build(&mut message).await?;
        }
        if message.status() == MessageStatus::Built {
            self.render(&mut message).await?;
        }
        if message.status() == MessageStatus::Sent {
            return Ok(DispatchOutcome::AlreadySent);
        }
        self.send(&mut message).await
    }

    /// 派发所有未完成的消息，单条失败不影响其他消息
    ///
    /// 已达到重试上限的 Fault 消息不再派发。
    pub async fn process_pending(&self) -> Result<Vec<(i64, Result<DispatchOutcome>)>> {
        let mut pending = Vec::new();
        for status in [
            MessageStatus::New,
            MessageStatus::Built,
            MessageStatus::Rendered,
            MessageStatus::Fault,
        ] {
            pending.extend(
                self.messages
                    .list_by_status(status)
                    .await?
                    .into_iter()
                    .filter(|m| m.status() != MessageStatus::Fault || m.retries() <= RETRY_CEILING)
                    .map(|m| m.id()),
            );
        }

        let mut results = Vec::with_capacity(pending.len());
        for message_id in pending {
            let result = self.process(message_id).await;
            if let Err(e) = &result {
                error!(message_id, error = %e, code = e.error_code(), "派发消息失败");
            }
            results.push((message_id, result));
        }
        Ok(results)
    }

    /// 定时派发，直到收到 shutdown 信号
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = interval.as_millis() as u64, "消息派发器已启动");
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.process_pending().await {
                        Ok(results) if !results.is_empty() => {
                            let failed = results.iter().filter(|(_, r)| r.is_err()).count();
                            info!(total = results.len(), failed, "本轮派发完成");
                        }
                        Ok(_) => {}
                        Err(e) => error!(error = %e, "读取待派发消息失败"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("消息派发器已停止");
    }

    async fn build(&self, message: &mut Message) -> Result<()> {
        let message_id = message.id();
        let fetcher_id = message
            .data_fetcher_id()
            .ok_or(WorkerError::MissingReference {
                message_id,
                field: "data_fetcher_id",
            })?
            .to_string();

        let fetcher = require_entity(self.stores.fetchers.as_ref(), &fetcher_id).await?;
        ensure_enabled(message_id, &fetcher)?;

        let engine = self.registry.get_fetcher(fetcher.engine_id())?;
        let body = engine.fetch_data(&fetcher, message).await?;

        let outcome = message.set_as_built(&body);
        if !outcome.is_success() {
            return Err(WorkerError::rejected(message_id, outcome));
        }
        self.messages.save(message).await?;
        Ok(())
    }

    async fn render(&self, message: &mut Message) -> Result<()> {
        let message_id = message.id();
        let template_id = message
            .template_id()
            .ok_or(WorkerError::MissingReference {
                message_id,
                field: "template_id",
            })?
            .to_string();

        let template = require_entity(self.stores.templates.as_ref(), &template_id).await?;
        ensure_enabled(message_id, &template)?;
        let renderer = self.renderer_for(&template).await?;

        let engine = self.registry.get_renderer(template.engine_id())?;
        let rendered = engine.render(&renderer, &template, message).await?;

        let outcome = message.set_as_rendered(rendered);
        if !outcome.is_success() {
            return Err(WorkerError::rejected(message_id, outcome));
        }
        self.messages.save(message).await?;
        Ok(())
    }

    /// 与模板引擎标识相同的已启用渲染配置，按 id 排序取第一个
    async fn renderer_for(&self, template: &Template) -> Result<Renderer> {
        self.stores
            .renderers
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.engine_id() == template.engine_id() && r.validate_enabled().is_success())
            .ok_or_else(|| {
                WorkerError::Core(NuntiusError::EntityNotFound {
                    entity: "Renderer",
                    id: template.engine_id().to_string(),
                })
            })
    }

    async fn send(&self, message: &mut Message) -> Result<DispatchOutcome> {
        let message_id = message.id();
        let sender = require_entity(self.stores.senders.as_ref(), message.sender_id()).await?;
        ensure_enabled(message_id, &sender)?;
        let engine = self.registry.get_sender(sender.engine_id())?;

        let mut backoff = self.policy.backoff();
        loop {
            // 已达上限的消息不再调用引擎
            if message.status() == MessageStatus::Fault && message.retries() > RETRY_CEILING {
                warn!(message_id, retries = message.retries(), "已达消息重试上限，不再发送");
                return Ok(DispatchOutcome::Exhausted {
                    retries: message.retries(),
                });
            }

            let err = match engine.send(&sender, message).await {
                Ok(()) => {
                    let outcome = message.set_as_sent();
                    if !outcome.is_success() {
                        return Err(WorkerError::rejected(message_id, outcome));
                    }
                    self.messages.save(message).await?;
                    metrics::record_sent(sender.engine_id());

                    let attempts = backoff.retries() + 1;
                    info!(message_id, attempts, "消息发送成功");
                    return Ok(DispatchOutcome::Sent { attempts });
                }
                Err(err) => err,
            };

            metrics::record_send_failure(sender.engine_id());
            let outcome = message.mark_retry_failure();
            if !outcome.is_success() {
                warn!(message_id, retries = message.retries(), error = %err, "已达消息重试上限");
                return Ok(DispatchOutcome::Exhausted {
                    retries: message.retries(),
                });
            }
            self.messages.save(message).await?;

            let delay = if err.is_retryable() { backoff.next() } else { None };
            let Some(delay) = delay else {
                warn!(message_id, retries = message.retries(), error = %err, "发送失败，留待下次派发");
                return Ok(DispatchOutcome::Deferred {
                    retries: message.retries(),
                });
            };

            warn!(
                message_id,
                retries = message.retries(),
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "发送失败，退避后重试"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

/// 配置实体必须处于启用状态，否则带上 "Status" 结果拒绝
fn ensure_enabled<E: ConfigurationEntity>(message_id: i64, entity: &E) -> Result<()> {
    let outcome = entity.validate_enabled();
    if outcome.is_success() {
        Ok(())
    } else {
        warn!(message_id, entity = E::KIND, id = %entity.id(), status = %entity.status(), "配置实体不可用");
        Err(WorkerError::rejected(message_id, outcome))
    }
}
