//! 派发器集成测试
//!
//! 使用内存存储和参考引擎驱动完整流水线，包括：
//! - 取数、渲染、发送一次走完
//! - 配置实体被禁用时拒绝派发
//! - 发送失败后的退避重试与重试上限
//! - 定时派发循环的启动与停止

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use nuntius_core::message::MESSAGE_RETRIES_EXCEEDED;
use nuntius_core::status::ELEMENT_NOT_ENABLED;
use nuntius_core::{
    DataFetcher, EngineKind, EngineRegistry, EntityStore, FetchEngine, InMemoryMessageStore,
    InMemoryStore, Lifecycle, Message, MessageRecipients, MessageStatus, MessageStore, MessageType,
    NuntiusError, RenderEngine, RenderedMessage, Renderer, Result, SendEngine, Sender, Template,
    TemplateContext,
};
use nuntius_shared::retry::RetryPolicy;
use nuntius_worker::fetchers::StaticFetchEngine;
use nuntius_worker::templates::PlaceholderRenderEngine;
use nuntius_worker::{
    ConfigurationStores, DispatchOutcome, MessageDispatcher, WorkerError, default_registry,
};
use tokio::sync::watch;

/// 前 `failures` 次发送失败
struct FlakySendEngine {
    failures: u32,
    calls: AtomicU32,
}

impl FlakySendEngine {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl SendEngine for FlakySendEngine {
    fn id(&self) -> &str {
        "FLAKY"
    }

    async fn send(&self, _sender: &Sender, _message: &Message) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(NuntiusError::engine("FLAKY", "gateway unavailable"))
        } else {
            Ok(())
        }
    }
}

struct Harness {
    fetchers: Arc<InMemoryStore<DataFetcher>>,
    renderers: Arc<InMemoryStore<Renderer>>,
    templates: Arc<InMemoryStore<Template>>,
    senders: Arc<InMemoryStore<Sender>>,
    messages: Arc<InMemoryMessageStore>,
}

impl Harness {
    async fn new() -> Self {
        let harness = Self {
            fetchers: Arc::new(InMemoryStore::new()),
            renderers: Arc::new(InMemoryStore::new()),
            templates: Arc::new(InMemoryStore::new()),
            senders: Arc::new(InMemoryStore::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
        };

        harness.fetchers.save(&fetcher()).await.unwrap();
        harness
            .renderers
            .save(&Renderer::create("placeholder", "Placeholder", "placeholder", "{}").unwrap())
            .await
            .unwrap();
        harness.templates.save(&template()).await.unwrap();
        harness.senders.save(&smtp_sender()).await.unwrap();
        harness
            .senders
            .save(&Sender::create("flaky", "Flaky", "FLAKY", "{}", MessageType::Email).unwrap())
            .await
            .unwrap();
        harness
    }

    fn dispatcher(&self, registry: EngineRegistry, policy: RetryPolicy) -> MessageDispatcher {
        let fetchers: Arc<dyn EntityStore<DataFetcher>> = self.fetchers.clone();
        let renderers: Arc<dyn EntityStore<Renderer>> = self.renderers.clone();
        let templates: Arc<dyn EntityStore<Template>> = self.templates.clone();
        let senders: Arc<dyn EntityStore<Sender>> = self.senders.clone();
        let messages: Arc<dyn MessageStore> = self.messages.clone();

        MessageDispatcher::new(
            Arc::new(registry),
            ConfigurationStores {
                fetchers,
                renderers,
                templates,
                senders,
            },
            messages,
            policy,
        )
    }

    async fn insert(&self, mut message: Message) -> i64 {
        self.messages.save(&mut message).await.unwrap()
    }

    async fn load(&self, id: i64) -> Message {
        self.messages.get_by_id(id).await.unwrap().unwrap()
    }
}

fn fast_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

fn flaky_registry(failures: u32) -> EngineRegistry {
    flaky_registry_with(Arc::new(FlakySendEngine::new(failures)))
}

fn flaky_registry_with(engine: Arc<FlakySendEngine>) -> EngineRegistry {
    let fetchers: Vec<Arc<dyn FetchEngine>> = vec![Arc::new(StaticFetchEngine)];
    let renderers: Vec<Arc<dyn RenderEngine>> = vec![Arc::new(PlaceholderRenderEngine)];
    let senders: Vec<Arc<dyn SendEngine>> = vec![engine];
    EngineRegistry::new(fetchers, renderers, senders)
}

fn fetcher() -> DataFetcher {
    DataFetcher::create("profile", "Profile", "static", r#"{"company":"Nuntius"}"#).unwrap()
}

fn template() -> Template {
    Template::create(
        "welcome",
        "Welcome",
        "placeholder",
        TemplateContext::new("EN", None),
        "Welcome to {{company}}",
        "Hi {{name}}, thanks for joining {{company}}.",
        MessageType::Email,
    )
    .unwrap()
}

fn smtp_sender() -> Sender {
    Sender::create(
        "mail",
        "Mail",
        "smtp",
        r#"{"host":"smtp.example.com"}"#,
        MessageType::Email,
    )
    .unwrap()
}

fn builder_message(sender: &Sender) -> Message {
    Message::create(
        &fetcher(),
        &template(),
        sender,
        "noreply@example.com",
        &MessageRecipients::to("ada@example.com").with_cc("team@example.com"),
        MessageType::Email,
        r#"{"name":"Ada"}"#,
    )
    .unwrap()
}

fn rendered_message(sender: &Sender) -> Message {
    Message::create_after_render(
        sender,
        "noreply@example.com",
        &MessageRecipients::to("ada@example.com"),
        MessageType::Email,
        RenderedMessage::new("Subject", "Content"),
    )
    .unwrap()
}

#[tokio::test]
async fn test_full_pipeline_with_reference_engines() {
    let harness = Harness::new().await;
    let dispatcher = harness.dispatcher(default_registry(), fast_policy(3));
    let id = harness.insert(builder_message(&smtp_sender())).await;

    let outcome = dispatcher.process(id).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Sent { attempts: 1 });

    let stored = harness.load(id).await;
    assert_eq!(stored.status(), MessageStatus::Sent);
    let rendered = stored.rendered_message().unwrap();
    assert_eq!(rendered.subject, "Welcome to Nuntius");
    assert_eq!(rendered.content, "Hi Ada, thanks for joining Nuntius.");
    assert!(stored.sent_on().is_some());

    // 已发送的消息再次派发无事可做
    assert_eq!(dispatcher.process(id).await.unwrap(), DispatchOutcome::AlreadySent);
}

#[tokio::test]
async fn test_from_template_message_skips_fetch() {
    let harness = Harness::new().await;
    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));
    let message = Message::create_after_build(
        &template(),
        &smtp_sender(),
        "noreply@example.com",
        &MessageRecipients::to("ada@example.com"),
        MessageType::Email,
        r#"{"name":"Bob","company":"Acme"}"#,
    )
    .unwrap();
    let id = harness.insert(message).await;

    assert!(matches!(
        dispatcher.process(id).await.unwrap(),
        DispatchOutcome::Sent { .. }
    ));
    assert_eq!(
        harness.load(id).await.rendered_message().unwrap().subject,
        "Welcome to Acme"
    );
}

#[tokio::test]
async fn test_disabled_sender_rejected_with_status() {
    let harness = Harness::new().await;
    let mut sender = smtp_sender();
    assert!(sender.disable().is_success());
    harness.senders.save(&sender).await.unwrap();

    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));
    let id = harness.insert(rendered_message(&sender)).await;

    let err = dispatcher.process(id).await.unwrap_err();
    assert_eq!(err.error_code(), "OPERATION_REJECTED");
    let outcome = err.outcome().unwrap();
    assert!(outcome.has_error_for("Status"));
    assert!(outcome.has_error_code(ELEMENT_NOT_ENABLED));
    assert_eq!(harness.load(id).await.status(), MessageStatus::Rendered);
}

#[tokio::test]
async fn test_failures_until_message_ceiling() {
    let harness = Harness::new().await;
    let flaky = harness.senders.get_by_id("flaky").await.unwrap().unwrap();
    // 策略允许的重试次数大于消息上限，由消息上限决定停止
    let engine = Arc::new(FlakySendEngine::new(u32::MAX));
    let dispatcher = harness.dispatcher(flaky_registry_with(engine.clone()), fast_policy(10));
    let id = harness.insert(rendered_message(&flaky)).await;

    let outcome = dispatcher.process(id).await.unwrap();
    assert_eq!(outcome, DispatchOutcome::Exhausted { retries: 4 });
    assert_eq!(engine.calls.load(Ordering::SeqCst), 4);

    // 再次派发不会调用引擎
    assert_eq!(
        dispatcher.process(id).await.unwrap(),
        DispatchOutcome::Exhausted { retries: 4 }
    );
    assert_eq!(engine.calls.load(Ordering::SeqCst), 4);

    let stored = harness.load(id).await;
    assert_eq!(stored.status(), MessageStatus::Fault);
    assert_eq!(stored.retries(), 4);

    let mut copy = stored.clone();
    assert!(copy.mark_retry_failure().has_error_code(MESSAGE_RETRIES_EXCEEDED));

    // 超过上限的消息不再被批量派发
    let results = dispatcher.process_pending().await.unwrap();
    assert!(results.iter().all(|(message_id, _)| *message_id != id));
}

#[tokio::test]
async fn test_deferred_then_sent_on_next_dispatch() {
    let harness = Harness::new().await;
    let flaky = harness.senders.get_by_id("flaky").await.unwrap().unwrap();
    let dispatcher = harness.dispatcher(flaky_registry(1), fast_policy(0));
    let id = harness.insert(rendered_message(&flaky)).await;

    assert_eq!(
        dispatcher.process(id).await.unwrap(),
        DispatchOutcome::Deferred { retries: 1 }
    );
    assert_eq!(harness.load(id).await.status(), MessageStatus::Fault);

    assert_eq!(
        dispatcher.process(id).await.unwrap(),
        DispatchOutcome::Sent { attempts: 1 }
    );
    let stored = harness.load(id).await;
    assert_eq!(stored.status(), MessageStatus::Sent);
    assert_eq!(stored.retries(), 0);
}

#[tokio::test]
async fn test_backoff_retries_within_one_dispatch() {
    let harness = Harness::new().await;
    let flaky = harness.senders.get_by_id("flaky").await.unwrap().unwrap();
    let dispatcher = harness.dispatcher(flaky_registry(2), fast_policy(3));
    let id = harness.insert(rendered_message(&flaky)).await;

    assert_eq!(
        dispatcher.process(id).await.unwrap(),
        DispatchOutcome::Sent { attempts: 3 }
    );
}

#[tokio::test]
async fn test_missing_engine_leaves_message_untouched() {
    let harness = Harness::new().await;
    let fax = Sender::create("fax", "Fax", "FAX", "{}", MessageType::Text).unwrap();
    harness.senders.save(&fax).await.unwrap();

    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));
    let id = harness.insert(rendered_message(&fax)).await;

    let err = dispatcher.process(id).await.unwrap_err();
    assert!(matches!(
        err,
        WorkerError::Core(NuntiusError::EngineNotFound {
            kind: EngineKind::Send,
            ..
        })
    ));
    let stored = harness.load(id).await;
    assert_eq!(stored.status(), MessageStatus::Rendered);
    assert_eq!(stored.retries(), 0);
}

#[tokio::test]
async fn test_missing_renderer_configuration() {
    let harness = Harness::new().await;
    harness.renderers.delete("placeholder").await.unwrap();

    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));
    let id = harness.insert(builder_message(&smtp_sender())).await;

    let err = dispatcher.process(id).await.unwrap_err();
    assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
    // 取数已完成并保存
    assert_eq!(harness.load(id).await.status(), MessageStatus::Built);
}

#[tokio::test]
async fn test_unknown_message() {
    let harness = Harness::new().await;
    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));

    let err = dispatcher.process(404).await.unwrap_err();
    assert!(matches!(
        err,
        WorkerError::Core(NuntiusError::EntityNotFound { entity: "Message", .. })
    ));
}

#[tokio::test]
async fn test_process_pending_isolates_failures() {
    let harness = Harness::new().await;
    let mut archived = Sender::create("old", "Old", "SMTP", r#"{"host":"h"}"#, MessageType::Email)
        .unwrap();
    assert!(archived.archive().is_success());
    harness.senders.save(&archived).await.unwrap();

    let dispatcher = harness.dispatcher(default_registry(), fast_policy(0));
    let ok = harness.insert(builder_message(&smtp_sender())).await;
    let rejected = harness.insert(rendered_message(&archived)).await;

    let results = dispatcher.process_pending().await.unwrap();
    assert_eq!(results.len(), 2);
    for (id, result) in &results {
        if *id == ok {
            assert!(matches!(result, Ok(DispatchOutcome::Sent { .. })));
        } else {
            assert_eq!(*id, rejected);
            assert!(result.is_err());
        }
    }
}

#[tokio::test]
async fn test_run_loop_stops_on_shutdown() {
    let harness = Harness::new().await;
    let dispatcher = Arc::new(harness.dispatcher(default_registry(), fast_policy(0)));
    let id = harness.insert(builder_message(&smtp_sender())).await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(dispatcher.run(Duration::from_millis(10), shutdown_rx));

    let mut sent = false;
    for _ in 0..100 {
        if harness.load(id).await.status() == MessageStatus::Sent {
            sent = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(sent);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .unwrap()
        .unwrap();
}
