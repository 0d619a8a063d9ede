//! 引擎注册表
//!
//! 启动时一次性传入全部引擎，之后只读，可通过 `Arc` 在任务间共享。
//! 同一种类下标识重复时保留先注册的引擎，后来者被忽略并记录告警。
//! 标识区分大小写，以引擎自身报告的 `id()` 为准。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::{EngineKind, FetchEngine, RenderEngine, SendEngine};
use crate::error::{NuntiusError, Result};

pub struct EngineRegistry {
    fetchers: HashMap<String, Arc<dyn FetchEngine>>,
    renderers: HashMap<String, Arc<dyn RenderEngine>>,
    senders: HashMap<String, Arc<dyn SendEngine>>,
}

fn index<E: ?Sized>(
    kind: EngineKind,
    engines: Vec<Arc<E>>,
    id_of: impl Fn(&E) -> &str,
) -> HashMap<String, Arc<E>> {
    let mut indexed: HashMap<String, Arc<E>> = HashMap::with_capacity(engines.len());
    for engine in engines {
        let id = id_of(engine.as_ref()).to_string();
        if indexed.contains_key(&id) {
            warn!(%kind, engine_id = %id, "引擎标识重复，保留先注册的实例");
            continue;
        }
        indexed.insert(id, engine);
    }
    indexed
}

impl EngineRegistry {
    pub fn new(
        fetchers: Vec<Arc<dyn FetchEngine>>,
        renderers: Vec<Arc<dyn RenderEngine>>,
        senders: Vec<Arc<dyn SendEngine>>,
    ) -> Self {
        let registry = Self {
            fetchers: index(EngineKind::Fetch, fetchers, |e| e.id()),
            renderers: index(EngineKind::Render, renderers, |e| e.id()),
            senders: index(EngineKind::Send, senders, |e| e.id()),
        };

        info!(
            fetchers = ?registry.engine_ids(EngineKind::Fetch),
            renderers = ?registry.engine_ids(EngineKind::Render),
            senders = ?registry.engine_ids(EngineKind::Send),
            "引擎注册表初始化完成"
        );

        registry
    }

    pub fn get_fetcher(&self, engine_id: &str) -> Result<Arc<dyn FetchEngine>> {
        self.try_get_fetcher(engine_id)
            .ok_or_else(|| not_found(EngineKind::Fetch, engine_id))
    }

    pub fn get_renderer(&self, engine_id: &str) -> Result<Arc<dyn RenderEngine>> {
        self.try_get_renderer(engine_id)
            .ok_or_else(|| not_found(EngineKind::Render, engine_id))
    }

    pub fn get_sender(&self, engine_id: &str) -> Result<Arc<dyn SendEngine>> {
        self.try_get_sender(engine_id)
            .ok_or_else(|| not_found(EngineKind::Send, engine_id))
    }

    pub fn try_get_fetcher(&self, engine_id: &str) -> Option<Arc<dyn FetchEngine>> {
        self.fetchers.get(engine_id).cloned()
    }

    pub fn try_get_renderer(&self, engine_id: &str) -> Option<Arc<dyn RenderEngine>> {
        self.renderers.get(engine_id).cloned()
    }

    pub fn try_get_sender(&self, engine_id: &str) -> Option<Arc<dyn SendEngine>> {
        self.senders.get(engine_id).cloned()
    }

    /// 指定种类下已注册的引擎标识（排序后返回）
    pub fn engine_ids(&self, kind: EngineKind) -> Vec<String> {
        let mut ids: Vec<String> = match kind {
            EngineKind::Fetch => self.fetchers.keys().cloned().collect(),
            EngineKind::Render => self.renderers.keys().cloned().collect(),
            EngineKind::Send => self.senders.keys().cloned().collect(),
        };
        ids.sort();
        ids
    }
}

fn not_found(kind: EngineKind, engine_id: &str) -> NuntiusError {
    NuntiusError::EngineNotFound {
        kind,
        engine_id: engine_id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DataFetcher, Renderer, Sender, Template};
    use crate::message::{Message, MessageRecipients, RenderedMessage};
    use crate::models::MessageType;
    use async_trait::async_trait;

    struct StubFetch(&'static str);

    #[async_trait]
    impl FetchEngine for StubFetch {
        fn id(&self) -> &str {
            self.0
        }

        async fn fetch_data(&self, _: &DataFetcher, _: &Message) -> Result<String> {
            Ok(format!(r#"{{"engine":"{}"}}"#, self.0))
        }
    }

    struct StubRender;

    #[async_trait]
    impl RenderEngine for StubRender {
        fn id(&self) -> &str {
            "LIQUID"
        }

        async fn render(&self, _: &Renderer, t: &Template, _: &Message) -> Result<RenderedMessage> {
            Ok(RenderedMessage::new(t.subject(), t.content()))
        }
    }

    struct StubSend;

    #[async_trait]
    impl SendEngine for StubSend {
        fn id(&self) -> &str {
            "SMTP"
        }

        async fn send(&self, _: &Sender, _: &Message) -> Result<()> {
            Ok(())
        }
    }

    fn registry() -> EngineRegistry {
        let fetchers: Vec<Arc<dyn FetchEngine>> =
            vec![Arc::new(StubFetch("SQL")), Arc::new(StubFetch("HTTP"))];
        let renderers: Vec<Arc<dyn RenderEngine>> = vec![Arc::new(StubRender)];
        let senders: Vec<Arc<dyn SendEngine>> = vec![Arc::new(StubSend)];
        EngineRegistry::new(fetchers, renderers, senders)
    }

    #[test]
    fn test_get_registered_engines() {
        let registry = registry();
        assert_eq!(registry.get_fetcher("SQL").unwrap().id(), "SQL");
        assert_eq!(registry.get_renderer("LIQUID").unwrap().id(), "LIQUID");
        assert_eq!(registry.get_sender("SMTP").unwrap().id(), "SMTP");
        assert_eq!(registry.engine_ids(EngineKind::Fetch), vec!["HTTP", "SQL"]);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let registry = registry();
        assert!(registry.try_get_sender("smtp").is_none());
        assert!(registry.try_get_fetcher("Http").is_none());
        assert!(matches!(
            registry.get_sender("Smtp"),
            Err(NuntiusError::EngineNotFound { kind: EngineKind::Send, .. })
        ));
    }

    #[test]
    fn test_ids_differing_in_case_are_distinct() {
        struct Named(&'static str);

        #[async_trait]
        impl SendEngine for Named {
            fn id(&self) -> &str {
                self.0
            }

            async fn send(&self, _: &Sender, _: &Message) -> Result<()> {
                Ok(())
            }
        }

        let senders: Vec<Arc<dyn SendEngine>> =
            vec![Arc::new(Named("smtp")), Arc::new(Named("SMTP"))];
        let registry = EngineRegistry::new(vec![], vec![], senders);

        assert_eq!(registry.engine_ids(EngineKind::Send), vec!["SMTP", "smtp"]);
        assert_eq!(registry.get_sender("SMTP").unwrap().id(), "SMTP");
        assert_eq!(registry.get_sender("smtp").unwrap().id(), "smtp");
        assert!(registry.try_get_sender("Smtp").is_none());
    }

    #[test]
    fn test_missing_engine() {
        let registry = registry();
        assert!(registry.try_get_renderer("RAZOR").is_none());

        let err = registry.get_renderer("RAZOR").err().unwrap();
        assert!(matches!(
            &err,
            NuntiusError::EngineNotFound { kind: EngineKind::Render, engine_id } if engine_id == "RAZOR"
        ));
        assert!(err.to_string().contains("RAZOR"));

        // 种类之间互不相通
        assert!(registry.get_sender("SQL").is_err());
    }

    #[tokio::test]
    async fn test_first_registration_wins() {
        struct Second;

        #[async_trait]
        impl FetchEngine for Second {
            fn id(&self) -> &str {
                "SQL"
            }

            async fn fetch_data(&self, _: &DataFetcher, _: &Message) -> Result<String> {
                Ok(r#"{"engine":"second"}"#.to_string())
            }
        }

        let fetchers: Vec<Arc<dyn FetchEngine>> =
            vec![Arc::new(StubFetch("SQL")), Arc::new(Second)];
        let registry = EngineRegistry::new(fetchers, vec![], vec![]);
        assert_eq!(registry.engine_ids(EngineKind::Fetch), vec!["SQL"]);

        let fetcher = DataFetcher::create("f1", "Fetcher", "SQL", "{}").unwrap();
        let sender = Sender::create("s1", "Sender", "SMTP", "{}", MessageType::Email).unwrap();
        let message = Message::create_after_render(
            &sender,
            "from@example.com",
            &MessageRecipients::to("to@example.com"),
            MessageType::Email,
            RenderedMessage::new("s", "c"),
        )
        .unwrap();

        let engine = registry.get_fetcher("SQL").unwrap();
        let body = engine.fetch_data(&fetcher, &message).await.unwrap();
        assert_eq!(body, r#"{"engine":"SQL"}"#);
    }

    #[test]
    fn test_empty_registry() {
        let registry = EngineRegistry::new(vec![], vec![], vec![]);
        assert!(registry.engine_ids(EngineKind::Send).is_empty());
        assert!(matches!(
            registry.get_sender("SMTP"),
            Err(NuntiusError::EngineNotFound { kind: EngineKind::Send, .. })
        ));
    }
}
