//! 配置实体
//!
//! Sender / Renderer / Template / DataFetcher 都是带名称、引擎标识和状态的配置记录。
//! 构造走校验工厂（校验失败不会产生实例），修改走 `update`（要求实体处于 Enabled）。
//! 引擎标识统一转为大写。

pub mod data_fetcher;
pub mod renderer;
pub mod sender;
pub mod template;

use std::sync::LazyLock;

use regex::Regex;

use crate::status::Lifecycle;
use crate::validation::{FieldCheck, Presence, TextValue};

pub use data_fetcher::DataFetcher;
pub use renderer::Renderer;
pub use sender::Sender;
pub use template::{Template, TemplateContext};

/// 标识符上限，与 `VALID_ID` 中的量词保持一致
pub const ID_MAX_LEN: usize = 50;

static VALID_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,50}$").expect("identifier pattern compiles"));

/// 实体标识与引擎标识共用的检查
pub trait IdentifierChecks {
    fn valid_id(self) -> Self;
}

impl<V: Presence + TextValue> IdentifierChecks for FieldCheck<V> {
    fn valid_id(self) -> Self {
        self.required().max_len(ID_MAX_LEN).matches(&VALID_ID)
    }
}

/// 可由存储按字符串标识管理、并由引擎注册表解析的配置实体
pub trait ConfigurationEntity: Lifecycle + Clone + Send + Sync + 'static {
    /// 实体种类名称，用于错误信息和日志
    const KIND: &'static str;

    fn id(&self) -> &str;

    /// 已转为大写的引擎标识
    fn engine_id(&self) -> &str;
}

/// 引擎标识统一大写
pub(crate) fn normalize_engine_id(engine_id: &str) -> String {
    engine_id.to_uppercase()
}
