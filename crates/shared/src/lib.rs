//! 共享基础设施
//!
//! 所有 Nuntius crate 共用的配置加载、日志与指标、重试退避策略。

pub mod config;
pub mod error;
pub mod observability;
pub mod retry;

pub use error::{Result, SharedError};
