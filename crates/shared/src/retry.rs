//! 重试策略与执行器
//!
//! 指数退避用于发送通道抖动、存储连接失败这类瞬时故障。
//! 确定性失败由调用方的 `is_retryable` 判定后直接返回。

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// 指数退避策略
///
/// 第 n 次重试前等待 `initial_delay * multiplier^n`，不超过 `max_delay`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 第 `attempt` 次重试（从 0 开始）前的等待时间
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// 含首次执行在内的总尝试次数
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// 依次产出每次重试前的等待时间，重试次数用尽后返回 `None`
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            policy: self,
            attempt: 0,
        }
    }
}

/// 一次操作的退避进度
#[derive(Debug)]
pub struct Backoff<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
}

impl Backoff<'_> {
    /// 已消耗的重试次数
    pub fn retries(&self) -> u32 {
        self.attempt
    }
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if !self.policy.should_retry(self.attempt) {
            return None;
        }
        let delay = self.policy.delay_for_attempt(self.attempt);
        self.attempt += 1;
        Some(delay)
    }
}

/// 按策略重试异步操作，不可重试的错误立即返回
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut backoff = policy.backoff();

    loop {
        let err = match operation().await {
            Ok(value) => {
                if backoff.retries() > 0 {
                    info!(operation = operation_name, retries = backoff.retries(), "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if !is_retryable(&err) {
            warn!(operation = operation_name, error = %err, "操作失败且不可重试");
            return Err(err);
        }

        let Some(delay) = backoff.next() else {
            warn!(
                operation = operation_name,
                max_retries = policy.max_retries,
                error = %err,
                "已达最大重试次数，放弃重试"
            );
            return Err(err);
        };

        warn!(
            operation = operation_name,
            retry = backoff.retries(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "操作失败，退避后重试"
        );
        tokio::time::sleep(delay).await;
    }
}
