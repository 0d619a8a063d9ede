//! 业务指标
//!
//! 只依赖 `metrics` 门面；未安装 recorder 时记录操作为空操作。

pub const MESSAGES_DISPATCHED: &str = "nuntius_messages_dispatched_total";
pub const SEND_FAILURES: &str = "nuntius_send_failures_total";
pub const MESSAGES_SENT: &str = "nuntius_messages_sent_total";

/// 登记指标描述
pub fn describe_metrics() {
    metrics::describe_counter!(
        MESSAGES_DISPATCHED,
        "Number of messages picked up by the dispatcher, labelled by starting status"
    );
    metrics::describe_counter!(
        SEND_FAILURES,
        "Number of failed send attempts, labelled by send engine"
    );
    metrics::describe_counter!(
        MESSAGES_SENT,
        "Number of messages delivered, labelled by send engine"
    );
}

pub fn record_dispatched(status: &str) {
    metrics::counter!(MESSAGES_DISPATCHED, "status" => status.to_string()).increment(1);
}

pub fn record_send_failure(engine_id: &str) {
    metrics::counter!(SEND_FAILURES, "engine" => engine_id.to_string()).increment(1);
}

pub fn record_sent(engine_id: &str) {
    metrics::counter!(MESSAGES_SENT, "engine" => engine_id.to_string()).increment(1);
}
