//! Validation for the `[realtime]` and `[topics]` sections.

use crate::schema::DiscussConfig;

use super::helpers::{validate_destination, validate_optional_range, validate_range};

pub(crate) fn validate_realtime(errors: &mut Vec<String>, config: &DiscussConfig) {
    let rt = &config.realtime;

    if !(rt.base_url.starts_with("ws://") || rt.base_url.starts_with("wss://")) {
        errors.push(format!(
            "realtime.base_url = {:?} must use the ws:// or wss:// scheme",
            rt.base_url
        ));
    }
    if !rt.endpoint_suffix.is_empty() && !rt.endpoint_suffix.starts_with('/') {
        errors.push(format!(
            "realtime.endpoint_suffix = {:?} must start with '/'",
            rt.endpoint_suffix
        ));
    }

    validate_range(
        errors,
        "realtime.reconnect_delay_ms",
        rt.reconnect_delay_ms,
        100,
        300_000,
    );
    validate_optional_range(
        errors,
        "realtime.heartbeat_incoming_ms",
        rt.heartbeat_incoming_ms,
        1000,
        600_000,
    );
    validate_optional_range(
        errors,
        "realtime.heartbeat_outgoing_ms",
        rt.heartbeat_outgoing_ms,
        1000,
        600_000,
    );
    validate_range(
        errors,
        "realtime.connect_timeout_secs",
        rt.connect_timeout_secs,
        1,
        120,
    );
}

pub(crate) fn validate_topics(errors: &mut Vec<String>, config: &DiscussConfig) {
    let t = &config.topics;
    validate_destination(errors, "topics.channel_topic_prefix", &t.channel_topic_prefix);
    validate_destination(errors, "topics.command_prefix", &t.command_prefix);
    validate_destination(errors, "topics.error_queue", &t.error_queue);
    validate_destination(errors, "topics.notification_queue", &t.notification_queue);
}
