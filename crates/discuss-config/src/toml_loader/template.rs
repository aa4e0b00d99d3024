//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> &'static str {
    r##"# Discuss sync configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[realtime]
# base_url = "ws://localhost:8080/ws"   # DISCUSS_WS_URL overrides this
# endpoint_suffix = "/discuss"
# reconnect_delay_ms = 5000             # 100-300000
# heartbeat_incoming_ms = 10000         # 0 disables, else 1000-600000
# heartbeat_outgoing_ms = 10000         # 0 disables, else 1000-600000
# connect_timeout_secs = 15             # 1-120

[topics]
# channel_topic_prefix = "/topic/channels"
# command_prefix = "/app/channels"
# error_queue = "/user/queue/errors"
# notification_queue = "/user/queue/notifications"

[logging]
# level = "info"                        # trace, debug, info, warn, error
"##
}
