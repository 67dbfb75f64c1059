//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "nudge".to_string()
}

pub fn default_data_dir() -> String {
    "~/.nudge".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_db_path() -> String {
    "~/.nudge/data/reminders.db".to_string()
}

pub fn default_retention_days() -> i64 {
    30
}

pub fn default_poll_interval() -> u64 {
    10
}

pub fn default_error_backoff() -> u64 {
    60
}

pub fn default_max_retry_backoff() -> u64 {
    600
}

pub fn default_send_timeout() -> u64 {
    30
}

pub fn default_max_text_len() -> usize {
    500
}

pub fn default_session_ttl() -> u64 {
    3600
}

pub fn default_page_size() -> usize {
    8
}

pub fn default_health_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_health_port() -> u16 {
    8080
}
