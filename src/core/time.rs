use chrono::{DateTime, Duration, Utc};

pub const FIXED_TIME_ENV: &str = "SECUREURL_FIXED_TIME";

/// Current time, or the instant pinned by `SECUREURL_FIXED_TIME` (RFC 3339).
pub fn now_utc() -> DateTime<Utc> {
    if let Ok(value) = std::env::var(FIXED_TIME_ENV) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
            return dt.with_timezone(&Utc);
        }
    }
    Utc::now()
}

/// Window within which a threat counts as active.
pub fn active_window() -> Duration {
    Duration::hours(24)
}
