pub mod admin;
pub mod calculator;
pub mod config;
pub mod engine;
pub mod error;
pub mod logger;
pub mod registry;
pub mod replay;
pub mod storage;

/// Get current Unix timestamp (seconds). A clock before the epoch reads as 0.
pub fn current_timestamp() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
