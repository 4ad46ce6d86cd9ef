//! Request counters.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every request. Values only ever grow.
#[derive(Debug)]
pub struct ServerStats {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    started_at: DateTime<Utc>,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            started_at: Utc::now(),
        }
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successful_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn successful_requests(&self) -> u64 {
        self.successful_requests.load(Ordering::Relaxed)
    }

    pub fn failed_requests(&self) -> u64 {
        self.failed_requests.load(Ordering::Relaxed)
    }

    /// Snapshot for the health endpoint.
    pub fn to_json(&self) -> Value {
        let uptime = Utc::now().signed_duration_since(self.started_at);
        json!({
            "total_requests": self.total_requests(),
            "successful_requests": self.successful_requests(),
            "failed_requests": self.failed_requests(),
            "started_at": self.started_at.to_rfc3339(),
            "uptime_seconds": uptime.num_seconds().max(0),
        })
    }
}
