use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait IdAllocator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Timestamp plus a process-wide sequence, so ids never repeat within one
/// process. Collisions with persisted ids are the caller's concern.
#[derive(Debug)]
pub struct SequentialIdAllocator {
    prefix: String,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl SequentialIdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for SequentialIdAllocator {
    fn default() -> Self {
        Self::new("evt")
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn new_id(&self) -> String {
        let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}-{sequence}", self.prefix, Utc::now().timestamp_micros())
    }
}
