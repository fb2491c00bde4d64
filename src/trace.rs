//! Per-call trace records.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

/// Snapshot of one logical call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceInfo {
    /// The request as sent, rendered as HTTP/1.1 text.
    pub request: String,
    /// The final response, rendered as HTTP/1.1 text.
    pub response: String,
    /// Wall time of the whole call, retries and redirects included.
    #[serde(serialize_with = "serialize_duration_ms")]
    pub duration: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// A caller-owned, shareable trace log.
///
/// Clones share the same entries, so the log outlives any request it was
/// attached to.
#[derive(Debug, Clone, Default)]
pub struct TraceLog {
    entries: Arc<Mutex<Vec<TraceInfo>>>,
}

impl TraceLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn push(&self, info: TraceInfo) {
        self.lock().push(info);
    }

    /// Returns a copy of every entry.
    #[must_use]
    pub fn entries(&self) -> Vec<TraceInfo> {
        self.lock().clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Serializes every entry as a JSON array.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&*self.lock())
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, Vec<TraceInfo>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
