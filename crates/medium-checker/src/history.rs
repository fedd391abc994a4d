use std::collections::VecDeque;

use tokio::sync::Mutex;

use crate::format::FormattedResult;

pub const HISTORY_CAPACITY: usize = 50;
/// Entries returned by a history listing.
pub const RECENT_LIMIT: usize = 10;

/// Bounded FIFO of formatted results; the oldest entry is evicted once full.
pub struct AnalysisHistory {
    capacity: usize,
    entries: Mutex<VecDeque<FormattedResult>>,
}

impl AnalysisHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn push(&self, entry: FormattedResult) {
        let mut entries = self.entries.lock().await;
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The newest `limit` entries, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<FormattedResult> {
        let entries = self.entries.lock().await;
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}
