use std::collections::VecDeque;
use std::sync::Mutex;

use dashmap::DashMap;

/// A verbatim-replayable HTTP response, captured the first time a
/// cacheable POST runs.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
}

/// Process-scoped cache keyed by client-supplied request id. A repeat POST
/// with the same id replays the stored response byte-for-byte instead of
/// re-running the handler — so no second write, no second webhook.
///
/// `max_entries` bounds memory for a long-running fake; `None` is
/// unbounded (the spec's default). When set, the oldest-inserted entry is
/// evicted first (FIFO) — the simplest correct policy for a cache the
/// spec only asks to bound, not to expire on any particular schedule.
pub struct IdempotencyCache {
    entries: DashMap<String, CachedResponse>,
    order: Mutex<VecDeque<String>>,
    max_entries: Option<usize>,
}

impl IdempotencyCache {
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            max_entries,
        }
    }

    pub fn get(&self, request_id: &str) -> Option<CachedResponse> {
        self.entries.get(request_id).map(|e| e.clone())
    }

    pub fn insert(&self, request_id: String, response: CachedResponse) {
        if self.entries.contains_key(&request_id) {
            return;
        }
        self.entries.insert(request_id.clone(), response);
        let mut order = self.order.lock().expect("order lock not poisoned");
        order.push_back(request_id);

        if let Some(max) = self.max_entries {
            while order.len() > max {
                if let Some(oldest) = order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.order.lock().expect("order lock not poisoned").clear();
    }
}
