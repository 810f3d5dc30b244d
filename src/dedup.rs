//! Webhook delivery de-duplication.
//!
//! Telegram retries a webhook delivery until it is acknowledged, so the same
//! `update_id` can arrive more than once. The last `window` ids are kept in
//! memory and a repeat within that window is dropped.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Window {
    order: VecDeque<i64>,
    seen: HashSet<i64>,
}

#[derive(Debug)]
pub struct UpdateDeduplicator {
    window: usize,
    inner: Mutex<Window>,
}

impl UpdateDeduplicator {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            inner: Mutex::new(Window::default()),
        }
    }

    /// Record an update id; returns `false` when it was already seen
    pub fn first_delivery(&self, update_id: i64) -> bool {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if !inner.seen.insert(update_id) {
            return false;
        }
        inner.order.push_back(update_id);
        while inner.order.len() > self.window {
            if let Some(oldest) = inner.order.pop_front() {
                inner.seen.remove(&oldest);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_is_rejected() {
        let dedup = UpdateDeduplicator::new(8);
        assert!(dedup.first_delivery(1));
        assert!(dedup.first_delivery(2));
        assert!(!dedup.first_delivery(1));
        assert!(!dedup.first_delivery(2));
    }

    #[test]
    fn test_window_evicts_oldest() {
        let dedup = UpdateDeduplicator::new(2);
        assert!(dedup.first_delivery(1));
        assert!(dedup.first_delivery(2));
        assert!(dedup.first_delivery(3));
        // 1 fell out of the window
        assert!(dedup.first_delivery(1));
        assert!(!dedup.first_delivery(3));
    }
}
