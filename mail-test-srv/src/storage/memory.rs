use serde::Deserialize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// One delivered message for one recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub sender: String,
    pub recipient: String,
    pub body: String,
}

/// Optional exact-match filters for [`MailStore::count`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CountFilter {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl CountFilter {
    pub fn matches(&self, message: &ReceivedMessage) -> bool {
        self.from.as_deref().map_or(true, |from| message.sender == from)
            && self.to.as_deref().map_or(true, |to| message.recipient == to)
    }
}

/// In-memory, append-only record of every message the server accepted.
///
/// Every operation takes the same lock, so sessions and the API never see a
/// partially updated sequence. The lock is never held across an await.
#[derive(Debug, Default)]
pub struct MailStore {
    messages: Mutex<Vec<ReceivedMessage>>,
}

impl MailStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ReceivedMessage>> {
        // Records are only ever pushed whole, so a poisoned guard is still consistent
        self.messages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, message: ReceivedMessage) {
        let mut messages = self.lock();
        messages.push(message);
        debug!("Mail store holds {} messages", messages.len());
    }

    /// Append a whole batch under one lock, so readers see all of it or none
    pub fn append_all<I>(&self, batch: I) -> usize
    where
        I: IntoIterator<Item = ReceivedMessage>,
    {
        let mut messages = self.lock();
        let before = messages.len();
        messages.extend(batch);
        let added = messages.len() - before;
        debug!("Mail store holds {} messages (+{})", messages.len(), added);
        added
    }

    pub fn clear(&self) {
        let mut messages = self.lock();
        let removed = std::mem::take(&mut *messages).len();
        debug!("Cleared {} messages from mail store", removed);
    }

    pub fn count(&self, filter: &CountFilter) -> usize {
        self.lock().iter().filter(|m| filter.matches(m)).count()
    }

    /// Snapshot of all records in insertion order
    pub fn messages(&self) -> Vec<ReceivedMessage> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn message(from: &str, to: &str) -> ReceivedMessage {
        ReceivedMessage {
            sender: from.to_string(),
            recipient: to.to_string(),
            body: String::new(),
        }
    }

    fn filter(from: Option<&str>, to: Option<&str>) -> CountFilter {
        CountFilter {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        }
    }

    #[test]
    fn test_count_filters() {
        let store = MailStore::new();
        for (from, to) in [("a", "b"), ("a", "b"), ("a", "c"), ("c", "a"), ("c", "b")] {
            store.append(message(from, to));
        }

        assert_eq!(store.count(&CountFilter::default()), 5);
        assert_eq!(store.count(&filter(Some("a"), None)), 3);
        assert_eq!(store.count(&filter(Some("c"), None)), 2);
        assert_eq!(store.count(&filter(None, Some("b"))), 3);
        assert_eq!(store.count(&filter(Some("a"), Some("b"))), 2);
        assert_eq!(store.count(&filter(Some("b"), None)), 0);
    }

    #[test]
    fn test_count_is_exact_match() {
        let store = MailStore::new();
        store.append(message("User@Example.com", "x@example.com"));
        assert_eq!(store.count(&filter(Some("user@example.com"), None)), 0);
        assert_eq!(store.count(&filter(Some("User@Example.com"), None)), 1);
    }

    #[test]
    fn test_clear() {
        let store = MailStore::new();
        store.append(message("a", "b"));
        store.append(message("a", "c"));
        assert_eq!(store.len(), 2);

        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.count(&CountFilter::default()), 0);

        store.append(message("a", "b"));
        assert_eq!(store.count(&CountFilter::default()), 1);
    }

    #[test]
    fn test_insertion_order_and_duplicates_kept() {
        let store = MailStore::new();
        store.append(message("a", "1"));
        store.append(message("a", "2"));
        store.append(message("a", "1"));

        let recipients: Vec<String> = store.messages().into_iter().map(|m| m.recipient).collect();
        assert_eq!(recipients, vec!["1", "2", "1"]);
    }

    #[test]
    fn test_append_all_keeps_order() {
        let store = MailStore::new();
        store.append(message("x", "0"));
        let added = store.append_all(vec![message("a", "1"), message("a", "2")]);

        assert_eq!(added, 2);
        let recipients: Vec<String> = store.messages().into_iter().map(|m| m.recipient).collect();
        assert_eq!(recipients, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_append_all_is_never_seen_partially() {
        const BATCH: usize = 500;
        const BATCHES: usize = 200;

        let store = Arc::new(MailStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..BATCHES {
                    let sender = format!("sender{}", i);
                    store.append_all((0..BATCH).map(|r| message(&sender, &r.to_string())));
                }
            })
        };

        let mut partial = 0;
        while !writer.is_finished() {
            if store.count(&CountFilter::default()) % BATCH != 0 {
                partial += 1;
            }
        }
        writer.join().unwrap();

        assert_eq!(partial, 0);
        assert_eq!(store.len(), BATCH * BATCHES);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(MailStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.append(message(&format!("sender{}", i), "rcpt"));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
        assert_eq!(store.count(&filter(Some("sender3"), None)), 100);
    }
}
