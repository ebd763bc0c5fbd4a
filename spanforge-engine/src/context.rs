//! Bounded keyed registry of exported span contexts.
//!
//! Producer spans register their identifiers under a resolved key; later
//! consumer spans look keys up by glob pattern and attach the matches as
//! links. The store holds identifiers only, never spans.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use spanforge_core::{SpanId, TraceId};

/// One exported span context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub key: String,
    pub trace_id: TraceId,
    pub span_id: SpanId,
    pub inserted_at: DateTime<Utc>,
}

/// Process-wide bounded context store, shared by all workers.
///
/// A single lock is enough: traffic is one insert or lookup per producing
/// or consuming span. Entries are kept in insertion order, so evicting the
/// front is evicting the oldest `inserted_at`.
pub struct ContextStore {
    entries: Mutex<VecDeque<ContextEntry>>,
    max_size: usize,
}

impl ContextStore {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            max_size: max_size.max(1),
        }
    }

    /// Register a span context under `key`.
    ///
    /// Re-inserting an existing key replaces the old entry and refreshes
    /// its age. On overflow the oldest entry is evicted; the emitter is
    /// never blocked.
    pub fn insert(&self, key: String, trace_id: TraceId, span_id: SpanId) {
        let mut entries = self.entries.lock();
        entries.retain(|e| e.key != key);
        while entries.len() >= self.max_size {
            entries.pop_front();
        }
        entries.push_back(ContextEntry {
            key,
            trace_id,
            span_id,
            inserted_at: Utc::now(),
        });
    }

    /// All entries whose key matches `pattern`, oldest first.
    ///
    /// `*` matches any substring; matching is case-sensitive.
    pub fn find(&self, pattern: &str) -> Vec<ContextEntry> {
        let entries = self.entries.lock();
        entries
            .iter()
            .filter(|e| glob_match(pattern, &e.key))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// Case-sensitive glob match where `*` matches any substring.
fn glob_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == text;
    }

    let mut segments = pattern.split('*');
    let first = segments.next().unwrap_or("");
    if !text.starts_with(first) {
        return false;
    }
    let mut pos = first.len();

    let mut middle: Vec<&str> = segments.collect();
    // Safe: the pattern contains '*', so split yields at least two parts.
    let last = middle.pop().unwrap_or("");

    for segment in middle {
        if segment.is_empty() {
            continue;
        }
        match text[pos..].find(segment) {
            Some(found) => pos += found + segment.len(),
            None => return false,
        }
    }

    if last.is_empty() {
        return true;
    }
    text.len() >= pos + last.len() && text.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u8) -> (TraceId, SpanId) {
        (TraceId([n; 16]), SpanId([n; 8]))
    }

    #[test]
    fn exact_key_lookup() {
        let store = ContextStore::new(10);
        let (t, s) = ids(1);
        store.insert("orders-1".to_owned(), t, s);

        let found = store.find("orders-1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].trace_id, t);
        assert_eq!(found[0].span_id, s);
        assert!(store.find("orders-2").is_empty());
    }

    #[test]
    fn glob_patterns() {
        assert!(glob_match("k-*", "k-abc"));
        assert!(glob_match("k-*", "k-"));
        assert!(glob_match("*-end", "start-end"));
        assert!(glob_match("a*c", "abc"));
        assert!(glob_match("a*b*c", "a-x-b-y-c"));
        assert!(glob_match("*", "anything"));
        assert!(!glob_match("k-*", "K-abc"));
        assert!(!glob_match("a*c", "ab"));
        assert!(!glob_match("abc", "abcd"));
    }

    #[test]
    fn find_returns_all_matches() {
        let store = ContextStore::new(10);
        for n in 1..=3u8 {
            let (t, s) = ids(n);
            store.insert(format!("job-{n}"), t, s);
        }
        let (t, s) = ids(9);
        store.insert("other".to_owned(), t, s);

        assert_eq!(store.find("job-*").len(), 3);
    }

    #[test]
    fn reinsert_replaces_existing_key() {
        let store = ContextStore::new(10);
        let (t1, s1) = ids(1);
        let (t2, s2) = ids(2);
        store.insert("k".to_owned(), t1, s1);
        store.insert("k".to_owned(), t2, s2);

        assert_eq!(store.len(), 1);
        let found = store.find("k");
        assert_eq!(found[0].span_id, s2);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let store = ContextStore::new(2);
        for n in 1..=3u8 {
            let (t, s) = ids(n);
            store.insert(format!("k-{n}"), t, s);
        }

        assert_eq!(store.len(), 2);
        assert!(store.find("k-1").is_empty());
        assert_eq!(store.find("k-*").len(), 2);
    }

    #[test]
    fn size_never_exceeds_bound() {
        let store = ContextStore::new(5);
        for n in 0..100u8 {
            let (t, s) = ids(n);
            store.insert(format!("k-{n}"), t, s);
            assert!(store.len() <= 5);
        }
    }
}
