use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use log::warn;

use crate::data::{Topic, TopicFetchError, TopicSource};

/// Per-leaf cache state. Entries live for the whole session; there is no
/// eviction.
#[derive(Clone, Debug)]
pub(in crate::app) enum TopicEntry {
    Loading,
    Ready(Vec<Topic>),
    Error(String),
}

type Completion = (String, Result<Vec<Topic>, TopicFetchError>);

/// Lazy per-leaf topic cache. At most one fetch is ever in flight per key:
/// `request` records `Loading` before spawning, so concurrent requests for
/// the same id observe the entry and return without a second fetch.
/// Completions come back over a channel and are merged from the event loop.
pub(in crate::app) struct TopicCache {
    entries: HashMap<String, TopicEntry>,
    source: Arc<dyn TopicSource>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl TopicCache {
    pub fn new(source: Arc<dyn TopicSource>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            entries: HashMap::new(),
            source,
            tx,
            rx,
        }
    }

    pub fn entry(&self, l0_id: &str) -> Option<&TopicEntry> {
        self.entries.get(l0_id)
    }

    pub fn has_loading(&self) -> bool {
        self.entries
            .values()
            .any(|entry| matches!(entry, TopicEntry::Loading))
    }

    pub fn request(&mut self, l0_id: &str) {
        if self.entries.contains_key(l0_id) {
            return;
        }

        self.entries.insert(l0_id.to_string(), TopicEntry::Loading);

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let id = l0_id.to_string();
        thread::spawn(move || {
            let result = source.fetch_topics(&id);
            // The receiver only goes away on shutdown.
            let _ = tx.send((id, result));
        });
    }

    /// Replaces a failed entry with a fresh fetch. Loading and ready
    /// entries are left alone.
    pub fn retry(&mut self, l0_id: &str) {
        if matches!(self.entries.get(l0_id), Some(TopicEntry::Error(_))) {
            self.entries.remove(l0_id);
            self.request(l0_id);
        }
    }

    /// Drains finished fetches into the cache. Returns true if anything
    /// changed, so the caller can repaint.
    pub fn poll_completions(&mut self) -> bool {
        let mut merged = false;
        while let Ok((id, result)) = self.rx.try_recv() {
            let entry = match result {
                Ok(topics) => TopicEntry::Ready(topics),
                Err(error) => {
                    warn!("topic fetch for {id} failed: {error}");
                    TopicEntry::Error(error.to_string())
                }
            };
            self.entries.insert(id, entry);
            merged = true;
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    struct CountingSource {
        calls: AtomicUsize,
        fail_ids: Vec<String>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_ids: Vec::new(),
            }
        }

        fn failing_on(id: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_ids: vec![id.to_string()],
            }
        }
    }

    impl TopicSource for CountingSource {
        fn fetch_topics(&self, l0_id: &str) -> Result<Vec<Topic>, TopicFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_ids.iter().any(|id| id == l0_id) {
                return Err(TopicFetchError::Missing {
                    id: l0_id.to_string(),
                });
            }
            Ok(vec![Topic {
                id: format!("{l0_id}-topic"),
                text: format!("summary for {l0_id}"),
            }])
        }
    }

    fn wait_until_settled(cache: &mut TopicCache, id: &str) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            cache.poll_completions();
            match cache.entry(id) {
                Some(TopicEntry::Loading) | None => {}
                _ => return,
            }
            assert!(Instant::now() < deadline, "fetch for {id} never settled");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn duplicate_requests_fetch_once() {
        let source = Arc::new(CountingSource::new());
        let mut cache = TopicCache::new(Arc::clone(&source) as Arc<dyn TopicSource>);

        cache.request("l0-1");
        cache.request("l0-1");
        assert!(matches!(cache.entry("l0-1"), Some(TopicEntry::Loading)));

        wait_until_settled(&mut cache, "l0-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(cache.entry("l0-1"), Some(TopicEntry::Ready(_))));
    }

    #[test]
    fn ready_entries_are_never_refetched() {
        let source = Arc::new(CountingSource::new());
        let mut cache = TopicCache::new(Arc::clone(&source) as Arc<dyn TopicSource>);

        cache.request("l0-2");
        wait_until_settled(&mut cache, "l0-2");
        cache.request("l0-2");
        cache.poll_completions();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failures_stay_scoped_to_their_key() {
        let source = Arc::new(CountingSource::failing_on("bad"));
        let mut cache = TopicCache::new(Arc::clone(&source) as Arc<dyn TopicSource>);

        cache.request("bad");
        cache.request("good");
        wait_until_settled(&mut cache, "bad");
        wait_until_settled(&mut cache, "good");

        assert!(matches!(cache.entry("bad"), Some(TopicEntry::Error(_))));
        assert!(matches!(cache.entry("good"), Some(TopicEntry::Ready(_))));
    }

    #[test]
    fn retry_refetches_only_failed_entries() {
        let source = Arc::new(CountingSource::failing_on("flaky"));
        let mut cache = TopicCache::new(Arc::clone(&source) as Arc<dyn TopicSource>);

        cache.request("flaky");
        wait_until_settled(&mut cache, "flaky");
        assert!(matches!(cache.entry("flaky"), Some(TopicEntry::Error(_))));

        cache.retry("flaky");
        wait_until_settled(&mut cache, "flaky");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        cache.request("steady");
        wait_until_settled(&mut cache, "steady");
        let calls = source.calls.load(Ordering::SeqCst);
        cache.retry("steady");
        cache.poll_completions();
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }

    #[test]
    fn ready_topics_keep_source_order() {
        struct OrderedSource;
        impl TopicSource for OrderedSource {
            fn fetch_topics(&self, _l0_id: &str) -> Result<Vec<Topic>, TopicFetchError> {
                Ok(vec![
                    Topic {
                        id: "first".into(),
                        text: "a".into(),
                    },
                    Topic {
                        id: "second".into(),
                        text: "b".into(),
                    },
                ])
            }
        }

        let mut cache = TopicCache::new(Arc::new(OrderedSource));
        cache.request("l0-1");
        wait_until_settled(&mut cache, "l0-1");

        let Some(TopicEntry::Ready(topics)) = cache.entry("l0-1") else {
            panic!("expected ready entry");
        };
        assert_eq!(topics[0].id, "first");
        assert_eq!(topics[1].id, "second");
    }
}
