#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use countdowns::{
    Clock, CountdownError, EventPersistence, EventService, EventStore, KeyValueStore, MemoryStore,
    ReadFailurePolicy, Result, DEFAULT_STORAGE_KEY,
};

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 8, 0, 0).unwrap()
}

/// Clock that only moves when told to.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.0.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// In-memory backend that counts calls, yields at every I/O point and can be
/// told to reject writes.
#[derive(Default)]
pub struct TestBackend {
    inner: MemoryStore,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub fail_writes: AtomicBool,
    pub slow_next_read: AtomicBool,
}

impl TestBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Makes the next read take its snapshot, then stall for 50 ms.
    pub fn slow_down_next_read(&self) {
        self.slow_next_read.store(true, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn raw(&self, key: &str) -> Option<String> {
        self.inner.get_item(key).await.unwrap()
    }

    pub async fn put_raw(&self, key: &str, value: &str) {
        self.inner.set_item(key, value.to_string()).await.unwrap()
    }
}

impl KeyValueStore for TestBackend {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let value = self.inner.get_item(key).await;
        if self.slow_next_read.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }
        value
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        tokio::task::yield_now().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(CountdownError::Io(std::io::Error::other("disk full")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set_item(key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key).await
    }
}

pub fn store_with(
    backend: Arc<TestBackend>,
    clock: Arc<ManualClock>,
    policy: ReadFailurePolicy,
) -> EventStore<TestBackend> {
    let persistence = EventPersistence::new(backend, DEFAULT_STORAGE_KEY, policy);
    EventStore::new(persistence).with_clock(clock)
}

pub fn service_with(
    backend: Arc<TestBackend>,
    clock: Arc<ManualClock>,
) -> EventService<TestBackend> {
    let store = store_with(backend, clock.clone(), ReadFailurePolicy::FallbackEmpty);
    EventService::new(Arc::new(store)).with_clock(clock)
}
