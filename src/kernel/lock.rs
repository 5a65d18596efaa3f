use {
    crate::server::SHOULD_EXIT,
    std::{
        collections::{
            hash_map::Entry,
            HashMap,
        },
        fmt::Debug,
        future::Future,
        hash::Hash,
        sync::{
            atomic::{
                AtomicU64,
                Ordering,
            },
            Mutex,
            MutexGuard,
            PoisonError,
        },
        time::{
            Duration,
            Instant,
        },
    },
    thiserror::Error,
};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_millis(500);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct LockOptions {
    /// A holder that exceeds this lifetime is considered crashed and its
    /// entry may be reclaimed by the next acquirer.
    pub timeout:     Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            timeout:     DEFAULT_LOCK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum LockError {
    #[error("lock still held after {attempts} attempts")]
    Busy { attempts: u32 },
}

#[derive(Debug)]
struct LockEntry {
    acquired_at: Instant,
    generation:  u64,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LockStats {
    pub held:              usize,
    pub acquired:          u64,
    pub contended:         u64,
    pub busy_failures:     u64,
    pub expired_reclaimed: u64,
}

/// Advisory per-key mutual exclusion with a bounded lease. Only components
/// that take the lock cooperatively are serialized by it; entries left behind
/// by a crashed holder expire after `timeout` and are reclaimed either by the
/// next acquirer or by the periodic sweeper.
pub struct KeyedLock<K> {
    entries:           Mutex<HashMap<K, LockEntry>>,
    options:           LockOptions,
    generation:        AtomicU64,
    acquired:          AtomicU64,
    contended:         AtomicU64,
    busy_failures:     AtomicU64,
    expired_reclaimed: AtomicU64,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(options: LockOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            options,
            generation: AtomicU64::new(0),
            acquired: AtomicU64::new(0),
            contended: AtomicU64::new(0),
            busy_failures: AtomicU64::new(0),
            expired_reclaimed: AtomicU64::new(0),
        }
    }

    /// Run `f` while holding the lock for `key`. Acquisition retries with
    /// linearly escalating backoff and surfaces `Busy` once the attempts are
    /// exhausted; `f` is never started in that case.
    pub async fn with_lock<F, Fut, T>(&self, key: K, f: F) -> Result<T, LockError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let guard = self.acquire(key).await?;
        let output = f().await;
        drop(guard);
        Ok(output)
    }

    async fn acquire(&self, key: K) -> Result<LockGuard<'_, K>, LockError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            if let Some(generation) = self.try_acquire(&key) {
                self.acquired.fetch_add(1, Ordering::Relaxed);
                return Ok(LockGuard {
                    lock: self,
                    key,
                    generation,
                });
            }
            self.contended.fetch_add(1, Ordering::Relaxed);
            if attempts > self.options.max_retries {
                self.busy_failures.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = ?key, attempts, "Keyed lock busy, giving up.");
                return Err(LockError::Busy { attempts });
            }
            tokio::time::sleep(self.options.retry_delay * attempts).await;
        }
    }

    fn try_acquire(&self, key: &K) -> Option<u64> {
        let now = Instant::now();
        let mut entries = self.locked_entries();
        match entries.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if now.duration_since(entry.get().acquired_at) > self.options.timeout {
                    let generation = self.next_generation();
                    self.expired_reclaimed.fetch_add(1, Ordering::Relaxed);
                    entry.insert(LockEntry {
                        acquired_at: now,
                        generation,
                    });
                    Some(generation)
                } else {
                    None
                }
            }
            Entry::Vacant(entry) => {
                let generation = self.next_generation();
                entry.insert(LockEntry {
                    acquired_at: now,
                    generation,
                });
                Some(generation)
            }
        }
    }

    pub fn is_locked(&self, key: &K) -> bool {
        let entries = self.locked_entries();
        entries
            .get(key)
            .map(|entry| entry.acquired_at.elapsed() <= self.options.timeout)
            .unwrap_or(false)
    }

    pub fn stats(&self) -> LockStats {
        LockStats {
            held:              self.locked_entries().len(),
            acquired:          self.acquired.load(Ordering::Relaxed),
            contended:         self.contended.load(Ordering::Relaxed),
            busy_failures:     self.busy_failures.load(Ordering::Relaxed),
            expired_reclaimed: self.expired_reclaimed.load(Ordering::Relaxed),
        }
    }

    /// Drop entries whose holders exceeded the lease. Acquirers already treat
    /// expired entries as free; the sweeper keeps the registry small.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.locked_entries();
        let before = entries.len();
        entries.retain(|_, entry| entry.acquired_at.elapsed() <= self.options.timeout);
        before - entries.len()
    }

    pub async fn run_sweep_loop(&self) -> anyhow::Result<()> {
        let mut sweep_interval = tokio::time::interval(self.options.timeout);
        while !SHOULD_EXIT.load(Ordering::Acquire) {
            sweep_interval.tick().await;
            let swept = self.sweep_expired();
            if swept > 0 {
                tracing::debug!(swept, "Reclaimed expired lock entries.");
            }
        }
        Ok(())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    fn locked_entries(&self) -> MutexGuard<'_, HashMap<K, LockEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LockGuard<'a, K>
where
    K: Eq + Hash + Clone + Debug,
{
    lock:       &'a KeyedLock<K>,
    key:        K,
    generation: u64,
}

impl<K> Drop for LockGuard<'_, K>
where
    K: Eq + Hash + Clone + Debug,
{
    fn drop(&mut self) {
        let mut entries = self.lock.locked_entries();
        // The entry may have been reclaimed after expiry; only remove our own
        // generation.
        if let Entry::Occupied(entry) = entries.entry(self.key.clone()) {
            if entry.get().generation == self.generation {
                entry.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        std::sync::Arc,
    };

    fn quick_options() -> LockOptions {
        LockOptions {
            timeout:     Duration::from_millis(200),
            max_retries: 2,
            retry_delay: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn with_lock_serializes_same_key() {
        let lock = Arc::new(KeyedLock::new(LockOptions::default()));
        let running = Arc::new(AtomicU64::new(0));
        let max_seen = Arc::new(AtomicU64::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let lock = lock.clone();
                let running = running.clone();
                let max_seen = max_seen.clone();
                tokio::spawn(async move {
                    lock.with_lock("auction-1", || async {
                        let current = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(current, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(2)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
                })
            })
            .collect();
        for task in tasks {
            let _ = task.await.unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_contend() {
        let lock = KeyedLock::new(quick_options());
        let _first = lock.acquire("a").await.unwrap();
        let second = lock.acquire("b").await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn busy_after_bounded_retries() {
        let lock = Arc::new(KeyedLock::new(LockOptions {
            timeout: Duration::from_secs(5),
            ..quick_options()
        }));
        let guard = lock.acquire("a").await.unwrap();
        let result = lock
            .with_lock("a", || async {
                unreachable!("must not run under contention");
            })
            .await;
        assert_eq!(result.unwrap_err(), LockError::Busy { attempts: 3 });
        assert_eq!(lock.stats().busy_failures, 1);
        drop(guard);
    }

    #[tokio::test]
    async fn expired_entries_are_reclaimed() {
        let lock = KeyedLock::new(quick_options());
        let stale = lock.acquire("a").await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(!lock.is_locked(&"a"));
        let fresh = lock.acquire("a").await.unwrap();
        assert_eq!(lock.stats().expired_reclaimed, 1);

        // The stale guard must not release the reclaimed entry.
        drop(stale);
        assert!(lock.is_locked(&"a"));
        drop(fresh);
        assert!(!lock.is_locked(&"a"));
    }

    #[tokio::test]
    async fn sweeper_drops_expired_entries() {
        let lock = KeyedLock::new(quick_options());
        let guard = lock.acquire("a").await.unwrap();
        std::mem::forget(guard);
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(lock.sweep_expired(), 1);
        assert_eq!(lock.stats().held, 0);
    }
}
