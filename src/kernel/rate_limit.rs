use {
    dashmap::DashMap,
    std::{
        collections::VecDeque,
        fmt::Debug,
        hash::Hash,
        time::{
            Duration,
            Instant,
        },
    },
};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding one-minute window per key. Advisory: callers decide what to do
/// when the limit is hit.
pub struct RateLimiter<K> {
    max_per_minute: u32,
    hits:           DashMap<K, VecDeque<Instant>>,
}

impl<K> RateLimiter<K>
where
    K: Eq + Hash + Clone + Debug,
{
    pub fn new(max_per_minute: u32) -> Self {
        Self {
            max_per_minute,
            hits: DashMap::new(),
        }
    }

    /// Record an attempt for `key`; returns false when the key is over its
    /// budget for the trailing minute.
    pub fn check(&self, key: K) -> bool {
        let now = Instant::now();
        let mut entry = self.hits.entry(key).or_default();
        while entry
            .front()
            .map(|hit| now.duration_since(*hit) > WINDOW)
            .unwrap_or(false)
        {
            entry.pop_front();
        }
        if entry.len() >= self.max_per_minute as usize {
            return false;
        }
        entry.push_back(now);
        true
    }
}
