use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub fresh_for: Duration,
    pub max_entries: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(30),
            max_entries: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cached<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<V> {
    Fresh(Cached<V>),
    Stale(Cached<V>),
    Miss,
}

/// Handed out when a fetch starts; generations increase monotonically across
/// the whole cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: String,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Stored,
    Discarded,
}

#[async_trait]
pub trait QueryCache<V>: Send + Sync {
    async fn lookup(&self, key: &str) -> Lookup<V>;
    async fn begin_fetch(&self, key: &str) -> FetchTicket;
    async fn complete(&self, ticket: &FetchTicket, value: V) -> Completion;
}

struct Entry<V> {
    value: V,
    generation: u64,
    stored_at: Instant,
    fetched_at: DateTime<Utc>,
}

struct CacheState<V> {
    entries: HashMap<String, Entry<V>>,
    next_generation: u64,
}

pub struct SwrCache<V> {
    policy: CachePolicy,
    state: Mutex<CacheState<V>>,
}

impl<V> SwrCache<V> {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(CacheState {
                entries: HashMap::new(),
                next_generation: 1,
            }),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}

#[async_trait]
impl<V> QueryCache<V> for SwrCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn lookup(&self, key: &str) -> Lookup<V> {
        let state = self.state.lock().await;
        match state.entries.get(key) {
            Some(e) => {
                let cached = Cached {
                    value: e.value.clone(),
                    fetched_at: e.fetched_at,
                };
                if e.stored_at.elapsed() < self.policy.fresh_for {
                    Lookup::Fresh(cached)
                } else {
                    Lookup::Stale(cached)
                }
            }
            None => Lookup::Miss,
        }
    }

    async fn begin_fetch(&self, key: &str) -> FetchTicket {
        let mut state = self.state.lock().await;
        let generation = state.next_generation;
        state.next_generation += 1;
        FetchTicket {
            key: key.to_string(),
            generation,
        }
    }

    async fn complete(&self, ticket: &FetchTicket, value: V) -> Completion {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.entries.get(&ticket.key) {
            if existing.generation > ticket.generation {
                debug!(
                    key = %ticket.key,
                    generation = ticket.generation,
                    stored = existing.generation,
                    "discarding superseded fetch"
                );
                return Completion::Discarded;
            }
        }

        state.entries.insert(
            ticket.key.clone(),
            Entry {
                value,
                generation: ticket.generation,
                stored_at: Instant::now(),
                fetched_at: Utc::now(),
            },
        );

        if state.entries.len() > self.policy.max_entries {
            let oldest = state
                .entries
                .iter()
                .filter(|(k, _)| *k != &ticket.key)
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone());
            if let Some(k) = oldest {
                state.entries.remove(&k);
            }
        }

        Completion::Stored
    }
}
