//! Per-user conversation memory with TTL eviction and a capacity cap.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{sync::RwLock, task::JoinHandle};
use tracing::debug;

use crate::backend_client::SourceRef;

#[derive(Clone, Debug)]
pub struct ConversationState {
    pub last_query: String,
    pub last_answer: String,
    pub last_contexts: Vec<SourceRef>,
    pub touched: Instant,
}

impl ConversationState {
    pub fn new(query: impl Into<String>, answer: impl Into<String>, contexts: Vec<SourceRef>) -> Self {
        Self {
            last_query: query.into(),
            last_answer: answer.into(),
            last_contexts: contexts,
            touched: Instant::now(),
        }
    }
}

/// Keyed by Discord user id. Last write wins.
pub struct ConversationStore {
    inner: RwLock<HashMap<u64, ConversationState>>,
    ttl: Duration,
    max_users: usize,
}

impl ConversationStore {
    pub fn new(ttl: Duration, max_users: usize) -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
            ttl,
            max_users: max_users.max(1),
        }
    }

    /// State of `user` unless it has expired.
    pub async fn get(&self, user: u64) -> Option<ConversationState> {
        let map = self.inner.read().await;
        map.get(&user)
            .filter(|s| s.touched.elapsed() < self.ttl)
            .cloned()
    }

    /// Inserts or overwrites. At capacity the least recently touched user is evicted.
    pub async fn put(&self, user: u64, state: ConversationState) {
        let mut map = self.inner.write().await;
        if !map.contains_key(&user) && map.len() >= self.max_users {
            let oldest = map
                .iter()
                .min_by_key(|(_, s)| s.touched)
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                map.remove(&id);
                debug!(evicted = id, "conversation store at capacity");
            }
        }
        map.insert(user, state);
    }

    /// Returns whether there was anything to delete.
    pub async fn clear(&self, user: u64) -> bool {
        self.inner.write().await.remove(&user).is_some()
    }

    /// Drops expired entries; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, s| s.touched.elapsed() < self.ttl);
        before - map.len()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Background task calling [`Self::purge_expired`] every `every`.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.tick().await;
            loop {
                tick.tick().await;
                let removed = self.purge_expired().await;
                if removed > 0 {
                    debug!(removed, "expired conversations purged");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(q: &str) -> ConversationState {
        ConversationState::new(q, format!("answer to {q}"), vec![])
    }

    #[tokio::test]
    async fn put_get_clear() {
        let store = ConversationStore::new(Duration::from_secs(60), 10);
        store.put(1, state("first")).await;
        store.put(1, state("second")).await;

        assert_eq!(store.get(1).await.unwrap().last_query, "second");
        assert!(store.get(2).await.is_none());
        assert!(store.clear(1).await);
        assert!(!store.clear(1).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible_and_purged() {
        let store = ConversationStore::new(Duration::from_millis(20), 10);
        store.put(7, state("q")).await;
        tokio::time::sleep(Duration::from_millis(40)).await;

        assert!(store.get(7).await.is_none());
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn capacity_evicts_least_recent() {
        let store = ConversationStore::new(Duration::from_secs(60), 2);
        store.put(1, state("a")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.put(2, state("b")).await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        store.put(3, state("c")).await;

        assert_eq!(store.len().await, 2);
        assert!(store.get(1).await.is_none());
        assert!(store.get(3).await.is_some());
    }
}
