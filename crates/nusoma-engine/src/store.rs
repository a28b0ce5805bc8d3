// Copyright (C) 2025 Nusoma Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker storage.

use async_trait::async_trait;
use dashmap::DashMap;
use nusoma_dsl::Worker;

/// Storage backend for worker definitions. Implementations must be safe to
/// share across tasks; the executor holds one behind an `Arc`.
#[async_trait]
pub trait WorkerStore: Send + Sync {
    /// Fetch a worker by id
    async fn get(&self, worker_id: &str) -> Option<Worker>;

    /// Insert or replace a worker. Returns the previous definition, if any.
    async fn put(&self, worker: Worker) -> Option<Worker>;

    /// Remove a worker. Returns the removed definition, if any.
    async fn remove(&self, worker_id: &str) -> Option<Worker>;

    /// All stored workers, sorted by id
    async fn list(&self) -> Vec<Worker>;
}

/// In-memory store backed by a concurrent map. The default backend for the
/// server and for tests.
#[derive(Debug, Default)]
pub struct InMemoryWorkerStore {
    workers: DashMap<String, Worker>,
}

impl InMemoryWorkerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkerStore for InMemoryWorkerStore {
    async fn get(&self, worker_id: &str) -> Option<Worker> {
        self.workers.get(worker_id).map(|entry| entry.clone())
    }

    async fn put(&self, worker: Worker) -> Option<Worker> {
        self.workers.insert(worker.id.clone(), worker)
    }

    async fn remove(&self, worker_id: &str) -> Option<Worker> {
        self.workers.remove(worker_id).map(|(_, worker)| worker)
    }

    async fn list(&self) -> Vec<Worker> {
        let mut workers: Vec<Worker> = self
            .workers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        workers.sort_by(|a, b| a.id.cmp(&b.id));
        workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn worker(id: &str) -> Worker {
        serde_json::from_value(json!({
            "id": id,
            "name": format!("Worker {}", id),
            "graph": {
                "blocks": {
                    "start": { "blockType": "Start", "id": "start" }
                },
                "entryPoint": "start"
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_put_get_remove() {
        let store = InMemoryWorkerStore::new();
        assert!(store.get("w1").await.is_none());

        assert!(store.put(worker("w1")).await.is_none());
        assert_eq!(store.get("w1").await.unwrap().id, "w1");

        let replaced = store.put(worker("w1")).await;
        assert!(replaced.is_some());

        assert!(store.remove("w1").await.is_some());
        assert!(store.get("w1").await.is_none());
        assert!(store.remove("w1").await.is_none());
    }

    #[tokio::test]
    async fn test_list_sorted() {
        let store = InMemoryWorkerStore::new();
        store.put(worker("b")).await;
        store.put(worker("a")).await;
        store.put(worker("c")).await;

        let ids: Vec<String> = store.list().await.into_iter().map(|w| w.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
