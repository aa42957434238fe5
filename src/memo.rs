// Per-key request-state table: not-started / in-flight / done.
//
// Logically concurrent callers for the same key interleave at await points,
// so the first caller claims the key's cell and runs the fetch while the rest
// suspend on it; exactly one underlying request is issued. A failed fetch
// leaves the cell empty, so the next explicit call retries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

#[derive(Debug)]
pub struct MemoMap<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> MemoMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        MemoMap {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get_or_try_fetch<F, Fut>(&self, key: &K, fetch: F) -> anyhow::Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<V>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            Arc::clone(cells.entry(key.clone()).or_default())
        };
        let value = cell.get_or_try_init(fetch).await?;
        Ok(value.clone())
    }
}
