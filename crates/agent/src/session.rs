//! Session cache keyed by (provider, model).
//!
//! Each entry is an `Arc<OnceCell<..>>` inserted under the write lock and
//! initialized outside it, so concurrent first requests for the same key
//! construct once while other keys stay available. Beyond capacity the
//! least recently constructed entry is evicted. A failed construction is
//! removed so the next request retries.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub provider: String,
    pub model: String,
}

impl SessionKey {
    /// Provider names are case-insensitive; model names are kept as given.
    pub fn new(provider: &str, model: &str) -> Self {
        Self {
            provider: provider.trim().to_lowercase(),
            model: model.trim().to_string(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

type Cell<T> = Arc<OnceCell<Arc<T>>>;

struct Entries<T: ?Sized> {
    cells: HashMap<SessionKey, Cell<T>>,
    /// Insertion order, oldest first
    order: VecDeque<SessionKey>,
}

pub struct SessionCache<T: ?Sized> {
    capacity: usize,
    entries: RwLock<Entries<T>>,
}

impl<T: ?Sized> SessionCache<T> {
    /// `capacity` is at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: RwLock::new(Entries {
                cells: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cached keys, including entries still under construction.
    pub async fn len(&self) -> usize {
        self.entries.read().await.cells.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &SessionKey) -> bool {
        self.entries.read().await.cells.contains_key(key)
    }

    /// The session for `key`, constructing it with `init` on first use.
    pub async fn get_or_try_init<E, F, Fut>(&self, key: &SessionKey, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>, E>>,
    {
        if let Some(session) = self
            .entries
            .read()
            .await
            .cells
            .get(key)
            .and_then(|cell| cell.get().cloned())
        {
            return Ok(session);
        }

        let cell = {
            let mut entries = self.entries.write().await;
            match entries.cells.get(key) {
                Some(cell) => cell.clone(),
                None => {
                    let cell: Cell<T> = Arc::new(OnceCell::new());
                    entries.cells.insert(key.clone(), cell.clone());
                    entries.order.push_back(key.clone());
                    while entries.order.len() > self.capacity {
                        if let Some(oldest) = entries.order.pop_front() {
                            entries.cells.remove(&oldest);
                            info!(session = %oldest, "Evicted agent session");
                        }
                    }
                    cell
                }
            }
        };

        match cell.get_or_try_init(init).await {
            Ok(session) => Ok(session.clone()),
            Err(e) => {
                let mut entries = self.entries.write().await;
                if entries.cells.get(key).is_some_and(|c| Arc::ptr_eq(c, &cell)) {
                    entries.cells.remove(key);
                    entries.order.retain(|k| k != key);
                    debug!(session = %key, "Dropped failed session construction");
                }
                Err(e)
            }
        }
    }
}
