//! In-process resource store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::store::{QueryOutcome, Resource, ResourceStore, Statement, StoreError};

/// Rows kept in id order. Ids start at 1 and are never reused.
#[derive(Debug)]
pub struct MemoryStore {
    rows: RwLock<BTreeMap<u64, String>>,
    next_id: AtomicU64,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Simulate losing (or regaining) the backing database.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store marked unavailable".into()))
        }
    }

    fn poisoned() -> StoreError {
        StoreError::Query("row lock poisoned".into())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_available()
    }

    async fn execute(&self, statement: Statement) -> Result<QueryOutcome, StoreError> {
        self.ensure_available()?;

        match statement {
            Statement::Insert { text } => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                self.rows.write().map_err(|_| Self::poisoned())?.insert(id, text);
                Ok(QueryOutcome::Inserted { id })
            }
            Statement::SelectAll => {
                let rows = self.rows.read().map_err(|_| Self::poisoned())?;
                Ok(QueryOutcome::Rows(
                    rows.iter()
                        .map(|(id, text)| Resource {
                            id: *id,
                            text: text.clone(),
                        })
                        .collect(),
                ))
            }
            Statement::Update { id, text } => {
                let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
                match rows.get_mut(&id) {
                    Some(existing) => {
                        *existing = text;
                        Ok(QueryOutcome::Affected(1))
                    }
                    None => Ok(QueryOutcome::Affected(0)),
                }
            }
            Statement::Delete { id } => {
                let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
                Ok(QueryOutcome::Affected(u64::from(rows.remove(&id).is_some())))
            }
        }
    }
}
