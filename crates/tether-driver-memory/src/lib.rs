mod transaction;
use transaction::MemoryTransaction;

use indexmap::IndexMap;
use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tether_core::{
    async_trait,
    driver::{Driver, Mode, Transaction},
    stmt::{Document, Key},
    Error, Result, Schema,
};

/// An in-process storage engine.
///
/// Collections are ordered maps from key to document. Read-write
/// transactions take a single writer lock for their whole lifetime and stage
/// their writes on a private copy of their scope, which is published on
/// commit. Read-only transactions work on a snapshot taken when they begin.
///
/// Clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryDriver {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    store: Mutex<IndexMap<String, Collection>>,
    writer: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Clone)]
struct Collection {
    /// Field holding each document's key
    key_field: String,
    documents: BTreeMap<Key, Document>,
}

impl MemoryDriver {
    pub fn new() -> MemoryDriver {
        MemoryDriver::default()
    }
}

impl Shared {
    fn store(&self) -> MutexGuard<'_, IndexMap<String, Collection>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy the named collections out of the store.
    fn snapshot(&self, collections: &[String]) -> Result<IndexMap<String, Collection>> {
        let store = self.store();

        collections
            .iter()
            .map(|name| match store.get(name) {
                Some(collection) => Ok((name.clone(), collection.clone())),
                None => Err(Error::storage(format!("unknown collection `{name}`"))),
            })
            .collect()
    }

    fn publish(&self, staged: IndexMap<String, Collection>) {
        let mut store = self.store();
        for (name, collection) in staged {
            store.insert(name, collection);
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    async fn register_schema(&mut self, schema: &Schema) -> Result<()> {
        let mut store = self.inner.store();

        for model in schema.models() {
            store
                .entry(model.name().to_string())
                .and_modify(|collection| {
                    collection.key_field = model.primary_key_name().to_string()
                })
                .or_insert_with(|| Collection {
                    key_field: model.primary_key_name().to_string(),
                    documents: BTreeMap::new(),
                });
        }

        Ok(())
    }

    async fn begin(&self, collections: &[String], mode: Mode) -> Result<Box<dyn Transaction>> {
        let writer = match mode {
            Mode::ReadWrite => Some(self.inner.writer.clone().lock_owned().await),
            Mode::ReadOnly => None,
        };

        let staged = self.inner.snapshot(collections)?;
        tracing::trace!(?collections, %mode, "memory transaction started");

        Ok(Box::new(MemoryTransaction::new(
            self.inner.clone(),
            collections.to_vec(),
            mode,
            staged,
            writer,
        )))
    }
}
