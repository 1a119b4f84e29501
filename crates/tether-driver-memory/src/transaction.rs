use super::{Collection, Shared};

use indexmap::IndexMap;
use std::{
    ops::Bound,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tether_core::{
    async_trait,
    driver::{Cursor, Mode, Transaction},
    stmt::{Document, Key},
    Error, Result,
};
use tokio::sync::OwnedMutexGuard;

#[derive(Debug)]
pub(crate) struct MemoryTransaction {
    shared: Arc<Shared>,
    scope: Vec<String>,
    mode: Mode,
    state: Mutex<State>,
}

#[derive(Debug)]
enum State {
    Active {
        /// Private copy of every collection in scope
        staged: IndexMap<String, Collection>,

        /// Held by read-write transactions until they finish
        writer: Option<OwnedMutexGuard<()>>,
    },
    Committed,
    Aborted,
}

/// Staged collections and the writer guard to drop once they are visible.
type Published = (IndexMap<String, Collection>, OwnedMutexGuard<()>);

/// Walks a collection in key order, one document per call.
///
/// Only the last key handed out is kept, so writes made through the same
/// transaction while the cursor is open show up if they sort after it.
struct MemoryCursor<'a> {
    tx: &'a MemoryTransaction,
    collection: String,
    last: Option<Key>,
}

impl MemoryTransaction {
    pub(crate) fn new(
        shared: Arc<Shared>,
        scope: Vec<String>,
        mode: Mode,
        staged: IndexMap<String, Collection>,
        writer: Option<OwnedMutexGuard<()>>,
    ) -> MemoryTransaction {
        MemoryTransaction {
            shared,
            scope,
            mode,
            state: Mutex::new(State::Active { staged, writer }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against a collection in scope.
    fn with_collection<R>(
        &self,
        name: &str,
        write: bool,
        f: impl FnOnce(&mut Collection) -> Result<R>,
    ) -> Result<R> {
        if write && self.mode == Mode::ReadOnly {
            return Err(Error::storage(format!(
                "cannot write to `{name}` in a readonly transaction"
            )));
        }

        let mut state = self.state();
        let staged = match &mut *state {
            State::Active { staged, .. } => staged,
            State::Committed => return Err(Error::storage("transaction already committed")),
            State::Aborted => return Err(Error::storage("transaction already aborted")),
        };

        match staged.get_mut(name) {
            Some(collection) => f(collection),
            None => Err(Error::storage(format!(
                "collection `{name}` is outside the transaction scope {:?}",
                self.scope
            ))),
        }
    }

    /// Move to a finished state, handing back the staged writes and the
    /// writer guard of a read-write transaction.
    fn finish(&self, next: State) -> Result<Option<Published>> {
        let mut state = self.state();

        match &*state {
            State::Active { .. } => {}
            State::Committed => return Err(Error::storage("transaction already committed")),
            State::Aborted => return Err(Error::storage("transaction already aborted")),
        }

        match std::mem::replace(&mut *state, next) {
            State::Active {
                staged,
                writer: Some(writer),
            } => Ok(Some((staged, writer))),
            _ => Ok(None),
        }
    }
}

impl Collection {
    fn key_of(&self, document: &Document) -> Result<Key> {
        document.key(&self.key_field).ok_or_else(|| {
            Error::storage(format!(
                "document has no usable key in field `{}`",
                self.key_field
            ))
        })
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    fn scope(&self) -> &[String] {
        &self.scope
    }

    fn mode(&self) -> Mode {
        self.mode
    }

    async fn add(&self, collection: &str, document: Document) -> Result<Key> {
        self.with_collection(collection, true, |collection| {
            let key = collection.key_of(&document)?;
            if collection.documents.contains_key(&key) {
                return Err(Error::storage(format!("key {key} already exists")));
            }
            collection.documents.insert(key.clone(), document);
            Ok(key)
        })
    }

    async fn get(&self, collection: &str, key: &Key) -> Result<Option<Document>> {
        self.with_collection(collection, false, |collection| {
            Ok(collection.documents.get(key).cloned())
        })
    }

    async fn put(&self, collection: &str, document: Document) -> Result<Key> {
        self.with_collection(collection, true, |collection| {
            let key = collection.key_of(&document)?;
            collection.documents.insert(key.clone(), document);
            Ok(key)
        })
    }

    async fn delete(&self, collection: &str, key: &Key) -> Result<()> {
        self.with_collection(collection, true, |collection| {
            collection.documents.remove(key);
            Ok(())
        })
    }

    async fn cursor(&self, collection: &str) -> Result<Box<dyn Cursor + '_>> {
        // Fail up front for collections outside the scope
        self.with_collection(collection, false, |_| Ok(()))?;

        Ok(Box::new(MemoryCursor {
            tx: self,
            collection: collection.to_string(),
            last: None,
        }))
    }

    async fn commit(&self) -> Result<()> {
        // The writer guard is released only after publishing.
        if let Some((staged, _writer)) = self.finish(State::Committed)? {
            self.shared.publish(staged);
        }
        tracing::trace!(scope = ?self.scope, "memory transaction committed");
        Ok(())
    }

    async fn abort(&self) -> Result<()> {
        self.finish(State::Aborted)?;
        tracing::trace!(scope = ?self.scope, "memory transaction aborted");
        Ok(())
    }
}

#[async_trait]
impl Cursor for MemoryCursor<'_> {
    async fn next(&mut self) -> Result<Option<Document>> {
        let start = match &self.last {
            Some(last) => Bound::Excluded(last.clone()),
            None => Bound::Unbounded,
        };

        let next = self.tx.with_collection(&self.collection, false, |collection| {
            Ok(collection
                .documents
                .range((start, Bound::Unbounded))
                .next()
                .map(|(key, document)| (key.clone(), document.clone())))
        })?;

        Ok(next.map(|(key, document)| {
            self.last = Some(key);
            document
        }))
    }
}
