mod builder;
pub use builder::Builder;

use crate::{engine::Engine, export, Collection, Transaction};

use std::sync::Arc;
use tether_core::{driver::Mode, Error, Result, Schema};

/// Entry point for reading and writing documents.
///
/// Cloning is cheap; clones share the driver and the auto-increment
/// counters.
#[derive(Debug, Clone)]
pub struct Client {
    pub(crate) engine: Arc<Engine>,
}

impl Client {
    pub fn builder(schema: Schema) -> Builder {
        Builder::new(schema)
    }

    pub fn schema(&self) -> &Schema {
        &self.engine.schema
    }

    /// A handle for operations on one collection. Each operation runs in its
    /// own transaction.
    ///
    /// Unknown collection names are reported by the first operation.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.engine.clone(), name, None)
    }

    /// Open a transaction that operations can be threaded through.
    ///
    /// Every operation run on the returned handle must fit inside
    /// `collections` and `mode`. The first failing operation aborts the
    /// whole transaction.
    pub async fn transaction(&self, collections: &[&str], mode: Mode) -> Result<Transaction> {
        Transaction::begin(self.engine.clone(), collections, mode).await
    }

    /// Drop the cached auto-increment counters.
    ///
    /// Call this after another process, or an import, wrote keys this client
    /// did not allocate.
    pub fn invalidate_caches(&self) {
        self.engine.invalidate_caches();
    }

    /// Every document of every collection as JSON, relations written as
    /// pointers.
    pub async fn export(&self) -> Result<serde_json::Value> {
        export::export(&self.engine, None, None).await
    }

    /// Write the documents of an export back, replacing documents with the
    /// same keys.
    pub async fn import(&self, json: &serde_json::Value) -> Result<()> {
        let Some(collections) = json.as_object() else {
            return Err(Error::invalid_config("import expects a JSON object of collections"));
        };
        export::import(&self.engine, collections).await
    }
}
