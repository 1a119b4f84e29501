use super::Mode;
use crate::{
    async_trait,
    stmt::{Document, Key},
    Result,
};

use std::fmt::Debug;

/// An open storage transaction.
///
/// Writes become visible to other transactions only once [`commit`] returns.
/// After `commit` or `abort`, every method fails.
///
/// [`commit`]: Transaction::commit
#[async_trait]
pub trait Transaction: Debug + Send + Sync {
    /// The collections this transaction was opened over.
    fn scope(&self) -> &[String];

    fn mode(&self) -> Mode;

    /// Insert a new document. Fails if the key is already taken.
    async fn add(&self, collection: &str, document: Document) -> Result<Key>;

    async fn get(&self, collection: &str, key: &Key) -> Result<Option<Document>>;

    /// Insert or replace a document.
    async fn put(&self, collection: &str, document: Document) -> Result<Key>;

    /// Remove a document. Removing a missing key is not an error.
    async fn delete(&self, collection: &str, key: &Key) -> Result<()>;

    /// Iterate a collection in key order.
    async fn cursor(&self, collection: &str) -> Result<Box<dyn Cursor + '_>>;

    async fn commit(&self) -> Result<()>;

    async fn abort(&self) -> Result<()>;
}

/// Yields documents one at a time. Dropping the cursor stops iteration.
#[async_trait]
pub trait Cursor: Send {
    async fn next(&mut self) -> Result<Option<Document>>;
}
