use crate::{
    compiled::CompiledQuery,
    engine::{Engine, Projector, Scope, Target, Tx},
    export,
};

use std::sync::Arc;
use tether_core::{
    stmt::{Create, Document, Filter, Key, Query, Update},
    Error, Result,
};

/// Operations on one collection.
///
/// Obtained from [`Client::collection`](crate::Client::collection), where
/// every call runs in a transaction of its own, or from
/// [`Transaction::collection`](crate::Transaction::collection), where calls
/// share the caller's transaction.
#[derive(Debug, Clone)]
pub struct Collection {
    engine: Arc<Engine>,
    name: String,
    tx: Option<Arc<Tx>>,
}

impl Collection {
    pub(crate) fn new(engine: Arc<Engine>, name: &str, tx: Option<Arc<Tx>>) -> Collection {
        Collection {
            engine,
            name: name.to_string(),
            tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert one document, along with everything it connects or creates.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn add(&self, create: Create) -> Result<Document> {
        let mut documents = self
            .engine
            .add(self.tx.as_ref(), &self.name, vec![create])
            .await?;

        documents
            .pop()
            .ok_or_else(|| Error::assertion("insert returned no document"))
    }

    /// Insert several documents in one transaction.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn add_many(&self, creates: Vec<Create>) -> Result<Vec<Document>> {
        self.engine.add(self.tx.as_ref(), &self.name, creates).await
    }

    /// The stored document with the given key.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn get(&self, key: impl Into<Key>) -> Result<Option<Document>> {
        self.engine
            .get(self.tx.as_ref(), &self.name, &key.into())
            .await
    }

    /// Every document matching the query, in key order.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn find(&self, query: Query) -> Result<Vec<Document>> {
        let (scope, projector) = self.compile(&query).await?;
        self.engine
            .find(self.tx.as_ref(), &scope, &projector, false)
            .await
    }

    /// The first document matching the query.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn find_first(&self, query: Query) -> Result<Option<Document>> {
        let (scope, projector) = self.compile(&query).await?;
        let documents = self
            .engine
            .find(self.tx.as_ref(), &scope, &projector, true)
            .await?;
        Ok(documents.into_iter().next())
    }

    /// Update the document with the given key.
    ///
    /// Fails with a not-found error if the document does not exist or does
    /// not pass the update's filter.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn update(&self, key: impl Into<Key>, update: Update) -> Result<Document> {
        let mut documents = self
            .engine
            .update(self.tx.as_ref(), &self.name, Target::Key(key.into()), update)
            .await?;

        documents
            .pop()
            .ok_or_else(|| Error::assertion("update returned no document"))
    }

    /// Update the first document passing the update's filter.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn update_first(&self, update: Update) -> Result<Option<Document>> {
        let target = Target::First(update.filter.clone());
        let documents = self
            .engine
            .update(self.tx.as_ref(), &self.name, target, update)
            .await?;
        Ok(documents.into_iter().next())
    }

    /// Update every document passing the update's filter.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn update_many(&self, update: Update) -> Result<Vec<Document>> {
        let target = Target::All(update.filter.clone());
        self.engine
            .update(self.tx.as_ref(), &self.name, target, update)
            .await
    }

    /// Delete the document with the given key, applying onDelete actions.
    /// Returns the deleted document, or `None` if there was none.
    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn delete(&self, key: impl Into<Key>) -> Result<Option<Document>> {
        let documents = self
            .engine
            .delete(self.tx.as_ref(), &self.name, Target::Key(key.into()))
            .await?;
        Ok(documents.into_iter().next())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn delete_first(&self, filter: Filter) -> Result<Option<Document>> {
        let documents = self
            .engine
            .delete(self.tx.as_ref(), &self.name, Target::First(filter))
            .await?;
        Ok(documents.into_iter().next())
    }

    #[tracing::instrument(level = "debug", skip_all, fields(collection = %self.name))]
    pub async fn delete_many(&self, filter: Filter) -> Result<Vec<Document>> {
        self.engine
            .delete(self.tx.as_ref(), &self.name, Target::All(filter))
            .await
    }

    /// Validate a query shape once so it can be run repeatedly.
    pub async fn compile_query(&self, query: Query) -> Result<CompiledQuery> {
        let (scope, projector) = self.compile(&query).await?;
        Ok(CompiledQuery::new(
            self.engine.clone(),
            scope,
            projector,
            self.tx.clone(),
        ))
    }

    /// This collection's documents in export form.
    pub async fn dump(&self) -> Result<serde_json::Value> {
        let mut export = export::export(&self.engine, self.tx.as_ref(), Some(&self.name)).await?;
        Ok(export
            .get_mut(&self.name)
            .map(serde_json::Value::take)
            .unwrap_or_default())
    }

    /// Work out the scope and projection of a query. An invalid query
    /// aborts the threaded transaction like any other failed operation.
    async fn compile(&self, query: &Query) -> Result<(Scope, Projector)> {
        let schema = &self.engine.schema;
        let res = Scope::for_query(schema, &self.name, query).and_then(|scope| {
            Ok((scope, Projector::compile(schema, &self.name, query)?))
        });
        self.engine.prepare(self.tx.as_ref(), res).await
    }
}
