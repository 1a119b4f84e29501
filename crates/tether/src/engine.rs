mod delete;
mod insert;
mod key;
mod link;
mod project;
pub(crate) use project::Projector;

mod scope;
pub(crate) use scope::Scope;

mod tx;
pub(crate) use tx::{Tx, TxRef};

mod update;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tether_core::{
    driver::{Driver, Mode},
    stmt::{Create, Document, Filter, Key, Update},
    Error, Result, Schema,
};

/// Executes statements against a driver.
///
/// Owns the per-client caches: auto-increment counters live here, keyed by
/// collection, and are dropped by [`Engine::invalidate_caches`].
#[derive(Debug)]
pub(crate) struct Engine {
    pub(crate) schema: Arc<Schema>,
    pub(crate) driver: Arc<dyn Driver>,
    counters: Mutex<HashMap<String, i64>>,
}

/// Which documents a statement applies to.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    Key(Key),
    First(Filter),
    All(Filter),
}

impl Engine {
    pub(crate) fn new(schema: Arc<Schema>, driver: Arc<dyn Driver>) -> Engine {
        Engine {
            schema,
            driver,
            counters: Mutex::new(HashMap::new()),
        }
    }

    /// Use the threaded transaction, or open one for this operation.
    pub(crate) async fn open(
        &self,
        threaded: Option<&Arc<Tx>>,
        scope: &Scope,
        mode: Mode,
    ) -> Result<TxRef> {
        let Some(tx) = threaded else {
            return Ok(TxRef::Owned(Tx::begin(&*self.driver, scope, mode).await?));
        };

        tx.check_active()?;

        let tx = TxRef::Shared(tx.clone());
        match tx.covers(scope, mode) {
            Ok(()) => Ok(tx),
            Err(err) => tx.finish(Err(err)).await,
        }
    }

    /// Pass through the outcome of a step that runs before [`Engine::open`].
    ///
    /// A failure aborts the threaded transaction, same as a failure inside it.
    pub(crate) async fn prepare<T>(
        &self,
        threaded: Option<&Arc<Tx>>,
        res: Result<T>,
    ) -> Result<T> {
        match (res, threaded) {
            (Ok(value), _) => Ok(value),
            (Err(err), Some(tx)) if tx.is_active() => {
                TxRef::Shared(tx.clone()).finish(Err(err)).await
            }
            (Err(err), _) => Err(err),
        }
    }

    pub(crate) async fn add(
        &self,
        threaded: Option<&Arc<Tx>>,
        collection: &str,
        creates: Vec<Create>,
    ) -> Result<Vec<Document>> {
        let scope = self.add_scope(collection, &creates);
        let scope = self.prepare(threaded, scope).await?;

        let tx = self.open(threaded, &scope, Mode::ReadWrite).await?;
        let res = self.exec_add(&tx, collection, creates).await;
        tx.finish(res).await
    }

    pub(crate) async fn get(
        &self,
        threaded: Option<&Arc<Tx>>,
        collection: &str,
        key: &Key,
    ) -> Result<Option<Document>> {
        let scope = self
            .prepare(threaded, Scope::single(&self.schema, collection))
            .await?;
        let tx = self.open(threaded, &scope, Mode::ReadOnly).await?;
        let res = tx.get(collection, key).await;
        tx.finish(res).await
    }

    pub(crate) async fn find(
        &self,
        threaded: Option<&Arc<Tx>>,
        scope: &Scope,
        projector: &Projector,
        first: bool,
    ) -> Result<Vec<Document>> {
        let tx = self.open(threaded, scope, Mode::ReadOnly).await?;
        let res = projector.find(&tx, first).await;
        tx.finish(res).await
    }

    pub(crate) async fn update(
        &self,
        threaded: Option<&Arc<Tx>>,
        collection: &str,
        target: Target,
        update: Update,
    ) -> Result<Vec<Document>> {
        let scope = self
            .prepare(threaded, Scope::for_update(&self.schema, collection, &update))
            .await?;
        let tx = self.open(threaded, &scope, Mode::ReadWrite).await?;
        let res = self.exec_update(&tx, collection, target, &update).await;
        tx.finish(res).await
    }

    pub(crate) async fn delete(
        &self,
        threaded: Option<&Arc<Tx>>,
        collection: &str,
        target: Target,
    ) -> Result<Vec<Document>> {
        let scope = self
            .prepare(threaded, Scope::for_delete(&self.schema, collection))
            .await?;
        let tx = self.open(threaded, &scope, Mode::ReadWrite).await?;
        let res = self.exec_delete(&tx, collection, target).await;
        tx.finish(res).await
    }

    fn add_scope(&self, collection: &str, creates: &[Create]) -> Result<Scope> {
        let mut scope = Scope::single(&self.schema, collection)?;
        for create in creates {
            scope.extend(&Scope::for_create(&self.schema, collection, create)?);
        }
        Ok(scope)
    }

    async fn exec_add(
        &self,
        tx: &Tx,
        collection: &str,
        creates: Vec<Create>,
    ) -> Result<Vec<Document>> {
        let mut documents = Vec::with_capacity(creates.len());
        for create in creates {
            documents.push(insert::insert(self, tx, collection, create, None).await?);
        }
        Ok(documents)
    }

    async fn exec_update(
        &self,
        tx: &Tx,
        collection: &str,
        target: Target,
        update: &Update,
    ) -> Result<Vec<Document>> {
        update::check(&self.schema, collection, update)?;

        let keys = match target {
            Target::Key(key) => {
                let matches = tx
                    .get(collection, &key)
                    .await?
                    .is_some_and(|document| update.filter.eval(&document));

                if !matches {
                    return Err(Error::document_not_found(collection, &key));
                }
                vec![key]
            }
            Target::First(filter) => self.matching(tx, collection, &filter, true).await?,
            Target::All(filter) => self.matching(tx, collection, &filter, false).await?,
        };

        let mut documents = Vec::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            // An earlier update in this batch may have cascaded into a later match
            if i > 0 && tx.get(collection, key).await?.is_none() {
                tracing::trace!(collection, key = %key, "matched document is gone, skipping");
                continue;
            }
            documents.push(update::apply(self, tx, collection, key, update).await?);
        }
        Ok(documents)
    }

    async fn exec_delete(
        &self,
        tx: &Tx,
        collection: &str,
        target: Target,
    ) -> Result<Vec<Document>> {
        let keys = match target {
            Target::Key(key) => vec![key],
            Target::First(filter) => self.matching(tx, collection, &filter, true).await?,
            Target::All(filter) => self.matching(tx, collection, &filter, false).await?,
        };

        let mut deleting = delete::Deleting::default();
        let mut documents = vec![];
        for key in keys {
            if let Some(document) = delete::delete(self, tx, collection, &key, &mut deleting).await?
            {
                documents.push(document);
            }
        }
        Ok(documents)
    }

    /// Keys of the documents matching `filter`, in cursor order.
    async fn matching(
        &self,
        tx: &Tx,
        collection: &str,
        filter: &Filter,
        first: bool,
    ) -> Result<Vec<Key>> {
        let model = self.schema.expect_model(collection)?;
        let mut cursor = tx.cursor(collection).await?;
        let mut keys = vec![];

        while let Some(document) = cursor.next().await? {
            if !filter.eval(&document) {
                continue;
            }

            let Some(key) = document.key(model.primary_key_name()) else {
                return Err(Error::assertion(format!(
                    "document in `{collection}` has no primary key"
                )));
            };
            keys.push(key);

            if first {
                break;
            }
        }

        Ok(keys)
    }

    pub(crate) fn invalidate_caches(&self) {
        self.counters
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clear();
        tracing::debug!("auto-increment counters invalidated");
    }
}
