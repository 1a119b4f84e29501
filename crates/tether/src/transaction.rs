use crate::{
    engine::{Engine, Scope, Tx},
    Collection,
};

use std::sync::Arc;
use tether_core::{driver::Mode, Result};

/// A transaction opened by the caller and threaded through any number of
/// operations.
///
/// Operations run through [`Transaction::collection`] share this
/// transaction and never commit it. Dropping the handle without calling
/// [`Transaction::commit`] discards the writes.
#[derive(Debug)]
pub struct Transaction {
    engine: Arc<Engine>,
    tx: Arc<Tx>,
}

impl Transaction {
    pub(crate) async fn begin(
        engine: Arc<Engine>,
        collections: &[&str],
        mode: Mode,
    ) -> Result<Transaction> {
        let mut scope = Scope::default();
        for name in collections {
            scope.extend(&Scope::single(&engine.schema, name)?);
        }

        let tx = Tx::begin(&*engine.driver, &scope, mode).await?;

        Ok(Transaction {
            engine,
            tx: Arc::new(tx),
        })
    }

    /// Operations on one collection, run inside this transaction.
    pub fn collection(&self, name: &str) -> Collection {
        Collection::new(self.engine.clone(), name, Some(self.tx.clone()))
    }

    /// False once the transaction was committed, aborted, or aborted by a
    /// failing operation.
    pub fn is_active(&self) -> bool {
        self.tx.is_active()
    }

    pub async fn commit(self) -> Result<()> {
        self.tx.commit().await
    }

    pub async fn abort(self) -> Result<()> {
        self.tx.abort().await
    }
}
