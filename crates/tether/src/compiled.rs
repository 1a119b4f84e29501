use crate::engine::{Engine, Projector, Scope, Tx};

use std::sync::Arc;
use tether_core::{stmt::Document, Result};

/// A query whose transaction scope and projection were worked out once.
///
/// Running it behaves exactly like running the same [`Query`] through
/// [`Collection::find`], minus the per-call compilation.
///
/// [`Query`]: tether_core::stmt::Query
/// [`Collection::find`]: crate::Collection::find
#[derive(Debug, Clone)]
pub struct CompiledQuery {
    engine: Arc<Engine>,
    scope: Arc<Scope>,
    projector: Arc<Projector>,
    tx: Option<Arc<Tx>>,
}

impl CompiledQuery {
    pub(crate) fn new(
        engine: Arc<Engine>,
        scope: Scope,
        projector: Projector,
        tx: Option<Arc<Tx>>,
    ) -> CompiledQuery {
        CompiledQuery {
            engine,
            scope: Arc::new(scope),
            projector: Arc::new(projector),
            tx,
        }
    }

    pub async fn find(&self) -> Result<Vec<Document>> {
        self.engine
            .find(self.tx.as_ref(), &self.scope, &self.projector, false)
            .await
    }

    pub async fn find_first(&self) -> Result<Option<Document>> {
        let documents = self
            .engine
            .find(self.tx.as_ref(), &self.scope, &self.projector, true)
            .await?;
        Ok(documents.into_iter().next())
    }
}
