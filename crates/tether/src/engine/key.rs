use super::{Engine, Tx};

use std::sync::PoisonError;
use tether_core::{
    schema::{KeyStrategy, Model},
    stmt::{CreateField, Key},
    Error, Result,
};

impl Engine {
    /// Resolve the primary key of a new document.
    ///
    /// Generated and auto-incremented keys must not appear in the payload;
    /// supplied keys must.
    pub(super) async fn resolve_key(
        &self,
        tx: &Tx,
        model: &Model,
        supplied: Option<&CreateField>,
    ) -> Result<Key> {
        let collection = model.name();
        let field = model.primary_key_name();
        let primary_key = model.primary_key();

        let key = match (primary_key.strategy(), supplied) {
            (KeyStrategy::Supplied, Some(CreateField::Value(value))) => primary_key
                .key_of(value)
                .ok_or_else(|| {
                    Error::invalid_field(
                        collection,
                        field,
                        format!("expected a {} key, got {}", primary_key.ty(), value.type_name()),
                    )
                })?,
            (KeyStrategy::Supplied, _) => {
                return Err(Error::invalid_field(
                    collection,
                    field,
                    "primary key must be supplied",
                ))
            }
            (_, Some(_)) => {
                return Err(Error::invalid_field(
                    collection,
                    field,
                    "primary key is generated and cannot be supplied",
                ))
            }
            (KeyStrategy::Generate(generate), None) => {
                let key = generate();
                if !primary_key.ty().accepts(&key) {
                    return Err(Error::assertion(format!(
                        "key generator for `{collection}` produced {key}, expected a {} key",
                        primary_key.ty()
                    )));
                }
                key
            }
            (KeyStrategy::AutoIncrement, None) => Key::Int(self.next_id(tx, model).await?),
        };

        Ok(key)
    }

    /// The next auto-increment id for a collection.
    ///
    /// The counter is seeded from the largest integer key on first use and
    /// then kept in memory. Writers that bypass this client are not seen
    /// until [`Engine::invalidate_caches`] is called.
    async fn next_id(&self, tx: &Tx, model: &Model) -> Result<i64> {
        let collection = model.name();

        let cached = self
            .counters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .copied();

        let current = match cached {
            Some(current) => current,
            None => {
                let seed = self.max_id(tx, model).await?;
                tracing::trace!(collection, seed, "seeded auto-increment counter");
                seed
            }
        };

        let mut counters = self.counters.lock().unwrap_or_else(PoisonError::into_inner);
        let counter = counters.entry(collection.to_string()).or_insert(current);
        *counter = counter.checked_add(1).ok_or_else(|| {
            Error::invalid_field(
                collection,
                model.primary_key_name(),
                "auto-increment keys are exhausted",
            )
        })?;
        Ok(*counter)
    }

    async fn max_id(&self, tx: &Tx, model: &Model) -> Result<i64> {
        let mut cursor = tx.cursor(model.name()).await?;
        let mut max = 0;

        while let Some(document) = cursor.next().await? {
            if let Some(Key::Int(id)) = document.key(model.primary_key_name()) {
                max = max.max(id);
            }
        }

        Ok(max)
    }
}
