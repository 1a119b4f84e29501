//! Keeps the two sides of a bidirectional relation in agreement.
//!
//! Every helper here edits the *target* side: the document a relation field
//! points at, and the mirror field on it that points back.

use super::{Engine, Tx};

use tether_core::{
    stmt::{Key, Value},
    Error, Result,
};

/// Why a back-reference is being removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Unlink {
    /// The origin now points somewhere else.
    Repoint,

    /// The origin dropped the reference.
    Disconnect,

    /// The target is about to be deleted.
    Delete,
}

impl Engine {
    /// Point the target's mirror field back at `origin`.
    ///
    /// Fails if the target does not exist, or if its singular mirror already
    /// points at a different document.
    pub(super) async fn attach(
        &self,
        tx: &Tx,
        collection: &str,
        field: &str,
        origin: &Key,
        target: &Key,
    ) -> Result<()> {
        let model = self.schema.expect_model(collection)?;
        let relation = model
            .relation(field)
            .ok_or_else(|| Error::assertion(format!("`{collection}.{field}` is not a relation")))?;

        let Some(mut document) = tx.get(relation.target(), target).await? else {
            return Err(Error::document_not_found(relation.target(), target));
        };

        let Some((mirror, mirror_relation)) = self.schema.mirror_relation(collection, field) else {
            return Ok(());
        };

        let value = document.get_or_null(&mirror.field).clone();
        let updated = if mirror_relation.is_many() {
            if value.keys().contains(origin) {
                return Ok(());
            }

            let mut keys = value.as_list().map(<[Value]>::to_vec).unwrap_or_default();
            keys.push(origin.into());
            Value::List(keys)
        } else {
            match value.to_key() {
                None => origin.into(),
                Some(current) if current == *origin => return Ok(()),
                // A reference to a document that is gone counts as unset
                Some(current) if tx.get(collection, &current).await?.is_none() => origin.into(),
                Some(_) => {
                    return Err(Error::overwrite_relation(
                        &mirror.model,
                        target,
                        &mirror.field,
                    ))
                }
            }
        };

        tracing::trace!(
            collection = %mirror.model,
            key = %target,
            field = %mirror.field,
            "attaching back-reference"
        );

        document.insert(mirror.field.clone(), updated);
        tx.put(&mirror.model, document).await?;
        Ok(())
    }

    /// Remove `origin` from the target's mirror field.
    ///
    /// A missing target is skipped. Emptying a required singular mirror is
    /// refused unless the target is about to be deleted.
    pub(super) async fn detach(
        &self,
        tx: &Tx,
        collection: &str,
        field: &str,
        origin: &Key,
        target: &Key,
        reason: Unlink,
    ) -> Result<()> {
        let Some((mirror, mirror_relation)) = self.schema.mirror_relation(collection, field) else {
            return Ok(());
        };

        let Some(mut document) = tx.get(&mirror.model, target).await? else {
            return Ok(());
        };

        let value = document.get_or_null(&mirror.field).clone();
        let updated = if mirror_relation.is_many() {
            let Some(items) = value.as_list() else {
                return Ok(());
            };
            let keys: Vec<Value> = items
                .iter()
                .filter(|item| item.to_key().as_ref() != Some(origin))
                .cloned()
                .collect();

            if keys.len() == items.len() {
                return Ok(());
            }
            Value::List(keys)
        } else {
            if value.to_key().as_ref() != Some(origin) {
                return Ok(());
            }

            if !mirror_relation.is_nullable() && reason != Unlink::Delete {
                return Err(match reason {
                    Unlink::Repoint => {
                        Error::overwrite_relation(&mirror.model, target, &mirror.field)
                    }
                    _ => Error::invalid_field(
                        collection,
                        field,
                        format!(
                            "cannot disconnect: `{}.{}` on document {target} is required",
                            mirror.model, mirror.field
                        ),
                    ),
                });
            }
            Value::Null
        };

        tracing::trace!(
            collection = %mirror.model,
            key = %target,
            field = %mirror.field,
            "detaching back-reference"
        );

        document.insert(mirror.field.clone(), updated);
        tx.put(&mirror.model, document).await?;
        Ok(())
    }
}
