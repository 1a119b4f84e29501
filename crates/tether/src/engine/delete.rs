use super::{Engine, Tx};

use async_recursion::async_recursion;
use std::collections::HashSet;
use tether_core::{
    schema::OnDelete,
    stmt::{Document, Key, Value},
    Error, Result,
};

/// Documents whose delete is already underway in this walk.
///
/// Cascades over cyclic relation graphs come back around to documents that
/// are being deleted; those are skipped rather than visited twice.
#[derive(Debug, Default)]
pub(super) struct Deleting {
    visited: HashSet<(String, Key)>,
}

impl Deleting {
    /// Returns `false` if the document was already marked.
    pub(super) fn mark(&mut self, collection: &str, key: &Key) -> bool {
        self.visited.insert((collection.to_string(), key.clone()))
    }

    fn contains(&self, collection: &str, key: &Key) -> bool {
        self.visited.contains(&(collection.to_string(), key.clone()))
    }
}

/// Delete one document after applying the onDelete action of every
/// relation that points at it.
///
/// Returns the deleted document, or `None` if it did not exist or is
/// already being deleted further up the walk.
#[async_recursion]
pub(super) async fn delete(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    key: &Key,
    deleting: &mut Deleting,
) -> Result<Option<Document>> {
    if !deleting.mark(collection, key) {
        return Ok(None);
    }

    let Some(document) = tx.get(collection, key).await? else {
        return Ok(None);
    };

    let model = engine.schema.expect_model(collection)?;
    let mut actions = vec![];

    for (name, _) in model.relations() {
        let Some((mirror, mirror_relation)) = engine.schema.mirror_relation(collection, name) else {
            continue;
        };

        actions.push((name, mirror, mirror_relation.delete_action()));
    }

    // Restrict is checked for every relation before anything is written
    for (name, mirror, action) in &actions {
        if *action != OnDelete::Restrict {
            continue;
        }

        for target in document.get_or_null(name).keys() {
            if deleting.contains(&mirror.model, &target) {
                continue;
            }

            let Some(referencing) = tx.get(&mirror.model, &target).await? else {
                continue;
            };

            if referencing.get_or_null(&mirror.field).keys().contains(key) {
                tracing::debug!(
                    collection,
                    key = %key,
                    field = %name,
                    referenced_by = %mirror.model,
                    "delete restricted"
                );
                return Err(Error::delete_restricted(collection, key, name));
            }
        }
    }

    for (name, mirror, action) in actions {
        for target in document.get_or_null(name).keys() {
            match action {
                OnDelete::Cascade => {
                    tracing::trace!(
                        collection = %mirror.model,
                        key = %target,
                        from = collection,
                        "cascading delete"
                    );
                    delete(engine, tx, &mirror.model, &target, deleting).await?;
                }
                // The referencing side survives either way; only its
                // back-reference to this document goes.
                OnDelete::SetNull | OnDelete::None | OnDelete::Restrict => {
                    if deleting.contains(&mirror.model, &target) {
                        continue;
                    }
                    clear(tx, &mirror.model, &mirror.field, &target, key).await?;
                }
            }
        }
    }

    tx.delete(collection, key).await?;
    tracing::trace!(collection, key = %key, "deleted document");
    Ok(Some(document))
}

/// Remove `origin` from `collection[key].field`.
async fn clear(tx: &Tx, collection: &str, field: &str, key: &Key, origin: &Key) -> Result<()> {
    let Some(mut document) = tx.get(collection, key).await? else {
        return Ok(());
    };

    let value = match document.get_or_null(field) {
        Value::List(items) => Value::List(
            items
                .iter()
                .filter(|item| item.to_key().as_ref() != Some(origin))
                .cloned()
                .collect(),
        ),
        value if value.to_key().as_ref() == Some(origin) => Value::Null,
        _ => return Ok(()),
    };

    tracing::trace!(collection, key = %key, field, "clearing reference");
    document.insert(field, value);
    tx.put(collection, document).await?;
    Ok(())
}
