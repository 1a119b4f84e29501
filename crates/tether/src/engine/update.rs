use super::{
    delete::{self, Deleting},
    insert::{self, Parent},
    link::Unlink,
    Engine, Tx,
};

use async_recursion::async_recursion;
use tether_core::{
    schema::{FieldTy, Relation},
    stmt::{Document, Key, RelationOp, Update, UpdateField, Value},
    Error, Result, Schema,
};

/// Reject malformed update payloads before anything is read or written.
pub(super) fn check(schema: &Schema, collection: &str, update: &Update) -> Result<()> {
    let model = schema.expect_model(collection)?;

    for (name, field) in &update.fields {
        let Some(declared) = model.field(name) else {
            return Err(Error::invalid_field(collection, name, "unknown field"));
        };

        match (&declared.ty, field) {
            (FieldTy::PrimaryKey(_), _) => {
                return Err(Error::invalid_field(
                    collection,
                    name,
                    "primary key cannot be updated",
                ))
            }
            (FieldTy::Property(_), UpdateField::Set(_) | UpdateField::Apply(_)) => {}
            (FieldTy::Property(_), UpdateField::Relation(_)) => {
                return Err(Error::invalid_field(
                    collection,
                    name,
                    "is a property and cannot take relation operations",
                ))
            }
            (FieldTy::Relation(_), UpdateField::Set(_) | UpdateField::Apply(_)) => {
                return Err(Error::invalid_field(
                    collection,
                    name,
                    "is a relation; use $connect, $create, $update, $delete or $disconnect",
                ))
            }
            (FieldTy::Relation(relation), UpdateField::Relation(ops)) => {
                for op in ops {
                    check_op(schema, collection, name, relation, op)?;
                }
            }
        }
    }

    Ok(())
}

fn check_op(
    schema: &Schema,
    collection: &str,
    field: &str,
    relation: &Relation,
    op: &RelationOp,
) -> Result<()> {
    let invalid = |message: String| Err(Error::invalid_field(collection, field, message));

    if op.requires_nullable() && !relation.is_nullable() {
        return invalid(format!(
            "{} is only allowed on optional or array relations",
            op.name()
        ));
    }

    match op {
        RelationOp::Delete(key) | RelationOp::Disconnect(key) => {
            match (relation.is_many(), key) {
                (true, None) => invalid(format!("{} on an array relation needs a key", op.name())),
                (false, Some(_)) => invalid(format!(
                    "{} on a singular relation takes no key",
                    op.name()
                )),
                _ => Ok(()),
            }
        }
        RelationOp::DeleteAll | RelationOp::DisconnectAll if !relation.is_many() => {
            invalid(format!("{} is only allowed on array relations", op.name()))
        }
        RelationOp::Update(nested) => check(schema, relation.target(), nested),
        _ => Ok(()),
    }
}

/// Apply an update to one document and return the stored result.
#[async_recursion]
pub(super) async fn apply(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    key: &Key,
    update: &Update,
) -> Result<Document> {
    let model = engine.schema.expect_model(collection)?;
    let mut document = load(tx, collection, key).await?;

    // Properties first, in one write
    let mut changed = false;
    for (name, field) in &update.fields {
        let Some(property) = model.field(name).and_then(|field| field.as_property()) else {
            continue;
        };

        let value = match field {
            UpdateField::Set(value) => value.clone(),
            UpdateField::Apply(f) => f(document.get_or_null(name)),
            UpdateField::Relation(_) => continue,
        };

        document.insert(name.clone(), property.validate(collection, name, value)?);
        changed = true;
    }

    if changed {
        tx.put(collection, document).await?;
    }

    for (name, field) in &update.fields {
        let (Some(relation), UpdateField::Relation(ops)) = (model.relation(name), field) else {
            continue;
        };

        for op in ops {
            apply_op(engine, tx, collection, key, name, relation, op).await?;
        }
    }

    // Relation work may have touched this document through a mirror, or
    // cascaded into deleting it.
    match tx.get(collection, key).await? {
        Some(document) => Ok(document),
        None => Err(Error::document_not_found(collection, key)),
    }
}

async fn apply_op(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    key: &Key,
    field: &str,
    relation: &Relation,
    op: &RelationOp,
) -> Result<()> {
    let current = load(tx, collection, key).await?.get_or_null(field).clone();

    match op {
        RelationOp::Connect(value) => {
            let target = engine.schema.target_key(relation, value).ok_or_else(|| {
                Error::invalid_field(
                    collection,
                    field,
                    format!(
                        "expected a key of `{}`, got {}",
                        relation.target(),
                        value.type_name()
                    ),
                )
            })?;

            if current.keys().contains(&target) {
                return Ok(());
            }

            if !relation.is_many() {
                if let Some(previous) = current.to_key() {
                    engine
                        .detach(tx, collection, field, key, &previous, Unlink::Repoint)
                        .await?;
                }
            }

            engine.attach(tx, collection, field, key, &target).await?;
            push(tx, collection, key, field, relation, &target).await
        }
        RelationOp::Create(nested) => {
            let parent = engine.schema.mirror(collection, field).map(|mirror| Parent {
                field: mirror.field.clone(),
                key: key.clone(),
            });

            if !relation.is_many() {
                if let Some(previous) = current.to_key() {
                    engine
                        .detach(tx, collection, field, key, &previous, Unlink::Repoint)
                        .await?;
                }
            }

            let target_model = engine.schema.expect_model(relation.target())?;
            let child = insert::insert(engine, tx, relation.target(), nested.clone(), parent).await?;
            let target = child.key(target_model.primary_key_name()).ok_or_else(|| {
                Error::assertion(format!(
                    "created `{}` document has no primary key",
                    relation.target()
                ))
            })?;

            push(tx, collection, key, field, relation, &target).await
        }
        RelationOp::Update(nested) => {
            for target in current.keys() {
                let Some(document) = tx.get(relation.target(), &target).await? else {
                    continue;
                };

                if nested.filter.eval(&document) {
                    apply(engine, tx, relation.target(), &target, nested).await?;
                }
            }
            Ok(())
        }
        RelationOp::Delete(target) => {
            let target = match (target, current.to_key()) {
                (Some(value), _) => connected(engine, collection, field, relation, &current, value)?,
                (None, Some(target)) => target,
                (None, None) => return Ok(()),
            };
            delete_target(engine, tx, collection, key, field, relation, &target).await
        }
        RelationOp::DeleteAll => {
            for target in current.keys() {
                delete_target(engine, tx, collection, key, field, relation, &target).await?;
            }
            Ok(())
        }
        RelationOp::Disconnect(target) => {
            let target = match (target, current.to_key()) {
                (Some(value), _) => match engine.schema.target_key(relation, value) {
                    Some(target) if current.keys().contains(&target) => target,
                    _ => return Ok(()),
                },
                (None, Some(target)) => target,
                (None, None) => return Ok(()),
            };
            disconnect(engine, tx, collection, key, field, relation, &target, Unlink::Disconnect)
                .await
        }
        RelationOp::DisconnectAll => {
            for target in current.keys() {
                disconnect(engine, tx, collection, key, field, relation, &target, Unlink::Disconnect)
                    .await?;
            }
            Ok(())
        }
    }
}

/// The key `value` names, which must currently be linked.
fn connected(
    engine: &Engine,
    collection: &str,
    field: &str,
    relation: &Relation,
    current: &Value,
    value: &Value,
) -> Result<Key> {
    match engine.schema.target_key(relation, value) {
        Some(target) if current.keys().contains(&target) => Ok(target),
        Some(target) => Err(Error::document_not_found(relation.target(), &target)),
        None => Err(Error::invalid_field(
            collection,
            field,
            format!("expected a key of `{}`", relation.target()),
        )),
    }
}

async fn delete_target(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    key: &Key,
    field: &str,
    relation: &Relation,
    target: &Key,
) -> Result<()> {
    disconnect(engine, tx, collection, key, field, relation, target, Unlink::Delete).await?;

    let mut deleting = Deleting::default();
    deleting.mark(collection, key);
    delete::delete(engine, tx, relation.target(), target, &mut deleting).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn disconnect(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    key: &Key,
    field: &str,
    relation: &Relation,
    target: &Key,
    reason: Unlink,
) -> Result<()> {
    engine
        .detach(tx, collection, field, key, target, reason)
        .await?;

    let mut document = load(tx, collection, key).await?;
    let value = if relation.is_many() {
        let keys = document
            .get_or_null(field)
            .as_list()
            .unwrap_or_default()
            .iter()
            .filter(|item| item.to_key().as_ref() != Some(target))
            .cloned()
            .collect();
        Value::List(keys)
    } else {
        Value::Null
    };

    document.insert(field, value);
    tx.put(collection, document).await?;
    Ok(())
}

/// Record `target` in the origin's own relation field.
async fn push(
    tx: &Tx,
    collection: &str,
    key: &Key,
    field: &str,
    relation: &Relation,
    target: &Key,
) -> Result<()> {
    let mut document = load(tx, collection, key).await?;

    let value = if relation.is_many() {
        let mut items = document
            .get_or_null(field)
            .as_list()
            .map(<[Value]>::to_vec)
            .unwrap_or_default();
        if !items.iter().any(|item| item.to_key().as_ref() == Some(target)) {
            items.push(target.into());
        }
        Value::List(items)
    } else {
        target.into()
    };

    document.insert(field, value);
    tx.put(collection, document).await?;
    Ok(())
}

async fn load(tx: &Tx, collection: &str, key: &Key) -> Result<Document> {
    tx.get(collection, key)
        .await?
        .ok_or_else(|| Error::document_not_found(collection, key))
}
