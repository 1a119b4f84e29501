use super::{Engine, Tx};

use async_recursion::async_recursion;
use indexmap::IndexSet;
use tether_core::{
    schema::{FieldTy, Relation},
    stmt::{Connection, Create, CreateField, Document, Key, Value},
    Error, Result,
};

/// The document a nested create hangs off.
#[derive(Debug, Clone)]
pub(super) struct Parent {
    /// Field on the new document that points back at the parent
    pub(super) field: String,
    pub(super) key: Key,
}

/// Insert one document and everything its payload connects or creates.
///
/// Properties are validated before any relation is touched, so the first
/// invalid property fails the insert without side effects. Relations are
/// then resolved in declaration order; the document itself is written last.
#[async_recursion]
pub(super) async fn insert(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    mut create: Create,
    parent: Option<Parent>,
) -> Result<Document> {
    let model = engine.schema.expect_model(collection)?;

    if let Some(unknown) = create.fields.keys().find(|name| model.field(name).is_none()) {
        return Err(Error::invalid_field(collection, unknown, "unknown field"));
    }

    let key = engine
        .resolve_key(tx, model, create.fields.get(model.primary_key_name()))
        .await?;

    let mut document = Document::new();
    let mut relations = vec![];

    for field in model.fields() {
        let name = field.name.as_str();

        match &field.ty {
            FieldTy::PrimaryKey(_) => {
                document.insert(name, &key);
            }
            FieldTy::Property(property) => {
                let value = match create.fields.shift_remove(name) {
                    Some(CreateField::Value(value)) => Some(value),
                    Some(CreateField::Relation(_)) => {
                        return Err(Error::invalid_field(
                            collection,
                            name,
                            "is a property and cannot take relation operations",
                        ))
                    }
                    None => None,
                };
                document.insert(name, property.resolve(collection, name, value)?);
            }
            FieldTy::Relation(relation) => {
                relations.push((name, relation, create.fields.shift_remove(name)));
            }
        }
    }

    for (name, relation, payload) in relations {
        let threaded = parent.as_ref().filter(|parent| parent.field == name);

        let value = match (threaded, payload) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_field(
                    collection,
                    name,
                    "is set by the enclosing create and cannot be given here",
                ))
            }
            (Some(parent), None) => {
                if relation.is_many() {
                    Value::List(vec![(&parent.key).into()])
                } else {
                    (&parent.key).into()
                }
            }
            (None, None) => relation.empty_value().ok_or_else(|| {
                Error::invalid_field(collection, name, "missing required relation")
            })?,
            (None, Some(CreateField::Value(_))) => {
                return Err(Error::invalid_field(
                    collection,
                    name,
                    "expected $connect or $create",
                ))
            }
            (None, Some(CreateField::Relation(connections))) => {
                connect(engine, tx, collection, name, relation, &key, connections).await?
            }
        };

        document.insert(name, value);
    }

    tracing::trace!(collection, key = %key, "adding document");
    tx.add(collection, document.clone()).await?;
    Ok(document)
}

/// Resolve a relation field's connections to the raw key value it stores.
async fn connect(
    engine: &Engine,
    tx: &Tx,
    collection: &str,
    field: &str,
    relation: &Relation,
    origin: &Key,
    connections: Vec<Connection>,
) -> Result<Value> {
    if !relation.is_many() && connections.len() > 1 {
        return Err(Error::invalid_field(
            collection,
            field,
            "a singular relation takes exactly one $connect or $create",
        ));
    }

    let mut keys = IndexSet::new();

    for connection in connections {
        let target = match connection {
            Connection::Connect(value) => {
                let target = engine.schema.target_key(relation, &value).ok_or_else(|| {
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

                if keys.contains(&target) {
                    return Err(Error::invalid_field(
                        collection,
                        field,
                        format!("duplicate $connect of {target}"),
                    ));
                }

                engine.attach(tx, collection, field, origin, &target).await?;
                target
            }
            Connection::Create(nested) => {
                let parent = engine
                    .schema
                    .mirror(collection, field)
                    .map(|mirror| Parent {
                        field: mirror.field.clone(),
                        key: origin.clone(),
                    });

                let target_model = engine.schema.expect_model(relation.target())?;
                let child = insert(engine, tx, relation.target(), nested, parent).await?;

                child.key(target_model.primary_key_name()).ok_or_else(|| {
                    Error::assertion(format!(
                        "created `{}` document has no primary key",
                        relation.target()
                    ))
                })?
            }
        };

        keys.insert(target);
    }

    Ok(if relation.is_many() {
        Value::List(keys.iter().map(Value::from).collect())
    } else {
        keys.first().map(Value::from).unwrap_or_default()
    })
}
