//! Portable JSON dumps of stored documents.
//!
//! Relation values are written as pointers of the form
//! `/<collection>/<key>`, with `~` and `/` inside a segment escaped as `~0`
//! and `~1`. Everything else goes through the property's type.

use crate::engine::{Engine, Scope, Tx};

use serde_json::{Map, Value as Json};
use std::sync::Arc;
use tether_core::{
    driver::Mode,
    schema::{FieldTy, Model, Relation},
    stmt::{Document, Key, Value},
    Error, Result,
};

pub(crate) async fn export(
    engine: &Engine,
    threaded: Option<&Arc<Tx>>,
    only: Option<&str>,
) -> Result<Json> {
    let scope = match only {
        Some(collection) => {
            engine
                .prepare(threaded, Scope::single(&engine.schema, collection))
                .await?
        }
        None => Scope::all(&engine.schema),
    };

    let tx = engine.open(threaded, &scope, Mode::ReadOnly).await?;
    let res = exec_export(engine, &tx, &scope).await;
    tx.finish(res).await
}

async fn exec_export(engine: &Engine, tx: &Tx, scope: &Scope) -> Result<Json> {
    let mut out = Map::new();

    for collection in scope.iter() {
        let model = engine.schema.expect_model(collection)?;
        let mut cursor = tx.cursor(collection).await?;
        let mut documents = vec![];

        while let Some(document) = cursor.next().await? {
            documents.push(Json::Object(serialize(model, &document)));
        }

        tracing::trace!(collection, count = documents.len(), "exported collection");
        out.insert(collection.to_string(), Json::Array(documents));
    }

    Ok(Json::Object(out))
}

fn serialize(model: &Model, document: &Document) -> Map<String, Json> {
    model
        .fields()
        .map(|field| {
            let value = document.get_or_null(&field.name);
            let json = match &field.ty {
                FieldTy::PrimaryKey(_) => value.to_json(),
                FieldTy::Property(property) => property.serialize(value),
                FieldTy::Relation(relation) if relation.is_many() => Json::Array(
                    value
                        .keys()
                        .iter()
                        .map(|key| Json::String(pointer(relation.target(), key)))
                        .collect(),
                ),
                FieldTy::Relation(relation) => match value.to_key() {
                    Some(key) => Json::String(pointer(relation.target(), &key)),
                    None => Json::Null,
                },
            };
            (field.name.clone(), json)
        })
        .collect()
}

pub(crate) async fn import(engine: &Engine, collections: &Map<String, Json>) -> Result<()> {
    let mut scope = Scope::default();
    for name in collections.keys() {
        scope.extend(&Scope::single(&engine.schema, name)?);
    }

    let tx = engine.open(None, &scope, Mode::ReadWrite).await?;
    let res = exec_import(engine, &tx, collections).await;
    tx.finish(res).await?;

    engine.invalidate_caches();
    Ok(())
}

async fn exec_import(engine: &Engine, tx: &Tx, collections: &Map<String, Json>) -> Result<()> {
    for (collection, documents) in collections {
        let model = engine.schema.expect_model(collection)?;
        let Some(documents) = documents.as_array() else {
            return Err(Error::invalid_item(
                collection,
                "expected an array of documents",
            ));
        };

        for json in documents {
            let document = deserialize(engine, model, json)?;
            tx.put(collection, document).await?;
        }

        tracing::trace!(collection, count = documents.len(), "imported collection");
    }

    Ok(())
}

fn deserialize(engine: &Engine, model: &Model, json: &Json) -> Result<Document> {
    let collection = model.name();
    let Some(fields) = json.as_object() else {
        return Err(Error::invalid_item(collection, "expected a document object"));
    };

    if let Some(unknown) = fields.keys().find(|name| model.field(name).is_none()) {
        return Err(Error::invalid_field(collection, unknown, "unknown field"));
    }

    let mut document = Document::new();

    for field in model.fields() {
        let name = field.name.as_str();
        let json = fields.get(name).unwrap_or(&Json::Null);

        let value = match &field.ty {
            FieldTy::PrimaryKey(primary_key) => primary_key
                .key_of(&Value::from_json(json))
                .map(Value::from)
                .ok_or_else(|| {
                    Error::invalid_field(
                        collection,
                        name,
                        format!("expected a {} key", primary_key.ty()),
                    )
                })?,
            FieldTy::Property(property) => {
                let value = property.deserialize(json)?;
                property.validate(collection, name, value)?
            }
            FieldTy::Relation(relation) => {
                resolve_pointers(engine, collection, name, relation, json)?
            }
        };

        document.insert(name, value);
    }

    Ok(document)
}

fn resolve_pointers(
    engine: &Engine,
    collection: &str,
    field: &str,
    relation: &Relation,
    json: &Json,
) -> Result<Value> {
    let target = engine.schema.expect_model(relation.target())?;
    let resolve = |json: &Json| -> Result<Value> {
        let key = json
            .as_str()
            .and_then(parse_pointer)
            .filter(|(model, _)| *model == relation.target())
            .and_then(|(_, raw)| target.primary_key().ty().parse(&raw))
            .ok_or_else(|| {
                Error::invalid_field(
                    collection,
                    field,
                    format!("expected a pointer into `{}`, got {json}", relation.target()),
                )
            })?;
        Ok(key.into())
    };

    match json {
        Json::Array(items) if relation.is_many() => {
            Ok(Value::List(items.iter().map(resolve).collect::<Result<_>>()?))
        }
        Json::Null if relation.is_nullable() => Ok(relation.empty_value().unwrap_or_default()),
        json if !relation.is_many() => resolve(json),
        _ => Err(Error::invalid_field(
            collection,
            field,
            "expected an array of pointers",
        )),
    }
}

fn pointer(collection: &str, key: &Key) -> String {
    let raw = match key {
        Key::Int(v) => v.to_string(),
        Key::String(v) => v.clone(),
    };
    format!("/{}/{}", escape(collection), escape(&raw))
}

fn parse_pointer(pointer: &str) -> Option<(String, String)> {
    let (collection, key) = pointer.strip_prefix('/')?.split_once('/')?;
    if key.contains('/') {
        return None;
    }
    Some((unescape(collection), unescape(key)))
}

fn escape(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}
