//! Turns stored documents into query results.
//!
//! A [`Projector`] is compiled once from a query shape: every field name is
//! checked against the schema and every nested selection gets its own child
//! projector, so running it only does storage lookups.

use super::Tx;

use async_recursion::async_recursion;
use indexmap::IndexMap;
use tether_core::{
    schema::Model,
    stmt::{Document, Filter, Key, Query, Selection, Value},
    Error, Result, Schema,
};

#[derive(Debug)]
pub(crate) struct Projector {
    collection: String,
    filter: Filter,
    shape: Shape,

    /// Relations to resolve, keyed by field name.
    relations: IndexMap<String, Nested>,
}

#[derive(Debug)]
enum Shape {
    /// The stored document, relation keys left raw.
    Raw,

    /// Only the listed fields, in the order they were listed.
    Select(Vec<String>),

    /// Every stored field, with the listed relations resolved.
    Include,
}

#[derive(Debug)]
struct Nested {
    target: String,
    many: bool,

    /// Field on the target pointing back at the origin.
    mirror: Option<String>,

    /// The nested query asked for the back-reference explicitly.
    keep_back_ref: bool,

    projector: Projector,
}

impl Projector {
    pub(crate) fn compile(schema: &Schema, collection: &str, query: &Query) -> Result<Projector> {
        let model = schema.expect_model(collection)?;

        let (shape, selection) = match (&query.select, &query.include) {
            (Some(_), Some(_)) => {
                return Err(Error::invalid_config(format!(
                    "query on `{collection}` sets both select and include"
                )))
            }
            (Some(selection), None) => (
                Shape::Select(selection.fields.keys().cloned().collect()),
                Some(selection),
            ),
            (None, Some(selection)) => (Shape::Include, Some(selection)),
            (None, None) => (Shape::Raw, None),
        };

        let relations = match selection {
            Some(selection) => compile_relations(schema, model, selection)?,
            None => IndexMap::new(),
        };

        Ok(Projector {
            collection: collection.to_string(),
            filter: query.filter.clone(),
            shape,
            relations,
        })
    }

    /// Scan the collection in cursor order, returning the projected
    /// documents that pass the filter.
    pub(crate) async fn find(&self, tx: &Tx, first: bool) -> Result<Vec<Document>> {
        let mut cursor = tx.cursor(&self.collection).await?;
        let mut documents = vec![];

        while let Some(document) = cursor.next().await? {
            if !self.filter.eval(&document) {
                continue;
            }

            documents.push(self.project(tx, document).await?);

            if first {
                break;
            }
        }

        tracing::trace!(
            collection = %self.collection,
            matched = documents.len(),
            "scan finished"
        );
        Ok(documents)
    }

    #[async_recursion]
    async fn project(&self, tx: &Tx, document: Document) -> Result<Document> {
        let mut resolved = IndexMap::new();
        for (name, nested) in &self.relations {
            let value = nested.resolve(tx, document.get_or_null(name)).await?;
            resolved.insert(name.as_str(), value);
        }

        let projected = match &self.shape {
            Shape::Raw => document,
            Shape::Include => document
                .into_iter()
                .map(|(name, value)| {
                    let value = resolved.shift_remove(name.as_str()).unwrap_or(value);
                    (name, value)
                })
                .collect(),
            Shape::Select(fields) => fields
                .iter()
                .map(|name| {
                    let value = match resolved.shift_remove(name.as_str()) {
                        Some(value) => value,
                        None => document.get_or_null(name).clone(),
                    };
                    (name.as_str(), value)
                })
                .collect(),
        };

        Ok(projected)
    }
}

impl Nested {
    /// Look up the documents a stored relation value points at.
    ///
    /// Missing documents and documents failing the nested filter are dropped
    /// from arrays; for singular relations they resolve to null.
    async fn resolve(&self, tx: &Tx, value: &Value) -> Result<Value> {
        if self.many {
            let mut documents = vec![];
            for key in value.keys() {
                if let Some(document) = self.load(tx, &key).await? {
                    documents.push(Value::Document(document));
                }
            }
            return Ok(Value::List(documents));
        }

        let Some(key) = value.to_key() else {
            return Ok(Value::Null);
        };

        Ok(self
            .load(tx, &key)
            .await?
            .map(Value::Document)
            .unwrap_or_default())
    }

    async fn load(&self, tx: &Tx, key: &Key) -> Result<Option<Document>> {
        let Some(document) = tx.get(&self.target, key).await? else {
            return Ok(None);
        };

        if !self.projector.filter.eval(&document) {
            return Ok(None);
        }

        let mut document = self.projector.project(tx, document).await?;

        if let (Some(mirror), false) = (&self.mirror, self.keep_back_ref) {
            document.remove(mirror);
        }

        Ok(Some(document))
    }
}

fn compile_relations(
    schema: &Schema,
    model: &Model,
    selection: &Selection,
) -> Result<IndexMap<String, Nested>> {
    let mut relations = IndexMap::new();

    for (name, select) in selection.iter() {
        let Some(field) = model.field(name) else {
            return Err(Error::invalid_config(format!(
                "query selects unknown field `{}.{name}`",
                model.name()
            )));
        };

        let Some(relation) = field.as_relation() else {
            if select.as_nested().is_some() {
                return Err(Error::invalid_config(format!(
                    "`{}.{name}` is not a relation and cannot take a nested query",
                    model.name()
                )));
            }
            continue;
        };

        let default = Query::new();
        let nested = select.as_nested().unwrap_or(&default);
        let mirror = schema
            .mirror(model.name(), name)
            .map(|mirror| mirror.field.clone());

        relations.insert(
            name.to_string(),
            Nested {
                target: relation.target().to_string(),
                many: relation.is_many(),
                keep_back_ref: mirror.as_deref().is_some_and(|mirror| nested.names(mirror)),
                mirror,
                projector: Projector::compile(schema, relation.target(), nested)?,
            },
        );
    }

    Ok(relations)
}
