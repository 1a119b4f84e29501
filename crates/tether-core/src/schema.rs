//! Model declarations and the compiled relation graph.

mod builder;
pub use builder::Builder;

mod field;
pub use field::{Field, FieldTy};

mod graph;
pub use graph::FieldRef;
use graph::Graph;

mod model;
pub use model::{Model, ModelBuilder};

mod primary_key;
pub use primary_key::{KeyGenerator, KeyStrategy, KeyType, PrimaryKey};

mod property;
pub use property::{DefaultValue, Length, Property, Validator};

mod relation;
pub use relation::{Cardinality, OnDelete, Relation};

mod ty;
pub use ty::Type;

use crate::{
    stmt::{Key, Value},
    Error, Result,
};
use indexmap::{IndexMap, IndexSet};

/// A compiled, immutable set of models with their relations linked.
#[derive(Debug)]
pub struct Schema {
    models: IndexMap<String, Model>,
    graph: Graph,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn new(models: IndexMap<String, Model>, mirrors: IndexMap<FieldRef, FieldRef>) -> Schema {
        let graph = Graph::new(&models, mirrors);
        Schema { models, graph }
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.values()
    }

    pub fn model(&self, name: &str) -> Option<&Model> {
        self.models.get(name)
    }

    /// Like [`Schema::model`], failing for names that were never registered.
    pub fn expect_model(&self, name: &str) -> Result<&Model> {
        self.models
            .get(name)
            .ok_or_else(|| Error::invalid_config(format!("unknown collection `{name}`")))
    }

    /// The field paired with `model.field`, if the relation is bidirectional.
    pub fn mirror(&self, model: &str, field: &str) -> Option<&FieldRef> {
        self.graph.mirror(model, field)
    }

    /// The mirror's relation declaration.
    pub fn mirror_relation(&self, model: &str, field: &str) -> Option<(&FieldRef, &Relation)> {
        let mirror = self.graph.mirror(model, field)?;
        let relation = self.models.get(&mirror.model)?.relation(&mirror.field)?;
        Some((mirror, relation))
    }

    /// Every collection transitively reachable from `model` through any
    /// relation, `model` included.
    pub fn reachable(&self, model: &str) -> Result<&IndexSet<String>> {
        self.graph
            .reachable(&self.models, model)
            .ok_or_else(|| Error::invalid_config(format!("unknown collection `{model}`")))
    }

    /// Interpret `value` as a key of the relation's target model.
    pub fn target_key(&self, relation: &Relation, value: &Value) -> Option<Key> {
        self.models
            .get(relation.target())?
            .primary_key()
            .key_of(value)
    }
}
