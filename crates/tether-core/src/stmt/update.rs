use super::{Create, Filter, RelationOp, Value};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// Computes a field's new value from its old one.
pub type UpdateFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Payload for updating documents: which ones, and what changes.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub filter: Filter,
    pub fields: IndexMap<String, UpdateField>,
}

#[derive(Clone)]
pub enum UpdateField {
    /// Replace a property's value.
    Set(Value),

    /// Replace a property's value with a function of the old one.
    Apply(UpdateFn),

    /// Operations on a relation field, applied in order.
    Relation(Vec<RelationOp>),
}

impl Update {
    pub fn new() -> Update {
        Update::default()
    }

    /// Restrict the update to documents matching `filter`.
    pub fn filter(mut self, filter: Filter) -> Update {
        self.filter = filter;
        self
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Update {
        self.fields
            .insert(field.into(), UpdateField::Set(value.into()));
        self
    }

    pub fn apply(
        mut self,
        field: impl Into<String>,
        f: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Update {
        self.fields
            .insert(field.into(), UpdateField::Apply(Arc::new(f)));
        self
    }

    /// Append a raw relation operation.
    pub fn relation(mut self, field: impl Into<String>, op: RelationOp) -> Update {
        let entry = self
            .fields
            .entry(field.into())
            .or_insert_with(|| UpdateField::Relation(vec![]));

        match entry {
            UpdateField::Relation(ops) => ops.push(op),
            _ => *entry = UpdateField::Relation(vec![op]),
        }

        self
    }

    pub fn connect(self, field: impl Into<String>, key: impl Into<Value>) -> Update {
        self.relation(field, RelationOp::Connect(key.into()))
    }

    pub fn connect_many<I>(mut self, field: impl Into<String>, keys: I) -> Update
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let field = field.into();
        for key in keys {
            self = self.relation(field.clone(), RelationOp::Connect(key.into()));
        }
        self
    }

    pub fn create(self, field: impl Into<String>, nested: Create) -> Update {
        self.relation(field, RelationOp::Create(nested))
    }

    pub fn create_many(
        mut self,
        field: impl Into<String>,
        nested: impl IntoIterator<Item = Create>,
    ) -> Update {
        let field = field.into();
        for create in nested {
            self = self.relation(field.clone(), RelationOp::Create(create));
        }
        self
    }

    pub fn update_related(self, field: impl Into<String>, nested: Update) -> Update {
        self.relation(field, RelationOp::Update(nested))
    }

    /// Delete the document a singular relation points to.
    pub fn delete(self, field: impl Into<String>) -> Update {
        self.relation(field, RelationOp::Delete(None))
    }

    /// Delete one document of an array relation.
    pub fn delete_key(self, field: impl Into<String>, key: impl Into<Value>) -> Update {
        self.relation(field, RelationOp::Delete(Some(key.into())))
    }

    pub fn delete_many<I>(mut self, field: impl Into<String>, keys: I) -> Update
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let field = field.into();
        for key in keys {
            self = self.relation(field.clone(), RelationOp::Delete(Some(key.into())));
        }
        self
    }

    pub fn delete_all(self, field: impl Into<String>) -> Update {
        self.relation(field, RelationOp::DeleteAll)
    }

    /// Unlink the document a singular relation points to.
    pub fn disconnect(self, field: impl Into<String>) -> Update {
        self.relation(field, RelationOp::Disconnect(None))
    }

    /// Unlink one document of an array relation.
    pub fn disconnect_key(self, field: impl Into<String>, key: impl Into<Value>) -> Update {
        self.relation(field, RelationOp::Disconnect(Some(key.into())))
    }

    pub fn disconnect_many<I>(mut self, field: impl Into<String>, keys: I) -> Update
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let field = field.into();
        for key in keys {
            self = self.relation(field.clone(), RelationOp::Disconnect(Some(key.into())));
        }
        self
    }

    pub fn disconnect_all(self, field: impl Into<String>) -> Update {
        self.relation(field, RelationOp::DisconnectAll)
    }
}

impl fmt::Debug for UpdateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateField::Set(value) => f.debug_tuple("Set").field(value).finish(),
            UpdateField::Apply(_) => f.write_str("Apply(..)"),
            UpdateField::Relation(ops) => f.debug_tuple("Relation").field(ops).finish(),
        }
    }
}
