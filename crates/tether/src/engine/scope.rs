//! Computes the collections a transaction must be opened over.
//!
//! The result may name more collections than an operation ends up touching,
//! never fewer. Fields the schema does not know are skipped here; the
//! mutation engine reports them.

use indexmap::IndexSet;
use tether_core::{
    stmt::{Connection, Create, CreateField, Query, RelationOp, Update, UpdateField},
    Result, Schema,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Scope {
    collections: IndexSet<String>,
}

impl Scope {
    /// Just `collection`.
    pub(crate) fn single(schema: &Schema, collection: &str) -> Result<Scope> {
        schema.expect_model(collection)?;
        let mut scope = Scope::default();
        scope.insert(collection);
        Ok(scope)
    }

    pub(crate) fn insert(&mut self, collection: &str) {
        if !self.collections.contains(collection) {
            self.collections.insert(collection.to_string());
        }
    }

    pub(crate) fn extend(&mut self, other: &Scope) {
        for collection in &other.collections {
            self.insert(collection);
        }
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.collections.iter().map(String::as_str)
    }

    pub(crate) fn to_vec(&self) -> Vec<String> {
        self.collections.iter().cloned().collect()
    }

    #[cfg(test)]
    fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.iter().collect();
        names.sort_unstable();
        names
    }

    /// Every collection in the schema.
    pub(crate) fn all(schema: &Schema) -> Scope {
        let mut scope = Scope::default();
        for model in schema.models() {
            scope.insert(model.name());
        }
        scope
    }

    pub(crate) fn for_query(schema: &Schema, collection: &str, query: &Query) -> Result<Scope> {
        let mut scope = Scope::single(schema, collection)?;
        scope.query(schema, collection, query)?;
        Ok(scope)
    }

    pub(crate) fn for_create(schema: &Schema, collection: &str, create: &Create) -> Result<Scope> {
        let mut scope = Scope::single(schema, collection)?;
        scope.create(schema, collection, create)?;
        Ok(scope)
    }

    pub(crate) fn for_update(schema: &Schema, collection: &str, update: &Update) -> Result<Scope> {
        let mut scope = Scope::single(schema, collection)?;
        scope.update(schema, collection, update)?;
        Ok(scope)
    }

    /// A delete may cascade to anything reachable from the collection.
    pub(crate) fn for_delete(schema: &Schema, collection: &str) -> Result<Scope> {
        let mut scope = Scope::single(schema, collection)?;
        scope.reachable(schema, collection)?;
        Ok(scope)
    }

    fn reachable(&mut self, schema: &Schema, collection: &str) -> Result<()> {
        for name in schema.reachable(collection)? {
            self.insert(name);
        }
        Ok(())
    }

    fn query(&mut self, schema: &Schema, collection: &str, query: &Query) -> Result<()> {
        let model = schema.expect_model(collection)?;

        let Some(selection) = query.projection() else {
            return Ok(());
        };

        for (field, select) in selection.iter() {
            let Some(relation) = model.relation(field) else {
                continue;
            };

            self.insert(relation.target());

            if let Some(nested) = select.as_nested() {
                self.query(schema, relation.target(), nested)?;
            }
        }

        Ok(())
    }

    fn create(&mut self, schema: &Schema, collection: &str, create: &Create) -> Result<()> {
        let model = schema.expect_model(collection)?;

        for (field, value) in &create.fields {
            let (Some(relation), CreateField::Relation(connections)) = (model.relation(field), value)
            else {
                continue;
            };

            self.insert(relation.target());

            for connection in connections {
                if let Connection::Create(nested) = connection {
                    self.create(schema, relation.target(), nested)?;
                }
            }
        }

        Ok(())
    }

    fn update(&mut self, schema: &Schema, collection: &str, update: &Update) -> Result<()> {
        let model = schema.expect_model(collection)?;

        for (field, value) in &update.fields {
            let (Some(relation), UpdateField::Relation(ops)) = (model.relation(field), value) else {
                continue;
            };

            let target = relation.target();
            self.insert(target);

            for op in ops {
                match op {
                    RelationOp::Connect(_)
                    | RelationOp::Disconnect(_)
                    | RelationOp::DisconnectAll => {}
                    RelationOp::Delete(_) | RelationOp::DeleteAll => {
                        self.reachable(schema, target)?;
                    }
                    RelationOp::Create(nested) => self.create(schema, target, nested)?,
                    RelationOp::Update(nested) => self.update(schema, target, nested)?,
                }
            }
        }

        Ok(())
    }
}
