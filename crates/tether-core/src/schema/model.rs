use super::{Field, FieldTy, PrimaryKey, Property, Relation};
use crate::{Error, Result};

use indexmap::IndexMap;

/// A collection's declaration: its name and ordered fields.
#[derive(Debug, Clone)]
pub struct Model {
    name: String,
    fields: IndexMap<String, Field>,
    primary_key: String,
}

/// Declares a model field by field. Checked when built.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    fields: Vec<Field>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            fields: vec![],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.values()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    /// Name of the primary key field.
    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    pub fn primary_key(&self) -> &PrimaryKey {
        match &self.fields[&self.primary_key].ty {
            FieldTy::PrimaryKey(primary_key) => primary_key,
            _ => unreachable!("primary key field is always a key"),
        }
    }

    pub fn relations(&self) -> impl Iterator<Item = (&str, &Relation)> + '_ {
        self.fields
            .values()
            .filter_map(|field| Some((field.name.as_str(), field.as_relation()?)))
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.field(name)?.as_relation()
    }
}

impl ModelBuilder {
    pub fn primary_key(self, name: impl Into<String>, primary_key: PrimaryKey) -> ModelBuilder {
        self.field(name.into(), FieldTy::PrimaryKey(primary_key))
    }

    pub fn property(self, name: impl Into<String>, property: Property) -> ModelBuilder {
        self.field(name.into(), FieldTy::Property(property))
    }

    pub fn relation(self, name: impl Into<String>, relation: Relation) -> ModelBuilder {
        self.field(name.into(), FieldTy::Relation(relation))
    }

    fn field(mut self, name: String, ty: FieldTy) -> ModelBuilder {
        self.fields.push(Field { name, ty });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the declaration and produce the model.
    pub fn build(&self) -> Result<Model> {
        let mut fields = IndexMap::with_capacity(self.fields.len());

        for field in &self.fields {
            if fields.insert(field.name.clone(), field.clone()).is_some() {
                return Err(Error::invalid_config(format!(
                    "model `{}` declares field `{}` more than once",
                    self.name, field.name
                )));
            }
        }

        let primary_keys: Vec<_> = self
            .fields
            .iter()
            .filter(|field| field.is_primary_key())
            .collect();

        let primary_key = match &primary_keys[..] {
            [field] => field.name.clone(),
            [] => {
                return Err(Error::invalid_config(format!(
                    "model `{}` has no primary key",
                    self.name
                )))
            }
            _ => {
                return Err(Error::invalid_config(format!(
                    "model `{}` has more than one primary key",
                    self.name
                )))
            }
        };

        Ok(Model {
            name: self.name.clone(),
            fields,
            primary_key,
        })
    }
}
