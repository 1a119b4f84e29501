use super::{FieldRef, Model, ModelBuilder, OnDelete, Relation, Schema};
use crate::{Error, Result};

use indexmap::IndexMap;

/// Collects model declarations and compiles them into a [`Schema`].
#[derive(Debug, Default)]
pub struct Builder {
    models: Vec<ModelBuilder>,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    pub fn register(&mut self, model: ModelBuilder) -> &mut Self {
        self.models.push(model);
        self
    }

    /// Check every model, link relation pairs, and produce the schema.
    pub fn build(&self) -> Result<Schema> {
        let mut models = IndexMap::with_capacity(self.models.len());

        for model in &self.models {
            let model = model.build()?;
            let name = model.name().to_string();

            if models.insert(name.clone(), model).is_some() {
                return Err(Error::invalid_config(format!(
                    "model `{name}` is registered more than once"
                )));
            }
        }

        let mirrors = link_relations(&models)?;

        tracing::debug!(
            models = models.len(),
            pairs = mirrors.len() / 2,
            "compiled schema"
        );

        Ok(Schema::new(models, mirrors))
    }
}

/// Pair every bidirectional relation field with its mirror.
fn link_relations(models: &IndexMap<String, Model>) -> Result<IndexMap<FieldRef, FieldRef>> {
    let mut mirrors = IndexMap::new();

    for model in models.values() {
        for (field, relation) in model.relations() {
            let Some(target) = models.get(relation.target()) else {
                return Err(Error::invalid_config(format!(
                    "field `{}.{}` references model `{}`, which was not registered with the schema",
                    model.name(),
                    field,
                    relation.target(),
                )));
            };

            if relation.delete_action() == OnDelete::SetNull && !relation.is_nullable() {
                return Err(Error::invalid_config(format!(
                    "field `{}.{}` uses `SetNull` but is not optional or an array",
                    model.name(),
                    field,
                )));
            }

            if relation.is_unidirectional() {
                if relation
                    .declared_action()
                    .is_some_and(|action| action != OnDelete::None)
                {
                    return Err(Error::invalid_config(format!(
                        "field `{}.{}` is unidirectional and cannot declare an `on_delete` action",
                        model.name(),
                        field,
                    )));
                }
                continue;
            }

            let mirror = find_mirror(model, field, relation, target)?;
            mirrors.insert(
                FieldRef::new(model.name(), field),
                FieldRef::new(target.name(), mirror),
            );
        }
    }

    Ok(mirrors)
}

/// Find the one relation field on `target` that points back at `model` under
/// the same declared name.
fn find_mirror<'a>(
    model: &Model,
    field: &str,
    relation: &Relation,
    target: &'a Model,
) -> Result<&'a str> {
    let candidates: Vec<_> = target
        .relations()
        .filter(|(name, candidate)| {
            candidate.target() == model.name()
                && !candidate.is_unidirectional()
                && candidate.relation_name() == relation.relation_name()
                && !(target.name() == model.name() && *name == field)
        })
        .map(|(name, _)| name)
        .collect();

    match &candidates[..] {
        [mirror] => Ok(mirror),
        [] => Err(Error::invalid_config(format!(
            "field `{}.{}` has no mirror relation on `{}`; declare one or mark the relation unidirectional",
            model.name(),
            field,
            target.name(),
        ))),
        _ => Err(Error::invalid_config(format!(
            "field `{}.{}` matches more than one relation on `{}` ({}); give the pair a distinct name",
            model.name(),
            field,
            target.name(),
            candidates.join(", "),
        ))),
    }
}
