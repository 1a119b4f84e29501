use super::Model;

use indexmap::{IndexMap, IndexSet};
use std::sync::OnceLock;

/// Names one field of one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub model: String,
    pub field: String,
}

/// The linked relation graph.
///
/// Mirrors are fixed when the schema is built. Reachability sets are
/// computed on first use and never change afterwards, since the graph is
/// immutable.
#[derive(Debug)]
pub(super) struct Graph {
    mirrors: IndexMap<FieldRef, FieldRef>,
    reachable: IndexMap<String, OnceLock<IndexSet<String>>>,
}

impl FieldRef {
    pub fn new(model: impl Into<String>, field: impl Into<String>) -> FieldRef {
        FieldRef {
            model: model.into(),
            field: field.into(),
        }
    }
}

impl Graph {
    pub(super) fn new(models: &IndexMap<String, Model>, mirrors: IndexMap<FieldRef, FieldRef>) -> Graph {
        Graph {
            mirrors,
            reachable: models
                .keys()
                .map(|name| (name.clone(), OnceLock::new()))
                .collect(),
        }
    }

    pub(super) fn mirror(&self, model: &str, field: &str) -> Option<&FieldRef> {
        self.mirrors.get(&FieldRef::new(model, field))
    }

    /// Every model reachable from `model` through relation edges of any
    /// kind, `model` included.
    pub(super) fn reachable<'a>(
        &'a self,
        models: &IndexMap<String, Model>,
        model: &str,
    ) -> Option<&'a IndexSet<String>> {
        let cell = self.reachable.get(model)?;

        Some(cell.get_or_init(|| {
            let mut seen = IndexSet::new();
            let mut stack = vec![model.to_string()];

            while let Some(name) = stack.pop() {
                if !seen.insert(name.clone()) {
                    continue;
                }

                if let Some(model) = models.get(&name) {
                    for (_, relation) in model.relations() {
                        if !seen.contains(relation.target()) {
                            stack.push(relation.target().to_string());
                        }
                    }
                }
            }

            seen
        }))
    }
}
