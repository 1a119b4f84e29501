use super::{Document, Value};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// A caller-supplied field predicate.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// A conjunction of per-field checks.
///
/// Every check must pass for a document to match. There is no OR or NOT;
/// callers needing them write a predicate. An empty filter matches
/// everything.
#[derive(Clone, Default)]
pub struct Filter {
    checks: IndexMap<String, Check>,
}

/// One field check.
#[derive(Clone)]
pub enum Check {
    /// Literal equality; dates compare by instant.
    Eq(Value),

    /// Arbitrary predicate over the field's value.
    Predicate(Predicate),
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    /// Require `field` to equal `value`.
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Filter {
        self.checks.insert(field.into(), Check::Eq(value.into()));
        self
    }

    /// Require `predicate` to hold for `field`.
    pub fn matches(
        mut self,
        field: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Filter {
        self.checks
            .insert(field.into(), Check::Predicate(Arc::new(predicate)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.checks.keys().map(String::as_str)
    }

    pub fn checks(&self) -> impl Iterator<Item = (&str, &Check)> + '_ {
        self.checks.iter().map(|(field, check)| (field.as_str(), check))
    }

    /// Evaluate the filter against a document. Missing fields read as null.
    pub fn eval(&self, document: &Document) -> bool {
        self.checks
            .iter()
            .all(|(field, check)| check.eval(document.get_or_null(field)))
    }
}

impl Check {
    pub fn eval(&self, value: &Value) -> bool {
        match self {
            Check::Eq(expected) => value == expected,
            Check::Predicate(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.checks.iter()).finish()
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Eq(value) => f.debug_tuple("Eq").field(value).finish(),
            Check::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}
