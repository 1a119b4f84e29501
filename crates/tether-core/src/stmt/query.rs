use super::{Filter, Value};

use indexmap::IndexMap;

/// A filtered, optionally projected read.
///
/// `select` emits only the listed fields; `include` keeps every field and
/// additionally resolves the listed relations. Setting both is a
/// configuration error reported when the query is compiled.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filter: Filter,
    pub select: Option<Selection>,
    pub include: Option<Selection>,
}

/// The fields a projection names.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub fields: IndexMap<String, Select>,
}

#[derive(Debug, Clone)]
pub enum Select {
    /// The field as-is; for relations, the resolved document(s).
    All,

    /// A relation resolved with its own filter and projection.
    Nested(Box<Query>),
}

impl Query {
    pub fn new() -> Query {
        Query::default()
    }

    pub fn filter(mut self, filter: Filter) -> Query {
        self.filter = filter;
        self
    }

    /// Shorthand for adding an equality check to the filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Query {
        self.filter = self.filter.eq(field, value);
        self
    }

    /// Shorthand for adding a predicate to the filter.
    pub fn where_fn(
        mut self,
        field: impl Into<String>,
        predicate: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Query {
        self.filter = self.filter.matches(field, predicate);
        self
    }

    pub fn select(mut self, selection: impl Into<Selection>) -> Query {
        self.select = Some(selection.into());
        self
    }

    pub fn include(mut self, selection: impl Into<Selection>) -> Query {
        self.include = Some(selection.into());
        self
    }

    /// The selection that drives relation resolution, if any.
    pub fn projection(&self) -> Option<&Selection> {
        self.select.as_ref().or(self.include.as_ref())
    }

    /// True if `field` is named by this query's select or include.
    pub fn names(&self, field: &str) -> bool {
        [&self.select, &self.include]
            .into_iter()
            .flatten()
            .any(|selection| selection.fields.contains_key(field))
    }
}

impl Selection {
    pub fn new() -> Selection {
        Selection::default()
    }

    pub fn field(mut self, field: impl Into<String>) -> Selection {
        self.fields.insert(field.into(), Select::All);
        self
    }

    pub fn nested(mut self, field: impl Into<String>, query: Query) -> Selection {
        self.fields
            .insert(field.into(), Select::Nested(Box::new(query)));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Select)> + '_ {
        self.fields.iter().map(|(field, select)| (field.as_str(), select))
    }
}

impl<const N: usize> From<[&str; N]> for Selection {
    fn from(fields: [&str; N]) -> Self {
        fields
            .into_iter()
            .fold(Selection::new(), |selection, field| selection.field(field))
    }
}

impl Select {
    pub fn as_nested(&self) -> Option<&Query> {
        match self {
            Select::All => None,
            Select::Nested(query) => Some(query),
        }
    }
}
