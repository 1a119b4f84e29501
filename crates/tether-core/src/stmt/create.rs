use super::Value;

use indexmap::IndexMap;

/// Payload for inserting one document.
///
/// Scalar fields are set with [`Create::set`]. Relation fields take one or
/// more connections: each either links an existing document by key or
/// creates a new one.
#[derive(Debug, Clone, Default)]
pub struct Create {
    pub fields: IndexMap<String, CreateField>,
}

#[derive(Debug, Clone)]
pub enum CreateField {
    /// A literal value for a primary key or property field.
    Value(Value),

    /// Connections for a relation field.
    Relation(Vec<Connection>),
}

/// How a relation field of a new document gets populated.
#[derive(Debug, Clone)]
pub enum Connection {
    /// Link an existing document by primary key.
    Connect(Value),

    /// Insert a new document and link it.
    Create(Create),
}

impl Create {
    pub fn new() -> Create {
        Create::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Create {
        self.fields
            .insert(field.into(), CreateField::Value(value.into()));
        self
    }

    pub fn connect(self, field: impl Into<String>, key: impl Into<Value>) -> Create {
        self.push(field.into(), Connection::Connect(key.into()))
    }

    pub fn connect_many<I>(mut self, field: impl Into<String>, keys: I) -> Create
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let field = field.into();
        for key in keys {
            self = self.push(field.clone(), Connection::Connect(key.into()));
        }
        self
    }

    pub fn create(self, field: impl Into<String>, nested: Create) -> Create {
        self.push(field.into(), Connection::Create(nested))
    }

    pub fn create_many(
        mut self,
        field: impl Into<String>,
        nested: impl IntoIterator<Item = Create>,
    ) -> Create {
        let field = field.into();
        for create in nested {
            self = self.push(field.clone(), Connection::Create(create));
        }
        self
    }

    pub fn get(&self, field: &str) -> Option<&CreateField> {
        self.fields.get(field)
    }

    fn push(mut self, field: String, connection: Connection) -> Create {
        let entry = self
            .fields
            .entry(field)
            .or_insert_with(|| CreateField::Relation(vec![]));

        match entry {
            CreateField::Relation(connections) => connections.push(connection),
            CreateField::Value(_) => *entry = CreateField::Relation(vec![connection]),
        }

        self
    }
}

impl CreateField {
    pub fn as_relation(&self) -> Option<&[Connection]> {
        match self {
            CreateField::Relation(connections) => Some(connections),
            CreateField::Value(_) => None,
        }
    }
}
