/// A typed reference from one model's field to another model's primary key.
#[derive(Debug, Clone)]
pub struct Relation {
    target: String,
    name: Option<String>,
    cardinality: Cardinality,
    on_delete: Option<OnDelete>,
    unidirectional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Exactly one target, always set.
    One,

    /// At most one target.
    Optional,

    /// A list of targets.
    Many,
}

/// What happens to a document when the document its relation field points
/// to is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing document too.
    Cascade,

    /// Clear the reference.
    SetNull,

    /// Refuse the delete while the reference exists.
    Restrict,

    /// Leave the reference dangling.
    None,
}

impl Relation {
    fn new(target: impl Into<String>, cardinality: Cardinality) -> Relation {
        Relation {
            target: target.into(),
            name: None,
            cardinality,
            on_delete: None,
            unidirectional: false,
        }
    }

    pub fn one(target: impl Into<String>) -> Relation {
        Relation::new(target, Cardinality::One)
    }

    pub fn optional(target: impl Into<String>) -> Relation {
        Relation::new(target, Cardinality::Optional)
    }

    pub fn many(target: impl Into<String>) -> Relation {
        Relation::new(target, Cardinality::Many)
    }

    /// Name shared by the two sides of a relation pair.
    pub fn name(mut self, name: impl Into<String>) -> Relation {
        self.name = Some(name.into());
        self
    }

    pub fn on_delete(mut self, action: OnDelete) -> Relation {
        self.on_delete = Some(action);
        self
    }

    /// Do not pair this field with a mirror on the target model.
    pub fn unidirectional(mut self) -> Relation {
        self.unidirectional = true;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn relation_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn is_many(&self) -> bool {
        self.cardinality == Cardinality::Many
    }

    /// Optional and array relations may be emptied.
    pub fn is_nullable(&self) -> bool {
        self.cardinality != Cardinality::One
    }

    pub fn is_unidirectional(&self) -> bool {
        self.unidirectional
    }

    /// The declared action, or `Restrict` for required singular relations
    /// and `None` otherwise.
    pub fn delete_action(&self) -> OnDelete {
        match (self.on_delete, self.cardinality) {
            (Some(action), _) => action,
            (None, Cardinality::One) if !self.unidirectional => OnDelete::Restrict,
            (None, _) => OnDelete::None,
        }
    }

    pub(crate) fn declared_action(&self) -> Option<OnDelete> {
        self.on_delete
    }

    /// The value an absent relation field starts as.
    pub fn empty_value(&self) -> Option<crate::stmt::Value> {
        match self.cardinality {
            Cardinality::One => None,
            Cardinality::Optional => Some(crate::stmt::Value::Null),
            Cardinality::Many => Some(crate::stmt::Value::List(vec![])),
        }
    }
}
