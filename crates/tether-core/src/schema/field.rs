use super::{PrimaryKey, Property, Relation};

#[derive(Debug, Clone)]
pub struct Field {
    /// Name of the field within its model
    pub name: String,

    /// What kind of field this is
    pub ty: FieldTy,
}

#[derive(Debug, Clone)]
pub enum FieldTy {
    PrimaryKey(PrimaryKey),
    Property(Property),
    Relation(Relation),
}

impl Field {
    pub fn is_primary_key(&self) -> bool {
        matches!(self.ty, FieldTy::PrimaryKey(_))
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.ty, FieldTy::Relation(_))
    }

    pub fn as_property(&self) -> Option<&Property> {
        match &self.ty {
            FieldTy::Property(property) => Some(property),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match &self.ty {
            FieldTy::Relation(relation) => Some(relation),
            _ => None,
        }
    }

    #[track_caller]
    pub fn expect_relation(&self) -> &Relation {
        match &self.ty {
            FieldTy::Relation(relation) => relation,
            _ => panic!("expected field `{}` to be a relation", self.name),
        }
    }
}
