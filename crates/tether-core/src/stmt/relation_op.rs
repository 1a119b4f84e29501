use super::{Create, Update, Value};

/// One operation on a relation field inside an update.
///
/// The `...Many` forms of the payload vocabulary expand into repeated
/// singular operations, so only the singular and `...All` forms exist here.
/// Delete and disconnect are only accepted on nullable relations (optional or
/// array); a key is required for array relations and must be omitted for
/// singular ones.
#[derive(Debug, Clone)]
pub enum RelationOp {
    /// Link an existing document.
    Connect(Value),

    /// Insert a new document and link it.
    Create(Create),

    /// Update the linked document(s) that match the update's filter.
    Update(Update),

    /// Unlink and delete a linked document.
    Delete(Option<Value>),

    /// Unlink and delete every linked document of an array relation.
    DeleteAll,

    /// Unlink a document without deleting it.
    Disconnect(Option<Value>),

    /// Unlink every document of an array relation.
    DisconnectAll,
}

impl RelationOp {
    /// The `$`-prefixed name of the operation, for messages.
    pub fn name(&self) -> &'static str {
        match self {
            RelationOp::Connect(_) => "$connect",
            RelationOp::Create(_) => "$create",
            RelationOp::Update(_) => "$update",
            RelationOp::Delete(_) => "$delete",
            RelationOp::DeleteAll => "$deleteAll",
            RelationOp::Disconnect(_) => "$disconnect",
            RelationOp::DisconnectAll => "$disconnectAll",
        }
    }

    /// True for operations only nullable relations accept.
    pub fn requires_nullable(&self) -> bool {
        matches!(
            self,
            RelationOp::Delete(_)
                | RelationOp::DeleteAll
                | RelationOp::Disconnect(_)
                | RelationOp::DisconnectAll
        )
    }
}
