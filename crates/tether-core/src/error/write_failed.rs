/// The kind of storage write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Add,
    Update,
    Delete,
}

/// Error when the storage engine rejects a write.
#[derive(Debug)]
pub(super) struct WriteFailedError {
    pub(super) op: WriteOp,
    collection: Box<str>,
}

impl WriteFailedError {
    pub(super) fn new(op: WriteOp, collection: &str) -> Self {
        WriteFailedError {
            op,
            collection: collection.into(),
        }
    }
}

impl std::error::Error for WriteFailedError {}

impl core::fmt::Display for WriteFailedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let verb = match self.op {
            WriteOp::Add => "add document to",
            WriteOp::Update => "update document in",
            WriteOp::Delete => "delete document from",
        };
        write!(f, "failed to {} `{}`", verb, self.collection)
    }
}
