/// Error when a connect would silently repoint a populated singular relation.
#[derive(Debug)]
pub(super) struct OverwriteRelationError {
    collection: Box<str>,
    key: Box<str>,
    field: Box<str>,
}

impl OverwriteRelationError {
    pub(super) fn new(collection: &str, key: String, field: &str) -> Self {
        OverwriteRelationError {
            collection: collection.into(),
            key: key.into(),
            field: field.into(),
        }
    }
}

impl std::error::Error for OverwriteRelationError {}

impl core::fmt::Display for OverwriteRelationError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "relation `{}.{}` of document {} is already set",
            self.collection, self.field, self.key
        )
    }
}
