/// Error when a `Restrict` relation blocks a delete.
#[derive(Debug)]
pub(super) struct DeleteRestrictedError {
    collection: Box<str>,
    key: Box<str>,
    field: Box<str>,
}

impl DeleteRestrictedError {
    pub(super) fn new(collection: &str, key: String, field: &str) -> Self {
        DeleteRestrictedError {
            collection: collection.into(),
            key: key.into(),
            field: field.into(),
        }
    }
}

impl std::error::Error for DeleteRestrictedError {}

impl core::fmt::Display for DeleteRestrictedError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "cannot delete document {} from `{}`: relation `{}` is still referenced",
            self.key, self.collection, self.field
        )
    }
}
