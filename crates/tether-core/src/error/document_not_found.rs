/// Error when a referenced key has no document behind it.
#[derive(Debug)]
pub(super) struct DocumentNotFoundError {
    collection: Box<str>,
    key: Box<str>,
}

impl DocumentNotFoundError {
    pub(super) fn new(collection: &str, key: String) -> Self {
        DocumentNotFoundError {
            collection: collection.into(),
            key: key.into(),
        }
    }
}

impl std::error::Error for DocumentNotFoundError {}

impl core::fmt::Display for DocumentNotFoundError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "document not found: `{}` has no document with key {}",
            self.collection, self.key
        )
    }
}
