/// Error reported by a storage driver.
#[derive(Debug)]
pub(super) struct StorageError {
    message: Box<str>,
}

impl StorageError {
    pub(super) fn new(message: String) -> Self {
        StorageError {
            message: message.into(),
        }
    }
}

impl std::error::Error for StorageError {}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "storage error: {}", self.message)
    }
}
