/// Error when the declared schema or its relation graph is unusable.
///
/// These are raised while compiling the schema, before any storage access.
#[derive(Debug)]
pub(super) struct InvalidConfigError {
    message: Box<str>,
}

impl InvalidConfigError {
    pub(super) fn new(message: String) -> Self {
        InvalidConfigError {
            message: message.into(),
        }
    }
}

impl std::error::Error for InvalidConfigError {}

impl core::fmt::Display for InvalidConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid configuration: {}", self.message)
    }
}
