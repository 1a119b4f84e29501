/// Error when a mutation payload fails validation.
#[derive(Debug)]
pub(super) struct InvalidItemError {
    collection: Box<str>,
    field: Option<Box<str>>,
    message: Box<str>,
}

impl InvalidItemError {
    pub(super) fn new(collection: &str, field: Option<&str>, message: String) -> Self {
        InvalidItemError {
            collection: collection.into(),
            field: field.map(Into::into),
            message: message.into(),
        }
    }
}

impl std::error::Error for InvalidItemError {}

impl core::fmt::Display for InvalidItemError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match &self.field {
            Some(field) => write!(
                f,
                "invalid item for `{}.{}`: {}",
                self.collection, field, self.message
            ),
            None => write!(f, "invalid item for `{}`: {}", self.collection, self.message),
        }
    }
}
