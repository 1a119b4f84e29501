/// Error when an internal invariant does not hold.
#[derive(Debug)]
pub(super) struct AssertionError {
    message: Box<str>,
}

impl AssertionError {
    pub(super) fn new(message: String) -> Self {
        AssertionError {
            message: message.into(),
        }
    }
}

impl std::error::Error for AssertionError {}

impl core::fmt::Display for AssertionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "assertion failed: {}", self.message)
    }
}
