/// Error when a transaction handle is used after it committed or aborted.
#[derive(Debug)]
pub(super) struct TransactionError {
    message: Box<str>,
}

impl TransactionError {
    pub(super) fn new(message: String) -> Self {
        TransactionError {
            message: message.into(),
        }
    }
}

impl std::error::Error for TransactionError {}

impl core::fmt::Display for TransactionError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "transaction is not active: {}", self.message)
    }
}
