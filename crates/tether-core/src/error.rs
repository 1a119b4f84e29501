mod adhoc;
mod assertion;
mod delete_restricted;
mod document_not_found;
mod invalid_config;
mod invalid_item;
mod overwrite_relation;
mod storage;
mod transaction;
mod write_failed;

use adhoc::AdhocError;
use assertion::AssertionError;
use delete_restricted::DeleteRestrictedError;
use document_not_found::DocumentNotFoundError;
use invalid_config::InvalidConfigError;
use invalid_item::InvalidItemError;
use overwrite_relation::OverwriteRelationError;
use std::sync::Arc;
use storage::StorageError;
use transaction::TransactionError;
use write_failed::WriteFailedError;

pub use write_failed::WriteOp;

/// Return early with an ad hoc error built from a format string.
///
/// Ad hoc errors report as [`Error::is_unknown`]. Prefer one of the typed
/// constructors whenever the failure belongs to the engine taxonomy.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Build an ad hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur in Tether.
///
/// The handle is a single pointer wide. Errors can be chained with
/// [`Error::context`]; the chain is rendered outermost first.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    InvalidConfig(InvalidConfigError),
    InvalidItem(InvalidItemError),
    DocumentNotFound(DocumentNotFoundError),
    OverwriteRelation(OverwriteRelationError),
    DeleteRestricted(DeleteRestrictedError),
    WriteFailed(WriteFailedError),
    Assertion(AssertionError),
    Storage(StorageError),
    Transaction(TransactionError),
    Unknown,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, followed by earlier context, ending with the root
    /// cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let mut err = consequent;
        if let Some(inner) = err.inner.as_mut().and_then(Arc::get_mut) {
            if inner.cause.is_none() {
                inner.cause = Some(self);
                return err;
            }
        }

        // Shared or already-caused consequents are flattened into a message
        // so the existing chain is never overwritten.
        Error::from_inner(ErrorInner {
            kind: ErrorKind::Adhoc(AdhocError::new(err.to_string())),
            cause: Some(self),
        })
    }

    fn from_inner(inner: ErrorInner) -> Error {
        Error {
            inner: Some(Arc::new(inner)),
        }
    }

    /// The innermost error of the chain.
    pub fn root(&self) -> &Error {
        self.chain().last().unwrap_or(self)
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }

    #[doc(hidden)]
    pub fn from_args(args: core::fmt::Arguments<'_>) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(args.to_string())))
    }

    /// The schema or relation graph is invalid.
    pub fn invalid_config(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidConfig(InvalidConfigError::new(
            message.into(),
        )))
    }

    /// A payload failed validation or used the mutation vocabulary wrongly.
    pub fn invalid_item(collection: &str, message: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidItem(InvalidItemError::new(
            collection,
            None,
            message.into(),
        )))
    }

    /// Like [`Error::invalid_item`], naming the offending field.
    pub fn invalid_field(collection: &str, field: &str, message: impl Into<String>) -> Error {
        Error::from(ErrorKind::InvalidItem(InvalidItemError::new(
            collection,
            Some(field),
            message.into(),
        )))
    }

    /// A referenced document does not exist.
    pub fn document_not_found(collection: &str, key: impl core::fmt::Display) -> Error {
        Error::from(ErrorKind::DocumentNotFound(DocumentNotFoundError::new(
            collection,
            key.to_string(),
        )))
    }

    /// A populated singular bidirectional relation would be repointed.
    pub fn overwrite_relation(
        collection: &str,
        key: impl core::fmt::Display,
        field: &str,
    ) -> Error {
        Error::from(ErrorKind::OverwriteRelation(OverwriteRelationError::new(
            collection,
            key.to_string(),
            field,
        )))
    }

    /// A delete was refused because a `Restrict` relation is populated.
    pub fn delete_restricted(
        collection: &str,
        key: impl core::fmt::Display,
        field: &str,
    ) -> Error {
        Error::from(ErrorKind::DeleteRestricted(DeleteRestrictedError::new(
            collection,
            key.to_string(),
            field,
        )))
    }

    /// The storage engine failed to apply a write.
    pub fn write_failed(op: WriteOp, collection: &str) -> Error {
        Error::from(ErrorKind::WriteFailed(WriteFailedError::new(op, collection)))
    }

    pub fn add_failed(collection: &str) -> Error {
        Error::write_failed(WriteOp::Add, collection)
    }

    pub fn update_failed(collection: &str) -> Error {
        Error::write_failed(WriteOp::Update, collection)
    }

    pub fn delete_failed(collection: &str) -> Error {
        Error::write_failed(WriteOp::Delete, collection)
    }

    /// An internal invariant was violated.
    pub fn assertion(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::Assertion(AssertionError::new(message.into())))
    }

    /// A failure reported by a storage driver.
    pub fn storage(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::Storage(StorageError::new(message.into())))
    }

    /// A transaction handle was used after it finished.
    pub fn transaction_inactive(message: impl Into<String>) -> Error {
        Error::from(ErrorKind::Transaction(TransactionError::new(message.into())))
    }

    /// A failure outside the engine taxonomy. Used as context when a foreign
    /// error crosses a transaction boundary.
    pub fn unknown() -> Error {
        Error::from(ErrorKind::Unknown)
    }

    pub fn is_invalid_config(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidConfig(_))
    }

    pub fn is_invalid_item(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidItem(_))
    }

    pub fn is_document_not_found(&self) -> bool {
        matches!(self.kind(), ErrorKind::DocumentNotFound(_))
    }

    pub fn is_overwrite_relation(&self) -> bool {
        matches!(self.kind(), ErrorKind::OverwriteRelation(_))
    }

    pub fn is_delete_restricted(&self) -> bool {
        matches!(self.kind(), ErrorKind::DeleteRestricted(_))
    }

    pub fn is_add_failed(&self) -> bool {
        matches!(self.kind(), ErrorKind::WriteFailed(err) if err.op == WriteOp::Add)
    }

    pub fn is_update_failed(&self) -> bool {
        matches!(self.kind(), ErrorKind::WriteFailed(err) if err.op == WriteOp::Update)
    }

    pub fn is_delete_failed(&self) -> bool {
        matches!(self.kind(), ErrorKind::WriteFailed(err) if err.op == WriteOp::Delete)
    }

    pub fn is_assertion(&self) -> bool {
        matches!(self.kind(), ErrorKind::Assertion(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self.kind(), ErrorKind::Storage(_))
    }

    pub fn is_transaction_inactive(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transaction(_))
    }

    /// True for errors that did not originate in the engine taxonomy.
    pub fn is_unknown(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Anyhow(_) | ErrorKind::Adhoc(_) | ErrorKind::Unknown
        )
    }

    /// True when this error belongs to the engine taxonomy. Anything else is
    /// wrapped as unknown before it crosses a transaction boundary.
    pub fn is_engine(&self) -> bool {
        !self.is_unknown() && !self.is_storage()
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => self
                .inner
                .as_ref()
                .and_then(|inner| inner.cause.as_ref())
                .map(|cause| cause as &(dyn std::error::Error + 'static)),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            InvalidConfig(err) => core::fmt::Display::fmt(err, f),
            InvalidItem(err) => core::fmt::Display::fmt(err, f),
            DocumentNotFound(err) => core::fmt::Display::fmt(err, f),
            OverwriteRelation(err) => core::fmt::Display::fmt(err, f),
            DeleteRestricted(err) => core::fmt::Display::fmt(err, f),
            WriteFailed(err) => core::fmt::Display::fmt(err, f),
            Assertion(err) => core::fmt::Display::fmt(err, f),
            Storage(err) => core::fmt::Display::fmt(err, f),
            Transaction(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown tether error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from_inner(ErrorInner { kind, cause: None })
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}
