//! The storage seam: collections of documents behind scoped transactions.

mod transaction;
pub use transaction::{Cursor, Transaction};

use crate::{async_trait, Schema};

use std::fmt::{self, Debug};

/// Whether a transaction may write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    ReadOnly,
    ReadWrite,
}

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// Register the schema with the driver. Called once, before any
    /// transaction is opened.
    async fn register_schema(&mut self, schema: &Schema) -> crate::Result<()>;

    /// Open a transaction over a fixed set of collections.
    ///
    /// Every collection the transaction will touch must be named here;
    /// touching any other is an error.
    async fn begin(&self, collections: &[String], mode: Mode)
        -> crate::Result<Box<dyn Transaction>>;
}

impl Mode {
    /// True if a transaction opened in `self` mode can serve `other`.
    pub fn covers(self, other: Mode) -> bool {
        self == Mode::ReadWrite || other == Mode::ReadOnly
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ReadOnly => f.write_str("readonly"),
            Mode::ReadWrite => f.write_str("readwrite"),
        }
    }
}
