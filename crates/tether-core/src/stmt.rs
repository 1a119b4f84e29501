//! Values, documents, and the statement payloads the engine executes.

mod create;
pub use create::{Connection, Create, CreateField};

mod document;
pub use document::Document;

mod filter;
pub use filter::{Check, Filter, Predicate};

mod key;
pub use key::Key;

mod query;
pub use query::{Query, Select, Selection};

mod relation_op;
pub use relation_op::RelationOp;

mod update;
pub use update::{Update, UpdateField, UpdateFn};

mod value;
pub use value::Value;
