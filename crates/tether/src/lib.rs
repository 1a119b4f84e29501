pub mod client;
pub use client::Client;

mod collection;
pub use collection::Collection;

mod compiled;
pub use compiled::CompiledQuery;

mod engine;

mod export;

mod transaction;
pub use transaction::Transaction;

pub use tether_core::{
    bail, doc,
    driver::{self, Driver, Mode},
    err,
    schema::{
        self, Cardinality, KeyType, Model, OnDelete, PrimaryKey, Property, Relation, Schema, Type,
    },
    stmt::{self, Create, Document, Filter, Key, Query, Selection, Update, Value},
    Error, Result,
};

#[cfg(feature = "memory")]
pub use tether_driver_memory::MemoryDriver;
