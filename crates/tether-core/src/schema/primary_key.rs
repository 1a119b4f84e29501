use crate::stmt::{Key, Value};

use std::{fmt, sync::Arc};

/// Produces a fresh key for a new document.
pub type KeyGenerator = Arc<dyn Fn() -> Key + Send + Sync>;

/// A model's primary key declaration.
#[derive(Debug, Clone)]
pub struct PrimaryKey {
    ty: KeyType,
    strategy: KeyStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Int,
    String,
}

/// How the key of a new document is obtained.
#[derive(Clone)]
pub enum KeyStrategy {
    /// One more than the largest key seen in the collection.
    AutoIncrement,

    /// Called once per insert.
    Generate(KeyGenerator),

    /// Provided by the caller in the payload.
    Supplied,
}

impl PrimaryKey {
    pub fn auto_increment() -> PrimaryKey {
        PrimaryKey {
            ty: KeyType::Int,
            strategy: KeyStrategy::AutoIncrement,
        }
    }

    pub fn generated(ty: KeyType, f: impl Fn() -> Key + Send + Sync + 'static) -> PrimaryKey {
        PrimaryKey {
            ty,
            strategy: KeyStrategy::Generate(Arc::new(f)),
        }
    }

    /// String keys holding random v4 UUIDs.
    pub fn uuid() -> PrimaryKey {
        PrimaryKey::generated(KeyType::String, || {
            Key::String(uuid::Uuid::new_v4().to_string())
        })
    }

    pub fn supplied(ty: KeyType) -> PrimaryKey {
        PrimaryKey {
            ty,
            strategy: KeyStrategy::Supplied,
        }
    }

    pub fn ty(&self) -> KeyType {
        self.ty
    }

    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    /// Interpret `value` as a key of this type.
    pub fn key_of(&self, value: &Value) -> Option<Key> {
        value.to_key().filter(|key| self.ty.accepts(key))
    }
}

impl KeyType {
    pub fn accepts(self, key: &Key) -> bool {
        matches!(
            (self, key),
            (KeyType::Int, Key::Int(_)) | (KeyType::String, Key::String(_))
        )
    }

    /// Parse a key from its display form.
    pub fn parse(self, raw: &str) -> Option<Key> {
        match self {
            KeyType::Int => raw.parse().ok().map(Key::Int),
            KeyType::String => Some(Key::String(raw.to_string())),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Int => f.write_str("int"),
            KeyType::String => f.write_str("string"),
        }
    }
}

impl fmt::Debug for KeyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyStrategy::AutoIncrement => f.write_str("AutoIncrement"),
            KeyStrategy::Generate(_) => f.write_str("Generate(..)"),
            KeyStrategy::Supplied => f.write_str("Supplied"),
        }
    }
}
