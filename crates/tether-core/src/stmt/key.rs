use super::Value;

use std::fmt;

/// A primary key value.
///
/// Keys are totally ordered: integers sort before strings, which is the order
/// collection cursors yield documents in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Key {
    Int(i64),
    String(String),
}

impl Key {
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::I64(v) => Some(Key::Int(*v)),
            Value::String(v) => Some(Key::String(v.clone())),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(v) => Some(*v),
            Key::String(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Key {
    fn from(src: i64) -> Self {
        Key::Int(src)
    }
}

impl From<i32> for Key {
    fn from(src: i32) -> Self {
        Key::Int(src.into())
    }
}

impl From<String> for Key {
    fn from(src: String) -> Self {
        Key::String(src)
    }
}

impl From<&str> for Key {
    fn from(src: &str) -> Self {
        Key::String(src.to_string())
    }
}
