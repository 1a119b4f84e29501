use super::Property;
use crate::{stmt::Value, Error, Result};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt;

/// The type tag of a property.
///
/// A type validates raw values (with light coercion: ints widen to floats,
/// RFC 3339 strings parse to dates) and maps values to and from JSON.
#[derive(Debug, Clone)]
pub enum Type {
    Bool,
    Int,
    Float,
    String,
    Date,

    /// Any value; no validation, untyped JSON mapping.
    Any,

    /// One of a fixed set of strings.
    Enum(Vec<String>),

    /// A nested document with its own declared properties.
    Object(IndexMap<String, Property>),
}

impl Type {
    /// Validate a non-null value, returning the normalized value.
    ///
    /// `path` names the field for error messages; nested object fields
    /// extend it with `.`.
    pub fn validate(&self, collection: &str, path: &str, value: Value) -> Result<Value> {
        let mismatch = |value: &Value| {
            Error::invalid_field(
                collection,
                path,
                format!("expected {self}, got {}", value.type_name()),
            )
        };

        match (self, value) {
            (Type::Any, value) => Ok(value),
            (Type::Bool, value @ Value::Bool(_)) => Ok(value),
            (Type::Int, value @ Value::I64(_)) => Ok(value),
            (Type::Float, value @ Value::F64(_)) => Ok(value),
            (Type::Float, Value::I64(v)) => Ok(Value::F64(v as f64)),
            (Type::String, value @ Value::String(_)) => Ok(value),
            (Type::Date, value @ Value::Date(_)) => Ok(value),
            (Type::Date, Value::String(raw)) => match parse_date(&raw) {
                Ok(date) => Ok(Value::Date(date)),
                Err(_) => Err(Error::invalid_field(
                    collection,
                    path,
                    format!("`{raw}` is not an RFC 3339 date"),
                )),
            },
            (Type::Enum(variants), Value::String(raw)) => {
                if variants.iter().any(|variant| *variant == raw) {
                    Ok(Value::String(raw))
                } else {
                    Err(Error::invalid_field(
                        collection,
                        path,
                        format!("`{raw}` is not one of {variants:?}"),
                    ))
                }
            }
            (Type::Object(properties), Value::Document(mut document)) => {
                let mut validated = crate::stmt::Document::new();

                for (name, property) in properties {
                    let nested = format!("{path}.{name}");
                    let value = property.resolve(collection, &nested, document.remove(name))?;
                    validated.insert(name.clone(), value);
                }

                if let Some(unknown) = document.fields().next() {
                    return Err(Error::invalid_field(
                        collection,
                        &format!("{path}.{unknown}"),
                        "unknown field",
                    ));
                }

                Ok(Value::Document(validated))
            }
            (_, value) => Err(mismatch(&value)),
        }
    }

    /// Map a value to its JSON form. Dates become RFC 3339 strings.
    pub fn serialize(&self, value: &Value) -> serde_json::Value {
        match (self, value) {
            (Type::Object(properties), Value::Document(document)) => serde_json::Value::Object(
                document
                    .iter()
                    .map(|(name, value)| {
                        let json = match properties.get(name) {
                            Some(property) => property.serialize(value),
                            None => value.to_json(),
                        };
                        (name.to_string(), json)
                    })
                    .collect(),
            ),
            _ => value.to_json(),
        }
    }

    /// Map JSON back to a value of this type.
    pub fn deserialize(&self, json: &serde_json::Value) -> Result<Value> {
        use serde_json::Value as Json;

        Ok(match (self, json) {
            (_, Json::Null) => Value::Null,
            (Type::Any, json) => Value::from_json(json),
            (Type::Bool, Json::Bool(v)) => Value::Bool(*v),
            (Type::Int, Json::Number(n)) if n.is_i64() => Value::I64(n.as_i64().unwrap_or_default()),
            (Type::Float, Json::Number(n)) => match n.as_f64() {
                Some(v) => Value::F64(v),
                None => crate::bail!("number {n} is not representable as a float"),
            },
            (Type::String | Type::Enum(_), Json::String(v)) => Value::String(v.clone()),
            (Type::Date, Json::String(v)) => Value::Date(parse_date(v)?),
            (Type::Object(properties), Json::Object(fields)) => {
                let mut document = crate::stmt::Document::new();
                for (name, json) in fields {
                    let value = match properties.get(name) {
                        Some(property) => property.deserialize(json)?,
                        None => Value::from_json(json),
                    };
                    document.insert(name.clone(), value);
                }
                Value::Document(document)
            }
            (ty, json) => crate::bail!("cannot read {json} as {ty}"),
        })
    }
}

fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Int => f.write_str("int"),
            Type::Float => f.write_str("float"),
            Type::String => f.write_str("string"),
            Type::Date => f.write_str("date"),
            Type::Any => f.write_str("any"),
            Type::Enum(_) => f.write_str("enum"),
            Type::Object(_) => f.write_str("object"),
        }
    }
}
