use super::Type;
use crate::{stmt::Value, Error, Result};

use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// A scalar or structured field.
#[derive(Clone)]
pub struct Property {
    ty: Type,
    optional: bool,
    array: bool,
    default: Option<DefaultValue>,
    length: Option<Length>,
    validator: Option<Validator>,
}

/// Extra, caller-supplied validation run after the type check.
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// What an absent property is filled with.
#[derive(Clone)]
pub enum DefaultValue {
    Value(Value),
    Generate(Arc<dyn Fn() -> Value + Send + Sync>),
}

/// Bounds on the length of string values, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct Length {
    pub min: Option<usize>,
    pub max: Option<usize>,
}

impl Property {
    pub fn new(ty: Type) -> Property {
        Property {
            ty,
            optional: false,
            array: false,
            default: None,
            length: None,
            validator: None,
        }
    }

    pub fn bool() -> Property {
        Property::new(Type::Bool)
    }

    pub fn int() -> Property {
        Property::new(Type::Int)
    }

    pub fn float() -> Property {
        Property::new(Type::Float)
    }

    pub fn string() -> Property {
        Property::new(Type::String)
    }

    pub fn date() -> Property {
        Property::new(Type::Date)
    }

    pub fn any() -> Property {
        Property::new(Type::Any)
    }

    pub fn enumeration<I>(variants: I) -> Property
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Property::new(Type::Enum(variants.into_iter().map(Into::into).collect()))
    }

    pub fn object<I, K>(fields: I) -> Property
    where
        I: IntoIterator<Item = (K, Property)>,
        K: Into<String>,
    {
        let fields: IndexMap<String, Property> = fields
            .into_iter()
            .map(|(name, property)| (name.into(), property))
            .collect();
        Property::new(Type::Object(fields))
    }

    /// Accept `Null` and fill absent values with `Null`.
    pub fn optional(mut self) -> Property {
        self.optional = true;
        self
    }

    /// Hold a list of values of the type instead of a single one.
    pub fn array(mut self) -> Property {
        self.array = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Property {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    pub fn default_with(mut self, f: impl Fn() -> Value + Send + Sync + 'static) -> Property {
        self.default = Some(DefaultValue::Generate(Arc::new(f)));
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Property {
        self.length = Some(Length { min, max });
        self
    }

    pub fn max_length(self, max: usize) -> Property {
        self.length(None, Some(max))
    }

    pub fn validate_with(mut self, f: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Property {
        self.validator = Some(Arc::new(f));
        self
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    /// The value an absent property takes, if any.
    pub fn default_value(&self) -> Option<Value> {
        match self.default.as_ref()? {
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Generate(f) => Some(f()),
        }
    }

    /// Validate a value for `collection.field`.
    pub fn validate(&self, collection: &str, field: &str, value: Value) -> Result<Value> {
        if value.is_null() {
            return if self.optional {
                Ok(Value::Null)
            } else {
                Err(Error::invalid_field(collection, field, "value is required"))
            };
        }

        let value = if self.array {
            let Value::List(items) = value else {
                return Err(Error::invalid_field(
                    collection,
                    field,
                    format!("expected a list, got {}", value.type_name()),
                ));
            };

            let items = items
                .into_iter()
                .map(|item| self.validate_item(collection, field, item))
                .collect::<Result<Vec<_>>>()?;
            Value::List(items)
        } else {
            self.validate_item(collection, field, value)?
        };

        if let Some(validator) = &self.validator {
            if !validator(&value) {
                return Err(Error::invalid_field(
                    collection,
                    field,
                    "custom validation failed",
                ));
            }
        }

        Ok(value)
    }

    /// Validate a possibly absent value, filling in the default or `Null`.
    pub fn resolve(&self, collection: &str, field: &str, value: Option<Value>) -> Result<Value> {
        match value.or_else(|| self.default_value()) {
            Some(value) => self.validate(collection, field, value),
            None if self.optional => Ok(Value::Null),
            None => Err(Error::invalid_field(
                collection,
                field,
                "missing required field",
            )),
        }
    }

    fn validate_item(&self, collection: &str, field: &str, item: Value) -> Result<Value> {
        let item = self.ty.validate(collection, field, item)?;

        if let (Some(length), Value::String(s)) = (self.length, &item) {
            let len = s.len();
            if length.min.is_some_and(|min| len < min) || length.max.is_some_and(|max| len > max) {
                return Err(Error::invalid_field(
                    collection,
                    field,
                    format!(
                        "length {len} is outside {}..={}",
                        length.min.unwrap_or(0),
                        length.max.map_or("".to_string(), |max| max.to_string())
                    ),
                ));
            }
        }

        Ok(item)
    }

    pub fn serialize(&self, value: &Value) -> serde_json::Value {
        match value {
            Value::List(items) if self.array => {
                serde_json::Value::Array(items.iter().map(|item| self.ty.serialize(item)).collect())
            }
            value => self.ty.serialize(value),
        }
    }

    pub fn deserialize(&self, json: &serde_json::Value) -> Result<Value> {
        match json {
            serde_json::Value::Array(items) if self.array => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.ty.deserialize(item))
                    .collect::<Result<_>>()?,
            )),
            json => self.ty.deserialize(json),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("ty", &self.ty)
            .field("optional", &self.optional)
            .field("array", &self.array)
            .field("default", &self.default.is_some())
            .field("length", &self.length)
            .finish()
    }
}
