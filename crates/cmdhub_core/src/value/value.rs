//! Dynamically typed values exchanged with plugin handlers.

use crate::value::types::{ObjectKind, ValueType};
use std::collections::BTreeMap;

/// Domain object instance tagged with its static kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectValue {
    pub kind: &'static ObjectKind,
    pub fields: BTreeMap<String, Value>,
}

impl ObjectValue {
    pub fn new(kind: &'static ObjectKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    /// Sets one field and returns the updated object.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// One runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    /// A type passed as an argument, e.g. "fetch items of kind `Gallery`".
    Type(ValueType),
    Object(ObjectValue),
}

impl Value {
    /// Returns the runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Str(_) => ValueType::Str,
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
            Self::Type(_) => ValueType::Type,
            Self::Object(object) => ValueType::Object(object.kind),
        }
    }

    /// Returns true when this value is an instance of `declared` or a subtype.
    ///
    /// Type tags are only instances of `ValueType::Type`. Produced values are
    /// checked with this rule.
    pub fn is_instance_of(&self, declared: ValueType) -> bool {
        self.value_type().is_subtype_of(declared)
    }

    /// Returns true when this value satisfies a declared argument type.
    ///
    /// A value conforms when it is an instance of `declared` (or a subtype),
    /// or when it is a type tag that is itself a subtype of `declared`.
    pub fn conforms_to(&self, declared: ValueType) -> bool {
        if self.is_instance_of(declared) {
            return true;
        }
        match self {
            Self::Type(tag) => tag.is_subtype_of(declared),
            _ => false,
        }
    }

    /// Type description used in signature error messages.
    ///
    /// Type tags render as `type[<tag>]` so that a mismatched tag is visible.
    pub fn describe_type(&self) -> String {
        match self {
            Self::Type(tag) => format!("type[{tag}]"),
            other => other.value_type().to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectValue> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<ValueType> {
        match self {
            Self::Type(tag) => Some(*tag),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<ValueType> for Value {
    fn from(value: ValueType) -> Self {
        Self::Type(value)
    }
}

impl From<ObjectValue> for Value {
    fn from(value: ObjectValue) -> Self {
        Self::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}
