use indexmap::IndexMap;

use crate::decl::{Literal, Ty};

/// Runtime value handed to and produced by the evaluator.
///
/// Optionals are flattened: `nil` is [`Value::Nil`] and a present optional is
/// the wrapped value itself.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Array(Vec<Value>),
    /// Dictionary with `String` keys.
    Dictionary(IndexMap<String, Value>),
    /// Struct or class instance. Fields are keyed by stored property name;
    /// a wrapped property lives under its backing store (`_name`).
    Object {
        ty: Ty,
        fields: IndexMap<String, Value>,
    },
    Case {
        ty: Ty,
        case: String,
        payload: Vec<Value>,
    },
}

impl Value {
    #[must_use]
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    #[must_use]
    pub fn object<I, K>(ty: Ty, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Value::Object {
            ty,
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.into(), value))
                .collect(),
        }
    }

    #[must_use]
    pub fn case(ty: Ty, case: &str, payload: Vec<Value>) -> Self {
        Value::Case {
            ty,
            case: case.to_string(),
            payload,
        }
    }

    /// Nominal type of an object or case value.
    #[must_use]
    pub fn ty(&self) -> Option<&Ty> {
        match self {
            Value::Object { ty, .. } | Value::Case { ty, .. } => Some(ty),
            _ => None,
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Object { fields, .. } => fields.get(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
            Value::Object { .. } => "object",
            Value::Case { .. } => "enum case",
        }
    }
}

impl From<&Literal> for Value {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::Nil => Value::Nil,
            Literal::Bool(value) => Value::Bool(*value),
            Literal::Int(value) => Value::Int(*value),
            Literal::Double(value) => Value::Double(*value),
            Literal::String(value) => Value::String(value.clone()),
        }
    }
}
