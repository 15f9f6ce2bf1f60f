//! Literal leaves of value-sets and predicates.

use serde::{Deserialize, Serialize};

/// A literal bound into a statement.
///
/// Builders only store these; binding them as driver parameters happens
/// wherever the statement gets compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Blob(Vec<u8>),
    /// Structured payload for JSON columns.
    Json(serde_json::Value),
    /// Render the column's server default instead of a parameter.
    Default,
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `NULL` and `DEFAULT` are keywords rather than bound parameters.
    pub const fn is_keyword(&self) -> bool {
        matches!(self, Self::Null | Self::Default)
    }

    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Self::Int(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident $(as $conv:path)?;)*) => {
        $(value_from!(@one $ty, $variant $(, $conv)?);)*
    };
    (@one $ty:ty, $variant:ident) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant(v)
            }
        }
    };
    (@one $ty:ty, $variant:ident, $conv:path) => {
        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::$variant($conv(v))
            }
        }
    };
}

value_from! {
    bool => Bool;
    i32 => Int as i64::from;
    i64 => Int;
    u32 => Int as i64::from;
    f64 => Float;
    String => Text;
    &str => Text as String::from;
    Vec<u8> => Blob;
    serde_json::Value => Json;
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}
