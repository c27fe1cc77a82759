//! Stored value kinds and the typed projections over them.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// The full contents of one store.
pub type PrefMap = HashMap<String, Value>;

/// One stored preference.
///
/// There is deliberately no null variant: a key with no value is simply absent
/// from the map, and "storing nothing" is a removal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// 64-bit signed integer. Persisted without a fractional part.
    Int(i64),
    /// 64-bit float. Persisted with a fractional part so it reloads as a float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Ordered list of strings.
    StringList(Vec<String>),
}

impl Value {
    /// Which variant this is.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Bool(_) => ValueKind::Bool,
            Value::StringList(_) => ValueKind::StringList,
        }
    }

    /// `false` for NaN and infinite floats, which have no JSON form.
    #[must_use]
    pub fn is_storable(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            _ => true,
        }
    }
}

// serde_json quietly turns NaN and infinities into `null`, which would make the
// whole file undecodable on the next load. Refuse them at encode time instead.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Int(n) => serializer.serialize_i64(*n),
            Value::Float(f) if !f.is_finite() => {
                Err(S::Error::custom(format!("cannot persist non-finite float {f}")))
            }
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::StringList(items) => items.serialize(serializer),
        }
    }
}

/// Tag naming a [`Value`] variant, used in type-mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::String`]
    String,
    /// [`Value::Int`]
    Int,
    /// [`Value::Float`]
    Float,
    /// [`Value::Bool`]
    Bool,
    /// [`Value::StringList`]
    StringList,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::StringList => "string list",
        })
    }
}

/// A Rust type that maps onto exactly one [`Value`] variant.
///
/// Used by [`Store::get`](crate::Store::get) for typed reads.
pub trait PrefValue: Sized {
    /// The variant this type reads from.
    const KIND: ValueKind;

    /// Unwrap a value of the matching variant, or `None` if it is another kind.
    fn from_value(value: Value) -> Option<Self>;

    /// Wrap into a [`Value`].
    fn into_value(self) -> Value;
}

macro_rules! pref_value {
    ($ty:ty, $variant:ident) => {
        impl PrefValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

pref_value!(String, String);
pref_value!(i64, Int);
pref_value!(f64, Float);
pref_value!(bool, Bool);
pref_value!(Vec<String>, StringList);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::StringList(v.into_iter().map(str::to_owned).collect())
    }
}
