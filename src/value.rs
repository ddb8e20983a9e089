use chrono::{DateTime, NaiveDateTime, Utc};
use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

/// A caller-supplied value attached to a [`LogEvent`](crate::record::LogEvent),
/// either as an extra field, a structured message, or a format argument.
///
/// Values are not required to be JSON-native. Date/time and UUID values are
/// rendered through their `Display` form when encoded; [`FieldValue::Opaque`]
/// and non-finite floats cannot be encoded at all and send the formatter down
/// its fallback path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Str(String),
    DateTime(DateTime<Utc>),
    NaiveDateTime(NaiveDateTime),
    Uuid(Uuid),
    List(Vec<FieldValue>),
    /// Ordered map; insertion order is kept in the output.
    Map(Vec<(String, FieldValue)>),
    /// Already JSON-shaped data.
    Json(serde_json::Value),
    /// A value with no JSON representation, identified by its type name.
    Opaque(String),
}

impl FieldValue {
    /// Build an ordered map value.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        FieldValue::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// Mark a value of type `T` as not representable in JSON.
    pub fn opaque<T: ?Sized>() -> Self {
        FieldValue::Opaque(short_type_name::<T>())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null | FieldValue::Json(serde_json::Value::Null))
    }

    /// Detach this value into an owned JSON tree.
    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub(crate) fn as_map(&self) -> Option<&[(String, FieldValue)]> {
        match self {
            FieldValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(s) => write!(f, "{:?}", s),
            FieldValue::DateTime(_) | FieldValue::NaiveDateTime(_) | FieldValue::Uuid(_) => {
                write!(f, "\"{}\"", self)
            }
            other => fmt::Display::fmt(other, f),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::I64(n) => write!(f, "{}", n),
            FieldValue::U64(n) => write!(f, "{}", n),
            FieldValue::F64(n) => write!(f, "{:?}", n),
            FieldValue::Str(s) => f.write_str(s),
            FieldValue::DateTime(dt) => write!(f, "{}", dt),
            FieldValue::NaiveDateTime(dt) => write!(f, "{}", dt),
            FieldValue::Uuid(id) => write!(f, "{}", id),
            FieldValue::Json(value) => write!(f, "{}", value),
            FieldValue::Opaque(type_name) => write!(f, "<{}>", type_name),
            FieldValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            FieldValue::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}: ", key)?;
                    value.fmt_nested(f)?;
                }
                f.write_str("}")
            }
        }
    }
}

// Stringify date/times and UUIDs; refuse anything without a JSON form.
impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Null => serializer.serialize_unit(),
            FieldValue::Bool(b) => serializer.serialize_bool(*b),
            FieldValue::I64(n) => serializer.serialize_i64(*n),
            FieldValue::U64(n) => serializer.serialize_u64(*n),
            FieldValue::F64(n) if n.is_finite() => serializer.serialize_f64(*n),
            FieldValue::F64(n) => Err(S::Error::custom(format_args!(
                "float value {} is not JSON serializable",
                n
            ))),
            FieldValue::Str(s) => serializer.serialize_str(s),
            FieldValue::DateTime(dt) => serializer.collect_str(dt),
            FieldValue::NaiveDateTime(dt) => serializer.collect_str(dt),
            FieldValue::Uuid(id) => serializer.collect_str(id),
            FieldValue::Json(value) => value.serialize(serializer),
            FieldValue::Opaque(type_name) => Err(S::Error::custom(format_args!(
                "object of type {} is not JSON serializable",
                type_name
            ))),
            FieldValue::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            FieldValue::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

/// Last path segment of a type name, without generic parameters.
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident as $cast:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    FieldValue::$variant(value as $cast)
                }
            }
        )*
    };
}

impl_from! {
    i8 => I64 as i64,
    i16 => I64 as i64,
    i32 => I64 as i64,
    i64 => I64 as i64,
    isize => I64 as i64,
    u8 => U64 as u64,
    u16 => U64 as u64,
    u32 => U64 as u64,
    u64 => U64 as u64,
    usize => U64 as u64,
    f32 => F64 as f64,
    f64 => F64 as f64,
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::NaiveDateTime(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

impl<T: Into<FieldValue>> From<Vec<T>> for FieldValue {
    fn from(value: Vec<T>) -> Self {
        FieldValue::list(value)
    }
}
