//! Observed values and their canonical kinds
//!
//! `TagValue` is closed over the types the monitoring source can produce.
//! Untyped input (JSON replay files, external bridges) enters through
//! `TryFrom<&serde_json::Value>`, which is the only place an unsupported
//! type can be rejected.

use serde::Serialize;
use std::fmt;

use crate::ContractError;

/// One observed value
///
/// Serializes as the bare value; the kind travels separately as `ValueKind`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TagValue {
    /// Signed 64-bit, the platform-width integer
    Int(i64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bool(bool),
}

/// Canonical name of a value's storage type
///
/// The lowercase names are part of the wire format: downstream consumers
/// use them to deserialize `value` back into its original type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Int8,
    Int16,
    Int32,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Bool,
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::UInt8 => "uint8",
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::String => "string",
            Self::Bool => "bool",
        }
    }

    /// Whether values of this kind carry a numeric projection
    pub fn is_numeric(self) -> bool {
        !matches!(self, Self::String | Self::Bool)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sink-agnostic view of a value, derived once per dispatch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedReading {
    pub kind: ValueKind,
    /// `None` for string and bool, never a stand-in zero
    pub numeric: Option<f64>,
}

macro_rules! impl_from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for TagValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from_primitive! {
    i64 => Int,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    bool => Bool,
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl TryFrom<&serde_json::Value> for TagValue {
    type Error = ContractError;

    /// JSON integers become `Int` (or `UInt64` above `i64::MAX`), other
    /// numbers `Float64`. Null, arrays and objects have no kind.
    fn try_from(value: &serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Ok(Self::UInt64(u))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::Float64(f))
                } else {
                    Err(ContractError::unsupported_type(n.to_string()))
                }
            }
            Value::Null => Err(ContractError::unsupported_type("null")),
            Value::Array(_) => Err(ContractError::unsupported_type("array")),
            Value::Object(_) => Err(ContractError::unsupported_type("object")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_serializes_bare() {
        assert_eq!(serde_json::to_string(&TagValue::Float64(23.5)).unwrap(), "23.5");
        assert_eq!(serde_json::to_string(&TagValue::Bool(true)).unwrap(), "true");
        assert_eq!(
            serde_json::to_string(&TagValue::from("open")).unwrap(),
            "\"open\""
        );
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ValueKind::UInt16).unwrap(),
            "\"uint16\""
        );
        assert_eq!(
            serde_json::to_string(&ValueKind::Float32).unwrap(),
            "\"float32\""
        );
        assert_eq!(ValueKind::Int.to_string(), "int");
    }

    #[test]
    fn test_numeric_kinds() {
        assert!(ValueKind::Int8.is_numeric());
        assert!(ValueKind::Float64.is_numeric());
        assert!(!ValueKind::String.is_numeric());
        assert!(!ValueKind::Bool.is_numeric());
    }

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(TagValue::try_from(&json!(42)).unwrap(), TagValue::Int(42));
        assert_eq!(
            TagValue::try_from(&json!(u64::MAX)).unwrap(),
            TagValue::UInt64(u64::MAX)
        );
        assert_eq!(
            TagValue::try_from(&json!(1.25)).unwrap(),
            TagValue::Float64(1.25)
        );
        assert_eq!(
            TagValue::try_from(&json!("run")).unwrap(),
            TagValue::String("run".into())
        );
    }

    #[test]
    fn test_from_json_rejects_structured() {
        for value in [json!(null), json!([1, 2]), json!({"a": 1})] {
            let err = TagValue::try_from(&value).unwrap_err();
            assert!(matches!(err, ContractError::UnsupportedType { .. }));
        }
    }
}
