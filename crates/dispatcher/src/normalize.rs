//! Type normalization
//!
//! Maps a `TagValue` to its canonical kind and, for numeric kinds, the value
//! as `f64`. Widening is lossless for every width up to 32 bits; 64-bit
//! integers round to the nearest representable double.

use contracts::{NormalizedReading, TagValue, ValueKind};

pub fn normalize(value: &TagValue) -> NormalizedReading {
    let (kind, numeric) = match value {
        TagValue::Int(v) => (ValueKind::Int, Some(*v as f64)),
        TagValue::Int8(v) => (ValueKind::Int8, Some(f64::from(*v))),
        TagValue::Int16(v) => (ValueKind::Int16, Some(f64::from(*v))),
        TagValue::Int32(v) => (ValueKind::Int32, Some(f64::from(*v))),
        TagValue::UInt8(v) => (ValueKind::UInt8, Some(f64::from(*v))),
        TagValue::UInt16(v) => (ValueKind::UInt16, Some(f64::from(*v))),
        TagValue::UInt32(v) => (ValueKind::UInt32, Some(f64::from(*v))),
        TagValue::UInt64(v) => (ValueKind::UInt64, Some(*v as f64)),
        TagValue::Float32(v) => (ValueKind::Float32, Some(f64::from(*v))),
        TagValue::Float64(v) => (ValueKind::Float64, Some(*v)),
        TagValue::String(_) => (ValueKind::String, None),
        TagValue::Bool(_) => (ValueKind::Bool, None),
    };

    NormalizedReading { kind, numeric }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_kinds() {
        let cases = [
            (TagValue::Int(-9_000_000_000), ValueKind::Int, -9_000_000_000.0),
            (TagValue::Int8(i8::MIN), ValueKind::Int8, -128.0),
            (TagValue::Int16(-300), ValueKind::Int16, -300.0),
            (TagValue::Int32(i32::MAX), ValueKind::Int32, 2_147_483_647.0),
            (TagValue::UInt8(u8::MAX), ValueKind::UInt8, 255.0),
            (TagValue::UInt16(65_535), ValueKind::UInt16, 65_535.0),
            (TagValue::UInt32(u32::MAX), ValueKind::UInt32, 4_294_967_295.0),
        ];

        for (value, kind, expected) in cases {
            let n = normalize(&value);
            assert_eq!(n.kind, kind, "{value:?}");
            assert_eq!(n.numeric, Some(expected), "{value:?}");
        }
    }

    #[test]
    fn test_float_kinds() {
        let n = normalize(&TagValue::Float64(23.5));
        assert_eq!(n.kind, ValueKind::Float64);
        assert_eq!(n.numeric, Some(23.5));

        // f32 widens exactly, so 0.1f32 keeps its binary value rather than 0.1f64
        let n = normalize(&TagValue::Float32(0.1));
        assert_eq!(n.kind, ValueKind::Float32);
        assert_eq!(n.numeric, Some(f64::from(0.1f32)));
    }

    #[test]
    fn test_u64_rounds_to_nearest_double() {
        let n = normalize(&TagValue::UInt64(u64::MAX));
        assert_eq!(n.kind, ValueKind::UInt64);
        assert_eq!(n.numeric, Some(18_446_744_073_709_551_615u64 as f64));
    }

    #[test]
    fn test_non_numeric_has_no_projection() {
        let n = normalize(&TagValue::String("0".into()));
        assert_eq!(n.kind, ValueKind::String);
        assert_eq!(n.numeric, None);

        let n = normalize(&TagValue::Bool(false));
        assert_eq!(n.kind, ValueKind::Bool);
        assert_eq!(n.numeric, None);
    }

    #[test]
    fn test_zero_is_present_not_absent() {
        assert_eq!(normalize(&TagValue::Int32(0)).numeric, Some(0.0));
    }

    #[test]
    fn test_projection_agrees_with_kind() {
        let values = [
            TagValue::Int(1),
            TagValue::UInt64(2),
            TagValue::Float32(3.0),
            TagValue::String("x".into()),
            TagValue::Bool(true),
        ];
        for value in values {
            let n = normalize(&value);
            assert_eq!(n.kind.is_numeric(), n.numeric.is_some(), "{value:?}");
        }
    }
}
