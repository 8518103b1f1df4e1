//! Canonical value decoding
//!
//! Devices report values as a gNMI `TypedValue`, a oneof spanning scalars,
//! leaf-lists, and JSON-encoded subtrees. `CanonicalValue` is the tagged
//! union those decode into: scalar kinds plus nested map/sequence, so JSON
//! payloads stay structured without going untyped.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use gtel_proto::gnmi;

use crate::error::{CodecError, Result};

/// Canonical decoded value of one telemetry update
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<CanonicalValue>),
    Map(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Render as JSON for upload
    ///
    /// Unsigned values past the i64 range are rendered as strings so the
    /// backend's integer mapping cannot overflow on them. Opaque bytes are
    /// rendered as lowercase hex.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(i) => serde_json::Value::from(*i),
            Self::Uint(u) => {
                if *u > i64::MAX as u64 {
                    serde_json::Value::String(u.to_string())
                } else {
                    serde_json::Value::from(*u)
                }
            }
            Self::Double(d) => serde_json::Number::from_f64(*d)
                .map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Bytes(b) => serde_json::Value::String(hex_string(b)),
            Self::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            Self::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Short kind name for logging and drop-reason counters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::Uint(u)
                } else {
                    Self::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Decode a wire TypedValue into its canonical form
///
/// Every variant a device can legally send is handled; a JSON payload that
/// does not parse yields `CodecError::Decode` carrying the raw bytes, and an
/// absent oneof yields `CodecError::EmptyValue`. Neither tears down the
/// stream - the caller drops the single update and counts it.
pub fn decode_typed_value(val: &gnmi::TypedValue) -> Result<CanonicalValue> {
    use gnmi::typed_value::Value;

    let value = val.value.as_ref().ok_or(CodecError::EmptyValue)?;

    let decoded = match value {
        Value::StringVal(s) => CanonicalValue::String(s.clone()),
        Value::IntVal(i) => CanonicalValue::Int(*i),
        Value::UintVal(u) => CanonicalValue::Uint(*u),
        Value::BoolVal(b) => CanonicalValue::Bool(*b),
        Value::BytesVal(b) => CanonicalValue::Bytes(b.clone()),
        Value::FloatVal(f) => CanonicalValue::Double(f64::from(*f)),
        Value::DoubleVal(d) => CanonicalValue::Double(*d),
        Value::AsciiVal(s) => CanonicalValue::String(s.clone()),
        Value::ProtoBytes(b) => CanonicalValue::Bytes(b.clone()),
        Value::DecimalVal(d) => {
            CanonicalValue::Double(d.digits as f64 / 10f64.powi(d.precision as i32))
        }
        Value::LeaflistVal(arr) => CanonicalValue::List(
            arr.element
                .iter()
                .map(decode_typed_value)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::JsonVal(bytes) => decode_json(bytes, "json")?,
        Value::JsonIetfVal(bytes) => decode_json(bytes, "json_ietf")?,
    };

    Ok(decoded)
}

fn decode_json(bytes: &[u8], encoding: &'static str) -> Result<CanonicalValue> {
    let parsed: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|source| CodecError::Decode {
            encoding,
            raw: bytes.to_vec(),
            source,
        })?;
    Ok(CanonicalValue::from(parsed))
}

/// Subscription payload encoding
///
/// Only the encodings the codec can decode are representable; anything else
/// fails configuration with `UnsupportedEncoding` before a session starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    JsonIetf,
    Proto,
}

impl Encoding {
    /// Wire enum value for the subscription request
    pub fn to_wire(self) -> gnmi::Encoding {
        match self {
            Self::Json => gnmi::Encoding::Json,
            Self::JsonIetf => gnmi::Encoding::JsonIetf,
            Self::Proto => gnmi::Encoding::Proto,
        }
    }

    /// Name as it appears in configuration
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonIetf => "json_ietf",
            Self::Proto => "proto",
        }
    }
}

impl FromStr for Encoding {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "json_ietf" | "json-ietf" => Ok(Self::JsonIetf),
            "proto" => Ok(Self::Proto),
            other => Err(CodecError::UnsupportedEncoding(other.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gnmi::typed_value::Value;

    fn typed(value: Value) -> gnmi::TypedValue {
        gnmi::TypedValue { value: Some(value) }
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(
            decode_typed_value(&typed(Value::StringVal("up".into()))).unwrap(),
            CanonicalValue::String("up".into())
        );
        assert_eq!(
            decode_typed_value(&typed(Value::IntVal(-42))).unwrap(),
            CanonicalValue::Int(-42)
        );
        assert_eq!(
            decode_typed_value(&typed(Value::UintVal(u64::MAX))).unwrap(),
            CanonicalValue::Uint(u64::MAX)
        );
        assert_eq!(
            decode_typed_value(&typed(Value::BoolVal(true))).unwrap(),
            CanonicalValue::Bool(true)
        );
        assert_eq!(
            decode_typed_value(&typed(Value::DoubleVal(2.5))).unwrap(),
            CanonicalValue::Double(2.5)
        );
    }

    #[test]
    fn test_decode_decimal64() {
        let value = typed(Value::DecimalVal(gnmi::Decimal64 {
            digits: 12345,
            precision: 2,
        }));
        assert_eq!(
            decode_typed_value(&value).unwrap(),
            CanonicalValue::Double(123.45)
        );
    }

    #[test]
    fn test_decode_leaflist() {
        let value = typed(Value::LeaflistVal(gnmi::ScalarArray {
            element: vec![typed(Value::StringVal("a".into())), typed(Value::IntVal(1))],
        }));
        assert_eq!(
            decode_typed_value(&value).unwrap(),
            CanonicalValue::List(vec![
                CanonicalValue::String("a".into()),
                CanonicalValue::Int(1)
            ])
        );
    }

    #[test]
    fn test_decode_json_ietf_struct() {
        let payload = br#"{"in-octets": "12345", "oper-status": "UP", "nested": {"x": 1}}"#;
        let decoded = decode_typed_value(&typed(Value::JsonIetfVal(payload.to_vec()))).unwrap();

        let CanonicalValue::Map(map) = decoded else {
            panic!("expected map");
        };
        assert_eq!(
            map.get("oper-status"),
            Some(&CanonicalValue::String("UP".into()))
        );
        assert!(matches!(map.get("nested"), Some(CanonicalValue::Map(_))));
    }

    #[test]
    fn test_decode_malformed_json_keeps_raw() {
        let payload = b"{not json";
        let err = decode_typed_value(&typed(Value::JsonVal(payload.to_vec()))).unwrap_err();

        match err {
            CodecError::Decode { encoding, raw, .. } => {
                assert_eq!(encoding, "json");
                assert_eq!(raw, payload);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_empty_value() {
        let value = gnmi::TypedValue { value: None };
        assert!(matches!(
            decode_typed_value(&value),
            Err(CodecError::EmptyValue)
        ));
    }

    #[test]
    fn test_large_uint_serializes_as_string() {
        let value = CanonicalValue::Uint(u64::MAX);
        assert_eq!(
            value.to_json(),
            serde_json::Value::String(u64::MAX.to_string())
        );

        let value = CanonicalValue::Uint(7);
        assert_eq!(value.to_json(), serde_json::json!(7));
    }

    #[test]
    fn test_bytes_serialize_as_hex() {
        let value = CanonicalValue::Bytes(vec![0xde, 0xad, 0x00]);
        assert_eq!(value.to_json(), serde_json::json!("dead00"));
    }

    #[test]
    fn test_json_round_trip_structure() {
        let json = serde_json::json!({
            "counters": {"in-octets": 123, "out-octets": 456},
            "flags": ["up", "broadcast"],
            "enabled": true
        });
        let value = CanonicalValue::from(json.clone());
        assert_eq!(value.to_json(), json);
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("json".parse::<Encoding>().unwrap(), Encoding::Json);
        assert_eq!("JSON_IETF".parse::<Encoding>().unwrap(), Encoding::JsonIetf);
        assert_eq!("proto".parse::<Encoding>().unwrap(), Encoding::Proto);

        assert!(matches!(
            "bytes".parse::<Encoding>(),
            Err(CodecError::UnsupportedEncoding(_))
        ));
        assert!(matches!(
            "ascii".parse::<Encoding>(),
            Err(CodecError::UnsupportedEncoding(_))
        ));
    }
}
