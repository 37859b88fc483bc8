//! Wire values exchanged with the host tool
//!
//! Unlike the interchange format, the wire tree distinguishes `Unknown`
//! from `Null`. Containers carry their element [`WireType`] so an empty
//! list still says what it would hold.

use super::ValueError;
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Upper bound on an encoded wire value
const MAX_WIRE_BYTES: u64 = 64 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_WIRE_BYTES)
}

/// Type descriptor of a wire value
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    Bool,
    Number,
    String,
    List(Box<WireType>),
    Set(Box<WireType>),
    Map(Box<WireType>),
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => f.write_str("bool"),
            Self::Number => f.write_str("number"),
            Self::String => f.write_str("string"),
            Self::List(element) => write!(f, "list({element})"),
            Self::Set(element) => write!(f, "set({element})"),
            Self::Map(element) => write!(f, "map({element})"),
        }
    }
}

/// Three-state wire value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    Null,
    Unknown,
    Bool(bool),
    /// Decimal literal in canonical form
    Number(String),
    String(String),
    List {
        element: WireType,
        items: Vec<WireValue>,
    },
    Set {
        element: WireType,
        items: Vec<WireValue>,
    },
    Map {
        element: WireType,
        entries: BTreeMap<String, WireValue>,
    },
}

impl WireValue {
    /// Human-readable kind, e.g. `list(string)`
    pub fn kind(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Unknown => "unknown".to_string(),
            Self::Bool(_) => WireType::Bool.to_string(),
            Self::Number(_) => WireType::Number.to_string(),
            Self::String(_) => WireType::String.to_string(),
            Self::List { element, .. } => format!("list({element})"),
            Self::Set { element, .. } => format!("set({element})"),
            Self::Map { element, .. } => format!("map({element})"),
        }
    }

    pub(crate) fn mismatch(&self, expected: WireType) -> ValueError {
        ValueError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, ValueError> {
        codec().serialize(self).map_err(ValueError::wire)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ValueError> {
        codec().deserialize(bytes).map_err(ValueError::wire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        let nested = WireType::Map(Box::new(WireType::List(Box::new(WireType::Number))));
        assert_eq!(nested.to_string(), "map(list(number))");
    }

    #[test]
    fn test_empty_list_keeps_element_type() {
        let value = WireValue::List {
            element: WireType::String,
            items: vec![],
        };
        let decoded = WireValue::decode(&value.encode().unwrap()).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(decoded.kind(), "list(string)");
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let err = WireValue::decode(&[0xff, 0xff, 0xff, 0xff, 0x01]).unwrap_err();
        assert!(matches!(err, ValueError::Decoding { format: "wire", .. }));
    }

    #[test]
    fn test_null_and_unknown_encode_differently() {
        let null = WireValue::Null.encode().unwrap();
        let unknown = WireValue::Unknown.encode().unwrap();
        assert_ne!(null, unknown);
    }
}
