//! Tri-state value adaptation
//!
//! Bridges the host tool's attribute model (where every value is null,
//! unknown, or known) with the two encodings the provider speaks:
//!
//! - the JSON interchange format used with the remote API, which has no way
//!   to say "unknown" and therefore degrades it to `null`
//! - the [`WireValue`] tree exchanged with the host tool, which keeps all
//!   three states apart
//!
//! # Module Structure
//!
//! - [`scalar`] - adapters for `bool`, `i64`, `String` and [`BigNumber`]
//! - [`container`] - generic [`List`], [`Map`] and [`Set`] over any adapter
//! - [`number`] - arbitrary-precision decimal numbers
//! - [`wire`] - wire value tree, type descriptors and binary codec
//!
//! # Example
//!
//! ```
//! use cloudprov::value::{List, TriState};
//!
//! let tags: TriState<List<String>> =
//!     TriState::decode_interchange(br#"["web", null]"#).unwrap();
//! assert_eq!(tags.as_known().map(|l| l.len()), Some(2));
//!
//! let unknown: TriState<List<String>> = TriState::Unknown;
//! assert_eq!(unknown.encode_interchange().unwrap(), b"null");
//! ```

pub mod container;
pub mod number;
pub mod scalar;
pub mod wire;

pub use container::{List, Map, Set};
pub use number::BigNumber;
pub use wire::{WireType, WireValue};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as Json;
use std::fmt;
use thiserror::Error;

/// Errors raised while converting values between encodings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// Bytes did not parse in the given format
    #[error("failed to decode {format} value: {message}")]
    Decoding {
        format: &'static str,
        message: String,
    },
    /// Payload kind differs from the declared kind
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: WireType, found: String },
    /// A list holding equal elements was viewed as a set
    #[error("duplicate set element at index {index}")]
    DuplicateElement { index: usize },
    /// An unknown value reached a strict interchange encoder
    #[error("value is unknown and cannot be sent to the remote API")]
    UnknownValue,
}

impl ValueError {
    pub(crate) fn interchange(message: impl fmt::Display) -> Self {
        Self::Decoding {
            format: "interchange",
            message: message.to_string(),
        }
    }

    pub(crate) fn wire(message: impl fmt::Display) -> Self {
        Self::Decoding {
            format: "wire",
            message: message.to_string(),
        }
    }

    /// A JSON payload of the wrong shape for `expected`
    pub(crate) fn json_mismatch(expected: WireType, found: &Json) -> Self {
        Self::TypeMismatch {
            expected,
            found: json_kind(found).to_string(),
        }
    }
}

/// Name of a JSON value's kind, for error messages
pub(crate) fn json_kind(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Conversion contract for the payload of a known value.
///
/// Implemented by the scalar payload types and by the containers, so a
/// container can hold any adapter, including another container. The
/// null/unknown states never reach these methods; [`TriState`] handles them.
pub trait Adapter: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Wire type descriptor of a known payload
    fn wire_type() -> WireType;

    /// Interchange form of the payload. Nested unknowns degrade to `null`.
    fn to_json(&self) -> Json;

    /// Interchange form that refuses nested unknowns
    fn to_json_strict(&self) -> Result<Json, ValueError> {
        Ok(self.to_json())
    }

    /// Parse a non-null interchange value
    fn from_json(json: &Json) -> Result<Self, ValueError>;

    fn to_wire(&self) -> WireValue;

    /// Parse a wire value that is neither null nor unknown
    fn from_wire(wire: WireValue) -> Result<Self, ValueError>;
}

/// A value that is null, not yet known, or known with a payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TriState<T> {
    Null,
    Unknown,
    Known(T),
}

pub type BoolValue = TriState<bool>;
pub type Int64Value = TriState<i64>;
pub type NumberValue = TriState<BigNumber>;
pub type StringValue = TriState<String>;
pub type ListValue<T> = TriState<List<T>>;
pub type MapValue<T> = TriState<Map<T>>;
pub type SetValue<T> = TriState<Set<T>>;

impl<T> Default for TriState<T> {
    fn default() -> Self {
        Self::Null
    }
}

impl<T> From<T> for TriState<T> {
    fn from(value: T) -> Self {
        Self::Known(value)
    }
}

impl<T> TriState<T> {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_known(self) -> Option<T> {
        match self {
            Self::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the payload, keeping null and unknown as they are
    pub fn map_known<U>(self, f: impl FnOnce(T) -> U) -> TriState<U> {
        match self {
            Self::Null => TriState::Null,
            Self::Unknown => TriState::Unknown,
            Self::Known(value) => TriState::Known(f(value)),
        }
    }

    /// Fallible [`map_known`](Self::map_known)
    pub fn try_map_known<U, E>(
        self,
        f: impl FnOnce(T) -> Result<U, E>,
    ) -> Result<TriState<U>, E> {
        Ok(match self {
            Self::Null => TriState::Null,
            Self::Unknown => TriState::Unknown,
            Self::Known(value) => TriState::Known(f(value)?),
        })
    }
}

impl<T: Adapter> TriState<T> {
    /// Wire type declared by this value's adapter
    pub fn wire_type() -> WireType {
        T::wire_type()
    }

    /// Build from a parsed interchange value; `null` maps to [`TriState::Null`]
    pub fn from_json_value(json: &Json) -> Result<Self, ValueError> {
        match json {
            Json::Null => Ok(Self::Null),
            other => T::from_json(other).map(Self::Known),
        }
    }

    /// Interchange form; unknown degrades to `null`
    pub fn to_json_value(&self) -> Json {
        match self {
            Self::Null | Self::Unknown => Json::Null,
            Self::Known(value) => value.to_json(),
        }
    }

    /// Interchange form for request bodies; unknown anywhere is an error
    pub fn to_request_json(&self) -> Result<Json, ValueError> {
        match self {
            Self::Null => Ok(Json::Null),
            Self::Unknown => Err(ValueError::UnknownValue),
            Self::Known(value) => value.to_json_strict(),
        }
    }

    pub fn decode_interchange(bytes: &[u8]) -> Result<Self, ValueError> {
        let json: Json = serde_json::from_slice(bytes).map_err(ValueError::interchange)?;
        Self::from_json_value(&json)
    }

    pub fn encode_interchange(&self) -> Result<Vec<u8>, ValueError> {
        serde_json::to_vec(&self.to_json_value()).map_err(ValueError::interchange)
    }

    pub fn encode_interchange_strict(&self) -> Result<Vec<u8>, ValueError> {
        serde_json::to_vec(&self.to_request_json()?).map_err(ValueError::interchange)
    }

    pub fn from_wire_value(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::Null => Ok(Self::Null),
            WireValue::Unknown => Ok(Self::Unknown),
            other => T::from_wire(other).map(Self::Known),
        }
    }

    pub fn to_wire_value(&self) -> WireValue {
        match self {
            Self::Null => WireValue::Null,
            Self::Unknown => WireValue::Unknown,
            Self::Known(value) => value.to_wire(),
        }
    }

    pub fn decode_wire(bytes: &[u8]) -> Result<Self, ValueError> {
        Self::from_wire_value(WireValue::decode(bytes)?)
    }

    pub fn encode_wire(&self) -> Result<Vec<u8>, ValueError> {
        self.to_wire_value().encode()
    }
}

impl<T: Adapter> Serialize for TriState<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de, T: Adapter> Deserialize<'de> for TriState<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = Json::deserialize(deserializer)?;
        Self::from_json_value(&json).map_err(serde::de::Error::custom)
    }
}
