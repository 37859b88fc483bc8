//! Scalar adapters
//!
//! `bool`, `String` and `i64` use their natural representations. Numbers
//! go through [`BigNumber`] so interchange literals keep full precision;
//! `i64` shares the `number` wire type and rejects fractional payloads.

use super::{Adapter, BigNumber, ValueError, WireType, WireValue};
use serde_json::Value as Json;

impl Adapter for bool {
    fn wire_type() -> WireType {
        WireType::Bool
    }

    fn to_json(&self) -> Json {
        Json::Bool(*self)
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        json.as_bool()
            .ok_or_else(|| ValueError::json_mismatch(Self::wire_type(), json))
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Bool(*self)
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::Bool(value) => Ok(value),
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

impl Adapter for String {
    fn wire_type() -> WireType {
        WireType::String
    }

    fn to_json(&self) -> Json {
        Json::String(self.clone())
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        json.as_str()
            .map(str::to_string)
            .ok_or_else(|| ValueError::json_mismatch(Self::wire_type(), json))
    }

    fn to_wire(&self) -> WireValue {
        WireValue::String(self.clone())
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::String(value) => Ok(value),
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

impl Adapter for BigNumber {
    fn wire_type() -> WireType {
        WireType::Number
    }

    fn to_json(&self) -> Json {
        match self.to_json_strict() {
            Ok(json) => json,
            Err(err) => {
                tracing::error!("Number {} has no interchange form: {}", self, err);
                Json::Null
            }
        }
    }

    /// Canonical text is a JSON number literal for every value `FromStr`
    /// accepts; a literal serde_json refuses is reported, not nulled
    fn to_json_strict(&self) -> Result<Json, ValueError> {
        self.to_string()
            .parse::<serde_json::Number>()
            .map(Json::Number)
            .map_err(ValueError::interchange)
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        match json {
            Json::Number(number) => number.to_string().parse(),
            other => Err(ValueError::json_mismatch(Self::wire_type(), other)),
        }
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Number(self.to_string())
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::Number(text) => text.parse(),
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

impl Adapter for i64 {
    fn wire_type() -> WireType {
        WireType::Number
    }

    fn to_json(&self) -> Json {
        Json::from(*self)
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        let number = BigNumber::from_json(json)?;
        number
            .to_i64()
            .ok_or_else(|| ValueError::interchange(format!("{number} is not a 64-bit integer")))
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Number(self.to_string())
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        let number = BigNumber::from_wire(wire)?;
        number
            .to_i64()
            .ok_or_else(|| ValueError::wire(format!("{number} is not a 64-bit integer")))
    }
}

#[cfg(test)]
mod tests {
    use crate::value::{BigNumber, TriState, ValueError, WireType, WireValue};

    #[test]
    fn test_decode_interchange_scalars() {
        assert_eq!(
            TriState::<bool>::decode_interchange(b"true").unwrap(),
            TriState::Known(true)
        );
        assert_eq!(
            TriState::<String>::decode_interchange(br#""eu-west""#).unwrap(),
            TriState::Known("eu-west".to_string())
        );
        assert_eq!(
            TriState::<i64>::decode_interchange(b"-17").unwrap(),
            TriState::Known(-17)
        );
        assert!(TriState::<bool>::decode_interchange(b"null").unwrap().is_null());
    }

    #[test]
    fn test_number_keeps_precision() {
        let literal = b"0.1000000000000000055511151231257827";
        let value = TriState::<BigNumber>::decode_interchange(literal).unwrap();
        assert_eq!(
            value.encode_interchange().unwrap(),
            b"0.1000000000000000055511151231257827"
        );
    }

    #[test]
    fn test_int_rejects_fraction() {
        let err = TriState::<i64>::decode_interchange(b"1.5").unwrap_err();
        assert!(matches!(err, ValueError::Decoding { .. }));
        assert!(TriState::<i64>::decode_interchange(b"1.0").is_ok());
    }

    #[test]
    fn test_kind_mismatch_is_not_coerced() {
        let err = TriState::<String>::decode_interchange(b"42").unwrap_err();
        assert_eq!(
            err,
            ValueError::TypeMismatch {
                expected: WireType::String,
                found: "number".to_string()
            }
        );

        let err = TriState::<bool>::from_wire_value(WireValue::String("true".into())).unwrap_err();
        assert!(matches!(err, ValueError::TypeMismatch { .. }));
    }

    #[test]
    fn test_malformed_interchange() {
        let err = TriState::<bool>::decode_interchange(b"tru").unwrap_err();
        assert!(matches!(err, ValueError::Decoding { format: "interchange", .. }));
    }

    #[test]
    fn test_wire_round_trip_all_states() {
        let values = [
            TriState::Null,
            TriState::Unknown,
            TriState::Known(BigNumber::from(-3)),
            TriState::Known("12345678901234567890.5".parse().unwrap()),
        ];
        for value in values {
            let bytes = value.encode_wire().unwrap();
            assert_eq!(TriState::<BigNumber>::decode_wire(&bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_out_of_range_exponent_is_a_decoding_error() {
        let literal = b"1e9223372036854775807";

        let err = TriState::<BigNumber>::decode_interchange(literal).unwrap_err();
        assert!(matches!(err, ValueError::Decoding { .. }));
        let err = TriState::<i64>::decode_interchange(literal).unwrap_err();
        assert!(matches!(err, ValueError::Decoding { .. }));
        let err =
            TriState::<BigNumber>::from_wire_value(WireValue::Number("1e9223372036854775807".into()))
                .unwrap_err();
        assert!(matches!(err, ValueError::Decoding { .. }));
    }

    #[test]
    fn test_extreme_numbers_keep_their_interchange_form() {
        for literal in ["1e+2147483646", "-9.75e-2147483000", "0.000001"] {
            let value = TriState::Known(literal.parse::<BigNumber>().unwrap());
            let strict = value.to_request_json().unwrap();
            assert_eq!(strict, value.to_json_value());
            assert!(strict.is_number());

            let bytes = value.encode_interchange_strict().unwrap();
            assert_eq!(TriState::<BigNumber>::decode_interchange(&bytes).unwrap(), value);
        }
    }
}
