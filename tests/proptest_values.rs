//! Property-based tests using proptest
//!
//! These tests verify the tri-state adapters, arbitrary-precision numbers
//! and container semantics using randomized inputs.

use cloudprov::value::{BigNumber, List, Map, TriState};
use proptest::prelude::*;
use serde_json::{json, Value};

/// Generate a tri-state string covering all three states
fn arb_tristate_string() -> impl Strategy<Value = TriState<String>> {
    prop_oneof![
        Just(TriState::Null),
        Just(TriState::Unknown),
        "[a-zA-Z0-9 _-]{0,24}".prop_map(TriState::Known),
    ]
}

/// Generate a decimal literal as the API would send it
fn arb_number_literal() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        "[0-9]{1,30}",
        prop::option::of("[0-9]{1,20}"),
        prop::option::of(-40i32..40),
    )
        .prop_map(|(negative, int, frac, exp)| {
            let mut literal = String::new();
            if negative {
                literal.push('-');
            }
            literal.push_str(&int);
            if let Some(frac) = frac {
                literal.push('.');
                literal.push_str(&frac);
            }
            if let Some(exp) = exp {
                literal.push_str(&format!("e{exp}"));
            }
            literal
        })
}

proptest! {
    /// The host wire encoding preserves every state, including unknown
    #[test]
    fn test_wire_round_trip_keeps_all_states(
        items in prop::collection::vec(arb_tristate_string(), 0..20),
        outer_unknown in any::<bool>(),
    ) {
        let value: TriState<List<String>> = if outer_unknown {
            TriState::Unknown
        } else {
            TriState::Known(List::new(items))
        };

        let bytes = value.encode_wire().unwrap();
        let decoded = TriState::<List<String>>::decode_wire(&bytes).unwrap();
        prop_assert_eq!(decoded, value);
    }

    /// Interchange encoding degrades unknown elements to null and keeps the rest
    #[test]
    fn test_interchange_degrades_unknown_to_null(
        items in prop::collection::vec(arb_tristate_string(), 0..20),
    ) {
        let value = TriState::Known(List::new(items.clone()));
        let json = value.to_json_value();

        let array = json.as_array().expect("known list encodes as an array");
        prop_assert_eq!(array.len(), items.len());
        for (element, item) in array.iter().zip(&items) {
            match item {
                TriState::Known(s) => prop_assert_eq!(element, &Value::String(s.clone())),
                TriState::Null | TriState::Unknown => prop_assert!(element.is_null()),
            }
        }
    }

    /// Strict request encoding rejects any unknown element
    #[test]
    fn test_request_json_rejects_unknown(
        items in prop::collection::vec(arb_tristate_string(), 0..20),
    ) {
        let has_unknown = items.iter().any(TriState::is_unknown);
        let value = TriState::Known(List::new(items));
        prop_assert_eq!(value.to_request_json().is_err(), has_unknown);
    }

    /// Canonical text of a parsed number parses back to the same number
    #[test]
    fn test_number_canonical_text_is_stable(literal in arb_number_literal()) {
        let number: BigNumber = literal.parse().unwrap();
        let canonical = number.to_string();
        let reparsed: BigNumber = canonical.parse().unwrap();

        prop_assert_eq!(&reparsed, &number);
        prop_assert_eq!(reparsed.to_string(), canonical);
    }

    /// Numbers pass through the JSON interchange without losing digits
    #[test]
    fn test_number_survives_interchange(literal in arb_number_literal()) {
        let number: BigNumber = literal.parse().unwrap();
        let bytes = TriState::Known(number.clone()).encode_interchange().unwrap();
        let decoded = TriState::<BigNumber>::decode_interchange(&bytes).unwrap();
        prop_assert_eq!(decoded, TriState::Known(number));
    }

    /// Every i64 round-trips through the number representation
    #[test]
    fn test_i64_round_trip(n in any::<i64>()) {
        prop_assert_eq!(BigNumber::from(n).to_i64(), Some(n));
    }

    /// Repeated keys keep the last value seen
    #[test]
    fn test_map_last_key_wins(
        entries in prop::collection::vec(("[a-c]", "[a-z]{0,8}"), 0..30),
    ) {
        let map: Map<String> = entries
            .iter()
            .map(|(k, v)| (k.clone(), TriState::Known(v.clone())))
            .collect();

        for key in ["a", "b", "c"] {
            let expected = entries.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v);
            prop_assert_eq!(
                map.get(key).and_then(TriState::as_known),
                expected
            );
        }
    }

    /// Known, null and unknown never collapse into one another on decode
    #[test]
    fn test_empty_list_is_distinct_from_null(len in 0usize..5) {
        let items: Vec<Value> = (0..len).map(|i| json!(format!("item-{i}"))).collect();
        let known = TriState::<List<String>>::from_json_value(&Value::Array(items)).unwrap();
        let null = TriState::<List<String>>::from_json_value(&Value::Null).unwrap();

        prop_assert!(known.is_known());
        prop_assert_eq!(known.as_known().map(List::len), Some(len));
        prop_assert!(null.is_null());
        prop_assert_ne!(known, null);
    }
}
