//! Nested container adapters
//!
//! [`List`], [`Map`] and [`Set`] hold elements of one adapter type `T`,
//! each element itself a [`TriState<T>`]. Wrapping a container in a
//! `TriState` gives container-level null/unknown that is independent of
//! element states: `TriState::<List<T>>::Unknown` encodes as a single wire
//! unknown and never as a list of unknown elements.
//!
//! The element type is part of the Rust type, so a container cannot be
//! built with mixed element kinds. Decoding checks the declared element
//! type carried by the wire value against `T`.

use super::{json_kind, Adapter, TriState, ValueError, WireType, WireValue};
use serde_json::{Map as JsonMap, Value as Json};
use std::collections::BTreeMap;

fn check_element<T: Adapter>(expected: WireType, found: &WireType) -> Result<(), ValueError> {
    if *found == T::wire_type() {
        Ok(())
    } else {
        Err(ValueError::TypeMismatch {
            expected,
            found: found.to_string(),
        })
    }
}

fn decode_items<T: Adapter>(items: Vec<WireValue>) -> Result<Vec<TriState<T>>, ValueError> {
    items.into_iter().map(TriState::from_wire_value).collect()
}

fn decode_json_items<T: Adapter>(items: &[Json]) -> Result<Vec<TriState<T>>, ValueError> {
    items.iter().map(TriState::from_json_value).collect()
}

fn strict_items<T: Adapter>(items: &[TriState<T>]) -> Result<Json, ValueError> {
    items
        .iter()
        .map(TriState::to_request_json)
        .collect::<Result<Vec<_>, _>>()
        .map(Json::Array)
}

// =============================================================================
// List
// =============================================================================

/// Ordered sequence of tri-state elements
#[derive(Debug, Clone, PartialEq)]
pub struct List<T> {
    elements: Vec<TriState<T>>,
}

impl<T> List<T> {
    pub fn new(elements: Vec<TriState<T>>) -> Self {
        Self { elements }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// List whose elements are all known
    pub fn of_known(values: impl IntoIterator<Item = T>) -> Self {
        values.into_iter().map(TriState::Known).collect()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TriState<T>> {
        self.elements.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TriState<T>> {
        self.elements.iter()
    }

    pub fn push(&mut self, element: TriState<T>) {
        self.elements.push(element);
    }

    pub fn into_inner(self) -> Vec<TriState<T>> {
        self.elements
    }
}

impl<T: Adapter> List<T> {
    /// Reinterpret as a set; fails on the first repeated element
    pub fn into_set(self) -> Result<Set<T>, ValueError> {
        Set::new(self.elements)
    }
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> FromIterator<TriState<T>> for List<T> {
    fn from_iter<I: IntoIterator<Item = TriState<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a, T> IntoIterator for &'a List<T> {
    type Item = &'a TriState<T>;
    type IntoIter = std::slice::Iter<'a, TriState<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<T: Adapter> Adapter for List<T> {
    fn wire_type() -> WireType {
        WireType::List(Box::new(T::wire_type()))
    }

    fn to_json(&self) -> Json {
        Json::Array(self.elements.iter().map(TriState::to_json_value).collect())
    }

    fn to_json_strict(&self) -> Result<Json, ValueError> {
        strict_items(&self.elements)
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        match json {
            Json::Array(items) => decode_json_items(items).map(Self::new),
            other => Err(ValueError::json_mismatch(Self::wire_type(), other)),
        }
    }

    fn to_wire(&self) -> WireValue {
        WireValue::List {
            element: T::wire_type(),
            items: self.elements.iter().map(TriState::to_wire_value).collect(),
        }
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::List { element, items } => {
                check_element::<T>(Self::wire_type(), &element)?;
                decode_items(items).map(Self::new)
            }
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

// =============================================================================
// Set
// =============================================================================

/// Unordered collection of distinct tri-state elements
#[derive(Debug, Clone)]
pub struct Set<T> {
    elements: Vec<TriState<T>>,
}

impl<T: Adapter> Set<T> {
    /// Build a set, rejecting repeated elements
    pub fn new(elements: Vec<TriState<T>>) -> Result<Self, ValueError> {
        for (index, element) in elements.iter().enumerate() {
            if elements[..index].contains(element) {
                return Err(ValueError::DuplicateElement { index });
            }
        }
        Ok(Self { elements })
    }

    pub fn contains(&self, element: &TriState<T>) -> bool {
        self.elements.contains(element)
    }

    /// Insert unless an equal element is present; returns whether it was added
    pub fn insert(&mut self, element: TriState<T>) -> bool {
        if self.contains(&element) {
            return false;
        }
        self.elements.push(element);
        true
    }
}

impl<T> Set<T> {
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TriState<T>> {
        self.elements.iter()
    }

    /// Reinterpret as a list in insertion order
    pub fn into_list(self) -> List<T> {
        List::new(self.elements)
    }
}

impl<T> Default for Set<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: PartialEq> PartialEq for Set<T> {
    fn eq(&self, other: &Self) -> bool {
        self.elements.len() == other.elements.len()
            && self.elements.iter().all(|e| other.elements.contains(e))
    }
}

impl<T: Adapter> Adapter for Set<T> {
    fn wire_type() -> WireType {
        WireType::Set(Box::new(T::wire_type()))
    }

    fn to_json(&self) -> Json {
        Json::Array(self.elements.iter().map(TriState::to_json_value).collect())
    }

    fn to_json_strict(&self) -> Result<Json, ValueError> {
        strict_items(&self.elements)
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        match json {
            Json::Array(items) => Self::new(decode_json_items(items)?),
            other => Err(ValueError::json_mismatch(Self::wire_type(), other)),
        }
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Set {
            element: T::wire_type(),
            items: self.elements.iter().map(TriState::to_wire_value).collect(),
        }
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::Set { element, items } => {
                check_element::<T>(Self::wire_type(), &element)?;
                Self::new(decode_items(items)?)
            }
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

// =============================================================================
// Map
// =============================================================================

/// String-keyed mapping of tri-state elements
#[derive(Debug, Clone, PartialEq)]
pub struct Map<T> {
    entries: BTreeMap<String, TriState<T>>,
}

impl<T> Map<T> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&TriState<T>> {
        self.entries.get(key)
    }

    /// Insert or replace; the last value for a key wins
    pub fn insert(&mut self, key: impl Into<String>, value: TriState<T>) -> Option<TriState<T>> {
        self.entries.insert(key.into(), value)
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, TriState<T>> {
        self.entries.iter()
    }

    pub fn into_inner(self) -> BTreeMap<String, TriState<T>> {
        self.entries
    }
}

impl<T> Default for Map<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, T> FromIterator<(K, TriState<T>)> for Map<T> {
    fn from_iter<I: IntoIterator<Item = (K, TriState<T>)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<T: Adapter> Adapter for Map<T> {
    fn wire_type() -> WireType {
        WireType::Map(Box::new(T::wire_type()))
    }

    fn to_json(&self) -> Json {
        let object: JsonMap<String, Json> = self
            .entries
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json_value()))
            .collect();
        Json::Object(object)
    }

    fn to_json_strict(&self) -> Result<Json, ValueError> {
        let mut object = JsonMap::new();
        for (key, value) in &self.entries {
            object.insert(key.clone(), value.to_request_json()?);
        }
        Ok(Json::Object(object))
    }

    fn from_json(json: &Json) -> Result<Self, ValueError> {
        let Json::Object(object) = json else {
            return Err(ValueError::TypeMismatch {
                expected: Self::wire_type(),
                found: json_kind(json).to_string(),
            });
        };
        // serde_json keeps the last occurrence of a repeated key
        object
            .iter()
            .map(|(key, value)| Ok::<_, ValueError>((key.clone(), TriState::from_json_value(value)?)))
            .collect()
    }

    fn to_wire(&self) -> WireValue {
        WireValue::Map {
            element: T::wire_type(),
            entries: self
                .entries
                .iter()
                .map(|(key, value)| (key.clone(), value.to_wire_value()))
                .collect(),
        }
    }

    fn from_wire(wire: WireValue) -> Result<Self, ValueError> {
        match wire {
            WireValue::Map { element, entries } => {
                check_element::<T>(Self::wire_type(), &element)?;
                entries
                    .into_iter()
                    .map(|(key, value)| Ok::<_, ValueError>((key, TriState::from_wire_value(value)?)))
                    .collect()
            }
            other => Err(other.mismatch(Self::wire_type())),
        }
    }
}

// =============================================================================
// Views
// =============================================================================

impl<T: Adapter> TriState<List<T>> {
    /// Set view of this list; null and unknown carry over unchanged
    pub fn to_set_view(&self) -> Result<TriState<Set<T>>, ValueError> {
        self.clone().try_map_known(List::into_set)
    }
}

impl<T: Adapter> TriState<Set<T>> {
    /// List view of this set; null and unknown carry over unchanged
    pub fn to_list_view(&self) -> TriState<List<T>> {
        self.clone().map_known(Set::into_list)
    }
}
