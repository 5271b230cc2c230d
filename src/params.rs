use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed plugin parameter value.
///
/// Replaces untyped string/object parameter bags: consumers get an `Option`
/// back from the typed accessors instead of an unchecked cast that silently
/// falls back to a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Number(f64),
    Text(String),
    /// Packed 32-bit ARGB color.
    Color(u32),
    /// Name of another parameter or resource.
    Reference(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<u32> {
        match self {
            ParamValue::Color(c) => Some(*c),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&str> {
        match self {
            ParamValue::Reference(name) => Some(name),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Number(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

/// Named parameter collection passed to plugins at configuration time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamBag {
    values: HashMap<String, ParamValue>,
}

impl ParamBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_number)
    }

    pub fn number_or(&self, name: &str, fallback: f64) -> f64 {
        self.number(name).unwrap_or(fallback)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_accessors_reject_wrong_variant() {
        let value = ParamValue::Number(4.0);
        assert_eq!(value.as_number(), Some(4.0));
        assert_eq!(value.as_text(), None);
        assert_eq!(value.as_color(), None);

        let color = ParamValue::Color(0xFF00FF00);
        assert_eq!(color.as_color(), Some(0xFF00FF00));
        assert_eq!(color.as_number(), None);
    }

    #[test]
    fn bag_lookup_with_fallback() {
        let mut bag = ParamBag::new();
        bag.set("points", ParamValue::Number(512.0));
        bag.set("label", ParamValue::from("wave"));

        assert_eq!(bag.number_or("points", 0.0), 512.0);
        assert_eq!(bag.number_or("missing", 7.0), 7.0);
        // A text value is not silently coerced to a number.
        assert_eq!(bag.number_or("label", 7.0), 7.0);
    }
}
