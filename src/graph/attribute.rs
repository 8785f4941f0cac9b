//! Node attributes with typed, defaulted reads

use std::collections::HashMap;

/// Value of a single node attribute
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Single float
    Float(f32),
    /// Single integer
    Int(i64),
    /// UTF-8 string
    String(String),
    /// List of floats
    Floats(Vec<f32>),
    /// List of integers
    Ints(Vec<i64>),
    /// List of strings
    Strings(Vec<String>),
}

/// Named attributes of a graph node
///
/// Reads never fail: an absent attribute, or one stored with a different kind
/// than requested, yields the caller's default.
///
/// ```
/// use convnd::graph::Attributes;
///
/// let attrs = Attributes::new()
///     .with_string("auto_pad", "SAME_UPPER")
///     .with_ints("strides", &[2, 2]);
///
/// assert_eq!(attrs.read_string("auto_pad", "NOTSET"), "SAME_UPPER");
/// assert_eq!(attrs.read_int("group", 1), 1);
/// assert_eq!(attrs.read_ints("strides"), &[2, 2]);
/// assert!(attrs.read_ints("pads").is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    values: HashMap<String, AttributeValue>,
}

impl Attributes {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, name: impl Into<String>, value: AttributeValue) {
        self.values.insert(name.into(), value);
    }

    /// Builder form of [`Attributes::insert`] for an integer
    pub fn with_int(mut self, name: impl Into<String>, value: i64) -> Self {
        self.insert(name, AttributeValue::Int(value));
        self
    }

    /// Builder form of [`Attributes::insert`] for an integer list
    pub fn with_ints(mut self, name: impl Into<String>, values: &[i64]) -> Self {
        self.insert(name, AttributeValue::Ints(values.to_vec()));
        self
    }

    /// Builder form of [`Attributes::insert`] for a string
    pub fn with_string(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, AttributeValue::String(value.into()));
        self
    }

    /// Builder form of [`Attributes::insert`] for a float
    pub fn with_float(mut self, name: impl Into<String>, value: f32) -> Self {
        self.insert(name, AttributeValue::Float(value));
        self
    }

    /// Raw access to an attribute
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.values.get(name)
    }

    /// Read a string attribute, or `default` when absent
    pub fn read_string<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.values.get(name) {
            Some(AttributeValue::String(s)) => s,
            _ => default,
        }
    }

    /// Read an integer attribute, or `default` when absent
    pub fn read_int(&self, name: &str, default: i64) -> i64 {
        match self.values.get(name) {
            Some(AttributeValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Read an integer list attribute; empty when absent
    pub fn read_ints(&self, name: &str) -> &[i64] {
        match self.values.get(name) {
            Some(AttributeValue::Ints(v)) => v,
            _ => &[],
        }
    }
}
