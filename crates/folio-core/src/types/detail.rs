//! Typed detail values attached to content items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use super::ItemId;

/// Declared type of a detail value.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetailType {
    Bool,
    Integer,
    Double,
    String,
    DateTime,
    Link,
    Json,
}

/// A scalar value stored in an item's detail bag or detail collection.
///
/// Values are tagged with their declared type so a blob written by one build
/// can be checked against the types understood by another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum DetailValue {
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    DateTime(DateTime<Utc>),
    /// Reference to another content item by id.
    Link(ItemId),
    /// Free-form structured value.
    Json(serde_json::Value),
}

impl DetailValue {
    /// The declared type of this value.
    pub fn value_type(&self) -> DetailType {
        match self {
            DetailValue::Bool(_) => DetailType::Bool,
            DetailValue::Integer(_) => DetailType::Integer,
            DetailValue::Double(_) => DetailType::Double,
            DetailValue::String(_) => DetailType::String,
            DetailValue::DateTime(_) => DetailType::DateTime,
            DetailValue::Link(_) => DetailType::Link,
            DetailValue::Json(_) => DetailType::Json,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DetailValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DetailValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DetailValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<ItemId> {
        match self {
            DetailValue::Link(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<&str> for DetailValue {
    fn from(value: &str) -> Self {
        DetailValue::String(value.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(value: String) -> Self {
        DetailValue::String(value)
    }
}

impl From<i64> for DetailValue {
    fn from(value: i64) -> Self {
        DetailValue::Integer(value)
    }
}

impl From<i32> for DetailValue {
    fn from(value: i32) -> Self {
        DetailValue::Integer(i64::from(value))
    }
}

impl From<f64> for DetailValue {
    fn from(value: f64) -> Self {
        DetailValue::Double(value)
    }
}

impl From<bool> for DetailValue {
    fn from(value: bool) -> Self {
        DetailValue::Bool(value)
    }
}

impl From<DateTime<Utc>> for DetailValue {
    fn from(value: DateTime<Utc>) -> Self {
        DetailValue::DateTime(value)
    }
}

impl From<ItemId> for DetailValue {
    fn from(value: ItemId) -> Self {
        DetailValue::Link(value)
    }
}

impl PartialEq<&str> for DetailValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

/// A named, ordered list of detail values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailCollection {
    values: Vec<DetailValue>,
}

impl DetailCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value to the end of the collection.
    pub fn add(&mut self, value: impl Into<DetailValue>) {
        self.values.push(value.into());
    }

    pub fn get(&self, index: usize) -> Option<&DetailValue> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetailValue> {
        self.values.iter()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl std::ops::Index<usize> for DetailCollection {
    type Output = DetailValue;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl FromIterator<DetailValue> for DetailCollection {
    fn from_iter<I: IntoIterator<Item = DetailValue>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DetailCollection {
    type Item = &'a DetailValue;
    type IntoIter = std::slice::Iter<'a, DetailValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}
