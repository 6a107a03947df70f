use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;
use std::cmp::Ordering;
use chrono::{DateTime, SecondsFormat, Utc};

/// Position of a document inside one shard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocId(pub u32);

impl DocId {
    pub fn new(id: u32) -> Self {
        DocId(id)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl From<u32> for DocId {
    fn from(id: u32) -> Self {
        DocId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Text(String),
    Number(f64),
    Date(DateTime<Utc>),
    Boolean(bool),
}

impl FieldValue {
    /// Canonical string form used for facet values and keyword indexing.
    pub fn as_facet_value(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::Number(num) => {
                if num.fract() == 0.0 && num.abs() < 1e15 {
                    format!("{}", *num as i64)
                } else {
                    num.to_string()
                }
            }
            FieldValue::Date(date) => date.to_rfc3339_opts(SecondsFormat::Secs, true),
            FieldValue::Boolean(b) => b.to_string(),
        }
    }

    /// Ordering between values of the same variant; `None` across variants.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Text(a), FieldValue::Text(b)) => Some(a.cmp(b)),
            (FieldValue::Number(a), FieldValue::Number(b)) => Some(a.total_cmp(b)),
            (FieldValue::Date(a), FieldValue::Date(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<f64> for FieldValue {
    fn from(num: f64) -> Self {
        FieldValue::Number(num)
    }
}

impl From<i64> for FieldValue {
    fn from(num: i64) -> Self {
        FieldValue::Number(num as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(date: DateTime<Utc>) -> Self {
        FieldValue::Date(date)
    }
}

/// Indexable view of a record: ordered field name -> one or more values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub fields: BTreeMap<String, Vec<FieldValue>>,
}

impl Document {
    pub fn new(id: DocId) -> Self {
        Document {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Appends a value; repeated names make the field multi-valued.
    pub fn add_field(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.add_field(name, value);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(|values| values.first())
    }

    pub fn get_values(&self, name: &str) -> &[FieldValue] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}
