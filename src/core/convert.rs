use std::sync::Arc;
use serde_json::Value;
use crate::core::types::{DocId, Document, FieldValue};

/// Record -> Document conversion supplied at dataset-build time.
///
/// It may run more than once for the same record when a partition is rebuilt,
/// so it has to be deterministic and free of side effects.
pub type Converter<R> = Arc<dyn Fn(&R) -> Document + Send + Sync>;

/// Records that know how to describe themselves as a [`Document`].
pub trait ToDocument {
    fn to_document(&self) -> Document;
}

/// Converter backed by the record type's own [`ToDocument`] impl.
pub fn converter<R: ToDocument + 'static>() -> Converter<R> {
    Arc::new(|record: &R| record.to_document())
}

impl ToDocument for Document {
    fn to_document(&self) -> Document {
        self.clone()
    }
}

impl ToDocument for String {
    fn to_document(&self) -> Document {
        Document::new(DocId(0)).with_field("_1", self.as_str())
    }
}

impl ToDocument for (String, String) {
    fn to_document(&self) -> Document {
        Document::new(DocId(0))
            .with_field("_1", self.0.as_str())
            .with_field("_2", self.1.as_str())
    }
}

impl ToDocument for (String, f64) {
    fn to_document(&self) -> Document {
        Document::new(DocId(0))
            .with_field("_1", self.0.as_str())
            .with_field("_2", self.1)
    }
}

impl ToDocument for Value {
    fn to_document(&self) -> Document {
        let mut doc = Document::new(DocId(0));
        match self {
            Value::Object(map) => {
                for (key, value) in map {
                    add_json_value(&mut doc, key, value);
                }
            }
            other => add_json_value(&mut doc, "_1", other),
        }
        doc
    }
}

fn add_json_value(doc: &mut Document, name: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(b) => doc.add_field(name, FieldValue::Boolean(*b)),
        Value::Number(num) => {
            if let Some(num) = num.as_f64() {
                doc.add_field(name, FieldValue::Number(num));
            }
        }
        Value::String(text) => doc.add_field(name, FieldValue::Text(text.clone())),
        Value::Array(items) => {
            for item in items {
                add_json_value(doc, name, item);
            }
        }
        Value::Object(map) => {
            for (key, nested) in map {
                add_json_value(doc, &format!("{}.{}", name, key), nested);
            }
        }
    }
}
