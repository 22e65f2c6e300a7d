//! Loading documents from JSON lines files.
//!
//! Each non-empty line is one record:
//!
//! ```text
//! {"text": "rust borrow checker", "data": "...", "terms": ["lang:rust"], "values": {"0": "rust", "1": 2021}}
//! ```
//!
//! Every field is optional. `text` is tokenized into terms, `terms` are
//! added verbatim, `data` defaults to `text`. Document ids follow record
//! order starting at 1, whatever the shard count.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use log::info;
use serde::Deserialize;
use serde_json::Value;

use crate::database::{Database, MemoryDatabase, ShardSet};
use crate::document::{Document, FieldValue};
use crate::error::{EnquireError, Result};
use crate::types::ValueSlot;

/// One line of a documents file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentRecord {
    pub text: Option<String>,
    pub data: Option<String>,
    pub terms: Vec<String>,
    pub values: BTreeMap<ValueSlot, Value>,
}

impl DocumentRecord {
    /// Build the document this record describes.
    pub fn into_document(self) -> Result<Document> {
        let mut doc = Document::new();
        if let Some(text) = &self.text {
            doc.index_text(text);
        }
        for term in self.terms {
            doc.add_term(term, 1);
        }
        for (slot, value) in self.values {
            doc.add_value(slot, field_value_from_json(value)?);
        }
        if let Some(data) = self.data.or(self.text) {
            doc.set_data(data);
        }
        Ok(doc)
    }
}

/// Convert a JSON scalar into a slot value.
pub fn field_value_from_json(value: Value) -> Result<FieldValue> {
    match value {
        Value::Null => Ok(FieldValue::Null),
        Value::Bool(b) => Ok(FieldValue::Boolean(b)),
        Value::String(s) => Ok(FieldValue::Text(s)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(FieldValue::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(FieldValue::Float(f))
            } else {
                Err(EnquireError::invalid_argument(format!(
                    "number {n} does not fit a value slot"
                )))
            }
        }
        other => Err(EnquireError::invalid_argument(format!(
            "value slots hold scalars, got {other}"
        ))),
    }
}

/// Read every record of a JSON lines file.
pub fn read_documents(path: &Path) -> Result<Vec<Document>> {
    let file =
        File::open(path).with_context(|| format!("opening documents {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut docs = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DocumentRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed record", path.display(), line_no + 1))?;
        docs.push(record.into_document()?);
    }
    Ok(docs)
}

/// Spread documents round-robin over `shard_count` in-memory shards so
/// that the n-th document gets global id n.
pub fn build_shards(docs: Vec<Document>, shard_count: usize) -> Result<ShardSet> {
    if shard_count == 0 {
        return Err(EnquireError::invalid_argument("need at least one shard"));
    }
    let dbs: Vec<MemoryDatabase> = (0..shard_count).map(|_| MemoryDatabase::new()).collect();
    for (i, doc) in docs.into_iter().enumerate() {
        dbs[i % shard_count].add_document(doc);
    }
    let shards: Vec<Arc<dyn Database>> = dbs
        .into_iter()
        .map(|db| Arc::new(db) as Arc<dyn Database>)
        .collect();
    ShardSet::new(shards)
}

/// Load a documents file into a shard set.
pub fn load_shards(path: &Path, shard_count: usize) -> Result<ShardSet> {
    let docs = read_documents(path)?;
    info!(
        "loaded {} documents from {} into {} shard(s)",
        docs.len(),
        path.display(),
        shard_count
    );
    build_shards(docs, shard_count)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_record_into_document() {
        let record: DocumentRecord = serde_json::from_str(
            r#"{"text": "Rust rust borrow", "terms": ["lang:rust"], "values": {"0": "rust", "1": 2021, "2": 0.5}}"#,
        )
        .unwrap();
        let doc = record.into_document().unwrap();

        assert_eq!(doc.wdf("rust"), 2);
        assert!(doc.has_term("lang:rust"));
        assert_eq!(doc.data(), "Rust rust borrow");
        assert_eq!(doc.value(0), Some(&FieldValue::Text("rust".to_string())));
        assert_eq!(doc.value(1), Some(&FieldValue::Integer(2021)));
        assert_eq!(doc.value(2), Some(&FieldValue::Float(0.5)));
    }

    #[test]
    fn test_nested_values_are_rejected() {
        assert!(field_value_from_json(serde_json::json!([1, 2])).is_err());
        assert!(field_value_from_json(serde_json::json!({"a": 1})).is_err());
        assert_eq!(
            field_value_from_json(Value::Null).unwrap(),
            FieldValue::Null
        );
    }

    #[test]
    fn test_round_robin_ids_follow_record_order() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text": "alpha"}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"text": "beta"}}"#).unwrap();
        writeln!(file, r#"{{"text": "gamma", "data": "third"}}"#).unwrap();

        let shards = load_shards(file.path(), 2).unwrap();
        assert_eq!(shards.len(), 2);
        assert_eq!(shards.fetch_document(1).unwrap().data(), "alpha");
        assert_eq!(shards.fetch_document(2).unwrap().data(), "beta");
        assert_eq!(shards.fetch_document(3).unwrap().data(), "third");
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"text": "ok"}}"#).unwrap();
        writeln!(file, "not json").unwrap();

        let err = read_documents(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains(":2"));
    }
}
