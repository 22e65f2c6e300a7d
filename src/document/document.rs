//! Document structure served by the backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::document::field_value::FieldValue;
use crate::types::{DocId, TermCount, ValueSlot};

/// A document as stored by a [`Database`](crate::database::Database).
///
/// A document carries an opaque data payload, the terms that index it with
/// their within-document frequency (wdf), and a set of value slots used for
/// sorting and collapsing. The document id is assigned by the database when
/// the document is added; a freshly built document has id 0.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct Document {
    doc_id: DocId,
    data: String,
    terms: BTreeMap<String, TermCount>,
    values: BTreeMap<ValueSlot, FieldValue>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Document::default()
    }

    /// Create a builder for constructing documents.
    pub fn builder() -> DocumentBuilder {
        DocumentBuilder::new()
    }

    /// The id assigned by the database, 0 if not stored yet.
    pub fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub(crate) fn set_doc_id(&mut self, doc_id: DocId) {
        self.doc_id = doc_id;
    }

    /// The opaque data payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Replace the data payload.
    pub fn set_data<S: Into<String>>(&mut self, data: S) {
        self.data = data.into();
    }

    /// Add `wdf` occurrences of `term`.
    pub fn add_term<S: Into<String>>(&mut self, term: S, wdf: TermCount) {
        *self.terms.entry(term.into()).or_insert(0) += wdf;
    }

    /// Tokenize `text` into lowercase words and add each as a term.
    pub fn index_text(&mut self, text: &str) {
        for word in text.unicode_words() {
            self.add_term(word.to_lowercase(), 1);
        }
    }

    /// Within-document frequency of `term`, 0 when absent.
    pub fn wdf(&self, term: &str) -> TermCount {
        self.terms.get(term).copied().unwrap_or(0)
    }

    /// Whether `term` indexes this document.
    pub fn has_term(&self, term: &str) -> bool {
        self.terms.contains_key(term)
    }

    /// Iterate over `(term, wdf)` pairs in term order.
    pub fn terms(&self) -> impl Iterator<Item = (&str, TermCount)> {
        self.terms.iter().map(|(t, wdf)| (t.as_str(), *wdf))
    }

    /// Number of distinct terms.
    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Document length: the sum of all wdfs.
    pub fn length(&self) -> TermCount {
        self.terms.values().sum()
    }

    /// Set the value in `slot`.
    pub fn add_value<V: Into<FieldValue>>(&mut self, slot: ValueSlot, value: V) {
        self.values.insert(slot, value.into());
    }

    /// Get the value in `slot`.
    pub fn value(&self, slot: ValueSlot) -> Option<&FieldValue> {
        self.values.get(&slot)
    }

    /// Remove the value in `slot`.
    pub fn remove_value(&mut self, slot: ValueSlot) -> Option<FieldValue> {
        self.values.remove(&slot)
    }

    /// The key bytes of `slot`, empty when the slot is unset.
    pub fn value_key(&self, slot: ValueSlot) -> Vec<u8> {
        self.values
            .get(&slot)
            .map(FieldValue::to_key_bytes)
            .unwrap_or_default()
    }

    /// All value slots.
    pub fn values(&self) -> &BTreeMap<ValueSlot, FieldValue> {
        &self.values
    }
}

/// A builder for constructing documents in a fluent manner.
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
}

impl DocumentBuilder {
    /// Create a new document builder.
    pub fn new() -> Self {
        DocumentBuilder {
            document: Document::new(),
        }
    }

    /// Set the data payload.
    pub fn data<S: Into<String>>(mut self, data: S) -> Self {
        self.document.set_data(data);
        self
    }

    /// Add a single occurrence of a term.
    pub fn term<S: Into<String>>(mut self, term: S) -> Self {
        self.document.add_term(term, 1);
        self
    }

    /// Add a term with an explicit wdf.
    pub fn term_with_wdf<S: Into<String>>(mut self, term: S, wdf: TermCount) -> Self {
        self.document.add_term(term, wdf);
        self
    }

    /// Tokenize and index free text.
    pub fn text(mut self, text: &str) -> Self {
        self.document.index_text(text);
        self
    }

    /// Set a value slot.
    pub fn value<V: Into<FieldValue>>(mut self, slot: ValueSlot, value: V) -> Self {
        self.document.add_value(slot, value);
        self
    }

    /// Build the final document.
    pub fn build(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let doc = Document::builder()
            .data("hello")
            .term("rust")
            .term_with_wdf("search", 3)
            .value(0, "group-a")
            .value(1, 2024i64)
            .build();

        assert_eq!(doc.doc_id(), 0);
        assert_eq!(doc.data(), "hello");
        assert_eq!(doc.wdf("search"), 3);
        assert_eq!(doc.wdf("missing"), 0);
        assert_eq!(doc.length(), 4);
        assert_eq!(doc.value(0), Some(&FieldValue::from("group-a")));
        assert_eq!(doc.value_key(0), b"group-a".to_vec());
        assert!(doc.value_key(9).is_empty());
    }

    #[test]
    fn test_index_text() {
        let mut doc = Document::new();
        doc.index_text("The quick brown fox, the lazy dog.");

        assert_eq!(doc.wdf("the"), 2);
        assert!(doc.has_term("fox"));
        assert!(!doc.has_term("The"));
        assert_eq!(doc.term_count(), 6);
        assert_eq!(doc.length(), 7);
    }
}
