//! Primitive identifiers shared across the crate.

/// Document identifier. Valid ids start at 1; 0 is never a document.
pub type DocId = u64;

/// A count of documents.
pub type DocCount = u64;

/// A count of term occurrences (within-document frequency, lengths).
pub type TermCount = u32;

/// Number of a value slot on a document, used for sorting and collapsing.
pub type ValueSlot = u32;
