//! Document module.
//!
//! Documents are owned by the backend; result sets hand them out as
//! `Arc<Document>` so a cached document can be shared without copying.

#[allow(clippy::module_inception)]
pub mod document;
pub mod field_value;

// Re-export commonly used types
pub use document::{Document, DocumentBuilder};
pub use field_value::FieldValue;
