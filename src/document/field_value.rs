//! Value types stored in document value slots.
//!
//! Value slots hold the per-document data that ranking looks at without
//! reading the document body: the key documents are collapsed on, and the
//! key they are sorted by. Both comparisons happen on bytes, so every
//! [`FieldValue`] has an order-preserving byte encoding
//! ([`FieldValue::to_key_bytes`]).
//!
//! ```
//! use enquire::document::FieldValue;
//!
//! let low = FieldValue::Integer(-5).to_key_bytes();
//! let high = FieldValue::Integer(12).to_key_bytes();
//! assert!(low < high);
//!
//! assert!(FieldValue::Null.to_key_bytes().is_empty());
//! ```

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

/// Represents a value held in a document value slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Text value
    Text(String),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Binary data
    Binary(Vec<u8>),
    /// Null value
    Null,
}

impl FieldValue {
    /// Convert to text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer, if it is one.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float; integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Convert to boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            FieldValue::Boolean(b) => Some(*b),
            FieldValue::Text(s) => match s.to_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" | "on" => Some(true),
                "false" | "f" | "no" | "n" | "0" | "off" => Some(false),
                _ => None,
            },
            FieldValue::Integer(i) => Some(*i != 0),
            _ => None,
        }
    }

    /// Get the value as binary data, if possible.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            FieldValue::Binary(data) => Some(data),
            _ => None,
        }
    }

    /// Whether this is [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Encode the value so that byte order matches value order.
    ///
    /// Values of the same variant compare correctly as bytes. `Null`
    /// encodes to the empty string, which collapsing treats as "no key".
    pub fn to_key_bytes(&self) -> Vec<u8> {
        match self {
            FieldValue::Text(s) => s.as_bytes().to_vec(),
            FieldValue::Integer(i) => {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, (*i as u64) ^ (1 << 63));
                buf.to_vec()
            }
            FieldValue::Float(f) => {
                let bits = f.to_bits();
                let ordered = if bits >> 63 == 1 {
                    !bits
                } else {
                    bits | (1 << 63)
                };
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, ordered);
                buf.to_vec()
            }
            FieldValue::Boolean(b) => vec![u8::from(*b)],
            FieldValue::Binary(data) => data.clone(),
            FieldValue::Null => Vec::new(),
        }
    }

    /// Human readable rendering, used by facet counts and the CLI.
    pub fn display_string(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Integer(i) => i.to_string(),
            FieldValue::Float(f) => f.to_string(),
            FieldValue::Boolean(b) => b.to_string(),
            FieldValue::Binary(data) => format!("<{} bytes>", data.len()),
            FieldValue::Null => String::new(),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}
