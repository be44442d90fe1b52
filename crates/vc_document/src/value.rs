use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use crate::Document;

// -----------------------------------------------------------------------------
// DocumentValue

/// A node of the document tree.
///
/// Values are plain data: once produced they are only read, cloned or
/// rebuilt. Field order inside a [`Document`] is significant, so two
/// documents compare equal only if their fields appear in the same order.
///
/// # Examples
///
/// ```
/// use vc_document::{Document, DocumentValue};
///
/// let mut doc = Document::new();
/// doc.insert("Radius", DocumentValue::Float(5.0));
///
/// let value = DocumentValue::Document(doc);
/// assert_eq!(value.get("Radius").and_then(DocumentValue::as_f64), Some(5.0));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DocumentValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<DocumentValue>),
    Document(Document),
}

/// The variant of a [`DocumentValue`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    String,
    Array,
    Document,
}

impl ValueKind {
    /// Lower-case name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Array => "array",
            Self::Document => "document",
        }
    }

    const fn rank(self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool => 1,
            Self::Int => 2,
            Self::Float => 3,
            Self::String => 4,
            Self::Array => 5,
            Self::Document => 6,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DocumentValue {
    #[inline]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Float(_) => ValueKind::Float,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Document(_) => ValueKind::Document,
        }
    }

    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[inline]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers widen; nothing else converts.
    #[inline]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_array(&self) -> Option<&[DocumentValue]> {
        match self {
            Self::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    #[inline]
    pub const fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(v) => Some(v),
            _ => None,
        }
    }

    /// Looks up a field when this value is a document.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&DocumentValue> {
        self.as_document().and_then(|doc| doc.get(name))
    }

    /// A total order over values.
    ///
    /// Variants are ordered `Null < Bool < Int < Float < String < Array < Document`;
    /// floats use [`f64::total_cmp`], sequences and documents compare
    /// lexicographically. Used to give unordered containers a stable encoding.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Array(a), Self::Array(b)) => cmp_seq(a.iter(), b.iter(), |x, y| x.canonical_cmp(y)),
            (Self::Document(a), Self::Document(b)) => cmp_seq(a.iter(), b.iter(), |(ka, va), (kb, vb)| {
                ka.cmp(kb).then_with(|| va.canonical_cmp(vb))
            }),
            _ => self.kind().rank().cmp(&other.kind().rank()),
        }
    }
}

fn cmp_seq<I: Iterator>(
    mut a: I,
    mut b: I,
    mut cmp: impl FnMut(I::Item, I::Item) -> Ordering,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match cmp(x, y) {
                Ordering::Equal => {}
                other => return other,
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Conversions

impl From<bool> for DocumentValue {
    #[inline]
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for DocumentValue {
    #[inline]
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for DocumentValue {
    #[inline]
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for DocumentValue {
    #[inline]
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for DocumentValue {
    #[inline]
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<DocumentValue>> for DocumentValue {
    #[inline]
    fn from(value: Vec<DocumentValue>) -> Self {
        Self::Array(value)
    }
}

impl From<Document> for DocumentValue {
    #[inline]
    fn from(value: Document) -> Self {
        Self::Document(value)
    }
}
