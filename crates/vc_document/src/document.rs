use alloc::string::String;
use alloc::vec::Vec;

use crate::DocumentValue;

// -----------------------------------------------------------------------------
// Document

/// An ordered map from field names to [`DocumentValue`]s.
///
/// Fields keep their insertion order; serializers rely on this to emit
/// members in declaration order, which keeps re-encoded output identical.
///
/// Lookups are linear. Documents produced by this crate hold one field per
/// declared member, so they stay small.
///
/// # Examples
///
/// ```
/// use vc_document::{Document, DocumentValue};
///
/// let mut doc = Document::new();
/// doc.insert("X", DocumentValue::Int(1));
/// doc.insert("Y", DocumentValue::Int(2));
/// doc.insert("X", DocumentValue::Int(3));
///
/// let keys: Vec<&str> = doc.keys().collect();
/// assert_eq!(keys, ["X", "Y"]);
/// assert_eq!(doc.get("X"), Some(&DocumentValue::Int(3)));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    fields: Vec<(String, DocumentValue)>,
}

impl Document {
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[inline]
    pub fn contains_key(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    #[inline]
    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(key, _)| key == name)
    }

    pub fn get(&self, name: &str) -> Option<&DocumentValue> {
        self.position(name).map(|idx| &self.fields[idx].1)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut DocumentValue> {
        self.position(name).map(|idx| &mut self.fields[idx].1)
    }

    /// Looks up a field, preferring an exact match over an ASCII
    /// case-insensitive one.
    pub fn get_ignore_case(&self, name: &str) -> Option<(&str, &DocumentValue)> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| self.fields.iter().find(|(key, _)| key.eq_ignore_ascii_case(name)))
            .map(|(key, value)| (key.as_str(), value))
    }

    /// Sets a field.
    ///
    /// An existing field keeps its position and the old value is returned;
    /// a new field is appended.
    pub fn insert(&mut self, name: impl Into<String>, value: DocumentValue) -> Option<DocumentValue> {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => Some(core::mem::replace(&mut self.fields[idx].1, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Removes a field, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<DocumentValue> {
        self.position(name).map(|idx| self.fields.remove(idx).1)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &DocumentValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl ExactSizeIterator<Item = &DocumentValue> {
        self.fields.iter().map(|(_, value)| value)
    }
}

impl IntoIterator for Document {
    type Item = (String, DocumentValue);
    type IntoIter = alloc::vec::IntoIter<(String, DocumentValue)>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, DocumentValue)> for Document {
    fn from_iter<T: IntoIterator<Item = (K, DocumentValue)>>(iter: T) -> Self {
        let mut doc = Document::new();
        for (key, value) in iter {
            doc.insert(key, value);
        }
        doc
    }
}
