use alloc::borrow::ToOwned;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use crate::descriptor::{check_tag, has_tag};
use crate::{DescriptorError, Document, DocumentValue, METHOD_REFERENCE_TAG, TYPE_FIELD, TypeDescriptor, ValueKind};

/// Method name used for constructors.
///
/// Constructors print with an empty name in the canonical signature, so
/// `Ns.Point..ctor(i32,i32)` becomes `Ns.Point.(i32,i32)`.
pub const CONSTRUCTOR_NAME: &str = ".ctor";

const TYPE_NAME_FIELD: &str = "TypeName";
const METHOD_NAME_FIELD: &str = "MethodName";
const PARAMETERS_FIELD: &str = "Parameters";

// -----------------------------------------------------------------------------
// MethodRef

/// A persisted reference to a method: declaring type, method name and
/// parameter types.
///
/// The canonical signature is the key used by method replacement tables:
///
/// ```
/// use vc_document::{MethodRef, TypeDescriptor};
///
/// let method = MethodRef::new(
///     TypeDescriptor::new("Geo.Shape"),
///     "Scale",
///     [TypeDescriptor::new("f64"), TypeDescriptor::generic("Vec", [TypeDescriptor::new("i32")])],
/// );
/// assert_eq!(method.signature(), "Geo.Shape.Scale(f64,Vec<i32>)");
/// assert_eq!(MethodRef::parse_signature(&method.signature()).unwrap(), method);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub type_name: TypeDescriptor,
    pub method_name: String,
    pub parameters: Vec<TypeDescriptor>,
}

impl MethodRef {
    pub fn new(
        type_name: TypeDescriptor,
        method_name: impl Into<String>,
        parameters: impl IntoIterator<Item = TypeDescriptor>,
    ) -> Self {
        Self {
            type_name,
            method_name: method_name.into(),
            parameters: parameters.into_iter().collect(),
        }
    }

    #[inline]
    pub fn is_constructor(&self) -> bool {
        self.method_name == CONSTRUCTOR_NAME || self.method_name.is_empty()
    }

    /// `Type.Method(P1,P2)` with textual descriptors.
    pub fn signature(&self) -> String {
        self.to_string()
    }

    /// Parses a canonical signature.
    ///
    /// The method name is everything between the last top-level `.` and the
    /// opening parenthesis; an empty name means [`CONSTRUCTOR_NAME`].
    pub fn parse_signature(input: &str) -> Result<Self, DescriptorError> {
        let malformed = || DescriptorError::Signature {
            input: input.to_owned(),
        };

        let input_trimmed = input.trim();
        let open = find_top_level(input_trimmed, '(').ok_or_else(malformed)?;
        let params = input_trimmed[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
        let head = &input_trimmed[..open];

        let dot = find_last_top_level(head, '.').ok_or_else(malformed)?;
        let (type_part, method_name) = (&head[..dot], head[dot + 1..].trim());
        // `Ns.Point..ctor` leaves the constructor's own dot in the type part.
        let (type_part, method_name) = match type_part.strip_suffix('.') {
            Some(rest) if method_name == "ctor" => (rest, CONSTRUCTOR_NAME),
            _ if method_name.is_empty() => (type_part, CONSTRUCTOR_NAME),
            _ => (type_part, method_name),
        };

        let type_name = TypeDescriptor::decode(type_part)?;
        let parameters = split_top_level(params)
            .into_iter()
            .map(TypeDescriptor::decode)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            type_name,
            method_name: method_name.to_owned(),
            parameters,
        })
    }

    // -------------------------------------------------------------------------
    // Document form

    /// The document form, tagged `"_t": "MethodRef"`.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::with_capacity(4);
        doc.insert(TYPE_FIELD, DocumentValue::from(METHOD_REFERENCE_TAG));
        doc.insert(TYPE_NAME_FIELD, DocumentValue::Document(self.type_name.to_untagged_document()));
        doc.insert(METHOD_NAME_FIELD, DocumentValue::String(self.method_name.clone()));
        let params = self
            .parameters
            .iter()
            .map(|p| DocumentValue::Document(p.to_untagged_document()))
            .collect();
        doc.insert(PARAMETERS_FIELD, DocumentValue::Array(params));
        doc
    }

    pub fn from_document(doc: &Document) -> Result<Self, DescriptorError> {
        check_tag(doc, METHOD_REFERENCE_TAG)?;
        let type_name = match doc.get(TYPE_NAME_FIELD) {
            Some(DocumentValue::Document(t)) => TypeDescriptor::from_document(t)?,
            Some(other) => return Err(field_error(TYPE_NAME_FIELD, ValueKind::Document, other)),
            None => return Err(DescriptorError::MissingField { field: TYPE_NAME_FIELD }),
        };
        let method_name = match doc.get(METHOD_NAME_FIELD) {
            Some(DocumentValue::String(name)) => name.clone(),
            Some(other) => return Err(field_error(METHOD_NAME_FIELD, ValueKind::String, other)),
            None => return Err(DescriptorError::MissingField { field: METHOD_NAME_FIELD }),
        };
        let parameters = match doc.get(PARAMETERS_FIELD) {
            None | Some(DocumentValue::Null) => Vec::new(),
            Some(DocumentValue::Array(params)) => params
                .iter()
                .map(|p| match p {
                    DocumentValue::Document(p) => TypeDescriptor::from_document(p),
                    other => Err(field_error(PARAMETERS_FIELD, ValueKind::Document, other)),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => return Err(field_error(PARAMETERS_FIELD, ValueKind::Array, other)),
        };
        Ok(Self {
            type_name,
            method_name,
            parameters,
        })
    }

    /// Returns `true` if `doc` is tagged as a persisted method reference.
    pub fn is_reference_document(doc: &Document) -> bool {
        has_tag(doc, METHOD_REFERENCE_TAG)
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.type_name, f)?;
        f.write_str(".")?;
        if !self.is_constructor() {
            f.write_str(&self.method_name)?;
        }
        f.write_str("(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            fmt::Display::fmt(param, f)?;
        }
        f.write_str(")")
    }
}

fn field_error(field: &'static str, expected: ValueKind, found: &DocumentValue) -> DescriptorError {
    DescriptorError::Field {
        field,
        expected,
        found: found.kind(),
    }
}

fn find_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == target && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

fn find_last_top_level(s: &str, target: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut found = None;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            c if c == target && depth == 0 => found = Some(i),
            _ => {}
        }
    }
    found
}

/// Splits a parameter list at top-level commas. An empty list yields no items.
fn split_top_level(s: &str) -> Vec<&str> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
