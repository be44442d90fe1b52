use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use crate::{DescriptorError, Document, DocumentValue, TYPE_FIELD, TYPE_REFERENCE_TAG};

/// Separator between a generic type's name and its arity in the document form.
pub const ARITY_MARKER: char = '`';

/// Deepest generic nesting accepted by [`TypeDescriptor::decode`].
pub const MAX_DESCRIPTOR_DEPTH: usize = 64;

const NAME_FIELD: &str = "Name";
const ARGS_FIELD: &str = "GenericArguments";

// -----------------------------------------------------------------------------
// TypeDescriptor

/// A fully-qualified type name with its generic arguments.
///
/// `generic_args` is empty exactly when the type is not generic.
///
/// The textual form is `Name` or `Name<Arg1,Arg2>`, recursively:
///
/// ```
/// use vc_document::TypeDescriptor;
///
/// let animal = TypeDescriptor::new("Zoo.Animal");
/// let dict = TypeDescriptor::generic("HashMap", [TypeDescriptor::new("String"), animal]);
/// let list = TypeDescriptor::generic("Vec", [dict]);
///
/// let text = list.encode();
/// assert_eq!(text, "Vec<HashMap<String,Zoo.Animal>>");
/// assert_eq!(TypeDescriptor::decode(&text).unwrap(), list);
/// ```
///
/// The document form is the one stored when a type itself is persisted as data.
/// Its root is tagged `"_t": "TypeDescriptor"` and generic names carry an
/// arity marker:
///
/// ```
/// use vc_document::TypeDescriptor;
///
/// let list = TypeDescriptor::generic("Vec", [TypeDescriptor::new("i32")]);
/// let doc = list.to_document();
/// assert_eq!(doc.get("_t").and_then(|v| v.as_str()), Some("TypeDescriptor"));
/// assert_eq!(doc.get("Name").and_then(|v| v.as_str()), Some("Vec`1"));
/// assert_eq!(TypeDescriptor::from_document(&doc).unwrap(), list);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeDescriptor {
    full_name: String,
    generic_args: Vec<TypeDescriptor>,
}

impl TypeDescriptor {
    /// A non-generic descriptor.
    ///
    /// The name is not validated here; use [`TypeDescriptor::try_new`] for
    /// untrusted input.
    #[inline]
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            generic_args: Vec::new(),
        }
    }

    /// A descriptor closed over `args`.
    #[inline]
    pub fn generic(full_name: impl Into<String>, args: impl IntoIterator<Item = TypeDescriptor>) -> Self {
        Self {
            full_name: full_name.into(),
            generic_args: args.into_iter().collect(),
        }
    }

    /// A validated non-generic descriptor.
    pub fn try_new(full_name: &str) -> Result<Self, DescriptorError> {
        validate_name(full_name, full_name)?;
        Ok(Self::new(full_name))
    }

    /// Converts a Rust type path (`my_crate::shapes::Circle`) into a dotted
    /// descriptor name (`my_crate.shapes.Circle`).
    pub fn from_type_path(type_path: &str) -> Self {
        Self::new(type_path.trim_start_matches("::").replace("::", "."))
    }

    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    #[inline]
    pub fn generic_args(&self) -> &[TypeDescriptor] {
        &self.generic_args
    }

    #[inline]
    pub fn is_generic(&self) -> bool {
        !self.generic_args.is_empty()
    }

    /// The name with an arity marker when generic, e.g. ``Vec`1``.
    pub fn arity_name(&self) -> String {
        if self.is_generic() {
            format!("{}{ARITY_MARKER}{}", self.full_name, self.generic_args.len())
        } else {
            self.full_name.clone()
        }
    }

    /// Calls `func` on every name in the tree, root first.
    pub fn for_each_name(&self, func: &mut impl FnMut(&TypeDescriptor)) {
        func(self);
        for arg in &self.generic_args {
            arg.for_each_name(func);
        }
    }

    /// Rewrites every name in the tree. Returns `true` if any name changed.
    pub fn rename_all(&mut self, rename: &mut impl FnMut(&TypeDescriptor) -> Option<String>) -> bool {
        let mut changed = false;
        for arg in &mut self.generic_args {
            changed |= arg.rename_all(rename);
        }
        if let Some(name) = rename(self) {
            if name != self.full_name {
                self.full_name = name;
                changed = true;
            }
        }
        changed
    }

    // -------------------------------------------------------------------------
    // Textual form

    /// Encodes the textual form.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes the textual form.
    ///
    /// Whitespace around names and separators is ignored.
    pub fn decode(input: &str) -> Result<Self, DescriptorError> {
        let mut parser = Parser { input, offset: 0 };
        let descriptor = parser.descriptor(0)?;
        parser.skip_ws();
        match parser.peek() {
            None => Ok(descriptor),
            Some(found) => Err(parser.unexpected(found)),
        }
    }

    // -------------------------------------------------------------------------
    // Document form

    /// The tagged document form.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::with_capacity(3);
        doc.insert(TYPE_FIELD, DocumentValue::from(TYPE_REFERENCE_TAG));
        self.write_fields(&mut doc);
        doc
    }

    /// The document form without the root tag, as nested inside another
    /// reference.
    pub(crate) fn to_untagged_document(&self) -> Document {
        let mut doc = Document::with_capacity(2);
        self.write_fields(&mut doc);
        doc
    }

    fn write_fields(&self, doc: &mut Document) {
        doc.insert(NAME_FIELD, DocumentValue::String(self.arity_name()));
        if self.is_generic() {
            let args = self
                .generic_args
                .iter()
                .map(|arg| DocumentValue::Document(arg.to_untagged_document()))
                .collect();
            doc.insert(ARGS_FIELD, DocumentValue::Array(args));
        }
    }

    /// Reads the document form. The root tag is optional, but a different
    /// tag is an error.
    pub fn from_document(doc: &Document) -> Result<Self, DescriptorError> {
        check_tag(doc, TYPE_REFERENCE_TAG)?;
        let name = match doc.get(NAME_FIELD) {
            Some(DocumentValue::String(name)) => name.as_str(),
            Some(other) => return Err(field_error(NAME_FIELD, crate::ValueKind::String, other)),
            None => return Err(DescriptorError::MissingField { field: NAME_FIELD }),
        };

        let mut generic_args = Vec::new();
        match doc.get(ARGS_FIELD) {
            None | Some(DocumentValue::Null) => {}
            Some(DocumentValue::Array(args)) => {
                generic_args.reserve(args.len());
                for arg in args {
                    match arg {
                        DocumentValue::Document(arg) => generic_args.push(Self::from_document(arg)?),
                        other => return Err(field_error(ARGS_FIELD, crate::ValueKind::Document, other)),
                    }
                }
            }
            Some(other) => return Err(field_error(ARGS_FIELD, crate::ValueKind::Array, other)),
        }

        let (full_name, arity) = split_arity(name);
        validate_name(full_name, name)?;
        if let Some(declared) = arity
            && declared != generic_args.len()
        {
            return Err(DescriptorError::ArityMismatch {
                name: name.to_owned(),
                declared,
                actual: generic_args.len(),
            });
        }

        Ok(Self {
            full_name: full_name.to_owned(),
            generic_args,
        })
    }

    /// Returns `true` if `doc` is tagged as a persisted type reference.
    ///
    /// The shape alone never qualifies: `{"Name": "Bob"}` is plain data.
    pub fn is_reference_document(doc: &Document) -> bool {
        has_tag(doc, TYPE_REFERENCE_TAG)
    }
}

/// Splits an arity-marked name, ``Name`3``, into `("Name", Some(3))`.
///
/// Names without a well-formed marker come back unchanged with `None`.
pub fn split_arity(name: &str) -> (&str, Option<usize>) {
    if let Some((base, arity)) = name.rsplit_once(ARITY_MARKER)
        && !arity.is_empty()
        && arity.bytes().all(|b| b.is_ascii_digit())
        && let Ok(arity) = arity.parse()
    {
        return (base, Some(arity));
    }
    (name, None)
}

pub(crate) fn has_tag(doc: &Document, tag: &str) -> bool {
    doc.get(TYPE_FIELD).and_then(DocumentValue::as_str) == Some(tag)
}

pub(crate) fn check_tag(doc: &Document, tag: &'static str) -> Result<(), DescriptorError> {
    match doc.get(TYPE_FIELD) {
        None => Ok(()),
        Some(DocumentValue::String(found)) if found == tag => Ok(()),
        Some(DocumentValue::String(found)) => Err(DescriptorError::Tag {
            expected: tag,
            found: found.clone(),
        }),
        Some(other) => Err(field_error(TYPE_FIELD, crate::ValueKind::String, other)),
    }
}

fn field_error(field: &'static str, expected: crate::ValueKind, found: &DocumentValue) -> DescriptorError {
    DescriptorError::Field {
        field,
        expected,
        found: found.kind(),
    }
}

fn validate_name(name: &str, input: &str) -> Result<(), DescriptorError> {
    if name.trim().is_empty() {
        return Err(DescriptorError::EmptyName {
            input: input.to_owned(),
        });
    }
    if let Some((offset, found)) = name.char_indices().find(|(_, c)| is_reserved(*c)) {
        return Err(DescriptorError::Unexpected {
            input: input.to_owned(),
            offset,
            found,
        });
    }
    Ok(())
}

#[inline]
fn is_reserved(c: char) -> bool {
    matches!(c, '<' | '>' | ',')
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)?;
        if let Some((first, rest)) = self.generic_args.split_first() {
            f.write_str("<")?;
            fmt::Display::fmt(first, f)?;
            for arg in rest {
                f.write_str(",")?;
                fmt::Display::fmt(arg, f)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

impl FromStr for TypeDescriptor {
    type Err = DescriptorError;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

// -----------------------------------------------------------------------------
// Parser

/// Recursive-descent parser over the textual form.
///
/// ```text
/// descriptor := name ( '<' descriptor ( ',' descriptor )* '>' )?
/// name       := any run of characters except '<' '>' ','
/// ```
struct Parser<'a> {
    input: &'a str,
    offset: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn bump(&mut self, c: char) {
        self.offset += c.len_utf8();
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek()
            && c.is_whitespace()
        {
            self.bump(c);
        }
    }

    fn unexpected(&self, found: char) -> DescriptorError {
        DescriptorError::Unexpected {
            input: self.input.to_owned(),
            offset: self.offset,
            found,
        }
    }

    fn name(&mut self) -> Result<String, DescriptorError> {
        self.skip_ws();
        let start = self.offset;
        while let Some(c) = self.peek()
            && !is_reserved(c)
        {
            self.bump(c);
        }
        let name = self.input[start..self.offset].trim();
        if name.is_empty() {
            return Err(match self.peek() {
                Some(found) => self.unexpected(found),
                None => DescriptorError::EmptyName {
                    input: self.input.to_owned(),
                },
            });
        }
        Ok(name.to_owned())
    }

    fn descriptor(&mut self, depth: usize) -> Result<TypeDescriptor, DescriptorError> {
        if depth > MAX_DESCRIPTOR_DEPTH {
            return Err(DescriptorError::TooDeep {
                input: self.input.to_owned(),
                limit: MAX_DESCRIPTOR_DEPTH,
            });
        }

        let full_name = self.name()?;
        let mut generic_args = Vec::new();

        if self.peek() == Some('<') {
            self.bump('<');
            loop {
                generic_args.push(self.descriptor(depth + 1)?);
                self.skip_ws();
                match self.peek() {
                    Some(',') => self.bump(','),
                    Some('>') => {
                        self.bump('>');
                        break;
                    }
                    Some(found) => return Err(self.unexpected(found)),
                    None => {
                        return Err(DescriptorError::Unterminated {
                            input: self.input.to_owned(),
                        });
                    }
                }
            }
        }

        Ok(TypeDescriptor {
            full_name,
            generic_args,
        })
    }
}
