use alloc::borrow::ToOwned;
use alloc::boxed::Box;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use vc_document::{ARITY_MARKER, Document, DocumentValue, MethodRef, split_arity};
use vc_utils::hash::HashMap;

use crate::ConverterError;

/// Transforms the member map of an old-shaped object into the current shape.
pub type ObjectMigrator = Arc<dyn Fn(Document) -> Document + Send + Sync>;

/// Identity-carrying fields copied back after an [`ObjectMigrator`] runs,
/// unless configured otherwise.
pub const DEFAULT_IDENTITY_FIELDS: &[&str] = &["Id", "Tags", "Name"];

// -----------------------------------------------------------------------------
// Converter

/// An immutable, fully validated migration rule set.
///
/// Built through [`ConverterBuilder`]. Rename chains are already collapsed,
/// so applying a converter twice yields the same document as applying it once.
#[derive(Clone)]
pub struct Converter {
    pub(crate) type_renames: HashMap<String, String>,
    /// Type name, then old member name, then new member name (empty: removed).
    pub(crate) member_renames: HashMap<String, HashMap<String, String>>,
    pub(crate) deleted: HashMap<String, String>,
    pub(crate) migrators: HashMap<String, ObjectMigrator>,
    pub(crate) method_renames: HashMap<String, MethodRef>,
    pub(crate) identity_fields: Vec<String>,
}

impl Converter {
    /// A converter with no rules. [`upgrade`](crate::upgrade) leaves every
    /// document unchanged.
    pub fn empty() -> Self {
        Self {
            type_renames: HashMap::default(),
            member_renames: HashMap::default(),
            deleted: HashMap::default(),
            migrators: HashMap::default(),
            method_renames: HashMap::default(),
            identity_fields: DEFAULT_IDENTITY_FIELDS.iter().map(|&f| f.to_owned()).collect(),
        }
    }

    /// Returns `true` if the converter has no rules at all.
    pub fn is_empty(&self) -> bool {
        self.type_renames.is_empty()
            && self.member_renames.is_empty()
            && self.deleted.is_empty()
            && self.migrators.is_empty()
            && self.method_renames.is_empty()
    }

    /// The explanation stored for a deleted identifier.
    #[inline]
    pub fn deletion(&self, identifier: &str) -> Option<&str> {
        self.deleted.get(identifier).map(String::as_str)
    }

    /// The current name for an old type name, as the upgrade pass sees it.
    ///
    /// Strategies are tried in order: the name itself; the name without its
    /// arity marker (reattached on success); each namespace prefix, longest
    /// first, with the remainder spliced back on.
    ///
    /// ```
    /// use vc_migrate::ConverterBuilder;
    ///
    /// let converter = ConverterBuilder::new()
    ///     .rename_type("Old.Coll.List", "New.List")
    ///     .rename_type("Old.Geo", "New.Geometry")
    ///     .build()
    ///     .unwrap();
    ///
    /// assert_eq!(converter.renamed_type("Old.Coll.List`1").as_deref(), Some("New.List`1"));
    /// assert_eq!(converter.renamed_type("Old.Geo.Shapes.Arc").as_deref(), Some("New.Geometry.Shapes.Arc"));
    /// assert_eq!(converter.renamed_type("Other.Arc"), None);
    /// ```
    pub fn renamed_type(&self, name: &str) -> Option<String> {
        lookup_type(&self.type_renames, name)
    }

    /// The replacement for a canonical method signature.
    #[inline]
    pub fn replaced_method(&self, signature: &str) -> Option<&MethodRef> {
        self.method_renames.get(signature)
    }

    #[inline]
    pub(crate) fn migrator(&self, type_name: &str) -> Option<&ObjectMigrator> {
        self.migrators.get(type_name)
    }

    #[inline]
    pub fn identity_fields(&self) -> &[String] {
        &self.identity_fields
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("type_renames", &self.type_renames.len())
            .field("member_renames", &self.member_renames.len())
            .field("deleted", &self.deleted.len())
            .field("migrators", &self.migrators.len())
            .field("method_renames", &self.method_renames.len())
            .finish_non_exhaustive()
    }
}

fn lookup_type(renames: &HashMap<String, String>, name: &str) -> Option<String> {
    if let Some(new) = renames.get(name) {
        return Some(new.clone());
    }

    if let (base, Some(arity)) = split_arity(name)
        && let Some(new) = renames.get(base)
    {
        return Some(format!("{new}{ARITY_MARKER}{arity}"));
    }

    let mut end = name.len();
    while let Some(dot) = name[..end].rfind('.') {
        if let Some(new) = renames.get(&name[..dot]) {
            return Some(format!("{new}{}", &name[dot..]));
        }
        end = dot;
    }

    None
}

/// `true` if `name` is `outer` followed by a namespace segment or an arity
/// marker.
fn is_nested_name(name: &str, outer: &str) -> bool {
    name.strip_prefix(outer)
        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with(ARITY_MARKER))
}

// -----------------------------------------------------------------------------
// ConverterBuilder

/// Collects migration rules and validates them into a [`Converter`].
///
/// # Examples
///
/// ```
/// use vc_document::{DocumentValue, MethodRef, TypeDescriptor};
/// use vc_migrate::ConverterBuilder;
///
/// let converter = ConverterBuilder::new()
///     .rename_type("Old.Beam", "Mid.Beam")
///     .rename_type("Mid.Beam", "New.Girder")
///     .delete("Old.Obsolete", "Obsolete was merged into Girder; re-create it.")
///     .rename_method(
///         "Old.Beam.Scale(f64)",
///         MethodRef::new(TypeDescriptor::new("New.Girder"), "Resize", [TypeDescriptor::new("f64")]),
///     )
///     .migrate_object("Old.Plate", |mut fields| {
///         fields.remove("Legacy");
///         fields
///     })
///     .build()
///     .unwrap();
///
/// // Chains collapse at build time.
/// assert_eq!(converter.renamed_type("Old.Beam").as_deref(), Some("New.Girder"));
/// assert!(converter.deletion("Old.Obsolete").is_some());
/// ```
#[derive(Default)]
pub struct ConverterBuilder {
    type_renames: HashMap<String, String>,
    member_renames: Vec<(String, String)>,
    deleted: HashMap<String, String>,
    migrators: HashMap<String, ObjectMigrator>,
    method_renames: Vec<(String, MethodRef)>,
    identity_fields: Option<Vec<String>>,
}

impl ConverterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renames a fully qualified type name or namespace prefix.
    pub fn rename_type(mut self, old: impl Into<String>, new: impl Into<String>) -> Self {
        self.type_renames.insert(old.into(), new.into());
        self
    }

    /// Renames a member. `key` is `"OldType.Member"`; an empty `new` removes
    /// the member.
    pub fn rename_member(mut self, key: impl Into<String>, new: impl Into<String>) -> Self {
        self.member_renames.push((key.into(), new.into()));
        self
    }

    /// Marks a type, member or method signature as deleted. Upgrading any
    /// document that references it fails with `explanation` as the message.
    pub fn delete(mut self, identifier: impl Into<String>, explanation: impl Into<String>) -> Self {
        self.deleted.insert(identifier.into(), explanation.into());
        self
    }

    /// Replaces member renames for objects discriminated as `old_type` with
    /// a custom transformation of their member map.
    ///
    /// The migrator also runs when a converter is applied to its own output
    /// if `old_type` is not renamed, so it must be idempotent in that case.
    pub fn migrate_object<F>(mut self, old_type: impl Into<String>, migrator: F) -> Self
    where
        F: Fn(Document) -> Document + Send + Sync + 'static,
    {
        self.migrators.insert(old_type.into(), Arc::new(migrator));
        self
    }

    /// Replaces a method reference. `signature` is the canonical
    /// `Type.Method(P1,P2)` form; whitespace is normalised.
    pub fn rename_method(mut self, signature: impl Into<String>, replacement: MethodRef) -> Self {
        self.method_renames.push((signature.into(), replacement));
        self
    }

    /// Overrides [`DEFAULT_IDENTITY_FIELDS`].
    pub fn identity_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.identity_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Reads rule tables from a document.
    ///
    /// Recognised tables, all optional:
    ///
    /// - `TypeRenames`: `{ "Old.Name": "New.Name", .. }`
    /// - `MemberRenames`: `{ "Old.Type.Member": "NewMember", .. }`
    /// - `Deleted`: `{ "Identifier": "explanation", .. }`
    /// - `MethodRenames`: `{ "Type.Method(P)": "New.Type.Method(P)" | <method document>, .. }`
    /// - `IdentityFields`: `[ "Id", .. ]`
    ///
    /// Object migrators are code and can only be added with
    /// [`ConverterBuilder::migrate_object`].
    ///
    /// ```
    /// use vc_document::DocumentValue;
    /// use vc_migrate::ConverterBuilder;
    ///
    /// let tables: DocumentValue = serde_json::from_str(r#"{
    ///     "TypeRenames": { "Old.Beam": "New.Girder" },
    ///     "Deleted": { "Old.Obsolete": "gone" }
    /// }"#).unwrap();
    ///
    /// let converter = ConverterBuilder::from_document(&tables).unwrap().build().unwrap();
    /// assert_eq!(converter.renamed_type("Old.Beam").as_deref(), Some("New.Girder"));
    /// ```
    pub fn from_document(tables: &DocumentValue) -> Result<Self, ConverterError> {
        let Some(tables) = tables.as_document() else {
            return Err(table_error("<root>", "expected a document of tables"));
        };

        let mut builder = Self::new();

        for (old, new) in string_table(tables, "TypeRenames")? {
            builder = builder.rename_type(old, new);
        }
        for (key, new) in string_table(tables, "MemberRenames")? {
            builder = builder.rename_member(key, new);
        }
        for (id, explanation) in string_table(tables, "Deleted")? {
            builder = builder.delete(id, explanation);
        }

        if let Some(methods) = table(tables, "MethodRenames")? {
            for (signature, replacement) in methods.iter() {
                let replacement = match replacement {
                    DocumentValue::String(text) => MethodRef::parse_signature(text)?,
                    DocumentValue::Document(doc) => MethodRef::from_document(doc)?,
                    other => {
                        return Err(table_error(
                            "MethodRenames",
                            format!("`{signature}` maps to a {}", other.kind()),
                        ));
                    }
                };
                builder = builder.rename_method(signature, replacement);
            }
        }

        match tables.get("IdentityFields") {
            None | Some(DocumentValue::Null) => {}
            Some(DocumentValue::Array(items)) => {
                let fields = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(ToOwned::to_owned)
                            .ok_or_else(|| table_error("IdentityFields", format!("expected strings, found {}", item.kind())))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                builder = builder.identity_fields(fields);
            }
            Some(other) => {
                return Err(table_error("IdentityFields", format!("expected an array, found {}", other.kind())));
            }
        }

        Ok(builder)
    }

    /// Validates the rules and produces the converter.
    pub fn build(self) -> Result<Converter, ConverterError> {
        let type_renames = collapse_types(&self.type_renames)?;

        for (name, target) in &type_renames {
            if let Some(again) = lookup_type(&type_renames, target) {
                return Err(ConverterError::TypeRematch {
                    name: name.clone(),
                    target: target.clone(),
                    again,
                });
            }
            // Names under `name` are spliced onto `target`; a rule for any
            // name under `target` would match the spliced result again.
            if let Some(nested) = type_renames.keys().find(|key| is_nested_name(key, target)) {
                return Err(ConverterError::TypeRematch {
                    name: name.clone(),
                    target: target.clone(),
                    again: nested.clone(),
                });
            }
            if self.deleted.contains_key(target.as_str()) {
                return Err(ConverterError::RenamedToDeleted {
                    name: name.clone(),
                    target: target.clone(),
                });
            }
        }

        let member_renames = collapse_members(self.member_renames)?;

        let mut method_renames: HashMap<String, MethodRef> = HashMap::default();
        for (signature, replacement) in self.method_renames {
            let key = MethodRef::parse_signature(&signature)?.signature();
            method_renames.insert(key, replacement);
        }
        for replacement in method_renames.values() {
            let signature = replacement.signature();
            if method_renames.contains_key(signature.as_str()) {
                return Err(ConverterError::MethodRematch { signature });
            }
        }

        log::debug!(
            "built converter: {} type renames, {} member tables, {} deletions, {} migrators, {} method renames",
            type_renames.len(),
            member_renames.len(),
            self.deleted.len(),
            self.migrators.len(),
            method_renames.len(),
        );

        Ok(Converter {
            type_renames,
            member_renames,
            deleted: self.deleted,
            migrators: self.migrators,
            method_renames,
            identity_fields: match self.identity_fields {
                Some(fields) => fields,
                None => DEFAULT_IDENTITY_FIELDS.iter().map(|&f| f.to_owned()).collect(),
            },
        })
    }
}

fn table_error(table: &'static str, message: impl Into<String>) -> ConverterError {
    ConverterError::Table {
        table,
        message: message.into(),
    }
}

fn table<'a>(tables: &'a Document, name: &'static str) -> Result<Option<&'a Document>, ConverterError> {
    match tables.get(name) {
        None | Some(DocumentValue::Null) => Ok(None),
        Some(DocumentValue::Document(doc)) => Ok(Some(doc)),
        Some(other) => Err(table_error(name, format!("expected a document, found {}", other.kind()))),
    }
}

fn string_table<'a>(tables: &'a Document, name: &'static str) -> Result<Vec<(&'a str, &'a str)>, ConverterError> {
    let Some(doc) = table(tables, name)? else {
        return Ok(Vec::new());
    };
    doc.iter()
        .map(|(key, value)| match value.as_str() {
            Some(value) => Ok((key, value)),
            None => Err(table_error(name, format!("`{key}` maps to a {}", value.kind()))),
        })
        .collect()
}

/// Follows every rename chain to its end.
fn collapse_types(renames: &HashMap<String, String>) -> Result<HashMap<String, String>, ConverterError> {
    let mut collapsed = HashMap::default();
    for (name, first) in renames {
        let mut target = first;
        let mut steps = 0;
        while let Some(next) = renames.get(target.as_str()) {
            steps += 1;
            if next == name || steps > renames.len() {
                return Err(ConverterError::TypeCycle { name: name.clone() });
            }
            target = next;
        }
        if target != first {
            log::trace!("collapsed type rename `{name}` -> `{first}` -> .. -> `{target}`");
        }
        collapsed.insert(name.clone(), target.clone());
    }
    Ok(collapsed)
}

fn collapse_members(
    renames: Vec<(String, String)>,
) -> Result<HashMap<String, HashMap<String, String>>, ConverterError> {
    let mut by_type: HashMap<String, HashMap<String, String>> = HashMap::default();
    for (key, new) in renames {
        let Some((type_name, member)) = key.rsplit_once('.') else {
            return Err(ConverterError::MemberKey { key });
        };
        if type_name.is_empty() || member.is_empty() {
            return Err(ConverterError::MemberKey { key });
        }
        by_type
            .entry(type_name.to_owned())
            .or_default()
            .insert(member.to_owned(), new);
    }

    let mut collapsed = HashMap::default();
    for (type_name, members) in by_type {
        let mut table: HashMap<String, String> = HashMap::default();
        for (member, first) in &members {
            let mut target = first;
            let mut steps = 0;
            while !target.is_empty()
                && let Some(next) = members.get(target.as_str())
            {
                steps += 1;
                if next == member || steps > members.len() {
                    return Err(ConverterError::MemberCycle {
                        type_name,
                        member: member.clone(),
                    });
                }
                target = next;
            }
            table.insert(member.clone(), target.clone());
        }
        collapsed.insert(type_name, table);
    }
    Ok(collapsed)
}

// Boxed closures are not `Debug`; keep the builder printable for diagnostics.
impl fmt::Debug for ConverterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterBuilder")
            .field("type_renames", &self.type_renames)
            .field("member_renames", &self.member_renames)
            .field("deleted", &self.deleted)
            .field("migrators", &self.migrators.keys().collect::<Box<[_]>>())
            .field("method_renames", &self.method_renames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ConverterBuilder;
    use crate::ConverterError;
    use vc_document::{MethodRef, TypeDescriptor};

    #[test]
    fn chains_collapse() {
        let converter = ConverterBuilder::new()
            .rename_type("A", "B")
            .rename_type("B", "C")
            .rename_type("C", "D")
            .build()
            .unwrap();
        assert_eq!(converter.renamed_type("A").as_deref(), Some("D"));
        assert_eq!(converter.renamed_type("B").as_deref(), Some("D"));
        assert_eq!(converter.renamed_type("D"), None);
    }

    #[test]
    fn cycles_are_rejected() {
        let err = ConverterBuilder::new()
            .rename_type("A", "B")
            .rename_type("B", "A")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConverterError::TypeCycle { .. }));

        let err = ConverterBuilder::new()
            .rename_member("T.a", "b")
            .rename_member("T.b", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConverterError::MemberCycle { .. }));
    }

    #[test]
    fn prefix_rematch_is_rejected() {
        let err = ConverterBuilder::new()
            .rename_type("Old.Beam", "Lib.Beam")
            .rename_type("Lib", "Core")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConverterError::TypeRematch { .. }));
    }

    #[test]
    fn rule_under_a_spliced_target_is_rejected() {
        let err = ConverterBuilder::new()
            .rename_type("Old.Geo", "New.Geometry")
            .rename_type("New.Geometry.Shapes", "Core.Shapes")
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ConverterError::TypeRematch { ref target, ref again, .. }
                if target == "New.Geometry" && again == "New.Geometry.Shapes"
        ));

        // A sibling that only shares a textual prefix is fine.
        assert!(
            ConverterBuilder::new()
                .rename_type("Old.Geo", "New.Geometry")
                .rename_type("New.GeometryKit", "Core.Kit")
                .build()
                .is_ok()
        );
    }

    #[test]
    fn rename_into_deleted_is_rejected() {
        let err = ConverterBuilder::new()
            .rename_type("Old.Beam", "Old.Obsolete")
            .delete("Old.Obsolete", "gone")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConverterError::RenamedToDeleted { .. }));
    }

    #[test]
    fn member_chains_collapse_and_removal_sticks() {
        let converter = ConverterBuilder::new()
            .rename_member("T.a", "b")
            .rename_member("T.b", "c")
            .rename_member("T.x", "")
            .build()
            .unwrap();
        let table = &converter.member_renames["T"];
        assert_eq!(table["a"], "c");
        assert_eq!(table["x"], "");
    }

    #[test]
    fn malformed_member_key() {
        let err = ConverterBuilder::new().rename_member("Length", "Len").build().unwrap_err();
        assert!(matches!(err, ConverterError::MemberKey { .. }));
    }

    #[test]
    fn method_keys_are_normalised_and_rematch_rejected() {
        let converter = ConverterBuilder::new()
            .rename_method(
                "Geo.Shape.Scale( f64 )",
                MethodRef::new(TypeDescriptor::new("Geo.Shape"), "Resize", [TypeDescriptor::new("f64")]),
            )
            .build()
            .unwrap();
        assert!(converter.replaced_method("Geo.Shape.Scale(f64)").is_some());

        let err = ConverterBuilder::new()
            .rename_method("A.F()", MethodRef::new(TypeDescriptor::new("A"), "G", []))
            .rename_method("A.G()", MethodRef::new(TypeDescriptor::new("A"), "H", []))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConverterError::MethodRematch { .. }));
    }

    #[test]
    fn tables_from_json() {
        let tables: vc_document::DocumentValue = serde_json::from_str(
            r#"{
                "TypeRenames": { "Old.Beam": "New.Girder" },
                "MemberRenames": { "Old.Beam.Len": "Length" },
                "Deleted": { "Old.Obsolete": "use Girder" },
                "MethodRenames": { "Old.Beam.Scale(f64)": "New.Girder.Resize(f64)" },
                "IdentityFields": ["Guid"]
            }"#,
        )
        .unwrap();
        let converter = ConverterBuilder::from_document(&tables).unwrap().build().unwrap();
        assert_eq!(converter.deletion("Old.Obsolete"), Some("use Girder"));
        assert_eq!(converter.identity_fields(), ["Guid"]);
        assert_eq!(
            converter.replaced_method("Old.Beam.Scale(f64)").map(MethodRef::signature).as_deref(),
            Some("New.Girder.Resize(f64)")
        );

        let bad: vc_document::DocumentValue = serde_json::from_str(r#"{ "Deleted": { "X": 1 } }"#).unwrap();
        assert!(matches!(
            ConverterBuilder::from_document(&bad),
            Err(ConverterError::Table { table: "Deleted", .. })
        ));
    }
}
