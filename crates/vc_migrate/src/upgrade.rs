use alloc::borrow::{Cow, ToOwned};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use vc_document::{
    Document, DocumentValue, METHOD_REFERENCE_TAG, MethodRef, TYPE_FIELD, TYPE_REFERENCE_TAG, TypeDescriptor,
    VALUE_FIELD, split_arity,
};
use vc_utils::hash::HashMap;

use crate::{Converter, UpgradeError};

type Result<T> = core::result::Result<T, UpgradeError>;

// -----------------------------------------------------------------------------
// Entry point

/// Migrates `doc` with `converter`.
///
/// The walk is bottom-up: children are upgraded before the node that holds
/// them, and a node is rebuilt only when it or a descendant changed, so an
/// untouched document comes back as [`Cow::Borrowed`].
///
/// Only documents carrying a string `_t` are rewritten; everything else is
/// user data and only its children are visited. The tag selects the rule:
///
/// - `"TypeDescriptor"`: a persisted type reference;
/// - `"MethodRef"`: a persisted method reference;
/// - anything else: a discriminated object, wrapped as `{_t, _v}` or
///   flattened as `{_t, ..members}`.
///
/// # Errors
///
/// Any reference to a deleted identifier aborts the whole call with
/// [`UpgradeError::DeletedDefinition`].
///
/// # Examples
///
/// ```
/// use vc_document::{Document, DocumentValue};
/// use vc_migrate::{ConverterBuilder, UpgradeError, upgrade};
///
/// let converter = ConverterBuilder::new()
///     .delete("Old.Obsolete", "Obsolete was removed in 4.0; use Girder.")
///     .build()
///     .unwrap();
///
/// let mut inner = Document::new();
/// inner.insert("_t", DocumentValue::from("Old.Obsolete"));
/// let mut root = Document::new();
/// root.insert("Parts", DocumentValue::Array(vec![DocumentValue::Document(inner)]));
///
/// let err = upgrade(&DocumentValue::Document(root), &converter).unwrap_err();
/// assert_eq!(err.to_string(), "Obsolete was removed in 4.0; use Girder.");
/// ```
pub fn upgrade<'a>(doc: &'a DocumentValue, converter: &Converter) -> Result<Cow<'a, DocumentValue>> {
    if converter.is_empty() {
        return Ok(Cow::Borrowed(doc));
    }
    match converter.upgrade_value(doc)? {
        Some(upgraded) => {
            log::debug!("upgraded document ({} root)", doc.kind());
            Ok(Cow::Owned(upgraded))
        }
        None => Ok(Cow::Borrowed(doc)),
    }
}

// -----------------------------------------------------------------------------
// Tree walk

impl Converter {
    /// `None` means unchanged.
    fn upgrade_value(&self, value: &DocumentValue) -> Result<Option<DocumentValue>> {
        match value {
            DocumentValue::Array(items) => Ok(self.upgrade_items(items)?.map(DocumentValue::Array)),
            DocumentValue::Document(doc) => Ok(self.upgrade_document(doc)?.map(DocumentValue::Document)),
            _ => Ok(None),
        }
    }

    fn upgrade_items(&self, items: &[DocumentValue]) -> Result<Option<Vec<DocumentValue>>> {
        let mut out: Option<Vec<DocumentValue>> = None;
        for (i, item) in items.iter().enumerate() {
            match self.upgrade_value(item)? {
                Some(new) => out.get_or_insert_with(|| items[..i].to_vec()).push(new),
                None => {
                    if let Some(out) = &mut out {
                        out.push(item.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn upgrade_fields(&self, doc: &Document) -> Result<Option<Document>> {
        let mut out: Option<Document> = None;
        for (i, (name, value)) in doc.iter().enumerate() {
            match self.upgrade_value(value)? {
                Some(new) => {
                    out.get_or_insert_with(|| copy_prefix(doc, i)).insert(name, new);
                }
                None => {
                    if let Some(out) = &mut out {
                        out.insert(name, value.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn upgrade_document(&self, doc: &Document) -> Result<Option<Document>> {
        let children = self.upgrade_fields(doc)?;
        let current = children.as_ref().unwrap_or(doc);

        let node = match current.get(TYPE_FIELD) {
            Some(DocumentValue::String(tag)) if tag == TYPE_REFERENCE_TAG => self.upgrade_type_ref(current)?,
            Some(DocumentValue::String(tag)) if tag == METHOD_REFERENCE_TAG => self.upgrade_method(current)?,
            Some(DocumentValue::String(discriminator)) => self.upgrade_object(current, discriminator)?,
            _ => None,
        };

        Ok(node.or(children))
    }

    // -------------------------------------------------------------------------
    // Type references

    /// A `{_t: "TypeDescriptor"}` wrapper around a persisted descriptor has
    /// no `Name` of its own and is left to its `_v` child.
    fn upgrade_type_ref(&self, doc: &Document) -> Result<Option<Document>> {
        let descriptor = match TypeDescriptor::from_document(doc) {
            Ok(descriptor) => descriptor,
            Err(error) => {
                log::trace!("not a type reference: {error}");
                return Ok(None);
            }
        };
        let Some(renamed) = self.upgrade_descriptor(&descriptor)? else {
            return Ok(None);
        };
        log::trace!("type reference `{descriptor}` -> `{renamed}`");
        Ok(Some(renamed.to_document()))
    }

    /// Checks every name in `descriptor` against the deletions, then renames
    /// each of them. `None` means no name changed.
    fn upgrade_descriptor(&self, descriptor: &TypeDescriptor) -> Result<Option<TypeDescriptor>> {
        let mut deleted = Ok(());
        descriptor.for_each_name(&mut |node| {
            if deleted.is_ok() {
                deleted = self.check_type_deleted(&node.arity_name());
            }
        });
        deleted?;

        let mut renamed = descriptor.clone();
        if renamed.rename_all(&mut |node| self.renamed_node(node)) {
            Ok(Some(renamed))
        } else {
            Ok(None)
        }
    }

    /// Checks a name as written and without its arity marker.
    fn check_type_deleted(&self, name: &str) -> Result<()> {
        self.check_deleted(name)?;
        if let (base, Some(_)) = split_arity(name) {
            self.check_deleted(base)?;
        }
        Ok(())
    }

    fn check_deleted(&self, identifier: &str) -> Result<()> {
        match self.deletion(identifier) {
            Some(explanation) => Err(UpgradeError::DeletedDefinition {
                identifier: identifier.to_owned(),
                explanation: explanation.to_owned(),
            }),
            None => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Method references

    /// The canonical key is tried as written, then with every type name in
    /// it upgraded.
    fn upgrade_method(&self, doc: &Document) -> Result<Option<Document>> {
        let method = match MethodRef::from_document(doc) {
            Ok(method) => method,
            Err(error) => {
                log::trace!("not a method reference: {error}");
                return Ok(None);
            }
        };

        let before = method.signature();
        self.check_deleted(&before)?;
        let upgraded = self.upgrade_method_types(&method)?;
        let after = upgraded.as_ref().map(MethodRef::signature);
        if let Some(after) = &after {
            self.check_deleted(after)?;
        }

        let replaced = [Some(&before), after.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|key| self.replaced_method(key).map(|m| (key, m)));

        let method = match (replaced, upgraded) {
            (Some((key, replacement)), _) => {
                log::trace!("method `{key}` -> `{replacement}`");
                // The replacement names current types already, except where
                // a type rename applies to it too.
                match self.upgrade_method_types(replacement)? {
                    Some(replacement) => replacement,
                    None => replacement.clone(),
                }
            }
            (None, Some(upgraded)) => upgraded,
            (None, None) => return Ok(None),
        };
        Ok(Some(method.to_document()))
    }

    fn upgrade_method_types(&self, method: &MethodRef) -> Result<Option<MethodRef>> {
        let type_name = self.upgrade_descriptor(&method.type_name)?;
        let mut changed = type_name.is_some();

        let mut parameters = Vec::with_capacity(method.parameters.len());
        for param in &method.parameters {
            match self.upgrade_descriptor(param)? {
                Some(new) => {
                    changed = true;
                    parameters.push(new);
                }
                None => parameters.push(param.clone()),
            }
        }

        if !changed {
            return Ok(None);
        }
        Ok(Some(MethodRef {
            type_name: type_name.unwrap_or_else(|| method.type_name.clone()),
            method_name: method.method_name.clone(),
            parameters,
        }))
    }

    // -------------------------------------------------------------------------
    // Discriminated objects

    fn upgrade_object(&self, doc: &Document, discriminator: &str) -> Result<Option<Document>> {
        let old = TypeDescriptor::decode(discriminator).map_err(|error| UpgradeError::Discriminator {
            text: discriminator.to_owned(),
            error,
        })?;

        let upgraded = self.upgrade_descriptor(&old)?;
        let renamed = upgraded.is_some();
        let new = upgraded.unwrap_or_else(|| old.clone());
        let new_text = if renamed {
            let text = new.encode();
            log::trace!("discriminator `{discriminator}` -> `{text}`");
            text
        } else {
            discriminator.to_owned()
        };

        let old_names = type_keys(discriminator, &old);
        let new_names = type_keys(&new_text, &new);

        let wrapped = doc.contains_key(VALUE_FIELD);
        let migrator = old_names.iter().find_map(|name| self.migrator(name));

        let members = if wrapped {
            match doc.get(VALUE_FIELD) {
                Some(DocumentValue::Document(members)) => {
                    let members = match migrator {
                        Some(migrator) => Some(self.run_migrator(migrator, members.clone(), members)),
                        None => self.rename_members(members, &old_names, &new_names)?,
                    };
                    members.map(DocumentValue::Document)
                }
                _ => None,
            }
        } else {
            match migrator {
                Some(migrator) => {
                    let mut fields = doc.clone();
                    fields.remove(TYPE_FIELD);
                    let migrated = self.run_migrator(migrator, fields, doc);
                    let mut out = Document::with_capacity(migrated.len() + 1);
                    out.insert(TYPE_FIELD, DocumentValue::String(new_text));
                    for (name, value) in migrated {
                        out.insert(name, value);
                    }
                    return Ok(Some(out));
                }
                None => {
                    if let Some(mut out) = self.rename_members(doc, &old_names, &new_names)? {
                        out.insert(TYPE_FIELD, DocumentValue::String(new_text));
                        return Ok(Some(out));
                    }
                    None
                }
            }
        };

        if !renamed && members.is_none() {
            return Ok(None);
        }

        let mut out = doc.clone();
        out.insert(TYPE_FIELD, DocumentValue::String(new_text));
        if let Some(members) = members {
            out.insert(VALUE_FIELD, members);
        }
        Ok(Some(out))
    }

    fn renamed_node(&self, node: &TypeDescriptor) -> Option<String> {
        let renamed = self.renamed_type(&node.arity_name())?;
        if node.is_generic() {
            Some(split_arity(&renamed).0.to_owned())
        } else {
            Some(renamed)
        }
    }

    fn run_migrator(
        &self,
        migrator: &crate::ObjectMigrator,
        fields: Document,
        original: &Document,
    ) -> Document {
        let mut migrated = migrator(fields);
        for field in &self.identity_fields {
            if !migrated.contains_key(field)
                && let Some(value) = original.get(field)
            {
                migrated.insert(field.as_str(), value.clone());
            }
        }
        migrated
    }

    /// Applies member renames and removals. Fields with a leading `_` are
    /// reserved and pass through untouched.
    fn rename_members(&self, members: &Document, old_names: &[&str], new_names: &[&str]) -> Result<Option<Document>> {
        let old_tables = self.member_tables(old_names);
        let new_tables = if old_names == new_names {
            Vec::new()
        } else {
            self.member_tables(new_names)
        };

        let mut out: Option<Document> = None;
        for (i, (name, value)) in members.iter().enumerate() {
            if name.starts_with('_') {
                if let Some(out) = &mut out {
                    out.insert(name, value.clone());
                }
                continue;
            }

            for type_name in old_names.iter().chain(new_names) {
                self.check_deleted(&format!("{type_name}.{name}"))?;
            }

            let mut target = name;
            if let Some(next) = find_member(&old_tables, target) {
                target = next;
            }
            if !target.is_empty()
                && let Some(next) = find_member(&new_tables, target)
            {
                target = next;
            }

            if target == name {
                if let Some(out) = &mut out {
                    out.insert(name, value.clone());
                }
                continue;
            }

            let out = out.get_or_insert_with(|| copy_prefix(members, i));
            if target.is_empty() {
                log::trace!("member `{name}` removed");
            } else {
                log::trace!("member `{name}` -> `{target}`");
                out.insert(target, value.clone());
            }
        }
        Ok(out)
    }

    fn member_tables(&self, type_names: &[&str]) -> Vec<&HashMap<String, String>> {
        type_names
            .iter()
            .filter_map(|name| self.member_renames.get(*name))
            .collect()
    }
}

fn find_member<'a>(tables: &[&'a HashMap<String, String>], member: &str) -> Option<&'a str> {
    tables.iter().find_map(|table| table.get(member)).map(String::as_str)
}

/// The keys a discriminated type is looked up under: its encoded text, then
/// its root name when generic.
fn type_keys<'a>(text: &'a str, descriptor: &'a TypeDescriptor) -> Vec<&'a str> {
    if descriptor.is_generic() {
        Vec::from([text, descriptor.full_name()])
    } else {
        Vec::from([text])
    }
}

fn copy_prefix(doc: &Document, len: usize) -> Document {
    doc.iter().take(len).map(|(k, v)| (k, v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;
    use alloc::string::ToString;
    use alloc::vec;

    use vc_document::{Document, DocumentValue, MethodRef, TypeDescriptor};

    use super::upgrade;
    use crate::{ConverterBuilder, UpgradeError};

    fn doc_fields<const N: usize>(fields: [(&str, DocumentValue); N]) -> Document {
        fields.into_iter().collect()
    }

    fn doc<const N: usize>(fields: [(&str, DocumentValue); N]) -> DocumentValue {
        DocumentValue::Document(doc_fields(fields))
    }

    fn s(text: &str) -> DocumentValue {
        DocumentValue::from(text)
    }

    #[test]
    fn renames_type_and_member() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Beam", "New.Girder")
            .rename_member("Old.Beam.Len", "Length")
            .build()
            .unwrap();

        let before = doc([("_t", s("Old.Beam")), ("Len", DocumentValue::Int(3))]);
        let after = upgrade(&before, &converter).unwrap();
        assert_eq!(*after, doc([("_t", s("New.Girder")), ("Length", DocumentValue::Int(3))]));
    }

    #[test]
    fn wrapped_object_renames_inside_value() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Beam", "New.Girder")
            .rename_member("Old.Beam.Len", "Length")
            .rename_member("Old.Beam.Color", "")
            .build()
            .unwrap();

        let before = doc([
            ("_t", s("Old.Beam")),
            ("_v", doc([("Len", DocumentValue::Int(3)), ("Color", s("red"))])),
        ]);
        let after = upgrade(&before, &converter).unwrap();
        assert_eq!(
            *after,
            doc([("_t", s("New.Girder")), ("_v", doc([("Length", DocumentValue::Int(3))]))])
        );
    }

    #[test]
    fn member_renames_under_new_name_compose() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Beam", "New.Girder")
            .rename_member("Old.Beam.Len", "Length")
            .rename_member("New.Girder.Length", "Span")
            .build()
            .unwrap();

        let before = doc([("_t", s("Old.Beam")), ("Len", DocumentValue::Int(3))]);
        let once = upgrade(&before, &converter).unwrap().into_owned();
        assert_eq!(once, doc([("_t", s("New.Girder")), ("Span", DocumentValue::Int(3))]));
        assert!(matches!(upgrade(&once, &converter).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn deletion_aborts_with_explanation() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Beam", "New.Girder")
            .delete("Old.Obsolete", "Obsolete was dropped; rebuild it as a Girder.")
            .build()
            .unwrap();

        let before = doc([(
            "Items",
            DocumentValue::Array(vec![
                doc([("_t", s("Old.Beam"))]),
                doc([("_t", s("Old.Obsolete")), ("Size", DocumentValue::Int(1))]),
            ]),
        )]);
        let err = upgrade(&before, &converter).unwrap_err();
        assert_eq!(err.to_string(), "Obsolete was dropped; rebuild it as a Girder.");
        assert!(matches!(err, UpgradeError::DeletedDefinition { ref identifier, .. } if identifier == "Old.Obsolete"));
    }

    #[test]
    fn deleted_generic_argument_and_member() {
        let converter = ConverterBuilder::new()
            .delete("Old.Obsolete", "gone")
            .delete("Geo.Beam.Weight", "weight is computed now")
            .build()
            .unwrap();

        let generic = doc([("_t", s("Vec<Old.Obsolete>")), ("_v", DocumentValue::Array(vec![]))]);
        assert!(upgrade(&generic, &converter).is_err());

        let member = doc([("_t", s("Geo.Beam")), ("Weight", DocumentValue::Int(1))]);
        assert_eq!(upgrade(&member, &converter).unwrap_err().to_string(), "weight is computed now");
    }

    #[test]
    fn type_reference_strategies() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Coll.List", "New.List")
            .rename_type("Old.Geo", "New.Geometry")
            .rename_type("Old.Item", "New.Item")
            .build()
            .unwrap();

        let item = DocumentValue::Document(doc_fields([("Name", s("Old.Item"))]));
        let before = doc([
            ("_t", s("TypeDescriptor")),
            ("Name", s("Old.Coll.List`1")),
            ("GenericArguments", DocumentValue::Array(vec![item])),
        ]);
        let after = upgrade(&before, &converter).unwrap();
        let expected = TypeDescriptor::generic("New.List", [TypeDescriptor::new("New.Item")]).to_document();
        assert_eq!(*after, DocumentValue::Document(expected));

        let nested = DocumentValue::Document(TypeDescriptor::new("Old.Geo.Shapes.Arc").to_document());
        assert_eq!(
            *upgrade(&nested, &converter).unwrap(),
            DocumentValue::Document(TypeDescriptor::new("New.Geometry.Shapes.Arc").to_document())
        );
    }

    #[test]
    fn untagged_name_objects_are_plain_data() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Geo", "New.Geometry")
            .delete("Acme", "Acme was retired.")
            .build()
            .unwrap();

        let site = doc([("Site", doc([("Name", s("Old.Geo.North"))]))]);
        assert!(matches!(upgrade(&site, &converter).unwrap(), Cow::Borrowed(_)));

        let vendors = DocumentValue::Array(vec![doc([("Name", s("Acme"))])]);
        assert!(matches!(upgrade(&vendors, &converter).unwrap(), Cow::Borrowed(_)));

        // A tagged reference to the same name is still checked.
        let tagged = DocumentValue::Document(TypeDescriptor::new("Acme").to_document());
        assert_eq!(upgrade(&tagged, &converter).unwrap_err().to_string(), "Acme was retired.");
    }

    #[test]
    fn generic_discriminator_renames_every_name() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Bag", "New.Bag")
            .rename_type("Old.Item", "New.Item")
            .build()
            .unwrap();

        let before = doc([("_t", s("Old.Bag<Old.Item>")), ("_v", DocumentValue::Array(vec![]))]);
        let after = upgrade(&before, &converter).unwrap();
        assert_eq!(after.get("_t").and_then(DocumentValue::as_str), Some("New.Bag<New.Item>"));
    }

    #[test]
    fn method_reference_replaced() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Unit", "New.Unit")
            .rename_method(
                "Geo.Shape.Scale(New.Unit)",
                MethodRef::new(TypeDescriptor::new("Geo.Shape"), "Resize", [TypeDescriptor::new("Old.Unit")]),
            )
            .build()
            .unwrap();

        // Matches only once the parameter type has been renamed.
        let old = MethodRef::new(TypeDescriptor::new("Geo.Shape"), "Scale", [TypeDescriptor::new("Old.Unit")]);
        let before = DocumentValue::Document(old.to_document());
        let after = upgrade(&before, &converter).unwrap().into_owned();

        let method = MethodRef::from_document(after.as_document().unwrap()).unwrap();
        assert_eq!(method.signature(), "Geo.Shape.Resize(New.Unit)");
        assert!(matches!(upgrade(&after, &converter).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn deleted_method_signature() {
        let converter = ConverterBuilder::new()
            .delete("Geo.Shape.Explode()", "Explode was removed.")
            .build()
            .unwrap();
        let method = MethodRef::new(TypeDescriptor::new("Geo.Shape"), "Explode", []);
        let err = upgrade(&DocumentValue::Document(method.to_document()), &converter).unwrap_err();
        assert_eq!(err.to_string(), "Explode was removed.");
    }

    #[test]
    fn migrator_keeps_identity_fields() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Plate", "New.Plate")
            .migrate_object("Old.Plate", |fields| {
                let thickness = fields.get("Mm").and_then(DocumentValue::as_f64).unwrap_or_default();
                Document::from_iter([("Thickness", DocumentValue::Float(thickness / 1000.0))])
            })
            .build()
            .unwrap();

        let before = doc([
            ("_t", s("Old.Plate")),
            ("Id", DocumentValue::Int(7)),
            ("Name", s("deck")),
            ("Mm", DocumentValue::Int(20)),
        ]);
        let after = upgrade(&before, &converter).unwrap().into_owned();
        assert_eq!(
            after,
            doc([
                ("_t", s("New.Plate")),
                ("Thickness", DocumentValue::Float(0.02)),
                ("Id", DocumentValue::Int(7)),
                ("Name", s("deck")),
            ])
        );
        assert_eq!(upgrade(&after, &converter).unwrap().into_owned(), after);
    }

    #[test]
    fn fixed_point_and_unchanged_borrow() {
        let converter = ConverterBuilder::new()
            .rename_type("A.Old", "A.New")
            .rename_type("Lib", "Core")
            .rename_member("A.Old.X", "Y")
            .build()
            .unwrap();

        let before = doc([
            ("Root", doc([("_t", s("A.Old")), ("X", DocumentValue::Int(1)), ("Z", DocumentValue::Null)])),
            ("Kind", DocumentValue::Document(TypeDescriptor::new("Lib.Shapes.Circle").to_document())),
            ("Plain", DocumentValue::Array(vec![DocumentValue::Int(1), s("x")])),
        ]);
        let once = upgrade(&before, &converter).unwrap().into_owned();
        let twice = upgrade(&once, &converter).unwrap();
        assert_eq!(*twice, once);
        assert!(matches!(twice, Cow::Borrowed(_)));

        let untouched = doc([("Plain", s("value"))]);
        assert!(matches!(upgrade(&untouched, &converter).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn prefix_spliced_targets_reach_fixed_point() {
        let converter = ConverterBuilder::new()
            .rename_type("Old.Geo", "New.Geometry")
            .rename_type("New.Geometry.Shapes", "Core.Shapes")
            .build();
        assert!(converter.is_err());

        let converter = ConverterBuilder::new()
            .rename_type("Old.Geo", "New.Geometry")
            .rename_type("Old.Geo.Shapes", "Core.Shapes")
            .build()
            .unwrap();
        let before = doc([("_t", s("Old.Geo.Shapes.Arc"))]);
        let once = upgrade(&before, &converter).unwrap().into_owned();
        assert_eq!(once, doc([("_t", s("Core.Shapes.Arc"))]));
        assert!(matches!(upgrade(&once, &converter).unwrap(), Cow::Borrowed(_)));
    }
}
