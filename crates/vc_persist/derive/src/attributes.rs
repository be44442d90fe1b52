//! Parsing of `#[persist(..)]` attributes.

use proc_macro2::Span;
use syn::spanned::Spanned;
use syn::{Attribute, LitStr, Path};

use crate::PERSIST_ATTRIBUTE_NAME;

// -----------------------------------------------------------------------------
// RenameRule

/// The `rename_all` conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RenameRule {
    PascalCase,
    CamelCase,
    SnakeCase,
    ScreamingSnakeCase,
    LowerCase,
    UpperCase,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        Ok(match lit.value().as_str() {
            "PascalCase" => Self::PascalCase,
            "camelCase" => Self::CamelCase,
            "snake_case" => Self::SnakeCase,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnakeCase,
            "lowercase" => Self::LowerCase,
            "UPPERCASE" => Self::UpperCase,
            _ => {
                return Err(syn::Error::new(
                    lit.span(),
                    "expected one of: `PascalCase`, `camelCase`, `snake_case`, `SCREAMING_SNAKE_CASE`, `lowercase`, `UPPERCASE`",
                ));
            }
        })
    }

    pub fn apply(self, ident: &str) -> String {
        let words = split_words(ident);
        match self {
            Self::PascalCase => words.iter().map(|w| capitalize(w)).collect(),
            Self::CamelCase => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
                .collect(),
            Self::SnakeCase => words.join("_"),
            Self::ScreamingSnakeCase => words.join("_").to_uppercase(),
            Self::LowerCase => words.concat(),
            Self::UpperCase => words.concat().to_uppercase(),
        }
    }
}

/// Lower-case words of a `snake_case` or `PascalCase` identifier.
fn split_words(ident: &str) -> Vec<String> {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut words = Vec::new();
    let mut current = String::new();
    let mut after_lower = false;
    for c in ident.chars() {
        if c == '_' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            after_lower = false;
            continue;
        }
        if c.is_uppercase() && after_lower {
            words.push(std::mem::take(&mut current));
        }
        after_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn persist_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident(PERSIST_ATTRIBUTE_NAME))
}

// -----------------------------------------------------------------------------
// TypeAttributes

/// `#[persist(..)]` on the type.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub type_path: Option<LitStr>,
    pub default: Option<Span>,
    pub rename_all: Option<RenameRule>,
    pub implements: Vec<Path>,
    pub auto_register: Option<Span>,
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in persist_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("type_path") {
                    let lit: LitStr = meta.value()?.parse()?;
                    if lit.value().trim().is_empty() {
                        return Err(meta.error("`type_path` cannot be empty"));
                    }
                    this.type_path = Some(lit);
                } else if meta.path.is_ident("default") {
                    this.default = Some(meta.path.span());
                } else if meta.path.is_ident("rename_all") {
                    let lit: LitStr = meta.value()?.parse()?;
                    this.rename_all = Some(RenameRule::parse(&lit)?);
                } else if meta.path.is_ident("implements") {
                    meta.parse_nested_meta(|inner| {
                        this.implements.push(inner.path);
                        Ok(())
                    })?;
                } else if meta.path.is_ident("auto_register") {
                    this.auto_register = Some(meta.path.span());
                } else {
                    return Err(meta.error(
                        "expected one of: `type_path`, `default`, `rename_all`, `implements`, `auto_register`",
                    ));
                }
                Ok(())
            })?;
        }
        Ok(this)
    }

    /// The serialized name of a field or variant.
    pub fn member_name(&self, ident: &syn::Ident, field: &FieldAttributes) -> String {
        if let Some(rename) = &field.rename {
            return rename.value();
        }
        let ident = ident.to_string();
        match self.rename_all {
            Some(rule) => rule.apply(&ident),
            None => ident.strip_prefix("r#").map(String::from).unwrap_or(ident),
        }
    }
}

// -----------------------------------------------------------------------------
// FieldAttributes

/// `#[persist(..)]` on a field or a variant.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub rename: Option<LitStr>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in persist_attrs(attrs) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let lit: LitStr = meta.value()?.parse()?;
                    let name = lit.value();
                    if name.is_empty() || name.starts_with('_') {
                        return Err(meta.error("a member name cannot be empty or start with `_`"));
                    }
                    this.rename = Some(lit);
                    Ok(())
                } else {
                    Err(meta.error("expected `rename`"))
                }
            })?;
        }
        Ok(this)
    }
}

#[cfg(test)]
mod tests {
    use super::RenameRule;

    #[test]
    fn rename_rules() {
        assert_eq!(RenameRule::PascalCase.apply("side_length"), "SideLength");
        assert_eq!(RenameRule::CamelCase.apply("side_length"), "sideLength");
        assert_eq!(RenameRule::SnakeCase.apply("SideLength"), "side_length");
        assert_eq!(RenameRule::ScreamingSnakeCase.apply("SideLength"), "SIDE_LENGTH");
        assert_eq!(RenameRule::LowerCase.apply("Side_Length"), "sidelength");
        assert_eq!(RenameRule::UpperCase.apply("side"), "SIDE");
        assert_eq!(RenameRule::PascalCase.apply("r#type"), "Type");
        assert_eq!(RenameRule::PascalCase.apply("x2"), "X2");
    }
}
