use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// The caller's parsed `Cargo.toml`, used to name sibling crates from
/// generated code.
///
/// # Example
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.get_crate_path("vc_persist"));
/// ```
///
/// # Resolution rules
///
/// 1. A crate listed in `dependencies` resolves to `::crate_name`.
/// 2. A `vc_*` crate reached through the `vc_store` facade resolves to
///    `::vc_store::short_name` (`vc_persist` -> `::vc_store::persist`).
/// 3. Steps 1 and 2 are repeated for `dev-dependencies`.
/// 4. Anything else falls back to `::crate_name`.
///
/// A crate that expands its own derives into doctests names itself
/// absolutely, so its root needs `extern crate self as crate_name;`.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Document<Box<str>>,
    pub modified_time: SystemTime,
}

const FACADE_NAME: &str = "vc_store";
const MEMBER_PREFIX: &str = "vc_";

impl Manifest {
    #[inline(never)]
    fn manifest_path() -> PathBuf {
        let dir = env::var_os("CARGO_MANIFEST_DIR")
            .expect("CARGO_MANIFEST_DIR should be set by cargo when expanding proc-macros");
        let path = PathBuf::from(dir).join("Cargo.toml");
        assert!(path.exists(), "no Cargo manifest at {}", path.display());
        path
    }

    #[inline(never)]
    fn modified_time(path: &Path) -> std::io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    #[inline(never)]
    fn read(path: &Path) -> Document<Box<str>> {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
            .into_boxed_str();
        Document::parse(text).unwrap_or_else(|e| panic!("cannot parse {}: {e}", path.display()))
    }

    fn absolute(segments: &[&str]) -> syn::Path {
        let mut text = String::new();
        for segment in segments {
            text.push_str("::");
            text.push_str(segment);
        }
        syn::parse_str(&text).unwrap_or_else(|e| panic!("`{text}` is not a path: {e}"))
    }

    fn find_in(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::absolute(&[name]));
        }
        let short = name.strip_prefix(MEMBER_PREFIX)?;
        deps.contains_key(FACADE_NAME)
            .then(|| Self::absolute(&[FACADE_NAME, short]))
    }

    /// Resolves `name` against the caller's dependency tables.
    #[inline(never)]
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        ["dependencies", "dev-dependencies"]
            .into_iter()
            .find_map(|table| match self.manifest.get(table) {
                Some(Item::Table(deps)) => Self::find_in(deps, name),
                _ => None,
            })
            .unwrap_or_else(|| Self::absolute(&[name]))
    }

    /// Runs `func` on the caller's manifest, parsing it at most once per
    /// modification.
    ///
    /// Callers should resolve every path they need inside a single call.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static CACHE: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let path = Self::manifest_path();
        let modified_time =
            Self::modified_time(&path).expect("the caller's Cargo.toml should have a modified time");

        {
            let cache = CACHE.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(manifest) = cache.get(&path)
                && manifest.modified_time == modified_time
            {
                return func(manifest);
            }
        }

        let manifest = Manifest {
            manifest: Self::read(&path),
            modified_time,
        };
        let result = func(&manifest);
        CACHE
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::Manifest;
    use quote::ToTokens;
    use toml_edit::Document;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            manifest: Document::parse(text.to_owned().into_boxed_str()).unwrap(),
            modified_time: std::time::SystemTime::UNIX_EPOCH,
        }
    }

    fn path_of(m: &Manifest, name: &str) -> String {
        m.get_crate_path(name).to_token_stream().to_string().replace(' ', "")
    }

    #[test]
    fn direct_dependency_wins() {
        let m = manifest("[dependencies]\nvc_persist = \"0\"\nvc_store = \"0\"\n");
        assert_eq!(path_of(&m, "vc_persist"), "::vc_persist");
    }

    #[test]
    fn facade_and_fallback() {
        let m = manifest("[dev-dependencies]\nvc_store = \"0\"\n");
        assert_eq!(path_of(&m, "vc_persist"), "::vc_store::persist");
        assert_eq!(path_of(&m, "serde"), "::serde");
    }
}
