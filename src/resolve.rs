//! Reference Resolution
//!
//! Classifies and resolves reference strings found inside schema documents.
//! Three forms are recognized:
//!
//! - internal (`#/definitions/X`) — resolves within the owning document
//! - external by id (`other-doc#/path`, `other-doc`) — matches a registered id
//! - external by path (`./other.schema.json#/path`) — matches after path
//!   normalization (relative prefixes, extensions, case)
//!
//! Resolution is a pure function of the current registry state; failure is a
//! soft condition (`None`), callers decide whether it is a warning or an
//! error.

use serde::{Deserialize, Serialize};

use crate::config::NamingConfig;
use crate::names;
use crate::registry::SchemaRegistry;

/// How an import binds in the generated module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
}

/// Import derived for a cross-document reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportInfo {
    /// Binding name in the importing module
    pub name: String,
    /// Import style; `Named` unless the target document's convention differs
    pub kind: ImportKind,
    /// Module specifier for the import statement
    pub module_path: String,
    /// Promoted to `true` when the reference participates in a cycle
    pub type_only: bool,
}

/// Immutable result of resolving one reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefResolution {
    /// Document the reference points into
    pub target_id: String,
    /// In-document pointer segments (empty for a whole-document reference)
    pub path: Vec<String>,
    /// Whether the target is a different document
    pub is_external: bool,
    /// Present only when `is_external` is true
    pub import: Option<ImportInfo>,
}

/// Hook overriding module-path derivation: `(from_id, target_id) -> specifier`
pub type ImportPathTransformer = dyn Fn(&str, &str) -> String + Send + Sync;

/// Resolves reference strings against the current registry state
pub struct RefResolver {
    naming: NamingConfig,
    transformer: Option<Box<ImportPathTransformer>>,
}

impl RefResolver {
    pub fn new(naming: NamingConfig) -> Self {
        Self {
            naming,
            transformer: None,
        }
    }

    /// Install an import-path transformer, applied last during derivation
    pub fn with_transformer(mut self, transformer: Box<ImportPathTransformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Resolve `reference` as it occurs inside `from_id`.
    ///
    /// Never mutates the registry; returns `None` when no registered document
    /// matches.
    pub fn resolve(
        &self,
        registry: &SchemaRegistry,
        reference: &str,
        from_id: &str,
    ) -> Option<RefResolution> {
        // Internal reference: "#", "#/", "#/definitions/X"
        if let Some(pointer) = reference.strip_prefix('#') {
            return Some(RefResolution {
                target_id: from_id.to_string(),
                path: split_pointer(pointer),
                is_external: false,
                import: None,
            });
        }

        // External with a pointer part: "target#/path"
        if let Some((target, pointer)) = reference.split_once('#') {
            let target_id = self.resolve_target(registry, target)?;
            let import = self.derive_import(from_id, &target_id);
            return Some(RefResolution {
                target_id,
                path: split_pointer(pointer),
                is_external: true,
                import: Some(import),
            });
        }

        // Bare document reference: "other-doc"
        let target_id = self.resolve_target(registry, reference)?;
        let import = self.derive_import(from_id, &target_id);
        Some(RefResolution {
            target_id,
            path: Vec::new(),
            is_external: true,
            import: Some(import),
        })
    }

    /// Resolve a target token to a registered document id
    fn resolve_target(&self, registry: &SchemaRegistry, target: &str) -> Option<String> {
        // Exact match first
        if registry.contains(target) {
            return Some(target.to_string());
        }

        // Normalized / suffix match, first registered id wins
        let wanted = normalize_target(target);
        if wanted.is_empty() {
            return None;
        }

        registry
            .all_ids()
            .into_iter()
            .find(|id| {
                let candidate = normalize_target(id);
                candidate == wanted
                    || suffix_matches(&candidate, &wanted)
                    || suffix_matches(&wanted, &candidate)
            })
            .map(String::from)
    }

    /// Derive import name and module path for a cross-document reference
    fn derive_import(&self, from_id: &str, target_id: &str) -> ImportInfo {
        let name = names::export_name(&self.naming, target_id);

        let module_path = if let Some(transformer) = &self.transformer {
            transformer(from_id, target_id)
        } else if directory_of(from_id) == directory_of(target_id) {
            format!("./{}", names::base_name(target_id))
        } else {
            target_id.to_string()
        };

        ImportInfo {
            name,
            kind: ImportKind::Named,
            module_path,
            type_only: false,
        }
    }
}

/// Split a JSON-pointer-ish fragment into segments, dropping empties so a
/// double or trailing slash never yields an empty path element.
fn split_pointer(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Normalize a path-style target for matching: forward slashes, relative
/// prefixes dropped, lowercased, extension stripped.
fn normalize_target(target: &str) -> String {
    let mut t = target.replace('\\', "/");

    loop {
        if let Some(rest) = t.strip_prefix("./") {
            t = rest.to_string();
        } else if let Some(rest) = t.strip_prefix("../") {
            t = rest.to_string();
        } else {
            break;
        }
    }

    let t = t.to_lowercase();
    names::strip_extension(&t).to_string()
}

/// True when `longer` ends with `shorter` at a `/` boundary
fn suffix_matches(longer: &str, shorter: &str) -> bool {
    longer.len() > shorter.len()
        && longer.ends_with(shorter)
        && longer.as_bytes()[longer.len() - shorter.len() - 1] == b'/'
}

fn directory_of(id: &str) -> &str {
    id.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// Compute a relative module specifier from one document to another, used as
/// the default import-path transformer wiring.
pub fn relative_import_path(from_id: &str, to_id: &str) -> String {
    let from_dirs: Vec<&str> = directory_of(from_id).split('/').filter(|s| !s.is_empty()).collect();
    let to_dirs: Vec<&str> = directory_of(to_id).split('/').filter(|s| !s.is_empty()).collect();

    let common = from_dirs
        .iter()
        .zip(to_dirs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from_dirs.len() - common;
    let mut parts: Vec<String> = Vec::new();
    if ups == 0 {
        parts.push(".".to_string());
    } else {
        parts.extend(std::iter::repeat("..".to_string()).take(ups));
    }
    parts.extend(to_dirs[common..].iter().map(|s| s.to_string()));
    parts.push(names::base_name(to_id));

    parts.join("/")
}

/// A reference found while scanning a schema tree
#[derive(Debug, Clone, PartialEq)]
pub struct FoundRef {
    /// Path of the node the reference was found at
    pub at: Vec<String>,
    /// The raw reference string
    pub target: String,
}

/// Collect every `$ref` occurring anywhere in a schema tree, bounded by a
/// maximum traversal depth. Extraction stops early past the bound instead of
/// recursing further.
pub fn collect_refs(schema: &serde_json::Value, max_depth: usize) -> Vec<FoundRef> {
    let mut refs = Vec::new();
    collect_into(schema, &mut Vec::new(), max_depth, &mut refs);
    refs
}

fn collect_into(
    node: &serde_json::Value,
    at: &mut Vec<String>,
    remaining: usize,
    refs: &mut Vec<FoundRef>,
) {
    match node {
        serde_json::Value::Object(obj) => {
            if let Some(target) = obj.get("$ref").and_then(|v| v.as_str()) {
                refs.push(FoundRef {
                    at: at.clone(),
                    target: target.to_string(),
                });
            }

            if remaining == 0 {
                return;
            }

            for (key, value) in obj {
                at.push(key.clone());
                collect_into(value, at, remaining - 1, refs);
                at.pop();
            }
        }
        serde_json::Value::Array(arr) => {
            if remaining == 0 {
                return;
            }

            for (i, value) in arr.iter().enumerate() {
                at.push(i.to_string());
                collect_into(value, at, remaining - 1, refs);
                at.pop();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaEntry;
    use serde_json::json;

    fn registry_with(ids: &[&str]) -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        for id in ids {
            registry
                .add_entry(SchemaEntry::new(*id, json!({"type": "object"}), "X"))
                .unwrap();
        }
        registry
    }

    fn resolver() -> RefResolver {
        RefResolver::new(NamingConfig::default())
    }

    #[test]
    fn test_internal_ref() {
        let registry = registry_with(&["user"]);
        let res = resolver()
            .resolve(&registry, "#/definitions/Address", "user")
            .unwrap();

        assert_eq!(res.target_id, "user");
        assert_eq!(res.path, vec!["definitions", "Address"]);
        assert!(!res.is_external);
        assert!(res.import.is_none());
    }

    #[test]
    fn test_bare_hash_is_empty_path() {
        let registry = registry_with(&["user"]);
        for reference in ["#", "#/"] {
            let res = resolver().resolve(&registry, reference, "user").unwrap();
            assert_eq!(res.target_id, "user");
            assert!(res.path.is_empty());
            assert!(!res.is_external);
        }
    }

    #[test]
    fn test_double_slash_drops_empty_segments() {
        let registry = registry_with(&["user"]);
        let res = resolver().resolve(&registry, "#/defs//Address/", "user").unwrap();
        assert_eq!(res.path, vec!["defs", "Address"]);
    }

    #[test]
    fn test_external_by_id_with_pointer() {
        let registry = registry_with(&["user", "post"]);
        let res = resolver()
            .resolve(&registry, "user#/properties/id", "post")
            .unwrap();

        assert_eq!(res.target_id, "user");
        assert_eq!(res.path, vec!["properties", "id"]);
        assert!(res.is_external);

        let import = res.import.unwrap();
        assert_eq!(import.name, "User");
        assert_eq!(import.kind, ImportKind::Named);
        assert_eq!(import.module_path, "./user");
        assert!(!import.type_only);
    }

    #[test]
    fn test_bare_external_ref() {
        let registry = registry_with(&["user", "post"]);
        let res = resolver().resolve(&registry, "user", "post").unwrap();

        assert_eq!(res.target_id, "user");
        assert!(res.path.is_empty());
        assert!(res.is_external);
        assert!(res.import.is_some());
    }

    #[test]
    fn test_missing_target_is_soft_failure() {
        let registry = registry_with(&["user"]);
        assert!(resolver().resolve(&registry, "missing#/x", "user").is_none());
        assert!(resolver().resolve(&registry, "missing", "user").is_none());
    }

    #[test]
    fn test_path_normalization_match() {
        let registry = registry_with(&["defs/User.schema.json"]);
        let res = resolver()
            .resolve(&registry, "./defs/user.json#/x", "root.json")
            .unwrap();
        assert_eq!(res.target_id, "defs/User.schema.json");
    }

    #[test]
    fn test_relative_parent_ref_suffix_match() {
        let registry = registry_with(&["schemas/defs/user.json"]);
        let res = resolver()
            .resolve(&registry, "../defs/user.json", "schemas/api/post.json")
            .unwrap();
        assert_eq!(res.target_id, "schemas/defs/user.json");
    }

    #[test]
    fn test_first_match_wins() {
        let registry = registry_with(&["a/user.json", "b/user.json"]);
        let res = resolver().resolve(&registry, "user.json", "root").unwrap();
        assert_eq!(res.target_id, "a/user.json");
    }

    #[test]
    fn test_suffix_requires_boundary() {
        // "er.json" must not match "user.json"
        let registry = registry_with(&["user.json"]);
        assert!(resolver().resolve(&registry, "er.json", "root").is_none());
    }

    #[test]
    fn test_idempotent_resolution() {
        let registry = registry_with(&["user", "post"]);
        let r = resolver();
        let first = r.resolve(&registry, "user#/a/b", "post");
        let second = r.resolve(&registry, "user#/a/b", "post");
        assert_eq!(first, second);
    }

    #[test]
    fn test_cross_directory_module_path() {
        let registry = registry_with(&["auth/user.json", "api/post.json"]);
        let res = resolver()
            .resolve(&registry, "auth/user.json", "api/post.json")
            .unwrap();
        assert_eq!(res.import.unwrap().module_path, "auth/user.json");
    }

    #[test]
    fn test_transformer_applied_last() {
        let registry = registry_with(&["auth/user.json", "api/post.json"]);
        let r = resolver().with_transformer(Box::new(relative_import_path));
        let res = r.resolve(&registry, "auth/user.json", "api/post.json").unwrap();
        assert_eq!(res.import.unwrap().module_path, "../auth/user");
    }

    #[test]
    fn test_relative_import_path() {
        assert_eq!(relative_import_path("post.json", "user.json"), "./user");
        assert_eq!(relative_import_path("api/post.json", "auth/user.json"), "../auth/user");
        assert_eq!(relative_import_path("a/b.json", "a/c/d.json"), "./c/d");
        assert_eq!(relative_import_path("a/b/c.json", "x.json"), "../../x");
    }

    #[test]
    fn test_collect_refs_finds_nested() {
        let schema = json!({
            "properties": {
                "owner": {"$ref": "user#/x"},
                "tags": {"items": {"$ref": "#/defs/Tag"}}
            },
            "allOf": [{"$ref": "base"}]
        });

        let refs = collect_refs(&schema, 16);
        let targets: Vec<&str> = refs.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(refs.len(), 3);
        assert!(targets.contains(&"user#/x"));
        assert!(targets.contains(&"#/defs/Tag"));
        assert!(targets.contains(&"base"));
    }

    #[test]
    fn test_collect_refs_depth_bound() {
        let schema = json!({"a": {"b": {"c": {"$ref": "deep"}}}});
        assert!(collect_refs(&schema, 2).is_empty());
        assert_eq!(collect_refs(&schema, 3).len(), 1);
    }
}
