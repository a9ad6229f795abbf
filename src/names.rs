//! Export Name Resolution
//!
//! Derives canonical export names from document ids and detects collisions
//! across documents before any module is emitted.
//!
//! Naming is deterministic: the last path segment of the id, extension
//! stripped, converted to PascalCase. Already-Pascal names are preserved
//! exactly so hand-named documents round-trip.

use std::collections::HashMap;

use crate::config::NamingConfig;

/// A group of documents whose export names collide
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameConflict {
    /// The contested export name
    pub name: String,
    /// Ids of all documents resolving to that name
    pub documents: Vec<String>,
}

/// Result of a collision scan over the whole registry
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<NameConflict>,
}

impl ConflictReport {
    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }
}

/// Export-name capability consumed by the project orchestrator
pub trait NameResolver {
    /// Derive the export name for a document id
    fn resolve_export_name(&self, document_id: &str) -> String;

    /// Detect export-name collisions across `(document_id, export_name)` pairs
    fn detect_conflicts(&self, names: &[(String, String)]) -> ConflictReport;
}

/// Default resolver: PascalCase of the id's base name with acronym handling
#[derive(Debug, Clone, Default)]
pub struct DefaultNameResolver {
    naming: NamingConfig,
}

impl DefaultNameResolver {
    pub fn new(naming: NamingConfig) -> Self {
        Self { naming }
    }
}

impl NameResolver for DefaultNameResolver {
    fn resolve_export_name(&self, document_id: &str) -> String {
        export_name(&self.naming, document_id)
    }

    fn detect_conflicts(&self, names: &[(String, String)]) -> ConflictReport {
        let mut by_name: HashMap<&str, Vec<&str>> = HashMap::new();
        for (id, name) in names {
            by_name.entry(name.as_str()).or_default().push(id.as_str());
        }

        let mut conflicts: Vec<NameConflict> = by_name
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(name, ids)| NameConflict {
                name: name.to_string(),
                documents: ids.into_iter().map(String::from).collect(),
            })
            .collect();
        conflicts.sort_by(|a, b| a.name.cmp(&b.name));

        ConflictReport { conflicts }
    }
}

/// Extract the base name from a document id: last `/` segment with any
/// `.schema.json` / `.json` extension removed and dots made identifier-safe.
pub fn base_name(document_id: &str) -> String {
    let file_name = document_id.rsplit('/').next().unwrap_or(document_id);
    let file_name = strip_extension(file_name);

    // Dots are invalid in identifiers, e.g. "Codegen.meta" -> "Codegen_meta"
    file_name.replace('.', "_")
}

/// Strip a `.schema.json` or `.json` suffix, case-insensitively
pub fn strip_extension(name: &str) -> &str {
    let lower = name.to_ascii_lowercase();
    if lower.ends_with(".schema.json") {
        &name[..name.len() - ".schema.json".len()]
    } else if lower.ends_with(".json") {
        &name[..name.len() - ".json".len()]
    } else {
        name
    }
}

/// Derive the export name for a document id
pub fn export_name(naming: &NamingConfig, document_id: &str) -> String {
    let base = base_name(document_id);

    // No separators: preserve existing casing, only ensure a leading capital
    if !base.contains('_') && !base.contains('-') && !base.contains(' ') {
        let mut chars = base.chars();
        return match chars.next() {
            None => String::new(),
            Some(first) => first.to_uppercase().chain(chars).collect(),
        };
    }

    pascal_case(naming, &base)
}

/// Convert a separated string to PascalCase, respecting configured acronyms
pub fn pascal_case(naming: &NamingConfig, s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut current_word = String::new();

    for c in s.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current_word.is_empty() {
                result.push_str(&case_word(naming, &current_word));
                current_word.clear();
            }
        } else {
            current_word.push(c);
        }
    }

    if !current_word.is_empty() {
        result.push_str(&case_word(naming, &current_word));
    }

    result
}

fn case_word(naming: &NamingConfig, word: &str) -> String {
    let upper = word.to_uppercase();

    if naming.acronyms.contains(&upper) {
        return upper;
    }

    if naming.preserve_screaming_case && word.len() > 1 && word.chars().all(|c| c.is_ascii_uppercase()) {
        return word.to_string();
    }

    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => {
            let mut result: String = first.to_uppercase().collect();
            for c in chars {
                result.push(c.to_ascii_lowercase());
            }
            result
        }
    }
}
