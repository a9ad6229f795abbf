//! Schema Registry
//!
//! In-memory store mapping document ids to their entries. Entries are kept in
//! insertion order; ids are unique. No validation of schema content happens
//! here, that is the project orchestrator's job.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::emit::GeneratedModule;
use crate::error::{GeneratorError, Result};

/// Metadata attached to a registered document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// When the entry was registered
    pub created_at: DateTime<Utc>,
    /// Original source file path (if loaded from disk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
    /// Schema title, if the document declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Default for EntryMetadata {
    fn default() -> Self {
        Self {
            created_at: Utc::now(),
            source_path: None,
            title: None,
        }
    }
}

/// A registered schema document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaEntry {
    /// Unique document id (graph node key and registry key)
    pub id: String,
    /// The raw schema tree
    pub schema: serde_json::Value,
    /// Export name for the generated module
    pub export_name: String,
    /// Build artifact, populated by the orchestrator during build
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<GeneratedModule>,
    /// Entry metadata
    pub metadata: EntryMetadata,
}

impl SchemaEntry {
    /// Create a new entry with default metadata
    pub fn new(id: impl Into<String>, schema: serde_json::Value, export_name: impl Into<String>) -> Self {
        let title = schema
            .get("title")
            .and_then(|v| v.as_str())
            .map(String::from);

        Self {
            id: id.into(),
            schema,
            export_name: export_name.into(),
            artifact: None,
            metadata: EntryMetadata {
                title,
                ..EntryMetadata::default()
            },
        }
    }
}

/// Partial update for a registry entry. Unset fields are left untouched;
/// the id can never be rewritten through a patch.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub schema: Option<serde_json::Value>,
    pub export_name: Option<String>,
    pub artifact: Option<GeneratedModule>,
    pub title: Option<String>,
}

/// The in-memory schema registry
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    entries: HashMap<String, SchemaEntry>,
    /// Ids in insertion order
    order: Vec<String>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new entry. Fails if the id is already taken.
    pub fn add_entry(&mut self, entry: SchemaEntry) -> Result<()> {
        if self.entries.contains_key(&entry.id) {
            return Err(GeneratorError::DuplicateId(entry.id.clone()));
        }
        self.order.push(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
        Ok(())
    }

    /// Get an entry by id
    pub fn get_entry(&self, id: &str) -> Option<&SchemaEntry> {
        self.entries.get(id)
    }

    /// Whether a document id is registered
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// All registered ids, in insertion order
    pub fn all_ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// All entries, in insertion order
    pub fn all_entries(&self) -> Vec<&SchemaEntry> {
        self.order.iter().filter_map(|id| self.entries.get(id)).collect()
    }

    /// Remove an entry. Returns whether it existed.
    pub fn remove_entry(&mut self, id: &str) -> bool {
        if self.entries.remove(id).is_some() {
            self.order.retain(|o| o != id);
            true
        } else {
            false
        }
    }

    /// Merge the given fields into an existing entry.
    pub fn update_entry(&mut self, id: &str, patch: EntryPatch) -> Result<()> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| GeneratorError::NotFound(id.to_string()))?;

        if let Some(schema) = patch.schema {
            entry.schema = schema;
        }
        if let Some(export_name) = patch.export_name {
            entry.export_name = export_name;
        }
        if let Some(artifact) = patch.artifact {
            entry.artifact = Some(artifact);
        }
        if let Some(title) = patch.title {
            entry.metadata.title = Some(title);
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// SHA-256 fingerprint over all registered documents, in insertion order.
    /// Stable for identical content, changes on any registration or update.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for id in &self.order {
            hasher.update(id.as_bytes());
            if let Some(entry) = self.entries.get(id) {
                hasher.update(entry.schema.to_string().as_bytes());
            }
        }
        format!("{:x}", hasher.finalize())
    }
}
