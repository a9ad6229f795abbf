//! Project Orchestrator
//!
//! Composes the registry, resolver, dependency graph and the parser/name/
//! module-generator capabilities: registers documents, rebuilds the graph,
//! reports structural problems, computes a build order and generates one
//! module per document with cycle-aware import wiring.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::GeneratorConfig;
use crate::emit::{GeneratedModule, ModuleGenerator, TypeScriptGenerator};
use crate::error::{GeneratorError, Result};
use crate::graph::DependencyGraph;
use crate::names::{DefaultNameResolver, NameResolver};
use crate::parse::{DefaultParser, ParseContext, SchemaParser};
use crate::registry::{EntryPatch, SchemaEntry, SchemaRegistry};
use crate::resolve::{collect_refs, relative_import_path, RefResolution, RefResolver};

/// Issue categories surfaced by validation and build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCode {
    /// A reference that resolves to no known document
    MissingRef,
    /// A document participates in a reference cycle (informational; the
    /// build wires such references lazily)
    CircularRef,
    /// Two or more documents map to the same export name
    NameCollision,
    /// A schema root that is neither an object nor a boolean
    MalformedDocument,
    /// A single document's parse or generation step failed
    GenerationFailed,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingRef => "MISSING_REF",
            Self::CircularRef => "CIRCULAR_REF",
            Self::NameCollision => "NAME_COLLISION",
            Self::MalformedDocument => "MALFORMED_DOCUMENT",
            Self::GenerationFailed => "GENERATION_FAILED",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single validation or build issue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub code: IssueCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    pub message: String,
}

impl Issue {
    fn new(code: IssueCode, document_id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            document_id,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document_id {
            Some(id) => write!(f, "[{}] {}: {}", self.code, id, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Structured validation result; never thrown
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Structured build result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    /// True only when every document generated successfully
    pub success: bool,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    /// Modules that did generate, even when others failed
    pub modules: Vec<GeneratedModule>,
}

/// The project orchestrator
pub struct SchemaProject {
    config: GeneratorConfig,
    registry: SchemaRegistry,
    graph: DependencyGraph,
    resolver: RefResolver,
    parser: Box<dyn SchemaParser>,
    names: Box<dyn NameResolver>,
    generator: Box<dyn ModuleGenerator>,
}

impl SchemaProject {
    /// Create a project with default capabilities. All wiring happens here,
    /// at construction time.
    pub fn new(config: GeneratorConfig) -> Self {
        let names = Box::new(DefaultNameResolver::new(config.naming.clone()));
        let generator = Box::new(TypeScriptGenerator {
            infer_types: config.output.infer_types,
            header: config
                .output
                .header
                .clone()
                .or_else(|| TypeScriptGenerator::default().header),
        });
        Self::with_capabilities(config, Box::new(DefaultParser), names, generator)
    }

    /// Create a project with injected capabilities
    pub fn with_capabilities(
        config: GeneratorConfig,
        parser: Box<dyn SchemaParser>,
        names: Box<dyn NameResolver>,
        generator: Box<dyn ModuleGenerator>,
    ) -> Self {
        let resolver =
            RefResolver::new(config.naming.clone()).with_transformer(Box::new(relative_import_path));

        Self {
            config,
            registry: SchemaRegistry::new(),
            graph: DependencyGraph::new(),
            resolver,
            parser,
            names,
            generator,
        }
    }

    /// Register a schema document. Duplicate ids are a hard error.
    pub fn add_schema(&mut self, id: impl Into<String>, schema: serde_json::Value) -> Result<()> {
        let id = id.into();
        tracing::debug!(document = %id, "registering schema");
        self.register_entry(id, schema, None)
    }

    /// Register a schema document from a file. The document id is the
    /// schema's `$id` if present, else the file name. Returns the id.
    pub fn add_schema_from_file(&mut self, path: &Path) -> Result<String> {
        let schema = read_schema(path)?;
        let id = schema
            .get("$id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| {
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string())
            });

        self.register_entry(id.clone(), schema, Some(path.to_path_buf()))?;
        Ok(id)
    }

    /// Register every `.json` document under a directory. Ids are paths
    /// relative to the directory (or `$id` when declared). Scan order is
    /// sorted so registration order is deterministic across platforms.
    pub fn add_schemas_from_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map(|ext| ext == "json").unwrap_or(false))
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut added = 0;
        for path in paths {
            let schema = read_schema(&path)?;
            let relative = path
                .strip_prefix(dir)
                .unwrap_or(path.as_path())
                .to_string_lossy()
                .replace('\\', "/");
            let id = schema
                .get("$id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .unwrap_or(relative);

            self.register_entry(id, schema, Some(path))?;
            added += 1;
        }

        tracing::info!(count = added, dir = %dir.display(), "registered schema documents");
        Ok(added)
    }

    fn register_entry(
        &mut self,
        id: String,
        schema: serde_json::Value,
        source_path: Option<PathBuf>,
    ) -> Result<()> {
        let export_name = self.names.resolve_export_name(&id);
        let mut entry = SchemaEntry::new(id, schema, export_name);
        entry.metadata.source_path = source_path;
        self.registry.add_entry(entry)
    }

    /// Remove a registered document. Returns whether it existed.
    pub fn remove_schema(&mut self, id: &str) -> bool {
        self.registry.remove_entry(id)
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Read-only snapshot of the dependency graph from the last validation
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Resolve a reference against the current registry state
    pub fn resolve_ref(&self, reference: &str, from_id: &str) -> Option<RefResolution> {
        self.resolver.resolve(&self.registry, reference, from_id)
    }

    /// Rebuild the dependency graph from scratch and report structural
    /// errors and resolution warnings. Always returns a report, never
    /// throws.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();

        tracing::debug!(documents = self.registry.len(), "rebuilding dependency graph");
        self.graph = DependencyGraph::new();
        for id in self.registry.all_ids() {
            self.graph.add_node(id);
        }

        let mut edges: Vec<(String, String)> = Vec::new();
        for entry in self.registry.all_entries() {
            if !(entry.schema.is_object() || entry.schema.is_boolean()) {
                report.errors.push(Issue::new(
                    IssueCode::MalformedDocument,
                    Some(entry.id.clone()),
                    "schema root must be an object or boolean",
                ));
                continue;
            }

            for found in collect_refs(&entry.schema, self.config.limits.max_ref_depth) {
                match self.resolver.resolve(&self.registry, &found.target, &entry.id) {
                    Some(resolution) if resolution.is_external => {
                        edges.push((entry.id.clone(), resolution.target_id));
                    }
                    Some(_) => {}
                    None => {
                        report.warnings.push(Issue::new(
                            IssueCode::MissingRef,
                            Some(entry.id.clone()),
                            format!(
                                "unresolved reference '{}' at #/{}",
                                found.target,
                                found.at.join("/")
                            ),
                        ));
                    }
                }
            }
        }

        for (from, to) in edges {
            self.graph.add_edge(&from, &to);
        }

        for cycle in self.graph.detect_cycles() {
            report.warnings.push(Issue::new(
                IssueCode::CircularRef,
                None,
                format!("reference cycle: {}", cycle.join(" -> ")),
            ));
        }

        let pairs: Vec<(String, String)> = self
            .registry
            .all_entries()
            .into_iter()
            .map(|e| (e.id.clone(), e.export_name.clone()))
            .collect();
        for conflict in self.names.detect_conflicts(&pairs).conflicts {
            report.errors.push(Issue::new(
                IssueCode::NameCollision,
                None,
                format!(
                    "export name '{}' claimed by: {}",
                    conflict.name,
                    conflict.documents.join(", ")
                ),
            ));
        }

        report
    }

    /// Validate, order, and generate one module per document.
    ///
    /// Cycles do not prevent building: affected components fall back to
    /// registration order and the reference that closes each cycle is wired
    /// lazily. A failing document is recorded and skipped; the rest of the
    /// batch still builds.
    pub fn build(&mut self) -> BuildReport {
        let validation = self.validate();
        if !validation.is_valid() {
            tracing::warn!(errors = validation.errors.len(), "validation failed, aborting build");
            return BuildReport {
                success: false,
                errors: validation.errors,
                warnings: validation.warnings,
                modules: Vec::new(),
            };
        }

        let order = match self.graph.topological_sort() {
            Ok(order) => order,
            Err(err) => {
                tracing::warn!(%err, "building cyclic components in registration order");
                self.registry.all_ids().into_iter().map(String::from).collect()
            }
        };
        let positions: HashMap<String, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let mut errors = Vec::new();
        let mut modules = Vec::new();

        for id in &order {
            let generated = {
                let Some(entry) = self.registry.get_entry(id) else {
                    continue;
                };
                let ctx = ParseContext {
                    document_id: id,
                    registry: &self.registry,
                    graph: &self.graph,
                    resolver: &self.resolver,
                    positions: &positions,
                    config: &self.config,
                };
                self.parser.parse_document(entry, &ctx).and_then(|outcome| {
                    self.generator
                        .generate(id, &outcome.builder, &outcome.imports, &entry.export_name)
                })
            };

            match generated {
                Ok(module) => {
                    modules.push(module.clone());
                    let _ = self.registry.update_entry(
                        id,
                        EntryPatch {
                            artifact: Some(module),
                            ..EntryPatch::default()
                        },
                    );
                }
                Err(err) => {
                    tracing::warn!(document = %id, %err, "document failed, continuing batch");
                    errors.push(Issue::new(
                        IssueCode::GenerationFailed,
                        Some(id.clone()),
                        err.to_string(),
                    ));
                }
            }
        }

        BuildReport {
            success: errors.is_empty(),
            errors,
            warnings: validation.warnings,
            modules,
        }
    }
}

fn read_schema(path: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| GeneratorError::InvalidDocument {
        id: path.display().to_string(),
        reason: e.to_string(),
    })
}
