//! Schema Parsing
//!
//! Walks one document's schema tree and produces a `Builder` for the module
//! generator, plus the list of imports the document needs. Every node is
//! classified once (`shape`) and dispatched exhaustively.
//!
//! The walk is protected by a `RecursionGuard` so self-referential documents
//! terminate, and consults the dependency graph to decide whether an external
//! reference must be wired lazily.

pub mod shape;

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde_json::Value;

use crate::builder::Builder;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::graph::DependencyGraph;
use crate::guard::{GuardOutcome, RecursionGuard};
use crate::registry::{SchemaEntry, SchemaRegistry};
use crate::resolve::{ImportInfo, RefResolver};

use self::shape::{classify, CombinatorKind, NodeShape, PrimitiveKind};

/// Everything a parser needs to resolve references while walking one
/// document. Borrowed state only; the parser never mutates the project.
pub struct ParseContext<'a> {
    pub document_id: &'a str,
    pub registry: &'a SchemaRegistry,
    pub graph: &'a DependencyGraph,
    pub resolver: &'a RefResolver,
    /// Build position per document id; used to pick the cycle edge that gets
    /// deferred. Empty outside a build.
    pub positions: &'a HashMap<String, usize>,
    pub config: &'a GeneratorConfig,
}

/// Result of parsing one document
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub builder: Builder,
    pub imports: Vec<ImportInfo>,
}

/// Parser capability consumed by the project orchestrator
pub trait SchemaParser {
    fn parse_document(&self, entry: &SchemaEntry, ctx: &ParseContext<'_>) -> Result<ParseOutcome>;
}

/// Location of a node within its document, for diagnostics
#[derive(Debug, Clone, Default)]
pub struct NodePath(Vec<String>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    /// Child path; the parent is left untouched
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "#")
        } else {
            write!(f, "#/{}", self.0.join("/"))
        }
    }
}

/// Default parser: shape-classified walk with guard-protected recursion
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultParser;

impl SchemaParser for DefaultParser {
    fn parse_document(&self, entry: &SchemaEntry, ctx: &ParseContext<'_>) -> Result<ParseOutcome> {
        let mut walker = Walker {
            ctx,
            root: &entry.schema,
            guard: RecursionGuard::new(ctx.config.limits.max_expansions),
            imports: Vec::new(),
        };

        let builder = walker.parse_node(&entry.schema, &NodePath::root())?;

        Ok(ParseOutcome {
            builder,
            imports: walker.imports,
        })
    }
}

struct Walker<'a> {
    ctx: &'a ParseContext<'a>,
    root: &'a Value,
    guard: RecursionGuard<Builder>,
    imports: Vec<ImportInfo>,
}

impl<'a> Walker<'a> {
    fn parse_node(&mut self, node: &'a Value, path: &NodePath) -> Result<Builder> {
        match self.guard.enter(node) {
            GuardOutcome::Cached(builder) => return Ok(builder),
            GuardOutcome::Fallback => return Ok(Builder::any()),
            GuardOutcome::Proceed => {}
        }

        let built = self.parse_shape(node, path)?;
        self.guard.complete(node, built.clone());
        Ok(built)
    }

    fn parse_shape(&mut self, node: &'a Value, path: &NodePath) -> Result<Builder> {
        let builder = match classify(node) {
            NodeShape::Bool(true) => Builder::any(),
            NodeShape::Bool(false) => Builder::never(),
            NodeShape::Ref(target) => self.parse_ref(target, path)?,
            NodeShape::Combinator(kind, items) => {
                let keyword = match kind {
                    CombinatorKind::AllOf => "allOf",
                    CombinatorKind::AnyOf => "anyOf",
                    CombinatorKind::OneOf => "oneOf",
                };
                let mut parts = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    parts.push(self.parse_node(item, &path.child(keyword).child(i.to_string()))?);
                }
                match kind {
                    CombinatorKind::AllOf => Builder::intersection(parts),
                    CombinatorKind::AnyOf | CombinatorKind::OneOf => Builder::union(parts),
                }
            }
            NodeShape::Enum(values) => parse_enum(values),
            NodeShape::Const(value) => Builder::literal(value.clone()),
            // `not` has no combinator counterpart in the output, leave the
            // value unconstrained
            NodeShape::Not(_) => Builder::any(),
            NodeShape::Conditional { then, otherwise } => {
                let mut branches = Vec::new();
                if let Some(then) = then {
                    branches.push(self.parse_node(then, &path.child("then"))?);
                }
                if let Some(otherwise) = otherwise {
                    branches.push(self.parse_node(otherwise, &path.child("else"))?);
                }
                Builder::union(branches)
            }
            NodeShape::Object(obj) => self.parse_object(obj, path)?,
            NodeShape::Array(obj) => self.parse_array(obj, path)?,
            NodeShape::Primitive(kind) => parse_primitive(kind, node),
            NodeShape::Unknown => Builder::any(),
        };

        Ok(apply_annotations(builder, node))
    }

    fn parse_ref(&mut self, target: &str, path: &NodePath) -> Result<Builder> {
        let Some(resolution) =
            self.ctx
                .resolver
                .resolve(self.ctx.registry, target, self.ctx.document_id)
        else {
            tracing::debug!(
                document = self.ctx.document_id,
                reference = target,
                at = %path,
                "unresolved reference, substituting unconstrained value"
            );
            return Ok(Builder::any());
        };

        if !resolution.is_external {
            // Same document: follow the pointer and keep walking. The guard
            // handles re-entry into subtrees that are already being parsed.
            return match locate(self.root, &resolution.path) {
                Some(located) => self.parse_node(located, path),
                None => Ok(Builder::any()),
            };
        }

        let Some(mut import) = resolution.import else {
            return Ok(Builder::any());
        };

        // Bind to the target's actual export name when it is registered
        if let Some(target_entry) = self.ctx.registry.get_entry(&resolution.target_id) {
            import.name = target_entry.export_name.clone();
        }

        let lazy = self.closes_cycle(&resolution.target_id);
        import.type_only = lazy;

        let binding = import.name.clone();
        if resolution.target_id != self.ctx.document_id {
            self.record_import(import);
        }

        Ok(Builder::reference(binding, lazy))
    }

    /// An edge is deferred iff both ends share a detected cycle component and
    /// the target is not built later than this document: that back edge is
    /// the one that would fail to load eagerly.
    fn closes_cycle(&self, target_id: &str) -> bool {
        if !self.ctx.graph.in_same_cycle(self.ctx.document_id, target_id) {
            return false;
        }
        position(self.ctx.positions, target_id)
            <= position(self.ctx.positions, self.ctx.document_id)
    }

    fn record_import(&mut self, import: ImportInfo) {
        let exists = self
            .imports
            .iter()
            .any(|i| i.name == import.name && i.module_path == import.module_path);
        if !exists {
            self.imports.push(import);
        }
    }

    fn parse_object(
        &mut self,
        obj: &'a serde_json::Map<String, Value>,
        path: &NodePath,
    ) -> Result<Builder> {
        let required: HashSet<&str> = obj
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut fields = Vec::new();
        if let Some(props) = obj.get("properties").and_then(|v| v.as_object()) {
            for (name, prop) in props {
                let parsed = self.parse_node(prop, &path.child("properties").child(name))?;
                let parsed = if required.contains(name.as_str()) {
                    parsed
                } else {
                    parsed.optional()
                };
                fields.push((name.clone(), parsed));
            }
        }

        let catchall = match obj.get("additionalProperties") {
            Some(Value::Bool(true)) => Some(Builder::any()),
            Some(extra @ Value::Object(_)) => {
                Some(self.parse_node(extra, &path.child("additionalProperties"))?)
            }
            _ => None,
        };

        Ok(match (fields.is_empty(), catchall) {
            (true, Some(values)) => Builder::record(values),
            (false, Some(values)) => Builder::object_with_catchall(fields, values),
            (_, None) => Builder::object(fields),
        })
    }

    fn parse_array(
        &mut self,
        obj: &'a serde_json::Map<String, Value>,
        path: &NodePath,
    ) -> Result<Builder> {
        match obj.get("items") {
            Some(Value::Array(items)) => {
                let mut parts = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    parts.push(self.parse_node(item, &path.child("items").child(i.to_string()))?);
                }
                Ok(Builder::tuple(parts))
            }
            Some(items) => Ok(Builder::array(
                self.parse_node(items, &path.child("items"))?,
            )),
            None => Ok(Builder::array(Builder::any())),
        }
    }
}

fn parse_enum(values: &[Value]) -> Builder {
    let strings: Option<Vec<String>> = values
        .iter()
        .map(|v| v.as_str().map(String::from))
        .collect();

    match strings {
        Some(strings) if !strings.is_empty() => Builder::enum_of(strings),
        _ => Builder::union(values.iter().map(|v| Builder::literal(v.clone())).collect()),
    }
}

fn parse_primitive(kind: PrimitiveKind, node: &Value) -> Builder {
    let mut builder = match kind {
        PrimitiveKind::String => Builder::string(),
        PrimitiveKind::Integer => Builder::integer(),
        PrimitiveKind::Number => Builder::number(),
        PrimitiveKind::Boolean => Builder::boolean(),
        PrimitiveKind::Null => Builder::null(),
    };

    match kind {
        PrimitiveKind::String => {
            if let Some(min) = node.get("minLength").and_then(Value::as_u64) {
                builder = builder.check(format!("min({})", min));
            }
            if let Some(max) = node.get("maxLength").and_then(Value::as_u64) {
                builder = builder.check(format!("max({})", max));
            }
        }
        PrimitiveKind::Integer | PrimitiveKind::Number => {
            if let Some(min) = node.get("minimum").and_then(Value::as_f64) {
                builder = builder.check(format!("min({})", min));
            }
            if let Some(max) = node.get("maximum").and_then(Value::as_f64) {
                builder = builder.check(format!("max({})", max));
            }
        }
        _ => {}
    }

    builder
}

fn apply_annotations(mut builder: Builder, node: &Value) -> Builder {
    let Some(obj) = node.as_object() else {
        return builder;
    };

    if let Some(description) = obj.get("description").and_then(Value::as_str) {
        builder = builder.describe(description);
    }
    if let Some(default) = obj.get("default") {
        builder = builder.default_value(default.clone());
    }
    if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
        builder = builder.nullable();
    }

    builder
}

/// Walk a pointer path into a document tree
fn locate<'v>(root: &'v Value, segments: &[String]) -> Option<&'v Value> {
    let mut current = root;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(arr) => arr.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Position in the build order; unknown documents sort last
fn position(positions: &HashMap<String, usize>, id: &str) -> usize {
    positions.get(id).copied().unwrap_or(usize::MAX)
}
