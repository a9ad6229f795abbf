//! Schemabind
//!
//! Converts a set of JSON-Schema-like documents into generated source
//! modules, one module per document, wiring cross-document references into
//! imports. Handles arbitrary reference topologies, including cycles.
//!
//! ## Features
//!
//! - **Dependency Graph**: petgraph-backed graph over documents with
//!   Tarjan SCC cycle detection and topological build ordering
//! - **Reference Resolution**: internal pointers, external ids, and
//!   file-path-style references with normalization
//! - **Cycle-Aware Imports**: references that close an import cycle are
//!   wired as deferred (lazy) references so generated modules load cleanly
//! - **Recursion Guard**: self-referential documents parse to completion
//!   under a bounded expansion budget
//! - **Partial-Failure Builds**: one document failing never stops the batch
//!
//! ## Pipeline
//!
//! ```text
//! documents -> SchemaRegistry -> RefResolver (edges)
//!           -> DependencyGraph (cycles + order)
//!           -> SchemaProject::build -> Parser/Builder -> ModuleGenerator
//! ```

pub mod builder;
pub mod config;
pub mod emit;
pub mod error;
pub mod graph;
pub mod guard;
pub mod names;
pub mod parse;
pub mod project;
pub mod registry;
pub mod resolve;

pub use builder::{Builder, TypeExpr};
pub use config::GeneratorConfig;
pub use emit::{write_modules, GeneratedModule, ModuleGenerator, TypeScriptGenerator};
pub use error::{GeneratorError, Result};
pub use graph::{DependencyGraph, GraphSummary};
pub use guard::{GuardOutcome, RecursionGuard};
pub use names::{ConflictReport, DefaultNameResolver, NameConflict, NameResolver};
pub use parse::{DefaultParser, ParseContext, ParseOutcome, SchemaParser};
pub use project::{BuildReport, Issue, IssueCode, SchemaProject, ValidationReport};
pub use registry::{EntryPatch, SchemaEntry, SchemaRegistry};
pub use resolve::{ImportInfo, ImportKind, RefResolution, RefResolver};
