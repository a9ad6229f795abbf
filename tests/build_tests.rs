//! End-to-End Build Tests
//!
//! Exercises the full pipeline: registration, validation, dependency
//! ordering, cycle-aware generation and on-disk output.

use serde_json::json;

use schemabind::{
    write_modules, DefaultNameResolver, DefaultParser, GeneratorConfig, GeneratorError, IssueCode,
    ParseContext, ParseOutcome, SchemaEntry, SchemaParser, SchemaProject, TypeScriptGenerator,
};

fn project() -> SchemaProject {
    SchemaProject::new(GeneratorConfig::default())
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_build_orders_dependencies_first() {
    let mut p = project();
    p.add_schema("user", json!({"type": "object", "properties": {"id": {"type": "string"}}}))
        .unwrap();
    p.add_schema("post", json!({"type": "object", "properties": {"author": {"$ref": "user"}}}))
        .unwrap();

    let report = p.build();
    assert!(report.success);
    assert_eq!(report.modules.len(), 2);
    assert_eq!(report.modules[0].document_id, "user");
    assert_eq!(report.modules[1].document_id, "post");

    // The dependent imports its dependency as a plain named import
    let post = &report.modules[1];
    assert!(post.source.contains("import { User } from \"./user\";"));
    assert!(post.source.contains("author: User"));
    assert!(!post.source.contains("z.lazy"));
}

#[test]
fn test_diamond_dependencies_each_built_once() {
    let mut p = project();
    p.add_schema("base", json!({"type": "object"})).unwrap();
    p.add_schema("left", json!({"properties": {"b": {"$ref": "base"}}})).unwrap();
    p.add_schema("right", json!({"properties": {"b": {"$ref": "base"}}})).unwrap();
    p.add_schema(
        "top",
        json!({"properties": {"l": {"$ref": "left"}, "r": {"$ref": "right"}}}),
    )
    .unwrap();

    let report = p.build();
    assert!(report.success);
    assert_eq!(report.modules.len(), 4);

    let pos = |id: &str| {
        report
            .modules
            .iter()
            .position(|m| m.document_id == id)
            .unwrap()
    };
    assert!(pos("base") < pos("left"));
    assert!(pos("base") < pos("right"));
    assert!(pos("left") < pos("top"));
    assert!(pos("right") < pos("top"));
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_mutual_cycle_marks_exactly_one_edge_lazy() {
    let mut p = project();
    // Registration order fixes the fallback build order: a first, then b
    p.add_schema("a", json!({"properties": {"b": {"$ref": "b"}}})).unwrap();
    p.add_schema("b", json!({"properties": {"a": {"$ref": "a"}}})).unwrap();

    let report = p.build();
    assert!(report.success, "cycles must not prevent building");
    assert_eq!(report.modules.len(), 2);

    let a = report.modules.iter().find(|m| m.document_id == "a").unwrap();
    let b = report.modules.iter().find(|m| m.document_id == "b").unwrap();

    // The edge traversed first (a -> b) stays eager; the edge that closes
    // the cycle (b -> a) is deferred
    assert!(!a.source.contains("z.lazy"), "first edge must stay plain:\n{}", a.source);
    assert!(b.source.contains("z.lazy(() => A)"), "second edge must defer:\n{}", b.source);

    // Cycle surfaced as a warning, once
    let circular: Vec<_> = report
        .warnings
        .iter()
        .filter(|w| w.code == IssueCode::CircularRef)
        .collect();
    assert_eq!(circular.len(), 1);
}

#[test]
fn test_three_node_cycle_builds_with_one_lazy_edge() {
    let mut p = project();
    p.add_schema("user", json!({"properties": {"p": {"$ref": "profile"}}})).unwrap();
    p.add_schema("profile", json!({"properties": {"s": {"$ref": "settings"}}})).unwrap();
    p.add_schema("settings", json!({"properties": {"u": {"$ref": "user"}}})).unwrap();

    let report = p.build();
    assert!(report.success);

    let lazy_count: usize = report
        .modules
        .iter()
        .map(|m| m.source.matches("z.lazy(").count())
        .sum();
    assert_eq!(lazy_count, 1, "exactly the cycle-closing edge defers");

    // The back edge is the one pointing at the first-built document
    let settings = report
        .modules
        .iter()
        .find(|m| m.document_id == "settings")
        .unwrap();
    assert!(settings.source.contains("z.lazy(() => User)"));
}

#[test]
fn test_cycle_members_listed_in_warning() {
    let mut p = project();
    p.add_schema("user", json!({"properties": {"p": {"$ref": "profile"}}})).unwrap();
    p.add_schema("profile", json!({"properties": {"u": {"$ref": "user"}}})).unwrap();

    let report = p.validate();
    let warning = report
        .warnings
        .iter()
        .find(|w| w.code == IssueCode::CircularRef)
        .unwrap();
    assert!(warning.message.contains("user"));
    assert!(warning.message.contains("profile"));
}

// =============================================================================
// Self reference
// =============================================================================

#[test]
fn test_self_referential_document_builds() {
    let mut p = project();
    p.add_schema(
        "node",
        json!({
            "type": "object",
            "properties": {
                "value": {"type": "string"},
                "next": {"$ref": "#"}
            }
        }),
    )
    .unwrap();

    let report = p.build();
    assert!(report.success);

    // Internal self reference: no graph cycle, no import, guard fallback
    assert!(report.warnings.iter().all(|w| w.code != IssueCode::CircularRef));
    let module = &report.modules[0];
    assert!(!module.source.contains("import { Node }"));
    assert!(module.source.contains("z.any()"));
}

// =============================================================================
// Failure handling
// =============================================================================

#[test]
fn test_unresolved_ref_warns_but_builds() {
    let mut p = project();
    p.add_schema("doc", json!({"properties": {"x": {"$ref": "ghost"}}})).unwrap();

    let report = p.build();
    assert!(report.success);
    assert_eq!(report.modules.len(), 1);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.code == IssueCode::MissingRef));
    assert!(report.modules[0].source.contains("z.any()"));
}

#[test]
fn test_name_collision_aborts_with_no_modules() {
    let mut p = project();
    p.add_schema("auth/User.json", json!({"type": "object"})).unwrap();
    p.add_schema("api/User.json", json!({"type": "object"})).unwrap();

    let report = p.build();
    assert!(!report.success);
    assert!(report.modules.is_empty());
    assert!(report
        .errors
        .iter()
        .any(|e| e.code == IssueCode::NameCollision));
}

struct FailingParser {
    fail_id: String,
}

impl SchemaParser for FailingParser {
    fn parse_document(
        &self,
        entry: &SchemaEntry,
        ctx: &ParseContext<'_>,
    ) -> schemabind::Result<ParseOutcome> {
        if entry.id == self.fail_id {
            return Err(GeneratorError::Parse {
                document: entry.id.clone(),
                path: "#".to_string(),
                reason: "injected failure".to_string(),
            });
        }
        DefaultParser.parse_document(entry, ctx)
    }
}

#[test]
fn test_single_document_failure_is_isolated() {
    let config = GeneratorConfig::default();
    let names = Box::new(DefaultNameResolver::new(config.naming.clone()));
    let mut p = SchemaProject::with_capabilities(
        config,
        Box::new(FailingParser {
            fail_id: "broken".to_string(),
        }),
        names,
        Box::new(TypeScriptGenerator::default()),
    );

    p.add_schema("user", json!({"type": "object"})).unwrap();
    p.add_schema("broken", json!({"type": "object"})).unwrap();
    p.add_schema("post", json!({"properties": {"u": {"$ref": "user"}}})).unwrap();

    let report = p.build();
    assert!(!report.success);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].code, IssueCode::GenerationFailed);
    assert_eq!(report.errors[0].document_id.as_deref(), Some("broken"));

    // The other documents still generated
    let ids: Vec<&str> = report.modules.iter().map(|m| m.document_id.as_str()).collect();
    assert!(ids.contains(&"user"));
    assert!(ids.contains(&"post"));
    assert!(!ids.contains(&"broken"));
}

// =============================================================================
// Artifacts and disk output
// =============================================================================

#[test]
fn test_artifacts_recorded_on_registry_entries() {
    let mut p = project();
    p.add_schema("user", json!({"type": "object"})).unwrap();

    let report = p.build();
    assert!(report.success);

    let entry = p.registry().get_entry("user").unwrap();
    let artifact = entry.artifact.as_ref().unwrap();
    assert_eq!(artifact.export_name, "User");
    assert!(artifact.source.contains("export const User"));
}

#[test]
fn test_directory_roundtrip() {
    let schema_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();

    std::fs::create_dir_all(schema_dir.path().join("auth")).unwrap();
    std::fs::write(
        schema_dir.path().join("auth/user.json"),
        serde_json::to_string_pretty(&json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "required": ["name"]
        }))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(
        schema_dir.path().join("post.json"),
        serde_json::to_string_pretty(&json!({
            "type": "object",
            "properties": {"author": {"$ref": "auth/user.json"}}
        }))
        .unwrap(),
    )
    .unwrap();

    let mut p = project();
    assert_eq!(p.add_schemas_from_dir(schema_dir.path()).unwrap(), 2);

    let report = p.build();
    assert!(report.success, "errors: {:?}", report.errors);

    let written = write_modules(&report.modules, out_dir.path()).unwrap();
    assert_eq!(written.len(), 2);
    assert!(out_dir.path().join("auth/user.ts").exists());
    assert!(out_dir.path().join("post.ts").exists());

    let post = std::fs::read_to_string(out_dir.path().join("post.ts")).unwrap();
    assert!(post.contains("import { User } from \"./auth/user\";"));
    assert!(post.contains("export const Post"));
}

#[test]
fn test_fingerprint_stable_across_builds() {
    let mut p = project();
    p.add_schema("user", json!({"type": "object"})).unwrap();

    let before = p.registry().fingerprint();
    p.build();
    let after = p.registry().fingerprint();
    assert_eq!(before, after, "building must not alter registered schemas");
}
