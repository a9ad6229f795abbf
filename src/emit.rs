//! Module Generation
//!
//! Turns a parsed document (builder + import list + export name) into module
//! source text, and persists generated modules to an output directory. This
//! core only supplies the build order and resolved imports; the text layout
//! here is one possible rendering, not part of the ordering contract.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::builder::Builder;
use crate::error::Result;
use crate::names;
use crate::resolve::ImportInfo;

/// A generated module, ready to be written to disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModule {
    /// Document the module was generated from
    pub document_id: String,
    /// Output path relative to the output directory
    pub module_path: PathBuf,
    /// Name of the module's export
    pub export_name: String,
    /// Module source text
    pub source: String,
}

/// Module-generation capability consumed by the project orchestrator
pub trait ModuleGenerator {
    fn generate(
        &self,
        document_id: &str,
        root: &Builder,
        imports: &[ImportInfo],
        export_name: &str,
    ) -> Result<GeneratedModule>;
}

/// Default generator: TypeScript modules with zod-style combinators
#[derive(Debug, Clone)]
pub struct TypeScriptGenerator {
    /// Emit `export type <Name>Type = z.infer<...>` alongside the schema
    pub infer_types: bool,
    /// Header comment placed at the top of every module
    pub header: Option<String>,
}

impl Default for TypeScriptGenerator {
    fn default() -> Self {
        Self {
            infer_types: true,
            header: Some("Generated by schemabind. Do not edit by hand.".to_string()),
        }
    }
}

impl ModuleGenerator for TypeScriptGenerator {
    fn generate(
        &self,
        document_id: &str,
        root: &Builder,
        imports: &[ImportInfo],
        export_name: &str,
    ) -> Result<GeneratedModule> {
        let mut source = String::new();

        if let Some(header) = &self.header {
            source.push_str(&format!("// {}\n", header));
        }
        source.push_str("import { z } from \"zod\";\n");
        source.push_str(&render_imports(imports));
        source.push('\n');

        source.push_str(&format!(
            "export const {} = {};\n",
            export_name,
            root.render()
        ));

        if self.infer_types {
            source.push_str(&format!(
                "export type {}Type = z.infer<typeof {}>;\n",
                export_name, export_name
            ));
        }

        Ok(GeneratedModule {
            document_id: document_id.to_string(),
            module_path: module_path_for(document_id),
            export_name: export_name.to_string(),
            source,
        })
    }
}

/// One import line per module specifier, names sorted, specifiers sorted.
///
/// Bindings referenced inside a lazy thunk are still needed at runtime, so
/// every import is a value import; `type_only` only governs the thunking.
fn render_imports(imports: &[ImportInfo]) -> String {
    let mut by_module: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for import in imports {
        by_module
            .entry(import.module_path.as_str())
            .or_default()
            .push(import.name.as_str());
    }

    let mut out = String::new();
    for (module, mut bindings) in by_module {
        bindings.sort_unstable();
        bindings.dedup();
        out.push_str(&format!(
            "import {{ {} }} from \"{}\";\n",
            bindings.join(", "),
            module
        ));
    }
    out
}

/// Derive the output path for a document id: extension stripped, `.ts` added,
/// directory structure preserved.
pub fn module_path_for(document_id: &str) -> PathBuf {
    let (dir, file) = document_id
        .rsplit_once('/')
        .unwrap_or(("", document_id));
    let stem = names::strip_extension(file);

    let mut path = PathBuf::new();
    if !dir.is_empty() {
        path.push(dir);
    }
    path.push(format!("{}.ts", stem));
    path
}

/// Write generated modules under `out_dir`, creating directories as needed.
/// Returns the written paths.
pub fn write_modules(modules: &[GeneratedModule], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(modules.len());

    for module in modules {
        let path = out_dir.join(&module.module_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &module.source)?;
        tracing::info!(path = %path.display(), "wrote module");
        written.push(path);
    }

    Ok(written)
}
