//! Configuration management for the generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (schemabind.toml)
//! - Environment variables (SCHEMABIND_*)
//!
//! ## Example config file (schemabind.toml):
//! ```toml
//! [output]
//! dir = "./generated"
//! infer_types = true
//!
//! [limits]
//! max_ref_depth = 64
//! max_expansions = 2
//!
//! [naming]
//! acronyms = ["ID", "URL", "UUID", "API"]
//! preserve_screaming_case = true
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for the generator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Traversal and recursion limits
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Naming conventions
    #[serde(default)]
    pub naming: NamingConfig,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory generated modules are written to
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Emit an inferred-type alias next to each exported schema
    #[serde(default = "default_true")]
    pub infer_types: bool,

    /// Header comment placed at the top of every generated module
    #[serde(default)]
    pub header: Option<String>,
}

/// Traversal and recursion limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum depth when extracting references from a schema tree.
    /// Extraction stops early past this bound instead of recursing further.
    #[serde(default = "default_max_ref_depth")]
    pub max_ref_depth: usize,

    /// Expansion budget for self-referential nodes within one document.
    /// `None` disables the budget (only the memo breaks repetition).
    #[serde(default = "default_max_expansions")]
    pub max_expansions: Option<u32>,
}

/// Naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Acronyms to preserve (e.g., ID, URL, UUID, API)
    #[serde(default = "default_acronyms")]
    pub acronyms: HashSet<String>,

    /// Whether to preserve all-caps words as-is
    #[serde(default = "default_true")]
    pub preserve_screaming_case: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            infer_types: true,
            header: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ref_depth: default_max_ref_depth(),
            max_expansions: default_max_expansions(),
        }
    }
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            acronyms: default_acronyms(),
            preserve_screaming_case: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

fn default_true() -> bool {
    true
}

fn default_max_ref_depth() -> usize {
    64
}

fn default_max_expansions() -> Option<u32> {
    Some(2)
}

fn default_acronyms() -> HashSet<String> {
    ["ID", "URL", "UUID", "API", "HTTP", "JSON", "XML", "SQL", "URI", "UI", "IO"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl GeneratorConfig {
    /// Load configuration from file and environment, falling back to defaults.
    ///
    /// When `path` is `None`, `schemabind.toml` in the working directory is
    /// used if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("schemabind.toml"));

        let config = Config::builder()
            .add_source(File::from(file).required(false))
            .add_source(Environment::with_prefix("SCHEMABIND").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Write a default config file (for `schemabind init-config`)
    pub fn write_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Self::default())?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.output.dir, PathBuf::from("generated"));
        assert!(config.output.infer_types);
        assert_eq!(config.limits.max_ref_depth, 64);
        assert_eq!(config.limits.max_expansions, Some(2));
        assert!(config.naming.acronyms.contains("UUID"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = GeneratorConfig::load(Some(Path::new("does-not-exist.toml"))).unwrap();
        assert_eq!(config.limits.max_ref_depth, 64);
    }
}
