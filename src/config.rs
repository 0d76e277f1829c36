use anyhow::{bail, Context, Result};
use globset::Glob;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::heading::CallRewriter;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub headings: HeadingsConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_component_globs")]
    pub component_globs: Vec<String>,
    #[serde(default = "default_template_globs")]
    pub template_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            root: None,
            component_globs: default_component_globs(),
            template_globs: default_template_globs(),
            exclude_globs: Vec::new(),
            follow_symlinks: false,
        }
    }
}

fn default_component_globs() -> Vec<String> {
    vec!["**/*.component.yml".to_string()]
}
fn default_template_globs() -> Vec<String> {
    vec!["**/*.twig".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchemaConfig {
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            indent_width: default_indent_width(),
        }
    }
}

fn default_indent_width() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct HeadingsConfig {
    /// Namespace the legacy `h1`..`h6` templates live under.
    #[serde(default = "default_legacy_namespace")]
    pub legacy_namespace: String,
    #[serde(default = "default_target_template")]
    pub target_template: String,
    /// Key wrapping the canonical arguments.
    #[serde(default = "default_argument_group")]
    pub argument_group: String,
}

impl Default for HeadingsConfig {
    fn default() -> Self {
        Self {
            legacy_namespace: default_legacy_namespace(),
            target_template: default_target_template(),
            argument_group: default_argument_group(),
        }
    }
}

fn default_legacy_namespace() -> String {
    "@components".to_string()
}
fn default_target_template() -> String {
    "@adesso_cms_theme/heading/heading.twig".to_string()
}
fn default_argument_group() -> String {
    "heading".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    #[serde(default = "default_backup_suffix")]
    pub suffix: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            suffix: default_backup_suffix(),
        }
    }
}

fn default_backup_suffix() -> String {
    ".bak".to_string()
}

impl Config {
    /// Defaults everywhere, scanning `root`.
    pub fn minimal(root: Option<PathBuf>) -> Self {
        let mut config = Self::default();
        config.scan.root = root;
        config
    }

    /// The root to scan; a missing root ends the run before any file is read.
    pub fn root(&self) -> Result<&Path> {
        let root = self
            .scan
            .root
            .as_deref()
            .context("No scan root: pass --root or set scan.root in the config file")?;
        if !root.is_dir() {
            bail!("Scan root does not exist: {}", root.display());
        }
        Ok(root)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.schema.indent_width == 0 {
        bail!("schema.indent_width must be > 0");
    }

    if config.backup.suffix.is_empty() {
        bail!("backup.suffix must not be empty");
    }

    if config.scan.component_globs.is_empty() && config.scan.template_globs.is_empty() {
        bail!("scan.component_globs and scan.template_globs are both empty");
    }

    for pattern in config
        .scan
        .component_globs
        .iter()
        .chain(&config.scan.template_globs)
        .chain(&config.scan.exclude_globs)
    {
        Glob::new(pattern).with_context(|| format!("Invalid glob: '{}'", pattern))?;
    }

    if config.headings.argument_group.is_empty() {
        bail!("headings.argument_group must not be empty");
    }

    // Rejects a target the legacy matcher would pick up again.
    CallRewriter::new(&config.headings)?;

    Ok(())
}
