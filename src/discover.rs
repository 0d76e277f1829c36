use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::ScanConfig;

/// Files selected for each pipeline, sorted by path.
#[derive(Debug, Default)]
pub struct Candidates {
    pub components: Vec<PathBuf>,
    pub templates: Vec<PathBuf>,
    /// Entries the walk could not read; they are reported, not fatal.
    pub walk_errors: Vec<String>,
}

pub fn discover(root: &Path, scan: &ScanConfig, backup_suffix: &str) -> Result<Candidates> {
    let component_set = build_globset(&scan.component_globs)?;
    let template_set = build_globset(&scan.template_globs)?;

    let mut default_excludes = vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/vendor/**".to_string(),
        "**/target/**".to_string(),
    ];
    default_excludes.extend(scan.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut candidates = Candidates::default();

    let walker = WalkDir::new(root).follow_links(scan.follow_symlinks);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                candidates.walk_errors.push(e.to_string());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().to_string();

        if exclude_set.is_match(&rel_str) || rel_str.ends_with(backup_suffix) {
            continue;
        }

        if component_set.is_match(&rel_str) {
            candidates.components.push(path.to_path_buf());
        } else if template_set.is_match(&rel_str) {
            candidates.templates.push(path.to_path_buf());
        }
    }

    // Sort for deterministic ordering
    candidates.components.sort();
    candidates.templates.sort();

    Ok(candidates)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
