//! Run orchestration.
//!
//! Coordinates one run: discovery → per-file read → pure transform →
//! backup + write (or nothing, for a dry run) → summary. Every per-file
//! failure is caught here and recorded; only a missing root or a bad
//! configuration stops a run, and both happen before any file is read.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::classify::Classifier;
use crate::commit::commit;
use crate::config::Config;
use crate::discover::discover;
use crate::document::Document;
use crate::error::RewriteError;
use crate::heading::CallRewriter;
use crate::models::Finding;
use crate::progress::{FileStatus, RunEvent, RunReporter};
use crate::rewrite::{self, SchemaOutcome};

/// Which pipelines a run covers.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Pass {
    /// Component definition files only.
    Schema,
    /// Twig templates only.
    Templates,
    All,
}

impl Pass {
    fn schema(self) -> bool {
        matches!(self, Pass::Schema | Pass::All)
    }

    fn templates(self) -> bool {
        matches!(self, Pass::Templates | Pass::All)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RunOptions {
    pub pass: Pass,
    /// Write backups and rewritten files. Off for `check` and `--dry-run`.
    pub write: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DocumentKind {
    Component,
    Template,
}

/// What happened to one file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub path: PathBuf,
    pub kind: DocumentKind,
    /// Codes of the findings fixed, in application order.
    pub codes: Vec<&'static str>,
    /// One line per fixed finding.
    pub fixed: Vec<String>,
    pub manual: Vec<String>,
    pub skipped_regions: Vec<String>,
    pub error: Option<String>,
    pub changed: bool,
    pub backup: Option<PathBuf>,
}

impl FileReport {
    fn new(path: &Path, kind: DocumentKind) -> Self {
        Self {
            path: path.to_path_buf(),
            kind,
            codes: Vec::new(),
            fixed: Vec::new(),
            manual: Vec::new(),
            skipped_regions: Vec::new(),
            error: None,
            changed: false,
            backup: None,
        }
    }

    fn status(&self) -> FileStatus<'_> {
        if let Some(error) = &self.error {
            FileStatus::Failed(error)
        } else if self.changed {
            FileStatus::Fixed(&self.codes)
        } else if !self.manual.is_empty() {
            FileStatus::Manual(self.manual.len())
        } else {
            FileStatus::Unchanged
        }
    }

    fn is_noteworthy(&self) -> bool {
        self.changed
            || self.error.is_some()
            || !self.manual.is_empty()
            || !self.skipped_regions.is_empty()
    }
}

/// The pure engines, built once per run from the configuration.
#[derive(Debug, Clone)]
pub struct Engine {
    classifier: Classifier,
    calls: CallRewriter,
    backup_suffix: String,
}

impl Engine {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            classifier: Classifier::from_config(&config.schema),
            calls: CallRewriter::new(&config.headings)?,
            backup_suffix: config.backup.suffix.clone(),
        })
    }

    /// Fix a component definition entirely in memory.
    pub fn fix_component(&self, doc: &Document) -> Result<SchemaOutcome, RewriteError> {
        rewrite::apply_all(&self.classifier, &doc.path, &doc.text)
    }

    /// Rewrite every legacy heading call in a template, in memory.
    pub fn fix_template(&self, doc: &Document) -> Result<(String, Vec<Finding>), RewriteError> {
        let findings = self.calls.find_calls(&doc.path, &doc.text);
        let text = rewrite::apply_disjoint(&doc.text, &findings)?;
        Ok((text, findings))
    }

    /// Read, transform, and (when `write`) commit one file.
    pub fn process(&self, path: &Path, kind: DocumentKind, write: bool) -> FileReport {
        let mut report = FileReport::new(path, kind);

        let doc = match Document::read(path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable file");
                report.error = Some(e.to_string());
                return report;
            }
        };

        let transformed = match kind {
            DocumentKind::Component => self.fix_component(&doc).map(|outcome| {
                report.manual = outcome
                    .manual
                    .iter()
                    .map(|f| match f.kind.manual_reason() {
                        Some(reason) => format!("{} ({})", f, reason),
                        None => f.to_string(),
                    })
                    .collect();
                report.skipped_regions =
                    outcome.region_errors.iter().map(|e| e.to_string()).collect();
                (outcome.text, outcome.fixed)
            }),
            DocumentKind::Template => self.fix_template(&doc),
        };
        let (new_text, fixed) = match transformed {
            Ok(result) => result,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rewrite refused; file left unchanged");
                report.error = Some(e.to_string());
                return report;
            }
        };

        for message in &report.skipped_regions {
            warn!(path = %path.display(), "{}", message);
        }
        if fixed.is_empty() || new_text == doc.text {
            debug!(path = %path.display(), "unchanged");
            return report;
        }

        report.codes = fixed.iter().map(|f| f.kind.code()).collect();
        report.fixed = fixed.iter().map(|f| f.to_string()).collect();

        if write {
            match commit(&doc, &new_text, &self.backup_suffix) {
                Ok(committed) => report.backup = Some(committed.backup),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "commit failed");
                    report.error = Some(e.to_string());
                    return report;
                }
            }
        }
        report.changed = true;
        info!(path = %path.display(), fixes = fixed.len(), write, "rewritten");
        report
    }
}

/// Everything a run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
    pub walk_errors: Vec<String>,
    pub write: bool,
}

impl RunSummary {
    pub fn fix_count(&self) -> usize {
        self.files.iter().map(|f| f.codes.len()).sum()
    }

    pub fn changed_files(&self) -> usize {
        self.files.iter().filter(|f| f.changed).count()
    }

    pub fn manual_count(&self) -> usize {
        self.files.iter().map(|f| f.manual.len()).sum()
    }

    pub fn skipped_region_count(&self) -> usize {
        self.files.iter().map(|f| f.skipped_regions.len()).sum()
    }

    pub fn failed_files(&self) -> usize {
        self.files.iter().filter(|f| f.error.is_some()).count() + self.walk_errors.len()
    }

    /// Print the per-file listing and totals on stdout.
    pub fn print(&self, command: &str) {
        if self.write {
            println!("{}", command);
        } else {
            println!("{} (dry-run)", command);
        }
        let verb = if self.write { "fixed" } else { "would fix" };

        for file in self.files.iter().filter(|f| f.is_noteworthy()) {
            println!("  {}", file.path.display());
            for line in &file.fixed {
                println!("    {:<12} {}", verb, line);
            }
            for line in &file.manual {
                println!("    {:<12} {}", "manual", line);
            }
            for line in &file.skipped_regions {
                println!("    {:<12} {}", "skipped", line);
            }
            if let Some(error) = &file.error {
                println!("    {:<12} {}", "error", error);
            }
            if let Some(backup) = &file.backup {
                println!("    {:<12} {}", "backup", backup.display());
            }
        }
        for error in &self.walk_errors {
            println!("  {:<14} {}", "unreadable", error);
        }

        println!("  files scanned: {}", self.files.len());
        println!("  files changed: {}", self.changed_files());
        println!("  fixes: {}", self.fix_count());
        println!("  manual actions: {}", self.manual_count());
        println!("  skipped regions: {}", self.skipped_region_count());
        println!("  failed files: {}", self.failed_files());
        println!("ok");
    }
}

pub fn run(config: &Config, options: &RunOptions, reporter: &dyn RunReporter) -> Result<RunSummary> {
    let root = config.root()?;
    let engine = Engine::new(config)?;
    let candidates = discover(root, &config.scan, &config.backup.suffix)?;

    let mut queue: Vec<(PathBuf, DocumentKind)> = Vec::new();
    if options.pass.schema() {
        queue.extend(
            candidates
                .components
                .into_iter()
                .map(|p| (p, DocumentKind::Component)),
        );
    }
    if options.pass.templates() {
        queue.extend(
            candidates
                .templates
                .into_iter()
                .map(|p| (p, DocumentKind::Template)),
        );
    }

    let components = queue
        .iter()
        .filter(|(_, kind)| *kind == DocumentKind::Component)
        .count();
    info!(root = %root.display(), components, templates = queue.len() - components, "discovered");
    reporter.report(RunEvent::Discovered {
        components,
        templates: queue.len() - components,
    });
    for error in &candidates.walk_errors {
        warn!(error = %error, "unreadable directory entry");
    }

    let total = queue.len() as u64;
    let mut summary = RunSummary {
        files: Vec::with_capacity(queue.len()),
        walk_errors: candidates.walk_errors,
        write: options.write,
    };
    for (i, (path, kind)) in queue.iter().enumerate() {
        let report = engine.process(path, *kind, options.write);
        reporter.report(RunEvent::File {
            path,
            n: i as u64 + 1,
            total,
            status: report.status(),
        });
        summary.files.push(report);
    }

    Ok(summary)
}
