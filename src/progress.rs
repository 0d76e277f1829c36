//! Per-file progress reporting.
//!
//! Reports what happens to each file as the run goes: fixed, unchanged,
//! needing manual action, skipped, or failed. Progress is emitted on
//! **stderr** so the stdout summary remains parseable for scripts.

use std::io::Write;
use std::path::Path;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum RunEvent<'a> {
    /// Discovery finished.
    Discovered { components: usize, templates: usize },
    /// File `n` of `total` was processed.
    File {
        path: &'a Path,
        n: u64,
        total: u64,
        status: FileStatus<'a>,
    },
}

#[derive(Clone, Debug)]
pub enum FileStatus<'a> {
    /// Rewritten (or would be, in a dry run), with the finding codes applied.
    Fixed(&'a [&'static str]),
    Unchanged,
    /// Findings left for a human.
    Manual(usize),
    Failed(&'a str),
}

impl FileStatus<'_> {
    fn label(&self) -> &'static str {
        match self {
            FileStatus::Fixed(_) => "fixed",
            FileStatus::Unchanged => "unchanged",
            FileStatus::Manual(_) => "manual",
            FileStatus::Failed(_) => "failed",
        }
    }
}

/// Reports run progress. Implementations write to stderr (human or JSON).
pub trait RunReporter {
    fn report(&self, event: RunEvent<'_>);
}

/// Human-friendly progress on stderr: "[  3 / 120] fixed  card.component.yml  name-conflict".
pub struct StderrProgress;

impl RunReporter for StderrProgress {
    fn report(&self, event: RunEvent<'_>) {
        let line = match &event {
            RunEvent::Discovered {
                components,
                templates,
            } => format!(
                "found {} component files, {} templates\n",
                format_number(*components as u64),
                format_number(*templates as u64)
            ),
            RunEvent::File {
                path,
                n,
                total,
                status,
            } => {
                let detail = match status {
                    FileStatus::Fixed(codes) => codes.join(", "),
                    FileStatus::Manual(count) => format!("{} manual action(s)", count),
                    FileStatus::Failed(error) => error.to_string(),
                    FileStatus::Unchanged => String::new(),
                };
                format!(
                    "[{} / {}] {:<9} {}  {}\n",
                    format_number(*n),
                    format_number(*total),
                    status.label(),
                    path.display(),
                    detail
                )
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl RunReporter for JsonProgress {
    fn report(&self, event: RunEvent<'_>) {
        let obj = match &event {
            RunEvent::Discovered {
                components,
                templates,
            } => serde_json::json!({
                "event": "discovered",
                "components": components,
                "templates": templates
            }),
            RunEvent::File {
                path,
                n,
                total,
                status,
            } => {
                let mut obj = serde_json::json!({
                    "event": "file",
                    "path": path.display().to_string(),
                    "status": status.label(),
                    "n": n,
                    "total": total
                });
                match status {
                    FileStatus::Fixed(codes) => obj["fixed"] = serde_json::json!(codes),
                    FileStatus::Manual(count) => obj["manual"] = serde_json::json!(count),
                    FileStatus::Failed(error) => obj["error"] = serde_json::json!(error),
                    FileStatus::Unchanged => {}
                }
                obj
            }
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl RunReporter for NoProgress {
    fn report(&self, _event: RunEvent<'_>) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn RunReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
