//! The rewrite engine: findings in, new text out.
//!
//! Every rewrite is a splice of the single span a [`Finding`] names. Before
//! splicing, the span is checked against the text the classifier saw, so a
//! finding from an older scan can never corrupt a newer text.
//!
//! Schema fixes run one finding per pass: apply, reclassify, repeat. Offsets
//! are therefore always fresh; nothing is batched.

use std::path::Path;

use tracing::debug;

use crate::classify::Classifier;
use crate::error::{RegionError, RewriteError};
use crate::models::{Finding, FindingKind, ShapeTarget, Span};

/// Extra passes allowed beyond the first scan's finding count.
const PASS_SLACK: usize = 8;

/// Apply one finding to `text`.
pub fn apply(text: &str, finding: &Finding) -> Result<String, RewriteError> {
    verify(text, &finding.span, &finding.before)?;
    let span = finding.span.clone();
    match &finding.kind {
        FindingKind::EmptyCollectionWrongShape { realign } => {
            let text = match realign {
                // The sibling line follows the header, so realigning it first
                // leaves the header's offsets valid.
                Some(indent) => {
                    expect_blank(text, indent)?;
                    let header = header_indent(text, span.start);
                    splice(text, indent.clone(), header)
                }
                None => text.to_string(),
            };
            let replacement = empty_mapping(&text, &span);
            Ok(splice(&text, span, replacement))
        }
        FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsRoot) => {
            Ok(splice(text, span, "{}"))
        }
        FindingKind::ArrayWhereObjectExpected(target @ ShapeTarget::VariantsDefault) => {
            Err(RewriteError::UnsupportedShapeFix {
                target: target.tag(),
                reason: finding.kind.manual_reason().unwrap_or_default(),
            })
        }
        FindingKind::NameConflict { collapse, .. } => {
            let removed = splice(text, span, "");
            match collapse {
                // The header precedes the body, so its offsets survive the removal.
                Some(header) => {
                    expect_blank(&removed, header)?;
                    let replacement = empty_mapping(&removed, header);
                    Ok(splice(&removed, header.clone(), replacement))
                }
                None => Ok(removed),
            }
        }
        FindingKind::LegacyCallSyntax(call) => Ok(splice(text, span, &call.replacement)),
    }
}

/// Apply findings from one scan whose spans do not overlap.
///
/// Findings are applied back to front so earlier offsets stay valid.
pub fn apply_disjoint(text: &str, findings: &[Finding]) -> Result<String, RewriteError> {
    let mut ordered: Vec<&Finding> = findings.iter().collect();
    ordered.sort_by_key(|f| f.span.start);
    if let Some(pair) = ordered.windows(2).find(|w| w[0].span.end > w[1].span.start) {
        return Err(RewriteError::StaleFinding {
            start: pair[1].span.start,
            end: pair[1].span.end,
            expected: pair[1].before.clone(),
        });
    }

    let mut out = text.to_string();
    for finding in ordered.iter().rev() {
        out = apply(&out, finding)?;
    }
    Ok(out)
}

fn verify(text: &str, span: &Span, expected: &str) -> Result<(), RewriteError> {
    if text.get(span.clone()) == Some(expected) {
        Ok(())
    } else {
        Err(RewriteError::StaleFinding {
            start: span.start,
            end: span.end,
            expected: expected.to_string(),
        })
    }
}

/// Text that turns the value at `span` into an empty mapping.
///
/// A flow sequence is replaced outright. A bare value gets ` {}`, with a
/// trailing space when a comment follows so that `#` still starts one.
fn empty_mapping(text: &str, span: &Span) -> &'static str {
    if !text[span.clone()].trim().is_empty() {
        "{}"
    } else if text[span.end..].starts_with('#') {
        " {} "
    } else {
        " {}"
    }
}

fn expect_blank(text: &str, span: &Span) -> Result<(), RewriteError> {
    match text.get(span.clone()) {
        Some(value) if value.trim().is_empty() => Ok(()),
        _ => Err(RewriteError::StaleFinding {
            start: span.start,
            end: span.end,
            expected: String::new(),
        }),
    }
}

/// Leading whitespace of the line containing `offset`.
fn header_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    &line[..line.len() - line.trim_start_matches([' ', '\t']).len()]
}

fn splice(text: &str, span: Span, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..span.start]);
    out.push_str(replacement);
    out.push_str(&text[span.end..]);
    out
}

/// Outcome of fixing one component document.
#[derive(Debug, Clone)]
pub struct SchemaOutcome {
    pub text: String,
    /// Findings fixed, in the order they were applied.
    pub fixed: Vec<Finding>,
    /// Findings left for a human.
    pub manual: Vec<Finding>,
    pub region_errors: Vec<RegionError>,
}

impl SchemaOutcome {
    pub fn changed(&self) -> bool {
        !self.fixed.is_empty()
    }
}

/// Fix every auto-fixable finding in `text`, one per pass.
pub fn apply_all(
    classifier: &Classifier,
    path: &Path,
    text: &str,
) -> Result<SchemaOutcome, RewriteError> {
    let mut current = text.to_string();
    let mut fixed = Vec::new();
    let mut scan = classifier.classify(path, &current);
    let budget = scan.findings.len() + PASS_SLACK;

    loop {
        let next = scan
            .findings
            .iter()
            .find(|f| f.kind.is_auto_fixable())
            .cloned();
        let Some(finding) = next else {
            break;
        };
        if fixed.len() == budget {
            return Err(RewriteError::NoProgress { passes: budget });
        }
        current = apply(&current, &finding)?;
        debug!(path = %path.display(), kind = finding.kind.code(), line = finding.line, "applied");
        fixed.push(finding);
        scan = classifier.classify(path, &current);
    }

    Ok(SchemaOutcome {
        text: current,
        fixed,
        manual: scan.findings,
        region_errors: scan.region_errors,
    })
}
