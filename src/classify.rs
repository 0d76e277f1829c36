//! Anomaly classification for component definition files.
//!
//! Three checks run in a fixed order on every scan:
//!
//! 1. **Empty properties**: `properties:` with no body, directly followed by
//!    a sibling key (or the end of the file), or `properties: []`. Must be
//!    `properties: {}`. A section keyword (`slots`, `variants`, `required`,
//!    `libraryOverrides`) indented under a bare `properties:` by less than
//!    one level is a misplaced sibling, not a property.
//! 2. **Variants shape**: `variants: []` (fixable), or any `default` inside
//!    `variants` holding a sequence (manual action only).
//! 3. **Name conflicts**: a schema property and a slot sharing a name. The
//!    slot wins and the property is removed.
//!
//! A region whose indentation is ambiguous is skipped and recorded; the other
//! checks still run.

use std::collections::HashSet;
use std::path::Path;

use tracing::debug;

use crate::config::SchemaConfig;
use crate::error::RegionError;
use crate::models::{Finding, FindingKind, NameKind, Region, ShapeTarget, Span};
use crate::names::collect_names;
use crate::region::{
    extract, extract_all_within, extract_section, extract_within, is_empty_sequence, line_number,
    parse_key,
};

/// Keys that follow `properties` in a component definition and never name a
/// property when they sit shallower than one nesting level.
const SIBLING_KEYWORDS: [&str; 4] = ["slots", "variants", "required", "libraryOverrides"];

/// Result of one scan over one document.
#[derive(Debug, Default)]
pub struct Scan {
    pub findings: Vec<Finding>,
    pub region_errors: Vec<RegionError>,
}

#[derive(Debug, Clone)]
pub struct Classifier {
    indent_width: usize,
}

impl Classifier {
    /// `indent_width` is the number of characters in one nesting level.
    pub fn new(indent_width: usize) -> Self {
        Self { indent_width }
    }

    pub fn from_config(config: &SchemaConfig) -> Self {
        Self::new(config.indent_width)
    }

    pub fn classify(&self, path: &Path, text: &str) -> Scan {
        let mut pass = Pass {
            path,
            text,
            scan: Scan::default(),
        };

        let props = pass.region(extract_section(text, "props"));
        let properties = match &props {
            Ok(Some(props)) => pass.region(extract_within(text, props, "properties")),
            Ok(None) => pass.region(extract(text, "properties")),
            Err(()) => Err(()),
        };
        let properties = properties.ok().flatten();
        let props = props.ok().flatten();

        if let Some(properties) = &properties {
            self.check_empty_properties(&mut pass, properties);
        }
        self.check_variants(&mut pass);
        if let Some(properties) = &properties {
            let depth = match &props {
                Some(props) => props.depth + 2 * self.indent_width,
                None => properties.depth + self.indent_width,
            };
            self.check_conflicts(&mut pass, properties, depth);
        }

        debug!(
            path = %path.display(),
            findings = pass.scan.findings.len(),
            skipped = pass.scan.region_errors.len(),
            "classified"
        );
        pass.scan
    }

    fn check_empty_properties(&self, pass: &mut Pass<'_>, properties: &Region<'_>) {
        if is_empty_sequence(properties.inline) {
            pass.push(
                properties.inline_span.clone(),
                FindingKind::EmptyCollectionWrongShape { realign: None },
            );
            return;
        }
        if !properties.is_block() {
            return;
        }
        if !properties.has_content() {
            if properties.is_followed_by_key(pass.text) {
                pass.push(
                    properties.value.clone(),
                    FindingKind::EmptyCollectionWrongShape { realign: None },
                );
            }
            return;
        }
        let Some(first) = properties.first_content_line() else {
            return;
        };
        let misplaced = first.indent() < properties.depth + self.indent_width
            && parse_key(first.body()).is_some_and(|key| SIBLING_KEYWORDS.contains(&key.name));
        if misplaced {
            pass.push(
                properties.value.clone(),
                FindingKind::EmptyCollectionWrongShape {
                    realign: Some(first.start..first.start + first.indent()),
                },
            );
        }
    }

    fn check_variants(&self, pass: &mut Pass<'_>) {
        let text = pass.text;
        let Ok(Some(variants)) = pass.region(extract_section(text, "variants")) else {
            return;
        };
        if is_empty_sequence(variants.inline) {
            pass.push(
                variants.inline_span.clone(),
                FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsRoot),
            );
            return;
        }
        if !variants.is_block() {
            return;
        }
        let Ok(defaults) = pass.region(extract_all_within(text, &variants, "default")) else {
            return;
        };
        for default in defaults {
            let sequence = if default.is_block() {
                default.first_content().is_some_and(is_sequence_item)
            } else {
                default.inline.starts_with('[')
            };
            if sequence {
                pass.push(
                    default.start..default.end,
                    FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsDefault),
                );
            }
        }
    }

    fn check_conflicts(&self, pass: &mut Pass<'_>, properties: &Region<'_>, depth: usize) {
        let text = pass.text;
        let Ok(Some(slots)) = pass.region(extract_section(text, "slots")) else {
            return;
        };
        let slot_names: HashSet<String> =
            collect_names(&slots, slots.depth + self.indent_width, NameKind::Slot)
                .into_iter()
                .map(|n| n.name)
                .collect();
        let prop_names = collect_names(properties, depth, NameKind::SchemaProperty);
        let collapse = (prop_names.len() == 1).then(|| properties.value.clone());

        let mut seen = HashSet::new();
        for decl in &prop_names {
            if slot_names.contains(&decl.name) && seen.insert(decl.name.as_str()) {
                pass.push(
                    decl.span(),
                    FindingKind::NameConflict {
                        name: decl.name.clone(),
                        collapse: collapse.clone(),
                    },
                );
            }
        }
    }
}

fn is_sequence_item(line: &str) -> bool {
    line == "-" || line.starts_with("- ") || line.starts_with("-\t")
}

/// Mutable state of one classification pass.
struct Pass<'a> {
    path: &'a Path,
    text: &'a str,
    scan: Scan,
}

impl<'a> Pass<'a> {
    /// Record an extraction error and collapse it to `Err(())`.
    fn region<T>(&mut self, result: Result<T, RegionError>) -> Result<T, ()> {
        result.map_err(|e| {
            debug!(path = %self.path.display(), error = %e, "region skipped");
            self.scan.region_errors.push(e);
        })
    }

    fn push(&mut self, span: Span, kind: FindingKind) {
        self.scan.findings.push(Finding {
            path: self.path.to_path_buf(),
            line: line_number(self.text, span.start),
            before: self.text[span.clone()].to_string(),
            span,
            kind,
        });
    }
}
