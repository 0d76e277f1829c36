//! Core data models used throughout the engine.
//!
//! A [`Region`] is a located slice of one document's text; a
//! [`DeclaredName`] is a key declared inside a region; a [`Finding`] is a
//! classified anomaly carrying enough location data to drive a rewrite
//! without re-scanning.

use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

/// Byte range into a document's text.
pub type Span = Range<usize>;

/// A declared section of a document, e.g. `props`, `properties`, `slots`.
///
/// Regions borrow from the text they were extracted from and are recomputed
/// on every scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region<'a> {
    /// The key as written on the header line.
    pub keyword: &'a str,
    /// Offset of the header line's first byte.
    pub start: usize,
    /// Exclusive end of the region: the header line alone when there is no
    /// body, otherwise the end of the last indented content line.
    pub end: usize,
    /// Indentation of the header line, in characters.
    pub depth: usize,
    /// 1-based line number of the header.
    pub line: usize,
    /// Everything after the colon up to a trailing comment or line end.
    pub value: Span,
    /// `value` with surrounding whitespace removed.
    pub inline_span: Span,
    /// The inline value, e.g. `[]`; empty for the block form.
    pub inline: &'a str,
    /// Offset of the first body line.
    pub body_start: usize,
    /// Body text, `text[body_start..end]`.
    pub raw: &'a str,
}

/// Which region a declared name was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    SchemaProperty,
    Slot,
}

/// A key declared at a fixed depth inside a region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredName {
    pub name: String,
    pub kind: NameKind,
    /// Start of the declaration line.
    pub start: usize,
    /// End of the declaration's last content line, newline included.
    pub end: usize,
}

impl DeclaredName {
    pub fn span(&self) -> Span {
        self.start..self.end
    }
}

/// Where a sequence was found in place of a mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeTarget {
    /// `variants: []`
    VariantsRoot,
    /// A `default` inside `variants` holding a sequence.
    VariantsDefault,
}

impl ShapeTarget {
    pub fn tag(self) -> &'static str {
        match self {
            ShapeTarget::VariantsRoot => "variants-root",
            ShapeTarget::VariantsDefault => "variants-default",
        }
    }
}

/// Canonical arguments of a heading include, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingArgs {
    pub title: String,
    pub as_tag: String,
    pub visual_level: String,
    pub additional_classes: Option<String>,
    pub id: Option<String>,
}

/// A recognised legacy heading invocation and its canonical replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingCall {
    pub level: u8,
    pub args: HeadingArgs,
    pub replacement: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// A bare `properties:` with no body, or `properties: []`, where an
    /// empty mapping is expected.
    ///
    /// `realign` is the indentation of a sibling key that was indented under
    /// the bare header by mistake; it is reset to the header's indentation.
    EmptyCollectionWrongShape { realign: Option<Span> },
    ArrayWhereObjectExpected(ShapeTarget),
    /// A schema property shadowed by a slot of the same name.
    ///
    /// `collapse` is the header value span of the properties region when
    /// this declaration is its last one; it receives `{}` on removal.
    NameConflict { name: String, collapse: Option<Span> },
    LegacyCallSyntax(HeadingCall),
}

impl FindingKind {
    /// Stable short code used in reports.
    pub fn code(&self) -> &'static str {
        match self {
            FindingKind::EmptyCollectionWrongShape { .. } => "empty-properties",
            FindingKind::ArrayWhereObjectExpected(target) => target.tag(),
            FindingKind::NameConflict { .. } => "name-conflict",
            FindingKind::LegacyCallSyntax(_) => "legacy-heading-call",
        }
    }

    /// Whether the rewrite engine has a generic fix for this kind.
    pub fn is_auto_fixable(&self) -> bool {
        !matches!(
            self,
            FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsDefault)
        )
    }

    /// Why a finding has to be left to a human, for kinds without a fix.
    pub fn manual_reason(&self) -> Option<&'static str> {
        match self {
            FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsDefault) => {
                Some("a sequence default needs its variant keys chosen by hand")
            }
            _ => None,
        }
    }
}

/// A classified anomaly in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub path: PathBuf,
    /// 1-based line of `span.start`.
    pub line: usize,
    /// The span a rewrite replaces.
    pub span: Span,
    /// `text[span]` at classification time.
    pub before: String,
    pub kind: FindingKind,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.kind.code())?;
        match &self.kind {
            FindingKind::NameConflict { name, .. } => write!(f, " `{}`", name),
            FindingKind::LegacyCallSyntax(call) => write!(f, " h{}", call.level),
            _ => Ok(()),
        }
    }
}
