//! Region extraction by indentation.
//!
//! A region is a key line plus every following line indented deeper than
//! it. Blank lines and comment lines are tentative: they belong to the
//! region only when a deeper content line follows them, so trailing blank
//! lines stay with whatever comes next.
//!
//! Tabs and spaces both count as one indentation character. A region that
//! mixes them cannot be measured reliably and is reported as
//! [`RegionError::Ambiguous`] instead of guessed at.

use std::ops::Range;

use crate::error::RegionError;
use crate::models::Region;

/// One physical line, without its terminator.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Line<'a> {
    pub start: usize,
    /// Offset of the following line (past `\n`).
    pub next: usize,
    /// Line content without `\n` or `\r\n`.
    pub text: &'a str,
}

fn is_indent(c: char) -> bool {
    c == ' ' || c == '\t'
}

impl<'a> Line<'a> {
    pub fn body(&self) -> &'a str {
        self.text.trim_start_matches(is_indent)
    }

    pub fn indent(&self) -> usize {
        self.text.len() - self.body().len()
    }

    pub fn indent_str(&self) -> &'a str {
        &self.text[..self.indent()]
    }

    pub fn is_content(&self) -> bool {
        let body = self.body().trim_end();
        !body.is_empty() && !body.starts_with('#')
    }
}

pub(crate) struct Lines<'a> {
    text: &'a str,
    pos: usize,
    limit: usize,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Line<'a>> {
        if self.pos >= self.limit {
            return None;
        }
        let start = self.pos;
        let (mut end, next) = match self.text[start..self.limit].find('\n') {
            Some(i) => (start + i, start + i + 1),
            None => (self.limit, self.limit),
        };
        if end > start && self.text.as_bytes()[end - 1] == b'\r' {
            end -= 1;
        }
        self.pos = next;
        Some(Line {
            start,
            next,
            text: &self.text[start..end],
        })
    }
}

/// Iterate the lines of `text[range]`. `range.start` must be a line start.
pub(crate) fn lines(text: &str, range: Range<usize>) -> Lines<'_> {
    Lines {
        text,
        pos: range.start,
        limit: range.end.min(text.len()),
    }
}

pub(crate) fn line_number(text: &str, offset: usize) -> usize {
    text.as_bytes()[..offset.min(text.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// A mapping key at the start of a line body.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Key<'a> {
    pub name: &'a str,
    /// Byte length of the key including its colon.
    pub len: usize,
}

/// Parse `name:` where `name` is an identifier and the colon is followed by
/// whitespace or the end of the line.
pub(crate) fn parse_key(body: &str) -> Option<Key<'_>> {
    let first = body.chars().next()?;
    if !(first.is_ascii_alphabetic() || first == '_') {
        return None;
    }
    let name_end = body
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(body.len());
    let after = body[name_end..].strip_prefix(':')?;
    if !(after.is_empty() || after.starts_with(is_indent)) {
        return None;
    }
    Some(Key {
        name: &body[..name_end],
        len: name_end + 1,
    })
}

/// Offset of a `#` comment in a value, ignoring `#` inside quotes or glued
/// to a preceding character.
fn comment_start(value: &str) -> Option<usize> {
    let mut quote = None;
    let mut after_space = true;
    for (i, c) in value.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '#' && after_space => return Some(i),
            None => {}
        }
        after_space = is_indent(c);
    }
    None
}

#[derive(Default)]
struct IndentChars {
    tabs: bool,
    spaces: bool,
}

impl IndentChars {
    fn observe(&mut self, indent: &str) {
        self.tabs |= indent.contains('\t');
        self.spaces |= indent.contains(' ');
    }

    fn is_mixed(&self) -> bool {
        self.tabs && self.spaces
    }
}

/// Locate the first `keyword:` line anywhere in `text`.
pub fn extract<'a>(text: &'a str, keyword: &str) -> Result<Option<Region<'a>>, RegionError> {
    locate(text, 0..text.len(), keyword, None)
}

/// Locate a top-level (unindented) `keyword:` section.
pub fn extract_section<'a>(
    text: &'a str,
    keyword: &str,
) -> Result<Option<Region<'a>>, RegionError> {
    locate(text, 0..text.len(), keyword, Some(0))
}

/// Locate `keyword:` as a direct child of `parent`.
pub fn extract_within<'a>(
    text: &'a str,
    parent: &Region<'a>,
    keyword: &str,
) -> Result<Option<Region<'a>>, RegionError> {
    match parent.child_depth() {
        Some(depth) => locate(text, parent.body_start..parent.end, keyword, Some(depth)),
        None => Ok(None),
    }
}

/// Every `keyword:` line inside `parent`'s body, at any depth.
///
/// A match nested inside an earlier match is part of that region and is not
/// reported again.
pub fn extract_all_within<'a>(
    text: &'a str,
    parent: &Region<'a>,
    keyword: &str,
) -> Result<Vec<Region<'a>>, RegionError> {
    let mut found: Vec<Region<'a>> = Vec::new();
    for line in lines(text, parent.body_start..parent.end) {
        if !line.is_content() || found.last().is_some_and(|r| line.start < r.end) {
            continue;
        }
        match parse_key(line.body()) {
            Some(key) if key.name == keyword => found.push(capture(text, line, key, parent.end)?),
            _ => {}
        }
    }
    Ok(found)
}

/// `[]`, allowing whitespace between the brackets.
pub fn is_empty_sequence(inline: &str) -> bool {
    inline
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| inner.trim().is_empty())
}

fn locate<'a>(
    text: &'a str,
    range: Range<usize>,
    keyword: &str,
    depth: Option<usize>,
) -> Result<Option<Region<'a>>, RegionError> {
    let limit = range.end;
    for line in lines(text, range) {
        if !line.is_content() || depth.is_some_and(|d| line.indent() != d) {
            continue;
        }
        match parse_key(line.body()) {
            Some(key) if key.name == keyword => {
                return capture(text, line, key, limit).map(Some);
            }
            _ => {}
        }
    }
    Ok(None)
}

fn capture<'a>(
    text: &'a str,
    header: Line<'a>,
    key: Key<'a>,
    limit: usize,
) -> Result<Region<'a>, RegionError> {
    let depth = header.indent();
    let line = line_number(text, header.start);

    let mut indent = IndentChars::default();
    indent.observe(header.indent_str());
    let mut end = header.next;
    for body_line in lines(text, header.next..limit) {
        if !body_line.is_content() {
            continue;
        }
        if body_line.indent() <= depth {
            break;
        }
        indent.observe(body_line.indent_str());
        end = body_line.next;
    }
    if indent.is_mixed() {
        return Err(RegionError::Ambiguous {
            keyword: key.name.to_string(),
            line,
        });
    }

    let colon_end = header.start + depth + key.len;
    let line_end = header.start + header.text.len();
    let rest = &text[colon_end..line_end];
    let value_end = colon_end + comment_start(rest).unwrap_or(rest.len());
    let value = &text[colon_end..value_end];
    let inline_start = colon_end + (value.len() - value.trim_start().len());
    let inline_span = inline_start..inline_start + value.trim().len();

    Ok(Region {
        keyword: key.name,
        start: header.start,
        end,
        depth,
        line,
        value: colon_end..value_end,
        inline: &text[inline_span.clone()],
        inline_span,
        body_start: header.next,
        raw: &text[header.next..end],
    })
}

impl<'a> Region<'a> {
    pub(crate) fn content_lines(&self) -> impl Iterator<Item = Line<'a>> {
        lines(self.raw, 0..self.raw.len()).filter(Line::is_content)
    }

    /// Whether the header carries no inline value (`keyword:` alone).
    pub fn is_block(&self) -> bool {
        self.inline.is_empty()
    }

    /// Whether the body holds anything besides blank and comment lines.
    pub fn has_content(&self) -> bool {
        self.content_lines().next().is_some()
    }

    /// Indentation of the first body content line.
    pub fn child_depth(&self) -> Option<usize> {
        self.content_lines().next().map(|l| l.indent())
    }

    /// First body content line, with offsets into the document text.
    pub(crate) fn first_content_line(&self) -> Option<Line<'a>> {
        self.content_lines().next().map(|l| Line {
            start: self.body_start + l.start,
            next: self.body_start + l.next,
            text: l.text,
        })
    }

    /// First body content line with its indentation removed.
    pub fn first_content(&self) -> Option<&'a str> {
        self.content_lines().next().map(|l| l.body().trim_end())
    }

    /// Whether the next content line after the region is a mapping key, or
    /// the document ends.
    pub fn is_followed_by_key(&self, text: &str) -> bool {
        match lines(text, self.end..text.len()).find(Line::is_content) {
            Some(next) => parse_key(next.body()).is_some(),
            None => true,
        }
    }
}
