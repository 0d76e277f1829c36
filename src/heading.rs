//! Legacy heading include rewriting for Twig templates.
//!
//! Recognises the two legacy shapes
//!
//! ```text
//! {{ include('@components/h3.html.twig', {content: page.title, color: 'accent'}) }}
//! {% include '@components/headline/h2.html.twig' with {content: label} only %}
//! ```
//!
//! and emits the canonical keyed form
//!
//! ```text
//! {{ include('@adesso_cms_theme/heading/heading.twig', {
//!   heading: {
//!     title: page.title,
//!     as: 'h3',
//!     visual_level: '3',
//!     additional_classes: 'accent'
//!   }
//! }) }}
//! ```
//!
//! The level comes from the template name (`h1`..`h6`) or, for the generic
//! `heading`/`headline` templates, from a literal `level` argument. Arguments
//! are matched by key. Only the `id` of an `attributes` expression survives;
//! every other attribute and every unknown key is dropped.

use std::borrow::Cow;
use std::path::Path;

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::debug;

use crate::config::HeadingsConfig;
use crate::error::RewriteError;
use crate::models::{Finding, FindingKind, HeadingArgs, HeadingCall};
use crate::region::line_number;
use crate::rewrite::apply_disjoint;

const KNOWN_KEYS: [&str; 5] = ["content", "as", "level", "color", "attributes"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    /// `{{ include('...', {...}) }}`
    Expression,
    /// `{% include '...' with {...} %}`
    Statement,
}

#[derive(Debug, Clone)]
pub struct CallRewriter {
    expression: Regex,
    expression_tail: Regex,
    statement: Regex,
    statement_tail: Regex,
    set_id: Regex,
    target_template: String,
    group: String,
}

impl CallRewriter {
    pub fn new(config: &HeadingsConfig) -> Result<Self> {
        let ns = regex::escape(&config.legacy_namespace);
        let name = format!(r"{ns}/(?:headline/)?(?P<name>h[1-6]|heading|headline)\.html\.twig");
        let template = format!(r#"['"]{name}['"]"#);

        let legacy_target = Regex::new(&format!("^{name}$"))?;
        if legacy_target.is_match(&config.target_template) {
            bail!(
                "headings.target_template '{}' is itself a legacy heading template",
                config.target_template
            );
        }

        Ok(Self {
            expression: Regex::new(&format!(
                r"\{{\{{(?P<trim>-?)\s*include\(\s*{template}\s*,\s*\{{"
            ))
            .context("Failed to build expression pattern")?,
            expression_tail: Regex::new(r"^\s*\)\s*(?P<trim>-?)\}\}")?,
            statement: Regex::new(&format!(
                r"\{{%(?P<trim>-?)\s*include\s+{template}\s+with\s+\{{"
            ))
            .context("Failed to build statement pattern")?,
            statement_tail: Regex::new(r"^\s*(?P<only>only\s*)?(?P<trim>-?)%\}")?,
            set_id: Regex::new(r#"setAttribute\(\s*['"]id['"]\s*,"#)?,
            target_template: config.target_template.clone(),
            group: config.argument_group.clone(),
        })
    }

    /// Every recognised legacy call in `text`, in textual order.
    pub fn find_calls(&self, path: &Path, text: &str) -> Vec<Finding> {
        let mut found = Vec::new();
        for style in [Style::Expression, Style::Statement] {
            let (head, tail) = match style {
                Style::Expression => (&self.expression, &self.expression_tail),
                Style::Statement => (&self.statement, &self.statement_tail),
            };
            for caps in head.captures_iter(text) {
                let Some(whole) = caps.get(0) else {
                    continue;
                };
                let open = whole.end() - 1;
                let Some(close) = matching_close(text, open) else {
                    debug!(path = %path.display(), offset = whole.start(), "unbalanced heading call left alone");
                    continue;
                };
                let Some(tail_caps) = tail.captures(&text[close + 1..]) else {
                    continue;
                };
                let end = close + 1 + tail_caps.get(0).map_or(0, |m| m.end());
                let Some(call) = self.build_call(
                    text,
                    whole.start(),
                    &caps["name"],
                    &text[open + 1..close],
                    Trim {
                        open: !caps["trim"].is_empty(),
                        close: !tail_caps["trim"].is_empty(),
                    },
                    style == Style::Statement && tail_caps.name("only").is_some(),
                ) else {
                    continue;
                };
                found.push(Finding {
                    path: path.to_path_buf(),
                    line: line_number(text, whole.start()),
                    span: whole.start()..end,
                    before: text[whole.start()..end].to_string(),
                    kind: FindingKind::LegacyCallSyntax(call),
                });
            }
        }
        found.sort_by_key(|f| f.span.start);
        found
    }

    /// Rewrite every recognised call. Text without one is returned as is.
    pub fn rewrite_calls<'a>(&self, text: &'a str) -> Result<Cow<'a, str>, RewriteError> {
        let findings = self.find_calls(Path::new(""), text);
        if findings.is_empty() {
            return Ok(Cow::Borrowed(text));
        }
        apply_disjoint(text, &findings).map(Cow::Owned)
    }

    fn build_call(
        &self,
        text: &str,
        start: usize,
        name: &str,
        arguments: &str,
        trim: Trim,
        only: bool,
    ) -> Option<HeadingCall> {
        let args = parse_arguments(arguments);
        let lookup = |key: &str| {
            args.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        for (key, _) in args.iter().filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str())) {
            debug!(key = %key, "dropping unsupported heading argument");
        }

        let level_arg = lookup("level");
        let level = match name.strip_prefix('h').and_then(|d| d.parse::<u8>().ok()) {
            Some(level) => level,
            None => level_arg.and_then(literal_level)?,
        };

        let args = HeadingArgs {
            title: lookup("content").unwrap_or("''").to_string(),
            as_tag: lookup("as")
                .map(quote_literal)
                .unwrap_or_else(|| format!("'h{}'", level)),
            visual_level: level_arg
                .map(quote_level)
                .unwrap_or_else(|| format!("'{}'", level)),
            additional_classes: lookup("color").map(quote_literal),
            id: lookup("attributes").and_then(|attrs| self.extract_id(attrs)),
        };
        let replacement = self.render(line_indent(text, start), &args, trim, only);
        Some(HeadingCall {
            level,
            args,
            replacement,
        })
    }

    /// The value passed to `setAttribute('id', ...)`, if any.
    fn extract_id(&self, attributes: &str) -> Option<String> {
        let m = self.set_id.find(attributes)?;
        let paren = m.start() + "setAttribute".len();
        let close = matching_close(attributes, paren)?;
        let value = attributes[m.end()..close].trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn render(&self, indent: &str, args: &HeadingArgs, trim: Trim, only: bool) -> String {
        let mut fields = vec![
            format!("title: {}", args.title),
            format!("as: {}", args.as_tag),
            format!("visual_level: {}", args.visual_level),
        ];
        if let Some(classes) = &args.additional_classes {
            fields.push(format!("additional_classes: {}", classes));
        }
        if let Some(id) = &args.id {
            fields.push(format!("id: {}", id));
        }

        let mut out = String::new();
        out.push_str(if trim.open { "{{- " } else { "{{ " });
        out.push_str("include('");
        out.push_str(&self.target_template);
        out.push_str("', {\n");
        out.push_str(&format!("{}  {}: {{\n", indent, self.group));
        let body: Vec<String> = fields
            .iter()
            .map(|field| format!("{}    {}", indent, field))
            .collect();
        out.push_str(&body.join(",\n"));
        out.push_str(&format!("\n{}  }}\n{}}}", indent, indent));
        if only {
            out.push_str(", with_context = false");
        }
        out.push_str(if trim.close { ") -}}" } else { ") }}" });
        out
    }
}

/// Twig whitespace control markers on the original call.
#[derive(Debug, Clone, Copy)]
struct Trim {
    open: bool,
    close: bool,
}

fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset].rfind('\n').map_or(0, |i| i + 1);
    let line = &text[line_start..];
    let width = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..width]
}

fn unquote(value: &str) -> Option<&str> {
    let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    value
        .strip_prefix(quote)?
        .strip_suffix(quote)
        .filter(|inner| !inner.contains(quote))
}

/// Re-quote a string literal with single quotes; expressions pass through.
fn quote_literal(value: &str) -> String {
    match unquote(value) {
        Some(inner) if !inner.contains('\'') => format!("'{}'", inner),
        _ => value.to_string(),
    }
}

fn quote_level(value: &str) -> String {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        format!("'{}'", value)
    } else {
        quote_literal(value)
    }
}

fn literal_level(value: &str) -> Option<u8> {
    let digits = unquote(value).unwrap_or(value);
    digits.parse::<u8>().ok().filter(|l| (1..=6).contains(l))
}

/// Walks `s` outside string literals, tracking bracket depth.
struct Scanner<'a> {
    chars: std::str::CharIndices<'a>,
    quote: Option<char>,
    escaped: bool,
}

impl<'a> Scanner<'a> {
    fn new(s: &'a str) -> Self {
        Self {
            chars: s.char_indices(),
            quote: None,
            escaped: false,
        }
    }
}

impl Iterator for Scanner<'_> {
    /// Offset and character of every byte outside quotes.
    type Item = (usize, char);

    fn next(&mut self) -> Option<(usize, char)> {
        for (i, c) in self.chars.by_ref() {
            match self.quote {
                Some(_) if self.escaped => self.escaped = false,
                Some(_) if c == '\\' => self.escaped = true,
                Some(q) if c == q => self.quote = None,
                Some(_) => {}
                None if c == '\'' || c == '"' => self.quote = Some(c),
                None => return Some((i, c)),
            }
        }
        None
    }
}

/// Offset of the bracket closing the one at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in Scanner::new(&text[open..]) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_top_level(s: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (i, c) in Scanner::new(s) {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ if c == separator && depth == 0 => {
                parts.push(&s[last..i]);
                last = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[last..]);
    parts
}

/// Parse a Twig hash body into `(key, value)` pairs.
fn parse_arguments(hash: &str) -> Vec<(String, String)> {
    split_top_level(hash, ',')
        .into_iter()
        .filter_map(|entry| {
            let parts = split_top_level(entry, ':');
            if parts.len() < 2 {
                return None;
            }
            let colon = parts[0].len();
            let key = entry[..colon].trim();
            let key = unquote(key).unwrap_or(key);
            let value = entry[colon + 1..].trim();
            (!key.is_empty()).then(|| (key.to_string(), value.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewriter() -> CallRewriter {
        CallRewriter::new(&HeadingsConfig::default()).unwrap()
    }

    fn rewrite(text: &str) -> String {
        rewriter().rewrite_calls(text).unwrap().into_owned()
    }

    #[test]
    fn expression_call_with_color() {
        let text = "{{ include('@components/h3.html.twig', {content: page.title, color: 'accent'}) }}";
        assert_eq!(
            rewrite(text),
            "{{ include('@adesso_cms_theme/heading/heading.twig', {\n  heading: {\n    title: page.title,\n    as: 'h3',\n    visual_level: '3',\n    additional_classes: 'accent'\n  }\n}) }}"
        );
    }

    #[test]
    fn finding_carries_canonical_args() {
        let text = "<div>\n  {{ include(\"@components/headline/h2.html.twig\", { 'content': label, 'level': 4 }) }}\n</div>\n";
        let findings = rewriter().find_calls(Path::new("teaser.html.twig"), text);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 2);
        let FindingKind::LegacyCallSyntax(call) = &findings[0].kind else {
            panic!("expected a heading call");
        };
        assert_eq!(call.level, 2);
        assert_eq!(
            call.args,
            HeadingArgs {
                title: "label".to_string(),
                as_tag: "'h2'".to_string(),
                visual_level: "'4'".to_string(),
                additional_classes: None,
                id: None,
            }
        );
    }

    #[test]
    fn output_is_indented_like_the_call_line() {
        let text = "<div>\n    {{ include('@components/h1.html.twig', {content: title}) }}\n</div>\n";
        assert_eq!(
            rewrite(text),
            "<div>\n    {{ include('@adesso_cms_theme/heading/heading.twig', {\n      heading: {\n        title: title,\n        as: 'h1',\n        visual_level: '1'\n      }\n    }) }}\n</div>\n"
        );
    }

    #[test]
    fn statement_call_with_only() {
        let text = "{% include '@components/h4.html.twig' with {content: item.label, as: \"span\"} only %}";
        assert_eq!(
            rewrite(text),
            "{{ include('@adesso_cms_theme/heading/heading.twig', {\n  heading: {\n    title: item.label,\n    as: 'span',\n    visual_level: '4'\n  }\n}, with_context = false) }}"
        );
    }

    #[test]
    fn attributes_keep_only_the_id() {
        let text = "{{ include('@components/h2.html.twig', {content: t, attributes: create_attribute().addClass('x').setAttribute('id', 'section-' ~ loop.index)}) }}";
        let out = rewrite(text);
        assert!(out.contains("    id: 'section-' ~ loop.index\n"));
        assert!(!out.contains("addClass"));
    }

    #[test]
    fn attributes_without_id_emit_nothing() {
        let text = "{{ include('@components/h2.html.twig', {content: t, attributes: create_attribute({'class': ['a']})}) }}";
        let out = rewrite(text);
        assert!(!out.contains("id:"));
        assert!(!out.contains("class"));
    }

    #[test]
    fn missing_content_becomes_empty_title() {
        let out = rewrite("{{ include('@components/h5.html.twig', {color: accent_color}) }}");
        assert!(out.contains("    title: '',\n"));
        assert!(out.contains("    additional_classes: accent_color\n"));
    }

    #[test]
    fn nested_braces_in_content() {
        let text = "{{ include('@components/h2.html.twig', {content: {'#markup': label}|render}) }}";
        let out = rewrite(text);
        assert!(out.contains("    title: {'#markup': label}|render,\n"));
    }

    #[test]
    fn generic_template_takes_level_argument() {
        let out = rewrite("{{ include('@components/heading.html.twig', {content: t, level: 5}) }}");
        assert!(out.contains("    as: 'h5',\n    visual_level: '5'\n"));
    }

    #[test]
    fn generic_template_without_level_is_left_alone() {
        let text = "{{ include('@components/heading.html.twig', {content: t}) }}";
        assert!(matches!(rewriter().rewrite_calls(text).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn whitespace_control_is_kept() {
        let out = rewrite("{{- include('@components/h2.html.twig', {content: t}) -}}");
        assert!(out.starts_with("{{- include("));
        assert!(out.ends_with(") -}}"));
    }

    #[test]
    fn text_without_calls_is_borrowed() {
        let text = "{{ include('@components/card.html.twig', {title: t}) }}\n{% include 'h2.html.twig' %}\n";
        assert!(matches!(rewriter().rewrite_calls(text).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn unbalanced_call_is_left_alone() {
        let text = "{{ include('@components/h2.html.twig', {content: t) }}";
        assert!(matches!(rewriter().rewrite_calls(text).unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn several_calls_in_one_file() {
        let text = "{{ include('@components/h1.html.twig', {content: a}) }}\n<p>x</p>\n{% include '@components/h2.html.twig' with {content: b} %}\n";
        let out = rewrite(text);
        assert_eq!(out.matches("@adesso_cms_theme/heading/heading.twig").count(), 2);
        assert!(out.contains("\n<p>x</p>\n"));
        assert!(out.ends_with("}) }}\n"));
        assert_eq!(rewrite(&out), out);
    }

    #[test]
    fn argument_parsing_respects_quotes_and_nesting() {
        let args = parse_arguments(" content: 'a, b: c', \"as\": 'h2', attributes: f({x: 1, y: 2}) ");
        assert_eq!(
            args,
            vec![
                ("content".to_string(), "'a, b: c'".to_string()),
                ("as".to_string(), "'h2'".to_string()),
                ("attributes".to_string(), "f({x: 1, y: 2})".to_string()),
            ]
        );
    }
}
