//! Name collection inside a region.
//!
//! A declaration is a line indented exactly `depth` characters that starts
//! with `identifier:`. Its span runs from the start of that line through its
//! last deeper content line, so removing the span removes the whole nested
//! value. Blank and comment lines between declarations belong to neither.

use crate::models::{DeclaredName, NameKind, Region};
use crate::region::parse_key;

/// Collect the names declared at `depth` in `region`, in textual order.
///
/// Offsets are absolute in the text the region was extracted from. A content
/// line indented less than `depth` ends collection.
pub fn collect_names(region: &Region<'_>, depth: usize, kind: NameKind) -> Vec<DeclaredName> {
    let base = region.body_start;
    let mut names = Vec::new();
    let mut open: Option<DeclaredName> = None;

    for line in region.content_lines() {
        let indent = line.indent();
        if indent < depth {
            break;
        }
        if indent > depth {
            if let Some(decl) = open.as_mut() {
                decl.end = base + line.next;
            }
            continue;
        }
        names.extend(open.take());
        open = parse_key(line.body()).map(|key| DeclaredName {
            name: key.name.to_string(),
            kind,
            start: base + line.start,
            end: base + line.next,
        });
    }
    names.extend(open);
    names
}
