//! Engine-level properties: idempotence, minimal diff, conflict policy,
//! shape fixes, and heading call rewriting, through the public API only.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::path::Path;

use sdc_mender::classify::Classifier;
use sdc_mender::config::HeadingsConfig;
use sdc_mender::heading::CallRewriter;
use sdc_mender::models::{FindingKind, ShapeTarget};
use sdc_mender::rewrite::apply_all;

fn fix(text: &str) -> String {
    apply_all(&Classifier::new(2), Path::new("c.component.yml"), text)
        .unwrap()
        .text
}

/// First and last differing byte offsets in `a`, if any.
fn diff_range(a: &str, b: &str) -> Option<(usize, usize)> {
    let prefix = a.bytes().zip(b.bytes()).take_while(|(x, y)| x == y).count();
    if prefix == a.len() && a.len() == b.len() {
        return None;
    }
    let suffix = a
        .bytes()
        .rev()
        .zip(b.bytes().rev())
        .take_while(|(x, y)| x == y)
        .count()
        .min(a.len().min(b.len()) - prefix);
    Some((prefix, a.len() - suffix))
}

const CARD: &str = "# Card component\nname: Card\nstatus: stable\nprops:\n  type: object\n  properties:\n    title:\n      type: string\n      title: Title\n\n    icon:\n      type: string\n      enum:\n        - arrow\n        - star\nslots:\n  title:\n    title: Title slot\n  body:\n    title: Body\n";

#[test]
fn name_conflict_keeps_slot_and_other_properties() {
    let out = fix(CARD);
    assert_eq!(
        out,
        "# Card component\nname: Card\nstatus: stable\nprops:\n  type: object\n  properties:\n\n    icon:\n      type: string\n      enum:\n        - arrow\n        - star\nslots:\n  title:\n    title: Title slot\n  body:\n    title: Body\n"
    );
}

#[test]
fn single_finding_diff_is_confined_to_its_span() {
    let scan = Classifier::new(2).classify(Path::new("c.component.yml"), CARD);
    assert_eq!(scan.findings.len(), 1);
    let span = scan.findings[0].span.clone();

    let out = fix(CARD);
    let (start, end) = diff_range(CARD, &out).unwrap();
    assert!(start >= span.start && end <= span.end, "{:?} outside {:?}", start..end, span);
}

#[test]
fn empty_properties_before_slots() {
    assert_eq!(fix("properties:\nslots:\n  foo:\n"), "properties: {}\nslots:\n  foo:\n");
}

#[test]
fn empty_properties_with_indented_slots_section() {
    let once = fix("properties:\n slots:\n  foo:");
    assert_eq!(once, "properties: {}\nslots:\n  foo:");
    assert_eq!(fix(&once), once);
}

#[test]
fn nested_variant_default_sequence_is_left_for_a_human() {
    let text = "variants:\n  size:\n    default: []\n";
    let outcome = apply_all(&Classifier::new(2), Path::new("c.component.yml"), text).unwrap();
    assert_eq!(outcome.text, text);
    assert_eq!(outcome.manual.len(), 1);
    assert!(outcome.manual[0].kind.manual_reason().is_some());
}

#[test]
fn empty_properties_keep_sibling_indentation() {
    assert_eq!(
        fix("props:\n  type: object\n  properties:\n  required: []\nslots:\n  foo: {}\n"),
        "props:\n  type: object\n  properties: {}\n  required: []\nslots:\n  foo: {}\n"
    );
}

#[test]
fn variants_shapes() {
    assert_eq!(fix("variants: []\n"), "variants: {}\n");

    let text = "variants:\n  default: []\n";
    let outcome = apply_all(&Classifier::new(2), Path::new("c.component.yml"), text).unwrap();
    assert_eq!(outcome.text, text);
    assert_eq!(outcome.manual.len(), 1);
    assert_eq!(
        outcome.manual[0].kind,
        FindingKind::ArrayWhereObjectExpected(ShapeTarget::VariantsDefault)
    );
}

#[test]
fn comments_and_crlf_are_preserved() {
    let text = "props:\r\n  type: object\r\n  # inputs\r\n  properties:\r\n    title: {}\r\n    icon: {}\r\nslots:\r\n  title: {}\r\nvariants: [] # todo\r\n";
    assert_eq!(
        fix(text),
        "props:\r\n  type: object\r\n  # inputs\r\n  properties:\r\n    icon: {}\r\nslots:\r\n  title: {}\r\nvariants: {} # todo\r\n"
    );
}

#[test]
fn second_pass_is_a_no_op() {
    let text = "props:\n  type: object\n  properties:\n    title: {}\nslots:\n  title: {}\nvariants: []\n";
    let once = fix(text);
    assert_eq!(once, "props:\n  type: object\n  properties: {}\nslots:\n  title: {}\nvariants: {}\n");
    assert_eq!(fix(&once), once);
}

#[test]
fn heading_call_rewrite() {
    let rewriter = CallRewriter::new(&HeadingsConfig::default()).unwrap();
    let out = rewriter
        .rewrite_calls("{{ include('@components/h3.html.twig', {content: page.title, color: 'accent'}) }}")
        .unwrap();

    let fields: Vec<&str> = out
        .lines()
        .map(str::trim)
        .filter(|l| l.contains(": ") && !l.ends_with('{'))
        .collect();
    assert_eq!(
        fields,
        [
            "title: page.title,",
            "as: 'h3',",
            "visual_level: '3',",
            "additional_classes: 'accent'"
        ]
    );
    assert!(!out.contains("id:"));
}

const VOCAB: [&str; 6] = ["title", "icon", "body", "media", "link", "footer"];

fn component(props: &[usize], slots: &[usize], empty_variants: bool) -> String {
    let mut text = String::from("name: Generated\nprops:\n  type: object\n  properties:\n");
    for &i in props {
        text.push_str(&format!("    {}:\n      type: string\n", VOCAB[i]));
    }
    text.push_str("slots:\n");
    for &i in slots {
        text.push_str(&format!("  {}:\n    title: {}\n", VOCAB[i], VOCAB[i]));
    }
    if slots.is_empty() {
        text.push_str("  placeholder: {}\n");
    }
    if empty_variants {
        text.push_str("variants: []\n");
    }
    text
}

proptest! {
    #[test]
    fn fixing_is_idempotent_and_conflict_free(
        props in proptest::sample::subsequence((0..VOCAB.len()).collect::<Vec<_>>(), 0..=VOCAB.len()),
        slots in proptest::sample::subsequence((0..VOCAB.len()).collect::<Vec<_>>(), 0..=VOCAB.len()),
        empty_variants in any::<bool>(),
    ) {
        let classifier = Classifier::new(2);
        let path = Path::new("gen.component.yml");
        let text = component(&props, &slots, empty_variants);

        let once = apply_all(&classifier, path, &text).unwrap();
        let twice = apply_all(&classifier, path, &once.text).unwrap();
        prop_assert_eq!(&twice.text, &once.text);
        prop_assert!(twice.fixed.is_empty());
        prop_assert!(classifier.classify(path, &once.text).findings.is_empty());

        for &i in &props {
            let decl = format!("    {}:\n", VOCAB[i]);
            prop_assert_eq!(once.text.contains(&decl), !slots.contains(&i));
        }
        for &i in &slots {
            let decl = format!("  {}:\n", VOCAB[i]);
            prop_assert!(once.text.contains(&decl));
        }
    }
}
