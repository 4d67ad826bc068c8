//! Property-based tests for label validation.
//!
//! `validate_labels` succeeds iff every label is non-empty and equal to its
//! trimmed form, and a failure always points at the first bad label.

use aw_core::Error;
use aw_frontmatter::{ParsedFrontmatter, validate_labels};
use proptest::prelude::*;

fn label() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z][a-z0-9 -]{0,12}[a-z0-9]",
        "[a-z]",
        Just(String::new()),
        "[ \t]{1,2}[a-z]{1,6}",
        "[a-z]{1,6}[ \t\n]{1,2}",
    ]
}

fn is_valid(label: &str) -> bool {
    !label.is_empty() && label.trim() == label
}

fn frontmatter(labels: Vec<String>) -> ParsedFrontmatter {
    ParsedFrontmatter {
        labels,
        ..Default::default()
    }
}

proptest! {
    #[test]
    fn validation_matches_label_predicate(labels in prop::collection::vec(label(), 0..8)) {
        let expected = labels.iter().all(|l| is_valid(l));
        let result = validate_labels(Some(&frontmatter(labels)));
        prop_assert_eq!(result.is_ok(), expected);
    }

    #[test]
    fn failure_reports_first_bad_label(labels in prop::collection::vec(label(), 1..8)) {
        let first_bad = labels.iter().position(|l| !is_valid(l));
        let result = validate_labels(Some(&frontmatter(labels.clone())));
        match (first_bad, result) {
            (None, Ok(())) => {}
            (Some(i), Err(Error::EmptyLabel { index })) => {
                prop_assert_eq!(index, i);
                prop_assert!(labels[i].is_empty());
            }
            (Some(i), Err(Error::WhitespaceInLabel { index, value })) => {
                prop_assert_eq!(index, i);
                prop_assert_eq!(&value, &labels[i]);
            }
            (expected, got) => prop_assert!(false, "expected {:?}, got {:?}", expected, got),
        }
    }
}

#[test]
fn absent_frontmatter_is_valid() {
    assert!(validate_labels(None).is_ok());
}
