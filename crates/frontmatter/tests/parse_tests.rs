//! End-to-end parsing of realistic workflow documents.

use aw_frontmatter::{
    BashTool, EngineSetting, PermissionLevel, parse_document, resolve_permissions, validate,
};

const TRIAGE: &str = r#"---
name: Issue Triage
description: Label new issues
on:
  issues:
    types: [opened]
  stop-after: "+7d"
permissions:
  contents: read
  issues: read
labels: [triage, automation]
engine:
  id: claude
  version: 2
  max-turns: 5
tools:
  github:
    toolsets: [issues]
  bash: [echo, ls]
safe-outputs:
  add-labels:
    allowed: [bug, enhancement]
    max: 3
  staged: true
custom-key: kept
---
# Triage

Read the issue and pick labels.
"#;

#[test]
fn parses_full_document() {
    let doc = parse_document(TRIAGE).unwrap();
    let fm = &doc.frontmatter;

    assert_eq!(fm.name.as_deref(), Some("Issue Triage"));
    assert_eq!(fm.labels, vec!["triage".to_string(), "automation".to_string()]);
    assert_eq!(fm.stop_after().as_deref(), Some("+7d"));

    match fm.engine.as_ref().unwrap() {
        EngineSetting::Config(config) => {
            assert_eq!(config.id, "claude");
            assert_eq!(config.version.as_deref(), Some("2"));
            assert_eq!(config.max_turns.as_deref(), Some("5"));
        }
        EngineSetting::Name(name) => panic!("expected mapping, got {name}"),
    }

    assert_eq!(
        fm.tools.bash(),
        Some(BashTool::Commands(vec!["echo".into(), "ls".into()]))
    );
    assert_eq!(fm.tools.github().unwrap().toolsets, vec!["issues".to_string()]);

    let safe = fm.safe_outputs.as_ref().unwrap();
    assert!(safe.staged);
    let labels = safe.add_labels.as_ref().unwrap();
    assert_eq!(labels.allowed, vec!["bug".to_string(), "enhancement".to_string()]);
    assert_eq!(labels.max, Some(3));

    assert!(fm.extra.contains_key("custom-key"));
    assert!(doc.body.starts_with("# Triage"));

    validate(fm).unwrap();
}

#[test]
fn permissions_resolve_from_document() {
    let doc = parse_document(TRIAGE).unwrap();
    let perms = resolve_permissions(doc.frontmatter.permissions.as_ref().unwrap()).unwrap();
    assert_eq!(perms.level("issues"), PermissionLevel::Read);
    assert!(!perms.has_write());
}

#[test]
fn invalid_label_fails_validation() {
    let doc = parse_document("---\nlabels: [ok, ' padded']\n---\nbody\n").unwrap();
    let err = validate(&doc.frontmatter).unwrap_err();
    assert!(err.to_string().contains("index 1"));
}

#[test]
fn unterminated_header_is_a_parse_error() {
    let err = parse_document("---\nname: x\nbody without end\n").unwrap_err();
    assert!(err.to_string().contains("Failed to parse frontmatter"));
}

#[test]
fn engine_name_shorthand() {
    let doc = parse_document("---\nengine: codex\n---\n").unwrap();
    assert_eq!(doc.frontmatter.engine_id(), Some("codex"));
}
