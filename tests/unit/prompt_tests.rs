//! Unit tests for turn prompt extraction and review prompt synthesis.

use serde_json::json;

use claude_app_server::orchestrator::turn_runner::extract_prompt;
use claude_app_server::server::handlers::review::review_prompt;
use claude_app_server::AppError;

#[test]
fn text_items_are_joined_by_newline_in_order() {
    let input = vec![
        json!({"type": "text", "text": "first"}),
        json!({"type": "image", "url": "x.png"}),
        json!({"type": "text", "text": "second"}),
    ];
    assert_eq!(extract_prompt(&input), "first\nsecond");
}

#[test]
fn input_without_text_items_is_empty() {
    assert_eq!(extract_prompt(&[json!({"type": "image"})]), "");
    assert_eq!(extract_prompt(&[]), "");
}

#[test]
fn whitespace_text_survives_extraction() {
    let prompt = extract_prompt(&[json!({"type": "text", "text": "  "})]);
    assert!(prompt.trim().is_empty());
}

#[test]
fn review_targets_synthesize_prompts() {
    let uncommitted = review_prompt(&json!({"type": "uncommittedChanges"})).expect("prompt");
    assert!(uncommitted.contains("uncommitted changes"));

    let branch = review_prompt(&json!({"type": "baseBranch", "branch": "main"})).expect("prompt");
    assert!(branch.contains("`main`"));

    let commit = review_prompt(&json!({"type": "commit", "sha": "abc123", "title": "Fix parser"}))
        .expect("prompt");
    assert!(commit.contains("abc123"));
    assert!(commit.contains("Fix parser"));

    let custom = review_prompt(&json!({"type": "custom", "instructions": " Check error paths "}))
        .expect("prompt");
    assert_eq!(custom, "Check error paths");
}

#[test]
fn incomplete_or_unknown_targets_are_invalid() {
    for target in [
        json!({"type": "baseBranch"}),
        json!({"type": "commit", "sha": ""}),
        json!({"type": "custom", "instructions": "   "}),
        json!({"type": "mystery"}),
        json!({}),
    ] {
        let err = review_prompt(&target).expect_err("must fail");
        assert!(matches!(err, AppError::InvalidParams(_)), "target {target}");
    }
}
