//! `review/start` handler.
//!
//! A review is an ordinary turn whose prompt is synthesized from the review
//! target. Reviews run read-only. With `delivery: "detached"` the review runs
//! on a fork of the thread so the original conversation stays untouched.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::orchestrator::turn_runner::{start_turn, TurnRequest};
use crate::policy::{AccessMode, ApprovalPolicy};
use crate::server::handlers::parse_params;
use crate::server::handlers::thread::thread_value;
use crate::server::router::{HandlerFuture, Reply};
use crate::server::state::AppState;
use crate::{AppError, Result};

const REVIEW_GUIDANCE: &str = "Report bugs, regressions, and risky changes first, ordered by \
severity, with file and line references. Do not modify any files.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    thread_id: String,
    target: Value,
    delivery: Option<String>,
}

/// Build the review prompt for `target`.
///
/// # Errors
///
/// Returns [`AppError::InvalidParams`] for an unknown target type or a target
/// missing its required field.
pub fn review_prompt(target: &Value) -> Result<String> {
    let kind = target.get("type").and_then(Value::as_str).unwrap_or_default();
    let field = |name: &str| {
        target
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    let required = |name: &str| {
        field(name)
            .ok_or_else(|| AppError::InvalidParams(format!("Review target requires `{name}`")))
    };

    let request = match kind {
        "uncommittedChanges" => {
            "Review the uncommitted changes in the working tree, including staged and untracked \
             files."
                .to_owned()
        }
        "baseBranch" => {
            let branch = required("branch")?;
            format!(
                "Review the changes on the current branch against the base branch `{branch}`. \
                 Use the merge base with `{branch}` to find them."
            )
        }
        "commit" => {
            let sha = required("sha")?;
            match field("title") {
                Some(title) => format!("Review the changes introduced by commit {sha} (\"{title}\")."),
                None => format!("Review the changes introduced by commit {sha}."),
            }
        }
        "custom" => return Ok(required("instructions")?.to_owned()),
        other => {
            return Err(AppError::InvalidParams(format!(
                "Unsupported review target: {other}"
            )))
        }
    };

    Ok(format!("{request}\n\n{REVIEW_GUIDANCE}"))
}

/// `review/start`: run a review turn and report the thread it runs on.
pub fn start(state: Arc<AppState>, params: Value) -> HandlerFuture {
    Box::pin(async move {
        let params: StartParams = parse_params(params)?;
        let prompt = review_prompt(&params.target)?;

        let review_thread_id = if params.delivery.as_deref() == Some("detached") {
            let fork = state.threads.fork(&params.thread_id)?;
            state
                .outbound
                .notify("thread/started", json!({ "thread": thread_value(&fork)? }))
                .await?;
            fork.id
        } else {
            params.thread_id
        };

        let started = start_turn(
            &state,
            TurnRequest {
                thread_id: review_thread_id.clone(),
                prompt,
                cwd: None,
                model: None,
                access: AccessMode::ReadOnly,
                approval: ApprovalPolicy::OnRequest,
            },
        )?;

        Ok(Reply::ResultThen(
            json!({ "turn": started.turn, "reviewThreadId": review_thread_id }),
            started.task,
        ))
    })
}
