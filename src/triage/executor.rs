use std::io::Write;
use std::sync::Arc;

use super::models::{TriageAction, TriageEntry, TriageStatus};
use super::runner::ActionRunner;
use super::store::TriageStore;
use crate::errors::ActionError;

/// Label always applied first by `close_wontfix`.
pub const WONTFIX_LABEL: &str = "wontfix";

/// Fields requested from `gh issue view`.
pub const ISSUE_VIEW_FIELDS: &str = "number,title,body,comments,labels,state";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Completed,
    NotPlanned,
}

impl CloseReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::NotPlanned => "not planned",
        }
    }
}

// ── gh argument vectors ───────────────────────────────────────────────

fn issue_args(verb: &str, number: u64, repo: &str) -> Vec<String> {
    vec![
        "issue".to_string(),
        verb.to_string(),
        number.to_string(),
        "--repo".to_string(),
        repo.to_string(),
    ]
}

pub fn add_label_args(number: u64, repo: &str, label: &str) -> Vec<String> {
    let mut args = issue_args("edit", number, repo);
    args.extend(["--add-label".to_string(), label.to_string()]);
    args
}

pub fn comment_args(number: u64, repo: &str, body_file: &str) -> Vec<String> {
    let mut args = issue_args("comment", number, repo);
    args.extend(["--body-file".to_string(), body_file.to_string()]);
    args
}

pub fn close_args(number: u64, repo: &str, reason: CloseReason) -> Vec<String> {
    let mut args = issue_args("close", number, repo);
    args.extend(["--reason".to_string(), reason.as_str().to_string()]);
    args
}

pub fn view_args(number: u64, repo: &str) -> Vec<String> {
    let mut args = issue_args("view", number, repo);
    args.extend(["--json".to_string(), ISSUE_VIEW_FIELDS.to_string()]);
    args
}

/// `wontfix` first, then the requested labels in order, without repeats.
pub fn wontfix_labels(requested: &[String]) -> Vec<String> {
    let mut labels = vec![WONTFIX_LABEL.to_string()];
    for label in requested {
        if !labels.contains(label) {
            labels.push(label.clone());
        }
    }
    labels
}

// ── Executor ──────────────────────────────────────────────────────────

/// Result of a fully applied triage action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub status: TriageStatus,
    pub entry: TriageEntry,
}

/// Turns a triage decision into `gh` calls and a recorded entry.
///
/// Calls run strictly in label → comment → close order. The first failed
/// call aborts the sequence and nothing is recorded.
#[derive(Clone)]
pub struct ActionExecutor {
    runner: Arc<dyn ActionRunner>,
    store: TriageStore,
    repo: String,
}

impl ActionExecutor {
    pub fn new(runner: Arc<dyn ActionRunner>, store: TriageStore, repo: impl Into<String>) -> Self {
        Self {
            runner,
            store,
            repo: repo.into(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub async fn apply(&self, number: u64, action: TriageAction) -> Result<ActionOutcome, ActionError> {
        match action {
            TriageAction::Skip { note } => self.record(number, TriageStatus::Skipped, false, note).await,
            TriageAction::Comment { comment } => {
                if comment.trim().is_empty() {
                    return Err(ActionError::EmptyComment);
                }
                self.post_comment(number, &comment).await?;
                self.record(number, TriageStatus::Commented, true, String::new()).await
            }
            TriageAction::Close { comment } => {
                self.close(number, &comment, CloseReason::Completed, &[]).await
            }
            TriageAction::CloseWontfix { comment, labels } => {
                let labels = wontfix_labels(&labels);
                self.close(number, &comment, CloseReason::NotPlanned, &labels).await
            }
        }
    }

    async fn close(
        &self,
        number: u64,
        comment: &str,
        reason: CloseReason,
        labels: &[String],
    ) -> Result<ActionOutcome, ActionError> {
        for label in labels {
            self.runner
                .run(&add_label_args(number, &self.repo, label))
                .await
                .map_err(|source| ActionError::LabelFailed {
                    label: label.clone(),
                    source,
                })?;
        }

        let has_comment = !comment.trim().is_empty();
        if has_comment {
            self.post_comment(number, comment).await?;
        }

        self.runner
            .run(&close_args(number, &self.repo, reason))
            .await
            .map_err(ActionError::CloseFailed)?;

        self.record(number, TriageStatus::Closed, has_comment, String::new()).await
    }

    /// Post `comment` through a temporary `.md` body file, removed afterwards.
    async fn post_comment(&self, number: u64, comment: &str) -> Result<(), ActionError> {
        let body_file = write_body_file(comment).map_err(ActionError::BodyFile)?;
        let path = body_file.path().to_string_lossy().to_string();
        self.runner
            .run(&comment_args(number, &self.repo, &path))
            .await
            .map_err(ActionError::CommentFailed)?;
        Ok(())
    }

    async fn record(
        &self,
        number: u64,
        status: TriageStatus,
        comment_posted: bool,
        note: String,
    ) -> Result<ActionOutcome, ActionError> {
        let entry = self
            .store
            .call(move |store| store.record(number, status, comment_posted, &note))
            .await?;
        Ok(ActionOutcome { status, entry })
    }
}

fn write_body_file(comment: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("triage-comment-")
        .suffix(".md")
        .tempfile()?;
    file.write_all(comment.as_bytes())?;
    file.flush()?;
    Ok(file)
}
