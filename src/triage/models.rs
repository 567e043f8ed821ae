use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::RequestError;

// ── Upstream documents (read-only) ────────────────────────────────────

/// An open issue as written to `issues.json` by the gather step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub last_comment_at: Option<String>,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuesDocument {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    LikelyResolved,
    FeatureImplemented,
    StillOpen,
    NeedsInvestigation,
    StaleWontfix,
    Duplicate,
    Unclear,
    #[default]
    Pending,
}

impl Verdict {
    pub const ALL: [Verdict; 8] = [
        Self::LikelyResolved,
        Self::FeatureImplemented,
        Self::StillOpen,
        Self::NeedsInvestigation,
        Self::StaleWontfix,
        Self::Duplicate,
        Self::Unclear,
        Self::Pending,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikelyResolved => "likely_resolved",
            Self::FeatureImplemented => "feature_implemented",
            Self::StillOpen => "still_open",
            Self::NeedsInvestigation => "needs_investigation",
            Self::StaleWontfix => "stale_wontfix",
            Self::Duplicate => "duplicate",
            Self::Unclear => "unclear",
            Self::Pending => "pending",
        }
    }
}

impl FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| format!("Invalid verdict: {}", s))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Analysis confidence. Declaration order is the sort rank.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    High,
    Medium,
    Low,
    #[default]
    Pending,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
            Self::Pending => "PENDING",
        }
    }

    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl FromStr for Confidence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH" => Ok(Self::High),
            "MEDIUM" => Ok(Self::Medium),
            "LOW" => Ok(Self::Low),
            "PENDING" => Ok(Self::Pending),
            _ => Err(format!("Invalid confidence: {}", s)),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Evidence {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub verdict: Verdict,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub proposed_comment: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FindingsDocument {
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub analyzed_at: String,
    #[serde(default)]
    pub issues: Vec<Finding>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FindingsDocument {
    pub fn by_number(&self) -> BTreeMap<u64, &Finding> {
        self.issues.iter().map(|f| (f.number, f)).collect()
    }
}

// ── Triage state (owned by this service) ──────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    Closed,
    Commented,
    Skipped,
}

impl TriageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Commented => "commented",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for TriageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded decision. Optional fields are omitted unless set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriageEntry {
    pub action: TriageStatus,
    pub at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub comment_posted: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub note: String,
}

/// `state.json`. Unknown top-level keys survive a rewrite, and entries are
/// kept as raw JSON so fields or actions written by other tools are not
/// lost when a different issue is recorded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub triaged: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StateDocument {
    /// Typed view of an entry; `None` when absent or not in the known shape.
    pub fn entry(&self, number: u64) -> Option<TriageEntry> {
        self.triaged
            .get(&number.to_string())
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// The recorded `action` string, including values this version doesn't know.
    pub fn action(&self, number: u64) -> Option<&str> {
        self.triaged
            .get(&number.to_string())?
            .get("action")?
            .as_str()
    }

    pub fn is_triaged(&self, number: u64) -> bool {
        self.triaged.contains_key(&number.to_string())
    }

    /// Replace the entry for `number`, leaving every other entry untouched.
    pub fn insert(&mut self, number: u64, entry: &TriageEntry) -> Result<(), serde_json::Error> {
        self.triaged.insert(number.to_string(), serde_json::to_value(entry)?);
        Ok(())
    }
}

// ── Triage actions ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TriageAction {
    Close { comment: String },
    CloseWontfix { comment: String, labels: Vec<String> },
    Comment { comment: String },
    Skip { note: String },
}

impl TriageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Close { .. } => "close",
            Self::CloseWontfix { .. } => "close_wontfix",
            Self::Comment { .. } => "comment",
            Self::Skip { .. } => "skip",
        }
    }
}

/// A validated `POST /api/action` body.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub number: u64,
    pub action: TriageAction,
}

impl ActionRequest {
    /// Parse and validate a raw request body.
    ///
    /// Fields are checked in order: body, number, action, comment, labels.
    pub fn from_slice(body: &[u8]) -> Result<Self, RequestError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RequestError::InvalidJson)?;
        let obj = value.as_object().ok_or(RequestError::InvalidJson)?;

        let number = obj
            .get("number")
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .ok_or(RequestError::InvalidNumber)?;

        let kind = obj
            .get("action")
            .and_then(Value::as_str)
            .ok_or(RequestError::InvalidAction)?;
        if !matches!(kind, "close" | "close_wontfix" | "comment" | "skip") {
            return Err(RequestError::InvalidAction);
        }

        let comment = match obj.get("comment") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(RequestError::InvalidComment),
        };

        let labels = match obj.get("labels") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(RequestError::InvalidLabels)?,
            Some(_) => return Err(RequestError::InvalidLabels),
        };

        let action = match kind {
            "close" => TriageAction::Close { comment },
            "close_wontfix" => TriageAction::CloseWontfix { comment, labels },
            "comment" => TriageAction::Comment { comment },
            _ => TriageAction::Skip { note: comment },
        };

        Ok(Self { number, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(v: Value) -> Result<ActionRequest, RequestError> {
        ActionRequest::from_slice(v.to_string().as_bytes())
    }

    #[test]
    fn test_verdict_round_trip_strings() {
        for v in Verdict::ALL {
            assert_eq!(Verdict::from_str(v.as_str()).unwrap(), v);
        }
        assert!(Verdict::from_str("nope").is_err());
    }

    #[test]
    fn test_confidence_rank_order() {
        assert!(Confidence::High.rank() < Confidence::Medium.rank());
        assert!(Confidence::Medium.rank() < Confidence::Low.rank());
        assert!(Confidence::Low.rank() < Confidence::Pending.rank());
    }

    #[test]
    fn test_finding_defaults_when_fields_missing() {
        let f: Finding = serde_json::from_value(json!({"number": 7})).unwrap();
        assert_eq!(f.verdict, Verdict::Pending);
        assert_eq!(f.confidence, Confidence::Pending);
        assert!(f.evidence.is_empty());
    }

    #[test]
    fn test_evidence_field_names() {
        let e: Evidence = serde_json::from_value(json!({
            "type": "commit", "ref": "abc123", "message": "Fix", "date": "2025-01-18"
        }))
        .unwrap();
        assert_eq!(e.kind, "commit");
        assert_eq!(e.reference, "abc123");
    }

    #[test]
    fn test_triage_entry_omits_unset_optional_fields() {
        let entry = TriageEntry {
            action: TriageStatus::Skipped,
            at: "2025-02-11T10:00:00Z".into(),
            comment_posted: false,
            note: String::new(),
        };
        let v = serde_json::to_value(&entry).unwrap();
        assert_eq!(v, json!({"action": "skipped", "at": "2025-02-11T10:00:00Z"}));
    }

    #[test]
    fn test_state_document_preserves_unknown_keys() {
        let doc: StateDocument = serde_json::from_value(json!({
            "version": 2,
            "triaged": {"101": {"action": "closed", "at": "t", "comment_posted": true}}
        }))
        .unwrap();
        assert!(doc.is_triaged(101));
        assert!(!doc.is_triaged(102));
        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["version"], 2);
    }

    #[test]
    fn test_action_request_skip_uses_comment_as_note() {
        let req = parse(json!({"number": 102, "action": "skip", "comment": "Not relevant"})).unwrap();
        assert_eq!(req.number, 102);
        assert_eq!(req.action, TriageAction::Skip { note: "Not relevant".into() });
    }

    #[test]
    fn test_action_request_defaults() {
        let req = parse(json!({"number": 5, "action": "close_wontfix"})).unwrap();
        assert_eq!(
            req.action,
            TriageAction::CloseWontfix { comment: String::new(), labels: vec![] }
        );
    }

    #[test]
    fn test_action_request_labels() {
        let req = parse(json!({"number": 5, "action": "close_wontfix", "labels": ["stale"]})).unwrap();
        match req.action {
            TriageAction::CloseWontfix { labels, .. } => assert_eq!(labels, vec!["stale"]),
            other => panic!("Expected CloseWontfix, got {:?}", other),
        }
    }

    #[test]
    fn test_action_request_rejections() {
        assert_eq!(
            ActionRequest::from_slice(b"not json").unwrap_err(),
            RequestError::InvalidJson
        );
        assert_eq!(parse(json!([1, 2])).unwrap_err(), RequestError::InvalidJson);
        assert_eq!(
            parse(json!({"number": "abc", "action": "skip"})).unwrap_err(),
            RequestError::InvalidNumber
        );
        assert_eq!(
            parse(json!({"number": 0, "action": "skip"})).unwrap_err(),
            RequestError::InvalidNumber
        );
        assert_eq!(
            parse(json!({"number": -3, "action": "skip"})).unwrap_err(),
            RequestError::InvalidNumber
        );
        assert_eq!(
            parse(json!({"number": 1.5, "action": "skip"})).unwrap_err(),
            RequestError::InvalidNumber
        );
        assert_eq!(
            parse(json!({"number": 102, "action": "nope"})).unwrap_err(),
            RequestError::InvalidAction
        );
        assert_eq!(
            parse(json!({"number": 102})).unwrap_err(),
            RequestError::InvalidAction
        );
        assert_eq!(
            parse(json!({"number": 102, "action": "comment", "comment": 3})).unwrap_err(),
            RequestError::InvalidComment
        );
        assert_eq!(
            parse(json!({"number": 102, "action": "close_wontfix", "labels": "wontfix"})).unwrap_err(),
            RequestError::InvalidLabels
        );
        assert_eq!(
            parse(json!({"number": 102, "action": "close_wontfix", "labels": [1]})).unwrap_err(),
            RequestError::InvalidLabels
        );
    }
}
