//! Filter and sort primitives over the composed issue/finding/state view.
//!
//! Every call takes freshly loaded documents; nothing here is cached.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::{
    Confidence, Finding, FindingsDocument, Issue, StateDocument, Verdict,
};
use crate::errors::RequestError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShowFilter {
    #[default]
    All,
    Untriaged,
    Triaged,
}

impl FromStr for ShowFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "pending" => Ok(Self::Untriaged),
            "triaged" => Ok(Self::Triaged),
            _ => Err(format!("Invalid show: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    Number,
    Age,
    Confidence,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "number" => Ok(Self::Number),
            "age" => Ok(Self::Age),
            "confidence" => Ok(Self::Confidence),
            _ => Err(format!("Invalid sort: {}", s)),
        }
    }
}

/// Raw query-string parameters for the dashboard view. Empty strings mean
/// "no filter", matching what an HTML form submits.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    #[serde(default)]
    pub verdict: String,
    #[serde(default)]
    pub confidence: String,
    #[serde(default)]
    pub q: String,
    #[serde(default)]
    pub show: String,
    #[serde(default)]
    pub sort: String,
}

/// Validated filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssueFilter {
    pub verdict: Option<Verdict>,
    pub confidence: Option<Confidence>,
    pub text: Option<String>,
    pub show: ShowFilter,
    pub sort: SortKey,
}

impl TryFrom<FilterParams> for IssueFilter {
    type Error = RequestError;

    fn try_from(params: FilterParams) -> Result<Self, Self::Error> {
        fn parse<T: FromStr>(field: &'static str, value: &str) -> Result<Option<T>, RequestError> {
            if value.is_empty() {
                return Ok(None);
            }
            T::from_str(value).map(Some).map_err(|_| RequestError::InvalidFilter {
                field,
                value: value.to_string(),
            })
        }

        Ok(Self {
            verdict: parse("verdict", &params.verdict)?,
            confidence: parse("confidence", &params.confidence)?,
            text: Some(params.q).filter(|q| !q.is_empty()),
            show: parse("show", &params.show)?.unwrap_or_default(),
            sort: parse("sort", &params.sort)?.unwrap_or_default(),
        })
    }
}

/// Verdict and confidence for an issue, defaulting to pending.
pub fn effective_assessment(finding: Option<&Finding>) -> (Verdict, Confidence) {
    finding
        .map(|f| (f.verdict, f.confidence))
        .unwrap_or((Verdict::Pending, Confidence::Pending))
}

fn matches_text(issue: &Issue, needle_lower: &str) -> bool {
    issue.title.to_lowercase().contains(needle_lower) || issue.body.to_lowercase().contains(needle_lower)
}

/// Apply `filter` to `issues` and return them in the requested order.
///
/// Number ascending is always the tiebreak: the list is ordered by number
/// first and the secondary key is applied with a stable sort.
pub fn filter_issues<'a>(
    issues: &'a [Issue],
    findings: &FindingsDocument,
    state: &StateDocument,
    filter: &IssueFilter,
) -> Vec<&'a Issue> {
    let by_number = findings.by_number();
    let needle = filter.text.as_ref().map(|q| q.to_lowercase());

    let mut selected: Vec<&Issue> = issues
        .iter()
        .filter(|issue| {
            let (verdict, confidence) = effective_assessment(by_number.get(&issue.number).copied());
            if filter.verdict.is_some_and(|v| v != verdict) {
                return false;
            }
            if filter.confidence.is_some_and(|c| c != confidence) {
                return false;
            }
            if let Some(needle) = &needle
                && !matches_text(issue, needle)
            {
                return false;
            }
            match filter.show {
                ShowFilter::All => true,
                ShowFilter::Untriaged => !state.is_triaged(issue.number),
                ShowFilter::Triaged => state.is_triaged(issue.number),
            }
        })
        .collect();

    selected.sort_by_key(|issue| issue.number);
    match filter.sort {
        SortKey::Number => {}
        SortKey::Age => selected.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
        SortKey::Confidence => selected.sort_by_key(|issue| {
            effective_assessment(by_number.get(&issue.number).copied()).1.rank()
        }),
    }
    selected
}

// ── Dashboard view ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardRow {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub created_at: String,
    pub last_comment_at: Option<String>,
    pub labels: Vec<String>,
    pub verdict: Verdict,
    pub confidence: Confidence,
    /// Recorded action, passed through as written.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardSummary {
    pub total: usize,
    pub verdicts: BTreeMap<&'static str, usize>,
    pub triaged: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Dashboard {
    pub summary: DashboardSummary,
    pub issues: Vec<DashboardRow>,
}

/// Counts over the unfiltered issue set.
pub fn summarize(issues: &[Issue], findings: &FindingsDocument, state: &StateDocument) -> DashboardSummary {
    let by_number = findings.by_number();
    let mut verdicts = BTreeMap::new();
    for issue in issues {
        let (verdict, _) = effective_assessment(by_number.get(&issue.number).copied());
        *verdicts.entry(verdict.as_str()).or_insert(0) += 1;
    }
    DashboardSummary {
        total: issues.len(),
        verdicts,
        triaged: state.triaged.len(),
    }
}

pub fn build_dashboard(
    issues: &[Issue],
    findings: &FindingsDocument,
    state: &StateDocument,
    filter: &IssueFilter,
) -> Dashboard {
    let by_number = findings.by_number();
    let rows = filter_issues(issues, findings, state, filter)
        .into_iter()
        .map(|issue| {
            let (verdict, confidence) = effective_assessment(by_number.get(&issue.number).copied());
            DashboardRow {
                number: issue.number,
                title: issue.title.clone(),
                url: issue.url.clone(),
                created_at: issue.created_at.clone(),
                last_comment_at: issue.last_comment_at.clone(),
                labels: issue.labels.clone(),
                verdict,
                confidence,
                status: state.action(issue.number).map(str::to_string),
            }
        })
        .collect();

    Dashboard {
        summary: summarize(issues, findings, state),
        issues: rows,
    }
}
