//! Triage progress summary: `issue-triage status`.

use std::path::Path;

use anyhow::Result;
use issue_triage::triage::models::{FindingsDocument, IssuesDocument, Verdict};
use issue_triage::triage::query::summarize;
use issue_triage::triage::store::{TriageStore, load_json};

pub fn cmd_status(triage_dir: &Path) -> Result<()> {
    let triage_dir = super::resolve_triage_dir(triage_dir)?;
    let store = TriageStore::new(&triage_dir);

    let issues: IssuesDocument = load_json(&store.issues_path())?;
    let findings: FindingsDocument = load_json(&store.findings_path())?;
    let state = store.load_state()?;
    let summary = summarize(&issues.issues, &findings, &state);

    if let Some(repo) = findings.repo.as_deref().or(issues.repo.as_deref()) {
        println!("Repo: {}", repo);
    }
    println!("Issues: {}", summary.total);
    println!("Triaged: {}/{}", summary.triaged, summary.total);
    println!();
    println!("By verdict:");
    for verdict in Verdict::ALL {
        if let Some(count) = summary.verdicts.get(verdict.as_str()) {
            println!("  {:<20} {}", verdict.as_str(), count);
        }
    }
    Ok(())
}
