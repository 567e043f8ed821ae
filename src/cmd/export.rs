//! Markdown report command: `issue-triage export`.

use std::path::Path;

use anyhow::{Context, Result};
use issue_triage::triage::export::render_markdown;
use issue_triage::triage::models::FindingsDocument;
use issue_triage::triage::store::{TriageStore, load_json};

pub fn cmd_export(triage_dir: &Path, output: Option<&Path>) -> Result<()> {
    let triage_dir = super::resolve_triage_dir(triage_dir)?;
    let store = TriageStore::new(&triage_dir);

    let findings: FindingsDocument = load_json(&store.findings_path())?;
    let state = store.load_state()?;
    let report = render_markdown(&findings, &state);

    match output {
        Some(path) => {
            std::fs::write(path, &report)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}
