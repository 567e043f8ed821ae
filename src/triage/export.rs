use super::models::{FindingsDocument, StateDocument};

/// Render findings plus triage status as a markdown report.
pub fn render_markdown(findings: &FindingsDocument, state: &StateDocument) -> String {
    let repo = findings.repo.as_deref().unwrap_or_default();
    let mut lines = vec![
        format!("# Issue Triage Report \u{2014} {}", repo),
        format!("Analyzed: {}", findings.analyzed_at),
        String::new(),
    ];

    for finding in &findings.issues {
        let status = state.action(finding.number).unwrap_or("pending");

        lines.push(format!("## #{}: {}", finding.number, finding.title));
        lines.push(format!(
            "**Verdict**: {} ({}) | **Status**: {}",
            finding.verdict, finding.confidence, status
        ));
        if !finding.summary.is_empty() {
            lines.push(format!("\n{}", finding.summary));
        }
        if !finding.evidence.is_empty() {
            lines.push(String::new());
            for e in &finding.evidence {
                lines.push(format!("- {}: {} \u{2014} {}", e.kind, e.reference, e.message));
            }
        }
        lines.push(String::new());
    }

    lines.join("\n")
}
