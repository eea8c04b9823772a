use crate::elements::{Finding, Severity};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub summary: SeveritySummary,
    pub findings: Vec<Finding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: String,
    pub project_name: String,
    pub project_path: String,
    pub total_findings: usize,
    pub analysis_duration_ms: u128,
    pub version: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub style: usize,
}

pub struct Reporter;

impl Reporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate_report(
        &self,
        findings: &[Finding],
        project_path: &std::path::Path,
        duration_ms: u128,
    ) -> Report {
        let mut summary = SeveritySummary::default();
        for finding in findings {
            match finding.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Style => summary.style += 1,
            }
        }

        Report {
            metadata: ReportMetadata {
                generated_at: chrono::Utc::now().to_rfc3339(),
                project_name: project_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
                project_path: project_path.display().to_string(),
                total_findings: findings.len(),
                analysis_duration_ms: duration_ms,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            summary,
            findings: findings.to_vec(),
        }
    }

    /// Write the report as JSON and markdown next to each other. Returns
    /// the paths written.
    pub fn export_report(&self, report: &Report, output_dir: &PathBuf) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir)?;
        let mut written = Vec::new();

        let json_path = output_dir.join("renlint-report.json");
        fs::write(&json_path, serde_json::to_string_pretty(report)?)?;
        written.push(json_path);

        let md_path = output_dir.join("renlint-report.md");
        fs::write(&md_path, self.render_markdown(report))?;
        written.push(md_path);

        Ok(written)
    }

    fn render_markdown(&self, report: &Report) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "# Script analysis report: {}\n\n",
            report.metadata.project_name
        ));
        out.push_str(&format!(
            "Generated {} — {} finding(s) in {} ms.\n\n",
            report.metadata.generated_at,
            report.metadata.total_findings,
            report.metadata.analysis_duration_ms
        ));
        out.push_str(&format!(
            "| Critical | High | Medium | Low | Style |\n|---|---|---|---|---|\n| {} | {} | {} | {} | {} |\n\n",
            report.summary.critical,
            report.summary.high,
            report.summary.medium,
            report.summary.low,
            report.summary.style,
        ));

        let mut current_severity: Option<Severity> = None;
        for finding in &report.findings {
            if current_severity != Some(finding.severity) {
                current_severity = Some(finding.severity);
                out.push_str(&format!("## {}\n\n", finding.severity));
            }
            out.push_str(&format!(
                "- **{}** ({}) — `{}:{}`\n",
                finding.message, finding.category, finding.file, finding.line
            ));
            if !finding.explanation.is_empty() {
                out.push_str(&format!("  {}\n", finding.explanation));
            }
            if !finding.suggestion.is_empty() {
                out.push_str(&format!("  *Fix: {}*\n", finding.suggestion));
            }
        }

        if report.findings.is_empty() {
            out.push_str("No issues found.\n");
        }
        out
    }
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn finding(severity: Severity) -> Finding {
        Finding {
            category: "Labels".to_string(),
            severity,
            file: "script.rpy".to_string(),
            line: 3,
            message: "Missing label 'x'".to_string(),
            explanation: "jump targets nothing".to_string(),
            suggestion: "fix it".to_string(),
        }
    }

    #[test]
    fn summary_counts_by_severity() {
        let reporter = Reporter::new();
        let report = reporter.generate_report(
            &[finding(Severity::Critical), finding(Severity::Critical), finding(Severity::Low)],
            Path::new("/tmp/mygame"),
            42,
        );
        assert_eq!(report.summary.critical, 2);
        assert_eq!(report.summary.low, 1);
        assert_eq!(report.metadata.project_name, "mygame");
        assert_eq!(report.metadata.total_findings, 3);
    }

    #[test]
    fn export_writes_json_and_markdown() {
        let tmp = tempfile::tempdir().unwrap();
        let reporter = Reporter::new();
        let report =
            reporter.generate_report(&[finding(Severity::High)], Path::new("/tmp/g"), 1);
        let files = reporter
            .export_report(&report, &tmp.path().join("out"))
            .unwrap();
        assert_eq!(files.len(), 2);
        let json = std::fs::read_to_string(&files[0]).unwrap();
        assert!(json.contains("Missing label"));
        let md = std::fs::read_to_string(&files[1]).unwrap();
        assert!(md.contains("## HIGH"));
    }
}
