//! Finding aggregation: stable ordering and duplicate grouping.

use crate::elements::{Finding, Severity};
use std::collections::HashMap;

/// How many sibling locations a grouped record spells out before
/// summarizing the rest.
const MAX_LISTED_LOCATIONS: usize = 6;

/// Sort findings by severity, then file, then line. The sort is stable and
/// total over the remaining fields, so identical input always produces
/// identical output — reports and tests depend on that.
pub fn sort_findings(findings: &mut [Finding]) {
    findings.sort_by(|a, b| {
        a.severity
            .cmp(&b.severity)
            .then_with(|| a.file.cmp(&b.file))
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| a.message.cmp(&b.message))
    });
}

/// Sort, and optionally collapse findings that are identical in
/// (category, severity, message, explanation) — location excluded — into a
/// single record annotated with every occurrence. With `group_duplicates`
/// off, every occurrence stays its own record.
pub fn aggregate(mut findings: Vec<Finding>, group_duplicates: bool) -> Vec<Finding> {
    sort_findings(&mut findings);
    if !group_duplicates {
        return findings;
    }

    let mut grouped: Vec<(Finding, Vec<(String, usize)>)> = Vec::new();
    let mut index: HashMap<(String, Severity, String, String), usize> = HashMap::new();

    for finding in findings {
        let key = (
            finding.category.clone(),
            finding.severity,
            finding.message.clone(),
            finding.explanation.clone(),
        );
        match index.get(&key) {
            Some(&i) => grouped[i].1.push((finding.file.clone(), finding.line)),
            None => {
                index.insert(key, grouped.len());
                grouped.push((finding, Vec::new()));
            }
        }
    }

    grouped
        .into_iter()
        .map(|(mut finding, extra)| {
            if !extra.is_empty() {
                finding.explanation.push_str(&render_locations(&extra));
            }
            finding
        })
        .collect()
}

fn render_locations(extra: &[(String, usize)]) -> String {
    let listed: Vec<String> = extra
        .iter()
        .take(MAX_LISTED_LOCATIONS)
        .map(|(file, line)| format!("{}:{}", file, line))
        .collect();
    let mut note = format!(" Also at: {}", listed.join(", "));
    if extra.len() > MAX_LISTED_LOCATIONS {
        note.push_str(&format!(" and {} more", extra.len() - MAX_LISTED_LOCATIONS));
    }
    note.push('.');
    note
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(severity: Severity, file: &str, line: usize, message: &str) -> Finding {
        Finding {
            category: "Test".to_string(),
            severity,
            file: file.to_string(),
            line,
            message: message.to_string(),
            explanation: format!("{} happened", message),
            suggestion: String::new(),
        }
    }

    #[test]
    fn sorts_by_severity_then_file_then_line() {
        let out = aggregate(
            vec![
                finding(Severity::Low, "b.rpy", 1, "low"),
                finding(Severity::Critical, "z.rpy", 9, "crit"),
                finding(Severity::Critical, "a.rpy", 5, "crit2"),
                finding(Severity::Critical, "a.rpy", 2, "crit3"),
            ],
            false,
        );
        let keys: Vec<(Severity, &str, usize)> = out
            .iter()
            .map(|f| (f.severity, f.file.as_str(), f.line))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Severity::Critical, "a.rpy", 2),
                (Severity::Critical, "a.rpy", 5),
                (Severity::Critical, "z.rpy", 9),
                (Severity::Low, "b.rpy", 1),
            ]
        );
    }

    #[test]
    fn grouping_merges_identical_findings() {
        let out = aggregate(
            vec![
                finding(Severity::High, "a.rpy", 1, "same"),
                finding(Severity::High, "b.rpy", 7, "same"),
                finding(Severity::High, "c.rpy", 3, "different"),
            ],
            true,
        );
        assert_eq!(out.len(), 2);
        let merged = out.iter().find(|f| f.message == "same").unwrap();
        assert_eq!(merged.file, "a.rpy");
        assert!(merged.explanation.contains("b.rpy:7"));
    }

    #[test]
    fn single_occurrence_is_untouched() {
        let out = aggregate(vec![finding(Severity::Medium, "a.rpy", 4, "solo")], true);
        assert_eq!(out.len(), 1);
        assert!(!out[0].explanation.contains("Also at"));
    }

    #[test]
    fn ungrouped_keeps_every_occurrence() {
        let out = aggregate(
            vec![
                finding(Severity::High, "a.rpy", 1, "same"),
                finding(Severity::High, "b.rpy", 7, "same"),
            ],
            false,
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = vec![
            finding(Severity::High, "b.rpy", 2, "x"),
            finding(Severity::Low, "a.rpy", 1, "y"),
        ];
        let once = aggregate(input.clone(), true);
        let twice = aggregate(once.clone(), true);
        assert_eq!(once, twice);
    }
}
