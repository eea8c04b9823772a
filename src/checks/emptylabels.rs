//! Labels with no body. An empty label silently falls through to whatever
//! code happens to follow it in the file.

use crate::elements::{Finding, Severity};
use crate::model::ProjectModel;

const CATEGORY: &str = "Empty Labels";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut entries: Vec<(&String, &crate::model::LabelBody)> = model.label_bodies.iter().collect();
    entries.sort_by(|a, b| (&a.1.file, a.1.line).cmp(&(&b.1.file, b.1.line)));

    for (name, body) in entries {
        if body.element_count > 0 && !body.only_pass {
            continue;
        }
        let detail = if body.only_pass { " (only 'pass')" } else { "" };
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::High,
            file: body.file.clone(),
            line: body.line,
            message: format!("Empty label '{}'", name),
            explanation: format!(
                "Label '{}' has no meaningful content{}. Jumping here falls \
                 through to whatever follows in the file, which is almost \
                 never what was meant.",
                name, detail
            ),
            suggestion: format!("Add content to '{}' or delete the leftover stub.", name),
        });
    }

    findings
}
