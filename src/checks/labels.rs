//! Missing, duplicate and dynamic jump/call targets.

use crate::elements::{Finding, Severity};
use crate::model::ProjectModel;

const CATEGORY: &str = "Labels";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    for jump in &model.jumps {
        if jump.is_dynamic {
            findings.push(dynamic_target(&jump.target, "jump", &jump.file, jump.line));
        } else if !model.labels.contains_key(&jump.target) {
            findings.push(missing_target(&jump.target, "jump", &jump.file, jump.line));
        }
    }

    for call in &model.calls {
        if call.is_dynamic {
            findings.push(dynamic_target(&call.target, "call", &call.file, call.line));
        } else if !model.labels.contains_key(&call.target) {
            findings.push(missing_target(&call.target, "call", &call.file, call.line));
        }
    }

    let mut duplicated: Vec<(&String, &Vec<crate::model::LabelDef>)> = model
        .labels
        .iter()
        .filter(|(_, defs)| defs.len() > 1)
        .collect();
    duplicated.sort_by_key(|(name, _)| name.as_str());

    for (name, defs) in duplicated {
        let locations: Vec<String> = defs.iter().map(|d| format!("{}:{}", d.file, d.line)).collect();
        for def in defs {
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::Critical,
                file: def.file.clone(),
                line: def.line,
                message: format!("Duplicate label '{}'", name),
                explanation: format!(
                    "Label '{}' is defined {} times ({}). Labels share one \
                     global namespace; only one definition wins at runtime and \
                     every other becomes unreachable or, worse, silently \
                     replaces the intended target.",
                    name,
                    defs.len(),
                    locations.join(", ")
                ),
                suggestion: "Rename or remove the duplicate definitions.".to_string(),
            });
        }
    }

    findings
}

fn missing_target(target: &str, stmt: &str, file: &str, line: usize) -> Finding {
    Finding {
        category: CATEGORY.to_string(),
        severity: Severity::Critical,
        file: file.to_string(),
        line,
        message: format!("Missing label '{}'", target),
        explanation: format!(
            "'{} {}' targets a label that is never defined in any script \
             file. Reaching this statement crashes at runtime.",
            stmt, target
        ),
        suggestion: format!("Add 'label {}:' or fix the target name.", target),
    }
}

fn dynamic_target(expression: &str, stmt: &str, file: &str, line: usize) -> Finding {
    Finding {
        category: CATEGORY.to_string(),
        severity: Severity::Medium,
        file: file.to_string(),
        line,
        message: format!("Dynamic {} target", stmt),
        explanation: format!(
            "The {} destination `{}` is computed at runtime and cannot be \
             verified statically. Make sure every value it can take resolves \
             to an existing label.",
            stmt, expression
        ),
        suggestion: "Use a direct label name when the destination is known at write time."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn missing_jump_target_is_critical() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    jump missing_label\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.file, "script.rpy");
        assert_eq!(f.line, 2);
        assert!(f.message.contains("missing_label"));
    }

    #[test]
    fn one_finding_per_unresolved_site() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    jump gone\n",
                "    call gone\n",
                "    jump gone\n",
            ),
        )]);
        let findings = check(&model);
        let missing: Vec<_> = findings
            .iter()
            .filter(|f| f.severity == Severity::Critical)
            .collect();
        assert_eq!(missing.len(), 3);
        let lines: Vec<_> = missing.iter().map(|f| f.line).collect();
        assert_eq!(lines, vec![2, 4, 3]);
    }

    #[test]
    fn resolved_targets_stay_silent() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    jump ending\n",
                "label ending:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn duplicate_labels_flag_every_definition() {
        let model = test_model(&[
            ("a.rpy", "label intro:\n    return\n"),
            ("b.rpy", "label intro:\n    return\n"),
        ]);
        let findings = check(&model);
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.severity == Severity::Critical));
        assert!(findings.iter().all(|f| f.message.contains("intro")));
    }

    #[test]
    fn dynamic_target_is_informational_not_missing() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    jump expression \"ch_\" + str(n)\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("Dynamic"));
    }
}
