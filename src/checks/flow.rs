//! Unreachable statements after an unconditional jump or return.

use crate::elements::{Element, Finding, Severity};
use crate::model::ProjectModel;

const CATEGORY: &str = "Flow";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (_, elements) in &model.file_elements {
        walk_body(elements, &mut findings);
    }
    findings
}

/// Within one body, anything that follows a jump/return at the same or
/// deeper indent — before the next label boundary — can never execute.
/// Only the first orphaned statement per terminator is reported; everything
/// after it is the same dead region.
fn walk_body(body: &[Element], findings: &mut Vec<Finding>) {
    for (i, el) in body.iter().enumerate() {
        match el {
            Element::Menu(menu) => {
                for choice in &menu.choices {
                    walk_body(&choice.body, findings);
                }
            }
            Element::Conditional(branch) => walk_body(&branch.body, findings),
            Element::Jump(_) | Element::Return(_) => {
                let kind = if matches!(el, Element::Jump(_)) { "jump" } else { "return" };
                let Some(next) = body.get(i + 1) else { continue };
                if matches!(next, Element::Label(_) | Element::Barrier(_)) {
                    continue;
                }
                if next.depth() < el.depth() {
                    // Outer block resuming, not dead code.
                    continue;
                }
                findings.push(Finding {
                    category: CATEGORY.to_string(),
                    severity: Severity::High,
                    file: next.file().to_string(),
                    line: next.line(),
                    message: format!("Unreachable code after {}", kind),
                    explanation: format!(
                        "This statement follows a '{}' at line {} in the same \
                         block, so control flow can never reach it.",
                        kind,
                        el.line()
                    ),
                    suggestion: format!("Remove it or move it before the '{}'.", kind),
                });
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn statement_after_jump_is_unreachable() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    \"before\"\n",
                "    jump ending\n",
                "    \"after\"\n",
                "label ending:\n",
                "    return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].line, 4);
    }

    #[test]
    fn trailing_jump_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    \"before\"\n",
                "    jump ending\n",
                "label ending:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn only_first_dead_statement_is_reported() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    return\n",
                "    \"one\"\n",
                "    \"two\"\n",
                "    \"three\"\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 3);
    }

    #[test]
    fn jump_inside_if_does_not_kill_outer_flow() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    if done:\n",
                "        jump ending\n",
                "    \"still reachable\"\n",
                "    return\n",
                "label ending:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn dead_code_inside_menu_choice_is_found() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Leave\":\n",
                "            return\n",
                "            \"never shown\"\n",
                "        \"Stay\":\n",
                "            \"fine\"\n",
                "            return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 5);
    }

    #[test]
    fn label_after_return_is_a_boundary() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    return\n",
                "label two:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }
}
