//! Boolean-precedence bugs and `== True` style in condition expressions.

use crate::elements::{Finding, Severity};
use crate::expr::{self, CondExpr};
use crate::model::{ConditionSite, ProjectModel};

const CATEGORY: &str = "Logic";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    for cond in &model.conditions {
        let tree = expr::parse(&cond.expression);

        let mut precedence_hits = Vec::new();
        collect_precedence_shapes(&tree, &mut precedence_hits);
        for (ident, op, comparison) in &precedence_hits {
            findings.push(precedence_finding(cond, ident, op, comparison));
        }

        // The precedence bug subsumes the style nit on the same condition.
        if precedence_hits.is_empty() {
            let mut style_hits = Vec::new();
            collect_explicit_bools(&tree, &mut style_hits);
            for (name, value) in style_hits {
                findings.push(style_finding(cond, &name, &value));
            }
        }
    }

    findings
}

/// The shape `A or B == C`: a logical node that directly mixes a bare
/// identifier with a comparison subtree. Comparisons bind tighter, so the
/// identifier operand is evaluated on its own truthiness — almost never
/// what the author meant. Applies to every comparison operator, not just
/// equality against a boolean.
fn collect_precedence_shapes(tree: &CondExpr, hits: &mut Vec<(String, String, String)>) {
    match tree {
        CondExpr::Or(operands) | CondExpr::And(operands) => {
            let op = if matches!(tree, CondExpr::Or(_)) { "or" } else { "and" };
            let ident = operands.iter().find_map(|o| match o {
                CondExpr::Ident(name) => Some(name.clone()),
                _ => None,
            });
            let comparison = operands.iter().find(|o| o.is_comparison());
            if let (Some(ident), Some(comparison)) = (ident, comparison) {
                hits.push((ident, op.to_string(), render(comparison)));
            }
            for operand in operands {
                collect_precedence_shapes(operand, hits);
            }
        }
        CondExpr::Not(inner) => collect_precedence_shapes(inner, hits),
        CondExpr::Compare { lhs, rhs, .. } => {
            collect_precedence_shapes(lhs, hits);
            collect_precedence_shapes(rhs, hits);
        }
        _ => {}
    }
}

fn collect_explicit_bools(tree: &CondExpr, hits: &mut Vec<(String, String)>) {
    match tree {
        CondExpr::Compare { op, lhs, rhs } if op == "==" || op == "!=" => {
            if let (CondExpr::Ident(name), CondExpr::Literal(value)) = (lhs.as_ref(), rhs.as_ref())
            {
                if value == "True" || value == "False" {
                    hits.push((name.clone(), value.clone()));
                }
            }
        }
        CondExpr::Or(operands) | CondExpr::And(operands) => {
            for operand in operands {
                collect_explicit_bools(operand, hits);
            }
        }
        CondExpr::Not(inner) => collect_explicit_bools(inner, hits),
        _ => {}
    }
}

fn render(tree: &CondExpr) -> String {
    match tree {
        CondExpr::Or(ops) => ops.iter().map(render).collect::<Vec<_>>().join(" or "),
        CondExpr::And(ops) => ops.iter().map(render).collect::<Vec<_>>().join(" and "),
        CondExpr::Not(inner) => format!("not {}", render(inner)),
        CondExpr::Compare { op, lhs, rhs } => {
            format!("{} {} {}", render(lhs), op, render(rhs))
        }
        CondExpr::Ident(s) | CondExpr::Literal(s) | CondExpr::Opaque(s) => s.clone(),
    }
}

fn precedence_finding(cond: &ConditionSite, ident: &str, op: &str, comparison: &str) -> Finding {
    Finding {
        category: CATEGORY.to_string(),
        severity: Severity::Critical,
        file: cond.file.clone(),
        line: cond.line,
        message: format!("Operator precedence bug: '{} {} {}'", ident, op, comparison),
        explanation: format!(
            "`{}` evaluates as `{} {} ({})` because comparisons bind tighter \
             than `{}`. The bare `{}` operand is tested on its own \
             truthiness, so the comparison no longer constrains it.",
            cond.expression, ident, op, comparison, op, ident
        ),
        suggestion: format!(
            "Parenthesize, or compare both sides explicitly: `({} ...) {} ({})`.",
            ident, op, comparison
        ),
    }
}

fn style_finding(cond: &ConditionSite, name: &str, value: &str) -> Finding {
    let fix = if value == "True" {
        name.to_string()
    } else {
        format!("not {}", name)
    };
    Finding {
        category: CATEGORY.to_string(),
        severity: Severity::Style,
        file: cond.file.clone(),
        line: cond.line,
        message: format!("Explicit '== {}' comparison", value),
        explanation: format!(
            "`{}` compares `{}` against `{}` instead of using the value \
             directly.",
            cond.expression, name, value
        ),
        suggestion: format!("Write `{}` instead.", fix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn precedence_bug_in_if_condition() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    if saw_intro or chapter == 2:\n",
                "        return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert!(findings[0].message.contains("precedence"));
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn generalizes_beyond_equality() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    if ready and strength > 5:\n        return\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("and"));
    }

    #[test]
    fn parenthesized_shape_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    if (saw_intro or chapter) == 2:\n        return\n",
        )]);
        let findings = check(&model);
        assert!(findings.iter().all(|f| f.severity != Severity::Critical));
    }

    #[test]
    fn two_comparisons_joined_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    if a == 1 or b == 2:\n        return\n",
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn explicit_true_comparison_is_style() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    if finished == True:\n        return\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Style);
        assert!(findings[0].suggestion.contains("finished"));
    }

    #[test]
    fn precedence_bug_suppresses_style_nit() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    if a or b == True:\n        return\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn menu_choice_conditions_are_analyzed() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Fight\" if brave or fear == False:\n",
                "            return\n",
                "        \"Flee\":\n",
                "            return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].line, 3);
    }
}
