//! Circular call chains. A `call` pushes a return frame; a cycle of calls
//! grows the stack until the game dies.

use crate::elements::{Finding, Severity};
use crate::model::{CallKind, ProjectModel};
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::{EdgeFiltered, EdgeRef};

const CATEGORY: &str = "Call Cycles";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    let call_edges =
        EdgeFiltered::from_fn(&model.call_graph, |edge| edge.weight().kind == CallKind::Call);
    let components = tarjan_scc(&call_edges);

    for component in components {
        if component.len() == 1 {
            let node = component[0];
            let self_edge = model
                .call_graph
                .edges(node)
                .find(|e| e.target() == node && e.weight().kind == CallKind::Call);
            if let Some(edge) = self_edge {
                let name = &model.call_graph[node];
                findings.push(Finding {
                    category: CATEGORY.to_string(),
                    severity: Severity::High,
                    file: edge.weight().file.clone(),
                    line: edge.weight().line,
                    message: format!("Self-recursive call: '{}'", name),
                    explanation: format!(
                        "Label '{}' calls itself. Every pass pushes another \
                         return frame, so reaching it ends in a stack \
                         overflow.",
                        name
                    ),
                    suggestion: "Control the recursion with a condition, or use 'jump'."
                        .to_string(),
                });
            }
        } else {
            findings.push(cycle_finding(model, &component));
        }
    }

    findings
}

fn cycle_finding(model: &ProjectModel, component: &[NodeIndex]) -> Finding {
    let mut names: Vec<&str> = component
        .iter()
        .map(|n| model.call_graph[*n].as_str())
        .collect();
    names.sort();
    let chain = format!("{} -> {}", names.join(" -> "), names[0]);

    // Anchor the finding at the earliest call site inside the cycle.
    let mut site: Option<(&str, usize)> = None;
    for node in component {
        for edge in model.call_graph.edges(*node) {
            if edge.weight().kind != CallKind::Call || !component.contains(&edge.target()) {
                continue;
            }
            let candidate = (edge.weight().file.as_str(), edge.weight().line);
            if site.map(|s| candidate < s).unwrap_or(true) {
                site = Some(candidate);
            }
        }
    }
    let (file, line) = site.unwrap_or(("", 0));

    Finding {
        category: CATEGORY.to_string(),
        severity: Severity::High,
        file: file.to_string(),
        line,
        message: format!("Circular call chain: {}", chain),
        explanation: format!(
            "These labels call each other in a loop ({}). Entering the cycle \
             pushes return frames forever and crashes with a stack overflow.",
            chain
        ),
        suggestion: "Replace at least one link with 'jump', or guard the cycle with a \
                     condition."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn two_label_cycle_is_one_finding() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label ping:\n",
                "    call pong\n",
                "    return\n",
                "label pong:\n",
                "    call ping\n",
                "    return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].message.contains("ping"));
        assert!(findings[0].message.contains("pong"));
    }

    #[test]
    fn self_recursion_is_flagged() {
        let model = test_model(&[(
            "script.rpy",
            "label loop_forever:\n    call loop_forever\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("Self-recursive"));
        assert_eq!(findings[0].line, 2);
    }

    #[test]
    fn jump_cycles_are_not_call_cycles() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label day:\n",
                "    jump night\n",
                "label night:\n",
                "    jump day\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn acyclic_calls_are_clean() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    call helper\n",
                "    return\n",
                "label helper:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }
}
