//! Calls into labels that never return. The pushed frame is never popped,
//! so repeated calls leak call stack until the game crashes.

use crate::elements::{Finding, Severity};
use crate::model::ProjectModel;

const CATEGORY: &str = "Call Safety";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    for call in &model.calls {
        if call.is_dynamic {
            continue;
        }
        // Missing targets belong to the Labels check.
        let Some(body) = model.label_bodies.get(&call.target) else {
            continue;
        };
        if body.has_return {
            continue;
        }
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::Critical,
            file: call.file.clone(),
            line: call.line,
            message: format!("Called label '{}' never returns", call.target),
            explanation: format!(
                "'call {}' pushes a return frame, but the body of '{}' \
                 (defined at {}:{}) contains no 'return' statement. The frame \
                 stays on the stack forever; enough of these and the game \
                 crashes.",
                call.target, call.target, body.file, body.line
            ),
            suggestion: format!(
                "End '{}' with 'return', or use 'jump {}' if control should \
                 not come back.",
                call.target, call.target
            ),
        });
    }

    findings
}
