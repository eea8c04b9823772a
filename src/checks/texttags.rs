//! Markup tags inside dialogue text: unclosed, mismatched, or unknown.

use crate::elements::{Finding, Severity};
use crate::model::ProjectModel;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const CATEGORY: &str = "Text Tags";

/// Tags that require a closing {/tag}.
const PAIRED_TAGS: &[&str] = &[
    "b", "i", "u", "s", "plain", "a", "font", "size", "color", "outlinecolor", "alpha", "k",
    "cps", "rt", "rb", "alt", "noalt",
];

/// Tags that stand alone.
const SELF_CLOSING_TAGS: &[&str] = &[
    "w", "p", "nw", "fast", "space", "vspace", "image", "clear", "done", "#", "lb",
];

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{(/?\w+|#)(?:=[^}]*)?\}").unwrap())
}

fn validate_tags(text: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut stack: Vec<&str> = Vec::new();

    for capture in tag_re().captures_iter(text) {
        let raw = capture.get(1).unwrap().as_str();
        if let Some(name) = raw.strip_prefix('/') {
            match stack.last() {
                None => errors.push(format!("closing tag '{{/{}}}' without opening", name)),
                Some(open) if *open != name => {
                    errors.push(format!(
                        "mismatched nesting: expected '{{/{}}}', found '{{/{}}}'",
                        open, name
                    ));
                    stack.pop();
                }
                Some(_) => {
                    stack.pop();
                }
            }
        } else if PAIRED_TAGS.contains(&raw) {
            stack.push(raw);
        } else if !SELF_CLOSING_TAGS.contains(&raw) {
            errors.push(format!("unknown text tag '{{{}}}'", raw));
        }
    }

    for open in stack.iter().rev() {
        errors.push(format!("unclosed tag '{{{}}}'", open));
    }

    errors
}

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut seen: HashSet<(&str, usize)> = HashSet::new();

    for line in &model.dialogue {
        if line.text.is_empty() || !seen.insert((line.file.as_str(), line.line)) {
            continue;
        }
        for error in validate_tags(&line.text) {
            let severity = if error.starts_with("unknown") {
                Severity::Low
            } else {
                Severity::Medium
            };
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity,
                file: line.file.clone(),
                line: line.line,
                message: format!("Text tag issue: {}", error),
                explanation: format!(
                    "In the dialogue text {:?}: {}. Broken markup renders \
                     literally or bleeds styling into the rest of the line.",
                    line.text, error
                ),
                suggestion: "Close paired tags with {/tag} and check tag spelling.".to_string(),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn unclosed_tag_is_medium() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    e \"This is {b}bold forever.\"\n",
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("unclosed"));
    }

    #[test]
    fn mismatched_nesting_is_medium() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    e \"{b}{i}wrong order{/b}{/i}\"\n",
        )]);
        let findings = check(&model);
        assert!(findings.iter().any(|f| f.message.contains("mismatched")));
    }

    #[test]
    fn unknown_tag_is_low() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    e \"Hello {bold}world{/bold}.\"\n",
        )]);
        let findings = check(&model);
        assert!(!findings.is_empty());
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn well_formed_tags_are_clean() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    e \"{b}bold{/b} and {color=#f00}red{/color}{w}\"\n",
        )]);
        assert!(check(&model).is_empty());
    }

    #[test]
    fn tagless_dialogue_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            "label start:\n    e \"Nothing fancy here.\"\n",
        )]);
        assert!(check(&model).is_empty());
    }
}
