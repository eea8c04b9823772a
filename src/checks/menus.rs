//! Menu structure: empty menus, single-option menus, empty choices, and
//! choices that fall through into sibling content.

use crate::elements::{Element, Finding, MenuChoice, Severity};
use crate::model::ProjectModel;

const CATEGORY: &str = "Menus";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    for site in &model.menus {
        let menu = &site.menu;

        if menu.choices.is_empty() {
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::High,
                file: menu.file.clone(),
                line: menu.line,
                message: "Menu with no choices".to_string(),
                explanation: "This menu block contains no choices at all; the player \
                              is presented with nothing to pick and the game stalls."
                    .to_string(),
                suggestion: "Add choices or remove the menu block.".to_string(),
            });
            continue;
        }

        if menu.choices.len() == 1 {
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::Medium,
                file: menu.file.clone(),
                line: menu.line,
                message: "Single-choice menu".to_string(),
                explanation: format!(
                    "This menu offers only '{}'. A one-option menu gives the \
                     player no real decision.",
                    menu.choices[0].text
                ),
                suggestion: "Add more choices or drop the menu wrapper.".to_string(),
            });
            continue;
        }

        let sizes: Vec<usize> = menu.choices.iter().map(|c| body_size(&c.body)).collect();
        let max_size = sizes.iter().copied().max().unwrap_or(0);

        for (choice, size) in menu.choices.iter().zip(&sizes) {
            if *size == 0 {
                findings.push(Finding {
                    category: CATEGORY.to_string(),
                    severity: Severity::High,
                    file: menu.file.clone(),
                    line: choice.line,
                    message: format!("Empty menu choice: '{}'", choice.text),
                    explanation: format!(
                        "Choice '{}' has no body; picking it falls straight \
                         through to whatever follows the menu.",
                        choice.text
                    ),
                    suggestion: "Give the choice content or remove it.".to_string(),
                });
            } else if *size <= 1 && !has_terminal(choice) && max_size > 2 {
                findings.push(Finding {
                    category: CATEGORY.to_string(),
                    severity: Severity::Medium,
                    file: menu.file.clone(),
                    line: choice.line,
                    message: format!("Possible menu fallthrough: '{}'", choice.text),
                    explanation: format!(
                        "Choice '{}' has {} statement(s) and never jumps or \
                         returns, while a sibling runs up to {}. Content after \
                         the menu plays regardless of what was picked, which \
                         usually means a branch is missing.",
                        choice.text, size, max_size
                    ),
                    suggestion: "End the choice with a jump or return, or confirm the shared \
                                 continuation is intended."
                        .to_string(),
                });
            }
        }
    }

    findings
}

fn body_size(body: &[Element]) -> usize {
    let mut count = 0;
    for el in body {
        count += 1;
        match el {
            Element::Menu(menu) => {
                for choice in &menu.choices {
                    count += body_size(&choice.body);
                }
            }
            Element::Conditional(branch) => count += body_size(&branch.body),
            _ => {}
        }
    }
    count
}

fn has_terminal(choice: &MenuChoice) -> bool {
    fn any_terminal(body: &[Element]) -> bool {
        body.iter().any(|el| match el {
            Element::Jump(_) | Element::Return(_) => true,
            Element::Menu(menu) => menu.choices.iter().any(|c| any_terminal(&c.body)),
            Element::Conditional(branch) => any_terminal(&branch.body),
            _ => false,
        })
    }
    any_terminal(&choice.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model;

    #[test]
    fn empty_choice_is_high() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Choice A\":\n",
                "            mc \"Picked A\"\n",
                "            mc \"More A\"\n",
                "            mc \"Even more A\"\n",
                "        \"Choice B\":\n",
                "            pass\n",
                "label next:\n",
                "    return\n",
            ),
        )]);
        let model2 = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Choice A\":\n",
                "            mc \"Picked A\"\n",
                "            mc \"More A\"\n",
                "            mc \"Even more A\"\n",
                "        \"Choice B\":\n",
                "label next:\n",
                "    return\n",
            ),
        )]);
        let findings = check(&model2);
        let empty: Vec<_> = findings
            .iter()
            .filter(|f| f.message.contains("Empty menu choice"))
            .collect();
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].severity, Severity::High);

        // The pass-bodied variant is a fallthrough candidate instead.
        let findings = check(&model);
        assert!(findings.iter().any(|f| f.message.contains("fallthrough")));
    }

    #[test]
    fn fallthrough_short_choice_without_terminal() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Short\":\n",
                "            mc \"Just one line\"\n",
                "        \"Long\":\n",
                "            mc \"Line 1\"\n",
                "            mc \"Line 2\"\n",
                "            mc \"Line 3\"\n",
                "            mc \"Line 4\"\n",
            ),
        )]);
        let findings = check(&model);
        let ft: Vec<_> = findings
            .iter()
            .filter(|f| f.message.contains("fallthrough"))
            .collect();
        assert_eq!(ft.len(), 1);
        assert!(ft[0].message.contains("Short"));
        assert_eq!(ft[0].severity, Severity::Medium);
    }

    #[test]
    fn short_choice_with_jump_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Short\":\n",
                "            jump next\n",
                "        \"Long\":\n",
                "            mc \"Line 1\"\n",
                "            mc \"Line 2\"\n",
                "            mc \"Line 3\"\n",
                "            mc \"Line 4\"\n",
                "label next:\n",
                "    return\n",
            ),
        )]);
        let findings = check(&model);
        assert!(!findings.iter().any(|f| f.message.contains("fallthrough")));
    }

    #[test]
    fn single_choice_menu_is_medium() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"Only option\":\n",
                "            jump next\n",
                "label next:\n",
                "    return\n",
            ),
        )]);
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("Single-choice"));
    }

    #[test]
    fn balanced_menu_is_clean() {
        let model = test_model(&[(
            "script.rpy",
            concat!(
                "label start:\n",
                "    menu:\n",
                "        \"A\":\n",
                "            jump next\n",
                "        \"B\":\n",
                "            jump next\n",
                "label next:\n",
                "    return\n",
            ),
        )]);
        assert!(check(&model).is_empty());
    }
}
