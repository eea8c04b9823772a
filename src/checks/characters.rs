//! Dialogue speakers without a character definition, and characters that
//! never speak.

use crate::elements::{DialogueLine, Finding, Severity, VarKind};
use crate::model::{ProjectModel, VarUse};
use std::collections::{HashMap, HashSet};

const CATEGORY: &str = "Characters";

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    // Speakers can also be plain `define`d values (Character-like objects
    // built in python); those are not undefined.
    let mut defined_names: HashSet<&str> = model.characters.keys().map(String::as_str).collect();
    for occurrences in model.variables.values() {
        for occ in occurrences {
            if matches!(occ.usage, VarUse::Decl(VarKind::Define)) {
                defined_names.insert(occ.name.as_str());
            }
        }
    }

    let mut usages: HashMap<&str, Vec<&DialogueLine>> = HashMap::new();
    for line in &model.dialogue {
        if let Some(speaker) = &line.speaker {
            usages.entry(speaker.as_str()).or_default().push(line);
        }
    }

    let mut speakers: Vec<&&str> = usages.keys().collect();
    speakers.sort();
    for speaker in speakers {
        if defined_names.contains(*speaker) {
            continue;
        }
        let sites = &usages[*speaker];
        let first = sites[0];
        let count_note = match sites.len() {
            1 => String::new(),
            n => format!(" (and {} other locations)", n - 1),
        };
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::High,
            file: first.file.clone(),
            line: first.line,
            message: format!("Undefined speaker '{}'", speaker),
            explanation: format!(
                "'{}' speaks here{} but is never defined with \
                 'define {} = Character(...)'. The line crashes when reached.",
                speaker, count_note, speaker
            ),
            suggestion: format!("Add 'define {} = Character(\"Name\")'.", speaker),
        });
    }

    let mut identifiers: Vec<&String> = model.characters.keys().collect();
    identifiers.sort();
    for identifier in identifiers {
        if usages.contains_key(identifier.as_str()) {
            continue;
        }
        let decl = &model.characters[identifier][0];
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::Low,
            file: decl.file.clone(),
            line: decl.line,
            message: format!("Unused character '{}'", identifier),
            explanation: format!(
                "Character '{}' ('{}') is defined here but never used as a \
                 dialogue speaker.",
                identifier, decl.display_name
            ),
            suggestion: "Remove it if it is no longer needed.".to_string(),
        });
    }

    findings
}
