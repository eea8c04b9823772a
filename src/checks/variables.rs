//! Variable hygiene: undeclared assignments, constant mutation, duplicate
//! and unused declarations, persistent-variable misuse, reserved-name
//! shadowing, and casing drift across variable families.

use crate::elements::{AssignKind, Finding, Severity, VarKind};
use crate::model::{ProjectModel, VarOccurrence, VarUse};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

const CATEGORY: &str = "Variables";

/// Engine-provided store names a project must not redeclare.
const RESERVED_IDENTIFIERS: &[&str] = &[
    "config",
    "gui",
    "persistent",
    "renpy",
    "store",
    "style",
    "menu",
    "narrator",
    "extend",
    "adv",
    "nvl",
    "centered",
    "save_name",
    "main_menu",
    "mouse_visible",
    "default_transition",
    "_return",
    "_history",
];

fn ident_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Za-z_]\w*\b").unwrap())
}

fn persistent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"persistent\.(\w+)").unwrap())
}

const EXPR_KEYWORDS: &[&str] = &[
    "True", "False", "None", "and", "or", "not", "if", "elif", "else", "in", "is",
];

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    let mut all: Vec<&VarOccurrence> = model.variables.values().flatten().collect();
    all.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    // Exact-cased declaration tables.
    let mut default_decls: HashMap<&str, Vec<&VarOccurrence>> = HashMap::new();
    let mut declared: HashSet<&str> = HashSet::new();
    let mut persistent_declared: HashSet<&str> = HashSet::new();
    for &occ in &all {
        match occ.usage {
            VarUse::Decl(VarKind::Default) => {
                default_decls.entry(occ.name.as_str()).or_default().push(occ);
                declared.insert(occ.name.as_str());
            }
            VarUse::Decl(VarKind::Define) => {
                declared.insert(occ.name.as_str());
            }
            VarUse::Decl(VarKind::Persistent) => {
                persistent_declared.insert(occ.name.as_str());
            }
            VarUse::Assign(_) => {}
        }
    }

    // Every place a name is read or written, for unused detection.
    let mut referenced: HashSet<String> = HashSet::new();
    for occ in &all {
        if matches!(occ.usage, VarUse::Assign(_)) {
            referenced.insert(occ.name.clone());
        }
    }
    for cond in &model.conditions {
        for m in ident_re().find_iter(&cond.expression) {
            if !EXPR_KEYWORDS.contains(&m.as_str()) {
                referenced.insert(m.as_str().to_string());
            }
        }
    }
    for line in &model.dialogue {
        if let Some(speaker) = &line.speaker {
            referenced.insert(speaker.clone());
        }
    }

    undeclared_assignments(model, &declared, &mut findings);
    define_mutations(model, &mut findings);
    duplicate_defaults(&default_decls, &mut findings);
    persistent_misuse(model, &persistent_declared, &mut findings);
    reserved_shadowing(&all, &mut findings);
    case_mismatches(model, &mut findings);
    unused_defaults(&default_decls, &referenced, &mut findings);

    findings
}

fn undeclared_assignments(
    model: &ProjectModel,
    declared: &HashSet<&str>,
    findings: &mut Vec<Finding>,
) {
    let mut sites: Vec<&VarOccurrence> = model
        .variables
        .values()
        .flatten()
        .filter(|occ| matches!(occ.usage, VarUse::Assign(_)))
        .filter(|occ| !occ.name.contains('.'))
        .filter(|occ| !declared.contains(occ.name.as_str()))
        .collect();
    sites.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    for occ in sites {
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::High,
            file: occ.file.clone(),
            line: occ.line,
            message: format!("Undeclared variable '{}'", occ.name),
            explanation: format!(
                "'{}' is assigned here but never declared with 'default'. \
                 The engine's save/load and rollback systems only track \
                 declared variables; this one silently loses state.",
                occ.name
            ),
            suggestion: format!("Add 'default {} = <initial value>'.", occ.name),
        });
    }
}

fn define_mutations(model: &ProjectModel, findings: &mut Vec<Finding>) {
    let mut keys: Vec<&String> = model.variables.keys().collect();
    keys.sort();

    for key in keys {
        let occurrences = &model.variables[key];
        let define = occurrences
            .iter()
            .find(|o| matches!(o.usage, VarUse::Decl(VarKind::Define)));
        let Some(define) = define else { continue };
        if occurrences
            .iter()
            .any(|o| matches!(o.usage, VarUse::Decl(VarKind::Default)))
        {
            continue;
        }

        for occ in occurrences {
            if let VarUse::Assign(kind) = occ.usage {
                let verb = match kind {
                    AssignKind::Simple => "reassigned",
                    AssignKind::Augmented => "modified in place",
                };
                findings.push(Finding {
                    category: CATEGORY.to_string(),
                    severity: Severity::Critical,
                    file: occ.file.clone(),
                    line: occ.line,
                    message: format!("Constant '{}' is {}", occ.name, verb),
                    explanation: format!(
                        "'{}' is declared with 'define' at {}:{}, which makes \
                         it a constant re-evaluated on every load. This \
                         assignment is not saved; after a reload the value \
                         silently reverts.",
                        define.name, define.file, define.line
                    ),
                    suggestion: format!(
                        "Declare it with 'default {} = ...' if it is meant to change.",
                        define.name
                    ),
                });
            }
        }
    }
}

fn duplicate_defaults(
    default_decls: &HashMap<&str, Vec<&VarOccurrence>>,
    findings: &mut Vec<Finding>,
) {
    let mut names: Vec<&&str> = default_decls.keys().collect();
    names.sort();

    for name in names {
        let decls = &default_decls[*name];
        if decls.len() < 2 {
            continue;
        }
        let first = decls[0];
        for dup in &decls[1..] {
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::Medium,
                file: dup.file.clone(),
                line: dup.line,
                message: format!("Duplicate default for '{}'", name),
                explanation: format!(
                    "'{}' already has a default at {}:{}. Later defaults for \
                     the same name are ignored, so one of these initial \
                     values never applies.",
                    name, first.file, first.line
                ),
                suggestion: "Keep a single default per variable.".to_string(),
            });
        }
    }
}

fn persistent_misuse(
    model: &ProjectModel,
    persistent_declared: &HashSet<&str>,
    findings: &mut Vec<Finding>,
) {
    // Reads only: conditions and augmented assignments. A plain assignment
    // is write-only and safe on a fresh install.
    let mut reads: HashMap<String, (String, usize)> = HashMap::new();
    for cond in &model.conditions {
        for c in persistent_re().captures_iter(&cond.expression) {
            let full = format!("persistent.{}", &c[1]);
            reads.entry(full).or_insert_with(|| (cond.file.clone(), cond.line));
        }
    }
    let mut augments: Vec<&VarOccurrence> = model
        .variables
        .values()
        .flatten()
        .filter(|o| matches!(o.usage, VarUse::Assign(AssignKind::Augmented)))
        .filter(|o| o.name.starts_with("persistent."))
        .collect();
    augments.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    for occ in augments {
        reads
            .entry(occ.name.clone())
            .or_insert_with(|| (occ.file.clone(), occ.line));
    }

    let mut names: Vec<&String> = reads.keys().collect();
    names.sort();
    for name in names {
        if persistent_declared.contains(name.as_str()) {
            continue;
        }
        // Underscore-prefixed persistent vars are engine internals
        // initialized outside script code.
        if name
            .split_once('.')
            .map(|(_, suffix)| suffix.starts_with('_'))
            .unwrap_or(false)
        {
            continue;
        }
        let (file, line) = &reads[name];
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::High,
            file: file.clone(),
            line: *line,
            message: format!("Persistent variable '{}' used without default", name),
            explanation: format!(
                "'{}' is read here but never declared with 'default {} = ...'. \
                 On a fresh install the value is None, which breaks \
                 comparisons and arithmetic.",
                name, name
            ),
            suggestion: format!("Add 'default {} = <initial value>'.", name),
        });
    }
}

fn reserved_shadowing(all: &[&VarOccurrence], findings: &mut Vec<Finding>) {
    let mut seen: HashSet<&str> = HashSet::new();
    for occ in all {
        if !matches!(occ.usage, VarUse::Decl(_)) {
            continue;
        }
        if !RESERVED_IDENTIFIERS.contains(&occ.name.as_str()) {
            continue;
        }
        if !seen.insert(occ.name.as_str()) {
            continue;
        }
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::Medium,
            file: occ.file.clone(),
            line: occ.line,
            message: format!("Declaration shadows builtin '{}'", occ.name),
            explanation: format!(
                "'{}' is a reserved engine name; redeclaring it hides the \
                 builtin for the rest of the project and tends to fail in \
                 ways that are hard to trace back here.",
                occ.name
            ),
            suggestion: "Pick a project-specific name.".to_string(),
        });
    }
}

/// Two detection strategies, mirroring how casing drift actually appears:
/// the same name declared under two casings, and a numbered family
/// (`quest_1`, `quest_2`, `Quest_3`) where one member breaks the majority
/// casing. Only minority members are flagged, never the majority.
fn case_mismatches(model: &ProjectModel, findings: &mut Vec<Finding>) {
    let mut reported: HashSet<String> = HashSet::new();

    let mut keys: Vec<&String> = model.variables.keys().collect();
    keys.sort();

    // Strategy 1: exact lowercase collision between declared names.
    for key in &keys {
        if key.contains('.') {
            continue;
        }
        let decls: Vec<&VarOccurrence> = model.variables[*key]
            .iter()
            .filter(|o| matches!(o.usage, VarUse::Decl(_)))
            .collect();
        let mut variants: Vec<&str> = Vec::new();
        for d in &decls {
            if !variants.contains(&d.name.as_str()) {
                variants.push(&d.name);
            }
        }
        if variants.len() < 2 {
            continue;
        }
        for variant in &variants {
            let first = decls.iter().find(|d| d.name == *variant).unwrap();
            let others: Vec<&str> = variants.iter().filter(|v| *v != variant).copied().collect();
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::High,
                file: first.file.clone(),
                line: first.line,
                message: format!("Variable case mismatch: '{}'", variant),
                explanation: format!(
                    "'{}' is also declared as {}. Variable names are \
                     case-sensitive, so these are distinct variables and one \
                     of them is never the one being tested.",
                    variant,
                    others.join(", ")
                ),
                suggestion: "Standardize on a single casing.".to_string(),
            });
            reported.insert(variant.to_string());
        }
    }

    // Strategy 2: numbered families with a minority-cased member.
    let mut bases: Vec<&String> = model.families.keys().collect();
    bases.sort();
    for base in bases {
        let members = &model.families[base];
        if members.len() < 2 {
            continue;
        }
        let stems: Vec<String> = members
            .iter()
            .map(|m| m.trim_end_matches(|c: char| c.is_ascii_digit()).to_string())
            .collect();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for stem in &stems {
            *counts.entry(stem.as_str()).or_insert(0) += 1;
        }
        if counts.len() < 2 {
            continue;
        }
        let majority = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(stem, _)| stem.to_string())
            .unwrap();

        for (member, stem) in members.iter().zip(&stems) {
            if *stem == majority || reported.contains(member) {
                continue;
            }
            let suffix = &member[stem.len()..];
            let expected = format!("{}{}", majority, suffix);
            let site = first_decl(model, member);
            let (file, line) = site
                .map(|o| (o.file.clone(), o.line))
                .unwrap_or_default();
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::High,
                file,
                line,
                message: format!("Variable case mismatch: '{}'", member),
                explanation: format!(
                    "'{}' breaks the casing pattern of its family ({}). The \
                     majority spelling suggests '{}' was intended; as written \
                     this is a separate variable.",
                    member,
                    members.join(", "),
                    expected
                ),
                suggestion: format!("Rename to '{}' to match its siblings.", expected),
            });
        }
    }
}

fn first_decl<'a>(model: &'a ProjectModel, name: &str) -> Option<&'a VarOccurrence> {
    model
        .variables
        .get(&name.to_lowercase())?
        .iter()
        .find(|o| o.name == name && matches!(o.usage, VarUse::Decl(_)))
}

fn unused_defaults(
    default_decls: &HashMap<&str, Vec<&VarOccurrence>>,
    referenced: &HashSet<String>,
    findings: &mut Vec<Finding>,
) {
    let mut names: Vec<&&str> = default_decls.keys().collect();
    names.sort();

    for name in names {
        if name.contains('.') || referenced.contains(*name) {
            continue;
        }
        let decl = default_decls[*name][0];
        findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::Low,
            file: decl.file.clone(),
            line: decl.line,
            message: format!("Unused variable '{}'", name),
            explanation: format!(
                "'{}' is declared here but never referenced by any script.",
                name
            ),
            suggestion: "Remove it, or keep it deliberately for save compatibility.".to_string(),
        });
    }
}
