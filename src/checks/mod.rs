//! Check modules. Each is a pure function over the frozen project model;
//! none shares mutable state, so they can run in any order or in parallel.

pub mod assets;
pub mod callcycle;
pub mod callreturn;
pub mod characters;
pub mod emptylabels;
pub mod flow;
pub mod labels;
pub mod logic;
pub mod menus;
pub mod texttags;
pub mod variables;

use crate::elements::{Finding, Severity};
use crate::model::{ProjectError, ProjectModel};
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

pub type CheckFn = fn(&ProjectModel) -> Vec<Finding>;

/// Registry of named checks, in presentation order. Selection happens by
/// name; dispatch stays data-driven rather than through any inheritance.
pub fn registry() -> &'static [(&'static str, CheckFn)] {
    &[
        ("Labels", labels::check),
        ("Logic", logic::check),
        ("Variables", variables::check),
        ("Menus", menus::check),
        ("Assets", assets::check),
        ("Characters", characters::check),
        ("Flow", flow::check),
        ("Call Cycles", callcycle::check),
        ("Call Safety", callreturn::check),
        ("Empty Labels", emptylabels::check),
        ("Text Tags", texttags::check),
    ]
}

pub fn check_names() -> Vec<&'static str> {
    registry().iter().map(|(name, _)| *name).collect()
}

/// Resolve a selection to registered checks. Empty selects everything;
/// an unknown name is a configuration error.
pub fn resolve_checks(selected: &[String]) -> Result<Vec<(&'static str, CheckFn)>, ProjectError> {
    if selected.is_empty() {
        return Ok(registry().to_vec());
    }
    let mut resolved = Vec::new();
    for name in selected {
        match registry().iter().find(|(n, _)| *n == name.as_str()) {
            Some(entry) => resolved.push(*entry),
            None => return Err(ProjectError::UnknownCheck(name.clone())),
        }
    }
    Ok(resolved)
}

/// Run the selected checks against the model and concatenate their
/// findings in registry order. Checks execute in parallel; the model is
/// immutable so no locking is involved. A panicking check is isolated and
/// reported as its own finding instead of poisoning the run.
pub fn run_checks(model: &ProjectModel, selected: &[String]) -> Result<Vec<Finding>, ProjectError> {
    run_checks_with(model, selected, None, None)
}

/// Like [`run_checks`], with a cancellation flag consulted before each
/// check starts and a callback invoked as each check begins.
pub fn run_checks_with(
    model: &ProjectModel,
    selected: &[String],
    cancel: Option<&AtomicBool>,
    on_check: Option<&(dyn Fn(&str) + Sync)>,
) -> Result<Vec<Finding>, ProjectError> {
    let checks = resolve_checks(selected)?;

    let per_check: Vec<Vec<Finding>> = checks
        .par_iter()
        .map(|(name, check)| {
            if cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false) {
                return Vec::new();
            }
            if let Some(callback) = on_check {
                callback(name);
            }
            run_isolated(name, *check, model)
        })
        .collect();

    Ok(per_check.into_iter().flatten().collect())
}

fn run_isolated(name: &str, check: CheckFn, model: &ProjectModel) -> Vec<Finding> {
    debug!(check = name, "running check");
    match catch_unwind(AssertUnwindSafe(|| check(model))) {
        Ok(findings) => {
            debug!(check = name, findings = findings.len(), "check finished");
            findings
        }
        Err(panic) => {
            let detail = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            error!(check = name, detail = %detail, "check module failed");
            vec![Finding {
                category: "Engine".to_string(),
                severity: Severity::Style,
                file: String::new(),
                line: 0,
                message: format!("Check module failed: {}", name),
                explanation: format!(
                    "The '{}' check aborted with an internal error ({}). \
                     Other checks were not affected; its findings are missing \
                     from this report.",
                    name, detail
                ),
                suggestion: "Re-run with verbose logging and report this as a bug.".to_string(),
            }]
        }
    }
}

/// Build a model from inline script sources in a throwaway project tree.
/// `assets` are extra files (relative to the scan root) created empty.
#[cfg(test)]
pub(crate) fn test_model_with_assets(
    files: &[(&str, &str)],
    assets: &[&str],
) -> crate::model::ProjectModel {
    use crate::config::Config;
    use crate::parser::StructuralParser;
    use std::fs;

    let tmp = tempfile::tempdir().unwrap();
    let game = tmp.path().join("game");
    fs::create_dir_all(&game).unwrap();
    for (name, content) in files {
        let path = game.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    for asset in assets {
        let path = game.join(asset);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }
    let parser = StructuralParser::new().unwrap();
    crate::model::build_project_model(tmp.path(), &parser, &Config::default(), None).unwrap()
}

#[cfg(test)]
pub(crate) fn test_model(files: &[(&str, &str)]) -> crate::model::ProjectModel {
    test_model_with_assets(files, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_check_name_is_a_config_error() {
        let selected = vec!["Nonexistent".to_string()];
        let err = resolve_checks(&selected).unwrap_err();
        assert!(matches!(err, ProjectError::UnknownCheck(name) if name == "Nonexistent"));
    }

    #[test]
    fn empty_selection_resolves_to_all() {
        let resolved = resolve_checks(&[]).unwrap();
        assert_eq!(resolved.len(), registry().len());
    }
}
