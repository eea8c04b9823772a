//! Orchestration: model construction, check execution, progress and
//! cancellation plumbing. Shared by the CLI and any embedding caller.

use crate::checks;
use crate::config::Config;
use crate::elements::{Finding, Severity};
use crate::findings::aggregate;
use crate::model::{build_project_model, ProjectError};
use crate::parser::ParserBackend;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::info;

/// Progress sink: message plus completion fraction in 0..=1. The engine
/// has no opinion on how either is rendered.
pub type ProgressSink<'a> = &'a (dyn Fn(&str, f64) + Sync);

/// Analyze a project directory and return aggregated, sorted findings.
///
/// A parent directory holding several sub-games (e.g. `Season 1`,
/// `Season 2`, each with its own `game/` folder) is analyzed per sub-game,
/// with finding paths prefixed by the sub-game name.
///
/// Check selection comes from `config.checks.enabled`; an unknown name
/// fails before any parsing starts. `cancel` stops the run at file and
/// check granularity; whatever was collected so far is returned.
pub fn run_analysis(
    project_path: &Path,
    config: &Config,
    backend: &dyn ParserBackend,
    on_progress: Option<ProgressSink>,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Finding>, ProjectError> {
    // Validate the selection up front; a typo should not cost a full parse.
    checks::resolve_checks(&config.checks.enabled)?;

    let progress = |msg: &str, frac: f64| {
        if let Some(sink) = on_progress {
            sink(msg, frac);
        }
    };

    let sub_games = detect_sub_games(project_path);
    let mut findings = if sub_games.is_empty() {
        run_single(project_path, config, backend, &progress, cancel, "")?
    } else {
        info!(count = sub_games.len(), "analyzing multi-game directory");
        let mut combined = Vec::new();
        let total = sub_games.len() as f64;
        for (i, sub_name) in sub_games.iter().enumerate() {
            if cancelled(cancel) {
                break;
            }
            let base = i as f64 / total;
            let span = 1.0 / total;
            let sub_progress = |msg: &str, frac: f64| {
                progress(&format!("[{}] {}", sub_name, msg), base + frac * span);
            };
            let sub_path = project_path.join(sub_name);
            combined.extend(run_single(
                &sub_path,
                config,
                backend,
                &sub_progress,
                cancel,
                sub_name,
            )?);
        }
        combined
    };

    findings = aggregate(findings, config.report.group_duplicates);
    info!(findings = findings.len(), "analysis complete");
    progress("Analysis complete.", 1.0);
    Ok(findings)
}

fn run_single(
    project_path: &Path,
    config: &Config,
    backend: &dyn ParserBackend,
    progress: &(dyn Fn(&str, f64) + Sync),
    cancel: Option<&AtomicBool>,
    file_prefix: &str,
) -> Result<Vec<Finding>, ProjectError> {
    progress("Parsing project files...", 0.0);
    let model = build_project_model(project_path, backend, config, cancel)?;
    progress(&format!("Parsed {} script files.", model.files.len()), 0.1);

    let total = checks::resolve_checks(&config.checks.enabled)?.len().max(1);
    let started = AtomicUsize::new(0);
    let on_check = |name: &str| {
        let i = started.fetch_add(1, Ordering::Relaxed);
        progress(
            &format!("Running check: {}...", name),
            0.1 + 0.85 * (i as f64 / total as f64),
        );
    };

    let mut findings =
        checks::run_checks_with(&model, &config.checks.enabled, cancel, Some(&on_check))?;

    if config.report.include_parse_warnings {
        for warning in &model.warnings {
            findings.push(Finding {
                category: "Parse".to_string(),
                severity: Severity::Low,
                file: warning.file.clone(),
                line: warning.line,
                message: "Parse warning".to_string(),
                explanation: warning.message.clone(),
                suggestion: String::new(),
            });
        }
    }

    if !file_prefix.is_empty() {
        for finding in &mut findings {
            if !finding.file.is_empty() {
                finding.file = format!("{}/{}", file_prefix, finding.file);
            }
        }
    }

    Ok(findings)
}

/// Sub-game directories inside a parent folder: children that each carry
/// their own `game/` folder. A single game (the root itself has `game/`)
/// yields an empty list, as does anything with fewer than two candidates.
pub fn detect_sub_games(path: &Path) -> Vec<String> {
    if path.join("game").is_dir() {
        return Vec::new();
    }
    let Ok(entries) = std::fs::read_dir(path) else {
        return Vec::new();
    };
    let mut sub_games: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().join("game").is_dir())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    sub_games.sort();
    if sub_games.len() > 1 {
        sub_games
    } else {
        Vec::new()
    }
}

fn cancelled(cancel: Option<&AtomicBool>) -> bool {
    cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::StructuralParser;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn unknown_check_fails_before_parsing() {
        let mut config = Config::default();
        config.checks.enabled = vec!["Bogus".to_string()];
        let parser = StructuralParser::new().unwrap();
        let err = run_analysis(Path::new("/nonexistent"), &config, &parser, None, None)
            .unwrap_err();
        assert!(matches!(err, ProjectError::UnknownCheck(_)));
    }

    #[test]
    fn end_to_end_missing_label_scenario() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("game/script.rpy"),
            "label start:\n    jump missing_label\n",
        );
        let mut config = Config::default();
        config.checks.enabled = vec!["Labels".to_string()];
        let parser = StructuralParser::new().unwrap();
        let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.severity, Severity::Critical);
        assert_eq!(f.file, "script.rpy");
        assert_eq!(f.line, 2);
        assert!(f.message.contains("missing_label"));
    }

    #[test]
    fn runs_are_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("game/script.rpy"),
            concat!(
                "default hearts = 0\n",
                "label start:\n",
                "    jump gone\n",
                "    e \"dead\"\n",
            ),
        );
        let config = Config::default();
        let parser = StructuralParser::new().unwrap();
        let first = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
        let second = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn multi_game_findings_carry_prefixes() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("Season 1/game/script.rpy"),
            "label start:\n    jump gone_one\n",
        );
        write(
            &tmp.path().join("Season 2/game/script.rpy"),
            "label start:\n    jump gone_two\n",
        );
        let mut config = Config::default();
        config.checks.enabled = vec!["Labels".to_string()];
        let parser = StructuralParser::new().unwrap();
        let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().any(|f| f.file == "Season 1/script.rpy"));
        assert!(findings.iter().any(|f| f.file == "Season 2/script.rpy"));
    }

    #[test]
    fn cancelled_run_returns_quietly() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("game/script.rpy"),
            "label start:\n    jump gone\n",
        );
        let config = Config::default();
        let parser = StructuralParser::new().unwrap();
        let cancel = AtomicBool::new(true);
        let findings =
            run_analysis(tmp.path(), &config, &parser, None, Some(&cancel)).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn progress_reaches_completion() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            &tmp.path().join("game/script.rpy"),
            "label start:\n    return\n",
        );
        let config = Config::default();
        let parser = StructuralParser::new().unwrap();
        let seen = std::sync::Mutex::new(Vec::new());
        let sink = |msg: &str, frac: f64| {
            seen.lock().unwrap().push((msg.to_string(), frac));
        };
        run_analysis(tmp.path(), &config, &parser, Some(&sink), None).unwrap();
        let seen = seen.into_inner().unwrap();
        assert!(seen.first().unwrap().0.contains("Parsing"));
        assert_eq!(seen.last().unwrap().1, 1.0);
    }
}
