//! End-to-end runs over small on-disk projects.

use renlint::{build_project_model, checks, run_analysis, Config, Severity, StructuralParser};
use std::fs;
use std::path::Path;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn project_with(files: &[(&str, &str)]) -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    for (name, content) in files {
        write(&tmp.path().join("game").join(name), content);
    }
    tmp
}

#[test]
fn full_run_over_a_broken_project() {
    let tmp = project_with(&[
        (
            "script.rpy",
            concat!(
                "define e = Character(\"Eileen\")\n",
                "define max_hearts = 3\n",
                "default hearts = 0\n",
                "\n",
                "label start:\n",
                "    e \"Welcome back.\"\n",
                "    $ max_hearts = 5\n",
                "    if hearts or max_hearts == 3:\n",
                "        jump bonus_scene\n",
                "    menu:\n",
                "        \"Go on\":\n",
                "            jump chapter2\n",
                "        \"Stop\":\n",
                "            return\n",
                "label chapter2:\n",
                "    unknown_speaker \"Who am I?\"\n",
                "    return\n",
            ),
        ),
        ("assets.rpy", "label show_park:\n    scene bg Park\n    return\n"),
    ]);
    write(&tmp.path().join("game/images/bg/park.png"), "");

    let config = Config::default();
    let parser = StructuralParser::new().unwrap();
    let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();

    // Missing jump target.
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Critical && f.message.contains("bonus_scene")));
    // Constant mutated after its define.
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Critical && f.message.contains("max_hearts")));
    // Precedence bug in the if condition.
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Critical && f.message.contains("precedence")));
    // Speaker without a definition.
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::High && f.message.contains("unknown_speaker")));
    // Image present only under different casing.
    assert!(findings
        .iter()
        .any(|f| f.severity == Severity::Medium && f.message.contains("bg Park")));

    // Sorted by severity first; no finding precedes a more severe one.
    let severities: Vec<Severity> = findings.iter().map(|f| f.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
}

#[test]
fn clean_project_yields_nothing() {
    let tmp = project_with(&[(
        "script.rpy",
        concat!(
            "define e = Character(\"Eileen\")\n",
            "default hearts = 0\n",
            "\n",
            "label start:\n",
            "    e \"All good.\"\n",
            "    if hearts > 1:\n",
            "        jump finale\n",
            "    jump finale\n",
            "label finale:\n",
            "    e \"Done.\"\n",
            "    return\n",
        ),
    )]);

    let config = Config::default();
    let parser = StructuralParser::new().unwrap();
    let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
    assert_eq!(findings, vec![]);
}

#[test]
fn check_selection_limits_scope() {
    let tmp = project_with(&[(
        "script.rpy",
        concat!(
            "label start:\n",
            "    jump gone\n",
            "    mystery \"Undefined speaker too.\"\n",
        ),
    )]);

    let mut config = Config::default();
    config.checks.enabled = vec!["Labels".to_string()];
    let parser = StructuralParser::new().unwrap();
    let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();

    assert!(findings.iter().all(|f| f.category == "Labels"));
    assert!(findings.iter().any(|f| f.message.contains("gone")));
}

#[test]
fn identical_findings_group_across_files() {
    let tmp = project_with(&[
        ("one.rpy", "label a:\n    jump shared_missing\n"),
        ("two.rpy", "label b:\n    jump shared_missing\n"),
    ]);

    let mut config = Config::default();
    config.checks.enabled = vec!["Labels".to_string()];
    let parser = StructuralParser::new().unwrap();

    let grouped = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
    assert_eq!(grouped.len(), 1);
    assert!(grouped[0].explanation.contains("Also at"));

    config.report.group_duplicates = false;
    let ungrouped = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
    assert_eq!(ungrouped.len(), 2);
}

#[test]
fn run_checks_api_rejects_unknown_names() {
    let tmp = project_with(&[("script.rpy", "label start:\n    return\n")]);
    let parser = StructuralParser::new().unwrap();
    let model =
        build_project_model(tmp.path(), &parser, &Config::default(), None).unwrap();

    let err = checks::run_checks(&model, &["NoSuchCheck".to_string()]).unwrap_err();
    assert!(err.to_string().contains("NoSuchCheck"));

    let ok = checks::run_checks(&model, &["Flow".to_string()]).unwrap();
    assert!(ok.is_empty());
}

#[test]
fn parse_warnings_surface_as_low_findings() {
    let tmp = project_with(&[(
        "script.rpy",
        "label start:\n    \"one\"\n       \"oddly indented\"\n",
    )]);

    let config = Config::default();
    let parser = StructuralParser::new().unwrap();
    let findings = run_analysis(tmp.path(), &config, &parser, None, None).unwrap();
    assert!(findings
        .iter()
        .any(|f| f.category == "Parse" && f.severity == Severity::Low));
}
