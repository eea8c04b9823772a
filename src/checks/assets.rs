//! Image and audio references reconciled against the files actually on
//! disk, including the cross-platform casing trap: a path that resolves on
//! a case-insensitive filesystem and breaks everywhere else.

use crate::elements::{AudioAction, Finding, Severity};
use crate::file_discovery::AssetLookup;
use crate::model::ProjectModel;
use crate::parser::BUILTIN_IMAGES;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

const CATEGORY: &str = "Assets";

fn movie_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Movie\(\s*play\s*=\s*"([^"]+)""#).unwrap())
}

pub fn check(model: &ProjectModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    // Images declared in script code are satisfied regardless of files.
    let mut declared: HashSet<&str> = BUILTIN_IMAGES.iter().copied().collect();
    for decl in &model.image_decls {
        declared.insert(decl.name.as_str());
        if let Some(tag) = decl.name.split_whitespace().next() {
            declared.insert(tag);
        }
    }

    for scene in &model.scene_refs {
        let tag = scene
            .image_name
            .split_whitespace()
            .next()
            .unwrap_or(&scene.image_name);
        if declared.contains(scene.image_name.as_str()) || declared.contains(tag) {
            continue;
        }
        match model.asset_index.lookup_image(&scene.image_name) {
            AssetLookup::Found => {}
            AssetLookup::CaseMismatch(actual) => findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::Medium,
                file: scene.file.clone(),
                line: scene.line,
                message: format!("Image case mismatch: '{}'", scene.image_name),
                explanation: format!(
                    "'{}' only matches the on-disk image '{}' when casing is \
                     ignored. This works on Windows and macOS defaults and \
                     crashes on case-sensitive filesystems.",
                    scene.image_name, actual
                ),
                suggestion: format!("Reference it as '{}'.", actual),
            }),
            AssetLookup::Missing => findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::High,
                file: scene.file.clone(),
                line: scene.line,
                message: format!("Missing image '{}'", scene.image_name),
                explanation: format!(
                    "'{}' has no image statement and no matching file under \
                     images/.",
                    scene.image_name
                ),
                suggestion: "Add the image file or an image definition, or fix the name."
                    .to_string(),
            }),
        }
    }

    for audio in &model.audio_refs {
        if audio.action == AudioAction::Stop || audio.path.is_empty() {
            continue;
        }
        check_path(model, &audio.path, "audio file", &audio.file, audio.line, &mut findings);
    }

    // Movie-backed image definitions reference files by path too.
    for decl in &model.image_decls {
        let Some(value) = &decl.value else { continue };
        if let Some(c) = movie_re().captures(value) {
            check_path(model, &c[1], "movie file", &decl.file, decl.line, &mut findings);
        }
    }

    findings
}

fn check_path(
    model: &ProjectModel,
    path: &str,
    what: &str,
    ref_file: &str,
    ref_line: usize,
    findings: &mut Vec<Finding>,
) {
    match model.asset_index.lookup_path(path) {
        AssetLookup::Found => {}
        AssetLookup::CaseMismatch(actual) => {
            let norm = path.trim_start_matches('/').replace('\\', "/");
            let (message, detail) = match first_differing_dir(&norm, &actual) {
                Some((given, real)) => (
                    "Directory case mismatch".to_string(),
                    format!("path component '{}' is '{}' on disk", given, real),
                ),
                None => (
                    format!("{} case mismatch", capitalize(what)),
                    format!("the file is named '{}' on disk", last_component(&actual)),
                ),
            };
            findings.push(Finding {
                category: CATEGORY.to_string(),
                severity: Severity::Medium,
                file: ref_file.to_string(),
                line: ref_line,
                message,
                explanation: format!(
                    "'{}' resolves only when casing is ignored: {}. This \
                     works on Windows and fails on case-sensitive \
                     filesystems.",
                    path, detail
                ),
                suggestion: format!("Change the reference to '{}'.", actual),
            });
        }
        AssetLookup::Missing => findings.push(Finding {
            category: CATEGORY.to_string(),
            severity: Severity::High,
            file: ref_file.to_string(),
            line: ref_line,
            message: format!("Missing {}", what),
            explanation: format!("'{}' does not exist under the project tree.", path),
            suggestion: "Fix the path or add the missing file.".to_string(),
        }),
    }
}

/// First directory component that differs between the referenced path and
/// the on-disk path. None when only the file name differs.
fn first_differing_dir<'a>(reference: &'a str, actual: &'a str) -> Option<(&'a str, &'a str)> {
    let ref_parts: Vec<&str> = reference.split('/').collect();
    let actual_parts: Vec<&str> = actual.split('/').collect();
    let dirs = ref_parts.len().saturating_sub(1);
    for i in 0..dirs.min(actual_parts.len().saturating_sub(1)) {
        if ref_parts[i] != actual_parts[i] {
            return Some((ref_parts[i], actual_parts[i]));
        }
    }
    None
}

fn last_component(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::test_model_with_assets;

    #[test]
    fn existing_image_file_is_clean() {
        let model = test_model_with_assets(
            &[("script.rpy", "label start:\n    scene bg park\n")],
            &["images/bg/park.png"],
        );
        assert!(check(&model).is_empty());
    }

    #[test]
    fn missing_image_is_high() {
        let model = test_model_with_assets(
            &[("script.rpy", "label start:\n    scene beach sunset\n")],
            &["images/bg/park.png"],
        );
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert!(findings[0].message.contains("beach sunset"));
    }

    #[test]
    fn known_tag_with_new_attributes_is_tolerated() {
        let model = test_model_with_assets(
            &[("script.rpy", "label start:\n    show eileen mad\n")],
            &["images/eileen/happy.png"],
        );
        assert!(check(&model).is_empty());
    }

    #[test]
    fn image_case_mismatch_is_medium() {
        let model = test_model_with_assets(
            &[("script.rpy", "label start:\n    show Animations intro\n")],
            &["images/animations/intro.webp"],
        );
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].explanation.contains("animations intro"));
    }

    #[test]
    fn declared_image_needs_no_file() {
        let model = test_model_with_assets(
            &[(
                "script.rpy",
                "image bg void = Solid(\"#000\")\nlabel start:\n    scene bg void\n",
            )],
            &[],
        );
        assert!(check(&model).is_empty());
    }

    #[test]
    fn audio_directory_case_mismatch_is_medium() {
        let model = test_model_with_assets(
            &[(
                "script.rpy",
                "label start:\n    play music \"Audio/theme.ogg\"\n",
            )],
            &["audio/theme.ogg"],
        );
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("Directory case mismatch"));
        assert!(findings[0].explanation.contains("'Audio'"));
    }

    #[test]
    fn missing_audio_is_high() {
        let model = test_model_with_assets(
            &[(
                "script.rpy",
                "label start:\n    play sound \"audio/door.ogg\"\n",
            )],
            &["audio/theme.ogg"],
        );
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn stop_statements_reference_nothing() {
        let model = test_model_with_assets(
            &[("script.rpy", "label start:\n    stop music\n")],
            &[],
        );
        assert!(check(&model).is_empty());
    }

    #[test]
    fn movie_image_paths_are_checked() {
        let model = test_model_with_assets(
            &[(
                "script.rpy",
                "image intro_movie = Movie(play=\"movies/Intro.webm\")\n",
            )],
            &["movies/intro.webm"],
        );
        let findings = check(&model);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Medium);
        assert!(findings[0].message.contains("case mismatch"));
    }
}
