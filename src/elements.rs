use serde::{Deserialize, Serialize};
use std::fmt;

/// Finding severity, ordered most severe first so sorting ascending puts
/// CRITICAL at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Style,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Style => "STYLE",
        };
        f.write_str(s)
    }
}

/// One reported defect. The sole data handed to presentation layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub category: String,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub message: String,
    pub explanation: String,
    pub suggestion: String,
}

/// Non-fatal parser diagnostic, surfaced downstream as a LOW "Parse" finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub file: String,
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VarKind {
    Default,
    Define,
    Persistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignKind {
    Simple,
    Augmented,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioChannel {
    Music,
    Sound,
    Voice,
    Audio,
}

impl AudioChannel {
    pub fn from_keyword(kw: &str) -> Option<Self> {
        match kw {
            "music" => Some(AudioChannel::Music),
            "sound" => Some(AudioChannel::Sound),
            "voice" => Some(AudioChannel::Voice),
            "audio" => Some(AudioChannel::Audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioAction {
    Play,
    Queue,
    Stop,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jump {
    pub target: String,
    pub is_dynamic: bool,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub target: String,
    pub is_dynamic: bool,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDecl {
    pub name: String,
    pub kind: VarKind,
    pub value: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub kind: AssignKind,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuChoice {
    pub text: String,
    pub condition: Option<String>,
    pub line: usize,
    pub depth: usize,
    pub body: Vec<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuBlock {
    pub choices: Vec<MenuChoice>,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneOrShow {
    pub image_name: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioRef {
    pub channel: AudioChannel,
    pub action: AudioAction,
    pub path: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDecl {
    pub name: String,
    pub value: Option<String>,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterDecl {
    pub identifier: String,
    pub display_name: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    /// None for narrator lines (quoted text with no speaker identifier).
    pub speaker: Option<String>,
    pub text: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalBranch {
    pub condition: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
    pub body: Vec<Element>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Return {
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

/// A top-level block header (init, screen, style, ...) that resets
/// reachability without being a label.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barrier {
    pub keyword: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

/// A line the classifier could not match. Kept so line coverage survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unstructured {
    pub text: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

/// One parsed statement. Every variant carries its exact file/line origin
/// and the indentation depth it was found at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Element {
    Label(Label),
    Jump(Jump),
    Call(Call),
    VariableDecl(VariableDecl),
    Assignment(Assignment),
    Menu(MenuBlock),
    SceneOrShow(SceneOrShow),
    AudioRef(AudioRef),
    ImageDecl(ImageDecl),
    CharacterDecl(CharacterDecl),
    Dialogue(DialogueLine),
    Conditional(ConditionalBranch),
    Return(Return),
    Barrier(Barrier),
    Unstructured(Unstructured),
}

impl Element {
    pub fn file(&self) -> &str {
        match self {
            Element::Label(e) => &e.file,
            Element::Jump(e) => &e.file,
            Element::Call(e) => &e.file,
            Element::VariableDecl(e) => &e.file,
            Element::Assignment(e) => &e.file,
            Element::Menu(e) => &e.file,
            Element::SceneOrShow(e) => &e.file,
            Element::AudioRef(e) => &e.file,
            Element::ImageDecl(e) => &e.file,
            Element::CharacterDecl(e) => &e.file,
            Element::Dialogue(e) => &e.file,
            Element::Conditional(e) => &e.file,
            Element::Return(e) => &e.file,
            Element::Barrier(e) => &e.file,
            Element::Unstructured(e) => &e.file,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Element::Label(e) => e.line,
            Element::Jump(e) => e.line,
            Element::Call(e) => e.line,
            Element::VariableDecl(e) => e.line,
            Element::Assignment(e) => e.line,
            Element::Menu(e) => e.line,
            Element::SceneOrShow(e) => e.line,
            Element::AudioRef(e) => e.line,
            Element::ImageDecl(e) => e.line,
            Element::CharacterDecl(e) => e.line,
            Element::Dialogue(e) => e.line,
            Element::Conditional(e) => e.line,
            Element::Return(e) => e.line,
            Element::Barrier(e) => e.line,
            Element::Unstructured(e) => e.line,
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Element::Label(e) => e.depth,
            Element::Jump(e) => e.depth,
            Element::Call(e) => e.depth,
            Element::VariableDecl(e) => e.depth,
            Element::Assignment(e) => e.depth,
            Element::Menu(e) => e.depth,
            Element::SceneOrShow(e) => e.depth,
            Element::AudioRef(e) => e.depth,
            Element::ImageDecl(e) => e.depth,
            Element::CharacterDecl(e) => e.depth,
            Element::Dialogue(e) => e.depth,
            Element::Conditional(e) => e.depth,
            Element::Return(e) => e.depth,
            Element::Barrier(e) => e.depth,
            Element::Unstructured(e) => e.depth,
        }
    }

    /// Rebind the file attribution, recursing into nested bodies. The parser
    /// stamps whatever path it was handed; the model builder rewrites it to
    /// the project-relative path before merging.
    pub fn set_file(&mut self, file: &str) {
        match self {
            Element::Label(e) => e.file = file.to_string(),
            Element::Jump(e) => e.file = file.to_string(),
            Element::Call(e) => e.file = file.to_string(),
            Element::VariableDecl(e) => e.file = file.to_string(),
            Element::Assignment(e) => e.file = file.to_string(),
            Element::Menu(e) => {
                e.file = file.to_string();
                for choice in &mut e.choices {
                    for child in &mut choice.body {
                        child.set_file(file);
                    }
                }
            }
            Element::SceneOrShow(e) => e.file = file.to_string(),
            Element::AudioRef(e) => e.file = file.to_string(),
            Element::ImageDecl(e) => e.file = file.to_string(),
            Element::CharacterDecl(e) => e.file = file.to_string(),
            Element::Dialogue(e) => e.file = file.to_string(),
            Element::Conditional(e) => {
                e.file = file.to_string();
                for child in &mut e.body {
                    child.set_file(file);
                }
            }
            Element::Return(e) => e.file = file.to_string(),
            Element::Barrier(e) => e.file = file.to_string(),
            Element::Unstructured(e) => e.file = file.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_most_severe_first() {
        let mut sevs = vec![Severity::Low, Severity::Critical, Severity::Style, Severity::High];
        sevs.sort();
        assert_eq!(
            sevs,
            vec![Severity::Critical, Severity::High, Severity::Low, Severity::Style]
        );
    }

    #[test]
    fn set_file_reaches_nested_bodies() {
        let mut menu = Element::Menu(MenuBlock {
            choices: vec![MenuChoice {
                text: "A".to_string(),
                condition: None,
                line: 2,
                depth: 1,
                body: vec![Element::Return(Return { file: String::new(), line: 3, depth: 2 })],
            }],
            file: String::new(),
            line: 1,
            depth: 0,
        });
        menu.set_file("script.rpy");
        if let Element::Menu(m) = &menu {
            assert_eq!(m.file, "script.rpy");
            assert_eq!(m.choices[0].body[0].file(), "script.rpy");
        } else {
            unreachable!();
        }
    }
}
