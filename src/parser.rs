use crate::elements::{
    AssignKind, Assignment, AudioAction, AudioChannel, AudioRef, Barrier, Call, CharacterDecl,
    ConditionalBranch, DialogueLine, Element, ImageDecl, Jump, Label, MenuBlock, MenuChoice,
    ParseWarning, Return, SceneOrShow, Unstructured, VarKind, VariableDecl,
};
use anyhow::Result;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Engine keywords that can never be dialogue speakers.
pub fn engine_keywords() -> &'static HashSet<&'static str> {
    static KEYWORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    KEYWORDS.get_or_init(|| {
        [
            "jump", "call", "return", "scene", "show", "hide", "with", "play", "stop", "queue",
            "voice", "define", "default", "init", "python", "label", "menu", "if", "elif", "else",
            "while", "for", "pass", "image", "transform", "screen", "style", "translate", "pause",
            "nvl", "window", "camera", "at", "extend", "narrator", "add", "text", "textbutton",
            "key", "use", "layout", "id", "variant", "color", "font", "background",
        ]
        .into_iter()
        .collect()
    })
}

/// Sentinel images the engine always provides; scene/show of these never
/// corresponds to an asset on disk.
pub const BUILTIN_IMAGES: &[&str] = &["black", "white", "text", "vtext"];

/// Clauses that terminate a multi-word image name in scene/show statements.
const IMAGE_STOP_WORDS: &[&str] = &["with", "at", "behind", "onlayer", "zorder", "as", "transform"];

/// Alternate parser backends (e.g. a foreign-interpreter bridge) implement
/// this; the model builder depends only on the element contract, never on
/// how a backend obtained it.
pub trait ParserBackend: Send + Sync {
    fn parse(&self, file: &str, text: &str) -> (Vec<Element>, Vec<ParseWarning>);
}

struct StatementPatterns {
    label: Regex,
    menu: Regex,
    choice: Regex,
    jump: Regex,
    call: Regex,
    screen_stmt: Regex,
    character: Regex,
    image_assign: Regex,
    image_block: Regex,
    default_decl: Regex,
    define_decl: Regex,
    augment: Regex,
    python_call: Regex,
    assign: Regex,
    scene_show: Regex,
    play: Regex,
    queue: Regex,
    stop: Regex,
    voice: Regex,
    condition: Regex,
    else_header: Regex,
    return_stmt: Regex,
    barrier: Regex,
    dialogue: Regex,
    narrator: Regex,
    static_target: Regex,
}

/// Indentation-aware structural parser. Classifies each line against a
/// statement table in priority order (first match wins) and folds menu and
/// conditional blocks into nested bodies by indent depth. Unknown syntax
/// never aborts a parse; unmatched lines degrade to `Unstructured`.
pub struct StructuralParser {
    patterns: StatementPatterns,
}

enum Parsed {
    Leaf(Element),
    MenuHeader,
    ChoiceHeader { text: String, condition: Option<String> },
    CondHeader { condition: String },
    ElseHeader,
    Skip,
}

struct ClassifiedLine {
    line: usize,
    depth: usize,
    parsed: Parsed,
}

impl StructuralParser {
    pub fn new() -> Result<Self> {
        let patterns = StatementPatterns {
            label: Regex::new(r"^label\s+(\w+)\s*(?:\([^)]*\))?\s*:")?,
            menu: Regex::new(r"^menu(?:\s+\w+)?\s*:")?,
            choice: Regex::new(r#"^"((?:[^"\\]|\\.)*)"(?:\s+if\s+(.+?))?\s*:$"#)?,
            jump: Regex::new(r"^jump\s+(.+)$")?,
            call: Regex::new(r"^call\s+(.+)$")?,
            screen_stmt: Regex::new(r"^(?:show|call|hide)\s+screen\b")?,
            character: Regex::new(r#"^(?:define|default)\s+(\w+)\s*=\s*Character\(\s*"([^"]*)""#)?,
            image_assign: Regex::new(r"^image\s+([\w\s]+?)\s*=\s*(.+)$")?,
            image_block: Regex::new(r"^image\s+([\w\s]+?)\s*:$")?,
            default_decl: Regex::new(r"^default\s+([\w.]+)\s*=\s*(.+)$")?,
            define_decl: Regex::new(r"^define\s+([\w.]+)\s*=\s*(.+)$")?,
            augment: Regex::new(r"^\$\s*([\w.]+)\s*(?:[+\-*/%]|//|\*\*)=\s*(.+)$")?,
            python_call: Regex::new(r"^\$\s*[\w.]+\s*\(")?,
            assign: Regex::new(r"^\$\s*([\w.]+)\s*=\s*(.+)$")?,
            scene_show: Regex::new(r"^(scene|show)(?:\s+(.+))?$")?,
            play: Regex::new(r#"^play\s+(music|sound|voice|audio)\s+"([^"]+)""#)?,
            queue: Regex::new(r#"^queue\s+(music|sound|voice|audio)\s+"([^"]+)""#)?,
            stop: Regex::new(r"^stop\s+(music|sound|voice|audio)\b")?,
            voice: Regex::new(r#"^voice\s+"([^"]+)""#)?,
            condition: Regex::new(r"^(?:if|elif)\s+(.+?)\s*:$")?,
            else_header: Regex::new(r"^else\s*:$")?,
            return_stmt: Regex::new(r"^return\b")?,
            barrier: Regex::new(r"^(init|screen|transform|style|python|translate)\b")?,
            dialogue: Regex::new(r#"^(\w+)(?:\s+\w+)*\s+"((?:[^"\\]|\\.)*)""#)?,
            narrator: Regex::new(r#"^"((?:[^"\\]|\\.)*)""#)?,
            static_target: Regex::new(r"^(\w+)(?:\([^)]*\))?$")?,
        };
        Ok(Self { patterns })
    }

    /// Parse one file's text into an ordered element sequence plus warnings.
    pub fn parse_text(&self, file: &str, text: &str) -> (Vec<Element>, Vec<ParseWarning>) {
        let mut warnings = Vec::new();
        let classified = self.classify_lines(file, text, &mut warnings);
        let mut pos = 0;
        let elements = build_sequence(&classified, &mut pos, 0, file);
        (elements, warnings)
    }

    fn classify_lines(
        &self,
        file: &str,
        text: &str,
        warnings: &mut Vec<ParseWarning>,
    ) -> Vec<ClassifiedLine> {
        let mut out = Vec::new();
        let mut indent_unit: Option<IndentUnit> = None;

        for (idx, raw_line) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = strip_inline_comment(raw_line).trim_end();
            let stripped = line.trim_start();
            if stripped.is_empty() {
                continue;
            }

            let indent = &line[..line.len() - stripped.len()];
            let depth = measure_depth(indent, &mut indent_unit, file, lineno, warnings);

            let parsed = self.classify(file, lineno, depth, stripped);
            if matches!(parsed, Parsed::Skip) {
                continue;
            }
            out.push(ClassifiedLine { line: lineno, depth, parsed });
        }

        out
    }

    fn classify(&self, file: &str, line: usize, depth: usize, stripped: &str) -> Parsed {
        let p = &self.patterns;
        let file_s = file.to_string();

        if let Some(c) = p.label.captures(stripped) {
            return Parsed::Leaf(Element::Label(Label {
                name: c[1].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if p.menu.is_match(stripped) {
            return Parsed::MenuHeader;
        }
        if let Some(c) = p.choice.captures(stripped) {
            return Parsed::ChoiceHeader {
                text: c[1].to_string(),
                condition: c.get(2).map(|m| m.as_str().to_string()),
            };
        }
        // `show screen` / `call screen` would otherwise shadow image shows
        // and label calls.
        if p.screen_stmt.is_match(stripped) {
            return Parsed::Leaf(Element::Unstructured(Unstructured {
                text: stripped.to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.jump.captures(stripped) {
            let (target, is_dynamic) = self.resolve_target(&c[1]);
            return Parsed::Leaf(Element::Jump(Jump {
                target,
                is_dynamic,
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.call.captures(stripped) {
            let (target, is_dynamic) = self.resolve_target(&c[1]);
            return Parsed::Leaf(Element::Call(Call {
                target,
                is_dynamic,
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.character.captures(stripped) {
            return Parsed::Leaf(Element::CharacterDecl(CharacterDecl {
                identifier: c[1].to_string(),
                display_name: c[2].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.image_assign.captures(stripped) {
            return Parsed::Leaf(Element::ImageDecl(ImageDecl {
                name: c[1].trim().to_string(),
                value: Some(c[2].trim().to_string()),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.image_block.captures(stripped) {
            return Parsed::Leaf(Element::ImageDecl(ImageDecl {
                name: c[1].trim().to_string(),
                value: None,
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.default_decl.captures(stripped) {
            return Parsed::Leaf(Element::VariableDecl(VariableDecl {
                kind: decl_kind(&c[1], VarKind::Default),
                name: c[1].to_string(),
                value: c[2].trim().to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.define_decl.captures(stripped) {
            return Parsed::Leaf(Element::VariableDecl(VariableDecl {
                kind: decl_kind(&c[1], VarKind::Define),
                name: c[1].to_string(),
                value: c[2].trim().to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.augment.captures(stripped) {
            return Parsed::Leaf(Element::Assignment(Assignment {
                name: c[1].to_string(),
                kind: AssignKind::Augmented,
                file: file_s,
                line,
                depth,
            }));
        }
        // `$ store.method(...)` is a statement call, not an assignment.
        if p.python_call.is_match(stripped) {
            return Parsed::Leaf(Element::Unstructured(Unstructured {
                text: stripped.to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.assign.captures(stripped) {
            return Parsed::Leaf(Element::Assignment(Assignment {
                name: c[1].to_string(),
                kind: AssignKind::Simple,
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.scene_show.captures(stripped) {
            match c.get(2).and_then(|m| image_name(m.as_str())) {
                Some(name) => {
                    let tag = name.split_whitespace().next().unwrap_or(&name);
                    if BUILTIN_IMAGES.contains(&tag) {
                        return Parsed::Skip;
                    }
                    return Parsed::Leaf(Element::SceneOrShow(SceneOrShow {
                        image_name: name,
                        file: file_s,
                        line,
                        depth,
                    }));
                }
                // Bare `scene` clears the stage; nothing to resolve.
                None => return Parsed::Skip,
            }
        }
        if let Some(c) = p.play.captures(stripped) {
            return Parsed::Leaf(Element::AudioRef(AudioRef {
                channel: AudioChannel::from_keyword(&c[1]).unwrap_or(AudioChannel::Audio),
                action: AudioAction::Play,
                path: c[2].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.queue.captures(stripped) {
            return Parsed::Leaf(Element::AudioRef(AudioRef {
                channel: AudioChannel::from_keyword(&c[1]).unwrap_or(AudioChannel::Audio),
                action: AudioAction::Queue,
                path: c[2].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.stop.captures(stripped) {
            return Parsed::Leaf(Element::AudioRef(AudioRef {
                channel: AudioChannel::from_keyword(&c[1]).unwrap_or(AudioChannel::Audio),
                action: AudioAction::Stop,
                path: String::new(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.voice.captures(stripped) {
            return Parsed::Leaf(Element::AudioRef(AudioRef {
                channel: AudioChannel::Voice,
                action: AudioAction::Play,
                path: c[1].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.condition.captures(stripped) {
            return Parsed::CondHeader { condition: c[1].to_string() };
        }
        if p.else_header.is_match(stripped) {
            return Parsed::ElseHeader;
        }
        if p.return_stmt.is_match(stripped) {
            return Parsed::Leaf(Element::Return(Return { file: file_s, line, depth }));
        }
        if let Some(c) = p.barrier.captures(stripped) {
            return Parsed::Leaf(Element::Barrier(Barrier {
                keyword: c[1].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }
        if let Some(c) = p.dialogue.captures(stripped) {
            let speaker = c[1].to_string();
            if !engine_keywords().contains(speaker.as_str()) {
                return Parsed::Leaf(Element::Dialogue(DialogueLine {
                    speaker: Some(speaker),
                    text: c[2].to_string(),
                    file: file_s,
                    line,
                    depth,
                }));
            }
        }
        if let Some(c) = p.narrator.captures(stripped) {
            return Parsed::Leaf(Element::Dialogue(DialogueLine {
                speaker: None,
                text: c[1].to_string(),
                file: file_s,
                line,
                depth,
            }));
        }

        Parsed::Leaf(Element::Unstructured(Unstructured {
            text: stripped.to_string(),
            file: file_s,
            line,
            depth,
        }))
    }

    /// Split a jump/call operand into (target, is_dynamic). A bare label
    /// name, optionally with an argument list and a `from` return-site
    /// clause, is static; `expression ...` and anything with operators or
    /// attribute access cannot be resolved statically.
    fn resolve_target(&self, operand: &str) -> (String, bool) {
        let operand = operand.trim();
        if let Some(expr) = operand.strip_prefix("expression ") {
            return (expr.trim().to_string(), true);
        }
        let head = match operand.find(" from ") {
            Some(pos) => operand[..pos].trim(),
            None => operand,
        };
        if let Some(c) = self.patterns.static_target.captures(head) {
            return (c[1].to_string(), false);
        }
        (head.to_string(), true)
    }
}

impl ParserBackend for StructuralParser {
    fn parse(&self, file: &str, text: &str) -> (Vec<Element>, Vec<ParseWarning>) {
        self.parse_text(file, text)
    }
}

/// Collect the leading run of identifier words, stopping at display clauses
/// (`with`, `at`, ...). Returns None when no image word is present.
fn image_name(rest: &str) -> Option<String> {
    let mut words = Vec::new();
    for word in rest.split_whitespace() {
        if IMAGE_STOP_WORDS.contains(&word) {
            break;
        }
        if !word.chars().all(|c| c.is_alphanumeric() || c == '_') {
            break;
        }
        words.push(word);
    }
    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

#[derive(Clone, Copy, PartialEq)]
enum IndentUnit {
    Spaces(usize),
    Tabs,
}

/// Indent depth without assuming a fixed width: the first non-zero indent
/// in a file defines the unit, and consistent multiples of it are depth.
fn measure_depth(
    indent: &str,
    unit: &mut Option<IndentUnit>,
    file: &str,
    line: usize,
    warnings: &mut Vec<ParseWarning>,
) -> usize {
    if indent.is_empty() {
        return 0;
    }
    let tabs = indent.chars().filter(|c| *c == '\t').count();
    if unit.is_none() {
        *unit = Some(if tabs > 0 { IndentUnit::Tabs } else { IndentUnit::Spaces(indent.len()) });
    }
    match unit.unwrap() {
        IndentUnit::Tabs => {
            if tabs == 0 {
                warnings.push(ParseWarning {
                    file: file.to_string(),
                    line,
                    message: "space indentation in a tab-indented file".to_string(),
                });
                return 1;
            }
            tabs
        }
        IndentUnit::Spaces(width) => {
            if tabs > 0 {
                warnings.push(ParseWarning {
                    file: file.to_string(),
                    line,
                    message: "tab indentation in a space-indented file".to_string(),
                });
                return tabs;
            }
            let width = width.max(1);
            if indent.len() % width != 0 {
                warnings.push(ParseWarning {
                    file: file.to_string(),
                    line,
                    message: format!(
                        "indent of {} is not a multiple of the detected unit ({})",
                        indent.len(),
                        width
                    ),
                });
            }
            (indent.len() / width).max(1)
        }
    }
}

fn decl_kind(name: &str, base: VarKind) -> VarKind {
    if name.starts_with("persistent.") {
        VarKind::Persistent
    } else {
        base
    }
}

/// Cut an inline comment, respecting string literals.
fn strip_inline_comment(line: &str) -> &str {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) => {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == '#' {
                    return &line[..i];
                }
            }
        }
    }
    line
}

/// Consume lines at `min_depth` or deeper into an element sequence,
/// recursing for menu and conditional bodies.
fn build_sequence(
    lines: &[ClassifiedLine],
    pos: &mut usize,
    min_depth: usize,
    file: &str,
) -> Vec<Element> {
    let mut out = Vec::new();
    while *pos < lines.len() {
        let current = &lines[*pos];
        if current.depth < min_depth {
            break;
        }
        match &current.parsed {
            Parsed::Leaf(el) => {
                out.push(el.clone());
                *pos += 1;
            }
            Parsed::MenuHeader => {
                let header_depth = current.depth;
                let header_line = current.line;
                *pos += 1;
                let menu = build_menu(lines, pos, header_depth, header_line, file, &mut out);
                out.push(Element::Menu(menu));
            }
            Parsed::CondHeader { condition } => {
                let header_depth = current.depth;
                let header_line = current.line;
                let condition = condition.clone();
                *pos += 1;
                let body = build_sequence(lines, pos, header_depth + 1, file);
                out.push(Element::Conditional(ConditionalBranch {
                    condition,
                    file: file.to_string(),
                    line: header_line,
                    depth: header_depth,
                    body,
                }));
            }
            Parsed::ElseHeader => {
                let header_depth = current.depth;
                let header_line = current.line;
                *pos += 1;
                let body = build_sequence(lines, pos, header_depth + 1, file);
                out.push(Element::Conditional(ConditionalBranch {
                    condition: String::new(),
                    file: file.to_string(),
                    line: header_line,
                    depth: header_depth,
                    body,
                }));
            }
            Parsed::ChoiceHeader { text, .. } => {
                // A choice header outside any menu block; keep the line.
                out.push(Element::Unstructured(Unstructured {
                    text: text.clone(),
                    file: file.to_string(),
                    line: current.line,
                    depth: current.depth,
                }));
                *pos += 1;
            }
            Parsed::Skip => {
                *pos += 1;
            }
        }
    }
    out
}

fn build_menu(
    lines: &[ClassifiedLine],
    pos: &mut usize,
    menu_depth: usize,
    menu_line: usize,
    file: &str,
    siblings: &mut Vec<Element>,
) -> MenuBlock {
    let mut choices = Vec::new();
    while *pos < lines.len() {
        let current = &lines[*pos];
        if current.depth <= menu_depth {
            break;
        }
        match &current.parsed {
            Parsed::ChoiceHeader { text, condition } => {
                let choice_depth = current.depth;
                let choice_line = current.line;
                let text = text.clone();
                let condition = condition.clone();
                *pos += 1;
                let body = build_sequence(lines, pos, choice_depth + 1, file);
                choices.push(MenuChoice {
                    text,
                    condition,
                    line: choice_line,
                    depth: choice_depth,
                    body,
                });
            }
            Parsed::Leaf(el) => {
                // Menu captions and set-statements sit under the header
                // without being choices; keep them in the surrounding body.
                siblings.push(el.clone());
                *pos += 1;
            }
            _ => {
                *pos += 1;
            }
        }
    }
    MenuBlock {
        choices,
        file: file.to_string(),
        line: menu_line,
        depth: menu_depth,
    }
}
