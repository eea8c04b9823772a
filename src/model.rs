use crate::config::Config;
use crate::elements::{
    AssignKind, AudioRef, Call, CharacterDecl, DialogueLine, Element, ImageDecl, Jump,
    ParseWarning, SceneOrShow, VarKind,
};
use crate::file_discovery::{AssetIndex, FileDiscovery, ScriptFile};
use crate::parser::ParserBackend;
use petgraph::graph::{DiGraph, NodeIndex};
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project root '{0}' is not a directory")]
    InvalidRoot(PathBuf),
    #[error("no script files found under '{0}'")]
    NoScriptFiles(PathBuf),
    #[error("failed to scan '{0}': {1}")]
    Scan(PathBuf, String),
    #[error("unknown check: {0}")]
    UnknownCheck(String),
}

/// One label definition site. `qualified` prefixes enclosing label names
/// (`outer.inner`) for call-graph purposes; resolution always goes through
/// the global `name`, since labels share one namespace regardless of
/// nesting.
#[derive(Debug, Clone)]
pub struct LabelDef {
    pub name: String,
    pub qualified: String,
    pub file: String,
    pub line: usize,
    pub depth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Jump,
    Call,
}

/// Edge payload in the call graph: one jump/call site.
#[derive(Debug, Clone)]
pub struct CallEdge {
    pub kind: CallKind,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarUse {
    Decl(VarKind),
    Assign(AssignKind),
}

/// One declaration or assignment of a variable, original casing preserved.
#[derive(Debug, Clone)]
pub struct VarOccurrence {
    pub name: String,
    pub usage: VarUse,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct MenuSite {
    pub menu: crate::elements::MenuBlock,
    pub parent_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConditionSite {
    pub expression: String,
    pub file: String,
    pub line: usize,
}

/// Flattened summary of one label's body, used by the body-sensitive checks.
#[derive(Debug, Clone, Default)]
pub struct LabelBody {
    pub file: String,
    pub line: usize,
    pub element_count: usize,
    pub has_return: bool,
    pub only_pass: bool,
}

/// Aggregated, cross-referenced data from every parsed script file.
/// Constructed once per analysis run and never mutated afterwards; every
/// check reads the same frozen snapshot, which is what makes running checks
/// concurrently safe.
#[derive(Debug)]
pub struct ProjectModel {
    pub root_dir: PathBuf,
    pub files: Vec<String>,
    /// Per-file element sequences, in file order. Kept separate so flow
    /// analysis never walks across a file boundary.
    pub file_elements: Vec<(String, Vec<Element>)>,
    pub labels: HashMap<String, Vec<LabelDef>>,
    pub label_bodies: HashMap<String, LabelBody>,
    pub call_graph: DiGraph<String, CallEdge>,
    pub call_nodes: HashMap<String, NodeIndex>,
    pub jumps: Vec<Jump>,
    pub calls: Vec<Call>,
    /// Keyed by lowercased name; occurrences keep original casing.
    pub variables: HashMap<String, Vec<VarOccurrence>>,
    /// Lowercased base (trailing digits stripped) -> declared names that
    /// carry a numeric suffix, first-seen order, deduplicated.
    pub families: HashMap<String, Vec<String>>,
    pub menus: Vec<MenuSite>,
    pub characters: HashMap<String, Vec<CharacterDecl>>,
    pub dialogue: Vec<DialogueLine>,
    pub conditions: Vec<ConditionSite>,
    pub scene_refs: Vec<SceneOrShow>,
    pub audio_refs: Vec<AudioRef>,
    pub image_decls: Vec<ImageDecl>,
    pub asset_index: AssetIndex,
    pub warnings: Vec<ParseWarning>,
}

/// Parse every script file under `root` and fold the results into one
/// model. Parsing runs in parallel; the merge into the shared tables is the
/// single serialized step. `cancel` is checked at file granularity: once
/// set, no further reads are issued and remaining files contribute nothing.
pub fn build_project_model(
    root: &Path,
    backend: &dyn ParserBackend,
    config: &Config,
    cancel: Option<&AtomicBool>,
) -> Result<ProjectModel, ProjectError> {
    if !root.is_dir() {
        return Err(ProjectError::InvalidRoot(root.to_path_buf()));
    }
    let scan_root = FileDiscovery::resolve_scan_root(root);
    let discovery = FileDiscovery::new(config.clone());

    let scripts = discovery
        .discover_scripts(&scan_root)
        .map_err(|e| ProjectError::Scan(scan_root.clone(), e.to_string()))?;
    if scripts.is_empty() {
        return Err(ProjectError::NoScriptFiles(scan_root));
    }

    let parsed = parse_files_parallel(&scripts, backend, cancel);

    let mut model = ProjectModel {
        root_dir: scan_root.clone(),
        files: scripts.iter().map(|s| s.rel_path.clone()).collect(),
        file_elements: Vec::new(),
        labels: HashMap::new(),
        label_bodies: HashMap::new(),
        call_graph: DiGraph::new(),
        call_nodes: HashMap::new(),
        jumps: Vec::new(),
        calls: Vec::new(),
        variables: HashMap::new(),
        families: HashMap::new(),
        menus: Vec::new(),
        characters: HashMap::new(),
        dialogue: Vec::new(),
        conditions: Vec::new(),
        scene_refs: Vec::new(),
        audio_refs: Vec::new(),
        image_decls: Vec::new(),
        asset_index: discovery.build_asset_index(&scan_root),
        warnings: Vec::new(),
    };

    for (rel_path, elements, mut warnings) in parsed {
        model.warnings.append(&mut warnings);
        index_file(&mut model, &elements);
        model.file_elements.push((rel_path, elements));
    }
    build_families(&mut model);

    info!(
        files = model.files.len(),
        labels = model.labels.len(),
        warnings = model.warnings.len(),
        "project model built"
    );
    Ok(model)
}

fn parse_files_parallel(
    scripts: &[ScriptFile],
    backend: &dyn ParserBackend,
    cancel: Option<&AtomicBool>,
) -> Vec<(String, Vec<Element>, Vec<ParseWarning>)> {
    scripts
        .par_iter()
        .map(|script| {
            if cancel.map(|c| c.load(Ordering::Relaxed)).unwrap_or(false) {
                return (script.rel_path.clone(), Vec::new(), Vec::new());
            }
            match fs::read(&script.path) {
                Ok(bytes) => {
                    let text = String::from_utf8_lossy(&bytes);
                    let (elements, warnings) = backend.parse(&script.rel_path, &text);
                    (script.rel_path.clone(), elements, warnings)
                }
                Err(e) => {
                    warn!(path = %script.path.display(), error = %e, "skipping unreadable file");
                    let warning = ParseWarning {
                        file: script.rel_path.clone(),
                        line: 0,
                        message: format!("file could not be read: {}", e),
                    };
                    (script.rel_path.clone(), Vec::new(), vec![warning])
                }
            }
        })
        .collect()
}

/// Fold one file's elements into the shared tables. Tracks lexical label
/// nesting by indent depth so jumps and calls attribute to their enclosing
/// label, and nested labels get qualified graph names.
fn index_file(model: &mut ProjectModel, elements: &[Element]) {
    let mut label_stack: Vec<(String, usize)> = Vec::new();
    index_elements(model, elements, &mut label_stack);
    build_label_bodies(model, elements);
}

fn index_elements(
    model: &mut ProjectModel,
    elements: &[Element],
    label_stack: &mut Vec<(String, usize)>,
) {
    for el in elements {
        // A statement at or above a label's indent ends that label's
        // lexical scope; its body is only what sits strictly deeper.
        while label_stack.last().map_or(false, |(_, d)| *d >= el.depth()) {
            label_stack.pop();
        }

        match el {
            Element::Label(label) => {
                let qualified = match label_stack.last() {
                    Some((outer, _)) => format!("{}.{}", outer, label.name),
                    None => label.name.clone(),
                };
                model
                    .labels
                    .entry(label.name.clone())
                    .or_default()
                    .push(LabelDef {
                        name: label.name.clone(),
                        qualified: qualified.clone(),
                        file: label.file.clone(),
                        line: label.line,
                        depth: label.depth,
                    });
                graph_node(model, &qualified);
                label_stack.push((qualified, label.depth));
            }
            Element::Jump(jump) => {
                model.jumps.push(jump.clone());
                if !jump.is_dynamic {
                    add_call_edge(model, label_stack, &jump.target, CallKind::Jump, &jump.file, jump.line);
                }
            }
            Element::Call(call) => {
                model.calls.push(call.clone());
                if !call.is_dynamic {
                    add_call_edge(model, label_stack, &call.target, CallKind::Call, &call.file, call.line);
                }
            }
            Element::VariableDecl(decl) => {
                model
                    .variables
                    .entry(decl.name.to_lowercase())
                    .or_default()
                    .push(VarOccurrence {
                        name: decl.name.clone(),
                        usage: VarUse::Decl(decl.kind),
                        file: decl.file.clone(),
                        line: decl.line,
                    });
            }
            Element::Assignment(assign) => {
                model
                    .variables
                    .entry(assign.name.to_lowercase())
                    .or_default()
                    .push(VarOccurrence {
                        name: assign.name.clone(),
                        usage: VarUse::Assign(assign.kind),
                        file: assign.file.clone(),
                        line: assign.line,
                    });
            }
            Element::Menu(menu) => {
                model.menus.push(MenuSite {
                    menu: menu.clone(),
                    parent_label: label_stack.last().map(|(name, _)| name.clone()),
                });
                for choice in &menu.choices {
                    if let Some(cond) = &choice.condition {
                        model.conditions.push(ConditionSite {
                            expression: cond.clone(),
                            file: menu.file.clone(),
                            line: choice.line,
                        });
                    }
                    index_elements(model, &choice.body, label_stack);
                }
            }
            Element::Conditional(branch) => {
                if !branch.condition.is_empty() {
                    model.conditions.push(ConditionSite {
                        expression: branch.condition.clone(),
                        file: branch.file.clone(),
                        line: branch.line,
                    });
                }
                index_elements(model, &branch.body, label_stack);
            }
            Element::CharacterDecl(decl) => {
                model
                    .characters
                    .entry(decl.identifier.clone())
                    .or_default()
                    .push(decl.clone());
                // A character definition also declares its identifier.
                model
                    .variables
                    .entry(decl.identifier.to_lowercase())
                    .or_default()
                    .push(VarOccurrence {
                        name: decl.identifier.clone(),
                        usage: VarUse::Decl(VarKind::Define),
                        file: decl.file.clone(),
                        line: decl.line,
                    });
            }
            Element::Dialogue(line) => model.dialogue.push(line.clone()),
            Element::SceneOrShow(scene) => model.scene_refs.push(scene.clone()),
            Element::AudioRef(audio) => model.audio_refs.push(audio.clone()),
            Element::ImageDecl(image) => model.image_decls.push(image.clone()),
            Element::Return(_) | Element::Barrier(_) | Element::Unstructured(_) => {}
        }
    }
}

fn graph_node(model: &mut ProjectModel, name: &str) -> NodeIndex {
    if let Some(idx) = model.call_nodes.get(name) {
        return *idx;
    }
    let idx = model.call_graph.add_node(name.to_string());
    model.call_nodes.insert(name.to_string(), idx);
    idx
}

fn add_call_edge(
    model: &mut ProjectModel,
    label_stack: &[(String, usize)],
    target: &str,
    kind: CallKind,
    file: &str,
    line: usize,
) {
    let caller = match label_stack.last() {
        Some((name, _)) => name.clone(),
        // Jumps before any label have no caller node.
        None => return,
    };
    let from = graph_node(model, &caller);
    let to = graph_node(model, target);
    model.call_graph.add_edge(
        from,
        to,
        CallEdge {
            kind,
            file: file.to_string(),
            line,
        },
    );
}

/// Summarize label bodies from the flattened document-order view. A body
/// runs from its label to the next label, or to a top-level declaration at
/// or above the label's indent. First definition wins for duplicates.
fn build_label_bodies(model: &mut ProjectModel, elements: &[Element]) {
    let mut flat: Vec<&Element> = Vec::new();
    flatten_into(elements, &mut flat);

    let label_positions: Vec<(usize, &crate::elements::Label)> = flat
        .iter()
        .enumerate()
        .filter_map(|(i, el)| match el {
            Element::Label(l) => Some((i, l)),
            _ => None,
        })
        .collect();

    for (idx, (start, label)) in label_positions.iter().enumerate() {
        if model.label_bodies.contains_key(&label.name) {
            continue;
        }
        let end = label_positions
            .get(idx + 1)
            .map(|(next, _)| *next)
            .unwrap_or(flat.len());

        let mut body = LabelBody {
            file: label.file.clone(),
            line: label.line,
            ..Default::default()
        };
        let mut all_pass = true;

        for el in &flat[start + 1..end] {
            let ends_scope = el.depth() <= label.depth
                && matches!(
                    el,
                    Element::Barrier(_)
                        | Element::VariableDecl(_)
                        | Element::ImageDecl(_)
                        | Element::CharacterDecl(_)
                );
            if ends_scope {
                break;
            }
            body.element_count += 1;
            if !matches!(el, Element::Unstructured(u) if u.text == "pass") {
                all_pass = false;
            }
            if matches!(el, Element::Return(_)) {
                body.has_return = true;
            }
        }

        body.only_pass = body.element_count > 0 && all_pass;
        model.label_bodies.insert(label.name.clone(), body);
    }
}

fn flatten_into<'a>(elements: &'a [Element], out: &mut Vec<&'a Element>) {
    for el in elements {
        out.push(el);
        match el {
            Element::Menu(menu) => {
                for choice in &menu.choices {
                    flatten_into(&choice.body, out);
                }
            }
            Element::Conditional(branch) => flatten_into(&branch.body, out),
            _ => {}
        }
    }
}

/// Group declared variables into families for case-drift detection: strip a
/// trailing numeric run, lowercase the base, and collect the distinct
/// original-cased names under it.
fn build_families(model: &mut ProjectModel) {
    let mut declared: Vec<&VarOccurrence> = model
        .variables
        .values()
        .flatten()
        .filter(|occ| matches!(occ.usage, VarUse::Decl(_)))
        .collect();
    declared.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));

    let mut families: HashMap<String, Vec<String>> = HashMap::new();
    for occ in declared {
        if occ.name.contains('.') {
            continue;
        }
        let base = occ.name.trim_end_matches(|c: char| c.is_ascii_digit());
        if base == occ.name {
            continue;
        }
        let entry = families.entry(base.to_lowercase()).or_default();
        if !entry.contains(&occ.name) {
            entry.push(occ.name.clone());
        }
    }
    model.families = families;
}
