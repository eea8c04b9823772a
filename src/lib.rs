pub mod analyzer;
pub mod checks;
pub mod config;
pub mod elements;
pub mod expr;
pub mod file_discovery;
pub mod findings;
pub mod model;
pub mod parser;
pub mod reporter;

pub use analyzer::{detect_sub_games, run_analysis, ProgressSink};
pub use config::Config;
pub use elements::{Element, Finding, ParseWarning, Severity};
pub use file_discovery::FileDiscovery;
pub use model::{build_project_model, ProjectError, ProjectModel};
pub use parser::{ParserBackend, StructuralParser};
pub use reporter::Reporter;

pub type Result<T> = anyhow::Result<T>;
