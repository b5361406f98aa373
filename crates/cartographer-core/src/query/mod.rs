pub mod commands;
pub mod engine;
pub mod facade;

pub use commands::{AddFilter, ChangeDepth, FocusOnNode, QueryCommand};
pub use engine::execute;
pub use facade::{normalize_root_fqn, AnalysisFacade};
