//! Cartographer core library: turns a Python code base into a queryable
//! architectural model.
//!
//! Construction parses every source file with tree-sitter and runs two
//! passes over the trees: a hierarchy pass registering packages, modules,
//! classifiers and members, then a relationship pass resolving inheritance
//! and composition edges through per-file import tables. The query engine
//! extracts bounded, filtered subgraphs of the result as [`ViewState`]
//! values, which the renderers turn into text or Graphviz DOT.
//!
//! ```no_run
//! use std::path::Path;
//! use cartographer_core::{AnalysisFacade, Query};
//!
//! let facade = AnalysisFacade::default();
//! facade.load_project(Path::new("./src"), "my_app")?;
//! let view = facade.execute_query(&Query::new(["my_app"]).with_depth(2))?;
//! println!("{}", view.to_json()?);
//! # Ok::<(), cartographer_core::CartographerError>(())
//! ```

pub mod config;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod query;
pub mod render;
pub mod store;

pub use config::BuildConfig;
pub use errors::{CartographerError, CartographerResult};
pub use indexer::{
    FileSystemSource, InMemorySource, ModelBuilder, PythonModelBuilder, SourceProvider,
};
pub use models::{
    Direction, EdgeRecord, ElementKind, ElementType, FilterRule, NodeRecord, ParseWarning,
    ProjectInfo, Query, Relationship, RelationshipKind, ViewState, Visibility,
};
pub use query::{normalize_root_fqn, AnalysisFacade, QueryCommand};
pub use render::{DotRenderer, Renderer, TextRenderer};
pub use store::{Element, ElementId, Model};
