//! Entry point for hosts: project loading, snapshot management and queries.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::errors::{CartographerError, CartographerResult};
use crate::indexer::pipeline::{ModelBuilder, PythonModelBuilder};
use crate::models::{ProjectInfo, Query, ViewState};
use crate::query::engine;
use crate::store::Model;

/// Owns the currently loaded model and serves queries against it.
///
/// A reload swaps the whole snapshot; queries already running keep the
/// snapshot they started with.
pub struct AnalysisFacade {
    builder: Box<dyn ModelBuilder>,
    model: RwLock<Option<Arc<Model>>>,
}

impl Default for AnalysisFacade {
    fn default() -> Self {
        Self::new(Box::new(PythonModelBuilder::from_env()))
    }
}

impl AnalysisFacade {
    pub fn new(builder: Box<dyn ModelBuilder>) -> Self {
        Self {
            builder,
            model: RwLock::new(None),
        }
    }

    /// Build a fresh model and make it current. On failure the previous
    /// model, if any, stays loaded.
    pub fn load_project(&self, root_path: &Path, project_name: &str) -> CartographerResult<()> {
        let model = self.builder.build(root_path, project_name)?;
        info!(
            elements = model.len(),
            relationships = model.relationships().len(),
            "Loaded project {project_name} from {}",
            root_path.display()
        );
        *self.model.write() = Some(Arc::new(model));
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.model.read().is_some()
    }

    /// The current model snapshot.
    pub fn snapshot(&self) -> CartographerResult<Arc<Model>> {
        self.model
            .read()
            .clone()
            .ok_or(CartographerError::ModelNotLoaded)
    }

    pub fn execute_query(&self, query: &Query) -> CartographerResult<ViewState> {
        let model = self.snapshot()?;
        Ok(engine::execute(&model, query))
    }

    pub fn project_info(&self) -> CartographerResult<ProjectInfo> {
        let model = self.snapshot()?;
        let root = model.element(model.root());
        Ok(ProjectInfo {
            project_name: model.project_name().to_string(),
            top_level_fqns: root.children().map(|id| model.fqn(id)).collect(),
            element_count: model.len(),
            relationship_count: model.relationships().len(),
            warnings: model.warnings().to_vec(),
        })
    }
}

/// Map a user-supplied root onto a registry FQN: `.` and the bare project
/// name mean the project root, anything else is taken relative to it.
pub fn normalize_root_fqn(project_name: &str, raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() || raw == "." || raw == project_name {
        return project_name.to_string();
    }
    if raw
        .strip_prefix(project_name)
        .is_some_and(|rest| rest.starts_with('.'))
    {
        return raw.to_string();
    }
    format!("{project_name}.{}", raw.trim_start_matches('.'))
}
