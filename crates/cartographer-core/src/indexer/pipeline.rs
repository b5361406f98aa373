//! Model construction orchestration with Rayon-based parallel parsing.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tracing::{info, warn};
use tree_sitter::Parser;

use crate::config::BuildConfig;
use crate::errors::CartographerResult;
use crate::indexer::filesystem::{FileSystemSource, ModulePath, SourceProvider};
use crate::indexer::parser::{new_parser, parse_source, ParsedUnit};
use crate::indexer::relationships::resolve_relationships;
use crate::indexer::symbols::{build_hierarchy, FileOutline};
use crate::models::ParseWarning;
use crate::store::Model;

/// Builds a [`Model`] from a project root.
pub trait ModelBuilder: Send + Sync {
    /// Fails with `SourceNotFound` when `root_path` is not a directory.
    fn build(&self, root_path: &Path, project_name: &str) -> CartographerResult<Model>;
}

/// Outcome of reading and parsing one file.
pub enum FileOutcome {
    Parsed(ParsedUnit),
    Skipped(ParseWarning),
}

fn skipped(relative: &Path, message: impl Into<String>) -> FileOutcome {
    FileOutcome::Skipped(ParseWarning {
        path: relative.to_path_buf(),
        message: message.into(),
    })
}

fn parse_file_worker(
    parser: &mut Option<Parser>,
    provider: &dyn SourceProvider,
    root: &Path,
    relative: &Path,
) -> FileOutcome {
    let module_path = match ModulePath::from_relative(relative) {
        Ok(path) => path,
        Err(message) => return skipped(relative, message),
    };
    let source = match provider.read(root, relative) {
        Ok(text) => text,
        Err(e) => return skipped(relative, e.to_string()),
    };
    let Some(parser) = parser.as_mut() else {
        return skipped(relative, "Python grammar unavailable");
    };
    match parse_source(parser, &source) {
        Ok(tree) => FileOutcome::Parsed(ParsedUnit {
            relative_path: relative.to_path_buf(),
            module_path,
            source,
            tree,
        }),
        Err(message) => skipped(relative, message),
    }
}

fn worker_parser() -> Option<Parser> {
    match new_parser() {
        Ok(parser) => Some(parser),
        Err(e) => {
            warn!("{e}");
            None
        }
    }
}

/// Read and parse `files` on a pool of `workers` threads. Output order
/// matches input order.
pub fn parallel_parse(
    provider: &dyn SourceProvider,
    root: &Path,
    files: &[PathBuf],
    workers: usize,
) -> Vec<FileOutcome> {
    if files.is_empty() {
        return vec![];
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .build();

    match pool {
        Ok(pool) => pool.install(|| {
            files
                .par_iter()
                .map_init(worker_parser, |parser, relative| {
                    parse_file_worker(parser, provider, root, relative)
                })
                .collect()
        }),
        Err(e) => {
            warn!("Falling back to sequential parsing: {e}");
            let mut parser = worker_parser();
            files
                .iter()
                .map(|relative| parse_file_worker(&mut parser, provider, root, relative))
                .collect()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub files_seen: usize,
    pub files_parsed: usize,
    pub elements: usize,
    pub relationships: usize,
    pub warnings: usize,
    pub elapsed_ms: u64,
}

/// Two-pass builder over Python sources.
pub struct PythonModelBuilder {
    config: BuildConfig,
    source: Box<dyn SourceProvider>,
}

impl Default for PythonModelBuilder {
    fn default() -> Self {
        Self::new(BuildConfig::default())
    }
}

impl PythonModelBuilder {
    pub fn new(config: BuildConfig) -> Self {
        let source = Box::new(FileSystemSource::new(config.clone()));
        Self { config, source }
    }

    pub fn from_env() -> Self {
        Self::new(BuildConfig::from_env())
    }

    /// Replace the discovery collaborator.
    pub fn with_source(mut self, source: impl SourceProvider + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the model and report what the build did.
    pub fn build_with_stats(
        &self,
        root_path: &Path,
        project_name: &str,
    ) -> CartographerResult<(Model, BuildStats)> {
        let start = Instant::now();
        let files = self.source.discover(root_path)?;
        let mut model = Model::new(project_name)?;

        let mut units = Vec::with_capacity(files.len());
        let outcomes = parallel_parse(
            self.source.as_ref(),
            root_path,
            &files,
            self.config.workers,
        );
        for outcome in outcomes {
            match outcome {
                FileOutcome::Parsed(unit) => units.push(unit),
                FileOutcome::Skipped(warning) => {
                    warn!(
                        "Skipping file {} due to parsing error: {}",
                        warning.path.display(),
                        warning.message
                    );
                    model.add_warning(warning);
                }
            }
        }

        // Hierarchy pass over every file before any relationship is resolved.
        let outlines = units
            .iter()
            .map(|unit| build_hierarchy(&mut model, unit))
            .collect::<CartographerResult<Vec<FileOutline>>>()?;

        let mut relationships = 0;
        for (unit, outline) in units.iter().zip(&outlines) {
            relationships += resolve_relationships(&mut model, unit, outline);
        }

        let stats = BuildStats {
            files_seen: files.len(),
            files_parsed: units.len(),
            elements: model.len(),
            relationships,
            warnings: model.warnings().len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            files = stats.files_seen,
            parsed = stats.files_parsed,
            elements = stats.elements,
            relationships = stats.relationships,
            warnings = stats.warnings,
            elapsed_ms = stats.elapsed_ms,
            "Built model for {project_name}"
        );
        Ok((model, stats))
    }
}

impl ModelBuilder for PythonModelBuilder {
    fn build(&self, root_path: &Path, project_name: &str) -> CartographerResult<Model> {
        self.build_with_stats(root_path, project_name)
            .map(|(model, _)| model)
    }
}
