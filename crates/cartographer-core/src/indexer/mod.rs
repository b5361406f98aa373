pub mod filesystem;
pub mod imports;
pub mod names;
pub mod parser;
pub mod pipeline;
pub mod relationships;
pub mod symbols;

pub use filesystem::{FileSystemSource, InMemorySource, SourceProvider};
pub use pipeline::{BuildStats, ModelBuilder, PythonModelBuilder};
