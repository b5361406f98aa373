pub mod model;

pub use model::{Element, ElementId, Model};
