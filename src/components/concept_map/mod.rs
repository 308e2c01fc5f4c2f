mod component;
mod error;
mod graph;
mod render;
mod simulation;
mod state;
mod types;

pub use component::ConceptMapCanvas;
pub use types::{ConceptMapData, MapLink, MapNode, NodeCategory};
