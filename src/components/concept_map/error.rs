use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
	#[error("a node with id `{0}` already exists")]
	DuplicateNode(String),

	#[error("no node `{0}` in the map")]
	UnknownNode(String),

	#[error("no link at index {0}")]
	UnknownLink(usize),

	#[error("cannot link `{0}` to itself")]
	SelfLink(String),

	#[error("`{0}` and `{1}` are already linked")]
	DuplicateLink(String, String),

	#[error("link strength must be in (0, 100], got {0}")]
	InvalidStrength(f64),

	#[error("unknown category `{0}`")]
	UnknownCategory(String),

	#[error("concept label cannot be empty")]
	EmptyLabel,
}

pub type Result<T> = std::result::Result<T, GraphError>;
