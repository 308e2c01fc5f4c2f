use std::fmt;
use std::str::FromStr;

use super::error::GraphError;

/// Index of a node inside the graph arena. Shifts when an earlier node is removed.
pub type NodeIdx = usize;

/// Index of a link inside the graph arena.
pub type LinkIdx = usize;

/// Closed set of concept kinds. Drives colour and default size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum NodeCategory {
	Core,
	#[default]
	Concept,
	Example,
	Resource,
	Question,
}

struct CategoryStyle {
	key: &'static str,
	label: &'static str,
	color: &'static str,
	radius: f64,
}

const CATEGORY_STYLES: [CategoryStyle; 5] = [
	CategoryStyle {
		key: "core",
		label: "Core idea",
		color: "#ff7f0e",
		radius: 22.0,
	},
	CategoryStyle {
		key: "concept",
		label: "Concept",
		color: "#1f77b4",
		radius: 16.0,
	},
	CategoryStyle {
		key: "example",
		label: "Example",
		color: "#2ca02c",
		radius: 12.0,
	},
	CategoryStyle {
		key: "resource",
		label: "Resource",
		color: "#9467bd",
		radius: 12.0,
	},
	CategoryStyle {
		key: "question",
		label: "Question",
		color: "#d62728",
		radius: 14.0,
	},
];

impl NodeCategory {
	pub const ALL: [NodeCategory; 5] = [
		NodeCategory::Core,
		NodeCategory::Concept,
		NodeCategory::Example,
		NodeCategory::Resource,
		NodeCategory::Question,
	];

	fn style(self) -> &'static CategoryStyle {
		&CATEGORY_STYLES[self as usize]
	}

	pub fn key(self) -> &'static str {
		self.style().key
	}

	pub fn label(self) -> &'static str {
		self.style().label
	}

	pub fn color(self) -> &'static str {
		self.style().color
	}

	pub fn radius(self) -> f64 {
		self.style().radius
	}
}

impl fmt::Display for NodeCategory {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.key())
	}
}

impl FromStr for NodeCategory {
	type Err = GraphError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		NodeCategory::ALL
			.into_iter()
			.find(|c| c.key().eq_ignore_ascii_case(s.trim()))
			.ok_or_else(|| GraphError::UnknownCategory(s.to_string()))
	}
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

#[derive(Clone, Debug)]
pub struct ConceptNode {
	pub id: String,
	pub label: String,
	pub category: NodeCategory,
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
	/// Position held by the user; overrides the simulation while set.
	pub pin: Option<Point>,
	/// Keep the pin after a drag ends.
	pub fixed: bool,
	pub radius: f64,
}

impl ConceptNode {
	pub fn is_pinned(&self) -> bool {
		self.pin.is_some()
	}

	pub fn speed_sq(&self) -> f64 {
		self.vx * self.vx + self.vy * self.vy
	}
}

/// Input for creating a node.
#[derive(Clone, Debug)]
pub struct NewNode {
	pub id: String,
	pub label: String,
	pub category: NodeCategory,
	pub x: f64,
	pub y: f64,
	/// Defaults to the category radius.
	pub radius: Option<f64>,
}

impl NewNode {
	pub fn new(id: impl Into<String>, label: impl Into<String>, category: NodeCategory) -> Self {
		Self {
			id: id.into(),
			label: label.into(),
			category,
			x: 0.0,
			y: 0.0,
			radius: None,
		}
	}

	pub fn at(mut self, x: f64, y: f64) -> Self {
		self.x = x;
		self.y = y;
		self
	}
}

/// Decorative marker flowing along a link.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
	/// Fraction along the link, in `[0, 1)`.
	pub t: f64,
	pub speed: f64,
}

impl Particle {
	pub fn advance(&mut self, dt: f64) {
		let t = (self.t + self.speed * dt).rem_euclid(1.0);
		// rem_euclid can round up to exactly 1.0 for tiny negative inputs
		self.t = if t >= 1.0 || !t.is_finite() { 0.0 } else { t };
	}
}

#[derive(Clone, Debug)]
pub struct ConceptLink {
	pub id: String,
	pub source: NodeIdx,
	pub target: NodeIdx,
	pub strength: f64,
	pub particles: Vec<Particle>,
}

impl ConceptLink {
	pub fn connects(&self, a: NodeIdx, b: NodeIdx) -> bool {
		(self.source == a && self.target == b) || (self.source == b && self.target == a)
	}

	pub fn touches(&self, idx: NodeIdx) -> bool {
		self.source == idx || self.target == idx
	}

	pub fn other(&self, idx: NodeIdx) -> Option<NodeIdx> {
		if self.source == idx {
			Some(self.target)
		} else if self.target == idx {
			Some(self.source)
		} else {
			None
		}
	}
}

/// Seed description of a map, by node id.
#[derive(Clone, Debug)]
pub struct MapNode {
	pub id: String,
	pub label: String,
	pub category: NodeCategory,
}

#[derive(Clone, Debug)]
pub struct MapLink {
	pub source: String,
	pub target: String,
	pub strength: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ConceptMapData {
	pub nodes: Vec<MapNode>,
	pub links: Vec<MapLink>,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn category_table_lines_up_with_variants() {
		for category in NodeCategory::ALL {
			assert_eq!(category.key().parse::<NodeCategory>().unwrap(), category);
			assert!(category.radius() > 0.0);
			assert!(category.color().starts_with('#'));
		}
	}

	#[test]
	fn unknown_category_is_rejected() {
		let err = "planet".parse::<NodeCategory>().unwrap_err();
		assert!(matches!(err, GraphError::UnknownCategory(ref s) if s == "planet"));
	}

	#[test]
	fn particle_wraps_past_end() {
		let mut p = Particle { t: 0.9, speed: 0.5 };
		p.advance(0.4);
		assert!((p.t - 0.1).abs() < 1e-9);
	}

	#[test]
	fn link_other_endpoint() {
		let link = ConceptLink {
			id: "l".into(),
			source: 2,
			target: 5,
			strength: 1.0,
			particles: Vec::new(),
		};
		assert_eq!(link.other(2), Some(5));
		assert_eq!(link.other(5), Some(2));
		assert_eq!(link.other(3), None);
		assert!(link.connects(5, 2));
	}
}
