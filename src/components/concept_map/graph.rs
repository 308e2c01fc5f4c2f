use std::collections::{HashMap, HashSet};

use log::{debug, warn};

use super::error::{GraphError, Result};
use super::types::{ConceptLink, ConceptNode, LinkIdx, NewNode, NodeCategory, NodeIdx, Particle, Point};

/// How many flow particles a new link gets and how fast they travel (link lengths per second).
#[derive(Clone, Copy, Debug)]
pub struct ParticleStyle {
	pub per_link: usize,
	pub speed: f64,
}

impl Default for ParticleStyle {
	fn default() -> Self {
		Self {
			per_link: 3,
			speed: 0.35,
		}
	}
}

/// Strongest spring a link may carry. Stiffer links overshoot within a frame.
pub const MAX_LINK_STRENGTH: f64 = 100.0;

/// Owned arena of concepts and the links between them.
///
/// Links refer to nodes by index. Removing a node drops its links and shifts
/// every later index down by one, so indices must not be held across removals.
#[derive(Clone, Debug, Default)]
pub struct ConceptGraph {
	nodes: Vec<ConceptNode>,
	links: Vec<ConceptLink>,
	ids: HashMap<String, NodeIdx>,
	particles: ParticleStyle,
	next_id: u64,
}

impl ConceptGraph {
	pub fn new(particles: ParticleStyle) -> Self {
		Self {
			particles,
			..Default::default()
		}
	}

	pub fn nodes(&self) -> &[ConceptNode] {
		&self.nodes
	}

	pub fn links(&self) -> &[ConceptLink] {
		&self.links
	}

	pub(super) fn parts_mut(&mut self) -> (&mut [ConceptNode], &mut [ConceptLink]) {
		(&mut self.nodes, &mut self.links)
	}

	pub fn node(&self, idx: NodeIdx) -> Option<&ConceptNode> {
		self.nodes.get(idx)
	}

	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	pub fn link_count(&self) -> usize {
		self.links.len()
	}

	pub fn index_of(&self, id: &str) -> Option<NodeIdx> {
		self.ids.get(id).copied()
	}

	pub fn add_node(&mut self, node: NewNode) -> Result<NodeIdx> {
		if self.ids.contains_key(&node.id) {
			warn!("rejected node `{}`: id already in use", node.id);
			return Err(GraphError::DuplicateNode(node.id));
		}
		let idx = self.nodes.len();
		debug!("add node `{}` ({}) at {idx}", node.id, node.category);
		self.ids.insert(node.id.clone(), idx);
		self.nodes.push(ConceptNode {
			radius: node.radius.unwrap_or_else(|| node.category.radius()),
			id: node.id,
			label: node.label,
			category: node.category,
			x: node.x,
			y: node.y,
			vx: 0.0,
			vy: 0.0,
			pin: None,
			fixed: false,
		});
		Ok(idx)
	}

	/// Add a concept under a freshly generated id.
	pub fn add_concept(&mut self, label: &str, category: NodeCategory, x: f64, y: f64) -> Result<NodeIdx> {
		let label = label.trim();
		if label.is_empty() {
			return Err(GraphError::EmptyLabel);
		}
		let id = loop {
			self.next_id += 1;
			let candidate = format!("concept-{}", self.next_id);
			if !self.ids.contains_key(&candidate) {
				break candidate;
			}
		};
		self.add_node(NewNode::new(id, label, category).at(x, y))
	}

	/// Remove a node together with every link touching it.
	pub fn remove_node(&mut self, idx: NodeIdx) -> Result<ConceptNode> {
		if idx >= self.nodes.len() {
			return Err(GraphError::UnknownNode(idx.to_string()));
		}
		let before = self.links.len();
		self.links.retain(|l| !l.touches(idx));
		for link in &mut self.links {
			if link.source > idx {
				link.source -= 1;
			}
			if link.target > idx {
				link.target -= 1;
			}
		}
		let node = self.nodes.remove(idx);
		self.rebuild_ids();
		debug!(
			"removed node `{}` and {} incident link(s)",
			node.id,
			before - self.links.len()
		);
		Ok(node)
	}

	fn rebuild_ids(&mut self) {
		self.ids.clear();
		for (i, node) in self.nodes.iter().enumerate() {
			self.ids.insert(node.id.clone(), i);
		}
	}

	fn resolve(&self, id: &str) -> Result<NodeIdx> {
		self.index_of(id)
			.ok_or_else(|| GraphError::UnknownNode(id.to_string()))
	}

	/// Link two nodes by id. Self links and repeated unordered pairs are refused.
	pub fn add_link(&mut self, source: &str, target: &str, strength: f64) -> Result<LinkIdx> {
		let (src, tgt) = (self.resolve(source)?, self.resolve(target)?);
		self.add_link_between(src, tgt, strength)
	}

	pub fn add_link_between(&mut self, src: NodeIdx, tgt: NodeIdx, strength: f64) -> Result<LinkIdx> {
		let src_id = self.id_at(src)?;
		let tgt_id = self.id_at(tgt)?;
		if src == tgt {
			warn!("rejected self link on `{src_id}`");
			return Err(GraphError::SelfLink(src_id));
		}
		if !(strength > 0.0 && strength <= MAX_LINK_STRENGTH) {
			return Err(GraphError::InvalidStrength(strength));
		}
		if self.link_between(src, tgt).is_some() {
			warn!("rejected duplicate link `{src_id}` - `{tgt_id}`");
			return Err(GraphError::DuplicateLink(src_id, tgt_id));
		}

		let n = self.particles.per_link;
		let particles = (0..n)
			.map(|i| Particle {
				t: i as f64 / n as f64,
				speed: self.particles.speed * (0.5 + 0.5 * strength.min(2.0)),
			})
			.collect();
		let idx = self.links.len();
		debug!("link `{src_id}` -> `{tgt_id}` (strength {strength})");
		self.links.push(ConceptLink {
			id: format!("{src_id}--{tgt_id}"),
			source: src,
			target: tgt,
			strength,
			particles,
		});
		Ok(idx)
	}

	fn id_at(&self, idx: NodeIdx) -> Result<String> {
		self.nodes
			.get(idx)
			.map(|n| n.id.clone())
			.ok_or_else(|| GraphError::UnknownNode(idx.to_string()))
	}

	pub fn remove_link(&mut self, idx: LinkIdx) -> Result<ConceptLink> {
		if idx >= self.links.len() {
			return Err(GraphError::UnknownLink(idx));
		}
		Ok(self.links.remove(idx))
	}

	pub fn remove_link_between(&mut self, a: NodeIdx, b: NodeIdx) -> Option<ConceptLink> {
		let idx = self.link_between(a, b)?;
		let link = self.remove_link(idx).ok()?;
		debug!("unlinked {}", link.id);
		Some(link)
	}

	pub fn link_between(&self, a: NodeIdx, b: NodeIdx) -> Option<LinkIdx> {
		self.links.iter().position(|l| l.connects(a, b))
	}

	pub fn neighbors(&self, idx: NodeIdx) -> HashSet<NodeIdx> {
		self.links.iter().filter_map(|l| l.other(idx)).collect()
	}

	pub fn degree(&self, idx: NodeIdx) -> usize {
		self.links.iter().filter(|l| l.touches(idx)).count()
	}

	/// Total link endpoints over node count; 0 for an empty map.
	pub fn average_degree(&self) -> f64 {
		if self.nodes.is_empty() {
			return 0.0;
		}
		(2 * self.links.len()) as f64 / self.nodes.len() as f64
	}

	/// Hold a node at `(x, y)` until released.
	pub fn pin(&mut self, idx: NodeIdx, x: f64, y: f64) -> Result<()> {
		let node = self.node_mut(idx)?;
		node.pin = Some(Point::new(x, y));
		node.x = x;
		node.y = y;
		node.vx = 0.0;
		node.vy = 0.0;
		Ok(())
	}

	/// Drop a drag pin. Fixed nodes keep theirs.
	pub fn release(&mut self, idx: NodeIdx) -> Result<()> {
		let node = self.node_mut(idx)?;
		if !node.fixed {
			node.pin = None;
		}
		Ok(())
	}

	pub fn set_fixed(&mut self, idx: NodeIdx, fixed: bool) -> Result<()> {
		let node = self.node_mut(idx)?;
		node.fixed = fixed;
		if fixed {
			let at = node.pin.unwrap_or(Point::new(node.x, node.y));
			node.pin = Some(at);
			node.vx = 0.0;
			node.vy = 0.0;
		} else {
			node.pin = None;
		}
		Ok(())
	}

	fn node_mut(&mut self, idx: NodeIdx) -> Result<&mut ConceptNode> {
		self.nodes
			.get_mut(idx)
			.ok_or_else(|| GraphError::UnknownNode(idx.to_string()))
	}
}
