use std::collections::HashSet;

use log::{info, warn};

use super::error::Result;
use super::simulation::{Simulation, SimulationParams};
use super::types::{ConceptMapData, LinkIdx, NodeCategory, NodeIdx};

/// Extra pick distance around a node, in world units.
pub const HIT_SLOP: f64 = 4.0;
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;
pub const DEFAULT_LINK_STRENGTH: f64 = 1.0;

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self { x: 0.0, y: 0.0, k: 1.0 }
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<NodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	/// Pointer travelled far enough to count as a drag rather than a click.
	pub moved: bool,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<NodeIdx>,
	pub neighbors: HashSet<NodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<NodeIdx>,
	pub prev_neighbors: HashSet<NodeIdx>,
	delay_t: f64,
}

/// What a click on the canvas did.
#[derive(Clone, Debug, PartialEq)]
pub enum ClickOutcome {
	Selected(NodeIdx),
	Linked(LinkIdx),
	/// Linking onto an existing neighbour removes the link instead.
	Unlinked,
	Cleared,
}

/// Everything the canvas component needs between frames.
pub struct ConceptMapState {
	pub sim: Simulation,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub selected: Option<NodeIdx>,
	/// When set, the next node clicked is linked to the selection.
	pub linking: bool,
}

impl ConceptMapState {
	pub fn new(data: &ConceptMapData, width: f64, height: f64) -> Self {
		Self::with_params(data, SimulationParams::default(), width, height)
	}

	pub fn with_params(data: &ConceptMapData, params: SimulationParams, width: f64, height: f64) -> Self {
		Self {
			sim: Simulation::from_data(data, params, width, height),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			linking: false,
		}
	}

	pub fn width(&self) -> f64 {
		self.sim.width
	}

	pub fn height(&self) -> f64 {
		self.sim.height
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under a screen position.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		self.sim
			.graph
			.nodes()
			.iter()
			.enumerate()
			.rev()
			.find(|(_, node)| (node.x - gx).hypot(node.y - gy) < node.radius + HIT_SLOP)
			.map(|(idx, _)| idx)
	}

	pub fn set_hover(&mut self, node: Option<NodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Keep the old highlight around so it can fade out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors = self.sim.graph.neighbors(idx);
		}
	}

	pub fn is_highlighted(&self, idx: NodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: NodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		self.sim.tick(dt);

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
		self.hover.highlight_t = self.hover.highlight_t.clamp(0.0, 1.0);
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.sim.resize(width, height);
	}

	/// Pointer down: grab a node or start panning.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(idx) = self.node_at_position(sx, sy) {
			let Some(node) = self.sim.graph.node(idx) else {
				return;
			};
			self.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: sx,
				start_y: sy,
				node_start_x: node.x,
				node_start_y: node.y,
				moved: false,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if !self.drag.active {
			let hovered = self.node_at_position(sx, sy);
			self.set_hover(hovered);
		}

		if self.drag.active {
			let Some(idx) = self.drag.node_idx else {
				return;
			};
			let (dx, dy) = (
				(sx - self.drag.start_x) / self.transform.k,
				(sy - self.drag.start_y) / self.transform.k,
			);
			if !self.drag.moved && dx.hypot(dy) < 2.0 {
				return;
			}
			self.drag.moved = true;
			let (nx, ny) = (self.drag.node_start_x + dx, self.drag.node_start_y + dy);
			if let Err(e) = self.sim.graph.pin(idx, nx, ny) {
				warn!("drag lost its node: {e}");
				self.drag = DragState::default();
			}
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
	}

	/// Pointer up. A press that never moved is a click on the node.
	pub fn pointer_up(&mut self) -> Option<Result<ClickOutcome>> {
		let drag = std::mem::take(&mut self.drag);
		let was_panning = self.pan.active;
		self.pan.active = false;

		match drag.node_idx {
			Some(idx) if drag.moved => {
				let _ = self.sim.graph.release(idx);
				None
			}
			Some(idx) => Some(self.click_node(idx)),
			None if was_panning
				&& (self.transform.x != self.pan.transform_start_x
					|| self.transform.y != self.pan.transform_start_y) =>
			{
				None
			}
			None => {
				self.selected = None;
				self.linking = false;
				Some(Ok(ClickOutcome::Cleared))
			}
		}
	}

	pub fn pointer_leave(&mut self) {
		if let Some(idx) = self.drag.node_idx {
			let _ = self.sim.graph.release(idx);
		}
		self.drag = DragState::default();
		self.pan.active = false;
		self.set_hover(None);
	}

	fn click_node(&mut self, idx: NodeIdx) -> Result<ClickOutcome> {
		match self.selected {
			Some(from) if self.linking && self.sim.graph.link_between(from, idx).is_some() => {
				self.linking = false;
				self.sim.graph.remove_link_between(from, idx);
				self.selected = Some(idx);
				self.refresh_hover();
				Ok(ClickOutcome::Unlinked)
			}
			Some(from) if self.linking => {
				self.linking = false;
				let link = self.sim.graph.add_link_between(from, idx, DEFAULT_LINK_STRENGTH)?;
				self.selected = Some(idx);
				self.refresh_hover();
				Ok(ClickOutcome::Linked(link))
			}
			_ => {
				self.selected = Some(idx);
				Ok(ClickOutcome::Selected(idx))
			}
		}
	}

	/// Double click toggles whether a node stays where it was left.
	pub fn toggle_fixed_at(&mut self, sx: f64, sy: f64) -> Option<Result<bool>> {
		let idx = self.node_at_position(sx, sy)?;
		let fixed = !self.sim.graph.node(idx)?.fixed;
		Some(self.sim.graph.set_fixed(idx, fixed).map(|_| fixed))
	}

	pub fn zoom_at(&mut self, sx: f64, sy: f64, zoom_in: bool) {
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let new_k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	pub fn reset_view(&mut self) {
		self.transform = ViewTransform::default();
	}

	/// Add a concept at the centre of the current view.
	pub fn add_concept(&mut self, label: &str, category: NodeCategory) -> Result<NodeIdx> {
		let (cx, cy) = self.screen_to_graph(self.width() / 2.0, self.height() / 2.0);
		// Nudge off-centre so stacked additions don't coincide
		let jitter = (self.sim.graph.node_count() % 7) as f64 * 3.0;
		let idx = self.sim.graph.add_concept(label, category, cx + jitter, cy - jitter)?;
		if let Some(from) = self.selected.filter(|_| self.linking) {
			self.linking = false;
			self.sim.graph.add_link_between(from, idx, DEFAULT_LINK_STRENGTH)?;
		}
		self.selected = Some(idx);
		info!("added concept `{}`", label.trim());
		Ok(idx)
	}

	pub fn start_linking(&mut self) -> bool {
		self.linking = self.selected.is_some();
		self.linking
	}

	pub fn remove_selected(&mut self) -> Result<Option<String>> {
		let Some(idx) = self.selected.take() else {
			return Ok(None);
		};
		let node = self.sim.graph.remove_node(idx)?;
		// Indices shifted: drop anything that still points into the arena
		self.linking = false;
		self.drag = DragState::default();
		self.hover = HoverState::default();
		info!("removed concept `{}`", node.label);
		Ok(Some(node.label))
	}

	fn refresh_hover(&mut self) {
		if let Some(idx) = self.hover.node {
			self.hover.neighbors = self.sim.graph.neighbors(idx);
		}
	}

	pub fn toggle_running(&mut self) -> bool {
		let running = !self.sim.is_running();
		self.sim.set_running(running);
		running
	}
}
