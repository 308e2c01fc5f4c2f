use log::{debug, info};

use super::graph::{ConceptGraph, ParticleStyle};
use super::types::{ConceptMapData, NewNode};
use crate::components::history::RollingHistory;

/// Tunables for the layout physics.
#[derive(Clone, Debug)]
pub struct SimulationParams {
	/// Numerator of the softened inverse-square repulsion.
	pub charge: f64,
	/// Added to the squared distance so the repulsion never blows up.
	pub softening: f64,
	/// Floor for the squared distance between two nodes.
	pub min_distance_sq: f64,
	pub spring: f64,
	/// Rest length of a link between two zero-radius nodes.
	pub link_distance: f64,
	/// Rest length lost per unit of combined endpoint radius.
	pub radius_shrink: f64,
	pub min_link_distance: f64,
	/// Velocity multiplier applied every tick, below 1.
	pub damping: f64,
	/// Frame rate the position step is normalised to.
	pub reference_fps: f64,
	/// Largest `dt` accepted in one tick, in seconds.
	pub max_dt: f64,
	/// Distance kept between nodes and the viewport edge.
	pub padding: f64,
	pub history_len: usize,
	pub particles: ParticleStyle,
}

impl Default for SimulationParams {
	fn default() -> Self {
		Self {
			charge: 2000.0,
			softening: 100.0,
			min_distance_sq: 0.01,
			spring: 0.05,
			link_distance: 150.0,
			radius_shrink: 0.5,
			min_link_distance: 40.0,
			damping: 0.9,
			reference_fps: 60.0,
			max_dt: 0.05,
			padding: 30.0,
			history_len: 120,
			particles: ParticleStyle::default(),
		}
	}
}

impl SimulationParams {
	/// Rest length of a link joining nodes of radius `ra` and `rb`.
	pub fn desired_distance(&self, ra: f64, rb: f64) -> f64 {
		(self.link_distance - self.radius_shrink * (ra + rb)).max(self.min_link_distance)
	}
}

/// What observers receive after every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameSnapshot {
	pub frame: u64,
	pub node_count: usize,
	pub link_count: usize,
	pub average_degree: f64,
	/// Sum of squared node speeds, a rough "is it settled" gauge.
	pub kinetic_energy: f64,
	/// Average degree per frame, oldest first, at most `history_len` samples.
	pub degree_history: Vec<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&FrameSnapshot)>;

/// The concept graph plus the physics that lays it out.
pub struct Simulation {
	pub graph: ConceptGraph,
	pub params: SimulationParams,
	pub width: f64,
	pub height: f64,
	running: bool,
	frame: u64,
	degree_history: RollingHistory<f64>,
	observers: Vec<(ObserverId, Observer)>,
	next_observer: u64,
	forces: Vec<(f64, f64)>,
}

impl Simulation {
	pub fn new(params: SimulationParams, width: f64, height: f64) -> Self {
		Self {
			graph: ConceptGraph::new(params.particles),
			degree_history: RollingHistory::new(params.history_len),
			params,
			width,
			height,
			running: true,
			frame: 0,
			observers: Vec::new(),
			next_observer: 0,
			forces: Vec::new(),
		}
	}

	/// Build a simulation seeded from map data, nodes spread on a circle.
	/// Links naming unknown ids are skipped.
	pub fn from_data(data: &ConceptMapData, params: SimulationParams, width: f64, height: f64) -> Self {
		let mut sim = Self::new(params, width, height);
		let n = data.nodes.len().max(1) as f64;
		let ring = 0.3 * width.min(height);
		for (i, node) in data.nodes.iter().enumerate() {
			let angle = i as f64 * std::f64::consts::TAU / n;
			let seed = NewNode::new(node.id.clone(), node.label.clone(), node.category).at(
				width / 2.0 + ring * angle.cos(),
				height / 2.0 + ring * angle.sin(),
			);
			if let Err(e) = sim.graph.add_node(seed) {
				debug!("skipping seed node: {e}");
			}
		}
		for link in &data.links {
			if let Err(e) = sim.graph.add_link(&link.source, &link.target, link.strength) {
				debug!("skipping seed link: {e}");
			}
		}
		info!(
			"concept map seeded with {} nodes and {} links",
			sim.graph.node_count(),
			sim.graph.link_count()
		);
		sim
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	pub fn set_running(&mut self, running: bool) {
		if self.running != running {
			info!("simulation {}", if running { "resumed" } else { "paused" });
		}
		self.running = running;
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}

	pub fn subscribe(&mut self, observer: impl FnMut(&FrameSnapshot) + 'static) -> ObserverId {
		let id = ObserverId(self.next_observer);
		self.next_observer += 1;
		self.observers.push((id, Box::new(observer)));
		id
	}

	pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
		let before = self.observers.len();
		self.observers.retain(|(oid, _)| *oid != id);
		self.observers.len() != before
	}

	/// Advance one frame if running. Returns whether a step happened.
	pub fn tick(&mut self, dt: f64) -> bool {
		if !self.running {
			return false;
		}
		self.step(dt);
		true
	}

	/// One physics update regardless of the running flag.
	pub fn step(&mut self, dt: f64) {
		let dt = if dt.is_finite() {
			dt.max(0.0).min(self.params.max_dt)
		} else {
			0.0
		};
		self.accumulate_forces();
		self.integrate(dt);
		self.advance_particles(dt);
		self.frame += 1;
		self.degree_history.push(self.graph.average_degree());

		let snapshot = self.snapshot();
		for (_, observer) in &mut self.observers {
			observer(&snapshot);
		}
	}

	fn accumulate_forces(&mut self) {
		let p = &self.params;
		let nodes = self.graph.nodes();
		self.forces.clear();
		self.forces.resize(nodes.len(), (0.0, 0.0));

		for (i, a) in nodes.iter().enumerate() {
			if a.is_pinned() {
				continue;
			}
			let (mut fx, mut fy) = (0.0, 0.0);
			for (j, b) in nodes.iter().enumerate() {
				if i == j {
					continue;
				}
				let (dx, dy) = (a.x - b.x, a.y - b.y);
				let dist_sq = (dx * dx + dy * dy).max(p.min_distance_sq);
				let dist = dist_sq.sqrt();
				let force = p.charge / (dist_sq + p.softening);
				if dx == 0.0 && dy == 0.0 {
					// Coincident nodes: push apart along a direction derived from the index order.
					let sign = if i < j { -1.0 } else { 1.0 };
					fx += sign * force;
					continue;
				}
				fx += dx / dist * force;
				fy += dy / dist * force;
			}
			self.forces[i] = (fx, fy);
		}

		for link in self.graph.links() {
			let (Some(a), Some(b)) = (nodes.get(link.source), nodes.get(link.target)) else {
				continue;
			};
			let (dx, dy) = (b.x - a.x, b.y - a.y);
			let dist = (dx * dx + dy * dy).max(p.min_distance_sq).sqrt();
			let desired = p.desired_distance(a.radius, b.radius);
			let force = p.spring * link.strength * (dist - desired);
			let (fx, fy) = (dx / dist * force, dy / dist * force);
			if !a.is_pinned() {
				self.forces[link.source].0 += fx;
				self.forces[link.source].1 += fy;
			}
			if !b.is_pinned() {
				self.forces[link.target].0 -= fx;
				self.forces[link.target].1 -= fy;
			}
		}
	}

	fn integrate(&mut self, dt: f64) {
		let p = &self.params;
		let (lo_x, hi_x) = bounds(p.padding, self.width);
		let (lo_y, hi_y) = bounds(p.padding, self.height);
		let (nodes, _) = self.graph.parts_mut();

		for (node, &(fx, fy)) in nodes.iter_mut().zip(&self.forces) {
			if let Some(pin) = node.pin {
				node.x = pin.x;
				node.y = pin.y;
				node.vx = 0.0;
				node.vy = 0.0;
				continue;
			}
			node.vx = (node.vx + fx * dt) * p.damping;
			node.vy = (node.vy + fy * dt) * p.damping;
			node.x = (node.x + node.vx * dt * p.reference_fps).clamp(lo_x, hi_x);
			node.y = (node.y + node.vy * dt * p.reference_fps).clamp(lo_y, hi_y);
		}
	}

	fn advance_particles(&mut self, dt: f64) {
		let (_, links) = self.graph.parts_mut();
		for particle in links.iter_mut().flat_map(|l| l.particles.iter_mut()) {
			particle.advance(dt);
		}
	}

	pub fn snapshot(&self) -> FrameSnapshot {
		FrameSnapshot {
			frame: self.frame,
			node_count: self.graph.node_count(),
			link_count: self.graph.link_count(),
			average_degree: self.graph.average_degree(),
			kinetic_energy: self.graph.nodes().iter().map(|n| n.speed_sq()).sum(),
			degree_history: self.degree_history.to_vec(),
		}
	}
}

/// Allowed coordinate range along one axis; collapses to the lower edge when the
/// viewport is narrower than twice the padding.
fn bounds(padding: f64, extent: f64) -> (f64, f64) {
	let lo = padding;
	(lo, (extent - padding).max(lo))
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;
	use std::rc::Rc;

	use proptest::prelude::*;

	use super::*;
	use crate::components::concept_map::types::{MapLink, MapNode, NodeCategory, Particle};

	const DT: f64 = 1.0 / 60.0;

	fn two_nodes(params: SimulationParams, ax: f64, bx: f64) -> Simulation {
		let mut sim = Simulation::new(params, 800.0, 600.0);
		for (id, x) in [("a", ax), ("b", bx)] {
			let node = NewNode {
				radius: Some(20.0),
				..NewNode::new(id, id.to_uppercase(), NodeCategory::Concept).at(x, 300.0)
			};
			sim.graph.add_node(node).unwrap();
		}
		sim
	}

	fn distance(sim: &Simulation) -> f64 {
		let (a, b) = (&sim.graph.nodes()[0], &sim.graph.nodes()[1]);
		(a.x - b.x).hypot(a.y - b.y)
	}

	#[test]
	fn pinned_node_sits_exactly_on_pin() {
		let mut sim = two_nodes(SimulationParams::default(), 390.0, 410.0);
		sim.graph.pin(0, 123.25, 456.5).unwrap();
		sim.graph.add_link("a", "b", 1.0).unwrap();
		for _ in 0..50 {
			sim.step(DT);
			let a = &sim.graph.nodes()[0];
			assert_eq!((a.x, a.y), (123.25, 456.5));
			assert_eq!((a.vx, a.vy), (0.0, 0.0));
		}
		assert!(sim.graph.nodes()[1].x != 410.0);
	}

	#[test]
	fn symmetric_pair_moves_equal_and_opposite() {
		let mut sim = two_nodes(SimulationParams::default(), 350.0, 450.0);
		sim.step(DT);
		let (a, b) = (&sim.graph.nodes()[0], &sim.graph.nodes()[1]);
		let (da, db) = (a.x - 350.0, b.x - 450.0);
		assert!(da < 0.0 && db > 0.0);
		assert!((da + db).abs() < 1e-9);
		assert_eq!(a.y, 300.0);
		assert_eq!(b.y, 300.0);
		assert!((a.vx + b.vx).abs() < 1e-12);
	}

	#[test]
	fn spring_converges_monotonically_to_rest_length() {
		let params = SimulationParams {
			charge: 0.0,
			..SimulationParams::default()
		};
		let desired = params.desired_distance(20.0, 20.0);
		let mut sim = two_nodes(params, 250.0, 550.0);
		sim.graph.add_link("a", "b", 1.0).unwrap();

		let mut gap = (distance(&sim) - desired).abs();
		for _ in 0..900 {
			sim.step(DT);
			let next = (distance(&sim) - desired).abs();
			assert!(next <= gap + 1e-9, "gap grew from {gap} to {next}");
			gap = next;
		}
		assert!(gap < 0.5, "still {gap} away from rest length");
	}

	#[test]
	fn linked_pair_with_repulsion_settles_near_rest_length() {
		let params = SimulationParams::default();
		let desired = params.desired_distance(20.0, 20.0);
		let mut sim = two_nodes(params, 100.0, 700.0);
		sim.graph.add_link("a", "b", 1.0).unwrap();
		for _ in 0..2000 {
			sim.step(DT);
			assert!(distance(&sim).is_finite());
		}
		let d = distance(&sim);
		// repulsion holds the pair slightly past the spring's rest length
		assert!(d > desired, "{d} <= {desired}");
		assert!(d - desired < 5.0, "settled at {d}, rest length {desired}");
		assert!(sim.snapshot().kinetic_energy < 1e-3);
	}

	#[test]
	fn nodes_stay_inside_padded_viewport() {
		let params = SimulationParams {
			charge: 1.0e7,
			..SimulationParams::default()
		};
		let mut sim = two_nodes(params, 399.0, 401.0);
		for _ in 0..200 {
			sim.step(DT);
		}
		for node in sim.graph.nodes() {
			assert!((30.0..=770.0).contains(&node.x));
			assert!((30.0..=570.0).contains(&node.y));
		}
	}

	#[test]
	fn tiny_viewport_does_not_panic() {
		let mut sim = two_nodes(SimulationParams::default(), 5.0, 6.0);
		sim.resize(10.0, 10.0);
		sim.step(DT);
		assert_eq!(sim.graph.nodes()[0].x, 30.0);
	}

	#[test]
	fn coincident_nodes_separate() {
		let mut sim = two_nodes(SimulationParams::default(), 400.0, 400.0);
		sim.step(DT);
		let (a, b) = (&sim.graph.nodes()[0], &sim.graph.nodes()[1]);
		assert!(a.x.is_finite() && b.x.is_finite());
		assert!(a.x < b.x);
	}

	#[test]
	fn paused_tick_does_nothing() {
		let mut sim = two_nodes(SimulationParams::default(), 350.0, 450.0);
		sim.set_running(false);
		assert!(!sim.tick(DT));
		assert_eq!(sim.graph.nodes()[0].x, 350.0);
		assert_eq!(sim.snapshot().frame, 0);
		sim.set_running(true);
		assert!(sim.tick(DT));
		assert_eq!(sim.snapshot().frame, 1);
	}

	#[test]
	fn oversized_dt_is_clamped() {
		let mut a = two_nodes(SimulationParams::default(), 350.0, 450.0);
		let mut b = two_nodes(SimulationParams::default(), 350.0, 450.0);
		a.step(10.0);
		b.step(0.05);
		assert_eq!(a.graph.nodes()[0].x, b.graph.nodes()[0].x);
	}

	#[test]
	fn degree_history_is_bounded() {
		let params = SimulationParams {
			history_len: 5,
			..SimulationParams::default()
		};
		let mut sim = two_nodes(params, 300.0, 500.0);
		sim.graph.add_link("a", "b", 1.0).unwrap();
		for _ in 0..20 {
			sim.step(DT);
		}
		let history = sim.snapshot().degree_history;
		assert_eq!(history, vec![1.0; 5]);
	}

	#[test]
	fn observers_receive_snapshots_until_unsubscribed() {
		let mut sim = two_nodes(SimulationParams::default(), 300.0, 500.0);
		let seen = Rc::new(RefCell::new(Vec::new()));
		let sink = seen.clone();
		let id = sim.subscribe(move |snap| sink.borrow_mut().push(snap.clone()));
		sim.step(DT);
		sim.step(DT);
		assert!(sim.unsubscribe(id));
		assert!(!sim.unsubscribe(id));
		sim.step(DT);

		let seen = seen.borrow();
		assert_eq!(seen.len(), 2);
		assert_eq!(seen[1].frame, 2);
		assert_eq!(seen[1].node_count, 2);
		assert_eq!(seen[1].link_count, 0);
		assert_eq!(seen[1].degree_history, vec![0.0, 0.0]);
	}

	#[test]
	fn seeding_skips_dangling_links() {
		let data = ConceptMapData {
			nodes: vec![
				MapNode {
					id: "x".into(),
					label: "X".into(),
					category: NodeCategory::Core,
				},
				MapNode {
					id: "y".into(),
					label: "Y".into(),
					category: NodeCategory::Example,
				},
			],
			links: vec![
				MapLink {
					source: "x".into(),
					target: "y".into(),
					strength: 1.0,
				},
				MapLink {
					source: "x".into(),
					target: "ghost".into(),
					strength: 1.0,
				},
			],
		};
		let mut sim = Simulation::from_data(&data, SimulationParams::default(), 800.0, 600.0);
		assert_eq!(sim.graph.node_count(), 2);
		assert_eq!(sim.graph.link_count(), 1);
		sim.step(DT);
		assert!(sim.graph.nodes().iter().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	proptest! {
		#[test]
		fn particle_fraction_stays_in_unit_interval(
			start in 0.0f64..1.0,
			speed in 1e-6f64..50.0,
			dts in proptest::collection::vec(0.0f64..5.0, 1..50),
		) {
			let mut particle = Particle { t: start, speed };
			for dt in dts {
				particle.advance(dt);
				prop_assert!(particle.t >= 0.0 && particle.t < 1.0);
			}
		}

		#[test]
		fn pinned_nodes_ignore_forces(
			px in 0.0f64..800.0,
			py in 0.0f64..600.0,
			others in proptest::collection::vec((0.0f64..800.0, 0.0f64..600.0), 1..8),
		) {
			let mut sim = Simulation::new(SimulationParams::default(), 800.0, 600.0);
			sim.graph.add_node(NewNode::new("pinned", "P", NodeCategory::Core).at(px, py)).unwrap();
			for (i, (x, y)) in others.iter().enumerate() {
				let id = format!("n{i}");
				sim.graph.add_node(NewNode::new(id.clone(), id.clone(), NodeCategory::Concept).at(*x, *y)).unwrap();
				sim.graph.add_link("pinned", &id, 1.0).unwrap();
			}
			sim.graph.pin(0, px, py).unwrap();
			for _ in 0..5 {
				sim.step(DT);
				let node = &sim.graph.nodes()[0];
				prop_assert_eq!((node.x, node.y, node.vx, node.vy), (px, py, 0.0, 0.0));
			}
		}
	}
}
