use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::ConceptMapState;
use super::types::{ConceptLink, ConceptNode};

const BACKGROUND: &str = "#1a1a2e";
const PARTICLE_RADIUS: f64 = 2.5;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

pub fn render(state: &ConceptMapState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width(), state.height());
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_links(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn endpoints<'a>(state: &'a ConceptMapState, link: &ConceptLink) -> Option<(&'a ConceptNode, &'a ConceptNode)> {
	let nodes = state.sim.graph.nodes();
	Some((nodes.get(link.source)?, nodes.get(link.target)?))
}

fn draw_links(state: &ConceptMapState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let t = ease_out_cubic(state.hover.highlight_t);

	for link in state.sim.graph.links() {
		let Some((a, b)) = endpoints(state, link) else {
			continue;
		};
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let dist = dx.hypot(dy);
		if dist < 0.001 {
			continue;
		}

		let is_highlighted = state.is_highlighted(link.source) && state.is_highlighted(link.target);
		// Highlighted links brighten while the rest dim as the hover fades in
		let alpha = if is_highlighted {
			0.55 + 0.35 * t
		} else {
			0.55 - 0.4 * t
		};
		let width = (1.0 + link.strength) / k;

		let (ux, uy) = (dx / dist, dy / dist);
		let (x1, y1) = (a.x + ux * a.radius, a.y + uy * a.radius);
		let (x2, y2) = (b.x - ux * b.radius, b.y - uy * b.radius);

		ctx.set_stroke_style_str(&format!("rgba(100, 180, 255, {})", alpha));
		ctx.set_line_width(width);
		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
		ctx.stroke();

		ctx.set_fill_style_str(&format!("rgba(200, 230, 255, {})", alpha));
		for particle in &link.particles {
			let (px, py) = (x1 + (x2 - x1) * particle.t, y1 + (y2 - y1) * particle.t);
			ctx.begin_path();
			let _ = ctx.arc(px, py, PARTICLE_RADIUS / k.max(0.5), 0.0, 2.0 * PI);
			ctx.fill();
		}
	}
}

fn draw_nodes(state: &ConceptMapState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let font = format!("{}px sans-serif", 12.0 / k.max(0.5));

	for (idx, node) in state.sim.graph.nodes().iter().enumerate() {
		let highlighted = state.is_highlighted(idx);
		let (alpha, radius) = if has_highlight && !highlighted {
			(1.0 - 0.7 * t, node.radius * (1.0 - 0.15 * t))
		} else if state.is_hovered(idx) {
			(1.0, node.radius * (1.0 + 0.25 * t))
		} else {
			(1.0, node.radius)
		};

		if state.is_hovered(idx) && t > 0.01 {
			draw_glow(ctx, node.x, node.y, radius, radius * (1.8 + 1.2 * t), 0.35 * t);
		}

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(node.category.color());
		ctx.fill();

		if node.is_pinned() {
			ctx.set_stroke_style_str(if node.fixed { "#ffd166" } else { "rgba(255, 255, 255, 0.6)" });
			ctx.set_line_width(2.0 / k);
			ctx.stroke();
		}

		if state.selected == Some(idx) {
			ctx.begin_path();
			let _ = ctx.arc(node.x, node.y, radius + 4.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(if state.linking { "#06d6a0" } else { "white" });
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.85));
		ctx.set_font(&font);
		let _ = ctx.fill_text(&node.label, node.x + radius + 4.0, node.y + 4.0);
		ctx.set_global_alpha(1.0);
	}
}

fn draw_glow(ctx: &CanvasRenderingContext2d, x: f64, y: f64, inner: f64, outer: f64, alpha: f64) {
	let Ok(gradient) = ctx.create_radial_gradient(x, y, inner * 0.3, x, y, outer) else {
		return;
	};
	let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
	let _ = gradient.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
	let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
	ctx.begin_path();
	let _ = ctx.arc(x, y, outer, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}
