use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::{info, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::error::GraphError;
use super::render;
use super::simulation::{FrameSnapshot, ObserverId};
use super::state::{ClickOutcome, ConceptMapState};
use super::types::{ConceptMapData, NodeCategory};
use crate::components::chart::Sparkline;

type SharedState = Rc<RefCell<Option<ConceptMapState>>>;
type SharedClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

const NOTICE_TTL: Duration = Duration::from_secs(4);

fn now_ms() -> f64 {
	web_sys::window()
		.and_then(|w| w.performance())
		.map(|p| p.now())
		.unwrap_or_else(js_sys::Date::now)
}

fn canvas_point(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Browser resources held by one mounted canvas.
#[derive(Clone, Default)]
struct CanvasHandles {
	state: SharedState,
	animate: SharedClosure,
	frame_request: Rc<Cell<Option<i32>>>,
	resize: SharedClosure,
	observer: Rc<Cell<Option<ObserverId>>>,
}

impl CanvasHandles {
	/// Stop the frame loop and drop everything the closures keep alive.
	/// The animate closure holds its own cell, so it only goes away here.
	fn release(&self) {
		let window = web_sys::window();
		if let (Some(win), Some(id)) = (window.as_ref(), self.frame_request.take()) {
			let _ = win.cancel_animation_frame(id);
		}
		if let Some(cb) = self.resize.borrow_mut().take() {
			if let Some(win) = window.as_ref() {
				let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}
		self.animate.borrow_mut().take();
		if detach_map(&self.state, &self.observer).is_some() {
			info!("concept map canvas released");
		}
	}
}

/// Take the map out of the shared cell and drop its snapshot observer.
fn detach_map(state: &SharedState, observer: &Cell<Option<ObserverId>>) -> Option<ConceptMapState> {
	let mut map = state.borrow_mut().take()?;
	if let Some(id) = observer.take() {
		map.sim.unsubscribe(id);
	}
	Some(map)
}

/// Owner-scoped wrapper so the handles are released even if cleanup never reaches them.
struct CanvasGuard(CanvasHandles);

impl Drop for CanvasGuard {
	fn drop(&mut self) {
		self.0.release();
	}
}

/// Toolbar signals mirrored from the canvas state after every interaction.
#[derive(Clone, Copy)]
struct Controls {
	has_selection: RwSignal<bool>,
	selection: RwSignal<Option<String>>,
	linking: RwSignal<bool>,
	running: RwSignal<bool>,
	notice: RwSignal<Option<String>>,
}

impl Controls {
	fn new() -> Self {
		Self {
			has_selection: RwSignal::new(false),
			selection: RwSignal::new(None),
			linking: RwSignal::new(false),
			running: RwSignal::new(true),
			notice: RwSignal::new(None),
		}
	}

	fn sync(&self, s: &ConceptMapState) {
		self.has_selection.set(s.selected.is_some());
		self.selection.set(s.selected.and_then(|idx| {
			let graph = &s.sim.graph;
			graph
				.node(idx)
				.map(|n| format!("{} | degree {}", n.label, graph.degree(idx)))
		}));
		self.linking.set(s.linking);
		self.running.set(s.sim.is_running());
	}

	fn notify(&self, message: String) {
		let notice = self.notice;
		notice.set(Some(message.clone()));
		set_timeout(
			move || {
				if notice.get_untracked().as_deref() == Some(message.as_str()) {
					notice.set(None);
				}
			},
			NOTICE_TTL,
		);
	}

	fn report(&self, err: GraphError) {
		warn!("concept map: {err}");
		self.notify(err.to_string());
	}
}

#[component]
pub fn ConceptMapCanvas(
	#[prop(into)] data: Signal<ConceptMapData>,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let handles = CanvasHandles::default();
	let state = handles.state.clone();
	let init = handles.clone();
	let guard = StoredValue::new_local(CanvasGuard(handles));

	let controls = Controls::new();
	let stats = RwSignal::new(None::<FrameSnapshot>);
	let degree_history: Signal<Vec<f64>> = Signal::derive(move || {
		stats.with(|s| s.as_ref().map(|s| s.degree_history.clone()).unwrap_or_default())
	});
	let label = RwSignal::new(String::new());
	let category = RwSignal::new(NodeCategory::default());

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			(
				width.unwrap_or_else(|| {
					canvas
						.parent_element()
						.map(|p| p.client_width() as f64)
						.unwrap_or(800.0)
				}),
				height.unwrap_or(600.0),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx: CanvasRenderingContext2d = match canvas.get_context("2d") {
			Ok(Some(ctx)) => match ctx.dyn_into() {
				Ok(ctx) => ctx,
				Err(_) => {
					warn!("2d context has an unexpected type");
					return;
				}
			},
			_ => {
				warn!("canvas has no 2d context");
				return;
			}
		};

		// A remount of the canvas element replaces the previous loop.
		init.release();

		let mut map = ConceptMapState::new(&data.get_untracked(), w, h);
		let observer = map.sim.subscribe(move |snap| stats.set(Some(snap.clone())));
		init.observer.set(Some(observer));
		controls.sync(&map);
		*init.state.borrow_mut() = Some(map);
		info!("concept map canvas mounted at {w}x{h}");

		if fullscreen {
			let (state_resize, canvas_resize) = (init.state.clone(), canvas.clone());
			*init.resize.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				if let Some(ref mut s) = *state_resize.borrow_mut() {
					s.resize(nw, nh);
				}
			}));
			if let Some(ref cb) = *init.resize.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner, request_anim) =
			(init.state.clone(), init.animate.clone(), init.frame_request.clone());
		let mut last = now_ms();
		*init.animate.borrow_mut() = Some(Closure::new(move || {
			request_anim.set(None);
			let now = now_ms();
			let dt = ((now - last) / 1000.0).max(0.0);
			last = now;
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(dt);
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				if let Some(win) = web_sys::window() {
					request_anim.set(win.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
				}
			}
		}));
		if let Some(ref cb) = *init.animate.borrow() {
			init.frame_request
				.set(window.request_animation_frame(cb.as_ref().unchecked_ref()).ok());
		}
	});

	on_cleanup(move || {
		guard.try_with_value(|g| g.0.release());
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let mut guard = state_mu.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		match s.pointer_up() {
			Some(Ok(ClickOutcome::Linked(idx))) => {
				if let Some(link) = s.sim.graph.links().get(idx) {
					info!("linked {}", link.id);
				}
			}
			Some(Err(e)) => controls.report(e),
			_ => {}
		}
		controls.sync(s);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_dc = state.clone();
	let on_dblclick = move |ev: MouseEvent| {
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_dc.borrow_mut() {
			match s.toggle_fixed_at(x, y) {
				Some(Ok(fixed)) => controls.notify(if fixed {
					"Concept fixed in place".to_string()
				} else {
					"Concept released".to_string()
				}),
				Some(Err(e)) => controls.report(e),
				None => {}
			}
		}
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = canvas_point(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			s.zoom_at(x, y, ev.delta_y() < 0.0);
		}
	};

	let state_add = state.clone();
	let on_add = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_add.borrow_mut() {
			match s.add_concept(&label.get_untracked(), category.get_untracked()) {
				Ok(_) => label.set(String::new()),
				Err(e) => controls.report(e),
			}
			controls.sync(s);
		}
	};

	let state_link = state.clone();
	let on_link = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_link.borrow_mut() {
			if s.linking {
				s.linking = false;
			} else if s.start_linking() {
				controls.notify("Click another concept to link it".to_string());
			}
			controls.sync(s);
		}
	};

	let state_rm = state.clone();
	let on_remove = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_rm.borrow_mut() {
			match s.remove_selected() {
				Ok(Some(label)) => controls.notify(format!("Removed \"{label}\"")),
				Ok(None) => {}
				Err(e) => controls.report(e),
			}
			controls.sync(s);
		}
	};

	let state_run = state.clone();
	let on_toggle = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_run.borrow_mut() {
			s.toggle_running();
			controls.sync(s);
		}
	};

	let state_view = state.clone();
	let on_reset_view = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_view.borrow_mut() {
			s.reset_view();
		}
	};

	let on_category = move |ev: web_sys::Event| match event_target_value(&ev).parse::<NodeCategory>() {
		Ok(c) => category.set(c),
		Err(e) => controls.report(e),
	};

	view! {
		<div class="concept-map">
			<div class="concept-map-toolbar">
				<input
					type="text"
					placeholder="New concept"
					prop:value=move || label.get()
					on:input=move |ev| label.set(event_target_value(&ev))
				/>
				<select on:change=on_category>
					{NodeCategory::ALL
						.into_iter()
						.map(|c| {
							view! {
								<option value=c.key() selected=move || category.get() == c>
									{c.label()}
								</option>
							}
						})
						.collect_view()}
				</select>
				<button on:click=on_add>"Add"</button>
				<button on:click=on_link disabled=move || !controls.has_selection.get()>
					{move || if controls.linking.get() { "Cancel link" } else { "Link" }}
				</button>
				<button on:click=on_remove disabled=move || !controls.has_selection.get()>
					"Remove"
				</button>
				<button on:click=on_toggle>
					{move || if controls.running.get() { "Pause" } else { "Resume" }}
				</button>
				<button on:click=on_reset_view>"Reset view"</button>
			</div>
			{move || controls.notice.get().map(|msg| view! { <p class="notice">{msg}</p> })}
			{move || {
				controls.selection.get().map(|text| view! { <p class="selection">{text}</p> })
			}}
			<canvas
				node_ref=canvas_ref
				class="concept-map-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:dblclick=on_dblclick
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="degree-chart">
				<Sparkline values=degree_history />
				<span>
					{move || {
						stats
							.get()
							.map(|s| {
								format!(
									"avg degree {:.2} | {} concepts | {} links",
									s.average_degree,
									s.node_count,
									s.link_count,
								)
							})
							.unwrap_or_default()
					}}
				</span>
			</div>
		</div>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::concept_map::types::MapNode;

	fn mounted(data: &ConceptMapData) -> (CanvasHandles, Rc<Cell<u32>>) {
		let handles = CanvasHandles::default();
		let frames = Rc::new(Cell::new(0));
		let sink = frames.clone();
		let mut map = ConceptMapState::new(data, 800.0, 600.0);
		let id = map.sim.subscribe(move |_| sink.set(sink.get() + 1));
		handles.observer.set(Some(id));
		*handles.state.borrow_mut() = Some(map);
		(handles, frames)
	}

	#[test]
	fn detaching_drops_state_and_observer() {
		let data = ConceptMapData {
			nodes: vec![MapNode {
				id: "a".into(),
				label: "A".into(),
				category: NodeCategory::Core,
			}],
			links: Vec::new(),
		};
		let (handles, frames) = mounted(&data);
		if let Some(ref mut s) = *handles.state.borrow_mut() {
			s.tick(1.0 / 60.0);
		}
		assert_eq!(frames.get(), 1);
		assert_eq!(Rc::strong_count(&frames), 2);

		let mut map = detach_map(&handles.state, &handles.observer).unwrap();
		assert!(handles.state.borrow().is_none());
		assert_eq!(handles.observer.get(), None);
		assert_eq!(Rc::strong_count(&frames), 1);
		map.tick(1.0 / 60.0);
		assert_eq!(frames.get(), 1);

		assert!(detach_map(&handles.state, &handles.observer).is_none());
	}
}
