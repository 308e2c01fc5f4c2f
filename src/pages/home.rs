use leptos::prelude::*;

use crate::components::concept_map::{
	ConceptMapCanvas, ConceptMapData, MapLink, MapNode, NodeCategory,
};

/// Starter map shown on first load.
fn seed_map() -> ConceptMapData {
	let nodes = [
		("ownership", "Ownership", NodeCategory::Core),
		("borrowing", "Borrowing", NodeCategory::Concept),
		("lifetimes", "Lifetimes", NodeCategory::Concept),
		("moves", "Move semantics", NodeCategory::Concept),
		("drop", "Drop", NodeCategory::Concept),
		("refs", "&T / &mut T", NodeCategory::Example),
		("vec", "Vec<T>", NodeCategory::Example),
		("book", "The Book ch. 4", NodeCategory::Resource),
		("why-one-mut", "Why only one &mut?", NodeCategory::Question),
	]
	.into_iter()
	.map(|(id, label, category)| MapNode {
		id: id.to_string(),
		label: label.to_string(),
		category,
	})
	.collect();

	let links = [
		("ownership", "borrowing", 1.0),
		("ownership", "moves", 1.0),
		("ownership", "drop", 0.8),
		("borrowing", "lifetimes", 1.0),
		("borrowing", "refs", 0.6),
		("moves", "vec", 0.6),
		("drop", "vec", 0.4),
		("ownership", "book", 0.3),
		("borrowing", "why-one-mut", 0.5),
	]
	.into_iter()
	.map(|(source, target, strength)| MapLink {
		source: source.to_string(),
		target: target.to_string(),
		strength,
	})
	.collect();

	ConceptMapData { nodes, links }
}

/// Concept map editor
#[component]
pub fn Home() -> impl IntoView {
	let map_data = Signal::derive(seed_map);

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ConceptMapCanvas data=map_data fullscreen=true />
				<div class="graph-overlay">
					<h1>"Concept Map"</h1>
					<p class="subtitle">
						"Click a concept to select it, drag to move, double-click to pin. Scroll to zoom."
					</p>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;

	#[test]
	fn seed_links_reference_seed_nodes() {
		let data = seed_map();
		let ids: HashSet<_> = data.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids.len(), data.nodes.len());
		for link in &data.links {
			assert!(ids.contains(link.source.as_str()), "{}", link.source);
			assert!(ids.contains(link.target.as_str()), "{}", link.target);
		}
	}
}
