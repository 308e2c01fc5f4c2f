use leptos::prelude::*;

use crate::components::energy::EnergyPanel;

/// Household energy simulator
#[component]
pub fn Energy() -> impl IntoView {
	view! {
		<div class="page energy-page">
			<h1>"Energy Simulator"</h1>
			<p class="subtitle">"Rooftop solar, a small turbine and a home battery, one hour at a time."</p>
			<EnergyPanel />
		</div>
	}
}
