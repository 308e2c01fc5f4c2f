use leptos::prelude::*;
use log::info;

use super::model::{EnergyConfig, EnergySample, EnergySimulation};
use crate::components::chart::Sparkline;

fn describe(sample: &EnergySample) -> String {
	let grid = if sample.grid_kw >= 0.0 {
		format!("importing {:.2} kW", sample.grid_kw)
	} else {
		format!("exporting {:.2} kW", -sample.grid_kw)
	};
	format!(
		"{:02}:00  solar {:.2} kW | wind {:.2} kW | load {:.2} kW | battery {:+.2} kW | {}",
		sample.hour % 24,
		sample.solar_kw,
		sample.wind_kw,
		sample.load_kw,
		sample.battery_kw,
		grid,
	)
}

#[component]
pub fn EnergyPanel() -> impl IntoView {
	let sim = RwSignal::new(EnergySimulation::new(EnergyConfig::default()));

	let soc: Signal<Vec<f64>> =
		Signal::derive(move || sim.with(|s| s.history().iter().map(|x| x.soc).collect()));
	let solar: Signal<Vec<f64>> = Signal::derive(move || {
		sim.with(|s| s.history().iter().map(|x| x.solar_kw).collect())
	});
	let latest = move || {
		sim.with(|s| {
			s.history()
				.latest()
				.map(describe)
				.unwrap_or_else(|| "No hours simulated yet".to_string())
		})
	};

	let advance = move |hours: u32| {
		sim.update(|s| {
			s.advance(hours);
		});
		info!("energy simulation advanced {hours}h");
	};

	view! {
		<div class="energy-panel">
			<div class="energy-toolbar">
				<button on:click=move |_| advance(1)>"+1 hour"</button>
				<button on:click=move |_| advance(24)>"+1 day"</button>
				<button on:click=move |_| sim.update(|s| s.reset())>"Reset"</button>
			</div>
			<p class="energy-latest">{latest}</p>
			<p>
				{move || {
					sim.with(|s| {
						format!(
							"Day {} | battery {:.0}% ({:.1} kWh)",
							s.hour() / 24 + 1,
							s.battery().soc * 100.0,
							s.battery().stored_kwh(),
						)
					})
				}}
			</p>
			<div class="energy-charts">
				<label>"State of charge"</label>
				<Sparkline values=soc max=Some(1.0) width=320.0 height=60.0 color="#06d6a0" />
				<label>"Solar output"</label>
				<Sparkline values=solar width=320.0 height=60.0 color="#ffd166" />
			</div>
		</div>
	}
}
