use leptos::prelude::*;

/// SVG `points` attribute for a left-to-right line over `values`.
///
/// The y axis spans `0..=max`, where `max` defaults to the largest value (at least 1).
pub fn sparkline_points(values: &[f64], max: Option<f64>, width: f64, height: f64) -> String {
	if values.is_empty() {
		return String::new();
	}
	let top = max
		.unwrap_or_else(|| values.iter().copied().fold(1.0, f64::max))
		.max(f64::EPSILON);
	let step = if values.len() > 1 {
		width / (values.len() - 1) as f64
	} else {
		0.0
	};
	values
		.iter()
		.enumerate()
		.map(|(i, v)| {
			let y = height - (v / top).clamp(0.0, 1.0) * height;
			format!("{:.1},{:.1}", i as f64 * step, y)
		})
		.collect::<Vec<_>>()
		.join(" ")
}

#[component]
pub fn Sparkline(
	#[prop(into)] values: Signal<Vec<f64>>,
	#[prop(default = None)] max: Option<f64>,
	#[prop(default = 160.0)] width: f64,
	#[prop(default = 40.0)] height: f64,
	#[prop(default = "#64b4ff")] color: &'static str,
) -> impl IntoView {
	let points = move || values.with(|v| sparkline_points(v, max, width, height));
	view! {
		<svg
			class="sparkline"
			width=width.to_string()
			height=height.to_string()
			viewBox=format!("0 0 {width} {height}")
		>
			<polyline points=points fill="none" stroke=color stroke-width="1.5" />
		</svg>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_series_has_no_points() {
		assert_eq!(sparkline_points(&[], None, 100.0, 20.0), "");
	}

	#[test]
	fn scales_to_largest_value() {
		let points = sparkline_points(&[0.0, 2.0, 4.0], None, 100.0, 20.0);
		assert_eq!(points, "0.0,20.0 50.0,10.0 100.0,0.0");
	}

	#[test]
	fn fixed_max_clamps_outliers() {
		let points = sparkline_points(&[0.5, 3.0], Some(1.0), 10.0, 10.0);
		assert_eq!(points, "0.0,5.0 10.0,0.0");
	}

	#[test]
	fn small_values_use_unit_floor() {
		let points = sparkline_points(&[0.5], None, 10.0, 10.0);
		assert_eq!(points, "0.0,5.0");
	}
}
