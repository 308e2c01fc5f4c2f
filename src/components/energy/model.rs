//! Hour-by-hour household energy toy model: rooftop PV, a small wind turbine,
//! a battery and the grid as the balancing term.

use std::f64::consts::PI;

use log::debug;

use crate::components::history::RollingHistory;

/// Irradiance at which a panel delivers its nameplate power, W/m².
const STC_IRRADIANCE: f64 = 1000.0;
/// Cell temperature for nameplate power, °C.
const STC_TEMPERATURE: f64 = 25.0;

#[derive(Clone, Debug, PartialEq)]
pub struct SolarArray {
	pub capacity_kw: f64,
	/// Fractional power change per °C away from 25 °C (negative for silicon).
	pub temperature_coefficient: f64,
}

impl Default for SolarArray {
	fn default() -> Self {
		Self {
			capacity_kw: 5.0,
			temperature_coefficient: -0.004,
		}
	}
}

impl SolarArray {
	/// Output scales linearly with irradiance and is derated by temperature.
	pub fn power(&self, irradiance: f64, temperature: f64) -> f64 {
		let sun = (irradiance / STC_IRRADIANCE).max(0.0);
		let derate = 1.0 + self.temperature_coefficient * (temperature - STC_TEMPERATURE);
		(self.capacity_kw * sun * derate).max(0.0)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindTurbine {
	pub rated_kw: f64,
	/// m/s
	pub cut_in: f64,
	pub rated_speed: f64,
	pub cut_out: f64,
}

impl Default for WindTurbine {
	fn default() -> Self {
		Self {
			rated_kw: 3.0,
			cut_in: 3.0,
			rated_speed: 12.0,
			cut_out: 25.0,
		}
	}
}

impl WindTurbine {
	/// Cubic between cut-in and rated speed, flat up to cut-out, zero elsewhere.
	pub fn power(&self, wind_speed: f64) -> f64 {
		if wind_speed < self.cut_in || wind_speed >= self.cut_out {
			return 0.0;
		}
		if wind_speed >= self.rated_speed {
			return self.rated_kw;
		}
		let span = self.rated_speed.powi(3) - self.cut_in.powi(3);
		if span <= 0.0 {
			return self.rated_kw;
		}
		self.rated_kw * (wind_speed.powi(3) - self.cut_in.powi(3)) / span
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct Battery {
	pub capacity_kwh: f64,
	/// State of charge, 0..=1.
	pub soc: f64,
	pub max_charge_kw: f64,
	pub max_discharge_kw: f64,
	/// Fraction of charging energy that ends up stored.
	pub efficiency: f64,
}

impl Default for Battery {
	fn default() -> Self {
		Self {
			capacity_kwh: 10.0,
			soc: 0.5,
			max_charge_kw: 3.0,
			max_discharge_kw: 3.0,
			efficiency: 0.9,
		}
	}
}

impl Battery {
	pub fn stored_kwh(&self) -> f64 {
		self.soc * self.capacity_kwh
	}

	/// Offer `net_kw` for `hours`: positive is surplus to store, negative is demand
	/// to cover. Returns the power actually taken (+) or delivered (-).
	pub fn apply(&mut self, net_kw: f64, hours: f64) -> f64 {
		if hours <= 0.0 || self.capacity_kwh <= 0.0 || !net_kw.is_finite() {
			return 0.0;
		}
		let flow = if net_kw > 0.0 {
			let room_kwh = (1.0 - self.soc) * self.capacity_kwh;
			let kw = net_kw
				.min(self.max_charge_kw)
				.min(room_kwh / (self.efficiency.max(f64::EPSILON) * hours));
			self.soc += kw * hours * self.efficiency / self.capacity_kwh;
			kw
		} else {
			let kw = (-net_kw)
				.min(self.max_discharge_kw)
				.min(self.stored_kwh() / hours);
			self.soc -= kw * hours / self.capacity_kwh;
			-kw
		};
		self.soc = self.soc.clamp(0.0, 1.0);
		flow
	}
}

/// Weather and demand for one hour.
#[derive(Clone, Debug, PartialEq)]
pub struct Conditions {
	pub hour: f64,
	/// W/m²
	pub irradiance: f64,
	/// °C
	pub temperature: f64,
	/// m/s
	pub wind_speed: f64,
	pub load_kw: f64,
}

impl Conditions {
	/// Fair-weather day: sun from 06:00 to 18:00, breezier at night,
	/// morning and evening demand peaks.
	pub fn diurnal(hour: f64) -> Self {
		let h = hour.rem_euclid(24.0);
		let irradiance = if (6.0..=18.0).contains(&h) {
			STC_IRRADIANCE * (PI * (h - 6.0) / 12.0).sin().max(0.0)
		} else {
			0.0
		};
		let bump = |centre: f64, width: f64| (-((h - centre) / width).powi(2)).exp();
		Self {
			hour: h,
			irradiance,
			temperature: 15.0 + 10.0 * (PI * (h - 9.0) / 12.0).sin(),
			wind_speed: 7.0 + 3.0 * (2.0 * PI * h / 24.0 + 1.3).cos(),
			load_kw: 0.6 + 1.4 * bump(19.0, 2.5) + 0.8 * bump(8.0, 1.5),
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnergySample {
	pub hour: u32,
	pub solar_kw: f64,
	pub wind_kw: f64,
	pub load_kw: f64,
	/// Positive while charging.
	pub battery_kw: f64,
	/// Positive is import, negative export.
	pub grid_kw: f64,
	pub soc: f64,
}

#[derive(Clone, Debug)]
pub struct EnergyConfig {
	pub solar: SolarArray,
	pub wind: WindTurbine,
	pub battery: Battery,
	pub history_len: usize,
}

impl Default for EnergyConfig {
	fn default() -> Self {
		Self {
			solar: SolarArray::default(),
			wind: WindTurbine::default(),
			battery: Battery::default(),
			history_len: 24 * 7,
		}
	}
}

#[derive(Clone, Debug)]
pub struct EnergySimulation {
	config: EnergyConfig,
	battery: Battery,
	hour: u32,
	history: RollingHistory<EnergySample>,
}

impl EnergySimulation {
	pub fn new(config: EnergyConfig) -> Self {
		Self {
			battery: config.battery.clone(),
			history: RollingHistory::new(config.history_len),
			hour: 0,
			config,
		}
	}

	pub fn battery(&self) -> &Battery {
		&self.battery
	}

	pub fn history(&self) -> &RollingHistory<EnergySample> {
		&self.history
	}

	pub fn hour(&self) -> u32 {
		self.hour
	}

	/// Simulate one hour under the given conditions.
	pub fn step(&mut self, conditions: &Conditions) -> EnergySample {
		let solar_kw = self
			.config
			.solar
			.power(conditions.irradiance, conditions.temperature);
		let wind_kw = self.config.wind.power(conditions.wind_speed);
		let load_kw = conditions.load_kw.max(0.0);
		let battery_kw = self.battery.apply(solar_kw + wind_kw - load_kw, 1.0);
		let sample = EnergySample {
			hour: self.hour,
			solar_kw,
			wind_kw,
			load_kw,
			battery_kw,
			grid_kw: load_kw + battery_kw - solar_kw - wind_kw,
			soc: self.battery.soc,
		};
		debug!(
			"hour {}: solar {:.2} kW, wind {:.2} kW, soc {:.2}",
			sample.hour, solar_kw, wind_kw, sample.soc
		);
		self.hour += 1;
		self.history.push(sample.clone());
		sample
	}

	/// Run `hours` steps of the diurnal profile.
	pub fn advance(&mut self, hours: u32) -> Option<EnergySample> {
		let mut last = None;
		for _ in 0..hours {
			let conditions = Conditions::diurnal(self.hour as f64);
			last = Some(self.step(&conditions));
		}
		last
	}

	pub fn reset(&mut self) {
		self.battery = self.config.battery.clone();
		self.hour = 0;
		self.history.clear();
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn solar_scales_with_irradiance() {
		let pv = SolarArray::default();
		assert_eq!(pv.power(0.0, 25.0), 0.0);
		assert!((pv.power(1000.0, 25.0) - 5.0).abs() < 1e-12);
		assert!((pv.power(500.0, 25.0) - 2.5).abs() < 1e-12);
		assert!(pv.power(1000.0, 45.0) < pv.power(1000.0, 25.0));
		assert_eq!(pv.power(-50.0, 25.0), 0.0);
	}

	#[test]
	fn wind_follows_cubic_curve() {
		let wt = WindTurbine::default();
		assert_eq!(wt.power(2.9), 0.0);
		assert_eq!(wt.power(3.0), 0.0);
		assert_eq!(wt.power(12.0), 3.0);
		assert_eq!(wt.power(20.0), 3.0);
		assert_eq!(wt.power(25.0), 0.0);
		let mid = wt.power(8.0);
		let expected = 3.0 * (512.0 - 27.0) / (1728.0 - 27.0);
		assert!((mid - expected).abs() < 1e-12);
	}

	#[test]
	fn battery_charge_is_rate_limited() {
		let mut b = Battery::default();
		let taken = b.apply(10.0, 1.0);
		assert_eq!(taken, 3.0);
		assert!((b.soc - (0.5 + 3.0 * 0.9 / 10.0)).abs() < 1e-12);
	}

	#[test]
	fn battery_stops_at_full_and_empty() {
		let mut b = Battery {
			soc: 0.95,
			..Battery::default()
		};
		let taken = b.apply(3.0, 1.0);
		assert!(taken < 3.0);
		assert!((b.soc - 1.0).abs() < 1e-12);
		assert!(b.apply(3.0, 1.0) < 1e-9);

		let mut b = Battery {
			soc: 0.1,
			..Battery::default()
		};
		assert!((b.apply(-5.0, 1.0) + 1.0).abs() < 1e-12);
		assert_eq!(b.soc, 0.0);
		assert_eq!(b.apply(-5.0, 1.0), 0.0);
	}

	#[test]
	fn step_balances_power() {
		let mut sim = EnergySimulation::new(EnergyConfig::default());
		for _ in 0..48 {
			let s = sim.advance(1).unwrap();
			let supply = s.solar_kw + s.wind_kw + s.grid_kw;
			let demand = s.load_kw + s.battery_kw;
			assert!((supply - demand).abs() < 1e-9, "hour {} unbalanced", s.hour);
		}
		assert_eq!(sim.hour(), 48);
		assert_eq!(sim.history().iter().count(), 48);
	}

	#[test]
	fn diurnal_profile_is_dark_at_night() {
		assert_eq!(Conditions::diurnal(2.0).irradiance, 0.0);
		assert_eq!(Conditions::diurnal(26.0).hour, 2.0);
		assert!((Conditions::diurnal(12.0).irradiance - 1000.0).abs() < 1e-9);
		assert!(Conditions::diurnal(19.0).load_kw > Conditions::diurnal(3.0).load_kw);
	}

	#[test]
	fn reset_restores_initial_battery() {
		let mut sim = EnergySimulation::new(EnergyConfig::default());
		sim.advance(30);
		sim.reset();
		assert_eq!(sim.hour(), 0);
		assert!(sim.history().latest().is_none());
		assert_eq!(sim.battery(), &Battery::default());
	}

	proptest! {
		#[test]
		fn soc_stays_in_unit_interval(
			start in 0.0f64..=1.0,
			flows in proptest::collection::vec((-20.0f64..20.0, 0.01f64..4.0), 1..64),
		) {
			let mut b = Battery { soc: start, ..Battery::default() };
			for (net, hours) in flows {
				let flow = b.apply(net, hours);
				prop_assert!((0.0..=1.0).contains(&b.soc));
				prop_assert!(flow.abs() <= net.abs() + 1e-12);
			}
		}
	}
}
