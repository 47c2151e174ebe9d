//! Climate scenarios for the Ross-Macdonald model.
//!
//! A sweep varies either temperature or humidity in fixed steps while the
//! other variable stays put. Every scenario converts its climate to biting
//! rate and vector density, reruns the model with those coefficients and
//! keeps the human infected series for comparison.

use crate::bionomics::{Bionomics, Climate};
use crate::error::{SimResult, SimulationError};
use crate::integrator::IntegratorSettings;
use crate::model::ModelKind;
use crate::params::{ModelParameters, RossMacdonaldParameters};
use crate::simulation::simulate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const MIN_SCENARIOS: usize = 2;
pub const MAX_SCENARIOS: usize = 5;

/// Largest number of decimals tried when making scenario labels distinct.
const MAX_LABEL_DECIMALS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepVariable {
    Temperature,
    Humidity,
}

impl fmt::Display for SweepVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepVariable::Temperature => f.write_str("temperature"),
            SweepVariable::Humidity => f.write_str("humidity"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepSpec {
    pub variable: SweepVariable,
    /// Value of the swept variable in the first scenario.
    pub base: f64,
    pub step: f64,
    pub count: usize,
    /// Value of the variable that is not swept.
    pub fixed: f64,
}

impl SweepSpec {
    pub fn validate(&self) -> SimResult<()> {
        if !(MIN_SCENARIOS..=MAX_SCENARIOS).contains(&self.count) {
            return Err(SimulationError::invalid(
                "count",
                format!(
                    "a sweep runs between {MIN_SCENARIOS} and {MAX_SCENARIOS} scenarios, got {}",
                    self.count
                ),
            ));
        }
        for (name, value) in [("base", self.base), ("step", self.step), ("fixed", self.fixed)] {
            if !value.is_finite() {
                return Err(SimulationError::invalid(name, "must be finite"));
            }
        }
        if self.step == 0.0 {
            return Err(SimulationError::invalid(
                "step",
                "a zero step would repeat the same scenario",
            ));
        }
        self.labels().map(|_| ())
    }

    /// Swept values in scenario order: `base + i·step`.
    pub fn values(&self) -> Vec<f64> {
        (0..self.count)
            .map(|i| self.base + i as f64 * self.step)
            .collect()
    }

    pub fn climate(&self, value: f64) -> Climate {
        match self.variable {
            SweepVariable::Temperature => Climate::new(value, self.fixed),
            SweepVariable::Humidity => Climate::new(self.fixed, value),
        }
    }

    /// One label per scenario. Swept values are printed with the fewest
    /// decimals (at least one) that show each value and keep the labels
    /// distinct; the fixed value with as many as it needs.
    pub fn labels(&self) -> SimResult<Vec<String>> {
        let values = self.values();
        let first = values
            .iter()
            .map(|&v| label_decimals(v))
            .max()
            .unwrap_or(1);
        let climates: Vec<Climate> = values.into_iter().map(|v| self.climate(v)).collect();
        for decimals in first..=MAX_LABEL_DECIMALS {
            let labels: Vec<String> = climates
                .iter()
                .map(|climate| self.label(climate, decimals))
                .collect();
            let distinct: BTreeSet<&String> = labels.iter().collect();
            if distinct.len() == labels.len() {
                return Ok(labels);
            }
        }
        Err(SimulationError::invalid(
            "step",
            format!("{} is too small to tell scenarios apart", self.step),
        ))
    }

    fn label(&self, climate: &Climate, decimals: usize) -> String {
        let fixed = label_decimals(self.fixed);
        let (t, h) = match self.variable {
            SweepVariable::Temperature => (decimals, fixed),
            SweepVariable::Humidity => (fixed, decimals),
        };
        format!("T={:.t$}°C, H={:.h$}%", climate.temperature, climate.humidity)
    }
}

/// Fewest decimals (at least one) that print `value` without visibly
/// rounding it.
fn label_decimals(value: f64) -> usize {
    let tolerance = 1e-9 * value.abs().max(1.0);
    (1..=MAX_LABEL_DECIMALS)
        .find(|&d| {
            format!("{value:.d$}")
                .parse::<f64>()
                .is_ok_and(|printed| (printed - value).abs() <= tolerance)
        })
        .unwrap_or(MAX_LABEL_DECIMALS)
}

/// Outcome of one climate scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub label: String,
    pub climate: Climate,
    pub bionomics: Bionomics,
    /// m·a²·b·c / (γ·μ) for this scenario's coefficients.
    pub r0: Option<f64>,
    pub days: Vec<f64>,
    pub infected_humans: Vec<f64>,
}

impl ScenarioResult {
    pub fn peak_infected_humans(&self) -> f64 {
        self.infected_humans.iter().copied().fold(0.0, f64::max)
    }
}

/// Ross-Macdonald parameters for climate runs from a name-keyed map.
///
/// `a` and `m` come from the climate, so they may be omitted here; every other
/// Ross-Macdonald field is required. Ranges are checked per scenario, once
/// the climate coefficients are known.
pub fn climate_base_from_named(
    values: &BTreeMap<String, f64>,
) -> SimResult<RossMacdonaldParameters> {
    let mut values = values.clone();
    values.entry("a".to_string()).or_insert(0.0);
    values.entry("m".to_string()).or_insert(0.0);
    match ModelParameters::from_named_unchecked(ModelKind::RossMacdonald, &values)? {
        ModelParameters::RossMacdonald(params) => Ok(params),
        other => Err(SimulationError::invalid(
            "model",
            format!("climate scenarios need RossMacdonald parameters, got {}", other.kind()),
        )),
    }
}

/// Runs the model once with biting rate and vector density derived from
/// `climate`. The `a` and `m` of `base` are ignored.
pub fn run_climate_scenario(
    base: &RossMacdonaldParameters,
    climate: Climate,
    settings: &IntegratorSettings,
) -> SimResult<ScenarioResult> {
    let label = format!(
        "T={:.t$}°C, H={:.h$}%",
        climate.temperature,
        climate.humidity,
        t = label_decimals(climate.temperature),
        h = label_decimals(climate.humidity)
    );
    run_scenario(base, climate, label, settings)
}

fn run_scenario(
    base: &RossMacdonaldParameters,
    climate: Climate,
    label: String,
    settings: &IntegratorSettings,
) -> SimResult<ScenarioResult> {
    if !climate.temperature.is_finite() || !climate.humidity.is_finite() {
        return Err(SimulationError::invalid(
            "climate",
            "temperature and humidity must be finite",
        ));
    }
    let bionomics = climate.bionomics();
    let params = base.with_bionomics(bionomics);
    let simulation = simulate(&ModelParameters::RossMacdonald(params), settings)?;
    let trajectory = simulation.trajectory();
    Ok(ScenarioResult {
        label,
        climate,
        bionomics,
        r0: params.r0(),
        days: trajectory.times().to_vec(),
        infected_humans: trajectory.column(1),
    })
}

/// Runs every scenario of `sweep` in order. The first failing scenario aborts
/// the sweep.
pub fn run_sweep(
    base: &RossMacdonaldParameters,
    sweep: &SweepSpec,
    settings: &IntegratorSettings,
) -> SimResult<Vec<ScenarioResult>> {
    sweep.validate()?;
    settings.validate()?;
    let labels = sweep.labels()?;
    let mut results = Vec::with_capacity(sweep.count);
    for (index, (value, label)) in sweep.values().into_iter().zip(labels).enumerate() {
        let result = run_scenario(base, sweep.climate(value), label, settings)?;
        log::info!(
            "scenario {}/{} [{}]: {} = {}, a = {:.3}, m = {:.3}, peak infected humans = {:.1}",
            index + 1,
            sweep.count,
            result.label,
            sweep.variable,
            value,
            result.bionomics.biting_rate,
            result.bionomics.vector_density,
            result.peak_infected_humans()
        );
        results.push(result);
    }
    Ok(results)
}
