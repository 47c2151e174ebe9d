//! Climate bindings: bionomics conversion, single scenarios and sweeps.

use crate::{integrator_settings, required_arg, to_js};
use episim_core::bionomics::{Bionomics, Climate};
use episim_core::sweep::{
    climate_base_from_named, run_climate_scenario, run_sweep as core_sweep, ScenarioResult,
    SweepSpec,
};
use episim_core::table::Table;
use episim_core::IntegratorSettings;
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

/// Per-scenario figures shown next to the comparison chart.
#[derive(Debug, Serialize)]
pub(crate) struct ScenarioOverview {
    label: String,
    climate: Climate,
    bionomics: Bionomics,
    r0: Option<f64>,
    peak_infected_humans: f64,
}

impl From<&ScenarioResult> for ScenarioOverview {
    fn from(result: &ScenarioResult) -> Self {
        Self {
            label: result.label.clone(),
            climate: result.climate,
            bionomics: result.bionomics,
            r0: result.r0,
            peak_infected_humans: result.peak_infected_humans(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SweepPayload {
    scenarios: Vec<ScenarioOverview>,
    /// Long format: `Scenario`, `Day`, `Human Infected`.
    table: Table,
}

pub(crate) fn sweep_payload(
    values: &BTreeMap<String, f64>,
    sweep: &SweepSpec,
    settings: &IntegratorSettings,
) -> Result<SweepPayload, String> {
    let base = climate_base_from_named(values).map_err(|e| format!("Sweep failed: {}", e))?;
    let results = core_sweep(&base, sweep, settings).map_err(|e| format!("Sweep failed: {}", e))?;
    Ok(SweepPayload {
        scenarios: results.iter().map(ScenarioOverview::from).collect(),
        table: Table::from_scenarios(&results),
    })
}

#[wasm_bindgen]
pub fn climate_bionomics(temperature: f64, humidity: f64) -> Result<JsValue, JsValue> {
    to_js(&Climate::new(temperature, humidity).bionomics())
}

/// Runs Ross-Macdonald once with `a` and `m` derived from the given climate.
#[wasm_bindgen]
pub fn climate_scenario(
    params: JsValue,
    temperature: f64,
    humidity: f64,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let values: BTreeMap<String, f64> = required_arg(params, "parameters")?;
    let settings = integrator_settings(settings)?;
    let base = climate_base_from_named(&values)
        .map_err(|e| JsValue::from_str(&format!("Scenario failed: {}", e)))?;
    let result = run_climate_scenario(&base, Climate::new(temperature, humidity), &settings)
        .map_err(|e| JsValue::from_str(&format!("Scenario failed: {}", e)))?;
    to_js(&result)
}

/// Runs a temperature or humidity sweep and returns the per-scenario figures
/// together with the long-format comparison table.
#[wasm_bindgen]
pub fn run_sweep(params: JsValue, sweep: JsValue, settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let values: BTreeMap<String, f64> = required_arg(params, "parameters")?;
    let sweep: SweepSpec = required_arg(sweep, "sweep")?;
    let settings = integrator_settings(settings)?;
    let payload = sweep_payload(&values, &sweep, &settings).map_err(|e| JsValue::from_str(&e))?;
    to_js(&payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use episim_core::sweep::SweepVariable;

    fn base_values() -> BTreeMap<String, f64> {
        [
            ("human_population", 1000.0),
            ("initial_infected_humans", 10.0),
            ("initial_infected_vectors", 0.0),
            ("b", 0.5),
            ("c", 0.5),
            ("gamma", 0.1),
            ("mu", 0.1),
            ("days", 30.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn sweep_payload_has_one_overview_per_scenario() {
        let sweep = SweepSpec {
            variable: SweepVariable::Humidity,
            base: 40.0,
            step: 20.0,
            count: 4,
            fixed: 27.0,
        };
        let payload =
            sweep_payload(&base_values(), &sweep, &IntegratorSettings::default()).expect("sweep");
        assert_eq!(payload.scenarios.len(), 4);
        assert_eq!(payload.table.len(), 4 * 30);
        assert_eq!(payload.scenarios[0].label, "T=27.0°C, H=40.0%");
        assert!(payload.scenarios.iter().all(|s| s.r0.is_some()));
    }

    #[test]
    fn sweep_errors_are_prefixed() {
        let sweep = SweepSpec {
            variable: SweepVariable::Temperature,
            base: 20.0,
            step: 1.0,
            count: 9,
            fixed: 50.0,
        };
        let message =
            sweep_payload(&base_values(), &sweep, &IntegratorSettings::default()).unwrap_err();
        assert!(message.starts_with("Sweep failed:"), "{message}");
        assert!(message.contains("count"), "{message}");
    }
}
