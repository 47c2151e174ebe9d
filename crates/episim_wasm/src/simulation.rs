//! Single-model simulation bindings.

use crate::{integrator_settings, required_arg, to_js};
use episim_core::simulation::{simulate_named, Simulation};
use episim_core::{IntegratorSettings, ModelKind};
use serde::Serialize;
use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

/// Registry entry exposed to the control panel so it can build its forms.
#[derive(Debug, Serialize)]
pub(crate) struct ModelSchema {
    model: String,
    compartments: Vec<&'static str>,
    required_fields: Vec<&'static str>,
}

pub(crate) fn model_schema(model: &str) -> Result<ModelSchema, String> {
    let kind: ModelKind = model.parse().map_err(|e| format!("{}", e))?;
    Ok(ModelSchema {
        model: kind.to_string(),
        compartments: kind.compartments().to_vec(),
        required_fields: kind.required_fields().to_vec(),
    })
}

pub(crate) fn run_named(
    model: &str,
    values: &BTreeMap<String, f64>,
    settings: &IntegratorSettings,
) -> Result<Simulation, String> {
    let kind: ModelKind = model
        .parse()
        .map_err(|e| format!("Simulation failed: {}", e))?;
    simulate_named(kind, values, settings).map_err(|e| format!("Simulation failed: {}", e))
}

/// Runs one model and returns its table: one row object per grid time, keyed
/// by `Day` and the compartment names.
#[wasm_bindgen]
pub fn simulate(model: &str, params: JsValue, settings: JsValue) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let values: BTreeMap<String, f64> = required_arg(params, "parameters")?;
    let settings = integrator_settings(settings)?;
    let simulation =
        run_named(model, &values, &settings).map_err(|e| JsValue::from_str(&e))?;
    let table = simulation
        .table()
        .map_err(|e| JsValue::from_str(&format!("Simulation failed: {}", e)))?;
    to_js(&table)
}

/// Runs one model and returns peak, final values, R0 and related figures.
#[wasm_bindgen]
pub fn simulate_summary(
    model: &str,
    params: JsValue,
    settings: JsValue,
) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let values: BTreeMap<String, f64> = required_arg(params, "parameters")?;
    let settings = integrator_settings(settings)?;
    let simulation =
        run_named(model, &values, &settings).map_err(|e| JsValue::from_str(&e))?;
    to_js(&simulation.summary())
}

#[wasm_bindgen]
pub fn model_compartments(model: &str) -> Result<JsValue, JsValue> {
    let schema = model_schema(model).map_err(|e| JsValue::from_str(&e))?;
    to_js(&schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sir_values() -> BTreeMap<String, f64> {
        [
            ("population", 1000.0),
            ("initial_infected", 10.0),
            ("initial_recovered", 0.0),
            ("beta", 0.2),
            ("gamma", 0.1),
            ("days", 100.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    #[test]
    fn runs_named_parameters_into_a_table() {
        let simulation = run_named("sir", &sir_values(), &IntegratorSettings::default())
            .expect("simulation");
        let table = simulation.table().expect("table");
        assert_eq!(table.len(), 100);
        assert_eq!(table.columns(), ["Day", "Susceptible", "Infected", "Recovered"]);
    }

    #[test]
    fn reports_missing_fields_and_unknown_models() {
        let mut values = sir_values();
        values.remove("gamma");
        let message = run_named("SIR", &values, &IntegratorSettings::default()).unwrap_err();
        assert!(message.starts_with("Simulation failed:"));
        assert!(message.contains("`gamma`"), "{message}");

        let message = run_named("SIRS", &sir_values(), &IntegratorSettings::default()).unwrap_err();
        assert!(message.contains("unknown model"), "{message}");
    }

    #[test]
    fn schema_lists_compartments_and_fields() {
        let schema = model_schema("RossMacdonald").expect("schema");
        assert_eq!(schema.model, "RossMacdonald");
        assert_eq!(schema.compartments.len(), 5);
        assert!(schema.required_fields.contains(&"mu"));
        assert!(model_schema("").is_err());
    }
}
