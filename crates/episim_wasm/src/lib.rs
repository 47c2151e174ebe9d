//! WASM bindings for the episim core library.
//!
//! The bridge converts between JS values and core types and owns no
//! algorithms. Parameters arrive as plain objects keyed by field name, results
//! leave as arrays of row objects ready for charting.

mod simulation;
mod sweep;

pub use simulation::{model_compartments, simulate, simulate_summary};
pub use sweep::{climate_bionomics, climate_scenario, run_sweep};

use episim_core::IntegratorSettings;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::prelude::*;

/// Deserializes an optional JS argument, falling back to `Default` when the
/// caller passed `undefined` or `null`.
pub(crate) fn optional_arg<T: DeserializeOwned + Default>(
    value: JsValue,
    what: &str,
) -> Result<T, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

pub(crate) fn required_arg<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    from_value(value).map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

pub(crate) fn integrator_settings(value: JsValue) -> Result<IntegratorSettings, JsValue> {
    optional_arg(value, "integrator settings")
}

/// Serializes maps as plain objects so rows read as `row["Day"]` in JS.
pub(crate) fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use episim_core::bionomics::Bionomics;
    use wasm_bindgen_test::wasm_bindgen_test;

    #[wasm_bindgen_test]
    fn bionomics_round_trip_through_js() {
        let value = climate_bionomics(25.0, 30.0).expect("bionomics");
        let bionomics: Bionomics = from_value(value).expect("deserialize");
        assert!((bionomics.biting_rate - 0.3).abs() < 1e-12);
        assert_eq!(bionomics.vector_density, 1.0);
    }

    #[wasm_bindgen_test]
    fn simulate_rejects_unknown_model() {
        let params = to_js(&std::collections::BTreeMap::from([("population", 10.0)]))
            .expect("params");
        let message = simulate("SIRS", params, JsValue::UNDEFINED)
            .err()
            .and_then(|err| err.as_string())
            .unwrap_or_default();
        assert!(message.contains("unknown model"), "{message}");
    }
}
