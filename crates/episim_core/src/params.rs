//! Typed parameter sets, one per model.
//!
//! Each variant of [`ModelParameters`] carries exactly the fields its model
//! needs, so a typed parameter set can never be incomplete. Values are still
//! range-checked by [`ModelParameters::validate`] before any integration runs.

use crate::bionomics::Bionomics;
use crate::error::{SimResult, SimulationError};
use crate::model::ModelKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiParameters {
    pub population: f64,
    pub initial_infected: f64,
    pub beta: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SisParameters {
    pub population: f64,
    pub initial_infected: f64,
    pub beta: f64,
    pub gamma: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirParameters {
    pub population: f64,
    pub initial_infected: f64,
    pub initial_recovered: f64,
    pub beta: f64,
    pub gamma: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeirParameters {
    pub population: f64,
    pub initial_infected: f64,
    pub initial_recovered: f64,
    pub initial_exposed: f64,
    pub beta: f64,
    pub gamma: f64,
    /// Incubation rate: 1 / mean latent period.
    pub sigma: f64,
    pub days: u32,
}

/// Host-vector parameters. The vector population is `m · human_population`
/// and stays constant because vector births balance vector deaths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RossMacdonaldParameters {
    pub human_population: f64,
    pub initial_infected_humans: f64,
    pub initial_infected_vectors: f64,
    /// Vectors per human.
    pub m: f64,
    /// Bites per vector per day.
    pub a: f64,
    /// Vector-to-human transmission probability per bite.
    pub b: f64,
    /// Human-to-vector transmission probability per bite.
    pub c: f64,
    /// Human recovery rate.
    pub gamma: f64,
    /// Vector mortality rate.
    pub mu: f64,
    pub days: u32,
}

impl RossMacdonaldParameters {
    pub fn vector_population(&self) -> f64 {
        self.m * self.human_population
    }

    /// R0 = m·a²·b·c / (γ·μ); `None` when γ·μ is zero.
    pub fn r0(&self) -> Option<f64> {
        let denominator = self.gamma * self.mu;
        if denominator > 0.0 {
            Some(self.m * self.a * self.a * self.b * self.c / denominator)
        } else {
            None
        }
    }

    /// Copy of these parameters with biting rate and vector density replaced.
    pub fn with_bionomics(&self, bionomics: Bionomics) -> Self {
        Self {
            a: bionomics.biting_rate,
            m: bionomics.vector_density,
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum ModelParameters {
    #[serde(rename = "SI")]
    Si(SiParameters),
    #[serde(rename = "SIS")]
    Sis(SisParameters),
    #[serde(rename = "SIR")]
    Sir(SirParameters),
    #[serde(rename = "SEIR")]
    Seir(SeirParameters),
    #[serde(rename = "RossMacdonald")]
    RossMacdonald(RossMacdonaldParameters),
}

impl ModelParameters {
    pub fn kind(&self) -> ModelKind {
        match self {
            ModelParameters::Si(_) => ModelKind::Si,
            ModelParameters::Sis(_) => ModelKind::Sis,
            ModelParameters::Sir(_) => ModelKind::Sir,
            ModelParameters::Seir(_) => ModelKind::Seir,
            ModelParameters::RossMacdonald(_) => ModelKind::RossMacdonald,
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            ModelParameters::Si(p) => p.days,
            ModelParameters::Sis(p) => p.days,
            ModelParameters::Sir(p) => p.days,
            ModelParameters::Seir(p) => p.days,
            ModelParameters::RossMacdonald(p) => p.days,
        }
    }

    /// Total host population N (N_h for Ross-Macdonald).
    pub fn population(&self) -> f64 {
        match self {
            ModelParameters::Si(p) => p.population,
            ModelParameters::Sis(p) => p.population,
            ModelParameters::Sir(p) => p.population,
            ModelParameters::Seir(p) => p.population,
            ModelParameters::RossMacdonald(p) => p.human_population,
        }
    }

    /// Range checks shared by every entry point.
    pub fn validate(&self) -> SimResult<()> {
        check_population("population", self.population())?;
        if self.days() == 0 {
            return Err(SimulationError::invalid(
                "days",
                "simulation horizon must be at least one day",
            ));
        }

        match self {
            ModelParameters::Si(p) => {
                check_rate("beta", p.beta)?;
                check_initial_counts(p.population, &[("initial_infected", p.initial_infected)])
            }
            ModelParameters::Sis(p) => {
                check_rate("beta", p.beta)?;
                check_rate("gamma", p.gamma)?;
                check_initial_counts(p.population, &[("initial_infected", p.initial_infected)])
            }
            ModelParameters::Sir(p) => {
                check_rate("beta", p.beta)?;
                check_rate("gamma", p.gamma)?;
                check_initial_counts(
                    p.population,
                    &[
                        ("initial_infected", p.initial_infected),
                        ("initial_recovered", p.initial_recovered),
                    ],
                )
            }
            ModelParameters::Seir(p) => {
                check_rate("beta", p.beta)?;
                check_rate("gamma", p.gamma)?;
                check_rate("sigma", p.sigma)?;
                check_initial_counts(
                    p.population,
                    &[
                        ("initial_infected", p.initial_infected),
                        ("initial_recovered", p.initial_recovered),
                        ("initial_exposed", p.initial_exposed),
                    ],
                )
            }
            ModelParameters::RossMacdonald(p) => {
                for (name, value) in [
                    ("m", p.m),
                    ("a", p.a),
                    ("b", p.b),
                    ("c", p.c),
                    ("gamma", p.gamma),
                    ("mu", p.mu),
                ] {
                    check_rate(name, value)?;
                }
                check_initial_counts(
                    p.human_population,
                    &[("initial_infected_humans", p.initial_infected_humans)],
                )?;
                check_count("initial_infected_vectors", p.initial_infected_vectors)?;
                if p.initial_infected_vectors > p.vector_population() {
                    return Err(SimulationError::invalid(
                        "initial_infected_vectors",
                        format!(
                            "{} exceeds the vector population m·N_h = {}",
                            p.initial_infected_vectors,
                            p.vector_population()
                        ),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Initial compartment state, ordered as [`ModelKind::compartments`].
    /// Susceptibles are whatever remains of the population.
    pub fn initial_state(&self) -> Vec<f64> {
        match self {
            ModelParameters::Si(p) => {
                vec![p.population - p.initial_infected, p.initial_infected]
            }
            ModelParameters::Sis(p) => {
                vec![p.population - p.initial_infected, p.initial_infected]
            }
            ModelParameters::Sir(p) => vec![
                p.population - p.initial_infected - p.initial_recovered,
                p.initial_infected,
                p.initial_recovered,
            ],
            ModelParameters::Seir(p) => vec![
                p.population - p.initial_infected - p.initial_recovered - p.initial_exposed,
                p.initial_exposed,
                p.initial_infected,
                p.initial_recovered,
            ],
            ModelParameters::RossMacdonald(p) => vec![
                p.human_population - p.initial_infected_humans,
                p.initial_infected_humans,
                0.0,
                p.vector_population() - p.initial_infected_vectors,
                p.initial_infected_vectors,
            ],
        }
    }

    /// Builds typed parameters from a name-keyed map, as produced by form-style
    /// front ends. Fails with `MissingParameter` naming the first absent field.
    pub fn from_named(kind: ModelKind, values: &BTreeMap<String, f64>) -> SimResult<Self> {
        let params = Self::from_named_unchecked(kind, values)?;
        params.validate()?;
        Ok(params)
    }

    /// Field presence and `days` are checked; value ranges are left to
    /// [`ModelParameters::validate`].
    pub(crate) fn from_named_unchecked(
        kind: ModelKind,
        values: &BTreeMap<String, f64>,
    ) -> SimResult<Self> {
        kind.validate_fields(values)?;
        // Presence was checked above.
        let get = |field: &str| values.get(field).copied().unwrap_or_default();
        let days = days_from_value(get("days"))?;

        Ok(match kind {
            ModelKind::Si => ModelParameters::Si(SiParameters {
                population: get("population"),
                initial_infected: get("initial_infected"),
                beta: get("beta"),
                days,
            }),
            ModelKind::Sis => ModelParameters::Sis(SisParameters {
                population: get("population"),
                initial_infected: get("initial_infected"),
                beta: get("beta"),
                gamma: get("gamma"),
                days,
            }),
            ModelKind::Sir => ModelParameters::Sir(SirParameters {
                population: get("population"),
                initial_infected: get("initial_infected"),
                initial_recovered: get("initial_recovered"),
                beta: get("beta"),
                gamma: get("gamma"),
                days,
            }),
            ModelKind::Seir => ModelParameters::Seir(SeirParameters {
                population: get("population"),
                initial_infected: get("initial_infected"),
                initial_recovered: get("initial_recovered"),
                initial_exposed: get("initial_exposed"),
                beta: get("beta"),
                gamma: get("gamma"),
                sigma: get("sigma"),
                days,
            }),
            ModelKind::RossMacdonald => {
                ModelParameters::RossMacdonald(RossMacdonaldParameters {
                    human_population: get("human_population"),
                    initial_infected_humans: get("initial_infected_humans"),
                    initial_infected_vectors: get("initial_infected_vectors"),
                    m: get("m"),
                    a: get("a"),
                    b: get("b"),
                    c: get("c"),
                    gamma: get("gamma"),
                    mu: get("mu"),
                    days,
                })
            }
        })
    }
}

fn days_from_value(value: f64) -> SimResult<u32> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(SimulationError::invalid(
            "days",
            format!("expected a positive whole number of days, got {value}"),
        ));
    }
    Ok(value as u32)
}

fn check_population(name: &str, value: f64) -> SimResult<()> {
    if !value.is_finite() {
        return Err(SimulationError::invalid(name, "must be finite"));
    }
    if value < 1.0 {
        return Err(SimulationError::division_by_zero(name));
    }
    Ok(())
}

fn check_rate(name: &str, value: f64) -> SimResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::invalid(
            name,
            format!("rates must be finite and non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn check_count(name: &str, value: f64) -> SimResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimulationError::invalid(
            name,
            format!("counts must be finite and non-negative, got {value}"),
        ));
    }
    Ok(())
}

fn check_initial_counts(population: f64, counts: &[(&str, f64)]) -> SimResult<()> {
    let mut total = 0.0;
    for (name, value) in counts {
        check_count(name, *value)?;
        total += value;
    }
    if total > population {
        let names: Vec<&str> = counts.iter().map(|(name, _)| *name).collect();
        return Err(SimulationError::invalid(
            &names.join(" + "),
            format!("initial compartments sum to {total}, exceeding the population {population}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sir() -> SirParameters {
        SirParameters {
            population: 1000.0,
            initial_infected: 10.0,
            initial_recovered: 0.0,
            beta: 0.2,
            gamma: 0.1,
            days: 100,
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: SimResult<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn initial_state_derives_susceptibles() {
        let params = ModelParameters::Sir(sir());
        assert_eq!(params.initial_state(), vec![990.0, 10.0, 0.0]);

        let seir = ModelParameters::Seir(SeirParameters {
            population: 500.0,
            initial_infected: 5.0,
            initial_recovered: 20.0,
            initial_exposed: 15.0,
            beta: 0.3,
            gamma: 0.1,
            sigma: 0.2,
            days: 10,
        });
        assert_eq!(seir.initial_state(), vec![460.0, 15.0, 5.0, 20.0]);
    }

    #[test]
    fn ross_macdonald_initial_state_splits_vectors() {
        let params = ModelParameters::RossMacdonald(RossMacdonaldParameters {
            human_population: 1000.0,
            initial_infected_humans: 1.0,
            initial_infected_vectors: 5.0,
            m: 2.0,
            a: 0.3,
            b: 0.5,
            c: 0.5,
            gamma: 0.1,
            mu: 0.1,
            days: 30,
        });
        assert_eq!(
            params.initial_state(),
            vec![999.0, 1.0, 0.0, 1995.0, 5.0]
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut p = sir();
        p.beta = -0.1;
        assert_err_contains(ModelParameters::Sir(p).validate(), "beta");

        let mut p = sir();
        p.initial_infected = 995.0;
        p.initial_recovered = 10.0;
        assert_err_contains(ModelParameters::Sir(p).validate(), "exceeding the population");

        let mut p = sir();
        p.population = 0.0;
        assert!(matches!(
            ModelParameters::Sir(p).validate(),
            Err(SimulationError::DivisionByZero { .. })
        ));

        let mut p = sir();
        p.days = 0;
        assert_err_contains(ModelParameters::Sir(p).validate(), "days");

        assert!(ModelParameters::Sir(sir()).validate().is_ok());
    }

    #[test]
    fn validate_rejects_too_many_infected_vectors() {
        let params = ModelParameters::RossMacdonald(RossMacdonaldParameters {
            human_population: 100.0,
            initial_infected_humans: 1.0,
            initial_infected_vectors: 51.0,
            m: 0.5,
            a: 0.3,
            b: 0.5,
            c: 0.5,
            gamma: 0.1,
            mu: 0.1,
            days: 30,
        });
        assert_err_contains(params.validate(), "vector population");
    }

    #[test]
    fn from_named_builds_typed_parameters() {
        let values: BTreeMap<String, f64> = [
            ("population", 1000.0),
            ("initial_infected", 10.0),
            ("initial_recovered", 0.0),
            ("beta", 0.2),
            ("gamma", 0.1),
            ("days", 100.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let params = ModelParameters::from_named(ModelKind::Sir, &values).unwrap();
        assert_eq!(params, ModelParameters::Sir(sir()));

        let err = ModelParameters::from_named(ModelKind::Seir, &values).unwrap_err();
        assert!(matches!(err, SimulationError::MissingParameter { ref field, .. } if field == "initial_exposed"));
    }

    #[test]
    fn from_named_rejects_fractional_days() {
        let values: BTreeMap<String, f64> = [
            ("population", 1000.0),
            ("initial_infected", 10.0),
            ("beta", 0.2),
            ("days", 10.5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        assert_err_contains(ModelParameters::from_named(ModelKind::Si, &values), "whole number");
    }

    #[test]
    fn ross_macdonald_r0_formula() {
        let p = RossMacdonaldParameters {
            human_population: 1000.0,
            initial_infected_humans: 1.0,
            initial_infected_vectors: 0.0,
            m: 2.0,
            a: 0.3,
            b: 0.5,
            c: 0.4,
            gamma: 0.1,
            mu: 0.2,
            days: 30,
        };
        let expected = 2.0 * 0.09 * 0.5 * 0.4 / (0.1 * 0.2);
        assert!((p.r0().unwrap() - expected).abs() < 1e-12);

        let p = RossMacdonaldParameters { mu: 0.0, ..p };
        assert_eq!(p.r0(), None);
    }

    #[test]
    fn deserializes_tagged_parameters() {
        let params: ModelParameters = serde_json::from_str(
            r#"{"model":"SI","population":100.0,"initial_infected":1.0,"beta":0.5,"days":20}"#,
        )
        .expect("parameters should deserialize");
        assert_eq!(params.kind(), ModelKind::Si);
        assert_eq!(params.days(), 20);
        assert_eq!(params.initial_state(), vec![99.0, 1.0]);
    }
}
