//! Registry of the supported epidemic models and the schema each requires.
//!
//! The registry computes nothing. It maps a [`ModelKind`] to its ordered
//! compartment names and the named fields a parameter set must provide, and
//! is what boundary layers consult before building typed parameters.

use crate::error::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Name of the time column in every result table.
pub const DAY_COLUMN: &str = "Day";
/// Name of the scenario label column in long-format sweep tables.
pub const SCENARIO_COLUMN: &str = "Scenario";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "SI")]
    Si,
    #[serde(rename = "SIS")]
    Sis,
    #[serde(rename = "SIR")]
    Sir,
    #[serde(rename = "SEIR")]
    Seir,
    #[serde(rename = "RossMacdonald", alias = "ross-macdonald")]
    RossMacdonald,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Si,
        ModelKind::Sis,
        ModelKind::Sir,
        ModelKind::Seir,
        ModelKind::RossMacdonald,
    ];

    /// Ordered compartment names; the state vector uses the same order.
    pub fn compartments(self) -> &'static [&'static str] {
        match self {
            ModelKind::Si | ModelKind::Sis => &["Susceptible", "Infected"],
            ModelKind::Sir => &["Susceptible", "Infected", "Recovered"],
            ModelKind::Seir => &["Susceptible", "Exposed", "Infected", "Recovered"],
            ModelKind::RossMacdonald => &[
                "Human Susceptible",
                "Human Infected",
                "Human Recovered",
                "Vector Susceptible",
                "Vector Infected",
            ],
        }
    }

    /// Number of state variables.
    pub fn dimension(self) -> usize {
        self.compartments().len()
    }

    /// Number of leading compartments that make up the (human) population.
    pub fn host_compartments(self) -> usize {
        match self {
            ModelKind::RossMacdonald => 3,
            other => other.dimension(),
        }
    }

    /// Index of the compartment reported as "infected" in summaries and sweeps.
    pub fn infected_index(self) -> usize {
        match self {
            ModelKind::Seir => 2,
            _ => 1,
        }
    }

    /// Named fields a parameter map must carry for this model.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            ModelKind::Si => &["population", "initial_infected", "beta", "days"],
            ModelKind::Sis => &["population", "initial_infected", "beta", "gamma", "days"],
            ModelKind::Sir => &[
                "population",
                "initial_infected",
                "initial_recovered",
                "beta",
                "gamma",
                "days",
            ],
            ModelKind::Seir => &[
                "population",
                "initial_infected",
                "initial_recovered",
                "initial_exposed",
                "beta",
                "gamma",
                "sigma",
                "days",
            ],
            ModelKind::RossMacdonald => &[
                "human_population",
                "initial_infected_humans",
                "initial_infected_vectors",
                "m",
                "a",
                "b",
                "c",
                "gamma",
                "mu",
                "days",
            ],
        }
    }

    /// Checks that every required field is present in `values`.
    pub fn validate_fields(self, values: &BTreeMap<String, f64>) -> SimResult<()> {
        match self
            .required_fields()
            .iter()
            .find(|field| !values.contains_key(**field))
        {
            Some(field) => Err(SimulationError::MissingParameter {
                model: self.to_string(),
                field: (*field).to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Si => "SI",
            ModelKind::Sis => "SIS",
            ModelKind::Sir => "SIR",
            ModelKind::Seir => "SEIR",
            ModelKind::RossMacdonald => "RossMacdonald",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "si" => Ok(ModelKind::Si),
            "sis" => Ok(ModelKind::Sis),
            "sir" => Ok(ModelKind::Sir),
            "seir" => Ok(ModelKind::Seir),
            "rossmacdonald" | "rm" => Ok(ModelKind::RossMacdonald),
            _ => Err(SimulationError::invalid(
                "model",
                format!("unknown model `{s}`"),
            )),
        }
    }
}
