//! One-shot simulation requests: validate, build the system, integrate.

use crate::derivatives::EpidemicSystem;
use crate::error::{SimResult, SimulationError};
use crate::grid::TimeGrid;
use crate::integrator::{integrate, IntegratorSettings, Trajectory};
use crate::model::ModelKind;
use crate::params::ModelParameters;
use crate::summary::{summarize, Summary};
use crate::table::Table;
use serde::Serialize;
use std::collections::BTreeMap;

/// A completed run. Either the whole trajectory exists or the request failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    parameters: ModelParameters,
    trajectory: Trajectory,
}

impl Simulation {
    pub fn kind(&self) -> ModelKind {
        self.parameters.kind()
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.parameters
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    pub fn table(&self) -> SimResult<Table> {
        Table::from_trajectory(self.kind(), &self.trajectory)
    }

    pub fn summary(&self) -> Summary {
        summarize(&self.parameters, &self.trajectory)
    }
}

pub fn simulate(params: &ModelParameters, settings: &IntegratorSettings) -> SimResult<Simulation> {
    params.validate()?;
    settings.validate()?;
    // Each grid interval costs at least one step.
    let intervals = params.days().saturating_sub(1) as usize;
    if intervals > settings.max_steps {
        return Err(SimulationError::invalid(
            "days",
            format!(
                "{} days need at least {intervals} steps, more than the limit of {}",
                params.days(),
                settings.max_steps
            ),
        ));
    }
    let system = EpidemicSystem::from_parameters(params)?;
    let grid = TimeGrid::new(params.days())?;
    log::debug!(
        "simulating {} over {} days with {:?}",
        params.kind(),
        params.days(),
        settings.method
    );
    let trajectory = integrate(&system, &params.initial_state(), &grid, settings)?;
    Ok(Simulation {
        parameters: *params,
        trajectory,
    })
}

/// Same as [`simulate`] for name-keyed parameters.
pub fn simulate_named(
    kind: ModelKind,
    values: &BTreeMap<String, f64>,
    settings: &IntegratorSettings,
) -> SimResult<Simulation> {
    simulate(&ModelParameters::from_named(kind, values)?, settings)
}
