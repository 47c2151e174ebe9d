//! Headline numbers derived from a finished run.

use crate::integrator::Trajectory;
use crate::model::ModelKind;
use crate::params::{ModelParameters, SisParameters};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompartmentValue {
    pub compartment: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub model: ModelKind,
    /// Largest value of the infected compartment (human infected for
    /// Ross-Macdonald) over the grid.
    pub peak_infected: f64,
    pub peak_day: f64,
    pub final_values: Vec<CompartmentValue>,
    /// Fraction of the population that left the susceptible class during the
    /// run. Not defined for SIS, where infection does not confer immunity.
    pub final_size: Option<f64>,
    pub r0: Option<f64>,
    /// 1 − 1/R0, only when R0 > 1.
    pub herd_immunity_threshold: Option<f64>,
    /// Long-run infected count; SIS only.
    pub endemic_equilibrium: Option<f64>,
}

/// Basic reproduction number of a parameter set.
///
/// SI has no recovery, so R0 is unbounded and reported as `None`; the same
/// holds whenever the removal rate in the denominator is zero.
pub fn basic_reproduction_number(params: &ModelParameters) -> Option<f64> {
    let ratio = |beta: f64, gamma: f64| (gamma > 0.0).then(|| beta / gamma);
    match params {
        ModelParameters::Si(_) => None,
        ModelParameters::Sis(p) => ratio(p.beta, p.gamma),
        ModelParameters::Sir(p) => ratio(p.beta, p.gamma),
        ModelParameters::Seir(p) => ratio(p.beta, p.gamma),
        ModelParameters::RossMacdonald(p) => p.r0(),
    }
}

pub fn herd_immunity_threshold(r0: f64) -> Option<f64> {
    (r0 > 1.0).then(|| 1.0 - 1.0 / r0)
}

/// Stable infected level of the SIS model: N(1 − γ/β) when β > γ, else 0.
pub fn sis_endemic_equilibrium(params: &SisParameters) -> f64 {
    if params.beta > params.gamma {
        params.population * (1.0 - params.gamma / params.beta)
    } else {
        0.0
    }
}

pub fn summarize(params: &ModelParameters, trajectory: &Trajectory) -> Summary {
    let kind = params.kind();
    let infected = trajectory.column(kind.infected_index());
    let (peak_index, peak_infected) = infected.iter().copied().enumerate().fold(
        (0, f64::NEG_INFINITY),
        |best, (index, value)| if value > best.1 { (index, value) } else { best },
    );
    let peak_day = trajectory.times().get(peak_index).copied().unwrap_or(0.0);

    let final_state = trajectory.final_state();
    let final_values = kind
        .compartments()
        .iter()
        .zip(final_state)
        .map(|(name, &value)| CompartmentValue {
            compartment: name.to_string(),
            value,
        })
        .collect();

    let final_size = match kind {
        ModelKind::Sis => None,
        _ => {
            let initial = trajectory.states().first().map_or(0.0, |state| state[0]);
            let last = final_state.first().copied().unwrap_or(initial);
            Some((initial - last) / params.population())
        }
    };

    let r0 = basic_reproduction_number(params);
    let endemic_equilibrium = match params {
        ModelParameters::Sis(p) => Some(sis_endemic_equilibrium(p)),
        _ => None,
    };

    Summary {
        model: kind,
        peak_infected: if peak_infected.is_finite() { peak_infected } else { 0.0 },
        peak_day,
        final_values,
        final_size,
        r0,
        herd_immunity_threshold: r0.and_then(herd_immunity_threshold),
        endemic_equilibrium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{SiParameters, SirParameters};

    fn sis(beta: f64, gamma: f64) -> SisParameters {
        SisParameters {
            population: 1000.0,
            initial_infected: 10.0,
            beta,
            gamma,
            days: 10,
        }
    }

    #[test]
    fn reproduction_numbers_per_model() {
        let sir = SirParameters {
            population: 1000.0,
            initial_infected: 10.0,
            initial_recovered: 0.0,
            beta: 0.2,
            gamma: 0.1,
            days: 100,
        };
        let r0 = basic_reproduction_number(&ModelParameters::Sir(sir)).unwrap();
        assert!((r0 - 2.0).abs() < 1e-12);
        assert!((herd_immunity_threshold(r0).unwrap() - 0.5).abs() < 1e-12);

        let no_recovery = SirParameters { gamma: 0.0, ..sir };
        assert_eq!(basic_reproduction_number(&ModelParameters::Sir(no_recovery)), None);

        let si = ModelParameters::Si(SiParameters {
            population: 100.0,
            initial_infected: 1.0,
            beta: 0.3,
            days: 5,
        });
        assert_eq!(basic_reproduction_number(&si), None);
        assert_eq!(herd_immunity_threshold(0.8), None);
    }

    #[test]
    fn endemic_equilibrium_requires_beta_above_gamma() {
        assert!((sis_endemic_equilibrium(&sis(0.5, 0.1)) - 800.0).abs() < 1e-9);
        assert_eq!(sis_endemic_equilibrium(&sis(0.1, 0.3)), 0.0);
        assert_eq!(sis_endemic_equilibrium(&sis(0.2, 0.2)), 0.0);
    }
}
