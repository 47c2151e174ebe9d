//! Right-hand sides of the epidemic ODE systems.
//!
//! Every system is a small parameter struct evaluated by a stateless
//! `apply`. The structs are generic over [`Scalar`] so the same equations
//! feed the explicit steppers (`f64`) and the Jacobian sweeps (`Dual`).

use crate::error::{SimResult, SimulationError};
use crate::params::{
    ModelParameters, RossMacdonaldParameters, SeirParameters, SiParameters, SirParameters,
    SisParameters,
};
use crate::traits::{DynamicalSystem, Scalar};

fn nonzero_population(value: f64, what: &str) -> SimResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::division_by_zero(what))
    }
}

/// dS = −βSI/N; dI = βSI/N.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiSystem {
    pub population: f64,
    pub beta: f64,
}

impl SiSystem {
    pub fn new(params: &SiParameters) -> SimResult<Self> {
        Ok(Self {
            population: nonzero_population(params.population, "population")?,
            beta: params.beta,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for SiSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (s, i) = (x[0], x[1]);
        let infection = T::constant(self.beta) * s * i / T::constant(self.population);
        out[0] = -infection;
        out[1] = infection;
    }
}

/// dS = −βSI/N + γI; dI = βSI/N − γI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SisSystem {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl SisSystem {
    pub fn new(params: &SisParameters) -> SimResult<Self> {
        Ok(Self {
            population: nonzero_population(params.population, "population")?,
            beta: params.beta,
            gamma: params.gamma,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for SisSystem {
    fn dimension(&self) -> usize {
        2
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (s, i) = (x[0], x[1]);
        let infection = T::constant(self.beta) * s * i / T::constant(self.population);
        let recovery = T::constant(self.gamma) * i;
        out[0] = recovery - infection;
        out[1] = infection - recovery;
    }
}

/// dS = −βSI/N; dI = βSI/N − γI; dR = γI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirSystem {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl SirSystem {
    pub fn new(params: &SirParameters) -> SimResult<Self> {
        Ok(Self {
            population: nonzero_population(params.population, "population")?,
            beta: params.beta,
            gamma: params.gamma,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for SirSystem {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (s, i) = (x[0], x[1]);
        let infection = T::constant(self.beta) * s * i / T::constant(self.population);
        let recovery = T::constant(self.gamma) * i;
        out[0] = -infection;
        out[1] = infection - recovery;
        out[2] = recovery;
    }
}

/// dS = −βSI/N; dE = βSI/N − σE; dI = σE − γI; dR = γI.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeirSystem {
    pub population: f64,
    pub beta: f64,
    pub gamma: f64,
    pub sigma: f64,
}

impl SeirSystem {
    pub fn new(params: &SeirParameters) -> SimResult<Self> {
        Ok(Self {
            population: nonzero_population(params.population, "population")?,
            beta: params.beta,
            gamma: params.gamma,
            sigma: params.sigma,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for SeirSystem {
    fn dimension(&self) -> usize {
        4
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (s, e, i) = (x[0], x[1], x[2]);
        let infection = T::constant(self.beta) * s * i / T::constant(self.population);
        let onset = T::constant(self.sigma) * e;
        let recovery = T::constant(self.gamma) * i;
        out[0] = -infection;
        out[1] = infection - onset;
        out[2] = onset - recovery;
        out[3] = recovery;
    }
}

/// Host-vector dynamics over (Sh, Ih, Rh, Sv, Iv).
///
/// Vectors are born susceptible at rate μV with V = Sv + Iv and die at rate
/// μ from both classes, so dSv + dIv = 0 and V is conserved exactly.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RossMacdonaldSystem {
    pub human_population: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub gamma: f64,
    pub mu: f64,
}

impl RossMacdonaldSystem {
    pub fn new(params: &RossMacdonaldParameters) -> SimResult<Self> {
        Ok(Self {
            human_population: nonzero_population(params.human_population, "human_population")?,
            a: params.a,
            b: params.b,
            c: params.c,
            gamma: params.gamma,
            mu: params.mu,
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for RossMacdonaldSystem {
    fn dimension(&self) -> usize {
        5
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let (sh, ih, sv, iv) = (x[0], x[1], x[3], x[4]);
        let nh = T::constant(self.human_population);
        let a = T::constant(self.a);
        let mu = T::constant(self.mu);

        let human_infection = a * T::constant(self.b) * iv * sh / nh;
        let human_recovery = T::constant(self.gamma) * ih;
        let vector_infection = a * T::constant(self.c) * ih * sv / nh;
        let vector_births = mu * (sv + iv);

        out[0] = -human_infection;
        out[1] = human_infection - human_recovery;
        out[2] = human_recovery;
        out[3] = vector_births - vector_infection - mu * sv;
        out[4] = vector_infection - mu * iv;
    }
}

/// Dispatch over the concrete systems, selected from typed parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpidemicSystem {
    Si(SiSystem),
    Sis(SisSystem),
    Sir(SirSystem),
    Seir(SeirSystem),
    RossMacdonald(RossMacdonaldSystem),
}

impl EpidemicSystem {
    pub fn from_parameters(params: &ModelParameters) -> SimResult<Self> {
        Ok(match params {
            ModelParameters::Si(p) => EpidemicSystem::Si(SiSystem::new(p)?),
            ModelParameters::Sis(p) => EpidemicSystem::Sis(SisSystem::new(p)?),
            ModelParameters::Sir(p) => EpidemicSystem::Sir(SirSystem::new(p)?),
            ModelParameters::Seir(p) => EpidemicSystem::Seir(SeirSystem::new(p)?),
            ModelParameters::RossMacdonald(p) => {
                EpidemicSystem::RossMacdonald(RossMacdonaldSystem::new(p)?)
            }
        })
    }
}

impl<T: Scalar> DynamicalSystem<T> for EpidemicSystem {
    fn dimension(&self) -> usize {
        match self {
            EpidemicSystem::Si(s) => DynamicalSystem::<T>::dimension(s),
            EpidemicSystem::Sis(s) => DynamicalSystem::<T>::dimension(s),
            EpidemicSystem::Sir(s) => DynamicalSystem::<T>::dimension(s),
            EpidemicSystem::Seir(s) => DynamicalSystem::<T>::dimension(s),
            EpidemicSystem::RossMacdonald(s) => DynamicalSystem::<T>::dimension(s),
        }
    }

    fn apply(&self, t: T, x: &[T], out: &mut [T]) {
        match self {
            EpidemicSystem::Si(s) => s.apply(t, x, out),
            EpidemicSystem::Sis(s) => s.apply(t, x, out),
            EpidemicSystem::Sir(s) => s.apply(t, x, out),
            EpidemicSystem::Seir(s) => s.apply(t, x, out),
            EpidemicSystem::RossMacdonald(s) => s.apply(t, x, out),
        }
    }
}

/// Instantaneous rates of change of `state` at time `t`.
pub fn derivatives(params: &ModelParameters, t: f64, state: &[f64]) -> SimResult<Vec<f64>> {
    let system = EpidemicSystem::from_parameters(params)?;
    let dim = DynamicalSystem::<f64>::dimension(&system);
    if state.len() != dim {
        return Err(SimulationError::invalid(
            "state",
            format!(
                "{} model expects {} compartments, got {}",
                params.kind(),
                dim,
                state.len()
            ),
        ));
    }
    let mut out = vec![0.0; dim];
    system.apply(t, state, &mut out[..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autodiff::{jacobian, Dual};

    fn rm_params() -> RossMacdonaldParameters {
        RossMacdonaldParameters {
            human_population: 1000.0,
            initial_infected_humans: 10.0,
            initial_infected_vectors: 20.0,
            m: 2.0,
            a: 0.3,
            b: 0.5,
            c: 0.4,
            gamma: 0.1,
            mu: 0.2,
            days: 60,
        }
    }

    #[test]
    fn sir_derivatives_match_hand_computation() {
        let params = ModelParameters::Sir(SirParameters {
            population: 1000.0,
            initial_infected: 10.0,
            initial_recovered: 0.0,
            beta: 0.2,
            gamma: 0.1,
            days: 100,
        });
        let d = derivatives(&params, 0.0, &[990.0, 10.0, 0.0]).unwrap();
        let infection = 0.2 * 990.0 * 10.0 / 1000.0;
        assert!((d[0] + infection).abs() < 1e-12);
        assert!((d[1] - (infection - 1.0)).abs() < 1e-12);
        assert!((d[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn every_model_conserves_its_populations() {
        let states: [(ModelParameters, Vec<f64>); 5] = [
            (
                ModelParameters::Si(SiParameters {
                    population: 100.0,
                    initial_infected: 3.0,
                    beta: 0.7,
                    days: 10,
                }),
                vec![97.0, 3.0],
            ),
            (
                ModelParameters::Sis(SisParameters {
                    population: 100.0,
                    initial_infected: 3.0,
                    beta: 0.7,
                    gamma: 0.2,
                    days: 10,
                }),
                vec![60.0, 40.0],
            ),
            (
                ModelParameters::Sir(SirParameters {
                    population: 100.0,
                    initial_infected: 3.0,
                    initial_recovered: 0.0,
                    beta: 0.7,
                    gamma: 0.2,
                    days: 10,
                }),
                vec![50.0, 30.0, 20.0],
            ),
            (
                ModelParameters::Seir(SeirParameters {
                    population: 100.0,
                    initial_infected: 3.0,
                    initial_recovered: 0.0,
                    initial_exposed: 0.0,
                    beta: 0.7,
                    gamma: 0.2,
                    sigma: 0.3,
                    days: 10,
                }),
                vec![40.0, 10.0, 30.0, 20.0],
            ),
            (
                ModelParameters::RossMacdonald(rm_params()),
                vec![900.0, 60.0, 40.0, 1500.0, 500.0],
            ),
        ];

        for (params, state) in states {
            let d = derivatives(&params, 0.0, &state).unwrap();
            let host = params.kind().host_compartments();
            let host_sum: f64 = d[..host].iter().sum();
            let vector_sum: f64 = d[host..].iter().sum();
            assert!(host_sum.abs() < 1e-12, "{}: {host_sum}", params.kind());
            assert!(vector_sum.abs() < 1e-12, "{}: {vector_sum}", params.kind());
        }
    }

    #[test]
    fn ross_macdonald_vector_births_balance_deaths() {
        let system = RossMacdonaldSystem::new(&rm_params()).unwrap();
        // No infection anywhere: vectors only turn over.
        let mut out = [0.0_f64; 5];
        system.apply(0.0, &[1000.0, 0.0, 0.0, 1500.0, 500.0][..], &mut out[..]);
        assert!((out[3] - 0.2 * 500.0).abs() < 1e-12);
        assert!((out[4] + 0.2 * 500.0).abs() < 1e-12);
        assert!((out[3] + out[4]).abs() < 1e-12);
    }

    #[test]
    fn zero_population_is_division_by_zero() {
        let params = SirParameters {
            population: 0.0,
            initial_infected: 0.0,
            initial_recovered: 0.0,
            beta: 0.2,
            gamma: 0.1,
            days: 10,
        };
        assert!(matches!(
            SirSystem::new(&params),
            Err(SimulationError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn derivatives_rejects_wrong_arity() {
        let params = ModelParameters::RossMacdonald(rm_params());
        assert!(derivatives(&params, 0.0, &[1.0, 2.0]).is_err());
    }

    #[test]
    fn dual_evaluation_agrees_with_float_evaluation() {
        let system = SeirSystem {
            population: 100.0,
            beta: 0.5,
            gamma: 0.1,
            sigma: 0.25,
        };
        let x = [70.0, 10.0, 15.0, 5.0];
        let mut plain = [0.0; 4];
        system.apply(0.0, &x[..], &mut plain[..]);

        let dual_x: Vec<Dual> = x.iter().map(|&v| Dual::constant(v)).collect();
        let mut dual_out = vec![Dual::constant(0.0); 4];
        system.apply(Dual::constant(0.0), &dual_x[..], &mut dual_out[..]);
        for (p, d) in plain.iter().zip(&dual_out) {
            assert!((p - d.val).abs() < 1e-12);
        }

        // ∂(dS)/∂I = −βS/N
        let jac = jacobian(&system, 0.0, &x);
        assert!((jac[(0, 2)] + 0.5 * 70.0 / 100.0).abs() < 1e-12);
        // ∂(dE)/∂E = −σ
        assert!((jac[(1, 1)] + 0.25).abs() < 1e-12);
    }
}
