//! Grid-driven integration of an ODE system.
//!
//! The adaptive methods choose their own internal steps but always land
//! exactly on every grid time, so the trajectory holds one state per grid
//! point with no interpolation involved. `Method::Auto` starts explicit and
//! switches to the Rosenbrock method while the problem behaves stiffly.

use crate::error::{SimResult, SimulationError};
use crate::grid::TimeGrid;
use crate::solvers::{Rosenbrock23, Tsit5, RK4};
use crate::traits::{DynamicalSystem, OdeSystem, StepOutcome, Steppable, Tolerance};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Tsit5 with automatic switching to Rosenbrock23 on stiffness.
    #[default]
    Auto,
    Tsit5,
    Rosenbrock23,
    /// Fixed-step classic Runge-Kutta.
    Rk4,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegratorSettings {
    pub method: Method,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    /// First trial step; estimated from the initial slope when absent.
    pub initial_step: Option<f64>,
    pub min_step: f64,
    pub max_step: Option<f64>,
    pub max_steps: usize,
    /// Step used by `Method::Rk4`, shortened to divide each grid interval.
    pub fixed_step: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            method: Method::Auto,
            relative_tolerance: 1e-8,
            absolute_tolerance: 1e-8,
            initial_step: None,
            min_step: 1e-10,
            max_step: None,
            max_steps: 500_000,
            fixed_step: 0.01,
        }
    }
}

impl IntegratorSettings {
    pub fn validate(&self) -> SimResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SimulationError::invalid(
                    name,
                    format!("must be positive and finite, got {value}"),
                ))
            }
        };
        positive("relative_tolerance", self.relative_tolerance)?;
        positive("absolute_tolerance", self.absolute_tolerance)?;
        positive("min_step", self.min_step)?;
        positive("fixed_step", self.fixed_step)?;
        if let Some(h) = self.initial_step {
            positive("initial_step", h)?;
        }
        if let Some(h) = self.max_step {
            positive("max_step", h)?;
            if h < self.min_step {
                return Err(SimulationError::invalid(
                    "max_step",
                    "must not be smaller than min_step",
                ));
            }
        }
        if self.max_steps == 0 {
            return Err(SimulationError::invalid(
                "max_steps",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    fn tolerance(&self) -> Tolerance {
        Tolerance {
            relative: self.relative_tolerance,
            absolute: self.absolute_tolerance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
    pub function_evaluations: usize,
    pub jacobian_evaluations: usize,
    pub method_switches: usize,
}

/// One state per grid time, the first being the initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Vec<Vec<f64>>,
    stats: IntegrationStats,
}

impl Trajectory {
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn states(&self) -> &[Vec<f64>] {
        &self.states
    }

    pub fn stats(&self) -> &IntegrationStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.states.first().map_or(0, Vec::len)
    }

    /// Time series of a single compartment.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.states.iter().map(|state| state[index]).collect()
    }

    pub fn final_state(&self) -> &[f64] {
        self.states.last().map_or(&[], Vec::as_slice)
    }
}

/// Solves `dy/dt = f(t, y)` from `initial` and records the state at every
/// grid time.
pub fn integrate<S: OdeSystem>(
    system: &S,
    initial: &[f64],
    grid: &TimeGrid,
    settings: &IntegratorSettings,
) -> SimResult<Trajectory> {
    settings.validate()?;
    let dim = DynamicalSystem::<f64>::dimension(system);
    if initial.len() != dim {
        return Err(SimulationError::invalid(
            "initial_state",
            format!("expected {} values, got {}", dim, initial.len()),
        ));
    }
    if initial.iter().any(|v| !v.is_finite()) {
        return Err(SimulationError::invalid(
            "initial_state",
            "values must be finite",
        ));
    }

    let mut driver = Driver::new(system, initial, grid.start(), settings);
    let mut states = Vec::with_capacity(grid.len());
    states.push(initial.to_vec());
    for &target in &grid.points()[1..] {
        match settings.method {
            Method::Rk4 => driver.advance_fixed(target)?,
            _ => driver.advance_adaptive(target)?,
        }
        states.push(driver.y.clone());
    }

    let stats = driver.finish();
    log::debug!(
        "integrated {} grid points: {} accepted, {} rejected, {} f-evals, {} jacobians, {} switches",
        grid.len(),
        stats.accepted_steps,
        stats.rejected_steps,
        stats.function_evaluations,
        stats.jacobian_evaluations,
        stats.method_switches
    );

    Ok(Trajectory {
        times: grid.points().to_vec(),
        states,
        stats,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Explicit,
    Implicit,
}

/// Accepted steps a stiffness verdict must collect before switching.
const SWITCH_PERSISTENCE: usize = 15;
/// Non-stiff steps in a row that clear accumulated stiff votes.
const STIFF_VOTE_RESET: usize = 6;

struct Driver<'a, S: OdeSystem> {
    system: &'a S,
    settings: &'a IntegratorSettings,
    tolerance: Tolerance,
    t: f64,
    y: Vec<f64>,
    next: Vec<f64>,
    h: Option<f64>,
    active: Active,
    rk4: RK4,
    tsit5: Tsit5,
    rosenbrock: Rosenbrock23,
    stiff_votes: usize,
    nonstiff_votes: usize,
    stats: IntegrationStats,
}

impl<'a, S: OdeSystem> Driver<'a, S> {
    fn new(system: &'a S, initial: &[f64], t0: f64, settings: &'a IntegratorSettings) -> Self {
        let dim = initial.len();
        let active = match settings.method {
            Method::Rosenbrock23 => Active::Implicit,
            _ => Active::Explicit,
        };
        Self {
            system,
            settings,
            tolerance: settings.tolerance(),
            t: t0,
            y: initial.to_vec(),
            next: vec![0.0; dim],
            h: settings.initial_step,
            active,
            rk4: RK4::new(dim),
            tsit5: Tsit5::new(dim),
            rosenbrock: Rosenbrock23::new(dim),
            stiff_votes: 0,
            nonstiff_votes: 0,
            stats: IntegrationStats::default(),
        }
    }

    fn finish(mut self) -> IntegrationStats {
        self.stats.function_evaluations =
            self.rk4.evaluations + self.tsit5.evaluations + self.rosenbrock.evaluations;
        self.stats.jacobian_evaluations = self.rosenbrock.jacobian_evaluations;
        self.stats
    }

    fn steps_taken(&self) -> usize {
        self.stats.accepted_steps + self.stats.rejected_steps
    }

    fn advance_fixed(&mut self, target: f64) -> SimResult<()> {
        let span = target - self.t;
        let substeps = (span / self.settings.fixed_step).ceil().max(1.0) as usize;
        let dt = span / substeps as f64;
        for k in 0..substeps {
            if self.steps_taken() >= self.settings.max_steps {
                return Err(self.too_many_steps(target));
            }
            self.rk4
                .attempt(self.system, self.t, &self.y, dt, &self.tolerance, &mut self.next);
            if self.next.iter().any(|v| !v.is_finite()) {
                return Err(SimulationError::Integration(format!(
                    "state became non-finite at t = {}",
                    self.t + dt
                )));
            }
            std::mem::swap(&mut self.y, &mut self.next);
            self.t = if k + 1 == substeps { target } else { self.t + dt };
            self.stats.accepted_steps += 1;
        }
        Ok(())
    }

    fn advance_adaptive(&mut self, target: f64) -> SimResult<()> {
        let max_step = self.settings.max_step.unwrap_or(f64::INFINITY);
        while self.t < target {
            if self.steps_taken() >= self.settings.max_steps {
                return Err(self.too_many_steps(target));
            }

            let h = match self.h {
                Some(h) => h,
                None => self.initial_step_guess(target),
            };
            let remaining = target - self.t;
            let lands = h >= remaining * (1.0 - 1e-12);
            if !lands && h < self.settings.min_step {
                return Err(self.step_too_small());
            }
            let dt = if lands { remaining } else { h.min(max_step) };

            let outcome = self.attempt(dt);
            let finite = self.next.iter().all(|v| v.is_finite());

            if finite && outcome.error_norm <= 1.0 {
                self.accept(dt, target, lands);
                let proposed = (dt * step_factor(&outcome)).min(max_step);
                self.h = Some(if lands { proposed.max(h.min(max_step)) } else { proposed });
            } else {
                self.stats.rejected_steps += 1;
                let factor = if finite { step_factor(&outcome) } else { 0.25 };
                let shrunk = dt * factor.min(0.9);
                if shrunk < self.settings.min_step {
                    return Err(if finite {
                        self.step_too_small()
                    } else {
                        SimulationError::Integration(format!(
                            "state became non-finite at t = {}",
                            self.t + dt
                        ))
                    });
                }
                self.h = Some(shrunk);
            }
        }
        Ok(())
    }

    fn attempt(&mut self, dt: f64) -> StepOutcome {
        match self.active {
            Active::Explicit => self.tsit5.attempt(
                self.system,
                self.t,
                &self.y,
                dt,
                &self.tolerance,
                &mut self.next,
            ),
            Active::Implicit => self.rosenbrock.attempt(
                self.system,
                self.t,
                &self.y,
                dt,
                &self.tolerance,
                &mut self.next,
            ),
        }
    }

    fn accept(&mut self, dt: f64, target: f64, lands: bool) {
        self.stats.accepted_steps += 1;
        self.t = if lands { target } else { self.t + dt };
        std::mem::swap(&mut self.y, &mut self.next);

        match self.active {
            Active::Explicit => {
                let stiff = self.tsit5.stiffness_estimate() > 0.9 * Tsit5::STABILITY_BOUNDARY;
                self.tsit5.accept();
                if self.settings.method == Method::Auto {
                    if stiff {
                        self.stiff_votes += 1;
                        self.nonstiff_votes = 0;
                    } else {
                        self.nonstiff_votes += 1;
                        if self.nonstiff_votes >= STIFF_VOTE_RESET {
                            self.stiff_votes = 0;
                        }
                    }
                    if self.stiff_votes >= SWITCH_PERSISTENCE {
                        log::warn!(
                            "problem became stiff at t = {:.4}; switching to Rosenbrock23",
                            self.t
                        );
                        self.switch_to(Active::Implicit);
                    }
                }
            }
            Active::Implicit => {
                let explicit_ok = self
                    .rosenbrock
                    .jacobian_norm()
                    .is_some_and(|norm| dt * norm < 0.5 * Tsit5::STABILITY_BOUNDARY);
                self.rosenbrock.accept();
                if self.settings.method == Method::Auto {
                    self.nonstiff_votes = if explicit_ok { self.nonstiff_votes + 1 } else { 0 };
                    if self.nonstiff_votes >= SWITCH_PERSISTENCE {
                        log::debug!("stiffness subsided at t = {:.4}; switching to Tsit5", self.t);
                        self.switch_to(Active::Explicit);
                    }
                }
            }
        }
    }

    fn switch_to(&mut self, active: Active) {
        self.active = active;
        self.stiff_votes = 0;
        self.nonstiff_votes = 0;
        self.tsit5.reset();
        self.rosenbrock.reset();
        self.stats.method_switches += 1;
    }

    /// Hairer-Wanner starting step: the step that moves the state by about
    /// one percent of its weighted magnitude.
    fn initial_step_guess(&mut self, target: f64) -> f64 {
        let mut slope = vec![0.0; self.y.len()];
        DynamicalSystem::<f64>::apply(self.system, self.t, &self.y, &mut slope);
        self.tsit5.evaluations += 1;

        let zeros = vec![0.0; self.y.len()];
        let d0 = self.tolerance.error_norm(&self.y, &self.y, &zeros);
        let d1 = self.tolerance.error_norm(&slope, &self.y, &zeros);
        let guess = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        };
        guess
            .min(target - self.t)
            .min(self.settings.max_step.unwrap_or(f64::INFINITY))
            .max(self.settings.min_step)
    }

    fn step_too_small(&self) -> SimulationError {
        SimulationError::Integration(format!(
            "step size fell below the minimum {} at t = {}",
            self.settings.min_step, self.t
        ))
    }

    fn too_many_steps(&self, target: f64) -> SimulationError {
        SimulationError::Integration(format!(
            "exceeded the maximum of {} steps at t = {} while advancing to t = {}",
            self.settings.max_steps, self.t, target
        ))
    }
}

fn step_factor(outcome: &StepOutcome) -> f64 {
    if !outcome.error_norm.is_finite() {
        return 0.2;
    }
    if outcome.error_norm == 0.0 {
        return 5.0;
    }
    let exponent = -1.0 / (outcome.estimator_order as f64 + 1.0);
    (0.9 * outcome.error_norm.powf(exponent)).clamp(0.2, 5.0)
}
