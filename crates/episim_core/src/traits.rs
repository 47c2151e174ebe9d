use crate::autodiff::Dual;
use num_traits::{FromPrimitive, NumOps, One, Zero};
use std::fmt::Debug;
use std::ops::Neg;

/// A trait for types that can flow through the derivative functions.
/// Only field arithmetic is required, so both `f64` and `Dual` qualify.
pub trait Scalar:
    Copy + Debug + PartialOrd + NumOps + Neg<Output = Self> + Zero + One + FromPrimitive + 'static
{
    /// Lifts a constant into the scalar type.
    fn constant(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::zero)
    }
}

impl<T> Scalar for T where
    T: Copy
        + Debug
        + PartialOrd
        + NumOps
        + Neg<Output = T>
        + Zero
        + One
        + FromPrimitive
        + 'static
{
}

/// Represents an autonomous or time-dependent ODE right-hand side.
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// x: current state
    /// t: current time
    /// out: buffer to write dx/dt into
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// Outcome of a single attempted step of an adaptive method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepOutcome {
    /// Weighted RMS norm of the local error estimate; `<= 1` means accept.
    pub error_norm: f64,
    /// Order of the embedded error estimator, used by the step controller.
    pub estimator_order: u32,
}

/// A system that can be evaluated both on plain floats and on dual numbers.
/// Implicit methods need the dual evaluation to build Jacobians.
pub trait OdeSystem: DynamicalSystem<f64> + DynamicalSystem<Dual> {}

impl<S: DynamicalSystem<f64> + DynamicalSystem<Dual> + ?Sized> OdeSystem for S {}

/// A trait for solvers that can attempt one step of size dt.
///
/// The stepper writes the candidate solution into `next` and leaves `state`
/// untouched, so the integrator can retry with a smaller step on rejection.
pub trait Steppable {
    fn attempt(
        &mut self,
        system: &impl OdeSystem,
        t: f64,
        state: &[f64],
        dt: f64,
        tolerance: &Tolerance,
        next: &mut [f64],
    ) -> StepOutcome;

    /// Called after a step is accepted so FSAL methods can reuse stages.
    fn accept(&mut self) {}

    /// Drops any cached stage information, e.g. after a method switch.
    fn reset(&mut self) {}
}

/// Absolute and relative tolerance pair used to weight local errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub relative: f64,
    pub absolute: f64,
}

impl Tolerance {
    /// Weighted RMS norm of `error` relative to the magnitude of `y0`/`y1`.
    pub fn error_norm(&self, error: &[f64], y0: &[f64], y1: &[f64]) -> f64 {
        if error.is_empty() {
            return 0.0;
        }
        let sum: f64 = error
            .iter()
            .zip(y0.iter().zip(y1))
            .map(|(e, (a, b))| {
                let scale = self.absolute + self.relative * a.abs().max(b.abs());
                let ratio = e / scale;
                ratio * ratio
            })
            .sum();
        (sum / error.len() as f64).sqrt()
    }
}
