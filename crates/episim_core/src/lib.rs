pub mod autodiff;
pub mod bionomics;
pub mod derivatives;
pub mod error;
pub mod grid;
pub mod integrator;
pub mod model;
pub mod params;
pub mod simulation;
pub mod solvers;
pub mod summary;
pub mod sweep;
pub mod table;
/// The `episim_core` crate is the simulation engine behind the episim tools.
/// Model equations are written once, generically over `Scalar`, so the same
/// code runs on `f64` for stepping and on Dual numbers for Jacobians.
///
/// Key components:
/// - **Model**: the registry of model kinds, their compartments and required fields.
/// - **Params / Derivatives**: typed parameter sets and the ODE right-hand sides.
/// - **Integrator**: adaptive Tsit5 / Rosenbrock23 with automatic stiffness switching, plus fixed-step RK4.
/// - **Bionomics / Sweep**: climate-driven vector coefficients and Ross-Macdonald scenario sweeps.
/// - **Table / Summary**: tabular output and headline statistics for presentation layers.
pub mod traits;

pub use error::{SimResult, SimulationError};
pub use integrator::{IntegratorSettings, Method, Trajectory};
pub use model::ModelKind;
pub use params::ModelParameters;
pub use simulation::{simulate, Simulation};
