use thiserror::Error;

/// Failure modes of a simulation request. None of them are retried; the
/// caller corrects its input and asks again.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationError {
    #[error("Model {model} requires parameter `{field}`, which was not supplied.")]
    MissingParameter { model: String, field: String },
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: String, reason: String },
    #[error("Division by zero: {what} must be at least 1.")]
    DivisionByZero { what: String },
    #[error("Integration failed: {0}")]
    Integration(String),
}

impl SimulationError {
    pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn division_by_zero(what: &str) -> Self {
        Self::DivisionByZero {
            what: what.to_string(),
        }
    }
}

/// Convenience type for `Result<T, SimulationError>`.
pub type SimResult<T> = Result<T, SimulationError>;
