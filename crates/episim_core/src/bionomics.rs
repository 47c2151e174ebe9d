//! Climate-driven vector bionomics.
//!
//! Maps temperature and relative humidity to the two Ross-Macdonald
//! coefficients that depend on climate. The map is total: floors absorb
//! out-of-range inputs instead of rejecting them.

use serde::{Deserialize, Serialize};

/// Lowest biting rate the converter will report, in bites per vector per day.
pub const MIN_BITING_RATE: f64 = 0.05;
/// Lowest vector density reported for dry climates, in vectors per human.
pub const MIN_VECTOR_DENSITY: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Climate {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
}

impl Climate {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    pub fn bionomics(&self) -> Bionomics {
        Bionomics::from_climate(self)
    }
}

/// Coefficients substituted for `a` and `m` in the Ross-Macdonald model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bionomics {
    pub biting_rate: f64,
    pub vector_density: f64,
}

impl Bionomics {
    pub fn from_climate(climate: &Climate) -> Self {
        Self {
            biting_rate: biting_rate(climate.temperature),
            vector_density: vector_density(climate.humidity),
        }
    }
}

/// a(T) = max(0.05, 0.2 + 0.02·(T − 20)).
pub fn biting_rate(temperature: f64) -> f64 {
    (0.2 + 0.02 * (temperature - 20.0)).max(MIN_BITING_RATE)
}

/// m(H) = max(0.1, H/100) below 30 % humidity, 1 + 0.05·(H − 30) from there on.
///
/// The two branches meet at H = 30 only in the limit (0.3 against 1.0 from
/// the left); the upper branch owns the boundary.
pub fn vector_density(humidity: f64) -> f64 {
    if humidity < 30.0 {
        (humidity / 100.0).max(MIN_VECTOR_DENSITY)
    } else {
        1.0 + 0.05 * (humidity - 30.0)
    }
}
