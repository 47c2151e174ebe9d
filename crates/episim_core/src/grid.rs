use crate::error::{SimResult, SimulationError};
use serde::{Deserialize, Serialize};

/// `days` evenly spaced output times covering `[0, days]`, endpoints included.
///
/// The grid has as many points as days, so the spacing is `days / (days - 1)`
/// rather than exactly one day. A one-day horizon yields the single point 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    points: Vec<f64>,
}

impl TimeGrid {
    pub fn new(days: u32) -> SimResult<Self> {
        if days == 0 {
            return Err(SimulationError::invalid(
                "days",
                "simulation horizon must be at least one day",
            ));
        }
        let count = days as usize;
        let end = days as f64;
        let points = if count == 1 {
            vec![0.0]
        } else {
            let spacing = end / (count - 1) as f64;
            (0..count)
                .map(|i| if i + 1 == count { end } else { i as f64 * spacing })
                .collect()
        };
        Ok(Self { points })
    }

    /// Builds a grid from explicit, strictly increasing times.
    pub fn from_points(points: Vec<f64>) -> SimResult<Self> {
        if points.is_empty() {
            return Err(SimulationError::invalid("grid", "grid must not be empty"));
        }
        if points.iter().any(|t| !t.is_finite()) {
            return Err(SimulationError::invalid("grid", "grid times must be finite"));
        }
        if points.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimulationError::invalid(
                "grid",
                "grid times must be strictly increasing",
            ));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start(&self) -> f64 {
        self.points[0]
    }

    pub fn end(&self) -> f64 {
        self.points[self.points.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_one_point_per_day_with_inclusive_endpoints() {
        let grid = TimeGrid::new(100).unwrap();
        assert_eq!(grid.len(), 100);
        assert_eq!(grid.start(), 0.0);
        assert_eq!(grid.end(), 100.0);
        let spacing = 100.0 / 99.0;
        assert!((grid.points()[1] - spacing).abs() < 1e-12);
        assert!(grid.points().windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn single_day_grid_is_origin_only() {
        let grid = TimeGrid::new(1).unwrap();
        assert_eq!(grid.points(), &[0.0]);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(TimeGrid::new(0).is_err());
        assert!(TimeGrid::from_points(vec![]).is_err());
        assert!(TimeGrid::from_points(vec![0.0, 1.0, 1.0]).is_err());
        assert!(TimeGrid::from_points(vec![0.0, f64::NAN]).is_err());
        assert!(TimeGrid::from_points(vec![0.0, 0.5, 2.0]).is_ok());
    }
}
