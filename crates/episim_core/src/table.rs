//! Tabular results handed to presentation layers.
//!
//! A [`Table`] is an ordered list of named columns and rows of [`Cell`]s.
//! It serializes as a sequence of records, each a map from column name to
//! value in column order, and renders as CSV.

use crate::error::{SimResult, SimulationError};
use crate::integrator::Trajectory;
use crate::model::{ModelKind, DAY_COLUMN, SCENARIO_COLUMN};
use crate::sweep::ScenarioResult;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(value) => Some(*value),
            Cell::Text(_) => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// `Day` followed by the model's compartments, one row per grid time.
    pub fn from_trajectory(kind: ModelKind, trajectory: &Trajectory) -> SimResult<Self> {
        if trajectory.dimension() != kind.dimension() {
            return Err(SimulationError::invalid(
                "trajectory",
                format!(
                    "{kind} has {} compartments but the trajectory carries {}",
                    kind.dimension(),
                    trajectory.dimension()
                ),
            ));
        }
        let columns = std::iter::once(DAY_COLUMN).chain(kind.compartments().iter().copied());
        let mut table = Table::new(columns);
        table.rows = trajectory
            .times()
            .iter()
            .zip(trajectory.states())
            .map(|(&t, state)| {
                std::iter::once(Cell::Number(t))
                    .chain(state.iter().map(|&v| Cell::Number(v)))
                    .collect()
            })
            .collect();
        Ok(table)
    }

    /// Long-format comparison table: `Scenario`, `Day`, `Human Infected`,
    /// scenarios stacked in sweep order.
    pub fn from_scenarios(scenarios: &[ScenarioResult]) -> Self {
        let kind = ModelKind::RossMacdonald;
        let infected = kind.compartments()[kind.infected_index()];
        let mut table = Table::new([SCENARIO_COLUMN, DAY_COLUMN, infected]);
        for scenario in scenarios {
            for (&day, &value) in scenario.days.iter().zip(&scenario.infected_humans) {
                table.rows.push(vec![
                    Cell::Text(scenario.label.clone()),
                    Cell::Number(day),
                    Cell::Number(value),
                ]);
            }
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> SimResult<()> {
        if row.len() != self.columns.len() {
            return Err(SimulationError::invalid(
                "row",
                format!("expected {} cells, got {}", self.columns.len(), row.len()),
            ));
        }
        self.rows.push(row);
        Ok(())
    }

    fn index_of(&self, name: &str) -> SimResult<usize> {
        self.columns
            .iter()
            .position(|column| column == name)
            .ok_or_else(|| {
                SimulationError::invalid(
                    "column",
                    format!("no column named `{name}` (have: {})", self.columns.join(", ")),
                )
            })
    }

    /// Numeric values of one column; text cells are skipped.
    pub fn numeric_column(&self, name: &str) -> SimResult<Vec<f64>> {
        let index = self.index_of(name)?;
        Ok(self
            .rows
            .iter()
            .filter_map(|row| row[index].as_number())
            .collect())
    }

    /// Projection onto `names`, in the order given.
    pub fn select(&self, names: &[&str]) -> SimResult<Table> {
        let indices = names
            .iter()
            .map(|name| self.index_of(name))
            .collect::<SimResult<Vec<_>>>()?;
        Ok(Table {
            columns: names.iter().map(|name| name.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// CSV with a header row. Fields containing separators or quotes are
    /// quoted.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| csv_field(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in &self.rows {
            let fields: Vec<String> = row.iter().map(|cell| csv_field(&cell.to_string())).collect();
            // Writing to a String cannot fail.
            let _ = writeln!(out, "{}", fields.join(","));
        }
        out
    }
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

struct Record<'a> {
    columns: &'a [String],
    cells: &'a [Cell],
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

impl Serialize for Table {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                columns: &self.columns,
                cells: row,
            })?;
        }
        seq.end()
    }
}
