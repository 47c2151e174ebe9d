use crate::config::{Plan, RunConfig};
use anyhow::{Context, Result};
use episim_core::simulate;
use episim_core::summary::Summary;
use episim_core::sweep::{run_sweep, ScenarioResult};
use episim_core::table::Table;

/// Everything a run produces: the output table plus the figures logged with
/// `--summary`.
#[derive(Debug)]
pub struct Report {
    pub table: Table,
    pub summary: Option<Summary>,
    pub scenarios: Vec<ScenarioResult>,
}

pub fn execute(config: &RunConfig) -> Result<Report> {
    match config.plan()? {
        Plan::Single(params) => {
            let simulation =
                simulate(&params, &config.integrator).context("failed to run simulation")?;
            let stats = simulation.trajectory().stats();
            log::info!(
                "simulated {} for {} days ({} steps, {} rejected, {} method switches)",
                params.kind(),
                params.days(),
                stats.accepted_steps,
                stats.rejected_steps,
                stats.method_switches
            );
            Ok(Report {
                table: simulation.table()?,
                summary: Some(simulation.summary()),
                scenarios: Vec::new(),
            })
        }
        Plan::Sweep { base, sweep } => {
            let scenarios =
                run_sweep(&base, &sweep, &config.integrator).context("failed to run sweep")?;
            Ok(Report {
                table: Table::from_scenarios(&scenarios),
                summary: None,
                scenarios,
            })
        }
    }
}

pub fn log_summary(report: &Report) {
    if let Some(summary) = &report.summary {
        log::info!(
            "{}: peak infected {:.2} on day {:.2}",
            summary.model,
            summary.peak_infected,
            summary.peak_day
        );
        for value in &summary.final_values {
            log::info!("final {}: {:.4}", value.compartment, value.value);
        }
        if let Some(final_size) = summary.final_size {
            log::info!("final size: {:.2}% of the population", 100.0 * final_size);
        }
        match summary.r0 {
            Some(r0) => log::info!("R0 = {r0:.4}"),
            None => log::info!("R0 undefined for these parameters"),
        }
        if let Some(threshold) = summary.herd_immunity_threshold {
            log::info!("herd immunity threshold: {:.2}%", 100.0 * threshold);
        }
        if let Some(equilibrium) = summary.endemic_equilibrium {
            log::info!("endemic equilibrium: {equilibrium:.4} infected");
        }
    }
    for scenario in &report.scenarios {
        log::info!(
            "{}: a = {:.3}, m = {:.3}, R0 = {}, peak infected humans = {:.2}",
            scenario.label,
            scenario.bionomics.biting_rate,
            scenario.bionomics.vector_density,
            scenario
                .r0
                .map_or_else(|| "undefined".to_string(), |r0| format!("{r0:.4}")),
            scenario.peak_infected_humans()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_run_reports_table_and_summary() {
        let config = RunConfig::from_toml_str(
            r#"
[simulation]
model = "SEIR"

[simulation.parameters]
population = 500
initial_infected = 5
initial_recovered = 0
initial_exposed = 0
beta = 0.4
gamma = 0.1
sigma = 0.2
days = 50
"#,
        )
        .unwrap();
        let report = execute(&config).unwrap();
        assert_eq!(
            report.table.columns(),
            ["Day", "Susceptible", "Exposed", "Infected", "Recovered"]
        );
        assert_eq!(report.table.len(), 50);
        let summary = report.summary.expect("summary");
        assert!((summary.r0.unwrap() - 4.0).abs() < 1e-12);
        assert!(report.scenarios.is_empty());
    }

    #[test]
    fn sweep_reports_long_table() {
        let config = RunConfig::from_toml_str(
            r#"
[simulation]
model = "RossMacdonald"

[simulation.parameters]
human_population = 1000
initial_infected_humans = 10
initial_infected_vectors = 0
b = 0.5
c = 0.5
gamma = 0.1
mu = 0.1
days = 20

[sweep]
variable = "humidity"
base = 30
step = 10
count = 2
fixed = 25
"#,
        )
        .unwrap();
        let report = execute(&config).unwrap();
        assert_eq!(report.table.columns(), ["Scenario", "Day", "Human Infected"]);
        assert_eq!(report.table.len(), 40);
        assert_eq!(report.scenarios.len(), 2);
        assert!(report.summary.is_none());
        assert!(report.table.to_csv().starts_with("Scenario,Day,Human Infected\n"));
    }
}
