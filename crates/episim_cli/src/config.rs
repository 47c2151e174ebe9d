use anyhow::{bail, Context, Result};
use episim_core::params::{ModelParameters, RossMacdonaldParameters};
use episim_core::sweep::{climate_base_from_named, SweepSpec};
use episim_core::{IntegratorSettings, ModelKind};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Run configuration.
///
/// Loaded from a TOML file with a `[simulation]` table, an optional
/// `[integrator]` table and an optional `[sweep]` table. See
/// [`RunConfig::from_file`] for loading.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub integrator: IntegratorSettings,
    /// Climate sweep over a Ross-Macdonald base; absent for a single run.
    pub sweep: Option<SweepSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub model: String,
    /// Named parameter values, e.g. `beta = 0.2`.
    pub parameters: BTreeMap<String, f64>,
}

/// What a validated configuration asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Single(ModelParameters),
    Sweep {
        base: RossMacdonaldParameters,
        sweep: SweepSpec,
    },
}

impl RunConfig {
    /// Load a [`RunConfig`] from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if the
    /// model, parameters, integrator settings or sweep are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let text = fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid run config {file:?}"))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(text).context("failed to deserialize config")?;
        config.validate().context("failed to validate config")?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.integrator
            .validate()
            .context("invalid integrator settings")?;
        self.plan().map(|_| ())
    }

    pub fn model(&self) -> Result<ModelKind> {
        self.simulation
            .model
            .parse::<ModelKind>()
            .with_context(|| format!("invalid model {:?}", self.simulation.model))
    }

    pub fn plan(&self) -> Result<Plan> {
        let kind = self.model()?;
        let parameters = &self.simulation.parameters;
        match self.sweep {
            None => {
                let params = ModelParameters::from_named(kind, parameters)
                    .context("invalid simulation parameters")?;
                Ok(Plan::Single(params))
            }
            Some(sweep) => {
                if kind != ModelKind::RossMacdonald {
                    bail!("climate sweeps need the RossMacdonald model, but model is {kind}");
                }
                sweep.validate().context("invalid sweep")?;
                let base =
                    climate_base_from_named(parameters).context("invalid simulation parameters")?;
                Ok(Plan::Sweep { base, sweep })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use episim_core::sweep::SweepVariable;
    use episim_core::Method;

    const SIR: &str = r#"
[simulation]
model = "SIR"

[simulation.parameters]
population = 1000
initial_infected = 10
initial_recovered = 0
beta = 0.2
gamma = 0.1
days = 100

[integrator]
method = "tsit5"
relative_tolerance = 1e-6
"#;

    const SWEEP: &str = r#"
[simulation]
model = "ross-macdonald"

[simulation.parameters]
human_population = 1000
initial_infected_humans = 10
initial_infected_vectors = 0
b = 0.5
c = 0.5
gamma = 0.1
mu = 0.1
days = 60

[sweep]
variable = "temperature"
base = 24
step = 2
count = 3
fixed = 60
"#;

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err:#}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    #[test]
    fn parses_single_run() {
        let config = RunConfig::from_toml_str(SIR).unwrap();
        assert_eq!(config.integrator.method, Method::Tsit5);
        assert_eq!(config.integrator.relative_tolerance, 1e-6);
        assert_eq!(config.integrator.absolute_tolerance, 1e-8);
        match config.plan().unwrap() {
            Plan::Single(params) => {
                assert_eq!(params.kind(), ModelKind::Sir);
                assert_eq!(params.days(), 100);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn parses_sweep_without_a_and_m() {
        let config = RunConfig::from_toml_str(SWEEP).unwrap();
        assert_eq!(config.integrator, IntegratorSettings::default());
        match config.plan().unwrap() {
            Plan::Sweep { base, sweep } => {
                assert_eq!(base.human_population, 1000.0);
                assert_eq!(sweep.variable, SweepVariable::Temperature);
                assert_eq!(sweep.values(), vec![24.0, 26.0, 28.0]);
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn rejects_sweeps_on_other_models() {
        let text = format!(
            "{SIR}\n[sweep]\nvariable = \"humidity\"\nbase = 40\nstep = 5\ncount = 2\nfixed = 25\n"
        );
        assert_err_contains(RunConfig::from_toml_str(&text), "RossMacdonald");
    }

    #[test]
    fn reports_missing_parameters_and_bad_values() {
        let missing = SIR.replace("gamma = 0.1\n", "");
        assert_err_contains(RunConfig::from_toml_str(&missing), "`gamma`");

        let negative = SIR.replace("beta = 0.2", "beta = -0.2");
        assert_err_contains(RunConfig::from_toml_str(&negative), "beta");

        let too_many = SWEEP.replace("count = 3", "count = 7");
        assert_err_contains(RunConfig::from_toml_str(&too_many), "count");

        let unknown = SIR.replace("model = \"SIR\"", "model = \"SIRS\"");
        assert_err_contains(RunConfig::from_toml_str(&unknown), "unknown model");

        let typo = SIR.replace("[integrator]", "[integrater]");
        assert!(RunConfig::from_toml_str(&typo).is_err());
    }

    #[test]
    fn rejects_misspelled_integrator_and_sweep_keys() {
        let integrator = SIR.replace(
            "method = \"tsit5\"\nrelative_tolerance = 1e-6",
            "methd = \"rk4\"\nrelative_tolerence = 1e-3",
        );
        assert_ne!(integrator, SIR);
        assert_err_contains(RunConfig::from_toml_str(&integrator), "methd");

        let sweep = SWEEP.replace("count = 3", "count = 3\nstride = 1");
        assert_err_contains(RunConfig::from_toml_str(&sweep), "stride");
    }

    #[test]
    fn from_file_names_the_file() {
        assert_err_contains(
            RunConfig::from_file("/nonexistent/run.toml"),
            "/nonexistent/run.toml",
        );
    }
}
