use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use instance_io::read_instance;
use log::{debug, error, info, warn};
use mrcpsp::{solve_instance, ProblemInstance, Solution, SolutionStatus, SolveReport, SolverConfig};
use serde::{Deserialize, Serialize};

use super::{read_json, results::ResultSink, Outcome};
use crate::Solve;

/// Batch run over `<instances_directory>/<instance_name>_<index>.json` for
/// every index of the inclusive range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub instances_directory: PathBuf,
    pub instance_name: String,
    pub first_instance_index: usize,
    pub last_instance_index: usize,
    pub results_directory: PathBuf,
    #[serde(flatten)]
    pub solver: SolverConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            instances_directory: PathBuf::from("instances"),
            instance_name: String::from("instance"),
            first_instance_index: 0,
            last_instance_index: 10,
            results_directory: PathBuf::from("results"),
            solver: SolverConfig::default(),
        }
    }
}

impl BatchConfig {
    fn instance_id(&self, index: usize) -> String {
        format!("{}_{index}", self.instance_name)
    }

    fn apply_overrides(&mut self, solve: &Solve) {
        if let Some(engine) = solve.engine {
            self.solver.engine = engine;
        }
        if let Some(time_limit) = solve.time_limit {
            self.solver.time_limit = time_limit;
        }
        if let Some(threads) = solve.threads {
            self.solver.threads = threads;
        }
    }
}

pub fn solve(solve: Solve) -> Result<Outcome> {
    let mut config: BatchConfig = read_json(&solve.config)?;
    config.apply_overrides(&solve);
    debug!("{config:?}");

    fs::create_dir_all(&config.results_directory)
        .with_context(|| format!("creating {}", config.results_directory.display()))?;

    let mut sink = ResultSink::new(&config.results_directory);
    let mut outcome = Outcome::Success;

    for index in config.first_instance_index..=config.last_instance_index {
        let instance_id = config.instance_id(index);

        let report = match solve_one(&config, &instance_id) {
            Ok(report) => report,
            Err(err) => {
                error!("{instance_id}: {err:#}");
                sink.add_statistics(&instance_id, &Solution::without_schedule(SolutionStatus::Error, 0.0));
                outcome = outcome.max(Outcome::NoSolution);
                continue;
            }
        };

        let solution = &report.solution;
        sink.add_statistics(&instance_id, solution);

        if !solution.status.has_solution() {
            warn!("{instance_id}: no schedule found ({})", solution.status);
            outcome = outcome.max(Outcome::NoSolution);
            continue;
        }

        if !report.is_trusted() {
            error!("{instance_id}: schedule failed the check and is not written");
            outcome = outcome.max(Outcome::CheckFailed);
            continue;
        }

        info!(
            "{instance_id}: {} makespan {} in {:.3}s",
            solution.status, solution.makespan, solution.runtime
        );

        sink.add_solution(&instance_id, solution);
        sink.write_allocations(&instance_id, solution)?;
    }

    sink.write()?;

    Ok(outcome)
}

fn solve_one(config: &BatchConfig, instance_id: &str) -> Result<SolveReport> {
    let path = config
        .instances_directory
        .join(format!("{instance_id}.json"));

    let file = read_instance(&path)?;
    let problem = ProblemInstance::from_instance_file(instance_id, &file)
        .with_context(|| format!("building problem from {}", path.display()))?;

    Ok(solve_instance(&problem, &config.solver)?)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use mrcpsp::EngineKind;

    use super::BatchConfig;
    use crate::Solve;

    #[test]
    fn solver_settings_are_flattened() {
        let config: BatchConfig = serde_json::from_str(
            r#"{
                "instances_directory": "data",
                "last_instance_index": 2,
                "engine": "tabu_search",
                "time_limit": 5.0,
                "tabu": {"seed": 7}
            }"#,
        )
        .unwrap();

        assert_eq!(config.instances_directory, PathBuf::from("data"));
        assert_eq!(config.instance_name, "instance");
        assert_eq!(config.last_instance_index, 2);
        assert_eq!(config.solver.engine, EngineKind::TabuSearch);
        assert_eq!(config.solver.time_limit, 5.0);
        assert_eq!(config.solver.tabu.seed, Some(7));
        assert_eq!(config.instance_id(2), "instance_2");
    }

    #[test]
    fn command_line_overrides_file() {
        let mut config = BatchConfig::default();
        config.apply_overrides(&Solve {
            config: PathBuf::from("unused.json"),
            engine: Some(EngineKind::TabuSearch),
            time_limit: Some(0.0),
            threads: None,
        });

        assert_eq!(config.solver.engine, EngineKind::TabuSearch);
        assert_eq!(config.solver.time_limit(), None);
        assert_eq!(config.solver.threads, BatchConfig::default().solver.threads);
    }
}
