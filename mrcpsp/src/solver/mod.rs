use std::time::Duration;

use log::{info, warn};

use crate::{
    config::{EngineKind, SolverConfig},
    error::SolveError,
    model::{IlpModel, IntervalModel},
    problem::ProblemInstance,
    solution::{
        assign_resource_units,
        checker::{CheckReport, SolutionChecker},
        Solution, SolutionStatus,
    },
};

pub mod cp;
pub mod ilp;
pub mod milp;
pub mod sources_load;
pub mod tabu;
pub mod tabu_list;

pub use cp::ProblemSolverCp;
pub use ilp::ProblemSolverIlp;
pub use milp::MilpEngine;
pub use tabu::TabuSearchEngine;

/// Engine parameters of one solve call.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveParams {
    pub relative_gap: f64,
    pub time_limit: Option<Duration>,
    pub threads: usize,
    pub verbose: bool,
}

impl Default for SolveParams {
    fn default() -> Self {
        Self::from(&SolverConfig::default())
    }
}

impl From<&SolverConfig> for SolveParams {
    fn from(config: &SolverConfig) -> Self {
        Self {
            relative_gap: config.relative_gap,
            time_limit: config.time_limit(),
            threads: config.threads.max(1),
            verbose: config.verbose,
        }
    }
}

/// Result of an ILP engine. `values` is indexed like the model columns and is
/// only filled for optimal and feasible outcomes.
#[derive(Debug, Clone, PartialEq)]
pub struct IlpOutcome {
    pub status: SolutionStatus,
    pub objective: f64,
    pub bound: f64,
    pub values: Vec<f64>,
}

impl IlpOutcome {
    pub fn without_values(status: SolutionStatus) -> Self {
        Self {
            status,
            objective: 0.0,
            bound: 0.0,
            values: vec![],
        }
    }
}

/// Black box solving a time-indexed linear model. Engine specific failures
/// are reported as [`SolveError::EngineFailure`].
pub trait IlpEngine {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &IlpModel, params: &SolveParams) -> Result<IlpOutcome, SolveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOutcome {
    pub start: usize,
    pub end: usize,
    /// 0-based index of the present alternative
    pub alternative: usize,
}

/// Result of an interval engine, one entry per task in model order when a
/// schedule was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalOutcome {
    pub status: SolutionStatus,
    pub objective: usize,
    pub bound: usize,
    pub tasks: Vec<TaskOutcome>,
}

impl IntervalOutcome {
    pub fn without_tasks(status: SolutionStatus) -> Self {
        Self {
            status,
            objective: 0,
            bound: 0,
            tasks: vec![],
        }
    }
}

pub trait IntervalEngine {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &IntervalModel, params: &SolveParams) -> Result<IntervalOutcome, SolveError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    pub solution: Solution,
    /// Present when checking is enabled and a schedule was found
    pub check: Option<CheckReport>,
}

impl SolveReport {
    /// `false` only when a check ran and found violations.
    pub fn is_trusted(&self) -> bool {
        self.check.as_ref().map_or(true, CheckReport::is_valid)
    }
}

/// Solves `problem` with the engine selected in `config`, then optionally
/// checks the schedule and assigns resource units.
///
/// Units are only assigned to schedules the checker accepted, so an
/// overloaded schedule ends up as a failed check instead of an
/// [`AllocationError`](crate::error::AllocationError).
pub fn solve_instance(problem: &ProblemInstance, config: &SolverConfig) -> Result<SolveReport, SolveError> {
    let params = SolveParams::from(config);

    let solution = match config.engine {
        EngineKind::Milp => {
            let engine = MilpEngine::new();
            let solution = ProblemSolverIlp::new(problem)?.solve(&engine, &params);
            engine.join_abandoned();
            solution?
        }
        EngineKind::TabuSearch => {
            ProblemSolverCp::new(problem)?.solve(&TabuSearchEngine::new(config.tabu.clone()), &params)?
        }
    };

    finish_report(problem, solution, config)
}

fn finish_report(
    problem: &ProblemInstance,
    mut solution: Solution,
    config: &SolverConfig,
) -> Result<SolveReport, SolveError> {
    if !solution.status.has_solution() {
        info!("{}: no schedule found, status {}", problem.name, solution.status);
        return Ok(SolveReport { solution, check: None });
    }

    let check = if config.check_solution {
        let report = SolutionChecker::new(problem, &solution).check_solution()?;
        if !report.is_valid() {
            warn!("{}: {report}", problem.name);
        }
        Some(report)
    } else {
        None
    };

    if config.assign_resource_units {
        if check.as_ref().map_or(true, CheckReport::is_valid) {
            assign_resource_units(problem, &mut solution)?;
        } else {
            warn!("{}: no resource units assigned to a rejected schedule", problem.name);
        }
    }

    Ok(SolveReport { solution, check })
}

#[cfg(test)]
mod tests {
    use super::{finish_report, solve_instance, SolveParams};
    use crate::{
        config::{EngineKind, SolverConfig, TabuOptions},
        problem::{
            tests::{multi_mode_problem, two_job_problem},
            Mode, ProblemInstance,
        },
        solution::{JobAllocation, Solution, SolutionStatus},
    };

    fn config(engine: EngineKind) -> SolverConfig {
        SolverConfig {
            engine,
            threads: 2,
            assign_resource_units: true,
            tabu: TabuOptions {
                seed: Some(3),
                ..TabuOptions::default()
            },
            ..SolverConfig::default()
        }
    }

    #[test]
    fn params_follow_config() {
        let params = SolveParams::from(&SolverConfig {
            threads: 0,
            time_limit: 2.5,
            ..SolverConfig::default()
        });

        assert_eq!(params.threads, 1);
        assert_eq!(params.time_limit.map(|limit| limit.as_millis()), Some(2500));
    }

    #[test]
    fn both_engines_schedule_the_concrete_scenario() {
        let problem = two_job_problem();

        for engine in [EngineKind::Milp, EngineKind::TabuSearch] {
            let report = solve_instance(&problem, &config(engine)).unwrap();

            assert!(report.solution.status.has_solution(), "{engine}");
            assert_eq!(report.solution.makespan, 5, "{engine}");
            assert!(report.is_trusted(), "{engine}");
            assert!(report.check.is_some());
            assert!(report
                .solution
                .job_allocations
                .iter()
                .all(|allocation| allocation.units_map.is_some()));
        }
    }

    #[test]
    fn engines_agree_on_multi_mode_instance() {
        let problem = multi_mode_problem();

        let milp = solve_instance(&problem, &config(EngineKind::Milp)).unwrap();
        let tabu = solve_instance(&problem, &config(EngineKind::TabuSearch)).unwrap();

        assert_eq!(milp.solution.status, SolutionStatus::Optimal);
        assert!(milp.is_trusted());
        assert!(tabu.is_trusted());
        assert!(tabu.solution.makespan >= milp.solution.makespan);
        assert_eq!(milp.solution.job_allocations.len(), 4);
        assert_eq!(tabu.solution.job_allocations.len(), 4);
    }

    #[test]
    fn late_release_extends_the_schedule() {
        let problem = ProblemInstance::builder("late")
            .resource("r_0", 2)
            .job("A", 0, vec![Mode::new(vec![1], 2)], &[])
            .job("B", 3, vec![Mode::new(vec![1], 2)], &[])
            .build()
            .unwrap();

        for engine in [EngineKind::Milp, EngineKind::TabuSearch] {
            let report = solve_instance(&problem, &config(engine)).unwrap();

            assert_eq!(report.solution.status, SolutionStatus::Optimal, "{engine}");
            assert_eq!(report.solution.makespan, 5, "{engine}");
            assert_eq!(report.solution.allocation("B").unwrap().start_time, 3, "{engine}");
            assert!(report.is_trusted(), "{engine}");
        }
    }

    #[test]
    fn zero_duration_job_needs_no_free_units() {
        let problem = ProblemInstance::builder("instant")
            .resource("r_0", 1)
            .job("A", 0, vec![Mode::new(vec![1], 3)], &[])
            .job("Z", 0, vec![Mode::new(vec![1], 0)], &[])
            .build()
            .unwrap();

        let report = solve_instance(&problem, &config(EngineKind::Milp)).unwrap();

        assert_eq!(report.solution.makespan, 3);
        assert!(report.is_trusted());
        assert_eq!(
            report.solution.allocation("Z").unwrap().units_map,
            Some(Default::default())
        );
    }

    #[test]
    fn overloaded_schedule_fails_the_check_before_unit_assignment() {
        let problem = two_job_problem();
        let mut solution = Solution {
            job_allocations: vec![JobAllocation::new("A", 0, 3, 1), JobAllocation::new("B", 1, 2, 1)],
            ..Solution::without_schedule(SolutionStatus::Feasible, 0.0)
        };
        solution.makespan = solution.compute_makespan();

        let report = finish_report(&problem, solution, &config(EngineKind::Milp)).unwrap();

        assert!(!report.is_trusted());
        assert!(report
            .solution
            .job_allocations
            .iter()
            .all(|allocation| allocation.units_map.is_none()));
    }
}
