use std::time::Instant;

use log::info;

use super::{IntervalEngine, SolveParams};
use crate::{
    error::SolveError,
    model::{build_interval_model, IntervalModel},
    problem::ProblemInstance,
    solution::{relative_gap, JobAllocation, Solution},
};

/// Interval formulation pipeline of one instance. Task `i` of the model is job
/// `i` of the instance and alternative `a` its mode `a + 1`.
pub struct ProblemSolverCp<'a> {
    problem: &'a ProblemInstance,
    model: IntervalModel,
}

impl<'a> ProblemSolverCp<'a> {
    pub fn new(problem: &'a ProblemInstance) -> Result<Self, SolveError> {
        Ok(Self {
            problem,
            model: build_interval_model(problem)?,
        })
    }

    pub fn model(&self) -> &IntervalModel {
        &self.model
    }

    pub fn solve(&self, engine: &dyn IntervalEngine, params: &SolveParams) -> Result<Solution, SolveError> {
        if params.verbose {
            info!(
                "interval model: {} tasks, {} precedences, horizon {}",
                self.model.tasks.len(),
                self.model.precedences.len(),
                self.model.horizon
            );
        }

        info!("solving {} with the {} engine", self.problem.name, engine.name());

        let started = Instant::now();
        let outcome = engine.solve(&self.model, params)?;
        let runtime = started.elapsed().as_secs_f64();

        if !outcome.status.has_solution() {
            return Ok(Solution::without_schedule(outcome.status, runtime));
        }

        let jobs = self.problem.jobs();
        if outcome.tasks.len() != jobs.len() {
            return Err(SolveError::SolutionLength {
                expected: jobs.len(),
                found: outcome.tasks.len(),
            });
        }

        let job_allocations = jobs
            .iter()
            .zip(&outcome.tasks)
            .map(|(job, task)| {
                JobAllocation::new(
                    &job.id,
                    task.start,
                    task.end.saturating_sub(task.start),
                    task.alternative + 1,
                )
            })
            .collect();

        Ok(Solution {
            status: outcome.status,
            gap: relative_gap(outcome.objective as f64, outcome.bound as f64),
            objective_bound: outcome.bound as f64,
            makespan: outcome.objective,
            runtime,
            job_allocations,
        })
    }
}
