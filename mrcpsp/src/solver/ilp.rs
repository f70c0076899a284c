use std::time::Instant;

use log::info;

use super::{IlpEngine, SolveParams};
use crate::{
    error::SolveError,
    model::{build_ilp_model, IlpModel, VariableMapping},
    problem::ProblemInstance,
    solution::{reconstruct_allocations, relative_gap, Solution},
};

/// Time-indexed ILP pipeline of one instance: the model is built once in
/// [`ProblemSolverIlp::new`] and may be handed to any [`IlpEngine`].
pub struct ProblemSolverIlp<'a> {
    problem: &'a ProblemInstance,
    model: IlpModel,
    mapping: VariableMapping,
}

impl<'a> ProblemSolverIlp<'a> {
    pub fn new(problem: &'a ProblemInstance) -> Result<Self, SolveError> {
        let (model, mapping) = build_ilp_model(problem)?;
        model.check_formulation()?;

        Ok(Self {
            problem,
            model,
            mapping,
        })
    }

    pub fn model(&self) -> &IlpModel {
        &self.model
    }

    pub fn mapping(&self) -> &VariableMapping {
        &self.mapping
    }

    pub fn solve(&self, engine: &dyn IlpEngine, params: &SolveParams) -> Result<Solution, SolveError> {
        if params.verbose {
            self.model.log_statistics();
        }

        info!("solving {} with the {} engine", self.problem.name, engine.name());

        let started = Instant::now();
        let outcome = engine.solve(&self.model, params)?;
        let runtime = started.elapsed().as_secs_f64();

        if !outcome.status.has_solution() {
            return Ok(Solution::without_schedule(outcome.status, runtime));
        }

        let job_allocations = reconstruct_allocations(self.problem, &self.mapping, &outcome.values)?;

        Ok(Solution {
            status: outcome.status,
            gap: relative_gap(outcome.objective, outcome.bound),
            objective_bound: outcome.bound,
            makespan: outcome.objective.round().max(0.0) as usize,
            runtime,
            job_allocations,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::ProblemSolverIlp;
    use crate::{
        error::SolveError,
        model::{IlpModel, VariableKey},
        problem::tests::two_job_problem,
        solution::SolutionStatus,
        solver::{IlpEngine, IlpOutcome, SolveParams},
    };

    /// Replays a fixed outcome.
    struct FixedEngine {
        outcome: IlpOutcome,
        calls: Cell<usize>,
    }

    impl IlpEngine for FixedEngine {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn solve(&self, _: &IlpModel, _: &SolveParams) -> Result<IlpOutcome, SolveError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.outcome.clone())
        }
    }

    struct FailingEngine;

    impl IlpEngine for FailingEngine {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn solve(&self, _: &IlpModel, _: &SolveParams) -> Result<IlpOutcome, SolveError> {
            Err(SolveError::EngineFailure {
                engine: "failing",
                reason: "license expired".into(),
            })
        }
    }

    fn fixed(outcome: IlpOutcome) -> FixedEngine {
        FixedEngine {
            outcome,
            calls: Cell::new(0),
        }
    }

    #[test]
    fn feasible_outcome_is_reconstructed() {
        let problem = two_job_problem();
        let solver = ProblemSolverIlp::new(&problem).unwrap();
        let mapping = solver.mapping();

        // A at 0, B at 3
        let mut values = vec![0.0; mapping.len()];
        for (key, value) in [
            (VariableKey::Makespan, 5.0),
            (VariableKey::StartTime(0), 0.0),
            (VariableKey::StartTime(1), 3.0),
            (VariableKey::ProcessingTime(0), 3.0),
            (VariableKey::ProcessingTime(1), 2.0),
            (
                VariableKey::ModeSelection {
                    job: 0,
                    mode: 0,
                    time: 0,
                },
                1.0,
            ),
            (
                VariableKey::ModeSelection {
                    job: 1,
                    mode: 0,
                    time: 3,
                },
                1.0,
            ),
        ] {
            values[mapping.index(key).unwrap()] = value;
        }
        assert!(solver.model().violated_constraints(&values).is_empty());

        let engine = fixed(IlpOutcome {
            status: SolutionStatus::Feasible,
            objective: 5.0,
            bound: 4.0,
            values,
        });
        let solution = solver.solve(&engine, &SolveParams::default()).unwrap();

        assert_eq!(engine.calls.get(), 1);
        assert_eq!(solution.status, SolutionStatus::Feasible);
        assert_eq!(solution.makespan, 5);
        assert_eq!(solution.gap, 0.2);
        assert_eq!(solution.objective_bound, 4.0);
        assert_eq!(solution.allocation("B").unwrap().start_time, 3);
        assert_eq!(solution.allocation("B").unwrap().mode_id, 1);
    }

    #[test]
    fn no_reconstruction_without_schedule() {
        let problem = two_job_problem();
        let solver = ProblemSolverIlp::new(&problem).unwrap();

        for status in [
            SolutionStatus::Infeasible,
            SolutionStatus::Unknown,
            SolutionStatus::Unbounded,
        ] {
            let solution = solver
                .solve(&fixed(IlpOutcome::without_values(status)), &SolveParams::default())
                .unwrap();

            assert_eq!(solution.status, status);
            assert!(solution.job_allocations.is_empty());
            assert_eq!(solution.makespan, 0);
        }
    }

    #[test]
    fn engine_errors_pass_through() {
        let problem = two_job_problem();
        let solver = ProblemSolverIlp::new(&problem).unwrap();

        assert!(matches!(
            solver.solve(&FailingEngine, &SolveParams::default()),
            Err(SolveError::EngineFailure { engine: "failing", .. })
        ));
    }

    #[test]
    fn truncated_vector_is_rejected() {
        let problem = two_job_problem();
        let solver = ProblemSolverIlp::new(&problem).unwrap();
        let engine = fixed(IlpOutcome {
            status: SolutionStatus::Optimal,
            objective: 5.0,
            bound: 5.0,
            values: vec![5.0],
        });

        assert!(matches!(
            solver.solve(&engine, &SolveParams::default()),
            Err(SolveError::SolutionLength { found: 1, .. })
        ));
    }
}
