use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    sync::{
        mpsc::{self, RecvTimeoutError},
        Mutex, PoisonError,
    },
    thread::{self, JoinHandle},
};

use good_lp::{
    default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution as _, SolverModel,
    Variable,
};
use log::{debug, info, warn};

use super::{IlpEngine, IlpOutcome, SolveParams};
use crate::{
    error::SolveError,
    model::{IlpModel, ObjectiveSense, Operator, VariableType},
    solution::SolutionStatus,
};

const ENGINE_NAME: &str = "milp";

/// Mixed integer engine backed by `good_lp` and its pure Rust `microlp`
/// solver. The backend runs on a worker thread so that the time limit bounds
/// the wait; a run outliving it is abandoned and reported as UNKNOWN.
///
/// `microlp` cannot be interrupted, so abandoned workers keep running until
/// the backend returns. The engine keeps their handles and joins them in
/// [`MilpEngine::join_abandoned`] or at the latest when it is dropped.
#[derive(Debug, Default)]
pub struct MilpEngine {
    abandoned: Mutex<Vec<JoinHandle<()>>>,
}

impl MilpEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abandoned workers whose backend run has not returned yet.
    pub fn abandoned_workers(&self) -> usize {
        self.abandoned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Blocks until every abandoned worker has finished.
    pub fn join_abandoned(&self) {
        let handles: Vec<_> = self
            .abandoned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        if handles.iter().any(|handle| !handle.is_finished()) {
            info!("waiting for {} abandoned {ENGINE_NAME} workers", handles.len());
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("abandoned {ENGINE_NAME} worker panicked");
            }
        }
    }
}

impl Drop for MilpEngine {
    fn drop(&mut self) {
        self.join_abandoned();
    }
}

impl IlpEngine for MilpEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn solve(&self, model: &IlpModel, params: &SolveParams) -> Result<IlpOutcome, SolveError> {
        if params.threads > 1 {
            debug!("microlp runs single threaded, ignoring {} threads", params.threads);
        }

        let model = model.clone();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("milp-worker".into())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| run_model(&model)));
                let _ = tx.send(result);
            })
            .map_err(|e| engine_failure(e.to_string()))?;

        let received = match params.time_limit {
            Some(limit) => rx.recv_timeout(limit),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        let mut outcome = match received {
            Ok(Ok(result)) => result.map_err(engine_failure)?,
            Ok(Err(_)) => return Err(engine_failure("backend panicked".into())),
            Err(RecvTimeoutError::Timeout) => {
                warn!("time limit reached before the backend returned a solution, the worker keeps running");
                self.abandoned
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .push(handle);
                return Ok(IlpOutcome::without_values(SolutionStatus::Unknown));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(engine_failure("worker exited without a result".into()))
            }
        };

        if outcome.status == SolutionStatus::Optimal && params.relative_gap > 0.0 {
            outcome.status = SolutionStatus::Feasible;
        }

        info!(
            "{ENGINE_NAME} finished with {} (objective {}, bound {})",
            outcome.status, outcome.objective, outcome.bound
        );

        Ok(outcome)
    }
}

fn engine_failure(reason: String) -> SolveError {
    SolveError::EngineFailure {
        engine: ENGINE_NAME,
        reason,
    }
}

fn linear_expression(columns: &[Variable], terms: impl Iterator<Item = (usize, f64)>) -> Expression {
    terms.fold(Expression::from(0.0), |acc, (column, coefficient)| {
        acc + coefficient * columns[column]
    })
}

fn run_model(model: &IlpModel) -> Result<IlpOutcome, String> {
    let mut vars = ProblemVariables::new();

    let columns: Vec<Variable> = model
        .variables
        .iter()
        .map(|decision| {
            let definition = match decision.kind {
                VariableType::Binary => variable().binary(),
                VariableType::Integer => variable().integer().min(decision.lower).max(decision.upper),
                VariableType::Continuous => variable().min(decision.lower).max(decision.upper),
            };
            vars.add(definition)
        })
        .collect();

    let objective = linear_expression(
        &columns,
        model
            .objective
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, coefficient)| *coefficient != 0.0),
    );

    let mut problem = match model.sense {
        ObjectiveSense::Minimize => vars.minimise(objective),
        ObjectiveSense::Maximize => vars.maximise(objective),
    }
    .using(default_solver);

    for ((row, operator), rhs) in model
        .matrix
        .rows()
        .iter()
        .zip(&model.operators)
        .zip(&model.rhs)
    {
        let expression = linear_expression(&columns, row.iter());
        let constraint = match operator {
            Operator::LessEqual => expression.leq(*rhs),
            Operator::Equal => expression.eq(*rhs),
            Operator::GreaterEqual => expression.geq(*rhs),
        };
        problem.add_constraint(constraint);
    }

    match problem.solve() {
        Ok(solution) => {
            let values: Vec<f64> = columns.iter().map(|column| solution.value(*column)).collect();
            let objective = model.objective_value(&values);

            Ok(IlpOutcome {
                status: SolutionStatus::Optimal,
                objective,
                bound: objective,
                values,
            })
        }
        Err(ResolutionError::Infeasible) => Ok(IlpOutcome::without_values(SolutionStatus::Infeasible)),
        Err(ResolutionError::Unbounded) => Ok(IlpOutcome::without_values(SolutionStatus::Unbounded)),
        Err(e) => Err(e.to_string()),
    }
}
