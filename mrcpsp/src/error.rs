use thiserror::Error;

use crate::model::variables::VariableKey;

/// Malformed problem instances, detected while building or validating them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProblemError {
    #[error("job {0} is declared more than once")]
    DuplicateJob(String),
    #[error("job {0} has no execution mode")]
    NoModes(String),
    #[error("job {job} declares {modes} modes but {times} processing times")]
    ProcessingTimeCount {
        job: String,
        modes: usize,
        times: usize,
    },
    #[error("job {job} mode {mode} lists {found} resource requests, the instance has {expected} resources")]
    RequestCount {
        job: String,
        mode: usize,
        found: usize,
        expected: usize,
    },
    #[error("job {job} mode {mode} requests {requested} units of {resource} which only has {capacity}")]
    CapacityExceeded {
        job: String,
        mode: usize,
        resource: String,
        requested: usize,
        capacity: usize,
    },
    #[error("job {job} lists unknown successor {successor}")]
    UnknownSuccessor { job: String, successor: String },
    #[error("precedence relations contain a cycle through job {0}")]
    Cycle(String),
}

/// Invariant violations of the model builders.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("variable {0} is already assigned")]
    DuplicateKey(VariableKey),
    #[error("variable {0} has never been assigned")]
    MissingKey(VariableKey),
    #[error("makespan upper bound is zero, the time horizon is empty")]
    EmptyHorizon,
    #[error("row {row} references column {column} more than once")]
    DuplicateColumn { row: String, column: usize },
    #[error("row {0} has no non-zero coefficient")]
    EmptyRow(String),
    #[error("inconsistent formulation: {0}")]
    Formulation(String),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

/// Errors raised while solving, always free of engine specific types.
#[derive(Debug, Error)]
pub enum SolveError {
    #[error("{engine} engine failed: {reason}")]
    EngineFailure { engine: &'static str, reason: String },
    #[error("solution vector holds {found} values, the model has {expected} variables")]
    SolutionLength { expected: usize, found: usize },
    #[error("no mode selection variable of job {0} is positive")]
    NoModeSelected(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
}

/// Inconsistencies between a solution and the instance it claims to solve.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    #[error("allocation refers to unknown job {0}")]
    UnknownJob(String),
    #[error("job {job} has no mode {mode_id}, valid mode ids are 1..={modes}")]
    InvalidModeId {
        job: String,
        mode_id: usize,
        modes: usize,
    },
    #[error("job {job} needs {requested} units of {resource} at time {time}, only {available} are free")]
    InsufficientUnits {
        job: String,
        resource: String,
        requested: usize,
        available: usize,
        time: usize,
    },
    #[error("resource units of job {0} are already assigned")]
    UnitsAlreadyAssigned(String),
}
