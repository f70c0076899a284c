pub mod config;
pub mod error;
pub mod model;
pub mod problem;
pub mod solution;
pub mod solver;

pub use config::{EngineKind, SolverConfig, TabuOptions};
pub use error::{AllocationError, ModelError, ProblemError, SolveError};
pub use problem::{Job, JobId, Mode, ProblemInstance, ProblemInstanceBuilder, Resource};
pub use solution::{
    checker::{CheckReport, SolutionChecker, Violation},
    JobAllocation, Solution, SolutionStatus,
};
pub use solver::{solve_instance, SolveReport};
