//! Formulations of a [`crate::problem::ProblemInstance`]: the time-indexed ILP
//! (variable index, constraint rows, finished model) and the interval model.

pub mod constraints;
pub mod ilp;
pub mod interval;
pub mod sparse;
pub mod variables;

pub use constraints::ConstraintBuilder;
pub use ilp::{build_ilp_model, IlpModel, ObjectiveSense};
pub use interval::{build_interval_model, Alternative, IntervalModel, IntervalTask};
pub use sparse::{Constraint, Operator, SparseMatrix, SparseRow};
pub use variables::{
    build_variable_mapping, DecisionVariable, VariableKey, VariableMapping, VariableType,
};
