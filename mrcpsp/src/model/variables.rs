use std::fmt;

use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::ModelError, problem::JobId, problem::ProblemInstance};

/// Identity of a decision variable. Mode indices are 0-based positions in
/// [`crate::problem::Job::modes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariableKey {
    Makespan,
    StartTime(JobId),
    ProcessingTime(JobId),
    ModeSelection { job: JobId, mode: usize, time: usize },
    /// Reserved for unit level allocation models, no constraint uses it yet.
    UnitAllocation { job: JobId, resource: usize, unit: usize },
}

impl fmt::Display for VariableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableKey::Makespan => write!(f, "cMax"),
            VariableKey::StartTime(job) => write!(f, "s[{job}]"),
            VariableKey::ProcessingTime(job) => write!(f, "p[{job}]"),
            VariableKey::ModeSelection { job, mode, time } => write!(f, "x[{job},{mode},{time}]"),
            VariableKey::UnitAllocation {
                job,
                resource,
                unit,
            } => write!(f, "u[{job},{resource},{unit}]"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Continuous,
    Binary,
    Integer,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionVariable {
    pub kind: VariableType,
    pub lower: f64,
    pub upper: f64,
}

impl DecisionVariable {
    pub fn integer(lower: usize, upper: usize) -> Self {
        Self {
            kind: VariableType::Integer,
            lower: lower as f64,
            upper: upper as f64,
        }
    }

    pub fn binary() -> Self {
        Self {
            kind: VariableType::Binary,
            lower: 0.0,
            upper: 1.0,
        }
    }
}

/// Dense index of every decision variable. The position of a variable in
/// [`VariableMapping::variables`] is its column in the model and its slot in
/// the solution vector.
#[derive(Debug, Clone, Default)]
pub struct VariableMapping {
    variables: Vec<DecisionVariable>,
    keys: Vec<VariableKey>,
    lookup: HashMap<VariableKey, usize>,
    horizon: usize,
}

impl VariableMapping {
    pub fn new(horizon: usize) -> Self {
        Self {
            horizon,
            ..Self::default()
        }
    }

    /// Appends a variable, its index being the number of variables assigned so far.
    pub fn assign(
        &mut self,
        key: VariableKey,
        variable: DecisionVariable,
    ) -> Result<usize, ModelError> {
        if self.lookup.contains_key(&key) {
            return Err(ModelError::DuplicateKey(key));
        }

        let index = self.variables.len();
        self.variables.push(variable);
        self.keys.push(key);
        self.lookup.insert(key, index);

        Ok(index)
    }

    pub fn index(&self, key: VariableKey) -> Result<usize, ModelError> {
        self.get(key).ok_or(ModelError::MissingKey(key))
    }

    pub fn get(&self, key: VariableKey) -> Option<usize> {
        self.lookup.get(&key).copied()
    }

    pub fn key(&self, index: usize) -> Option<VariableKey> {
        self.keys.get(index).copied()
    }

    pub fn variables(&self) -> &[DecisionVariable] {
        &self.variables
    }

    pub fn keys(&self) -> &[VariableKey] {
        &self.keys
    }

    pub fn descriptions(&self) -> Vec<String> {
        self.keys.iter().map(ToString::to_string).collect()
    }

    /// Number of time slots of the mode selection family.
    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// Assigns `cMax`, then every `s_j`, every `p_j` and finally the `x_{j,m,t}`
/// binaries ordered job, time slot, mode.
pub fn build_variable_mapping(problem: &ProblemInstance) -> Result<VariableMapping, ModelError> {
    let horizon = problem.time_horizon();
    if horizon == 0 {
        return Err(ModelError::EmptyHorizon);
    }

    let mut mapping = VariableMapping::new(horizon);

    mapping.assign(VariableKey::Makespan, DecisionVariable::integer(0, horizon))?;

    for job in 0..problem.jobs().len() {
        mapping.assign(
            VariableKey::StartTime(job),
            DecisionVariable::integer(0, horizon),
        )?;
    }

    for (job, data) in problem.jobs().iter().enumerate() {
        mapping.assign(
            VariableKey::ProcessingTime(job),
            DecisionVariable::integer(0, data.max_processing_time()),
        )?;
    }

    for (job, data) in problem.jobs().iter().enumerate() {
        for time in 0..horizon {
            for mode in 0..data.modes.len() {
                mapping.assign(
                    VariableKey::ModeSelection { job, mode, time },
                    DecisionVariable::binary(),
                )?;
            }
        }
    }

    debug!(
        "assigned {} variables over a horizon of {horizon}",
        mapping.len()
    );

    Ok(mapping)
}
