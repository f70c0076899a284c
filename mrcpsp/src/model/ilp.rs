use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{
    constraints::ConstraintBuilder,
    sparse::{Constraint, Operator, SparseMatrix},
    variables::{build_variable_mapping, DecisionVariable, VariableKey, VariableMapping, VariableType},
};
use crate::{error::ModelError, problem::ProblemInstance};

const FEASIBILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveSense {
    Minimize,
    Maximize,
}

/// The finished linear model handed to an ILP engine.
#[derive(Debug, Clone)]
pub struct IlpModel {
    pub sense: ObjectiveSense,
    pub objective: Vec<f64>,
    pub variables: Vec<DecisionVariable>,
    pub variable_descriptions: Vec<String>,
    pub matrix: SparseMatrix,
    pub operators: Vec<Operator>,
    pub rhs: Vec<f64>,
    constraint_descriptions: Vec<String>,
}

impl IlpModel {
    /// Empty model over the variables of `mapping`, minimizing `cMax`.
    pub fn from_mapping(mapping: &VariableMapping) -> Self {
        let mut objective = vec![0.0; mapping.len()];
        if let Some(makespan) = mapping.get(VariableKey::Makespan) {
            objective[makespan] = 1.0;
        }

        Self {
            sense: ObjectiveSense::Minimize,
            objective,
            variables: mapping.variables().to_vec(),
            variable_descriptions: mapping.descriptions(),
            matrix: SparseMatrix::default(),
            operators: vec![],
            rhs: vec![],
            constraint_descriptions: vec![],
        }
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.matrix.push(constraint.row);
        self.operators.push(constraint.operator);
        self.rhs.push(constraint.rhs);
        self.constraint_descriptions.push(constraint.description);
    }

    pub fn constraint_count(&self) -> usize {
        self.matrix.len()
    }

    pub fn constraint_descriptions(&self) -> &[String] {
        &self.constraint_descriptions
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective
            .iter()
            .zip(values)
            .map(|(coefficient, value)| coefficient * value)
            .sum()
    }

    /// Rows not satisfied by `values`, variable bounds are not checked.
    pub fn violated_constraints(&self, values: &[f64]) -> Vec<usize> {
        self.matrix
            .rows()
            .iter()
            .zip(&self.operators)
            .zip(&self.rhs)
            .enumerate()
            .filter(|(_, ((row, operator), rhs))| {
                !operator.holds(row.evaluate(values), **rhs, FEASIBILITY_TOLERANCE)
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Verifies that objective, variables, rows, operators, right hand sides and
    /// descriptions line up and that every column exists.
    pub fn check_formulation(&self) -> Result<(), ModelError> {
        let columns = self.variables.len();

        if self.objective.len() != columns || self.variable_descriptions.len() != columns {
            return Err(ModelError::Formulation(format!(
                "{columns} variables, {} objective coefficients, {} variable descriptions",
                self.objective.len(),
                self.variable_descriptions.len()
            )));
        }

        let rows = self.matrix.len();
        if self.operators.len() != rows
            || self.rhs.len() != rows
            || self.constraint_descriptions.len() != rows
        {
            return Err(ModelError::Formulation(format!(
                "{rows} rows, {} operators, {} right hand sides, {} descriptions",
                self.operators.len(),
                self.rhs.len(),
                self.constraint_descriptions.len()
            )));
        }

        for (row, description) in self.matrix.rows().iter().zip(&self.constraint_descriptions) {
            if row.is_empty() {
                return Err(ModelError::EmptyRow(description.clone()));
            }
            if let Some(column) = row.max_column().filter(|column| *column >= columns) {
                return Err(ModelError::Formulation(format!(
                    "row {description} references column {column}, the model has {columns}"
                )));
            }
        }

        for (variable, description) in self.variables.iter().zip(&self.variable_descriptions) {
            if variable.lower > variable.upper {
                return Err(ModelError::Formulation(format!(
                    "variable {description} has bounds [{}, {}]",
                    variable.lower, variable.upper
                )));
            }
        }

        Ok(())
    }

    pub fn log_statistics(&self) {
        let count = |kind| {
            self.variables
                .iter()
                .filter(|variable| variable.kind == kind)
                .count()
        };
        let cells = self.variables.len() * self.matrix.len();
        let density = if cells == 0 {
            0.0
        } else {
            self.matrix.non_zeros() as f64 / cells as f64
        };

        info!(
            "model: {} variables ({} integer, {} binary, {} continuous), {} constraints, {} non-zeros, density {:.6}",
            self.variables.len(),
            count(VariableType::Integer),
            count(VariableType::Binary),
            count(VariableType::Continuous),
            self.matrix.len(),
            self.matrix.non_zeros(),
            density
        );
    }
}

/// Builds the variable index and every constraint family for `problem`.
pub fn build_ilp_model(problem: &ProblemInstance) -> Result<(IlpModel, VariableMapping), ModelError> {
    let mapping = build_variable_mapping(problem)?;
    let mut model = IlpModel::from_mapping(&mapping);

    let mut builder = ConstraintBuilder::new(problem, &mapping);
    builder.add_all()?;
    let moved = builder.move_constraints_to_model(&mut model);

    model.check_formulation()?;
    debug!("built ilp model of {} with {moved} constraints", problem.name);

    Ok((model, mapping))
}
