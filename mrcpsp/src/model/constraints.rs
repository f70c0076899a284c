use log::{debug, trace};

use super::{
    ilp::IlpModel,
    sparse::{Constraint, Operator, SparseRow},
    variables::{VariableKey, VariableMapping},
};
use crate::{error::ModelError, problem::ProblemInstance};

/// Accumulates the rows of the time-indexed formulation.
///
/// Every `add_*` call appends its family again, there is no de-duplication.
/// Terms with a zero coefficient are dropped and a row left without any term
/// is not emitted.
pub struct ConstraintBuilder<'a> {
    problem: &'a ProblemInstance,
    mapping: &'a VariableMapping,
    constraints: Vec<Constraint>,
}

impl<'a> ConstraintBuilder<'a> {
    pub fn new(problem: &'a ProblemInstance, mapping: &'a VariableMapping) -> Self {
        Self {
            problem,
            mapping,
            constraints: vec![],
        }
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Adds every constraint family of the formulation.
    pub fn add_all(&mut self) -> Result<(), ModelError> {
        self.add_job_processing_time_constraints()?;
        self.add_job_start_time_constraints()?;
        self.add_precedence_constraints()?;
        self.add_renewable_resource_constraints()?;
        self.add_release_time_constraints()?;
        Ok(())
    }

    /// `p_j - Σ pt(m)·x_{j,m,t} = 0` and `Σ x_{j,m,t} = 1` for every job.
    pub fn add_job_processing_time_constraints(&mut self) -> Result<(), ModelError> {
        let before = self.constraints.len();

        for (job, data) in self.problem.jobs().iter().enumerate() {
            let mut duration_terms = vec![(self.mapping.index(VariableKey::ProcessingTime(job))?, 1.0)];
            let mut selection_terms = vec![];

            for time in 0..self.mapping.horizon() {
                for (mode, mode_data) in data.modes.iter().enumerate() {
                    let x = self
                        .mapping
                        .index(VariableKey::ModeSelection { job, mode, time })?;
                    duration_terms.push((x, -(mode_data.processing_time as f64)));
                    selection_terms.push((x, 1.0));
                }
            }

            self.push(
                format!("processing_time[{}]", data.id),
                duration_terms,
                Operator::Equal,
                0.0,
            )?;
            self.push(
                format!("mode_selection[{}]", data.id),
                selection_terms,
                Operator::Equal,
                1.0,
            )?;
        }

        debug!(
            "added {} processing time constraints",
            self.constraints.len() - before
        );

        Ok(())
    }

    /// `s_j + p_j - cMax <= 0` and `s_j - Σ t·x_{j,m,t} = 0` for every job.
    pub fn add_job_start_time_constraints(&mut self) -> Result<(), ModelError> {
        let before = self.constraints.len();
        let makespan = self.mapping.index(VariableKey::Makespan)?;

        for (job, data) in self.problem.jobs().iter().enumerate() {
            let start = self.mapping.index(VariableKey::StartTime(job))?;
            let duration = self.mapping.index(VariableKey::ProcessingTime(job))?;

            self.push(
                format!("makespan[{}]", data.id),
                vec![(start, 1.0), (duration, 1.0), (makespan, -1.0)],
                Operator::LessEqual,
                0.0,
            )?;

            let mut terms = vec![(start, 1.0)];
            for time in 0..self.mapping.horizon() {
                for mode in 0..data.modes.len() {
                    let x = self
                        .mapping
                        .index(VariableKey::ModeSelection { job, mode, time })?;
                    terms.push((x, -(time as f64)));
                }
            }

            self.push(
                format!("start_time[{}]", data.id),
                terms,
                Operator::Equal,
                0.0,
            )?;
        }

        debug!(
            "added {} start time constraints",
            self.constraints.len() - before
        );

        Ok(())
    }

    /// `s_j - s_succ + p_j <= 0` for every precedence edge.
    pub fn add_precedence_constraints(&mut self) -> Result<(), ModelError> {
        let before = self.constraints.len();

        for (job, data) in self.problem.jobs().iter().enumerate() {
            let start = self.mapping.index(VariableKey::StartTime(job))?;
            let duration = self.mapping.index(VariableKey::ProcessingTime(job))?;

            for &successor in &data.successors {
                let successor_start = self.mapping.index(VariableKey::StartTime(successor))?;

                self.push(
                    format!(
                        "precedence[{}->{}]",
                        data.id,
                        self.problem.job(successor).id
                    ),
                    vec![(start, 1.0), (successor_start, -1.0), (duration, 1.0)],
                    Operator::LessEqual,
                    0.0,
                )?;
            }
        }

        debug!(
            "added {} precedence constraints",
            self.constraints.len() - before
        );

        Ok(())
    }

    /// For every slot `t` and resource `k`, the units of every job-mode started
    /// in `[t - pt + 1, t]` may not exceed the capacity of `k`.
    pub fn add_renewable_resource_constraints(&mut self) -> Result<(), ModelError> {
        let before = self.constraints.len();

        for time in 0..self.mapping.horizon() {
            for (resource, resource_data) in self.problem.resources().iter().enumerate() {
                let mut terms = vec![];

                for (job, data) in self.problem.jobs().iter().enumerate() {
                    for (mode, mode_data) in data.modes.iter().enumerate() {
                        let units = mode_data.requested_units[resource];
                        if units == 0 || mode_data.processing_time == 0 {
                            continue;
                        }

                        let first_start = (time + 1).saturating_sub(mode_data.processing_time);
                        for start in first_start..=time {
                            let x = self.mapping.index(VariableKey::ModeSelection {
                                job,
                                mode,
                                time: start,
                            })?;
                            terms.push((x, units as f64));
                        }
                    }
                }

                self.push(
                    format!("capacity[{},{time}]", resource_data.id),
                    terms,
                    Operator::LessEqual,
                    resource_data.capacity as f64,
                )?;
            }
        }

        debug!(
            "added {} renewable resource constraints",
            self.constraints.len() - before
        );

        Ok(())
    }

    /// `s_j >= r_j` for every job released after time zero.
    pub fn add_release_time_constraints(&mut self) -> Result<(), ModelError> {
        let before = self.constraints.len();

        for (job, data) in self.problem.jobs().iter().enumerate() {
            if data.release_time == 0 {
                continue;
            }

            let start = self.mapping.index(VariableKey::StartTime(job))?;
            self.push(
                format!("release[{}]", data.id),
                vec![(start, 1.0)],
                Operator::GreaterEqual,
                data.release_time as f64,
            )?;
        }

        debug!(
            "added {} release time constraints",
            self.constraints.len() - before
        );

        Ok(())
    }

    /// Moves the accumulated rows into `model`, leaving the builder empty.
    pub fn move_constraints_to_model(&mut self, model: &mut IlpModel) -> usize {
        let constraints = std::mem::take(&mut self.constraints);
        let moved = constraints.len();

        for constraint in constraints {
            model.add_constraint(constraint);
        }

        debug!("moved {moved} constraints to the model");

        moved
    }

    fn push(
        &mut self,
        description: String,
        terms: Vec<(usize, f64)>,
        operator: Operator,
        rhs: f64,
    ) -> Result<(), ModelError> {
        if terms.iter().all(|(_, coefficient)| *coefficient == 0.0) {
            trace!("skipping {description}, it has no non-zero term");
            return Ok(());
        }

        let row = SparseRow::from_entries(&description, terms)?;
        self.constraints.push(Constraint {
            row,
            operator,
            rhs,
            description,
        });

        Ok(())
    }
}
