use log::trace;

use super::JobAllocation;
use crate::{
    error::SolveError,
    model::variables::{VariableKey, VariableMapping},
    problem::ProblemInstance,
};

fn integral(value: f64) -> usize {
    value.max(0.0).round() as usize
}

/// Start time of every job, indexed by job.
pub fn start_times(
    problem: &ProblemInstance,
    mapping: &VariableMapping,
    values: &[f64],
) -> Result<Vec<usize>, SolveError> {
    (0..problem.jobs().len())
        .map(|job| -> Result<usize, SolveError> {
            Ok(integral(values[mapping.index(VariableKey::StartTime(job))?]))
        })
        .collect()
}

/// Processing time of every job, indexed by job.
pub fn processing_times(
    problem: &ProblemInstance,
    mapping: &VariableMapping,
    values: &[f64],
) -> Result<Vec<usize>, SolveError> {
    (0..problem.jobs().len())
        .map(|job| -> Result<usize, SolveError> {
            Ok(integral(values[mapping.index(VariableKey::ProcessingTime(job))?]))
        })
        .collect()
}

/// 1-based selected mode of every job: the mode of the first positive
/// `x_{j,m,t}` in index order.
pub fn selected_modes(
    problem: &ProblemInstance,
    mapping: &VariableMapping,
    values: &[f64],
) -> Result<Vec<usize>, SolveError> {
    problem
        .jobs()
        .iter()
        .enumerate()
        .map(|(job, data)| -> Result<usize, SolveError> {
            for time in 0..mapping.horizon() {
                for mode in 0..data.modes.len() {
                    let x = mapping.index(VariableKey::ModeSelection { job, mode, time })?;
                    if values[x] > 0.0 {
                        trace!("job {} selected mode {} at slot {time}", data.id, mode + 1);
                        return Ok(mode + 1);
                    }
                }
            }

            Err(SolveError::NoModeSelected(data.id.clone()))
        })
        .collect()
}

/// Maps a dense solution vector back to one allocation per job, in job order.
pub fn reconstruct_allocations(
    problem: &ProblemInstance,
    mapping: &VariableMapping,
    values: &[f64],
) -> Result<Vec<JobAllocation>, SolveError> {
    if values.len() != mapping.len() {
        return Err(SolveError::SolutionLength {
            expected: mapping.len(),
            found: values.len(),
        });
    }

    let starts = start_times(problem, mapping, values)?;
    let durations = processing_times(problem, mapping, values)?;
    let modes = selected_modes(problem, mapping, values)?;

    Ok(problem
        .jobs()
        .iter()
        .enumerate()
        .map(|(job, data)| JobAllocation::new(&data.id, starts[job], durations[job], modes[job]))
        .collect())
}
