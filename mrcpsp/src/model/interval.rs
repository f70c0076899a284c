use log::debug;

use crate::{
    error::ModelError,
    problem::{PrecedenceGraph, ProblemInstance},
};

/// One optional interval of a task: taking it fixes the duration and the
/// resource pulses emitted while the task runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternative {
    pub duration: usize,
    pub pulses: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTask {
    pub name: String,
    pub start_min: usize,
    /// Exactly one alternative is present in a solution.
    pub alternatives: Vec<Alternative>,
}

/// Interval formulation: tasks with alternatives, end-before-start
/// precedences, one cumulative function per resource bounded by its capacity,
/// minimizing the largest task end.
#[derive(Debug, Clone)]
pub struct IntervalModel {
    pub tasks: Vec<IntervalTask>,
    /// `(before, after)`: `after` may not start before `before` has ended
    pub precedences: Vec<(usize, usize)>,
    pub capacities: Vec<usize>,
    pub horizon: usize,
}

impl IntervalModel {
    pub fn precedence_graph(&self) -> PrecedenceGraph {
        PrecedenceGraph::new(self.tasks.len(), self.precedences.iter().copied())
    }

    pub fn min_durations(&self) -> Vec<usize> {
        self.tasks
            .iter()
            .map(|task| {
                task.alternatives
                    .iter()
                    .map(|alternative| alternative.duration)
                    .min()
                    .unwrap_or(0)
            })
            .collect()
    }

    /// Largest of the critical path with shortest alternatives and, per
    /// resource, the smallest energy every task must consume divided by the
    /// capacity.
    pub fn lower_bound(&self) -> usize {
        let release: Vec<usize> = self.tasks.iter().map(|task| task.start_min).collect();
        let critical_path = self
            .precedence_graph()
            .critical_path_length(&self.min_durations(), &release);

        let energy = self
            .capacities
            .iter()
            .enumerate()
            .filter(|(_, capacity)| **capacity > 0)
            .map(|(resource, capacity)| {
                let required: usize = self
                    .tasks
                    .iter()
                    .map(|task| {
                        task.alternatives
                            .iter()
                            .map(|alternative| alternative.duration * alternative.pulses[resource])
                            .min()
                            .unwrap_or(0)
                    })
                    .sum();
                (required + capacity - 1) / capacity
            })
            .max()
            .unwrap_or(0);

        critical_path.max(energy)
    }
}

/// Translates `problem` into the interval formulation, one task per job and
/// one alternative per mode.
pub fn build_interval_model(problem: &ProblemInstance) -> Result<IntervalModel, ModelError> {
    problem.validate()?;

    let tasks = problem
        .jobs()
        .iter()
        .map(|job| IntervalTask {
            name: job.id.clone(),
            start_min: job.release_time,
            alternatives: job
                .modes
                .iter()
                .map(|mode| Alternative {
                    duration: mode.processing_time,
                    pulses: mode.requested_units.clone(),
                })
                .collect(),
        })
        .collect();

    let precedences = problem
        .jobs()
        .iter()
        .enumerate()
        .flat_map(|(job, data)| data.successors.iter().map(move |&successor| (job, successor)))
        .collect();

    let model = IntervalModel {
        tasks,
        precedences,
        capacities: problem
            .resources()
            .iter()
            .map(|resource| resource.capacity)
            .collect(),
        horizon: problem.time_horizon(),
    };

    debug!(
        "built interval model with {} tasks, {} precedences and {} cumulative functions",
        model.tasks.len(),
        model.precedences.len(),
        model.capacities.len()
    );

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::build_interval_model;
    use crate::problem::{
        tests::{multi_mode_problem, two_job_problem},
        Mode, ProblemInstance,
    };

    #[test]
    fn tasks_mirror_jobs() {
        let problem = multi_mode_problem();
        let model = build_interval_model(&problem).unwrap();

        assert_eq!(model.tasks.len(), 4);
        assert_eq!(model.tasks[2].start_min, 1);
        assert_eq!(model.tasks[0].alternatives[1].duration, 4);
        assert_eq!(model.tasks[0].alternatives[1].pulses, vec![1, 0]);
        assert_eq!(model.precedences, vec![(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert_eq!(model.capacities, vec![3, 2]);
        assert_eq!(model.horizon, 12);
    }

    #[test]
    fn lower_bound_takes_energy_into_account() {
        // critical path 3, but 2 + 3 energy units on a capacity of 2
        let problem = two_job_problem();
        let model = build_interval_model(&problem).unwrap();

        assert_eq!(model.lower_bound(), 4);
    }

    #[test]
    fn lower_bound_takes_chain_into_account() {
        let problem = ProblemInstance::builder("chain")
            .resource("r_0", 10)
            .job("a", 2, vec![Mode::new(vec![1], 3), Mode::new(vec![2], 2)], &["b"])
            .job("b", 0, vec![Mode::new(vec![1], 4)], &[])
            .build()
            .unwrap();
        let model = build_interval_model(&problem).unwrap();

        assert_eq!(model.lower_bound(), 2 + 2 + 4);
    }
}
