use std::{cmp::Ordering, sync::OnceLock};

use hashbrown::HashMap;
use instance_io::InstanceFile;
use log::{debug, trace};

use crate::error::ProblemError;

pub mod graph;

pub use graph::PrecedenceGraph;

/// Position of a job inside [`ProblemInstance::jobs`].
pub type JobId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    pub id: String,
    pub capacity: usize,
}

/// One way of executing a job. `requested_units` holds one entry per resource,
/// in the order of [`ProblemInstance::resources`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mode {
    pub requested_units: Vec<usize>,
    pub processing_time: usize,
}

impl Mode {
    pub fn new(requested_units: Vec<usize>, processing_time: usize) -> Self {
        Self {
            requested_units,
            processing_time,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: String,
    pub release_time: usize,
    pub modes: Vec<Mode>,
    pub successors: Vec<JobId>,
}

impl Job {
    /// Looks up a mode by its 1-based id.
    pub fn mode(&self, mode_id: usize) -> Option<&Mode> {
        mode_id.checked_sub(1).and_then(|index| self.modes.get(index))
    }

    pub fn max_processing_time(&self) -> usize {
        self.modes
            .iter()
            .map(|mode| mode.processing_time)
            .max()
            .unwrap_or(0)
    }

    pub fn min_processing_time(&self) -> usize {
        self.modes
            .iter()
            .map(|mode| mode.processing_time)
            .min()
            .unwrap_or(0)
    }
}

/// A validated MRCPSP instance.
///
/// Jobs live in an arena and reference their successors by [`JobId`], so
/// reordering the jobs remaps every successor list.
#[derive(Debug, Clone)]
pub struct ProblemInstance {
    pub name: String,
    resources: Vec<Resource>,
    jobs: Vec<Job>,
    index: HashMap<String, JobId>,
    makespan_upper_bound: OnceLock<usize>,
}

impl ProblemInstance {
    pub fn builder(name: impl Into<String>) -> ProblemInstanceBuilder {
        ProblemInstanceBuilder::new(name)
    }

    /// Converts a parsed instance file, naming resources `r_<index>`.
    pub fn from_instance_file(
        name: impl Into<String>,
        file: &InstanceFile,
    ) -> Result<Self, ProblemError> {
        let mut builder = ProblemInstanceBuilder::new(name);

        for (index, capacity) in file.res_units.iter().enumerate() {
            builder = builder.resource(format!("r_{index}"), *capacity);
        }

        for record in &file.jobs {
            if record.modes.len() != record.processing_time.len() {
                return Err(ProblemError::ProcessingTimeCount {
                    job: record.id.clone(),
                    modes: record.modes.len(),
                    times: record.processing_time.len(),
                });
            }

            let modes = record
                .modes
                .iter()
                .zip(&record.processing_time)
                .map(|(units, processing_time)| Mode::new(units.clone(), *processing_time))
                .collect();
            let successors: Vec<&str> = record.succ.iter().map(String::as_str).collect();

            builder = builder.job(&record.id, record.release_time, modes, &successors);
        }

        builder.build()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn job(&self, job: JobId) -> &Job {
        &self.jobs[job]
    }

    pub fn job_index(&self, id: &str) -> Option<JobId> {
        self.index.get(id).copied()
    }

    pub fn find_job(&self, id: &str) -> Option<&Job> {
        self.job_index(id).map(|job| &self.jobs[job])
    }

    /// Sum over all jobs of their longest mode. Computed once and cached.
    pub fn makespan_upper_bound(&self) -> usize {
        *self
            .makespan_upper_bound
            .get_or_init(|| self.compute_makespan_upper_bound())
    }

    /// Recomputes the bound from scratch without touching the cache.
    pub fn compute_makespan_upper_bound(&self) -> usize {
        self.jobs.iter().map(Job::max_processing_time).sum()
    }

    /// Makespan upper bound shifted by the latest release time. Every
    /// time-indexed variable and the interval horizon range over it.
    pub fn time_horizon(&self) -> usize {
        self.makespan_upper_bound()
            + self
                .jobs
                .iter()
                .map(|job| job.release_time)
                .max()
                .unwrap_or(0)
    }

    /// Checks every structural invariant of the instance.
    pub fn validate(&self) -> Result<(), ProblemError> {
        for job in &self.jobs {
            if job.modes.is_empty() {
                return Err(ProblemError::NoModes(job.id.clone()));
            }

            for (mode_index, mode) in job.modes.iter().enumerate() {
                if mode.requested_units.len() != self.resources.len() {
                    return Err(ProblemError::RequestCount {
                        job: job.id.clone(),
                        mode: mode_index + 1,
                        found: mode.requested_units.len(),
                        expected: self.resources.len(),
                    });
                }

                for (resource, requested) in self.resources.iter().zip(&mode.requested_units) {
                    if *requested > resource.capacity {
                        return Err(ProblemError::CapacityExceeded {
                            job: job.id.clone(),
                            mode: mode_index + 1,
                            resource: resource.id.clone(),
                            requested: *requested,
                            capacity: resource.capacity,
                        });
                    }
                }
            }
        }

        if let Some(job) = PrecedenceGraph::from_problem(self).find_cycle() {
            return Err(ProblemError::Cycle(self.jobs[job].id.clone()));
        }

        Ok(())
    }

    /// Stable sort by job id. Ids that are both integers compare numerically.
    pub fn sort_jobs_by_id(&mut self) {
        self.reorder_jobs(|a, b| compare_ids(&a.id, &b.id));
    }

    /// Stable sort by release time, ties keep their current order.
    pub fn sort_jobs_by_release_time(&mut self) {
        self.reorder_jobs(|a, b| a.release_time.cmp(&b.release_time));
    }

    fn reorder_jobs(&mut self, compare: impl Fn(&Job, &Job) -> Ordering) {
        let mut order: Vec<JobId> = (0..self.jobs.len()).collect();
        order.sort_by(|&a, &b| compare(&self.jobs[a], &self.jobs[b]));

        let mut new_position = vec![0; order.len()];
        for (position, &old) in order.iter().enumerate() {
            new_position[old] = position;
        }

        let mut old_jobs: Vec<Option<Job>> = std::mem::take(&mut self.jobs)
            .into_iter()
            .map(Some)
            .collect();

        self.jobs = order
            .iter()
            .filter_map(|&old| old_jobs[old].take())
            .map(|mut job| {
                for successor in job.successors.iter_mut() {
                    *successor = new_position[*successor];
                }
                job
            })
            .collect();

        self.index = self
            .jobs
            .iter()
            .enumerate()
            .map(|(position, job)| (job.id.clone(), position))
            .collect();

        trace!("reordered jobs: {:?}", self.index);
    }
}

fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

struct PendingJob {
    id: String,
    release_time: usize,
    modes: Vec<Mode>,
    successors: Vec<String>,
}

/// Collects resources and jobs, then resolves successor ids once every job is
/// known, so successors may be declared after the jobs referencing them.
pub struct ProblemInstanceBuilder {
    name: String,
    resources: Vec<Resource>,
    jobs: Vec<PendingJob>,
}

impl ProblemInstanceBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resources: vec![],
            jobs: vec![],
        }
    }

    pub fn resource(mut self, id: impl Into<String>, capacity: usize) -> Self {
        self.resources.push(Resource {
            id: id.into(),
            capacity,
        });
        self
    }

    pub fn job(
        mut self,
        id: impl Into<String>,
        release_time: usize,
        modes: Vec<Mode>,
        successors: &[&str],
    ) -> Self {
        self.jobs.push(PendingJob {
            id: id.into(),
            release_time,
            modes,
            successors: successors.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub fn build(self) -> Result<ProblemInstance, ProblemError> {
        let mut index = HashMap::with_capacity(self.jobs.len());
        for (position, job) in self.jobs.iter().enumerate() {
            if index.insert(job.id.clone(), position).is_some() {
                return Err(ProblemError::DuplicateJob(job.id.clone()));
            }
        }

        let jobs = self
            .jobs
            .into_iter()
            .map(|pending| -> Result<Job, ProblemError> {
                let successors = pending
                    .successors
                    .iter()
                    .map(|successor| {
                        index.get(successor).copied().ok_or_else(|| {
                            ProblemError::UnknownSuccessor {
                                job: pending.id.clone(),
                                successor: successor.clone(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Job {
                    id: pending.id,
                    release_time: pending.release_time,
                    modes: pending.modes,
                    successors,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let problem = ProblemInstance {
            name: self.name,
            resources: self.resources,
            jobs,
            index,
            makespan_upper_bound: OnceLock::new(),
        };
        problem.validate()?;

        debug!(
            "built instance {} with {} jobs and {} resources",
            problem.name,
            problem.jobs.len(),
            problem.resources.len()
        );

        Ok(problem)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use instance_io::parse_instance;

    use super::{Mode, ProblemInstance};
    use crate::error::ProblemError;

    /// Capacity 2, A uses both units for 3 slots, B one unit for 2 slots.
    pub(crate) fn two_job_problem() -> ProblemInstance {
        ProblemInstance::builder("two_jobs")
            .resource("r_0", 2)
            .job("A", 0, vec![Mode::new(vec![2], 3)], &[])
            .job("B", 0, vec![Mode::new(vec![1], 2)], &[])
            .build()
            .unwrap()
    }

    /// Small chain with two modes per job on two resources.
    pub(crate) fn multi_mode_problem() -> ProblemInstance {
        ProblemInstance::builder("multi_mode")
            .resource("r_0", 3)
            .resource("r_1", 2)
            .job(
                "1",
                0,
                vec![Mode::new(vec![2, 1], 2), Mode::new(vec![1, 0], 4)],
                &["2", "3"],
            )
            .job(
                "2",
                0,
                vec![Mode::new(vec![3, 0], 1), Mode::new(vec![1, 1], 3)],
                &["4"],
            )
            .job("3", 1, vec![Mode::new(vec![1, 2], 2)], &["4"])
            .job(
                "4",
                0,
                vec![Mode::new(vec![2, 2], 1), Mode::new(vec![1, 1], 2)],
                &[],
            )
            .build()
            .unwrap()
    }

    #[test]
    fn makespan_upper_bound_sums_longest_modes() {
        let problem = multi_mode_problem();

        assert_eq!(problem.makespan_upper_bound(), 4 + 3 + 2 + 2);
        assert_eq!(problem.compute_makespan_upper_bound(), 11);
        assert_eq!(problem.makespan_upper_bound(), 11);
        assert_eq!(problem.time_horizon(), 12);
    }

    #[test]
    fn successors_may_be_declared_later() {
        let problem = multi_mode_problem();
        let first = problem.find_job("1").unwrap();

        assert_eq!(first.successors, vec![1, 2]);
        assert_eq!(problem.job(first.successors[1]).id, "3");
        assert_eq!(first.mode(2).unwrap().processing_time, 4);
        assert!(first.mode(0).is_none());
        assert!(first.mode(3).is_none());
    }

    #[test]
    fn cyclic_precedence_is_rejected() {
        let result = ProblemInstance::builder("cycle")
            .resource("r_0", 1)
            .job("a", 0, vec![Mode::new(vec![1], 1)], &["b"])
            .job("b", 0, vec![Mode::new(vec![1], 1)], &["c"])
            .job("c", 0, vec![Mode::new(vec![1], 1)], &["a"])
            .build();

        assert!(matches!(result, Err(ProblemError::Cycle(_))));

        let self_loop = ProblemInstance::builder("self_loop")
            .resource("r_0", 1)
            .job("a", 0, vec![Mode::new(vec![1], 1)], &["a"])
            .build();

        assert_eq!(self_loop.unwrap_err(), ProblemError::Cycle("a".into()));
    }

    #[test]
    fn invalid_jobs_are_rejected() {
        let over_capacity = ProblemInstance::builder("over")
            .resource("r_0", 1)
            .job("a", 0, vec![Mode::new(vec![2], 1)], &[])
            .build();
        assert!(matches!(
            over_capacity,
            Err(ProblemError::CapacityExceeded { requested: 2, capacity: 1, .. })
        ));

        let no_modes = ProblemInstance::builder("empty")
            .resource("r_0", 1)
            .job("a", 0, vec![], &[])
            .build();
        assert_eq!(no_modes.unwrap_err(), ProblemError::NoModes("a".into()));

        let duplicate = ProblemInstance::builder("duplicate")
            .resource("r_0", 1)
            .job("a", 0, vec![Mode::new(vec![1], 1)], &[])
            .job("a", 0, vec![Mode::new(vec![1], 1)], &[])
            .build();
        assert_eq!(duplicate.unwrap_err(), ProblemError::DuplicateJob("a".into()));

        let unknown = ProblemInstance::builder("unknown")
            .resource("r_0", 1)
            .job("a", 0, vec![Mode::new(vec![1], 1)], &["z"])
            .build();
        assert!(matches!(unknown, Err(ProblemError::UnknownSuccessor { .. })));

        let short_request = ProblemInstance::builder("short")
            .resource("r_0", 1)
            .resource("r_1", 1)
            .job("a", 0, vec![Mode::new(vec![1], 1)], &[])
            .build();
        assert!(matches!(
            short_request,
            Err(ProblemError::RequestCount { found: 1, expected: 2, .. })
        ));
    }

    #[test]
    fn sorting_keeps_successors_consistent() {
        let mut problem = ProblemInstance::builder("sort")
            .resource("r_0", 1)
            .job("10", 0, vec![Mode::new(vec![1], 1)], &[])
            .job("2", 5, vec![Mode::new(vec![1], 1)], &["10"])
            .job("1", 3, vec![Mode::new(vec![1], 1)], &["2"])
            .build()
            .unwrap();

        problem.sort_jobs_by_id();
        let ids: Vec<&str> = problem.jobs().iter().map(|job| job.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
        assert_eq!(problem.job(problem.job(0).successors[0]).id, "2");
        assert_eq!(problem.job(problem.job(1).successors[0]).id, "10");
        assert_eq!(problem.job_index("10"), Some(2));

        problem.sort_jobs_by_release_time();
        let ids: Vec<&str> = problem.jobs().iter().map(|job| job.id.as_str()).collect();
        assert_eq!(ids, vec!["10", "1", "2"]);
        assert_eq!(problem.job(problem.job(2).successors[0]).id, "10");
        assert!(problem.validate().is_ok());
    }

    #[test]
    fn instance_file_conversion() {
        let file = parse_instance(
            r#"{"res_units": [2], "jobs": [
                {"id": "a", "modes": [[2], [1]], "processing_time": [2, 4], "succ": ["b"]},
                {"id": "b", "release_time": 1, "modes": [[1]], "processing_time": [1]}
            ]}"#,
        )
        .unwrap();
        let problem = ProblemInstance::from_instance_file("file", &file).unwrap();

        assert_eq!(problem.resources()[0].id, "r_0");
        assert_eq!(problem.resources()[0].capacity, 2);
        assert_eq!(problem.find_job("b").unwrap().release_time, 1);
        assert_eq!(problem.find_job("a").unwrap().modes[1].processing_time, 4);
        assert_eq!(problem.makespan_upper_bound(), 5);
    }
}
