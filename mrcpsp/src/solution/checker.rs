//! Independent feasibility verification of a [`Solution`].
//!
//! Every check re-derives what it needs from the raw allocations and the
//! instance. Violations are collected rather than aborting at the first one so
//! that a batch run can report all of them. Allocations that cannot even be
//! interpreted (unknown job, mode id 0 or out of range) are errors.

use std::fmt;

use hashbrown::HashMap;
use log::{debug, warn};

use super::{JobAllocation, Solution};
use crate::{error::AllocationError, problem::ProblemInstance};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    ObjectiveMismatch {
        reported: usize,
        recomputed: usize,
    },
    DurationMismatch {
        job: String,
        mode_id: usize,
        duration: usize,
        processing_time: usize,
    },
    CapacityExceeded {
        resource: String,
        time: usize,
        used: usize,
        capacity: usize,
    },
    MissingJob(String),
    DuplicateJob(String),
    PrecedenceViolated {
        job: String,
        successor: String,
        finish: usize,
        successor_start: usize,
    },
    ReleaseViolated {
        job: String,
        release_time: usize,
        start_time: usize,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::ObjectiveMismatch {
                reported,
                recomputed,
            } => write!(
                f,
                "reported makespan {reported} differs from recomputed makespan {recomputed}"
            ),
            Violation::DurationMismatch {
                job,
                mode_id,
                duration,
                processing_time,
            } => write!(
                f,
                "job {job} runs {duration} time units but mode {mode_id} takes {processing_time}"
            ),
            Violation::CapacityExceeded {
                resource,
                time,
                used,
                capacity,
            } => write!(
                f,
                "resource {resource} uses {used} of {capacity} units at time {time}"
            ),
            Violation::MissingJob(job) => write!(f, "job {job} has no allocation"),
            Violation::DuplicateJob(job) => write!(f, "job {job} is allocated more than once"),
            Violation::PrecedenceViolated {
                job,
                successor,
                finish,
                successor_start,
            } => write!(
                f,
                "job {job} finishes at {finish} but its successor {successor} starts at {successor_start}"
            ),
            Violation::ReleaseViolated {
                job,
                release_time,
                start_time,
            } => write!(
                f,
                "job {job} starts at {start_time} before its release time {release_time}"
            ),
        }
    }
}

/// Outcome of [`SolutionChecker::check_solution`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "solution is valid");
        }

        write!(f, "{} violation(s)", self.violations.len())?;
        for violation in &self.violations {
            write!(f, "\n  {violation}")?;
        }
        Ok(())
    }
}

/// Allocation interval together with the requests of its recorded mode.
struct Usage<'a> {
    start: usize,
    end: usize,
    requests: &'a [usize],
}

pub struct SolutionChecker<'a> {
    problem: &'a ProblemInstance,
    solution: &'a Solution,
}

impl<'a> SolutionChecker<'a> {
    pub fn new(problem: &'a ProblemInstance, solution: &'a Solution) -> Self {
        Self { problem, solution }
    }

    /// Runs every check, using the change-point sweep for capacities.
    pub fn check_solution(&self) -> Result<CheckReport, AllocationError> {
        let mut violations = self.check_all_jobs_allocated()?;
        violations.extend(self.check_objective()?);
        violations.extend(self.check_job_selected_processing_time()?);
        violations.extend(self.check_release_times()?);
        violations.extend(self.check_precedence_relations()?);
        violations.extend(self.check_resource_usage_over_intervals()?);

        let report = CheckReport { violations };
        if report.is_valid() {
            debug!("solution of {} is valid", self.problem.name);
        } else {
            warn!("solution of {} is invalid: {report}", self.problem.name);
        }

        Ok(report)
    }

    /// The reported makespan must equal the latest finish time.
    pub fn check_objective(&self) -> Result<Vec<Violation>, AllocationError> {
        let recomputed = self.solution.compute_makespan();

        Ok(if recomputed == self.solution.makespan {
            vec![]
        } else {
            vec![Violation::ObjectiveMismatch {
                reported: self.solution.makespan,
                recomputed,
            }]
        })
    }

    /// Every allocation lasts exactly the processing time of its recorded mode.
    pub fn check_job_selected_processing_time(&self) -> Result<Vec<Violation>, AllocationError> {
        let mut violations = vec![];

        for allocation in &self.solution.job_allocations {
            let processing_time = self.mode_requests(allocation)?.1;

            if allocation.duration != processing_time {
                violations.push(Violation::DurationMismatch {
                    job: allocation.job_id.clone(),
                    mode_id: allocation.mode_id,
                    duration: allocation.duration,
                    processing_time,
                });
            }
        }

        Ok(violations)
    }

    /// Every job of the instance appears exactly once, and nothing else does.
    pub fn check_all_jobs_allocated(&self) -> Result<Vec<Violation>, AllocationError> {
        let mut seen: HashMap<&str, usize> = HashMap::new();

        for allocation in &self.solution.job_allocations {
            if self.problem.find_job(&allocation.job_id).is_none() {
                return Err(AllocationError::UnknownJob(allocation.job_id.clone()));
            }
            *seen.entry(allocation.job_id.as_str()).or_default() += 1;
        }

        let mut violations = vec![];
        for job in self.problem.jobs() {
            match seen.get(job.id.as_str()) {
                None => violations.push(Violation::MissingJob(job.id.clone())),
                Some(count) if *count > 1 => violations.push(Violation::DuplicateJob(job.id.clone())),
                Some(_) => {}
            }
        }

        Ok(violations)
    }

    /// Every successor starts once its predecessor has finished.
    pub fn check_precedence_relations(&self) -> Result<Vec<Violation>, AllocationError> {
        let allocations = self.allocations_by_job()?;
        let mut violations = vec![];

        for job in self.problem.jobs() {
            let Some(allocation) = allocations.get(job.id.as_str()) else {
                continue;
            };

            for &successor in &job.successors {
                let successor = self.problem.job(successor);
                let Some(successor_allocation) = allocations.get(successor.id.as_str()) else {
                    continue;
                };

                if successor_allocation.start_time < allocation.finish_time() {
                    violations.push(Violation::PrecedenceViolated {
                        job: job.id.clone(),
                        successor: successor.id.clone(),
                        finish: allocation.finish_time(),
                        successor_start: successor_allocation.start_time,
                    });
                }
            }
        }

        Ok(violations)
    }

    pub fn check_release_times(&self) -> Result<Vec<Violation>, AllocationError> {
        let mut violations = vec![];

        for allocation in &self.solution.job_allocations {
            let job = self
                .problem
                .find_job(&allocation.job_id)
                .ok_or_else(|| AllocationError::UnknownJob(allocation.job_id.clone()))?;

            if allocation.start_time < job.release_time {
                violations.push(Violation::ReleaseViolated {
                    job: job.id.clone(),
                    release_time: job.release_time,
                    start_time: allocation.start_time,
                });
            }
        }

        Ok(violations)
    }

    /// Reference sweep over every integer time of `[0, makespan)`.
    ///
    /// Allocations enter the active set at their start and are pruned once
    /// they have ended.
    pub fn check_resource_usage_over_time_period(&self) -> Result<Vec<Violation>, AllocationError> {
        let mut usages = self.usages()?;
        usages.sort_by_key(|usage| usage.start);

        let horizon = self.solution.makespan.max(self.solution.compute_makespan());
        let mut pending = usages.iter().peekable();
        let mut active: Vec<&Usage> = vec![];
        let mut violations = vec![];

        for time in 0..horizon {
            active.retain(|usage| usage.end > time);
            while let Some(usage) = pending.next_if(|usage| usage.start <= time) {
                if usage.end > time {
                    active.push(usage);
                }
            }

            violations.extend(self.capacity_violations(time, &active));
        }

        Ok(violations)
    }

    /// Same check restricted to the times at which an allocation starts or
    /// ends, consumption being constant in between.
    pub fn check_resource_usage_over_intervals(&self) -> Result<Vec<Violation>, AllocationError> {
        let usages = self.usages()?;

        let mut change_points: Vec<usize> = usages
            .iter()
            .flat_map(|usage| [usage.start, usage.end])
            .collect();
        change_points.sort_unstable();
        change_points.dedup();

        let mut violations = vec![];
        for time in change_points {
            let active: Vec<&Usage> = usages
                .iter()
                .filter(|usage| usage.start <= time && time < usage.end)
                .collect();

            violations.extend(self.capacity_violations(time, &active));
        }

        Ok(violations)
    }

    fn capacity_violations(&self, time: usize, active: &[&Usage]) -> Vec<Violation> {
        self.problem
            .resources()
            .iter()
            .enumerate()
            .filter_map(|(resource, data)| {
                let used: usize = active.iter().map(|usage| usage.requests[resource]).sum();

                (used > data.capacity).then(|| Violation::CapacityExceeded {
                    resource: data.id.clone(),
                    time,
                    used,
                    capacity: data.capacity,
                })
            })
            .collect()
    }

    fn usages(&self) -> Result<Vec<Usage<'a>>, AllocationError> {
        self.solution
            .job_allocations
            .iter()
            .map(|allocation| {
                let (requests, _) = self.mode_requests(allocation)?;
                Ok(Usage {
                    start: allocation.start_time,
                    end: allocation.finish_time(),
                    requests,
                })
            })
            .collect()
    }

    /// Requests and processing time of the mode recorded in `allocation`.
    fn mode_requests(&self, allocation: &JobAllocation) -> Result<(&'a [usize], usize), AllocationError> {
        let job = self
            .problem
            .find_job(&allocation.job_id)
            .ok_or_else(|| AllocationError::UnknownJob(allocation.job_id.clone()))?;
        let mode = job
            .mode(allocation.mode_id)
            .ok_or_else(|| AllocationError::InvalidModeId {
                job: job.id.clone(),
                mode_id: allocation.mode_id,
                modes: job.modes.len(),
            })?;

        Ok((&mode.requested_units, mode.processing_time))
    }

    fn allocations_by_job(&self) -> Result<HashMap<&'a str, &'a JobAllocation>, AllocationError> {
        self.solution
            .job_allocations
            .iter()
            .map(|allocation| {
                self.problem
                    .find_job(&allocation.job_id)
                    .map(|_| (allocation.job_id.as_str(), allocation))
                    .ok_or_else(|| AllocationError::UnknownJob(allocation.job_id.clone()))
            })
            .collect()
    }
}
