use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

pub mod checker;
pub mod reconstruct;
pub mod units;

pub use reconstruct::reconstruct_allocations;
pub use units::assign_resource_units;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolutionStatus {
    Optimal,
    Feasible,
    Infeasible,
    Unbounded,
    Error,
    Unknown,
}

impl SolutionStatus {
    /// Only optimal and feasible outcomes carry allocations.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

impl fmt::Display for SolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SolutionStatus::Optimal => "OPTIMAL",
            SolutionStatus::Feasible => "FEASIBLE",
            SolutionStatus::Infeasible => "INFEASIBLE",
            SolutionStatus::Unbounded => "UNBOUNDED",
            SolutionStatus::Error => "ERROR",
            SolutionStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobAllocation {
    pub job_id: String,
    pub start_time: usize,
    pub duration: usize,
    /// 1-based position of the selected mode
    pub mode_id: usize,
    /// Resource index to the unit indices held for the whole duration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units_map: Option<BTreeMap<usize, Vec<usize>>>,
}

impl JobAllocation {
    pub fn new(job_id: impl Into<String>, start_time: usize, duration: usize, mode_id: usize) -> Self {
        Self {
            job_id: job_id.into(),
            start_time,
            duration,
            mode_id,
            units_map: None,
        }
    }

    pub fn finish_time(&self) -> usize {
        self.start_time + self.duration
    }
}

impl fmt::Display for JobAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job {} mode {} [{}, {})",
            self.job_id,
            self.mode_id,
            self.start_time,
            self.finish_time()
        )?;

        if let Some(units_map) = &self.units_map {
            for (resource, units) in units_map {
                write!(f, " r{resource}:{units:?}")?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub status: SolutionStatus,
    pub gap: f64,
    pub objective_bound: f64,
    pub makespan: usize,
    /// Wall clock seconds spent in the engine
    pub runtime: f64,
    pub job_allocations: Vec<JobAllocation>,
}

impl Solution {
    /// Outcome without a schedule (infeasible, unbounded, unknown, ...).
    pub fn without_schedule(status: SolutionStatus, runtime: f64) -> Self {
        Self {
            status,
            gap: 0.0,
            objective_bound: 0.0,
            makespan: 0,
            runtime,
            job_allocations: vec![],
        }
    }

    /// Largest finish time over all allocations.
    pub fn compute_makespan(&self) -> usize {
        self.job_allocations
            .iter()
            .map(JobAllocation::finish_time)
            .max()
            .unwrap_or(0)
    }

    pub fn allocation(&self, job_id: &str) -> Option<&JobAllocation> {
        self.job_allocations
            .iter()
            .find(|allocation| allocation.job_id == job_id)
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} makespan {} (bound {}, gap {:.4}) in {:.3}s",
            self.status, self.makespan, self.objective_bound, self.gap, self.runtime
        )?;
        for allocation in &self.job_allocations {
            writeln!(f, "  {allocation}")?;
        }
        Ok(())
    }
}

/// Relative distance between an objective and its bound.
pub(crate) fn relative_gap(objective: f64, bound: f64) -> f64 {
    if objective.abs() < f64::EPSILON {
        0.0
    } else {
        ((objective - bound) / objective).abs()
    }
}
