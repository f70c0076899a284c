use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::info;
use mrcpsp::{Solution, SolutionStatus};
use serde::{Deserialize, Serialize};

pub const SOLUTIONS_FILE: &str = "instances_solution.json";
pub const STATISTICS_FILE: &str = "statistics.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionRow {
    pub instance_id: String,
    pub job_id: String,
    pub start: usize,
    pub processing_time: usize,
    pub finish: usize,
    pub mode_id: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRow {
    pub instance_id: String,
    pub runtime: f64,
    pub gap: f64,
    pub makespan: usize,
    pub status: SolutionStatus,
}

/// Collects result rows of a batch and writes them into the results directory.
#[derive(Debug)]
pub struct ResultSink {
    directory: PathBuf,
    solutions: Vec<SolutionRow>,
    statistics: Vec<StatisticsRow>,
}

impl ResultSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            solutions: vec![],
            statistics: vec![],
        }
    }

    pub fn add_statistics(&mut self, instance_id: &str, solution: &Solution) {
        self.statistics.push(StatisticsRow {
            instance_id: instance_id.to_string(),
            runtime: solution.runtime,
            gap: solution.gap,
            makespan: solution.makespan,
            status: solution.status,
        });
    }

    pub fn add_solution(&mut self, instance_id: &str, solution: &Solution) {
        self.solutions
            .extend(solution.job_allocations.iter().map(|allocation| SolutionRow {
                instance_id: instance_id.to_string(),
                job_id: allocation.job_id.clone(),
                start: allocation.start_time,
                processing_time: allocation.duration,
                finish: allocation.finish_time(),
                mode_id: allocation.mode_id,
            }));
    }

    /// Stores the whole solution, the file can be re-verified with `check`.
    pub fn write_allocations(&self, instance_id: &str, solution: &Solution) -> Result<PathBuf> {
        let path = self.directory.join(format!("{instance_id}_allocations.json"));
        write_json(&path, solution)?;
        Ok(path)
    }

    pub fn write(&self) -> Result<()> {
        fs::create_dir_all(&self.directory)
            .with_context(|| format!("creating {}", self.directory.display()))?;

        write_json(&self.directory.join(SOLUTIONS_FILE), &self.solutions)?;
        write_json(&self.directory.join(STATISTICS_FILE), &self.statistics)?;

        info!(
            "Wrote {} solution rows and {} statistics rows to {}",
            self.solutions.len(),
            self.statistics.len(),
            self.directory.display()
        );

        Ok(())
    }

    pub fn solutions(&self) -> &[SolutionRow] {
        &self.solutions
    }

    pub fn statistics(&self) -> &[StatisticsRow] {
        &self.statistics
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)?;
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use mrcpsp::{JobAllocation, Solution, SolutionStatus};

    use super::{ResultSink, SolutionRow, SOLUTIONS_FILE, STATISTICS_FILE};

    fn solution() -> Solution {
        Solution {
            status: SolutionStatus::Optimal,
            gap: 0.0,
            objective_bound: 5.0,
            makespan: 5,
            runtime: 0.25,
            job_allocations: vec![JobAllocation::new("A", 0, 3, 1), JobAllocation::new("B", 3, 2, 1)],
        }
    }

    #[test]
    fn one_row_per_allocation() {
        let mut sink = ResultSink::new("unused");
        sink.add_statistics("instance_0", &solution());
        sink.add_solution("instance_0", &solution());

        assert_eq!(sink.statistics().len(), 1);
        assert_eq!(sink.statistics()[0].makespan, 5);
        assert_eq!(
            sink.solutions()[1],
            SolutionRow {
                instance_id: "instance_0".into(),
                job_id: "B".into(),
                start: 3,
                processing_time: 2,
                finish: 5,
                mode_id: 1,
            }
        );
    }

    #[test]
    fn files_are_written() {
        let directory = std::env::temp_dir().join(format!("scheduler_results_{}", std::process::id()));
        let mut sink = ResultSink::new(&directory);
        sink.add_statistics("instance_0", &solution());
        sink.add_solution("instance_0", &solution());

        sink.write().unwrap();
        let path = sink.write_allocations("instance_0", &solution()).unwrap();

        let stored: Solution =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(stored, solution());
        assert!(directory.join(SOLUTIONS_FILE).is_file());
        assert!(directory.join(STATISTICS_FILE).is_file());

        std::fs::remove_dir_all(directory).unwrap();
    }
}
