use std::path::PathBuf;

use anyhow::{Context, Result};
use instance_io::read_instance;
use log::{error, info, warn};
use mrcpsp::{ProblemInstance, Solution, SolutionChecker};

use super::{read_json, Outcome};

pub fn check(instance_path: PathBuf, solution_path: PathBuf) -> Result<Outcome> {
    let name = instance_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let file = read_instance(&instance_path)?;
    let problem = ProblemInstance::from_instance_file(name, &file)
        .with_context(|| format!("building problem from {}", instance_path.display()))?;
    let solution: Solution = read_json(&solution_path)?;

    if !solution.status.has_solution() {
        warn!("Solution has status {}, nothing to check", solution.status);
        return Ok(Outcome::NoSolution);
    }

    let report = SolutionChecker::new(&problem, &solution).check_solution()?;

    if report.is_valid() {
        info!("{}: {report}", problem.name);
        Ok(Outcome::Success)
    } else {
        error!("{}: {report}", problem.name);
        Ok(Outcome::CheckFailed)
    }
}
