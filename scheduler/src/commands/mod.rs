use std::{fs, path::Path, process::ExitCode};

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

mod check;
mod generate;
mod graph;
mod results;
mod solve;

pub use check::check;
pub use generate::generate;
pub use graph::graph;
pub use solve::solve;

/// Worst result of a command, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Outcome {
    Success,
    NoSolution,
    CheckFailed,
}

impl Outcome {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Outcome::Success => ExitCode::SUCCESS,
            Outcome::NoSolution => ExitCode::from(1),
            Outcome::CheckFailed => ExitCode::from(2),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::Outcome;

    #[test]
    fn check_failures_dominate() {
        let worst = [Outcome::NoSolution, Outcome::CheckFailed, Outcome::Success]
            .into_iter()
            .max();

        assert_eq!(worst, Some(Outcome::CheckFailed));
        assert!(Outcome::Success < Outcome::NoSolution);
    }
}
