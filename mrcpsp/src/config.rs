use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Time-indexed ILP solved through good_lp
    Milp,
    /// Interval model solved by tabu search
    TabuSearch,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Milp => write!(f, "milp"),
            EngineKind::TabuSearch => write!(f, "tabu_search"),
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "milp" | "ilp" => Ok(EngineKind::Milp),
            "tabu_search" | "tabu" | "cp" => Ok(EngineKind::TabuSearch),
            _ => Err(format!("unknown engine {s}, expected milp or tabu_search")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabuOptions {
    pub number_of_iterations: u32,
    pub max_iter_since_best: u32,
    pub tabu_list_size: usize,
    pub swap_range: usize,
    /// Number of starting activity lists, the first one is never shuffled
    pub initial_solutions: usize,
    pub seed: Option<u64>,
}

impl Default for TabuOptions {
    fn default() -> Self {
        Self {
            number_of_iterations: 1000,
            max_iter_since_best: 100,
            tabu_list_size: 25,
            swap_range: 15,
            initial_solutions: 4,
            seed: None,
        }
    }
}

/// Settings of a single solve, passed explicitly to every solve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub engine: EngineKind,
    pub relative_gap: f64,
    /// Seconds, `0` disables the limit
    pub time_limit: f64,
    pub threads: usize,
    pub verbose: bool,
    pub check_solution: bool,
    pub assign_resource_units: bool,
    pub tabu: TabuOptions,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Milp,
            relative_gap: 0.0,
            time_limit: 30.0,
            threads: num_cpus::get(),
            verbose: false,
            check_solution: true,
            assign_resource_units: false,
            tabu: TabuOptions::default(),
        }
    }
}

impl SolverConfig {
    pub fn time_limit(&self) -> Option<Duration> {
        (self.time_limit > 0.0).then(|| Duration::from_secs_f64(self.time_limit))
    }
}
