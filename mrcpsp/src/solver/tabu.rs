use std::time::Instant;

use hashbrown::HashSet;
use log::{debug, info, trace};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::{prelude::*, ThreadPoolBuilder};

use super::{
    sources_load::{SourcesLoad, TimeResolution},
    tabu_list::{SimpleTabuList, TabuList, TabuMove},
    IntervalEngine, IntervalOutcome, SolveParams, TaskOutcome,
};
use crate::{config::TabuOptions, error::SolveError, model::IntervalModel, solution::SolutionStatus};

const ENGINE_NAME: &str = "tabu_search";

/// Activity list plus the chosen alternative of every task. The list is kept
/// precedence feasible: every task appears after all of its predecessors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    activities: Vec<usize>,
    modes: Vec<usize>,
}

impl Candidate {
    fn apply(&self, tabu_move: TabuMove) -> Candidate {
        let mut candidate = self.clone();
        match tabu_move {
            TabuMove::Swap(a, b) => {
                let index_a = candidate.activities.iter().position(|&task| task == a);
                let index_b = candidate.activities.iter().position(|&task| task == b);
                if let (Some(index_a), Some(index_b)) = (index_a, index_b) {
                    candidate.activities.swap(index_a, index_b);
                }
            }
            TabuMove::Mode { task, alternative } => candidate.modes[task] = alternative,
        }
        candidate
    }
}

/// Serial schedule generation over the interval model.
struct Decoder<'a> {
    model: &'a IntervalModel,
    predecessors: Vec<Vec<usize>>,
    successors: Vec<HashSet<usize>>,
    /// Alternatives whose pulses fit the capacities
    feasible_alternatives: Vec<Vec<usize>>,
}

impl<'a> Decoder<'a> {
    fn new(model: &'a IntervalModel) -> Self {
        let mut predecessors = vec![vec![]; model.tasks.len()];
        let mut successors = vec![HashSet::new(); model.tasks.len()];
        for &(before, after) in &model.precedences {
            predecessors[after].push(before);
            successors[before].insert(after);
        }

        let feasible_alternatives = model
            .tasks
            .iter()
            .map(|task| {
                task.alternatives
                    .iter()
                    .enumerate()
                    .filter(|(_, alternative)| {
                        alternative.pulses.len() == model.capacities.len()
                            && alternative
                                .pulses
                                .iter()
                                .zip(&model.capacities)
                                .all(|(pulse, capacity)| pulse <= capacity)
                    })
                    .map(|(index, _)| index)
                    .collect()
            })
            .collect();

        Self {
            model,
            predecessors,
            successors,
            feasible_alternatives,
        }
    }

    fn has_unschedulable_task(&self) -> bool {
        self.feasible_alternatives.iter().any(Vec::is_empty)
    }

    /// Start of every task.
    fn decode(&self, candidate: &Candidate) -> Vec<usize> {
        let mut load = TimeResolution::new(self.model.capacities.clone(), self.model.horizon);
        let mut starts = vec![0; self.model.tasks.len()];
        let mut finishes = vec![0; self.model.tasks.len()];

        for &task in &candidate.activities {
            let alternative = &self.model.tasks[task].alternatives[candidate.modes[task]];

            let earliest_precedence_start_time = self.predecessors[task]
                .iter()
                .map(|&predecessor| finishes[predecessor])
                .fold(self.model.tasks[task].start_min, usize::max);

            let start = load.get_earliest_start_time(
                &alternative.pulses,
                earliest_precedence_start_time,
                alternative.duration,
            );
            load.add_activity(start, start + alternative.duration, &alternative.pulses);

            starts[task] = start;
            finishes[task] = start + alternative.duration;
        }

        starts
    }

    fn makespan(&self, candidate: &Candidate) -> usize {
        self.decode(candidate)
            .iter()
            .enumerate()
            .map(|(task, start)| start + self.duration(candidate, task))
            .max()
            .unwrap_or(0)
    }

    fn duration(&self, candidate: &Candidate, task: usize) -> usize {
        self.model.tasks[task].alternatives[candidate.modes[task]].duration
    }

    /// Swaps of tasks at most `swap_range` positions apart that keep the list
    /// precedence feasible, and every switch to another feasible alternative.
    fn neighborhood(&self, candidate: &Candidate, swap_range: usize) -> Vec<TabuMove> {
        let activities = &candidate.activities;
        let mut moves = vec![];

        for i in 0..activities.len() {
            let a = activities[i];

            for j in (i + 1)..activities.len().min(i + swap_range + 1) {
                let b = activities[j];

                // b may not follow one of its predecessors, a may not pass one of its successors
                let b_blocked = activities[i..j]
                    .iter()
                    .any(|&task| self.successors[task].contains(&b));
                let a_blocked = activities[(i + 1)..=j]
                    .iter()
                    .any(|task| self.successors[a].contains(task));

                if !b_blocked && !a_blocked {
                    moves.push(TabuMove::swap(a, b));
                }
            }
        }

        for (task, alternatives) in self.feasible_alternatives.iter().enumerate() {
            moves.extend(
                alternatives
                    .iter()
                    .filter(|&&alternative| alternative != candidate.modes[task])
                    .map(|&alternative| TabuMove::Mode { task, alternative }),
            );
        }

        moves
    }

    /// The inverse of `tabu_move` on `candidate`, the move the tabu list forbids.
    fn reverse(candidate: &Candidate, tabu_move: TabuMove) -> TabuMove {
        match tabu_move {
            TabuMove::Swap(..) => tabu_move,
            TabuMove::Mode { task, .. } => TabuMove::Mode {
                task,
                alternative: candidate.modes[task],
            },
        }
    }
}

/// Searches activity lists and alternatives of the interval model with tabu
/// search, decoding every candidate with a serial schedule generation scheme.
#[derive(Debug, Clone, Default)]
pub struct TabuSearchEngine {
    options: TabuOptions,
}

impl TabuSearchEngine {
    pub fn new(options: TabuOptions) -> Self {
        Self { options }
    }

    fn initial_candidates(&self, decoder: &Decoder, ranks: &[Vec<usize>], rng: &mut StdRng) -> Vec<Candidate> {
        // shortest feasible alternative first
        let modes: Vec<usize> = decoder
            .feasible_alternatives
            .iter()
            .enumerate()
            .map(|(task, alternatives)| {
                alternatives
                    .iter()
                    .copied()
                    .min_by_key(|&alternative| decoder.model.tasks[task].alternatives[alternative].duration)
                    .unwrap_or(0)
            })
            .collect();

        (0..self.options.initial_solutions.max(1))
            .map(|index| {
                let activities = ranks
                    .iter()
                    .cloned()
                    .flat_map(|mut rank| {
                        if index > 0 {
                            rank.shuffle(&mut *rng);
                        }
                        rank
                    })
                    .collect();

                Candidate {
                    activities,
                    modes: modes.clone(),
                }
            })
            .collect()
    }
}

struct SearchState {
    best: Candidate,
    best_makespan: usize,
    stop: bool,
}

impl TabuSearchEngine {
    #[allow(clippy::too_many_arguments)]
    fn improve(
        &self,
        decoder: &Decoder,
        start: Candidate,
        iterations: u32,
        lower_bound: usize,
        params: &SolveParams,
        started: &Instant,
        state: &mut SearchState,
        rng: &mut StdRng,
    ) {
        let mut schedule = start;
        let mut tabu_list = SimpleTabuList::new(self.options.tabu_list_size);
        let mut iter_since_best = 0;

        let makespan = decoder.makespan(&schedule);
        if makespan < state.best_makespan {
            state.best = schedule.clone();
            state.best_makespan = makespan;
        }

        for iteration in 0..iterations {
            if state.best_makespan <= lower_bound || within_gap(state.best_makespan, lower_bound, params) {
                state.stop = true;
                break;
            }

            if let Some(limit) = params.time_limit {
                if started.elapsed() >= limit {
                    info!("stopping search as time limit has passed");
                    state.stop = true;
                    break;
                }
            }

            if iter_since_best >= self.options.max_iter_since_best {
                debug!("did not find better move in {iter_since_best} iterations, thus stopping search");
                break;
            }

            let moves = decoder.neighborhood(&schedule, self.options.swap_range);
            if moves.is_empty() {
                break;
            }

            let best_makespan = state.best_makespan;
            let mut rated_moves: Vec<(usize, TabuMove)> = moves
                .into_par_iter()
                .map(|tabu_move| (decoder.makespan(&schedule.apply(tabu_move)), tabu_move))
                .filter(|(makespan, tabu_move)| {
                    tabu_list.is_possible_move(tabu_move) || *makespan < best_makespan
                })
                .collect();
            rated_moves.sort_by_key(|(makespan, _)| *makespan);
            trace!("iteration {iteration}: {} admissible moves", rated_moves.len());

            iter_since_best += 1;

            let Some(&(makespan, tabu_move)) = rated_moves.first() else {
                tabu_list.prune(rng);
                continue;
            };

            tabu_list.add_turn_to_tabu_list(Decoder::reverse(&schedule, tabu_move));
            schedule = schedule.apply(tabu_move);

            if makespan < state.best_makespan {
                debug!("iteration {iteration}: new best makespan {makespan}");
                state.best = schedule.clone();
                state.best_makespan = makespan;
                iter_since_best = 0;
            }
        }
    }
}

fn within_gap(makespan: usize, lower_bound: usize, params: &SolveParams) -> bool {
    params.relative_gap > 0.0
        && makespan > 0
        && (makespan - lower_bound.min(makespan)) as f64 / makespan as f64 <= params.relative_gap
}

impl IntervalEngine for TabuSearchEngine {
    fn name(&self) -> &'static str {
        ENGINE_NAME
    }

    fn solve(&self, model: &IntervalModel, params: &SolveParams) -> Result<IntervalOutcome, SolveError> {
        let started = Instant::now();
        let decoder = Decoder::new(model);

        let graph = model.precedence_graph();
        if graph.topological_order().is_none() || decoder.has_unschedulable_task() {
            info!("{ENGINE_NAME}: no task order or alternative satisfies the model");
            return Ok(IntervalOutcome::without_tasks(SolutionStatus::Infeasible));
        }

        let lower_bound = model.lower_bound();
        info!("lower bound: {lower_bound}");

        let mut rng = match self.options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let candidates = self.initial_candidates(&decoder, &graph.execution_ranks(), &mut rng);
        let iterations = (self.options.number_of_iterations / candidates.len() as u32).max(1);

        let pool = ThreadPoolBuilder::new()
            .num_threads(params.threads.max(1))
            .build()
            .map_err(|e| SolveError::EngineFailure {
                engine: ENGINE_NAME,
                reason: e.to_string(),
            })?;

        let mut state = SearchState {
            best_makespan: usize::MAX,
            best: candidates[0].clone(),
            stop: false,
        };

        pool.install(|| {
            for candidate in candidates {
                self.improve(
                    &decoder,
                    candidate,
                    iterations,
                    lower_bound,
                    params,
                    &started,
                    &mut state,
                    &mut rng,
                );

                if state.stop {
                    break;
                }
            }
        });

        let starts = decoder.decode(&state.best);
        let tasks: Vec<TaskOutcome> = starts
            .iter()
            .enumerate()
            .map(|(task, &start)| TaskOutcome {
                start,
                end: start + decoder.duration(&state.best, task),
                alternative: state.best.modes[task],
            })
            .collect();
        let objective = tasks.iter().map(|task| task.end).max().unwrap_or(0);

        let status = if objective <= lower_bound {
            SolutionStatus::Optimal
        } else {
            SolutionStatus::Feasible
        };

        info!(
            "{ENGINE_NAME} finished with {status} makespan {objective} (lower bound {lower_bound}) in {:.3}s",
            started.elapsed().as_secs_f64()
        );

        Ok(IntervalOutcome {
            status,
            objective,
            bound: lower_bound.min(objective),
            tasks,
        })
    }
}
