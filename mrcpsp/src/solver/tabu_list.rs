use hashbrown::HashMap;
use rand::{seq::SliceRandom, Rng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TabuMove {
    /// Exchange of two tasks in the activity list, smaller task first
    Swap(usize, usize),
    /// Task switched to another alternative
    Mode { task: usize, alternative: usize },
}

impl TabuMove {
    pub fn swap(a: usize, b: usize) -> Self {
        TabuMove::Swap(a.min(b), a.max(b))
    }
}

pub trait TabuList {
    /// Check if move is permitted
    fn is_possible_move(&self, tabu_move: &TabuMove) -> bool;
    /// Add move to tabu list, evicting the oldest one when full.
    fn add_turn_to_tabu_list(&mut self, tabu_move: TabuMove);
    /// Removes some tabu moves randomly, used when the whole neighborhood was tabu.
    fn prune<R: Rng>(&mut self, rng: &mut R);
}

#[derive(Debug, Clone)]
pub struct SimpleTabuList {
    /// Current index at tabu list (circular buffer)
    cur_idx: usize,
    tabu: Vec<Option<TabuMove>>,
    /// Number of ring slots holding each move
    tabu_search: HashMap<TabuMove, usize>,
}

impl SimpleTabuList {
    pub fn new(length: usize) -> Self {
        Self {
            cur_idx: 0,
            tabu: vec![None; length],
            tabu_search: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.tabu.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn forget(&mut self, tabu_move: &TabuMove) {
        if let Some(count) = self.tabu_search.get_mut(tabu_move) {
            *count -= 1;
            if *count == 0 {
                self.tabu_search.remove(tabu_move);
            }
        }
    }
}

impl TabuList for SimpleTabuList {
    fn is_possible_move(&self, tabu_move: &TabuMove) -> bool {
        !self.tabu_search.contains_key(tabu_move)
    }

    fn add_turn_to_tabu_list(&mut self, tabu_move: TabuMove) {
        if self.tabu.is_empty() {
            return;
        }

        if let Some(evicted) = self.tabu[self.cur_idx].take() {
            self.forget(&evicted);
        }

        self.tabu[self.cur_idx] = Some(tabu_move);
        *self.tabu_search.entry(tabu_move).or_insert(0) += 1;

        self.cur_idx = (self.cur_idx + 1) % self.tabu.len();
    }

    fn prune<R: Rng>(&mut self, rng: &mut R) {
        let mut idx_valid_moves: Vec<usize> = self
            .tabu
            .iter()
            .enumerate()
            .filter(|(_, record)| record.is_some())
            .map(|(idx, _)| idx)
            .collect();

        idx_valid_moves.shuffle(rng);

        let count_moves_to_remove = (0.3 * idx_valid_moves.len() as f32) as usize;

        for &move_idx in idx_valid_moves.iter().take(count_moves_to_remove) {
            if let Some(removed) = self.tabu[move_idx].take() {
                self.forget(&removed);
            }
        }
    }
}
