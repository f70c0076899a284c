use hashbrown::HashSet;
use log::trace;
use petgraph::{
    algo,
    graph::{DiGraph, NodeIndex},
    Direction,
};

use super::ProblemInstance;

/// Precedence relations as a petgraph digraph, node `i` being job `i`.
pub struct PrecedenceGraph {
    graph: DiGraph<usize, ()>,
    nodes: Vec<NodeIndex>,
}

impl PrecedenceGraph {
    pub fn new(node_count: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut graph = DiGraph::with_capacity(node_count, node_count);
        let nodes: Vec<NodeIndex> = (0..node_count).map(|node| graph.add_node(node)).collect();

        for (from, to) in edges {
            graph.add_edge(nodes[from], nodes[to], ());
        }

        Self { graph, nodes }
    }

    pub fn from_problem(problem: &ProblemInstance) -> Self {
        Self::new(
            problem.jobs().len(),
            problem
                .jobs()
                .iter()
                .enumerate()
                .flat_map(|(job, data)| data.successors.iter().map(move |&succ| (job, succ))),
        )
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (self.graph[edge.source()], self.graph[edge.target()]))
    }

    pub fn successors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(self.nodes[node], Direction::Outgoing)
            .map(|neighbor| self.graph[neighbor])
    }

    pub fn predecessors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.graph
            .neighbors_directed(self.nodes[node], Direction::Incoming)
            .map(|neighbor| self.graph[neighbor])
    }

    pub fn has_path(&self, from: usize, to: usize) -> bool {
        algo::has_path_connecting(&self.graph, self.nodes[from], self.nodes[to], None)
    }

    /// Returns a job lying on a cycle, found by searching a path from each
    /// successor back to its job.
    pub fn find_cycle(&self) -> Option<usize> {
        (0..self.node_count()).find(|&node| {
            self.successors(node)
                .any(|successor| self.has_path(successor, node))
        })
    }

    pub fn topological_order(&self) -> Option<Vec<usize>> {
        algo::toposort(&self.graph, None)
            .ok()
            .map(|order| order.into_iter().map(|node| self.graph[node]).collect())
    }

    /// Groups jobs into ranks: a job joins the rank right after the last of its
    /// predecessors has been placed. Jobs without predecessors form rank zero.
    pub fn execution_ranks(&self) -> Vec<Vec<usize>> {
        let mut ranks: Vec<Vec<usize>> = vec![];
        let mut visited: HashSet<usize> = HashSet::new();

        let mut same_rank: Vec<usize> = (0..self.node_count())
            .filter(|&node| self.predecessors(node).next().is_none())
            .collect();

        while !same_rank.is_empty() {
            visited.extend(same_rank.iter().copied());

            let mut next_rank: Vec<usize> = same_rank
                .iter()
                .flat_map(|&node| self.successors(node))
                .filter(|&successor| !visited.contains(&successor))
                .filter(|&successor| {
                    self.predecessors(successor)
                        .all(|requirement| visited.contains(&requirement))
                })
                .collect();
            next_rank.sort_unstable();
            next_rank.dedup();

            ranks.push(same_rank);
            same_rank = next_rank;
        }

        trace!("execution ranks: {ranks:?}");

        ranks
    }

    /// Earliest finish of the whole graph when every node takes `durations[i]`
    /// and may not start before `release[i]`.
    pub fn critical_path_length(&self, durations: &[usize], release: &[usize]) -> usize {
        let Some(order) = self.topological_order() else {
            return 0;
        };

        let mut finish = vec![0; self.node_count()];
        for node in order {
            let start = self
                .predecessors(node)
                .map(|predecessor| finish[predecessor])
                .max()
                .unwrap_or(0)
                .max(release[node]);
            finish[node] = start + durations[node];
        }

        finish.into_iter().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::PrecedenceGraph;
    use crate::problem::tests::multi_mode_problem;

    #[test]
    fn ranks_follow_predecessors() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3, 4 standalone, 2 -> 5
        let graph = PrecedenceGraph::new(6, [(0, 1), (0, 2), (1, 3), (2, 3), (2, 5)]);

        assert_eq!(
            graph.execution_ranks(),
            vec![vec![0, 4], vec![1, 2], vec![3, 5]]
        );
    }

    #[test]
    fn rank_waits_for_longest_chain() {
        // 3 depends on 0 directly and on 0 -> 1 -> 2
        let graph = PrecedenceGraph::new(4, [(0, 1), (1, 2), (2, 3), (0, 3)]);

        assert_eq!(
            graph.execution_ranks(),
            vec![vec![0], vec![1], vec![2], vec![3]]
        );
    }

    #[test]
    fn critical_path_uses_release_times() {
        let graph = PrecedenceGraph::new(3, [(0, 1), (1, 2)]);

        assert_eq!(graph.critical_path_length(&[2, 3, 1], &[0, 0, 0]), 6);
        assert_eq!(graph.critical_path_length(&[2, 3, 1], &[0, 4, 0]), 8);
    }

    #[test]
    fn problem_graph_is_acyclic() {
        let problem = multi_mode_problem();
        let graph = PrecedenceGraph::from_problem(&problem);

        assert_eq!(graph.find_cycle(), None);
        assert!(graph.has_path(0, 3));
        assert!(!graph.has_path(1, 2));
        assert_eq!(graph.edges().count(), 4);
        assert_eq!(graph.topological_order().unwrap()[0], 0);

        let cyclic = PrecedenceGraph::new(2, [(0, 1), (1, 0)]);
        assert!(cyclic.find_cycle().is_some());
        assert!(cyclic.topological_order().is_none());
    }
}
