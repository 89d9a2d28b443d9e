use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet, VecDeque};

use argus_ir::LocationId;

use super::NodeId;
use crate::config::SearchStrategy;

/// Frontier of nodes awaiting expansion.
///
/// Pop order depends only on the strategy and the push sequence.
#[derive(Debug)]
pub struct Waitlist {
    strategy: SearchStrategy,
    queue: VecDeque<NodeId>,
    heap: BinaryHeap<Reverse<(usize, usize, NodeId)>>,
    /// Distance of each location to the error location, for `ErrorDistance`.
    distances: Vec<Option<usize>>,
    members: HashSet<NodeId>,
    seq: usize,
}

impl Waitlist {
    pub fn new(strategy: SearchStrategy, distances: Vec<Option<usize>>) -> Self {
        Self {
            strategy,
            queue: VecDeque::new(),
            heap: BinaryHeap::new(),
            distances,
            members: HashSet::new(),
            seq: 0,
        }
    }

    /// Adds `node` unless it is already waiting.
    pub fn push(&mut self, node: NodeId, loc: LocationId) {
        if !self.members.insert(node) {
            return;
        }
        match self.strategy {
            SearchStrategy::Bfs | SearchStrategy::Dfs => self.queue.push_back(node),
            SearchStrategy::ErrorDistance => {
                let dist = self
                    .distances
                    .get(loc)
                    .copied()
                    .flatten()
                    .unwrap_or(usize::MAX);
                self.heap.push(Reverse((dist, self.seq, node)));
            }
        }
        self.seq += 1;
    }

    pub fn pop(&mut self) -> Option<NodeId> {
        let node = match self.strategy {
            SearchStrategy::Bfs => self.queue.pop_front(),
            SearchStrategy::Dfs => self.queue.pop_back(),
            SearchStrategy::ErrorDistance => self.heap.pop().map(|Reverse((_, _, n))| n),
        }?;
        self.members.remove(&node);
        Some(node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut wl: Waitlist) -> Vec<usize> {
        std::iter::from_fn(|| wl.pop()).map(|n| n.0).collect()
    }

    fn filled(strategy: SearchStrategy) -> Waitlist {
        let mut wl = Waitlist::new(strategy, vec![Some(2), Some(0), None]);
        for (node, loc) in [(0, 0), (1, 2), (2, 1), (3, 0)] {
            wl.push(NodeId(node), loc);
        }
        wl
    }

    #[test]
    fn strategies_order_deterministically() {
        assert_eq!(drain(filled(SearchStrategy::Bfs)), vec![0, 1, 2, 3]);
        assert_eq!(drain(filled(SearchStrategy::Dfs)), vec![3, 2, 1, 0]);
        assert_eq!(drain(filled(SearchStrategy::ErrorDistance)), vec![2, 0, 3, 1]);
    }

    #[test]
    fn duplicates_are_ignored() {
        let mut wl = Waitlist::new(SearchStrategy::Bfs, Vec::new());
        wl.push(NodeId(4), 0);
        wl.push(NodeId(4), 0);
        assert_eq!(wl.len(), 1);
        assert!(wl.contains(NodeId(4)));
        assert_eq!(wl.pop(), Some(NodeId(4)));
        assert!(wl.is_empty());
    }
}
