// Capped A*-style search toward the adversary nearest at the decision point
//
// The search reproduces a deliberately coarse policy rather than textbook A*:
// - nodes are equivalent when the agent stands on the same node, whatever else differs
// - the open set is sorted ascending by f and the node at the back is taken
// - a child equivalent to an open node overwrites that node's g and h with the
//   parent's values when the parent's f is lower; nothing is re-propagated
// Because the node taken always has the highest f left, the overwrite can only
// hit a sibling pushed earlier in the same expansion.
// The reported bound is the smallest f over every node taken off the open set.

use log::debug;
use std::collections::HashSet;

use super::{
    lowest, score_first_moves, Deadline, Decision, SearchOutcome, Strategy, StrategyKind,
};
use crate::config::AStarConfig;
use crate::error::DecisionError;
use crate::simulation::{branch, AdversaryPolicy, Simulation, UNREACHABLE};
use crate::types::{AdversaryId, NodeIndex};

/// Search node with path cost g, heuristic h and f = g + h
#[derive(Debug, Clone)]
pub struct AStarNode<S> {
    state: S,
    g: i32,
    h: i32,
    f: i32,
}

impl<S: Simulation> AStarNode<S> {
    pub fn new(state: S, g: i32, h: i32) -> Self {
        AStarNode { state, g, h, f: g.saturating_add(h) }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn g(&self) -> i32 {
        self.g
    }

    pub fn h(&self) -> i32 {
        self.h
    }

    pub fn f(&self) -> i32 {
        self.f
    }

    /// Agent position, the only thing node equivalence looks at
    pub fn position(&self) -> NodeIndex {
        self.state.agent_position()
    }

    pub fn is_equivalent(&self, other: &AStarNode<S>) -> bool {
        self.position() == other.position()
    }

    /// In-place cost overwrite used when a cheaper parent reaches an open node
    pub fn overwrite_costs(&mut self, g: i32, h: i32) {
        self.g = g;
        self.h = h;
        self.f = g.saturating_add(h);
    }
}

/// Bounded search toward one fixed adversary
pub struct AStarSearch<'p, P> {
    g_cap: i32,
    target: AdversaryId,
    policy: &'p P,
}

impl<'p, P> AStarSearch<'p, P> {
    pub fn new(g_cap: i32, target: AdversaryId, policy: &'p P) -> Self {
        AStarSearch { g_cap, target, policy }
    }

    /// Runs the search from `root` until the agent meets the target, the open
    /// set empties, or an enforced deadline passes
    pub fn run<S>(&self, root: AStarNode<S>, deadline: &Deadline) -> SearchOutcome
    where
        S: Simulation,
        P: AdversaryPolicy<S>,
    {
        let mut outcome = SearchOutcome {
            bound: UNREACHABLE,
            expanded: 0,
            reached_target: false,
            cut_short: false,
        };
        let mut open: Vec<AStarNode<S>> = vec![root];
        let mut closed: HashSet<NodeIndex> = HashSet::new();

        loop {
            open.sort_by_key(|node| node.f);
            let current = match open.pop() {
                Some(node) => node,
                None => break,
            };
            outcome.expanded += 1;
            closed.insert(current.position());

            if current.f < outcome.bound {
                outcome.bound = current.f;
            }
            if current.position() == current.state.adversary_position(self.target) {
                outcome.reached_target = true;
                break;
            }
            if deadline.expired() {
                outcome.cut_short = true;
                break;
            }
            if current.g >= self.g_cap {
                continue;
            }

            for m in current.state.agent_legal_moves() {
                let child_state = branch(&current.state, m, self.policy);
                let h = child_state.adversary_distance(self.target);
                let child = AStarNode::new(child_state, current.g + 1, h);

                if closed.contains(&child.position()) {
                    continue;
                }
                match open.iter().rposition(|node| node.is_equivalent(&child)) {
                    None => open.push(child),
                    Some(idx) => {
                        if current.f < open[idx].f {
                            open[idx].overwrite_costs(current.g, current.h);
                        }
                    }
                }
            }
        }

        outcome
    }
}

/// Picks the first move whose search toward the nearest adversary has the smallest bound
pub struct AStarStrategy<P> {
    config: AStarConfig,
    parallel: bool,
    policy: P,
}

impl<P> AStarStrategy<P> {
    pub fn new(config: AStarConfig, parallel: bool, policy: P) -> Self {
        AStarStrategy { config, parallel, policy }
    }
}

impl<S, P> Strategy<S> for AStarStrategy<P>
where
    S: Simulation,
    P: AdversaryPolicy<S>,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Astar
    }

    fn designated_adversary(&self) -> AdversaryId {
        self.config.designated_adversary
    }

    fn decide(&mut self, state: &S, deadline: &Deadline) -> Result<Decision, DecisionError> {
        let (target, distance) = state.nearest_adversary();
        debug!("A* target {} at distance {}", target, distance);

        let search = AStarSearch::new(self.config.g_cap, target, &self.policy);
        let scores = score_first_moves(state, &self.policy, self.parallel, |child| {
            let h = child.adversary_distance(target);
            let outcome = search.run(AStarNode::new(child, 1, h), deadline);
            debug!(
                "A* root expanded {} nodes, bound {}, reached target: {}",
                outcome.expanded, outcome.bound, outcome.reached_target
            );
            outcome.bound
        });

        let (chosen, bound) = lowest(&scores).ok_or(DecisionError::NoLegalMoves)?;
        Ok(Decision::new(chosen, Some(bound)))
    }
}
