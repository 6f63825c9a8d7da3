// Bounded depth-first branch exploration
//
// Every reachable node up to the depth bound is visited (no pruning). The score
// of a first move is the minimum of distance-to-nearest-adversary + depth over
// all visited nodes, leaves and interior alike. This is a loose lower bound, not
// a true shortest path.

use log::{debug, info, warn};

use super::{
    lowest, score_first_moves, Deadline, Decision, SearchOutcome, Strategy, StrategyKind,
};
use crate::config::DfsConfig;
use crate::dataset::{append_record, Features, HistoricalSample};
use crate::error::DecisionError;
use crate::simulation::{branch, AdversaryPolicy, Simulation, UNREACHABLE};
use crate::types::{AdversaryId, Move};

/// Log target of the per-decision CSV line, routed to stdout by the service
pub const DIAGNOSTIC_TARGET: &str = "dfs_trace";

/// A simulated state at some depth below a first move
#[derive(Debug, Clone)]
pub struct DfsNode<S> {
    state: S,
    depth: u32,
}

impl<S: Simulation> DfsNode<S> {
    pub fn new(state: S, depth: u32) -> Self {
        DfsNode { state, depth }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Moves already spent plus the remaining distance to the nearest adversary
    pub fn total_distance(&self) -> i32 {
        self.state.nearest_adversary_distance().saturating_add(self.depth as i32)
    }
}

/// Stack-based exhaustive search to a fixed depth
pub struct DfsSearch<'p, P> {
    max_depth: u32,
    policy: &'p P,
}

impl<'p, P> DfsSearch<'p, P> {
    pub fn new(max_depth: u32, policy: &'p P) -> Self {
        DfsSearch { max_depth, policy }
    }

    /// Explores below `root` and returns the minimum total distance seen
    pub fn run<S>(&self, root: DfsNode<S>, deadline: &Deadline) -> SearchOutcome
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
        let mut stack = vec![root];

        while let Some(current) = stack.pop() {
            outcome.expanded += 1;
            let total = current.total_distance();
            if total < outcome.bound {
                outcome.bound = total;
            }
            if total == current.depth as i32 {
                outcome.reached_target = true;
            }

            if deadline.expired() {
                outcome.cut_short = true;
                break;
            }

            if current.depth < self.max_depth {
                for m in current.state.agent_legal_moves() {
                    let child = branch(&current.state, m, self.policy);
                    stack.push(DfsNode::new(child, current.depth + 1));
                }
            }
        }

        outcome
    }
}

/// Picks the first move whose subtree has the smallest DFS bound
pub struct DfsStrategy<P> {
    config: DfsConfig,
    parallel: bool,
    policy: P,
}

impl<P> DfsStrategy<P> {
    pub fn new(config: DfsConfig, parallel: bool, policy: P) -> Self {
        DfsStrategy { config, parallel, policy }
    }

    /// Appends the decision to the recording dataset, if one is configured
    fn record<S: Simulation>(&self, state: &S, chosen: Move) {
        if self.config.record_path.is_empty() {
            return;
        }
        let sample = HistoricalSample { features: Features::from_state(state), label: chosen };
        if let Err(e) = append_record(&self.config.record_path, &sample) {
            warn!("Failed to record DFS decision to {}: {}", self.config.record_path, e);
        }
    }
}

impl<S, P> Strategy<S> for DfsStrategy<P>
where
    S: Simulation,
    P: AdversaryPolicy<S>,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Dfs
    }

    fn designated_adversary(&self) -> AdversaryId {
        self.config.designated_adversary
    }

    fn decide(&mut self, state: &S, deadline: &Deadline) -> Result<Decision, DecisionError> {
        let search = DfsSearch::new(self.config.max_depth, &self.policy);
        let scores = score_first_moves(state, &self.policy, self.parallel, |child| {
            let outcome = search.run(DfsNode::new(child, 0), deadline);
            debug!(
                "DFS root expanded {} nodes, bound {}{}",
                outcome.expanded,
                outcome.bound,
                if outcome.cut_short { " (deadline)" } else { "" }
            );
            outcome.bound
        });

        let (chosen, bound) = lowest(&scores).ok_or(DecisionError::NoLegalMoves)?;

        // Diagnostic record: agent, adversaries 0-3, bound, tick, score, move
        info!(
            target: DIAGNOSTIC_TARGET,
            "{},{},{},{},{},{},{},{},{}",
            state.agent_position(),
            state.adversary_position(AdversaryId(0)),
            state.adversary_position(AdversaryId(1)),
            state.adversary_position(AdversaryId(2)),
            state.adversary_position(AdversaryId(3)),
            bound,
            state.current_tick(),
            state.score(),
            chosen
        );
        self.record(state, chosen);

        Ok(Decision::new(chosen, Some(bound)))
    }
}
