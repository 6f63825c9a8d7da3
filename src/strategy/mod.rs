// Interchangeable decision strategies
//
// Each strategy is invoked once per tick with the current state and a deadline
// and returns one move. Strategies never interact with each other.

pub mod astar;
pub mod dfs;
pub mod evolution;
pub mod knn;
pub mod rollout;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::DecisionError;
use crate::simulation::{branch, AdversaryPolicy, Simulation};
use crate::types::{AdversaryId, Move};

pub use astar::{AStarNode, AStarSearch, AStarStrategy};
pub use dfs::{DfsNode, DfsSearch, DfsStrategy};
pub use evolution::{EvolutionStrategy, Individual, Population};
pub use knn::KnnStrategy;
pub use rollout::RolloutStrategy;

/// Decision deadline. Only checked by the search loops when enforced.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    due: Option<Instant>,
    enforced: bool,
}

impl Deadline {
    /// A deadline that never expires
    pub fn unbounded() -> Self {
        Deadline { due: None, enforced: false }
    }

    pub fn at(due: Instant, enforced: bool) -> Self {
        Deadline { due: Some(due), enforced }
    }

    pub fn after(budget: Duration, enforced: bool) -> Self {
        Self::at(Instant::now() + budget, enforced)
    }

    pub fn due(&self) -> Option<Instant> {
        self.due
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    /// True once an enforced deadline has passed
    pub fn expired(&self) -> bool {
        match self.due {
            Some(due) if self.enforced => Instant::now() >= due,
            _ => false,
        }
    }
}

/// Result of one bounded search from a single root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Best bound seen over every visited node
    pub bound: i32,
    /// Nodes taken off the stack or open set
    pub expanded: usize,
    /// Some visited node had the agent on an adversary
    pub reached_target: bool,
    /// The search stopped on an enforced deadline
    pub cut_short: bool,
}

/// Outcome of one strategy invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub chosen: Move,
    /// Search bound behind the choice, when the strategy computes one
    pub bound: Option<i32>,
}

impl Decision {
    pub fn new(chosen: Move, bound: Option<i32>) -> Self {
        Decision { chosen, bound }
    }
}

/// A per-tick move chooser over some simulation type
pub trait Strategy<S: Simulation>: Send {
    fn kind(&self) -> StrategyKind;

    /// Adversary whose release timer gates the pacing fallback
    fn designated_adversary(&self) -> AdversaryId;

    /// Runs the strategy's search or model for the current tick
    fn decide(&mut self, state: &S, deadline: &Deadline) -> Result<Decision, DecisionError>;
}

/// Identifies a strategy in configuration and requests
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Dfs,
    Astar,
    Evolution,
    Knn,
    Rollout,
}

impl StrategyKind {
    pub fn all() -> [StrategyKind; 5] {
        [
            StrategyKind::Dfs,
            StrategyKind::Astar,
            StrategyKind::Evolution,
            StrategyKind::Knn,
            StrategyKind::Rollout,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Dfs => "dfs",
            StrategyKind::Astar => "astar",
            StrategyKind::Evolution => "evolution",
            StrategyKind::Knn => "knn",
            StrategyKind::Rollout => "rollout",
        }
    }

    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "dfs" => Ok(StrategyKind::Dfs),
            "astar" | "a*" => Ok(StrategyKind::Astar),
            "evolution" => Ok(StrategyKind::Evolution),
            "knn" => Ok(StrategyKind::Knn),
            "rollout" => Ok(StrategyKind::Rollout),
            _ => Err(format!("Unknown strategy: {}", s)),
        }
    }

    /// Instantiates the strategy from configuration
    pub fn build<S, P>(self, config: &Config, policy: P) -> Box<dyn Strategy<S>>
    where
        S: Simulation + 'static,
        P: AdversaryPolicy<S> + 'static,
    {
        let parallel = config.search.parallel_roots;
        match self {
            StrategyKind::Dfs => Box::new(DfsStrategy::new(config.dfs.clone(), parallel, policy)),
            StrategyKind::Astar => {
                Box::new(AStarStrategy::new(config.astar.clone(), parallel, policy))
            }
            StrategyKind::Evolution => {
                Box::new(EvolutionStrategy::new(config.evolution.clone(), policy))
            }
            StrategyKind::Knn => Box::new(KnnStrategy::new(config.knn.clone())),
            StrategyKind::Rollout => {
                Box::new(RolloutStrategy::new(config.rollout.clone(), parallel, policy))
            }
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores every legal first move. Each move gets its own one-tick branch of
/// `state`; the results come back in legal-move order whether or not the
/// evaluation ran on the rayon pool.
pub(crate) fn score_first_moves<S, P, F>(
    state: &S,
    policy: &P,
    parallel: bool,
    score: F,
) -> Vec<(Move, i32)>
where
    S: Simulation,
    P: AdversaryPolicy<S>,
    F: Fn(S) -> i32 + Sync + Send,
{
    let moves = state.agent_legal_moves();
    if parallel {
        moves
            .par_iter()
            .map(|&m| (m, score(branch(state, m, policy))))
            .collect()
    } else {
        moves
            .iter()
            .map(|&m| (m, score(branch(state, m, policy))))
            .collect()
    }
}

/// Lowest score wins; the earliest move keeps a tie
pub(crate) fn lowest(scores: &[(Move, i32)]) -> Option<(Move, i32)> {
    let mut best: Option<(Move, i32)> = None;
    for &(m, s) in scores {
        match best {
            Some((_, b)) if s >= b => {}
            _ => best = Some((m, s)),
        }
    }
    best
}
