// Greedy rollout: after each first move, walk the agent straight at whichever
// adversary is nearest and count the ticks until capture.

use log::debug;

use super::{lowest, score_first_moves, Deadline, Decision, Strategy, StrategyKind};
use crate::config::RolloutConfig;
use crate::error::DecisionError;
use crate::simulation::{branch, AdversaryPolicy, Simulation};
use crate::types::AdversaryId;

pub struct RolloutStrategy<P> {
    config: RolloutConfig,
    parallel: bool,
    policy: P,
}

impl<P> RolloutStrategy<P> {
    pub fn new(config: RolloutConfig, parallel: bool, policy: P) -> Self {
        RolloutStrategy { config, parallel, policy }
    }

    /// Ticks of greedy pursuit from `state` until the game ends or the cap is hit.
    /// A rollout stopped by the deadline also counts the distance still to go.
    pub fn rollout_length<S>(&self, mut state: S, deadline: &Deadline) -> i32
    where
        S: Simulation,
        P: AdversaryPolicy<S>,
    {
        let mut ticks = 0u32;
        while !state.game_over() && ticks < self.config.max_rollout_ticks {
            if deadline.expired() {
                return (ticks as i32).saturating_add(state.nearest_adversary_distance());
            }
            let (target, _) = state.nearest_adversary();
            let step = state.next_move_towards(
                state.agent_position(),
                state.adversary_position(target),
                state.agent_last_move(),
            );
            state = branch(&state, step, &self.policy);
            ticks += 1;
        }
        ticks as i32
    }
}

impl<S, P> Strategy<S> for RolloutStrategy<P>
where
    S: Simulation,
    P: AdversaryPolicy<S>,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rollout
    }

    fn designated_adversary(&self) -> AdversaryId {
        self.config.designated_adversary
    }

    fn decide(&mut self, state: &S, deadline: &Deadline) -> Result<Decision, DecisionError> {
        let this = &*self;
        let scores = score_first_moves(state, &this.policy, this.parallel, |child| {
            this.rollout_length(child, deadline)
        });
        debug!("Rollout lengths {:?}", scores);

        let (chosen, bound) = lowest(&scores).ok_or(DecisionError::NoLegalMoves)?;
        Ok(Decision::new(chosen, Some(bound)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::{Maze, MazeState};
    use crate::simulation::HoldPosition;
    use crate::types::Move;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(cap: u32) -> RolloutConfig {
        RolloutConfig { max_rollout_ticks: cap, designated_adversary: AdversaryId(0) }
    }

    fn line_state(agent: usize) -> MazeState {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        MazeState::new(maze, agent, [4, 4, 4, 4]).unwrap()
    }

    #[test]
    fn test_rollout_length_counts_ticks_to_capture() {
        let strategy = RolloutStrategy::new(config(500), false, HoldPosition);
        assert_eq!(strategy.rollout_length(line_state(2), &Deadline::unbounded()), 2);
        assert_eq!(strategy.rollout_length(line_state(4), &Deadline::unbounded()), 0);
    }

    #[test]
    fn test_rollout_respects_tick_cap() {
        let strategy = RolloutStrategy::new(config(1), false, HoldPosition);
        assert_eq!(strategy.rollout_length(line_state(0), &Deadline::unbounded()), 1);
    }

    #[test]
    fn test_expired_deadline_scores_remaining_distance() {
        let strategy = RolloutStrategy::new(config(500), false, HoldPosition);
        let expired = Deadline::after(Duration::ZERO, true);
        assert_eq!(strategy.rollout_length(line_state(2), &expired), 2);
        assert_eq!(strategy.rollout_length(line_state(4), &expired), 0);

        let mut strategy = RolloutStrategy::new(config(500), false, HoldPosition);
        let decision = strategy.decide(&line_state(1), &expired).unwrap();
        // Right leaves 2 to go, Left leaves 4
        assert_eq!(decision.chosen, Move::Right);
        assert_eq!(decision.bound, Some(2));
    }

    #[test]
    fn test_strategy_picks_shortest_rollout() {
        let mut strategy = RolloutStrategy::new(config(500), false, HoldPosition);
        let decision = strategy.decide(&line_state(1), &Deadline::unbounded()).unwrap();
        assert_eq!(decision.chosen, Move::Right);
        assert_eq!(decision.bound, Some(2));
    }
}
