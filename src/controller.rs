// Per-tick orchestration around a single strategy
//
// Order of checks: no legal move -> NEUTRAL; designated adversary still in its
// lair -> pacing; otherwise the strategy. Strategy errors and illegal answers
// degrade to the pacing move so the caller always gets a legal move.

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::error::DecisionError;
use crate::pacing::pace;
use crate::simulation::Simulation;
use crate::strategy::{Deadline, Strategy, StrategyKind};
use crate::types::Move;

/// Where a controller's move came from
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecisionSource {
    /// Designated adversary not released yet
    Paced,
    /// Strategy answer
    Searched,
    /// Strategy failed or had nothing to offer
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerDecision {
    pub chosen: Move,
    pub source: DecisionSource,
    pub bound: Option<i32>,
}

pub struct Controller<S: Simulation> {
    strategy: Box<dyn Strategy<S>>,
}

impl<S: Simulation> Controller<S> {
    pub fn new(strategy: Box<dyn Strategy<S>>) -> Self {
        Controller { strategy }
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// Chooses the move for the current tick
    ///
    /// # Arguments
    /// * `state` - Current game state, left untouched
    /// * `deadline` - Passed through to the strategy
    ///
    /// # Returns
    /// * `ControllerDecision` - Always a legal move, or NEUTRAL when none exists
    pub fn decide(&mut self, state: &S, deadline: &Deadline) -> ControllerDecision {
        let legal = state.agent_legal_moves();
        if legal.is_empty() {
            warn!("No legal moves at tick {}, answering NEUTRAL", state.current_tick());
            return ControllerDecision {
                chosen: Move::Neutral,
                source: DecisionSource::Fallback,
                bound: None,
            };
        }

        let gate = self.strategy.designated_adversary();
        if state.release_timer(gate) > 0 {
            return ControllerDecision {
                chosen: fallback_move(state),
                source: DecisionSource::Paced,
                bound: None,
            };
        }

        let result = self
            .strategy
            .decide(state, deadline)
            .and_then(|decision| ensure_legal(decision.chosen, &legal).map(|_| decision));

        match result {
            Ok(decision) => ControllerDecision {
                chosen: decision.chosen,
                source: DecisionSource::Searched,
                bound: decision.bound,
            },
            Err(e) => {
                if e.is_recoverable() {
                    warn!("{} strategy failed, pacing instead: {}", self.strategy.kind(), e);
                } else {
                    error!("{} strategy rejected: {}", self.strategy.kind(), e);
                }
                ControllerDecision {
                    chosen: fallback_move(state),
                    source: DecisionSource::Fallback,
                    bound: None,
                }
            }
        }
    }

    /// Convenience wrapper returning only the move
    pub fn get_move(&mut self, state: &S, deadline: &Deadline) -> Move {
        self.decide(state, deadline).chosen
    }
}

/// Rejects a move that is not in the legal set
pub fn ensure_legal(chosen: Move, legal: &[Move]) -> Result<Move, DecisionError> {
    if legal.contains(&chosen) {
        Ok(chosen)
    } else {
        Err(DecisionError::IllegalMoveRequested { chosen, legal: legal.to_vec() })
    }
}

/// The pacing move, or the first legal move when pacing would walk into a wall
pub fn fallback_move<S: Simulation>(state: &S) -> Move {
    let legal = state.agent_legal_moves();
    let paced = pace(state.current_tick(), state.agent_last_move());
    if legal.contains(&paced) {
        paced
    } else {
        legal.first().copied().unwrap_or(Move::Neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::{Maze, MazeState};
    use crate::strategy::Decision;
    use crate::types::AdversaryId;
    use std::sync::Arc;

    /// Always answers a fixed move
    struct Fixed(Move);

    impl<S: Simulation> Strategy<S> for Fixed {
        fn kind(&self) -> StrategyKind {
            StrategyKind::Dfs
        }

        fn designated_adversary(&self) -> AdversaryId {
            AdversaryId(3)
        }

        fn decide(&mut self, _state: &S, _deadline: &Deadline) -> Result<Decision, DecisionError> {
            Ok(Decision::new(self.0, Some(1)))
        }
    }

    fn line_state(agent: usize) -> MazeState {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        MazeState::new(maze, agent, [4, 4, 4, 4]).unwrap()
    }

    #[test]
    fn test_searched_move_passes_through() {
        let mut controller: Controller<MazeState> = Controller::new(Box::new(Fixed(Move::Right)));
        let decision = controller.decide(&line_state(2), &Deadline::unbounded());
        assert_eq!(decision.chosen, Move::Right);
        assert_eq!(decision.source, DecisionSource::Searched);
        assert_eq!(decision.bound, Some(1));
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let mut controller: Controller<MazeState> = Controller::new(Box::new(Fixed(Move::Up)));
        let decision = controller.decide(&line_state(2).with_tick(2), &Deadline::unbounded());
        assert_eq!(decision.source, DecisionSource::Fallback);
        assert_eq!(decision.chosen, Move::Left);
    }

    #[test]
    fn test_pacing_gate_on_designated_adversary() {
        let mut controller: Controller<MazeState> = Controller::new(Box::new(Fixed(Move::Right)));
        let state = line_state(2).with_release_timers([0, 0, 0, 7]);
        let decision = controller.decide(&state, &Deadline::unbounded());
        assert_eq!(decision.source, DecisionSource::Paced);
        assert_eq!(decision.chosen, Move::Left);

        // Other adversaries' timers do not gate
        let state = line_state(2).with_release_timers([7, 7, 7, 0]);
        assert_eq!(
            controller.decide(&state, &Deadline::unbounded()).source,
            DecisionSource::Searched
        );
    }

    #[test]
    fn test_fallback_avoids_walls() {
        // Pacing wants LEFT at tick 0, but node 0 only opens to the right
        assert_eq!(fallback_move(&line_state(0)), Move::Right);
        assert_eq!(fallback_move(&line_state(3)), Move::Left);
    }

    #[test]
    fn test_ensure_legal() {
        assert!(matches!(ensure_legal(Move::Left, &[Move::Right, Move::Left]), Ok(Move::Left)));
        assert!(matches!(
            ensure_legal(Move::Up, &[Move::Right]),
            Err(DecisionError::IllegalMoveRequested { chosen: Move::Up, .. })
        ));
    }

    #[test]
    fn test_no_legal_moves_answers_neutral() {
        let maze = Arc::new(Maze::parse(&["."]).unwrap());
        let state = MazeState::new(maze, 0, [0, 0, 0, 0]).unwrap();
        let mut controller: Controller<MazeState> = Controller::new(Box::new(Fixed(Move::Up)));
        assert_eq!(controller.get_move(&state, &Deadline::unbounded()), Move::Neutral);
    }
}
