// Engine contract consumed by the strategies
//
// The game engine owns topology, legal moves, adversary movement and scoring.
// Strategies only see it through the `Simulation` trait. `Clone` is the
// deterministic state copy: a clone shares no mutable storage with its source.

use crate::types::{AdversaryId, AdversaryMoves, Move, NodeIndex, ADVERSARY_COUNT};

/// Distance reported when the target cannot be reached
pub const UNREACHABLE: i32 = i32::MAX;

/// Deterministic, copyable game state
pub trait Simulation: Clone + Send + Sync {
    /// Legal moves from a position, in enumeration order
    fn legal_moves(&self, position: NodeIndex) -> Vec<Move>;

    fn agent_position(&self) -> NodeIndex;
    fn agent_last_move(&self) -> Move;

    fn adversary_position(&self, id: AdversaryId) -> NodeIndex;
    fn adversary_last_move(&self, id: AdversaryId) -> Move;

    /// Ticks until the adversary is released; positive means not yet a threat
    fn release_timer(&self, id: AdversaryId) -> u32;

    /// Shortest path hop count from `from` to `to` for an actor whose last move was `hint`
    fn shortest_path_distance(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> i32;

    /// Approximate next move along a shortest path from `from` to `to`
    fn next_move_towards(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> Move;

    /// Advances this snapshot by one tick in place
    fn advance(&mut self, agent_move: Move, adversary_moves: &AdversaryMoves);

    /// Tick counter within the current level
    fn current_tick(&self) -> u32;
    fn score(&self) -> i32;
    fn game_over(&self) -> bool;

    /// Legal moves from the agent's current position
    fn agent_legal_moves(&self) -> Vec<Move> {
        self.legal_moves(self.agent_position())
    }

    /// Path distance from an adversary to the agent, honouring the adversary's heading
    fn adversary_distance(&self, id: AdversaryId) -> i32 {
        self.shortest_path_distance(
            self.adversary_position(id),
            self.agent_position(),
            self.adversary_last_move(id),
        )
    }

    /// Nearest adversary and its distance. Ties keep the earliest identifier.
    fn nearest_adversary(&self) -> (AdversaryId, i32) {
        let mut nearest = AdversaryId(0);
        let mut dist = UNREACHABLE;
        for id in AdversaryId::all() {
            let d = self.adversary_distance(id);
            if d < dist {
                dist = d;
                nearest = id;
            }
        }
        (nearest, dist)
    }

    fn nearest_adversary_distance(&self) -> i32 {
        self.nearest_adversary().1
    }
}

/// Produces the adversaries' response to a state (the external adversary policy)
pub trait AdversaryPolicy<S: Simulation>: Send + Sync {
    fn respond(&self, state: &S) -> AdversaryMoves;
}

/// Adversaries never move. Useful for fixed-target scenarios.
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldPosition;

impl<S: Simulation> AdversaryPolicy<S> for HoldPosition {
    fn respond(&self, _state: &S) -> AdversaryMoves {
        [Move::Neutral; ADVERSARY_COUNT]
    }
}

/// Every released adversary steps along its approximate shortest path to the agent
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectChase;

impl<S: Simulation> AdversaryPolicy<S> for DirectChase {
    fn respond(&self, state: &S) -> AdversaryMoves {
        let mut moves = [Move::Neutral; ADVERSARY_COUNT];
        let target = state.agent_position();
        for id in AdversaryId::all() {
            if state.release_timer(id) > 0 {
                continue;
            }
            moves[id.0] = state.next_move_towards(
                state.adversary_position(id),
                target,
                state.adversary_last_move(id),
            );
        }
        moves
    }
}

/// Copies `state` and advances the copy one tick with `agent_move` and the
/// policy's response. Every search branch is created through here so that no
/// two branches ever share a mutable snapshot.
pub fn branch<S, P>(state: &S, agent_move: Move, policy: &P) -> S
where
    S: Simulation,
    P: AdversaryPolicy<S> + ?Sized,
{
    let mut next = state.clone();
    let responses = policy.respond(&next);
    next.advance(agent_move, &responses);
    next
}
