// Search properties on the five-node line 0-1-2-3-4
//
// Agent at node 1, every adversary fixed at node 4, so the true distance is 3.

use std::sync::Arc;

use capture_seeker::config::{AStarConfig, DfsConfig};
use capture_seeker::maze::{Maze, MazeState};
use capture_seeker::pacing::pace;
use capture_seeker::simulation::{branch, DirectChase, HoldPosition, Simulation};
use capture_seeker::strategy::{
    AStarNode, AStarSearch, AStarStrategy, Deadline, DfsNode, DfsSearch, DfsStrategy, Population,
    Strategy,
};
use capture_seeker::types::{AdversaryId, Move};

fn line_state() -> MazeState {
    let maze = Arc::new(Maze::parse(&["....."]).expect("line layout"));
    MazeState::new(maze, 1, [4, 4, 4, 4]).expect("line state")
}

#[test]
fn test_line_true_distance_is_three() {
    let state = line_state();
    assert_eq!(state.agent_legal_moves(), vec![Move::Right, Move::Left]);
    assert_eq!(state.nearest_adversary(), (AdversaryId(0), 3));
}

#[test]
fn test_dfs_depth_zero_equals_one_ply_distance() {
    let state = line_state();
    let search = DfsSearch::new(0, &HoldPosition);
    for m in state.agent_legal_moves() {
        let child = branch(&state, m, &HoldPosition);
        let expected = child.nearest_adversary_distance();
        let outcome = search.run(DfsNode::new(child, 0), &Deadline::unbounded());
        assert_eq!(outcome.bound, expected, "depth 0 after {}", m);
        assert_eq!(outcome.expanded, 1);
    }
}

#[test]
fn test_dfs_depth_two_is_a_lower_bound() {
    let state = line_state();
    let search = DfsSearch::new(2, &HoldPosition);
    let outcome = search.run(DfsNode::new(state, 0), &Deadline::unbounded());
    assert!(outcome.bound >= 0);
    assert!(outcome.bound <= 3, "bound {} exceeds true distance", outcome.bound);
}

#[test]
fn test_dfs_bound_never_increases_with_depth() {
    let state = line_state();
    let mut previous = i32::MAX;
    for depth in 0..6 {
        let outcome = DfsSearch::new(depth, &HoldPosition)
            .run(DfsNode::new(state.clone(), 0), &Deadline::unbounded());
        assert!(outcome.bound <= previous, "depth {} raised the bound", depth);
        previous = outcome.bound;
    }
}

#[test]
fn test_astar_reports_true_distance_and_terminates() {
    let state = line_state();
    for g_cap in [4, 10, 100] {
        let search = AStarSearch::new(g_cap, AdversaryId(0), &HoldPosition);
        let h = state.adversary_distance(AdversaryId(0));
        let outcome = search.run(AStarNode::new(state.clone(), 0, h), &Deadline::unbounded());
        assert_eq!(outcome.bound, 3, "g_cap {}", g_cap);
        assert!(outcome.reached_target);
        assert!(outcome.expanded <= state.maze().node_count());
    }
}

#[test]
fn test_strategies_agree_on_direction() {
    let state = line_state();
    let mut dfs = DfsStrategy::new(
        DfsConfig {
            max_depth: 2,
            designated_adversary: AdversaryId(3),
            record_path: String::new(),
        },
        false,
        HoldPosition,
    );
    let mut astar = AStarStrategy::new(
        AStarConfig { g_cap: 100, designated_adversary: AdversaryId(0) },
        false,
        HoldPosition,
    );
    assert_eq!(dfs.decide(&state, &Deadline::unbounded()).unwrap().chosen, Move::Right);
    assert_eq!(astar.decide(&state, &Deadline::unbounded()).unwrap().chosen, Move::Right);
}

#[test]
fn test_parallel_roots_match_sequential() {
    let state = line_state();
    let config = DfsConfig {
        max_depth: 6,
        designated_adversary: AdversaryId(3),
        record_path: String::new(),
    };
    let sequential = DfsStrategy::new(config.clone(), false, DirectChase)
        .decide(&state, &Deadline::unbounded())
        .unwrap();
    let parallel = DfsStrategy::new(config, true, DirectChase)
        .decide(&state, &Deadline::unbounded())
        .unwrap();
    assert_eq!(sequential, parallel);
}

#[test]
fn test_advance_is_deterministic() {
    let state = line_state().with_release_timers([0, 2, 0, 5]);
    let mut a = state.clone();
    let mut b = state.clone();
    for m in [Move::Right, Move::Right, Move::Left, Move::Neutral] {
        a = branch(&a, m, &DirectChase);
        b = branch(&b, m, &DirectChase);
        assert_eq!(a, b);
    }
    // The source snapshot is never touched by branching
    assert_eq!(state.agent_position(), 1);
    assert_eq!(state.current_tick(), 0);
}

#[test]
fn test_population_size_invariant_on_line() {
    let maze = Arc::new(Maze::parse(&["............"]).unwrap());
    let state = MazeState::new(maze, 1, [11, 11, 11, 11]).unwrap();
    let mut population = Population::seed(&state, 3, &DirectChase);
    let initial = population.len();
    assert_eq!(initial, population.target_size());
    for _ in 0..30 {
        population.step(&DirectChase);
        assert_eq!(population.len(), initial);
    }
}

#[test]
fn test_pacing_sequence_first_ticks() {
    let mut last = Move::Neutral;
    let mut seen = Vec::new();
    for tick in 0..=25 {
        last = pace(tick, last);
        seen.push(last);
    }
    assert!(seen[..5].iter().all(|&m| m == Move::Left));
    assert_eq!(seen[5], Move::Right);
    assert!(seen[6..20].iter().all(|&m| m == Move::Right));
    assert_eq!(seen[20], Move::Left);
    assert!(seen[21..].iter().all(|&m| m == Move::Left));
}
