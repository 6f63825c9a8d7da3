// Reference grid-maze engine implementing the `Simulation` contract
//
// Layouts are ASCII grids: '#' is a wall, '.' a floor cell holding a pill and
// '_' an empty floor cell. Walkable cells are numbered row-major, so the
// layout "....." is the line 0-1-2-3-4.
//
// Topology is immutable and shared between snapshots behind an `Arc`. Hint-aware
// distance tables are computed lazily and cached under a `parking_lot::RwLock`.

use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use crate::error::MazeError;
use crate::simulation::{Simulation, UNREACHABLE};
use crate::types::{AdversaryId, AdversaryMoves, Move, NodeIndex, ADVERSARY_COUNT};

/// Score awarded for each pill the agent eats
pub const PILL_SCORE: i32 = 10;

/// Immutable maze topology
#[derive(Debug)]
pub struct Maze {
    layout: Vec<String>,
    coords: Vec<(usize, usize)>,
    neighbors: Vec<[Option<NodeIndex>; 4]>,
    initial_pills: Vec<bool>,
    distances: RwLock<HashMap<(NodeIndex, Move), Arc<Vec<i32>>>>,
}

impl Maze {
    /// Parses an ASCII layout
    ///
    /// # Arguments
    /// * `rows` - Layout rows, all of the same width
    ///
    /// # Returns
    /// * `Result<Maze, MazeError>` - Parsed maze or the first layout problem found
    pub fn parse<R: AsRef<str>>(rows: &[R]) -> Result<Self, MazeError> {
        if rows.is_empty() {
            return Err(MazeError::EmptyLayout);
        }

        let width = rows[0].as_ref().chars().count();
        let height = rows.len();
        let mut grid: Vec<Option<NodeIndex>> = vec![None; width * height];
        let mut coords = Vec::new();
        let mut initial_pills = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            let found = row.chars().count();
            if found != width {
                return Err(MazeError::RaggedRow { row: y, found, expected: width });
            }
            for (x, c) in row.chars().enumerate() {
                match c {
                    '#' => {}
                    '.' | '_' => {
                        grid[y * width + x] = Some(coords.len());
                        coords.push((x, y));
                        initial_pills.push(c == '.');
                    }
                    other => {
                        return Err(MazeError::UnknownCell { row: y, column: x, found: other })
                    }
                }
            }
        }

        if coords.is_empty() {
            return Err(MazeError::EmptyLayout);
        }

        let neighbors = coords
            .iter()
            .map(|&(x, y)| {
                let mut adjacent = [None; 4];
                for mv in Move::directions() {
                    let (dx, dy) = mv.offset();
                    let nx = x as i64 + dx as i64;
                    let ny = y as i64 + dy as i64;
                    if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                        continue;
                    }
                    adjacent[mv.index()] = grid[ny as usize * width + nx as usize];
                }
                adjacent
            })
            .collect();

        Ok(Maze {
            layout: rows.iter().map(|r| r.as_ref().to_string()).collect(),
            coords,
            neighbors,
            initial_pills,
            distances: RwLock::new(HashMap::new()),
        })
    }

    pub fn layout(&self) -> &[String] {
        &self.layout
    }

    pub fn node_count(&self) -> usize {
        self.coords.len()
    }

    /// Node reached by taking `mv` from `node`, if that move is possible
    pub fn neighbor(&self, node: NodeIndex, mv: Move) -> Option<NodeIndex> {
        if mv == Move::Neutral {
            return None;
        }
        self.neighbors.get(node).and_then(|adjacent| adjacent[mv.index()])
    }

    /// Directional moves available from `node`, in enumeration order
    pub fn legal_moves(&self, node: NodeIndex) -> Vec<Move> {
        Move::directions()
            .iter()
            .copied()
            .filter(|&mv| self.neighbor(node, mv).is_some())
            .collect()
    }

    /// Moves an actor heading `hint` may take: no reversal unless it is the only way out
    fn forward_moves(&self, node: NodeIndex, hint: Move) -> Vec<Move> {
        let legal = self.legal_moves(node);
        if hint == Move::Neutral {
            return legal;
        }
        let forward: Vec<Move> =
            legal.iter().copied().filter(|&mv| mv != hint.opposite()).collect();
        if forward.is_empty() {
            legal
        } else {
            forward
        }
    }

    /// Shortest hop count from `from` to `to` for an actor that last moved `hint`
    pub fn distance(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> i32 {
        if from >= self.node_count() || to >= self.node_count() {
            return UNREACHABLE;
        }
        self.distances_from(from, hint)[to]
    }

    fn distances_from(&self, from: NodeIndex, hint: Move) -> Arc<Vec<i32>> {
        if let Some(table) = self.distances.read().get(&(from, hint)) {
            return table.clone();
        }
        let table = Arc::new(self.compute_distances(from, hint));
        self.distances.write().insert((from, hint), table.clone());
        table
    }

    /// Breadth-first search over (node, heading) so that the no-reversal rule
    /// applies at every step, not only the first
    fn compute_distances(&self, from: NodeIndex, hint: Move) -> Vec<i32> {
        let headings = Move::all().len();
        let mut seen = vec![false; self.node_count() * headings];
        let mut best = vec![UNREACHABLE; self.node_count()];
        let mut queue = VecDeque::new();

        seen[from * headings + hint.index()] = true;
        best[from] = 0;
        queue.push_back((from, hint, 0));

        while let Some((node, heading, dist)) = queue.pop_front() {
            for mv in self.forward_moves(node, heading) {
                let next = match self.neighbor(node, mv) {
                    Some(n) => n,
                    None => continue,
                };
                let key = next * headings + mv.index();
                if seen[key] {
                    continue;
                }
                seen[key] = true;
                if dist + 1 < best[next] {
                    best[next] = dist + 1;
                }
                queue.push_back((next, mv, dist + 1));
            }
        }

        debug!("Computed distance table from node {} heading {}", from, hint);
        best
    }

    /// First step of a shortest path from `from` to `to`. Ties keep the earliest move.
    pub fn next_move_towards(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> Move {
        if from == to || from >= self.node_count() {
            return Move::Neutral;
        }
        let candidates = self.forward_moves(from, hint);
        let mut best_move = match candidates.first() {
            Some(&mv) => mv,
            None => return Move::Neutral,
        };
        let mut best_dist = UNREACHABLE;
        for mv in candidates {
            if let Some(next) = self.neighbor(from, mv) {
                let d = self.distance(next, to, mv);
                if d < best_dist {
                    best_dist = d;
                    best_move = mv;
                }
            }
        }
        best_move
    }
}

/// Agent position and heading
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorSnapshot {
    pub position: NodeIndex,
    #[serde(default)]
    pub last_move: Move,
}

/// Adversary position, heading and release timer
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdversarySnapshot {
    pub position: NodeIndex,
    #[serde(default)]
    pub last_move: Move,
    #[serde(default)]
    pub release_timer: u32,
}

/// Serializable description of a full game state, used on the wire and in logs
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MazeSnapshot {
    pub layout: Vec<String>,
    pub agent: ActorSnapshot,
    pub adversaries: Vec<AdversarySnapshot>,
    #[serde(default)]
    pub tick: u32,
    #[serde(default)]
    pub score: i32,
    /// Nodes still holding a pill. `None` means every pill in the layout.
    #[serde(default)]
    pub pills: Option<Vec<NodeIndex>>,
}

/// One game state over a shared maze
#[derive(Debug, Clone)]
pub struct MazeState {
    maze: Arc<Maze>,
    agent: ActorSnapshot,
    adversaries: [AdversarySnapshot; ADVERSARY_COUNT],
    pills: Vec<u64>,
    tick: u32,
    score: i32,
    captured: bool,
}

impl PartialEq for MazeState {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.maze, &other.maze)
            && self.agent == other.agent
            && self.adversaries == other.adversaries
            && self.pills == other.pills
            && self.tick == other.tick
            && self.score == other.score
            && self.captured == other.captured
    }
}

impl MazeState {
    /// Creates a state with every adversary released and every pill in place
    pub fn new(
        maze: Arc<Maze>,
        agent: NodeIndex,
        adversaries: [NodeIndex; ADVERSARY_COUNT],
    ) -> Result<Self, MazeError> {
        let count = maze.node_count();
        for &node in std::iter::once(&agent).chain(adversaries.iter()) {
            if node >= count {
                return Err(MazeError::UnknownNode { node, count });
            }
        }

        let mut pills = vec![0u64; (count + 63) / 64];
        for (node, _) in maze.initial_pills.iter().enumerate().filter(|(_, &p)| p) {
            pills[node / 64] |= 1 << (node % 64);
        }

        let mut state = MazeState {
            maze,
            agent: ActorSnapshot { position: agent, last_move: Move::Neutral },
            adversaries: adversaries.map(|position| AdversarySnapshot {
                position,
                last_move: Move::Neutral,
                release_timer: 0,
            }),
            pills,
            tick: 0,
            score: 0,
            captured: false,
        };
        state.captured = state.check_capture();
        Ok(state)
    }

    pub fn with_release_timers(mut self, timers: [u32; ADVERSARY_COUNT]) -> Self {
        for (adversary, timer) in self.adversaries.iter_mut().zip(timers.iter()) {
            adversary.release_timer = *timer;
        }
        self.captured = self.check_capture();
        self
    }

    pub fn with_agent_last_move(mut self, mv: Move) -> Self {
        self.agent.last_move = mv;
        self
    }

    pub fn with_tick(mut self, tick: u32) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = score;
        self
    }

    /// Builds a state from its serialized form
    pub fn from_snapshot(snapshot: &MazeSnapshot) -> Result<Self, MazeError> {
        let maze = Arc::new(Maze::parse(&snapshot.layout[..])?);
        if snapshot.adversaries.len() != ADVERSARY_COUNT {
            return Err(MazeError::AdversaryCount {
                expected: ADVERSARY_COUNT,
                found: snapshot.adversaries.len(),
            });
        }

        let mut positions = [0; ADVERSARY_COUNT];
        for (slot, adversary) in positions.iter_mut().zip(snapshot.adversaries.iter()) {
            *slot = adversary.position;
        }

        let mut state = MazeState::new(maze, snapshot.agent.position, positions)?
            .with_agent_last_move(snapshot.agent.last_move)
            .with_tick(snapshot.tick)
            .with_score(snapshot.score);
        for (slot, adversary) in state.adversaries.iter_mut().zip(snapshot.adversaries.iter()) {
            *slot = *adversary;
        }

        if let Some(remaining) = &snapshot.pills {
            let count = state.maze.node_count();
            state.pills.iter_mut().for_each(|word| *word = 0);
            for &node in remaining {
                if node >= count {
                    return Err(MazeError::UnknownNode { node, count });
                }
                state.pills[node / 64] |= 1 << (node % 64);
            }
        }

        state.captured = state.check_capture();
        Ok(state)
    }

    /// Serializable copy of this state
    pub fn snapshot(&self) -> MazeSnapshot {
        MazeSnapshot {
            layout: self.maze.layout().to_vec(),
            agent: self.agent,
            adversaries: self.adversaries.to_vec(),
            tick: self.tick,
            score: self.score,
            pills: Some((0..self.maze.node_count()).filter(|&n| self.has_pill(n)).collect()),
        }
    }

    pub fn maze(&self) -> &Arc<Maze> {
        &self.maze
    }

    pub fn pills_remaining(&self) -> usize {
        self.pills.iter().map(|word| word.count_ones() as usize).sum()
    }

    fn has_pill(&self, node: NodeIndex) -> bool {
        self.pills[node / 64] & (1 << (node % 64)) != 0
    }

    fn move_agent(&mut self, mv: Move) {
        if let Some(next) = self.maze.neighbor(self.agent.position, mv) {
            self.agent.position = next;
            self.agent.last_move = mv;
        } else if let Some(next) = self.maze.neighbor(self.agent.position, self.agent.last_move) {
            // Blocked or neutral input keeps the current heading, like the arcade engine
            self.agent.position = next;
        }

        let node = self.agent.position;
        if self.has_pill(node) {
            self.pills[node / 64] &= !(1 << (node % 64));
            self.score += PILL_SCORE;
        }
    }

    fn move_adversary(&mut self, id: AdversaryId, mv: Move) {
        let adversary = &mut self.adversaries[id.0];
        if adversary.release_timer > 0 {
            adversary.release_timer -= 1;
            return;
        }
        if mv == Move::Neutral {
            adversary.last_move = Move::Neutral;
        } else if let Some(next) = self.maze.neighbor(adversary.position, mv) {
            adversary.position = next;
            adversary.last_move = mv;
        }
    }

    /// Index of a released adversary on the agent's node, or of one that swapped
    /// nodes with the agent during the last tick
    fn capturing_adversary(
        &self,
        before: Option<(NodeIndex, &[AdversarySnapshot; ADVERSARY_COUNT])>,
    ) -> Option<usize> {
        self.adversaries.iter().enumerate().position(|(i, adversary)| {
            if adversary.release_timer > 0 {
                return false;
            }
            if adversary.position == self.agent.position {
                return true;
            }
            match before {
                Some((agent_before, adversaries_before)) => {
                    adversaries_before[i].position == self.agent.position
                        && adversary.position == agent_before
                }
                None => false,
            }
        })
    }

    fn check_capture(&self) -> bool {
        self.capturing_adversary(None).is_some()
    }
}

impl Simulation for MazeState {
    fn legal_moves(&self, position: NodeIndex) -> Vec<Move> {
        self.maze.legal_moves(position)
    }

    fn agent_position(&self) -> NodeIndex {
        self.agent.position
    }

    fn agent_last_move(&self) -> Move {
        self.agent.last_move
    }

    fn adversary_position(&self, id: AdversaryId) -> NodeIndex {
        self.adversaries[id.0].position
    }

    fn adversary_last_move(&self, id: AdversaryId) -> Move {
        self.adversaries[id.0].last_move
    }

    fn release_timer(&self, id: AdversaryId) -> u32 {
        self.adversaries[id.0].release_timer
    }

    fn shortest_path_distance(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> i32 {
        self.maze.distance(from, to, hint)
    }

    fn next_move_towards(&self, from: NodeIndex, to: NodeIndex, hint: Move) -> Move {
        self.maze.next_move_towards(from, to, hint)
    }

    fn advance(&mut self, agent_move: Move, adversary_moves: &AdversaryMoves) {
        if self.captured {
            return;
        }
        let agent_before = self.agent.position;
        let adversaries_before = self.adversaries;

        self.move_agent(agent_move);
        for id in AdversaryId::all() {
            self.move_adversary(id, adversary_moves[id.0]);
        }
        self.tick += 1;

        // A swap leaves the agent on the capturing adversary's node
        if let Some(i) = self.capturing_adversary(Some((agent_before, &adversaries_before))) {
            self.agent.position = self.adversaries[i].position;
            self.captured = true;
        }
    }

    fn current_tick(&self) -> u32 {
        self.tick
    }

    fn score(&self) -> i32 {
        self.score
    }

    fn game_over(&self) -> bool {
        self.captured
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{branch, DirectChase, HoldPosition};

    fn line() -> Arc<Maze> {
        Arc::new(Maze::parse(&["....."]).unwrap())
    }

    #[test]
    fn test_line_topology() {
        let maze = line();
        assert_eq!(maze.node_count(), 5);
        assert_eq!(maze.legal_moves(0), vec![Move::Right]);
        assert_eq!(maze.legal_moves(2), vec![Move::Right, Move::Left]);
        assert_eq!(maze.neighbor(4, Move::Right), None);
        assert_eq!(maze.distance(4, 1, Move::Neutral), 3);
        assert_eq!(maze.distance(1, 4, Move::Neutral), 3);
    }

    #[test]
    fn test_distance_hint_forbids_reversal() {
        let maze = line();
        // Heading right from node 2 towards node 1: must run to the end and come back
        assert_eq!(maze.distance(2, 1, Move::Right), 5);
        assert_eq!(maze.distance(2, 1, Move::Left), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Maze::parse::<&str>(&[]).unwrap_err(), MazeError::EmptyLayout);
        assert_eq!(Maze::parse(&["###"]).unwrap_err(), MazeError::EmptyLayout);
        assert!(matches!(
            Maze::parse(&["...", ".."]).unwrap_err(),
            MazeError::RaggedRow { row: 1, .. }
        ));
        assert!(matches!(
            Maze::parse(&[".x."]).unwrap_err(),
            MazeError::UnknownCell { found: 'x', .. }
        ));
    }

    #[test]
    fn test_advance_eats_pills_and_ticks() {
        let state = MazeState::new(line(), 1, [4, 4, 4, 4]).unwrap();
        let pills = state.pills_remaining();
        let next = branch(&state, Move::Right, &HoldPosition);
        assert_eq!(next.agent_position(), 2);
        assert_eq!(next.score(), PILL_SCORE);
        assert_eq!(next.pills_remaining(), pills - 1);
        assert_eq!(next.current_tick(), 1);
        // The source snapshot is untouched
        assert_eq!(state.agent_position(), 1);
        assert_eq!(state.current_tick(), 0);
    }

    #[test]
    fn test_advance_is_deterministic() {
        let state = MazeState::new(line(), 1, [4, 0, 4, 0]).unwrap();
        let a = branch(&state, Move::Right, &DirectChase);
        let b = branch(&state, Move::Right, &DirectChase);
        assert_eq!(a, b);
    }

    #[test]
    fn test_capture_on_swap() {
        let state = MazeState::new(line(), 1, [2, 4, 4, 4]).unwrap();
        let mut next = state.clone();
        next.advance(Move::Right, &[Move::Left, Move::Neutral, Move::Neutral, Move::Neutral]);
        assert!(next.game_over());
        assert_eq!(next.agent_position(), 1);
        assert_eq!(next.nearest_adversary_distance(), 0);
        // Captured states are frozen
        let frozen = next.clone();
        next.advance(Move::Left, &[Move::Neutral; ADVERSARY_COUNT]);
        assert_eq!(next, frozen);
    }

    #[test]
    fn test_lair_adversary_waits_and_does_not_capture() {
        let state = MazeState::new(line(), 1, [1, 4, 4, 4])
            .unwrap()
            .with_release_timers([2, 0, 0, 0]);
        assert!(!state.game_over());
        let next = branch(&state, Move::Neutral, &HoldPosition);
        assert_eq!(next.release_timer(AdversaryId(0)), 1);
    }

    #[test]
    fn test_snapshot_round_trip_preserves_state() {
        let state = MazeState::new(line(), 1, [4, 4, 3, 4]).unwrap();
        let moved = branch(&state, Move::Right, &HoldPosition);
        let restored = MazeState::from_snapshot(&moved.snapshot()).unwrap();
        assert_eq!(restored.snapshot(), moved.snapshot());
        assert_eq!(restored.pills_remaining(), moved.pills_remaining());
    }

    #[test]
    fn test_snapshot_rejects_bad_adversary_count() {
        let mut snapshot = MazeState::new(line(), 1, [4, 4, 4, 4]).unwrap().snapshot();
        snapshot.adversaries.pop();
        assert_eq!(
            MazeState::from_snapshot(&snapshot).unwrap_err(),
            MazeError::AdversaryCount { expected: 4, found: 3 }
        );
    }

    #[test]
    fn test_nearest_adversary_ties_keep_first() {
        let state = MazeState::new(line(), 2, [4, 0, 4, 0]).unwrap();
        assert_eq!(state.nearest_adversary(), (AdversaryId(0), 2));
    }

    #[test]
    fn test_next_move_towards() {
        let maze = line();
        assert_eq!(maze.next_move_towards(1, 4, Move::Neutral), Move::Right);
        assert_eq!(maze.next_move_towards(3, 0, Move::Neutral), Move::Left);
        assert_eq!(maze.next_move_towards(2, 2, Move::Neutral), Move::Neutral);
    }
}
