// Core game vocabulary shared by the engine contract and every strategy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a walkable node in the maze graph
pub type NodeIndex = usize;

/// Number of adversaries tracked by the engine and the dataset schema
pub const ADVERSARY_COUNT: usize = 4;

/// One move per adversary, indexed by `AdversaryId`
pub type AdversaryMoves = [Move; ADVERSARY_COUNT];

/// The move enumeration. Declaration order is the fixed enumeration order
/// used for every tie-break (UP, RIGHT, DOWN, LEFT, NEUTRAL).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "UPPERCASE")]
pub enum Move {
    Up,
    Right,
    Down,
    Left,
    Neutral,
}

impl Move {
    /// All moves in enumeration order
    pub fn all() -> [Move; 5] {
        [Move::Up, Move::Right, Move::Down, Move::Left, Move::Neutral]
    }

    /// The four directional moves in enumeration order
    pub fn directions() -> [Move; 4] {
        [Move::Up, Move::Right, Move::Down, Move::Left]
    }

    /// Position of this move in the enumeration
    pub fn index(self) -> usize {
        match self {
            Move::Up => 0,
            Move::Right => 1,
            Move::Down => 2,
            Move::Left => 3,
            Move::Neutral => 4,
        }
    }

    /// Label used on the wire and in dataset records
    pub fn as_str(&self) -> &'static str {
        match self {
            Move::Up => "UP",
            Move::Right => "RIGHT",
            Move::Down => "DOWN",
            Move::Left => "LEFT",
            Move::Neutral => "NEUTRAL",
        }
    }

    /// Parses an exact dataset label. Anything outside the enumeration is rejected.
    pub fn from_label(label: &str) -> Option<Move> {
        match label {
            "UP" => Some(Move::Up),
            "RIGHT" => Some(Move::Right),
            "DOWN" => Some(Move::Down),
            "LEFT" => Some(Move::Left),
            "NEUTRAL" => Some(Move::Neutral),
            _ => None,
        }
    }

    pub fn opposite(self) -> Move {
        match self {
            Move::Up => Move::Down,
            Move::Down => Move::Up,
            Move::Left => Move::Right,
            Move::Right => Move::Left,
            Move::Neutral => Move::Neutral,
        }
    }

    /// Grid offset (dx, dy) with y growing downwards, as in the ASCII layouts
    pub fn offset(self) -> (i32, i32) {
        match self {
            Move::Up => (0, -1),
            Move::Right => (1, 0),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
            Move::Neutral => (0, 0),
        }
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::Neutral
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one adversary. Enumeration order is the numeric order.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct AdversaryId(pub usize);

impl AdversaryId {
    /// All adversaries in enumeration order
    pub fn all() -> impl Iterator<Item = AdversaryId> {
        (0..ADVERSARY_COUNT).map(AdversaryId)
    }
}

impl fmt::Display for AdversaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adversary#{}", self.0)
    }
}
