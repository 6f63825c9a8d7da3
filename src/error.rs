// Error kinds surfaced by the dataset loader, the maze engine and the strategies.
//
// Search caps and deadlines are not errors: they end a search with its best bound.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{Move, NodeIndex};

/// Problems reading or parsing the flat KNN dataset
#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("dataset unavailable at {path:?}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: unknown move label '{label}'")]
    UnknownMoveLabel { line: usize, label: String },

    #[error("line {line}: malformed record ({reason})")]
    MalformedRecord { line: usize, reason: String },
}

/// Failures a strategy reports to the controller
#[derive(Error, Debug)]
pub enum DecisionError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("insufficient neighbours: wanted {wanted}, found {found}")]
    InsufficientNeighbors { wanted: usize, found: usize },

    #[error("illegal move {chosen} requested (legal: {legal:?})")]
    IllegalMoveRequested { chosen: Move, legal: Vec<Move> },

    #[error("no legal moves from the current position")]
    NoLegalMoves,
}

impl DecisionError {
    /// Whether the controller may answer with the pacing fallback
    pub fn is_recoverable(&self) -> bool {
        match self {
            DecisionError::Dataset(_) => true,
            DecisionError::InsufficientNeighbors { .. } => true,
            DecisionError::NoLegalMoves => true,
            DecisionError::IllegalMoveRequested { .. } => false,
        }
    }
}

/// Snapshot and layout validation errors for the reference maze engine
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MazeError {
    #[error("layout is empty")]
    EmptyLayout,

    #[error("layout row {row} has width {found}, expected {expected}")]
    RaggedRow { row: usize, found: usize, expected: usize },

    #[error("unexpected character '{found}' at row {row}, column {column}")]
    UnknownCell { row: usize, column: usize, found: char },

    #[error("node {node} does not exist (maze has {count} nodes)")]
    UnknownNode { node: NodeIndex, count: usize },

    #[error("expected {expected} adversaries, found {found}")]
    AdversaryCount { expected: usize, found: usize },
}
