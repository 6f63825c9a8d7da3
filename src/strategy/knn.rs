// k-nearest-neighbour move classifier over logged transitions
//
// Only samples labelled with a currently legal move take part. Neighbours are
// ranked by squared Euclidean distance over the eight dataset features; the
// most frequent label among the k nearest wins, ties going to the earlier move
// in enumeration order.

use log::{debug, warn};

use super::{Deadline, Decision, Strategy, StrategyKind};
use crate::config::KnnConfig;
use crate::dataset::{Dataset, Features};
use crate::error::DecisionError;
use crate::simulation::Simulation;
use crate::types::{AdversaryId, Move};

pub struct KnnStrategy {
    config: KnnConfig,
    model: Option<Dataset>,
}

impl KnnStrategy {
    pub fn new(config: KnnConfig) -> Self {
        KnnStrategy { config, model: None }
    }

    /// Uses an in-memory dataset for the lifetime of the strategy
    pub fn with_dataset(mut config: KnnConfig, dataset: Dataset) -> Self {
        config.reload_each_decision = false;
        KnnStrategy { config, model: Some(dataset) }
    }

    /// Cached model, or a fresh load when reloading per decision. A failed
    /// load leaves no model behind.
    fn ensure_model(&mut self) -> Result<&Dataset, DecisionError> {
        let dataset = match self.model.take() {
            Some(cached) if !self.config.reload_each_decision => cached,
            _ => Dataset::load(&self.config.dataset_path)?,
        };
        Ok(&*self.model.insert(dataset))
    }

    /// The k nearest (distance, label) pairs among samples of the legal moves
    pub fn nearest_neighbors(
        dataset: &Dataset,
        query: &Features,
        legal: &[Move],
        k: usize,
    ) -> Vec<(i64, Move)> {
        let mut scored: Vec<(i64, Move)> = legal
            .iter()
            .flat_map(|&m| dataset.group(m).iter().map(move |f| (query.squared_distance(f), m)))
            .collect();
        // Stable: equal distances keep legal-move order
        scored.sort_by_key(|&(d, _)| d);
        scored.truncate(k);
        scored
    }
}

/// Most frequent move; the earliest move in enumeration order wins a tie
pub fn most_frequent(labels: &[Move]) -> Option<Move> {
    let mut counts = [0usize; 5];
    for m in labels {
        counts[m.index()] += 1;
    }

    let mut best: Option<(Move, usize)> = None;
    for m in Move::all() {
        let count = counts[m.index()];
        if count == 0 {
            continue;
        }
        match best {
            Some((_, c)) if count <= c => {}
            _ => best = Some((m, count)),
        }
    }
    best.map(|(m, _)| m)
}

impl<S: Simulation> Strategy<S> for KnnStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Knn
    }

    fn designated_adversary(&self) -> AdversaryId {
        self.config.designated_adversary
    }

    fn decide(&mut self, state: &S, _deadline: &Deadline) -> Result<Decision, DecisionError> {
        let k = self.config.k;
        let legal = state.agent_legal_moves();
        if legal.is_empty() {
            return Err(DecisionError::NoLegalMoves);
        }

        let query = Features::from_state(state);
        let dataset = self.ensure_model()?;
        let neighbors = Self::nearest_neighbors(dataset, &query, &legal, k);

        if neighbors.is_empty() {
            return Err(DecisionError::InsufficientNeighbors { wanted: k, found: 0 });
        }
        if neighbors.len() < k {
            warn!(
                "Only {} of {} neighbours available, voting with all of them",
                neighbors.len(),
                k
            );
        }

        let labels: Vec<Move> = neighbors.iter().map(|&(_, m)| m).collect();
        let chosen = most_frequent(&labels).ok_or(DecisionError::InsufficientNeighbors {
            wanted: k,
            found: 0,
        })?;
        debug!("KNN votes {:?} -> {}", labels, chosen);

        Ok(Decision::new(chosen, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::HistoricalSample;
    use crate::maze::{Maze, MazeState};
    use std::sync::Arc;

    fn knn_config(k: usize) -> KnnConfig {
        KnnConfig {
            dataset_path: "no-such-dataset.txt".to_string(),
            k,
            reload_each_decision: false,
            designated_adversary: AdversaryId(3),
        }
    }

    #[test]
    fn test_most_frequent_tie_break() {
        let votes = [Move::Left, Move::Right, Move::Left, Move::Right, Move::Up];
        assert_eq!(most_frequent(&votes), Some(Move::Right));
        assert_eq!(most_frequent(&[Move::Down]), Some(Move::Down));
        assert_eq!(most_frequent(&[]), None);
    }

    #[test]
    fn test_only_legal_groups_take_part() {
        let mut dataset = Dataset::default();
        let here = Features::from_array([1, 4, 4, 4, 4, 3, 0, 0]);
        dataset.insert(HistoricalSample { features: here, label: Move::Up });
        dataset.insert(HistoricalSample { features: here, label: Move::Right });

        let legal = [Move::Right, Move::Left];
        let neighbors = KnnStrategy::nearest_neighbors(&dataset, &here, &legal, 10);
        assert_eq!(neighbors, vec![(0, Move::Right)]);
    }

    #[test]
    fn test_decide_on_line() {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        let state = MazeState::new(maze, 1, [4, 4, 4, 4]).unwrap();
        let here = Features::from_state(&state);

        let mut dataset = Dataset::default();
        for _ in 0..3 {
            dataset.insert(HistoricalSample { features: here, label: Move::Right });
        }
        dataset.insert(HistoricalSample { features: here, label: Move::Left });
        // Illegal on a line, must be ignored even though it is nearest
        for _ in 0..5 {
            dataset.insert(HistoricalSample { features: here, label: Move::Up });
        }

        let mut strategy = KnnStrategy::with_dataset(knn_config(10), dataset);
        let decision = strategy.decide(&state, &Deadline::unbounded()).unwrap();
        assert_eq!(decision.chosen, Move::Right);
        assert_eq!(decision.bound, None);
    }

    #[test]
    fn test_no_matching_samples_is_an_error() {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        let state = MazeState::new(maze, 1, [4, 4, 4, 4]).unwrap();
        let mut strategy = KnnStrategy::with_dataset(knn_config(10), Dataset::default());
        let err = strategy.decide(&state, &Deadline::unbounded()).unwrap_err();
        assert!(matches!(err, DecisionError::InsufficientNeighbors { wanted: 10, found: 0 }));
    }

    #[test]
    fn test_missing_dataset_surfaces() {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        let state = MazeState::new(maze, 1, [4, 4, 4, 4]).unwrap();
        let mut strategy = KnnStrategy::new(knn_config(10));
        let err = strategy.decide(&state, &Deadline::unbounded()).unwrap_err();
        assert!(matches!(err, DecisionError::Dataset(_)));
    }
}
