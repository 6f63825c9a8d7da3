// Steady-state evolutionary search over simulated rollouts
//
// The population is seeded with every rollout of a fixed number of plies and
// kept sorted ascending by fitness (remaining distance + moves spent). Each
// generation replaces the fittest individual with its children and culls the
// worst members back to the seeded size. A parent without children leaves its
// slot empty.

use log::debug;

use super::{Deadline, Decision, Strategy, StrategyKind};
use crate::config::EvolutionConfig;
use crate::error::DecisionError;
use crate::simulation::{branch, AdversaryPolicy, Simulation};
use crate::types::{AdversaryId, Move};

/// One lineage: a simulated state plus the first move that started it
#[derive(Debug, Clone)]
pub struct Individual<S> {
    state: S,
    first_move: Move,
    distance: i32,
    moves: u32,
    fitness: i32,
}

impl<S: Simulation> Individual<S> {
    pub fn new(state: S, first_move: Move, moves: u32) -> Self {
        let distance = state.nearest_adversary_distance();
        let fitness = distance.saturating_add(moves as i32);
        Individual { state, first_move, distance, moves, fitness }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn first_move(&self) -> Move {
        self.first_move
    }

    /// Distance component of the fitness
    pub fn distance(&self) -> i32 {
        self.distance
    }

    /// Plies simulated from the decision root
    pub fn moves(&self) -> u32 {
        self.moves
    }

    pub fn fitness(&self) -> i32 {
        self.fitness
    }

    /// One child per legal move, each on its own copy of this state
    fn offspring<P>(&self, policy: &P) -> Vec<Individual<S>>
    where
        P: AdversaryPolicy<S>,
    {
        self.state
            .agent_legal_moves()
            .into_iter()
            .map(|m| {
                Individual::new(branch(&self.state, m, policy), self.first_move, self.moves + 1)
            })
            .collect()
    }
}

/// Fitness-sorted population of fixed size
#[derive(Debug, Clone)]
pub struct Population<S> {
    members: Vec<Individual<S>>,
    target_size: usize,
    generations: u32,
}

impl<S: Simulation> Population<S> {
    /// Enumerates every `plies`-ply rollout from `root`
    ///
    /// # Arguments
    /// * `root` - Current game state, never advanced itself
    /// * `plies` - Rollout length, at least one
    /// * `policy` - Adversary response used for every simulated tick
    pub fn seed<P>(root: &S, plies: u32, policy: &P) -> Self
    where
        P: AdversaryPolicy<S>,
    {
        let plies = plies.max(1);
        let mut frontier: Vec<Individual<S>> = root
            .agent_legal_moves()
            .into_iter()
            .map(|m| Individual::new(branch(root, m, policy), m, 1))
            .collect();

        for _ in 1..plies {
            frontier = frontier.iter().flat_map(|ind| ind.offspring(policy)).collect();
        }

        frontier.sort_by_key(|ind| ind.fitness);
        let target_size = frontier.len();
        Population { members: frontier, target_size, generations: 0 }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn target_size(&self) -> usize {
        self.target_size
    }

    pub fn generations(&self) -> u32 {
        self.generations
    }

    pub fn best(&self) -> Option<&Individual<S>> {
        self.members.first()
    }

    pub fn members(&self) -> &[Individual<S>] {
        &self.members
    }

    /// Runs one generation. Returns false when there was no parent to expand.
    pub fn step<P>(&mut self, policy: &P) -> bool
    where
        P: AdversaryPolicy<S>,
    {
        if self.members.is_empty() {
            return false;
        }
        let parent = self.members.remove(0);
        let children = parent.offspring(policy);

        // Members are sorted, so truncating drops the worst
        self.members.truncate(self.target_size.saturating_sub(children.len()));
        self.members.extend(children);
        self.members.sort_by_key(|ind| ind.fitness);
        self.members.truncate(self.target_size);

        self.generations += 1;
        true
    }

    /// Steps generations until the best lineage reaches an adversary, the
    /// generation cap is hit or an enforced deadline passes. Returns true when
    /// the deadline stopped it.
    pub fn evolve<P>(&mut self, policy: &P, max_generations: u32, deadline: &Deadline) -> bool
    where
        P: AdversaryPolicy<S>,
    {
        while let Some(best) = self.best() {
            if best.distance <= 0 || self.generations >= max_generations {
                return false;
            }
            if deadline.expired() {
                return true;
            }
            self.step(policy);
        }
        false
    }
}

/// Evolves rollouts until the fittest lineage reaches an adversary
pub struct EvolutionStrategy<P> {
    config: EvolutionConfig,
    policy: P,
}

impl<P> EvolutionStrategy<P> {
    pub fn new(config: EvolutionConfig, policy: P) -> Self {
        EvolutionStrategy { config, policy }
    }
}

impl<S, P> Strategy<S> for EvolutionStrategy<P>
where
    S: Simulation,
    P: AdversaryPolicy<S>,
{
    fn kind(&self) -> StrategyKind {
        StrategyKind::Evolution
    }

    fn designated_adversary(&self) -> AdversaryId {
        self.config.designated_adversary
    }

    fn decide(&mut self, state: &S, deadline: &Deadline) -> Result<Decision, DecisionError> {
        let mut population = Population::seed(state, self.config.rollout_plies, &self.policy);
        let cut_short = population.evolve(&self.policy, self.config.max_generations, deadline);

        let best = population.best().ok_or(DecisionError::NoLegalMoves)?;
        debug!(
            "Evolution stopped after {} generations{}: best fitness {} (distance {}, {} moves)",
            population.generations,
            if cut_short { " (deadline)" } else { "" },
            best.fitness,
            best.distance,
            best.moves
        );
        Ok(Decision::new(best.first_move, Some(best.fitness)))
    }
}
