// Configuration module for reading Agent.toml
// Every tunable of the decision service and its strategies lives here

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::strategy::StrategyKind;
use crate::types::AdversaryId;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub timing: TimingConfig,
    pub search: SearchConfig,
    pub dfs: DfsConfig,
    pub astar: AStarConfig,
    pub evolution: EvolutionConfig,
    pub knn: KnnConfig,
    pub rollout: RolloutConfig,
    pub debug: DebugConfig,
}

/// Decision deadline handling
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    pub response_time_budget_ms: u64,
    pub network_overhead_ms: u64,
    /// When false the deadline is threaded through but never checked
    pub enforce_deadline: bool,
}

impl TimingConfig {
    /// Computes the effective computation budget
    pub fn effective_budget_ms(&self) -> u64 {
        self.response_time_budget_ms.saturating_sub(self.network_overhead_ms)
    }
}

/// Strategy selection and root evaluation
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    pub default_strategy: StrategyKind,
    /// Evaluate first moves on the rayon pool
    pub parallel_roots: bool,
}

/// Bounded depth-first exploration
#[derive(Debug, Deserialize, Clone)]
pub struct DfsConfig {
    pub max_depth: u32,
    pub designated_adversary: AdversaryId,
    /// Append each decision to this dataset file. Empty disables recording.
    pub record_path: String,
}

/// Capped A* search toward the nearest adversary
#[derive(Debug, Deserialize, Clone)]
pub struct AStarConfig {
    pub g_cap: i32,
    pub designated_adversary: AdversaryId,
}

/// Steady-state evolutionary search
#[derive(Debug, Deserialize, Clone)]
pub struct EvolutionConfig {
    pub rollout_plies: u32,
    pub max_generations: u32,
    pub designated_adversary: AdversaryId,
}

/// Nearest-neighbour classifier
#[derive(Debug, Deserialize, Clone)]
pub struct KnnConfig {
    pub dataset_path: String,
    pub k: usize,
    pub reload_each_decision: bool,
    pub designated_adversary: AdversaryId,
}

/// Greedy rollout toward the nearest adversary
#[derive(Debug, Deserialize, Clone)]
pub struct RolloutConfig {
    pub max_rollout_ticks: u32,
    pub designated_adversary: AdversaryId,
}

/// Decision log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Agent.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        toml::from_str(&contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Agent.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Agent.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Agent.toml
    pub fn default_hardcoded() -> Self {
        Config {
            timing: TimingConfig {
                response_time_budget_ms: 40,
                network_overhead_ms: 5,
                enforce_deadline: false,
            },
            search: SearchConfig {
                default_strategy: StrategyKind::Dfs,
                parallel_roots: false,
            },
            dfs: DfsConfig {
                max_depth: 10,
                designated_adversary: AdversaryId(3),
                record_path: String::new(),
            },
            astar: AStarConfig {
                g_cap: 100,
                designated_adversary: AdversaryId(0),
            },
            evolution: EvolutionConfig {
                rollout_plies: 3,
                max_generations: 10_000,
                designated_adversary: AdversaryId(0),
            },
            knn: KnnConfig {
                dataset_path: "data.txt".to_string(),
                k: 10,
                reload_each_decision: true,
                designated_adversary: AdversaryId(3),
            },
            rollout: RolloutConfig {
                max_rollout_ticks: 500,
                designated_adversary: AdversaryId(0),
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "capture_seeker_decisions.jsonl".to_string(),
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load Agent.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}
