// Decision service core
//
// One controller per strategy kind is kept for the lifetime of a game so that
// strategies owning a model (KNN) can cache it. The CPU-bound decision runs on
// tokio's blocking pool; with an enforced deadline the request gives up after
// the effective budget and answers with the fallback move.

use log::{error, info, warn};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::controller::{fallback_move, Controller, ControllerDecision, DecisionSource};
use crate::debug_logger::DebugLogger;
use crate::maze::{MazeSnapshot, MazeState};
use crate::simulation::{DirectChase, Simulation};
use crate::strategy::{Deadline, StrategyKind};

/// Body of POST /move
#[derive(Deserialize, Debug, Clone)]
pub struct MoveRequest {
    pub state: MazeSnapshot,
    /// Overrides `search.default_strategy` for this request
    #[serde(default)]
    pub strategy: Option<StrategyKind>,
}

type Controllers = HashMap<StrategyKind, Controller<MazeState>>;

/// Capture-seeking agent exposed over HTTP
/// Takes static configuration and exposes methods corresponding to API endpoints
pub struct Bot {
    config: Config,
    controllers: Arc<Mutex<Controllers>>,
    logger: DebugLogger,
}

impl Bot {
    /// Creates a new Bot instance
    ///
    /// # Arguments
    /// * `config` - Static configuration that does not change during the bot's lifetime
    /// * `logger` - Decision log, possibly disabled
    pub fn new(config: Config, logger: DebugLogger) -> Self {
        Bot {
            config,
            controllers: Arc::new(Mutex::new(HashMap::new())),
            logger,
        }
    }

    /// Service metadata
    /// Corresponds to GET / endpoint
    pub fn info(&self) -> Value {
        info!("INFO");

        json!({
            "apiversion": "1",
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "default_strategy": self.config.search.default_strategy,
            "strategies": StrategyKind::all(),
        })
    }

    /// Called when a game starts
    /// Corresponds to POST /start endpoint
    pub fn start(&self, snapshot: &MazeSnapshot) {
        info!(
            "GAME START ({}x{} layout)",
            snapshot.layout.first().map(|row| row.chars().count()).unwrap_or(0),
            snapshot.layout.len()
        );
    }

    /// Called when a game ends. Drops every controller and any cached model.
    /// Corresponds to POST /end endpoint
    pub fn end(&self, snapshot: &MazeSnapshot) {
        self.controllers.lock().clear();
        info!("GAME OVER at tick {} (score {})", snapshot.tick, snapshot.score);
    }

    /// Computes the next move
    /// Corresponds to POST /move endpoint
    ///
    /// # Returns
    /// * `Result<Value, String>` - `{"move": "LEFT"}`, or an error for an invalid snapshot
    pub async fn get_move(&self, request: &MoveRequest) -> Result<Value, String> {
        let start_time = Instant::now();
        let state = MazeState::from_snapshot(&request.state)
            .map_err(|e| format!("Invalid state: {}", e))?;
        let kind = request.strategy.unwrap_or(self.config.search.default_strategy);

        let budget = Duration::from_millis(self.config.timing.effective_budget_ms());
        let deadline = Deadline::after(budget, self.config.timing.enforce_deadline);

        let controllers = self.controllers.clone();
        let config = self.config.clone();
        let task_state = state.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut controllers = controllers.lock();
            let controller = controllers
                .entry(kind)
                .or_insert_with(|| Controller::new(kind.build(&config, DirectChase)));
            controller.decide(&task_state, &deadline)
        });

        // The timeout runs against the same instant the strategies check
        let joined = match deadline.due().filter(|_| deadline.is_enforced()) {
            Some(due) => {
                let remaining = due.saturating_duration_since(Instant::now());
                match tokio::time::timeout(remaining, task).await {
                    Ok(joined) => Some(joined),
                    Err(_) => {
                        warn!(
                            "Tick {}: {} exceeded {}ms budget",
                            state.current_tick(),
                            kind,
                            budget.as_millis()
                        );
                        None
                    }
                }
            }
            None => Some(task.await),
        };

        let decision = match joined {
            Some(Ok(decision)) => decision,
            Some(Err(e)) => {
                error!("Decision task failed: {}", e);
                Self::fallback(&state)
            }
            None => Self::fallback(&state),
        };

        info!(
            "Tick {}: {} chose {} ({:?}, bound {:?}, time: {}ms)",
            state.current_tick(),
            kind,
            decision.chosen,
            decision.source,
            decision.bound,
            start_time.elapsed().as_millis()
        );
        self.logger.log_decision(kind, decision.source, decision.chosen, state.snapshot());

        Ok(json!({ "move": decision.chosen.as_str() }))
    }

    fn fallback(state: &MazeState) -> ControllerDecision {
        ControllerDecision {
            chosen: fallback_move(state),
            source: DecisionSource::Fallback,
            bound: None,
        }
    }
}
