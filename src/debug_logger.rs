// Asynchronous decision log
//
// Fire-and-forget writes so the request/response cycle never waits on disk.
// Each decision is one JSON line holding the full snapshot, which is what the
// replay tool feeds back into the controller.

use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::controller::DecisionSource;
use crate::maze::MazeSnapshot;
use crate::strategy::StrategyKind;
use crate::types::Move;

/// One logged decision
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub tick: u32,
    pub strategy: StrategyKind,
    pub chosen_move: Move,
    /// Absent in hand-written fixtures
    #[serde(default)]
    pub source: Option<DecisionSource>,
    pub state: MazeSnapshot,
    pub timestamp: String,
}

/// Shared log writer
/// Uses Arc<Mutex<File>> so concurrent requests append whole lines
#[derive(Clone)]
pub struct DebugLogger {
    file: Arc<Mutex<Option<File>>>,
    enabled: bool,
}

impl DebugLogger {
    /// Creates a logger, truncating the log file when enabled
    pub async fn new(enabled: bool, log_file_path: &str) -> Self {
        if !enabled {
            return Self::disabled();
        }

        match OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(log_file_path)
            .await
        {
            Ok(file) => {
                log::info!("Decision logging enabled: {}", log_file_path);
                DebugLogger {
                    file: Arc::new(Mutex::new(Some(file))),
                    enabled: true,
                }
            }
            Err(e) => {
                error!("Failed to create decision log '{}': {}", log_file_path, e);
                Self::disabled()
            }
        }
    }

    /// No-op logger
    pub fn disabled() -> Self {
        DebugLogger {
            file: Arc::new(Mutex::new(None)),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Queues one decision for writing. Must be called inside a tokio runtime.
    pub fn log_decision(
        &self,
        strategy: StrategyKind,
        source: DecisionSource,
        chosen_move: Move,
        state: MazeSnapshot,
    ) {
        if !self.enabled {
            return;
        }

        let entry = LogEntry {
            tick: state.tick,
            strategy,
            chosen_move,
            source: Some(source),
            state,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let file_handle = self.file.clone();

        tokio::spawn(async move {
            Self::write_entry(file_handle, entry).await;
        });
    }

    async fn write_entry(file_handle: Arc<Mutex<Option<File>>>, entry: LogEntry) {
        let mut file_guard = file_handle.lock().await;
        let file = match file_guard.as_mut() {
            Some(file) => file,
            None => return,
        };

        match serde_json::to_string(&entry) {
            Ok(json_line) => {
                let line = format!("{}\n", json_line);
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    error!("Failed to write decision log entry: {}", e);
                } else if let Err(e) = file.flush().await {
                    error!("Failed to flush decision log: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize decision log entry: {}", e),
        }
    }
}
