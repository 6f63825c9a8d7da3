// Replay of logged decisions
//
// Parses the JSONL decision log, re-runs the controller on each logged
// snapshot and compares the replayed move with the logged one. With deadlines
// disabled every strategy is deterministic, so any mismatch is a regression.

use log::{info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Instant;

use crate::config::Config;
use crate::controller::Controller;
use crate::debug_logger::LogEntry;
use crate::maze::MazeState;
use crate::simulation::DirectChase;
use crate::strategy::{Deadline, StrategyKind};
use crate::types::Move;

/// Result of replaying a single logged decision
#[derive(Debug, Clone)]
pub struct ReplayResult {
    pub tick: u32,
    pub strategy: StrategyKind,
    pub original_move: Move,
    pub replayed_move: Move,
    pub matches: bool,
    pub bound: Option<i32>,
    pub computation_time_ms: u128,
}

/// Statistics for a complete replay session
#[derive(Debug, Default)]
pub struct ReplayStats {
    pub total_ticks: usize,
    pub matches: usize,
    pub mismatches: usize,
    pub match_rate: f64,
}

/// Replay engine for analyzing decision logs
pub struct ReplayEngine {
    config: Config,
    verbose: bool,
}

impl ReplayEngine {
    pub fn new(config: Config, verbose: bool) -> Self {
        ReplayEngine { config, verbose }
    }

    /// Loads all log entries from a JSONL file
    pub fn load_log_file<P: AsRef<Path>>(&self, log_path: P) -> Result<Vec<LogEntry>, String> {
        let file =
            File::open(log_path.as_ref()).map_err(|e| format!("Failed to open log file: {}", e))?;

        let reader = BufReader::new(file);
        let mut entries = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| format!("Failed to read line {}: {}", line_num + 1, e))?;

            if line.trim().is_empty() {
                continue;
            }

            let entry: LogEntry = serde_json::from_str(&line)
                .map_err(|e| format!("Failed to parse JSON on line {}: {}", line_num + 1, e))?;

            entries.push(entry);
        }

        info!("Loaded {} log entries", entries.len());
        Ok(entries)
    }

    /// Re-runs the logged strategy on a logged snapshot
    pub fn replay_entry(&self, entry: &LogEntry) -> Result<ReplayResult, String> {
        if self.verbose {
            info!("Replaying tick {} ({})...", entry.tick, entry.strategy);
        }

        let state = MazeState::from_snapshot(&entry.state)
            .map_err(|e| format!("Invalid snapshot at tick {}: {}", entry.tick, e))?;

        // Fresh controller per entry: no model cached from a previous tick
        let mut controller = Controller::new(entry.strategy.build(&self.config, DirectChase));
        let start_time = Instant::now();
        let decision = controller.decide(&state, &Deadline::unbounded());
        let computation_time = start_time.elapsed().as_millis();

        let matches = decision.chosen == entry.chosen_move;
        let result = ReplayResult {
            tick: entry.tick,
            strategy: entry.strategy,
            original_move: entry.chosen_move,
            replayed_move: decision.chosen,
            matches,
            bound: decision.bound,
            computation_time_ms: computation_time,
        };

        if self.verbose {
            if matches {
                info!(
                    "Tick {}: MATCH - {} (bound: {:?}, time: {}ms)",
                    entry.tick, decision.chosen, decision.bound, computation_time
                );
            } else {
                warn!(
                    "Tick {}: MISMATCH - Original: {}, Replayed: {} (bound: {:?}, time: {}ms)",
                    entry.tick, entry.chosen_move, decision.chosen, decision.bound, computation_time
                );
            }
        }

        Ok(result)
    }

    /// Replays every entry, skipping the ones that cannot be rebuilt
    pub fn replay_all(&self, entries: &[LogEntry]) -> Vec<ReplayResult> {
        let mut results = Vec::new();

        for entry in entries {
            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Failed to replay tick {}: {}", entry.tick, e),
            }
        }

        results
    }

    /// Replays the first entry logged for each requested tick
    pub fn replay_ticks(
        &self,
        entries: &[LogEntry],
        ticks: &[u32],
    ) -> Result<Vec<ReplayResult>, String> {
        let mut results = Vec::new();

        for tick in ticks {
            let entry = entries
                .iter()
                .find(|e| e.tick == *tick)
                .ok_or_else(|| format!("Tick {} not found in log file", tick))?;

            match self.replay_entry(entry) {
                Ok(result) => results.push(result),
                Err(e) => warn!("Failed to replay tick {}: {}", tick, e),
            }
        }

        Ok(results)
    }

    pub fn generate_stats(&self, results: &[ReplayResult]) -> ReplayStats {
        let total_ticks = results.len();
        let matches = results.iter().filter(|r| r.matches).count();
        let mismatches = total_ticks - matches;
        let match_rate = if total_ticks > 0 {
            (matches as f64 / total_ticks as f64) * 100.0
        } else {
            0.0
        };

        ReplayStats { total_ticks, matches, mismatches, match_rate }
    }

    /// Prints a report of replay results
    pub fn print_report(&self, results: &[ReplayResult]) {
        let stats = self.generate_stats(results);

        println!("\n═══════════════════════════════════════════════════════════");
        println!("                    REPLAY REPORT");
        println!("═══════════════════════════════════════════════════════════");
        println!("Total Ticks:    {}", stats.total_ticks);
        println!("Matches:        {} ({:.1}%)", stats.matches, stats.match_rate);
        println!("Mismatches:     {}", stats.mismatches);
        println!("═══════════════════════════════════════════════════════════\n");

        if !results.is_empty() {
            let avg_time: f64 = results.iter().map(|r| r.computation_time_ms as f64).sum::<f64>()
                / results.len() as f64;
            println!("Average Computation Time:   {:.1}ms", avg_time);

            for kind in StrategyKind::all() {
                let count = results.iter().filter(|r| r.strategy == kind).count();
                if count > 0 {
                    println!("  {:<10} {} decisions", kind.as_str(), count);
                }
            }
            println!();
        }

        let mismatches: Vec<_> = results.iter().filter(|r| !r.matches).collect();
        if !mismatches.is_empty() {
            println!("═══════════════════════════════════════════════════════════");
            println!("                  DETAILED MISMATCHES");
            println!("═══════════════════════════════════════════════════════════");

            for result in mismatches {
                println!(
                    "Tick {} [{}]: {} → {} (bound: {:?}, time: {}ms)",
                    result.tick,
                    result.strategy,
                    result.original_move,
                    result.replayed_move,
                    result.bound,
                    result.computation_time_ms
                );
            }
            println!();
        }
    }

    /// Checks that the logged move at each tick is one of the acceptable moves
    pub fn validate_expected_moves(
        &self,
        entries: &[LogEntry],
        expected_moves: &[(u32, Vec<Move>)],
    ) -> Result<(), String> {
        for (tick, acceptable) in expected_moves {
            let entry = entries
                .iter()
                .find(|e| e.tick == *tick)
                .ok_or_else(|| format!("Tick {} not found in log", tick))?;

            if !acceptable.contains(&entry.chosen_move) {
                return Err(format!(
                    "Tick {}: Expected one of {:?}, but got {}",
                    tick,
                    acceptable.iter().map(|m| m.as_str()).collect::<Vec<_>>(),
                    entry.chosen_move
                ));
            }
        }

        Ok(())
    }

    /// Case-insensitive move name
    pub fn parse_move(s: &str) -> Result<Move, String> {
        Move::from_label(&s.trim().to_uppercase()).ok_or_else(|| format!("Invalid move: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::Maze;
    use std::io::Write;
    use std::sync::Arc;

    fn entry(tick: u32, strategy: StrategyKind, chosen_move: Move) -> LogEntry {
        let maze = Arc::new(Maze::parse(&["....."]).unwrap());
        let state = MazeState::new(maze, 1, [4, 4, 4, 4]).unwrap().with_tick(tick);
        LogEntry {
            tick,
            strategy,
            chosen_move,
            source: None,
            state: state.snapshot(),
            timestamp: "2025-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_parse_move() {
        assert_eq!(ReplayEngine::parse_move("up"), Ok(Move::Up));
        assert_eq!(ReplayEngine::parse_move("Right"), Ok(Move::Right));
        assert_eq!(ReplayEngine::parse_move("NEUTRAL"), Ok(Move::Neutral));
        assert!(ReplayEngine::parse_move("sideways").is_err());
    }

    #[test]
    fn test_replay_detects_mismatch() {
        let engine = ReplayEngine::new(Config::default_hardcoded(), false);
        let entries = vec![
            entry(10, StrategyKind::Astar, Move::Right),
            entry(11, StrategyKind::Dfs, Move::Left),
        ];
        let results = engine.replay_all(&entries);
        assert_eq!(results.len(), 2);
        assert!(results[0].matches);
        assert!(!results[1].matches);
        assert_eq!(results[1].replayed_move, Move::Right);

        let stats = engine.generate_stats(&results);
        assert_eq!((stats.matches, stats.mismatches), (1, 1));
    }

    #[test]
    fn test_load_log_file_and_validate() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let logged = [
            entry(3, StrategyKind::Rollout, Move::Right),
            entry(4, StrategyKind::Dfs, Move::Left),
        ];
        for e in logged {
            writeln!(file, "{}", serde_json::to_string(&e).unwrap()).unwrap();
        }
        writeln!(file).unwrap();

        let engine = ReplayEngine::new(Config::default_hardcoded(), false);
        let entries = engine.load_log_file(file.path()).unwrap();
        assert_eq!(entries.len(), 2);

        let expected = [(3, vec![Move::Right]), (4, vec![Move::Up, Move::Left])];
        assert!(engine.validate_expected_moves(&entries, &expected).is_ok());
        assert!(engine.validate_expected_moves(&entries, &[(4, vec![Move::Right])]).is_err());
        assert!(engine.validate_expected_moves(&entries, &[(99, vec![Move::Right])]).is_err());
        assert!(engine.replay_ticks(&entries, &[99]).is_err());
    }
}
