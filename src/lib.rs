// Library exports for the capture-seeking agent
// The server binary and the replay tool both build on these modules

pub mod bot;
pub mod config;
pub mod controller;
pub mod dataset;
pub mod debug_logger;
pub mod error;
pub mod maze;
pub mod pacing;
pub mod replay;
pub mod simulation;
pub mod strategy;
pub mod types;
