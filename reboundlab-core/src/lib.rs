//! ReboundLab Core: price series, drop detection, outcome resolution, scoring
//! and portfolio simulation.
//!
//! - Domain types (bars, series, rule parameters, events, outcomes, trades)
//! - Drop detector with bar-open or session-open reference
//! - Forward resolver with gain target, optional stop-loss and bounded horizon
//! - Outcome summary and search objective
//! - Whole-share portfolio simulator
//! - Data providers (Yahoo Finance, CSV, synthetic, in-memory)

pub mod data;
pub mod detector;
pub mod domain;
pub mod evaluate;
pub mod resolver;
pub mod rng;
pub mod scoring;
pub mod session_trace;
pub mod simulator;
pub mod universe;

pub use detector::{detect, detect_until, ReferenceOpenPolicy};
pub use evaluate::{evaluate, summarize, EvaluationSettings};
pub use resolver::{resolve, resolve_all, ForwardWindow};
pub use scoring::{score, OutcomeSummary};
pub use simulator::{simulate, simulate_resolved, Simulation, DEFAULT_INITIAL_CASH};
