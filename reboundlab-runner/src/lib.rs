//! ReboundLab Runner: parameter search, walk-forward validation, reports.
//!
//! This crate builds on `reboundlab-core` to provide:
//! - Window loading with forward extension and empty-data fallback
//! - Seeded Monte Carlo search over the rule's thresholds
//! - Walk-forward validation across independent instruments
//! - TOML run configuration
//! - CSV and JSON report export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod search;
pub mod walk_forward;

pub use config::{ConfigError, RunConfig, SearchSection};
pub use data_loader::{load_exact, load_window, LoadedWindow};
pub use export::{
    export_best_params_csv, export_events_csv, export_json, export_outcomes_csv,
    export_summary_csv, export_trades_csv, import_json, save_report, save_simulation, ExportError,
};
pub use search::{
    best_trial, run_trial, run_trials, search, BestParameters, ParamRange, SearchConfig,
    SearchError, SearchSpace, SearchTrial,
};
pub use walk_forward::{
    run_walk_forward, validation_window, AggregateSummary, InstrumentResult, ValidationResult,
    WalkForwardConfig, WalkForwardError, WalkForwardReport, WindowSpec,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn search_types_are_send_sync() {
        assert_send::<SearchConfig>();
        assert_sync::<SearchConfig>();
        assert_send::<BestParameters>();
        assert_sync::<BestParameters>();
    }

    #[test]
    fn walk_forward_config_is_send_sync() {
        assert_send::<WalkForwardConfig>();
        assert_sync::<WalkForwardConfig>();
    }

    #[test]
    fn walk_forward_report_is_send_sync() {
        assert_send::<WalkForwardReport>();
        assert_sync::<WalkForwardReport>();
    }

    #[test]
    fn run_config_is_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
    }
}
