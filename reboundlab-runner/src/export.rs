//! Report export: CSV trade logs and tables, JSON reports.
//!
//! A walk-forward artifact directory holds:
//! - `report.json`: the full `WalkForwardReport`
//! - `trades.csv`: validation trade log across instruments
//! - `best_params.csv`: winning parameters per instrument
//! - `summary.csv`: validation outcomes and P&L per instrument

use std::path::{Path, PathBuf};

use thiserror::Error;

use reboundlab_core::domain::{DropEvent, ResolvedEvent, TradeRecord};
use reboundlab_core::Simulation;

use crate::walk_forward::WalkForwardReport;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Csv(e.into_error().into()))?;
    Ok(String::from_utf8(data)?)
}

fn write_file(path: &Path, contents: &str) -> Result<(), ExportError> {
    std::fs::write(path, contents).map_err(|source| ExportError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn fmt_stop(stop: Option<f64>) -> String {
    stop.map(|s| format!("{s:.6}")).unwrap_or_default()
}

// ─── CSV ─────────────────────────────────────────────────────────────

/// Trade log: instrument, action, timestamp, price, shares.
pub fn export_trades_csv<'a>(
    trades: impl IntoIterator<Item = &'a TradeRecord>,
) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["instrument", "action", "timestamp", "price", "shares"])?;
    for t in trades {
        wtr.write_record([
            t.instrument.as_str(),
            t.action.label(),
            &t.timestamp.to_string(),
            &format!("{:.4}", t.price),
            &t.shares.to_string(),
        ])?;
    }
    finish(wtr)
}

/// Detected events without outcomes.
pub fn export_events_csv(events: &[DropEvent]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "detected_at",
        "reference_open",
        "event_low",
        "drop_pct",
    ])?;
    for e in events {
        wtr.write_record([
            e.instrument.as_str(),
            &e.detected_at.to_string(),
            &format!("{:.4}", e.reference_open),
            &format!("{:.4}", e.event_low),
            &format!("{:.4}", e.drop_fraction * 100.0),
        ])?;
    }
    finish(wtr)
}

/// Events with their outcomes.
pub fn export_outcomes_csv(resolved: &[ResolvedEvent]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "detected_at",
        "event_low",
        "drop_pct",
        "outcome",
        "exit_time",
        "exit_price",
    ])?;
    for r in resolved {
        wtr.write_record([
            r.event.instrument.as_str(),
            &r.event.detected_at.to_string(),
            &format!("{:.4}", r.event.event_low),
            &format!("{:.4}", r.event.drop_fraction * 100.0),
            r.outcome.label(),
            &r.outcome.exit_time().to_string(),
            &format!("{:.4}", r.outcome.exit_price()),
        ])?;
    }
    finish(wtr)
}

pub fn export_best_params_csv(report: &WalkForwardReport) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "drop_threshold",
        "gain_threshold",
        "stop_loss_threshold",
        "horizon",
        "score",
        "trial",
    ])?;
    for b in report.best_parameters() {
        wtr.write_record([
            b.instrument.as_str(),
            &format!("{:.6}", b.params.drop_threshold),
            &format!("{:.6}", b.params.gain_threshold),
            &fmt_stop(b.params.stop_loss_threshold),
            &b.params.horizon.to_string(),
            &format!("{:.6}", b.score),
            &b.trial.to_string(),
        ])?;
    }
    finish(wtr)
}

pub fn export_summary_csv(report: &WalkForwardReport) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "instrument",
        "recovered",
        "stopped_out",
        "unresolved",
        "avg_unresolved_change_pct",
        "score",
        "initial_cash",
        "final_cash",
        "profit_loss",
    ])?;
    for r in &report.results {
        let s = &r.validation.summary;
        let sim = &r.validation.simulation;
        wtr.write_record([
            r.instrument.as_str(),
            &s.recovered.to_string(),
            &s.stopped_out.to_string(),
            &s.unresolved.to_string(),
            &format!("{:.4}", s.avg_unresolved_change * 100.0),
            &format!("{:.6}", s.score),
            &format!("{:.2}", sim.initial_cash),
            &format!("{:.2}", sim.final_state.cash),
            &format!("{:.2}", sim.profit_loss()),
        ])?;
    }
    finish(wtr)
}

// ─── JSON ────────────────────────────────────────────────────────────

pub fn export_json(report: &WalkForwardReport) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn import_json(json: &str) -> Result<WalkForwardReport, ExportError> {
    Ok(serde_json::from_str(json)?)
}

// ─── Artifact bundles ────────────────────────────────────────────────

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.display().to_string(),
        source,
    })
}

/// Write the walk-forward artifact set into `output_dir` and return the paths.
pub fn save_report(
    report: &WalkForwardReport,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    ensure_dir(output_dir)?;
    let files = [
        ("report.json", export_json(report)?),
        ("trades.csv", export_trades_csv(report.trade_log())?),
        ("best_params.csv", export_best_params_csv(report)?),
        ("summary.csv", export_summary_csv(report)?),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = output_dir.join(name);
        write_file(&path, &contents)?;
        written.push(path);
    }
    tracing::info!(dir = %output_dir.display(), files = written.len(), "saved walk-forward report");
    Ok(written)
}

/// Write `<instrument>_trades.csv` and `<instrument>_outcomes.csv` for one simulation.
pub fn save_simulation(sim: &Simulation, output_dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    ensure_dir(output_dir)?;
    let files = [
        (
            format!("{}_trades.csv", sim.instrument),
            export_trades_csv(&sim.trades)?,
        ),
        (
            format!("{}_outcomes.csv", sim.instrument),
            export_outcomes_csv(&sim.resolved)?,
        ),
    ];
    let mut written = Vec::with_capacity(files.len());
    for (name, contents) in files {
        let path = output_dir.join(name);
        write_file(&path, &contents)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use reboundlab_core::domain::TradeAction;

    fn trade(action: TradeAction, price: f64) -> TradeRecord {
        TradeRecord {
            instrument: "AMD".into(),
            action,
            timestamp: NaiveDate::from_ymd_opt(2024, 7, 1)
                .unwrap()
                .and_hms_opt(10, 5, 0)
                .unwrap(),
            price,
            shares: 12,
        }
    }

    #[test]
    fn trade_log_uses_human_labels() {
        let csv = export_trades_csv(&[
            trade(TradeAction::Buy, 150.0),
            trade(TradeAction::SellStoppedOut, 145.5),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "instrument,action,timestamp,price,shares");
        assert_eq!(lines[1], "AMD,BUY,2024-07-01 10:05:00,150.0000,12");
        assert_eq!(lines[2], "AMD,SELL (Stop Loss),2024-07-01 10:05:00,145.5000,12");
    }

    #[test]
    fn empty_trade_log_has_only_a_header() {
        let csv = export_trades_csv(std::iter::empty()).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }
}
