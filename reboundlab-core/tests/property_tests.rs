//! Property tests for detection, resolution and simulation invariants.
//!
//! 1. Exactly one outcome per event, resolved inside the forward window
//! 2. A disabled stop-loss never stops out
//! 3. Session opens are constant within a day
//! 4. Bounded detection never reports events after the cutoff
//! 5. Detection and resolution are deterministic
//! 6. Every buy has a matching sell and trade cash flows sum to the P&L

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use reboundlab_core::domain::{Interval, Outcome, PriceBar, PriceSeries, RuleParameters};
use reboundlab_core::{
    detect, detect_until, evaluate, resolve_all, simulate, EvaluationSettings, ForwardWindow,
    ReferenceOpenPolicy,
};

// ── Strategies ───────────────────────────────────────────────────────

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

/// Random walk of `(step, wick_down, wick_up, gap)` tuples.
fn arb_series(interval: Interval) -> impl Strategy<Value = PriceSeries> {
    prop::collection::vec(
        (-0.06..0.06_f64, 0.0..0.10_f64, 0.0..0.08_f64, 1..3i64),
        1..120,
    )
    .prop_map(move |steps| {
        let mut price = 50.0;
        let mut t = base();
        let mut bars = Vec::with_capacity(steps.len());
        for (step, down, up, gap) in steps {
            let open = price;
            let close = (open * (1.0 + step)).max(1.0);
            let high = open.max(close) * (1.0 + up);
            let low = open.min(close) * (1.0 - down);
            bars.push(PriceBar {
                timestamp: t,
                open,
                high,
                low,
                close,
                volume: 1_000,
            });
            price = close;
            t += interval.unit() * gap as i32;
        }
        PriceSeries::new("PROP", interval, bars)
    })
}

fn arb_params() -> impl Strategy<Value = RuleParameters> {
    (
        0.01..0.10_f64,
        0.005..0.10_f64,
        prop::option::of(0.01..0.10_f64),
        1..15usize,
    )
        .prop_map(|(drop, gain, stop, horizon)| RuleParameters {
            drop_threshold: drop,
            gain_threshold: gain,
            stop_loss_threshold: stop,
            horizon,
        })
}

fn arb_window() -> impl Strategy<Value = ForwardWindow> {
    prop_oneof![Just(ForwardWindow::PresentBars), Just(ForwardWindow::Elapsed)]
}

fn arb_policy() -> impl Strategy<Value = ReferenceOpenPolicy> {
    prop_oneof![
        Just(ReferenceOpenPolicy::BarOpen),
        Just(ReferenceOpenPolicy::SessionOpen)
    ]
}

// ── 1. One outcome per event, inside the window ──────────────────────

proptest! {
    #[test]
    fn one_outcome_per_event_within_horizon(
        series in arb_series(Interval::Day),
        params in arb_params(),
        window in arb_window(),
    ) {
        let events = detect(&series, ReferenceOpenPolicy::BarOpen, params.drop_threshold);
        let resolved = resolve_all(&series, events.clone(), &params, window);
        prop_assert_eq!(resolved.len(), events.len());

        let span = series.interval.unit() * params.horizon as i32;
        for r in &resolved {
            let exit = r.outcome.exit_time();
            prop_assert!(exit >= r.event.detected_at);
            match window {
                ForwardWindow::Elapsed => prop_assert!(exit <= r.event.detected_at + span),
                ForwardWindow::PresentBars => {
                    let exit_index = series
                        .bars()
                        .iter()
                        .position(|b| b.timestamp == exit)
                        .unwrap();
                    prop_assert!(exit_index <= r.event.bar_index + params.horizon);
                }
            }
            if let Outcome::Unresolved { bars_observed, .. } = r.outcome {
                prop_assert!(bars_observed <= params.horizon);
            }
        }
    }
}

// ── 2. Disabled stop-loss ────────────────────────────────────────────

proptest! {
    #[test]
    fn no_stop_loss_never_stops_out(
        series in arb_series(Interval::Day),
        params in arb_params(),
        window in arb_window(),
    ) {
        let params = RuleParameters { stop_loss_threshold: None, ..params };
        let settings = EvaluationSettings { window, ..EvaluationSettings::default() };
        for r in evaluate(&series, &params, &settings) {
            let stopped = matches!(r.outcome, Outcome::StoppedOut { .. });
            prop_assert!(!stopped);
        }
    }
}

// ── 3. Session opens ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn session_opens_constant_per_day(series in arb_series(Interval::Minute)) {
        let opens = series.session_opens();
        prop_assert_eq!(opens.len(), series.len());
        let bars = series.bars();
        for i in 0..bars.len() {
            let first = bars.iter().position(|b| b.date() == bars[i].date()).unwrap();
            prop_assert_eq!(opens[i], bars[first].open);
        }
    }
}

// ── 4. Bounded detection ─────────────────────────────────────────────

proptest! {
    #[test]
    fn detect_until_respects_cutoff(
        series in arb_series(Interval::Day),
        cutoff in 0..200i64,
        threshold in 0.01..0.10_f64,
        policy in arb_policy(),
    ) {
        let end = base().date() + chrono::Duration::days(cutoff);
        let bounded = detect_until(&series, policy, threshold, end);
        let full = detect(&series, policy, threshold);
        for e in &bounded {
            prop_assert!(e.detected_at.date() <= end);
        }
        let expected: Vec<_> = full.into_iter().filter(|e| e.detected_at.date() <= end).collect();
        prop_assert_eq!(bounded, expected);
    }
}

// ── 5. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn evaluation_is_deterministic(
        series in arb_series(Interval::Minute),
        params in arb_params(),
        policy in arb_policy(),
        window in arb_window(),
    ) {
        let settings = EvaluationSettings { reference: policy, window, detect_until: None };
        prop_assert_eq!(
            evaluate(&series, &params, &settings),
            evaluate(&series, &params, &settings)
        );
    }
}

// ── 6. Ledger ────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn ledger_balances(
        series in arb_series(Interval::Day),
        params in arb_params(),
        cash in 100.0..100_000.0_f64,
    ) {
        let sim = simulate(&series, &params, &EvaluationSettings::default(), cash);
        prop_assert_eq!(sim.trades.len(), 2 * sim.resolved.len());
        for pair in sim.trades.chunks(2) {
            prop_assert!(pair[0].action.is_buy());
            prop_assert!(!pair[1].action.is_buy());
            prop_assert_eq!(pair[0].shares, pair[1].shares);
        }
        let net: f64 = sim.trades.iter().map(|t| t.cash_flow()).sum();
        prop_assert!((net - sim.profit_loss()).abs() < 1e-6 * cash.max(1.0));
        prop_assert_eq!(sim.final_state.shares_held, 0);
    }
}
