//! Property tests for the signal engine invariants.
//!
//! Uses proptest to verify:
//! 1. Pivot reflection symmetry: highs of the negated series are the negated lows
//! 2. Window boundary: no pivot in the first `left` or last `right` rows
//! 3. Forward-fill idempotence
//! 4. Pattern union commutativity: flags ignore detector order
//! 5. Entry exclusivity: no row enters long and short at once
//! 6. Exit edge row: row 0 never exits

use chrono::NaiveDate;
use proptest::prelude::*;
use pivotlab_core::candlestick::{aggregate_columns, PatternDetector, PatternRegistry, PatternSignal};
use pivotlab_core::domain::{Bar, OhlcvColumns};
use pivotlab_core::pivot::{find_pivots_in, forward_fill, PivotKind};
use pivotlab_core::signals::{generate_signals, SignalInputs, SignalRules};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_series() -> impl Strategy<Value = Vec<f64>> {
    // Coarse grid so ties actually occur
    prop::collection::vec((0i32..40).prop_map(|v| v as f64 * 0.5), 3..80)
}

fn arb_optional_series() -> impl Strategy<Value = Vec<Option<f64>>> {
    prop::collection::vec(prop::option::of(-50.0..50.0_f64), 0..60)
}

fn arb_oscillator() -> impl Strategy<Value = f64> {
    prop_oneof![4 => 0.0..=100.0_f64, 1 => Just(f64::NAN)]
}

#[derive(Debug, Clone)]
struct Row {
    open: f64,
    close: f64,
    up: f64,
    down: f64,
    volume: f64,
    pivot_high: Option<f64>,
    pivot_low: Option<f64>,
    bullish: bool,
    bearish: bool,
    adx: f64,
    rsi: f64,
    stop: f64,
}

fn arb_row() -> impl Strategy<Value = Row> {
    (
        50.0..150.0_f64,
        50.0..150.0_f64,
        0.0..5.0_f64,
        0.0..5.0_f64,
        0.0..2000.0_f64,
        prop::option::of(50.0..150.0_f64),
        prop::option::of(50.0..150.0_f64),
        any::<bool>(),
        any::<bool>(),
        arb_oscillator(),
        arb_oscillator(),
        40.0..160.0_f64,
    )
        .prop_map(
            |(open, close, up, down, volume, pivot_high, pivot_low, bullish, bearish, adx, rsi, stop)| Row {
                open,
                close,
                up,
                down,
                volume,
                pivot_high,
                pivot_low,
                bullish,
                bearish,
                adx,
                rsi,
                stop,
            },
        )
}

fn to_bars(rows: &[Row]) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    rows.iter()
        .enumerate()
        .map(|(i, r)| Bar {
            timestamp: base + chrono::Duration::hours(i as i64),
            open: r.open,
            high: r.open.max(r.close) + r.up,
            low: r.open.min(r.close) - r.down,
            close: r.close,
            volume: r.volume,
        })
        .collect()
}

/// Detector replaying a fixed series of codes.
struct Replay {
    name: String,
    signals: Vec<PatternSignal>,
}

impl PatternDetector for Replay {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, _ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
        self.signals.clone()
    }
}

fn registry_in_order(codes: &[Vec<i32>], order: &[usize]) -> PatternRegistry {
    let mut registry = PatternRegistry::new();
    for &k in order {
        registry.register(Replay {
            name: format!("P{k}"),
            signals: codes[k].iter().map(|&c| PatternSignal::from_code(c)).collect(),
        });
    }
    registry
}

// ── 1 & 2. Pivots ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn pivot_reflection_symmetry(values in arb_series(), left in 1usize..6, right in 1usize..6) {
        prop_assume!(values.len() >= left + right + 1);
        let reflected: Vec<f64> = values.iter().map(|v| -v).collect();
        let lows = find_pivots_in(&values, left, right, PivotKind::Low).unwrap();
        let highs = find_pivots_in(&reflected, left, right, PivotKind::High).unwrap();
        let negated: Vec<Option<f64>> = highs.iter().map(|h| h.map(|v| -v)).collect();
        prop_assert_eq!(negated, lows);
    }

    #[test]
    fn pivots_absent_outside_window(values in arb_series(), left in 1usize..6, right in 1usize..6) {
        prop_assume!(values.len() >= left + right + 1);
        let n = values.len();
        for kind in [PivotKind::Low, PivotKind::High] {
            let out = find_pivots_in(&values, left, right, kind).unwrap();
            prop_assert_eq!(out.len(), n);
            prop_assert!(out[..left].iter().all(Option::is_none));
            prop_assert!(out[n - right..].iter().all(Option::is_none));
        }
    }

    #[test]
    fn too_short_is_insufficient(left in 1usize..6, right in 1usize..6) {
        let values = vec![1.0; left + right];
        prop_assert!(find_pivots_in(&values, left, right, PivotKind::Low).is_err());
    }
}

// ── 3. Forward fill ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn forward_fill_idempotent(values in arb_optional_series()) {
        let once = forward_fill(&values);
        prop_assert_eq!(forward_fill(&once), once.clone());
        prop_assert_eq!(once.len(), values.len());
        for (raw, filled) in values.iter().zip(&once) {
            if raw.is_some() {
                prop_assert_eq!(raw, filled);
            }
        }
        if let Some(first) = values.iter().position(Option::is_some) {
            prop_assert!(once[..first].iter().all(Option::is_none));
            prop_assert!(once[first..].iter().all(Option::is_some));
        }
    }
}

// ── 4. Pattern union ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn union_is_order_independent(
        (codes, order) in (1usize..6).prop_flat_map(|k| (
            prop::collection::vec(prop::collection::vec(-1i32..=1, 25), k),
            Just((0..k).collect::<Vec<usize>>()).prop_shuffle(),
        ))
    ) {
        let ohlc = OhlcvColumns {
            open: vec![1.0; 25],
            high: vec![1.0; 25],
            low: vec![1.0; 25],
            close: vec![1.0; 25],
            volume: vec![1.0; 25],
        };
        let identity: Vec<usize> = (0..codes.len()).collect();
        let a = aggregate_columns(&ohlc, &registry_in_order(&codes, &identity)).unwrap();
        let b = aggregate_columns(&ohlc, &registry_in_order(&codes, &order)).unwrap();
        prop_assert_eq!(&a.bullish_flag, &b.bullish_flag);
        prop_assert_eq!(&a.bearish_flag, &b.bearish_flag);
        for i in 0..25 {
            let mut x = a.bullish_patterns[i].clone();
            let mut y = b.bullish_patterns[i].clone();
            x.sort();
            y.sort();
            prop_assert_eq!(x, y);
            let any_bullish = codes.iter().any(|c| c[i] > 0);
            prop_assert_eq!(a.bullish_flag[i], any_bullish);
        }
    }
}

// ── 5 & 6. Rule engine ───────────────────────────────────────────────

proptest! {
    #[test]
    fn entries_never_conflict_and_row_zero_never_exits(
        rows in prop::collection::vec(arb_row(), 1..40)
    ) {
        let bars = to_bars(&rows);
        let pivot_high: Vec<_> = rows.iter().map(|r| r.pivot_high).collect();
        let pivot_low: Vec<_> = rows.iter().map(|r| r.pivot_low).collect();
        let bullish: Vec<_> = rows.iter().map(|r| r.bullish).collect();
        let bearish: Vec<_> = rows.iter().map(|r| r.bearish).collect();
        let adx: Vec<_> = rows.iter().map(|r| r.adx).collect();
        let rsi: Vec<_> = rows.iter().map(|r| r.rsi).collect();
        let stop: Vec<_> = rows.iter().map(|r| r.stop).collect();
        let inputs = SignalInputs {
            bars: &bars,
            pivot_high: &pivot_high,
            pivot_low: &pivot_low,
            bullish_flag: &bullish,
            bearish_flag: &bearish,
            adx: &adx,
            rsi: &rsi,
            trend_stop: &stop,
        };
        let out = generate_signals(&inputs, &SignalRules::default()).unwrap();

        prop_assert!(out.conflicting_entries().is_empty());
        prop_assert!(!out.exit_long[0]);
        prop_assert!(!out.exit_short[0]);
        prop_assert!(out.exit_tag[0].is_none());
        for i in 0..bars.len() {
            prop_assert_eq!(out.exit_tag[i].is_some(), out.exit_long[i] || out.exit_short[i]);
            if rows[i].pivot_high.is_none() {
                prop_assert!(!out.enter_short[i]);
            }
            if rows[i].pivot_low.is_none() {
                prop_assert!(!out.enter_long[i]);
            }
            if rows[i].rsi.is_nan() || rows[i].adx.is_nan() {
                prop_assert!(!out.enter_long[i] && !out.enter_short[i]);
            }
        }
    }
}
