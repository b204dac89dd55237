//! Built-in candlestick detectors.
//!
//! Geometry follows TA-Lib candle settings: "long" and "short" bodies compare
//! against the mean body of the 10 preceding candles, a doji body is at most
//! 10% of the mean range of the 10 preceding candles, a "very short" shadow is
//! under 10% of that mean range, and "near" is 20% of the mean range of the 5
//! preceding candles. "Equal" and "far" use 5% and 60% of that 5-candle range,
//! and a "short" shadow is under the mean shadow of the 10 preceding candles.
//! Rows without enough history never match.
//!
//! Polarity follows TA-Lib as well, including the doji family reporting `+100`
//! for gravestone and dragonfly dojis.

use crate::domain::OhlcvColumns;

use super::{FnDetector, PatternSignal};

const BODY_PERIOD: usize = 10;
const RANGE_PERIOD: usize = 10;
const NEAR_PERIOD: usize = 5;
const DOJI_FACTOR: f64 = 0.1;
const SHADOW_VERY_SHORT_FACTOR: f64 = 0.1;
const NEAR_FACTOR: f64 = 0.2;
const EQUAL_FACTOR: f64 = 0.05;
const FAR_FACTOR: f64 = 0.6;
const STAR_PENETRATION: f64 = 0.3;

/// Detectors of the default registry, in evaluation order.
pub const BUILTIN: [FnDetector; 17] = [
    FnDetector::new("CDLHANGINGMAN", hanging_man),
    FnDetector::new("CDLSHOOTINGSTAR", shooting_star),
    FnDetector::new("CDLGRAVESTONEDOJI", gravestone_doji),
    FnDetector::new("CDLHAMMER", hammer),
    FnDetector::new("CDLINVERTEDHAMMER", inverted_hammer),
    FnDetector::new("CDLDRAGONFLYDOJI", dragonfly_doji),
    FnDetector::new("CDLHARAMI", harami),
    FnDetector::new("CDLHARAMICROSS", harami_cross),
    FnDetector::new("CDLMORNINGSTAR", morning_star),
    FnDetector::new("CDLMORNINGDOJISTAR", morning_doji_star),
    FnDetector::new("CDLSEPARATINGLINES", separating_lines),
    FnDetector::new("CDLSTALLEDPATTERN", stalled_pattern),
    FnDetector::new("CDLRISEFALL3METHODS", rise_fall_three_methods),
    FnDetector::new("CDLEVENINGSTAR", evening_star),
    FnDetector::new("CDLEVENINGDOJISTAR", evening_doji_star),
    FnDetector::new("CDLDOJISTAR", doji_star),
    FnDetector::new("CDLADVANCEBLOCK", advance_block),
];

// ─── Candle geometry ────────────────────────────────────────────────

struct Candles<'a> {
    open: &'a [f64],
    high: &'a [f64],
    low: &'a [f64],
    close: &'a [f64],
}

impl<'a> Candles<'a> {
    fn new(ohlc: &'a OhlcvColumns) -> Self {
        Self {
            open: &ohlc.open,
            high: &ohlc.high,
            low: &ohlc.low,
            close: &ohlc.close,
        }
    }

    fn body(&self, i: usize) -> f64 {
        (self.close[i] - self.open[i]).abs()
    }

    fn range(&self, i: usize) -> f64 {
        self.high[i] - self.low[i]
    }

    fn top(&self, i: usize) -> f64 {
        self.open[i].max(self.close[i])
    }

    fn bottom(&self, i: usize) -> f64 {
        self.open[i].min(self.close[i])
    }

    fn upper_shadow(&self, i: usize) -> f64 {
        self.high[i] - self.top(i)
    }

    fn lower_shadow(&self, i: usize) -> f64 {
        self.bottom(i) - self.low[i]
    }

    fn is_white(&self, i: usize) -> bool {
        self.close[i] > self.open[i]
    }

    fn is_black(&self, i: usize) -> bool {
        self.close[i] < self.open[i]
    }

    /// +1 for a white (or flat) candle, -1 for a black one.
    fn color(&self, i: usize) -> f64 {
        if self.close[i] >= self.open[i] {
            1.0
        } else {
            -1.0
        }
    }

    /// Mean of `f` over the `period` rows before `i`.
    fn mean_before(&self, i: usize, period: usize, f: impl Fn(usize) -> f64) -> Option<f64> {
        (i >= period).then(|| (i - period..i).map(f).sum::<f64>() / period as f64)
    }

    fn avg_body(&self, i: usize) -> Option<f64> {
        self.mean_before(i, BODY_PERIOD, |j| self.body(j))
    }

    fn avg_range(&self, i: usize, period: usize) -> Option<f64> {
        self.mean_before(i, period, |j| self.range(j))
    }

    fn body_long(&self, i: usize) -> Option<bool> {
        Some(self.body(i) > self.avg_body(i)?)
    }

    fn body_short(&self, i: usize) -> Option<bool> {
        Some(self.body(i) < self.avg_body(i)?)
    }

    fn doji(&self, i: usize) -> Option<bool> {
        Some(self.body(i) <= self.avg_range(i, RANGE_PERIOD)? * DOJI_FACTOR)
    }

    fn very_short(&self, shadow: f64, i: usize) -> Option<bool> {
        Some(shadow < self.avg_range(i, RANGE_PERIOD)? * SHADOW_VERY_SHORT_FACTOR)
    }

    fn near(&self, i: usize) -> Option<f64> {
        Some(self.avg_range(i, NEAR_PERIOD)? * NEAR_FACTOR)
    }

    fn far(&self, i: usize) -> Option<f64> {
        Some(self.avg_range(i, NEAR_PERIOD)? * FAR_FACTOR)
    }

    fn equal(&self, i: usize) -> Option<f64> {
        Some(self.avg_range(i, NEAR_PERIOD)? * EQUAL_FACTOR)
    }

    /// Mean single shadow (half of upper plus lower) over the preceding candles.
    fn shadow_short(&self, i: usize) -> Option<f64> {
        self.mean_before(i, RANGE_PERIOD, |j| {
            (self.upper_shadow(j) + self.lower_shadow(j)) / 2.0
        })
    }
}

/// Apply a per-row rule; `None` (missing history) counts as no match.
fn scan(
    ohlc: &OhlcvColumns,
    rule: impl Fn(&Candles<'_>, usize) -> Option<PatternSignal>,
) -> Vec<PatternSignal> {
    let candles = Candles::new(ohlc);
    (0..ohlc.len())
        .map(|i| rule(&candles, i).unwrap_or(PatternSignal::NoMatch))
        .collect()
}

fn matched(cond: bool, signal: PatternSignal) -> Option<PatternSignal> {
    cond.then_some(signal)
}

fn signed(color: f64) -> PatternSignal {
    if color > 0.0 {
        PatternSignal::Bullish
    } else {
        PatternSignal::Bearish
    }
}

// ─── Single candle ──────────────────────────────────────────────────

/// Small body, long lower shadow, almost no upper shadow.
fn hammer_shape(c: &Candles, i: usize) -> Option<bool> {
    Some(c.body_short(i)? && c.lower_shadow(i) > c.body(i) && c.very_short(c.upper_shadow(i), i)?)
}

/// Small body, long upper shadow, almost no lower shadow.
fn inverted_shape(c: &Candles, i: usize) -> Option<bool> {
    Some(c.body_short(i)? && c.upper_shadow(i) > c.body(i) && c.very_short(c.lower_shadow(i), i)?)
}

/// Hammer shape with its body at or near the previous low.
pub fn hammer(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        let near = c.near(prev)?;
        matched(
            hammer_shape(c, i)? && c.bottom(i) <= c.low[prev] + near,
            PatternSignal::Bullish,
        )
    })
}

/// Hammer shape with its body at or near the previous high.
pub fn hanging_man(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        let near = c.near(prev)?;
        matched(
            hammer_shape(c, i)? && c.bottom(i) >= c.high[prev] - near,
            PatternSignal::Bearish,
        )
    })
}

/// Inverted shape whose body gaps above the previous body.
pub fn shooting_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        matched(
            inverted_shape(c, i)? && c.bottom(i) > c.top(prev),
            PatternSignal::Bearish,
        )
    })
}

/// Inverted shape whose body gaps below the previous body.
pub fn inverted_hammer(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        matched(
            inverted_shape(c, i)? && c.top(i) < c.bottom(prev),
            PatternSignal::Bullish,
        )
    })
}

/// Doji with no lower shadow and a real upper one. Reported `+100` as TA-Lib does.
pub fn gravestone_doji(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        matched(
            c.doji(i)? && c.very_short(c.lower_shadow(i), i)? && !c.very_short(c.upper_shadow(i), i)?,
            PatternSignal::Bullish,
        )
    })
}

/// Doji with no upper shadow and a real lower one.
pub fn dragonfly_doji(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        matched(
            c.doji(i)? && c.very_short(c.upper_shadow(i), i)? && !c.very_short(c.lower_shadow(i), i)?,
            PatternSignal::Bullish,
        )
    })
}

// ─── Two candles ────────────────────────────────────────────────────

/// Long body followed by a small one inside it, signed against the first color.
fn inside_rule<'a>(
    c: &Candles<'a>,
    i: usize,
    small: fn(&Candles<'a>, usize) -> Option<bool>,
) -> Option<PatternSignal> {
    let prev = i.checked_sub(1)?;
    if !(c.body_long(prev)? && small(c, i)?) {
        return None;
    }
    if c.top(i) > c.top(prev) || c.bottom(i) < c.bottom(prev) {
        return None;
    }
    if c.is_black(prev) {
        Some(PatternSignal::Bullish)
    } else if c.is_white(prev) {
        Some(PatternSignal::Bearish)
    } else {
        None
    }
}

pub fn harami(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| inside_rule(c, i, Candles::body_short))
}

pub fn harami_cross(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| inside_rule(c, i, Candles::doji))
}

/// Long body, then a doji gapping away in the same direction.
pub fn doji_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        if !(c.body_long(prev)? && c.doji(i)?) {
            return None;
        }
        if c.is_white(prev) && c.bottom(i) > c.top(prev) {
            Some(PatternSignal::Bearish)
        } else if c.is_black(prev) && c.top(i) < c.bottom(prev) {
            Some(PatternSignal::Bullish)
        } else {
            None
        }
    })
}

/// Opposite colors opening at the same price; the second candle is a long
/// belt hold (no shadow on its opening side). Signed by the second candle.
pub fn separating_lines(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let prev = i.checked_sub(1)?;
        let equal = c.equal(prev)?;
        if c.color(prev) == c.color(i) || (c.open[i] - c.open[prev]).abs() > equal {
            return None;
        }
        let opening_shadow = if c.color(i) > 0.0 {
            c.lower_shadow(i)
        } else {
            c.upper_shadow(i)
        };
        matched(
            c.body_long(i)? && c.very_short(opening_shadow, i)?,
            signed(c.color(i)),
        )
    })
}

// ─── Three candles ──────────────────────────────────────────────────

/// Long first candle, a small star gapping away from it, then a long candle of
/// the opposite color closing well into the first body.
fn star_rule<'a>(
    c: &Candles<'a>,
    i: usize,
    bullish: bool,
    star_shape: fn(&Candles<'a>, usize) -> Option<bool>,
) -> Option<PatternSignal> {
    let star = i.checked_sub(1)?;
    let first = i.checked_sub(2)?;
    if !(c.body_long(first)? && star_shape(c, star)? && c.body_long(i)?) {
        return None;
    }
    let penetration = c.body(first) * STAR_PENETRATION;
    let hit = if bullish {
        c.is_black(first)
            && c.top(star) < c.bottom(first)
            && c.is_white(i)
            && c.close[i] > c.close[first] + penetration
    } else {
        c.is_white(first)
            && c.bottom(star) > c.top(first)
            && c.is_black(i)
            && c.close[i] < c.close[first] - penetration
    };
    let signal = if bullish {
        PatternSignal::Bullish
    } else {
        PatternSignal::Bearish
    };
    matched(hit, signal)
}

pub fn morning_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| star_rule(c, i, true, Candles::body_short))
}

pub fn morning_doji_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| star_rule(c, i, true, Candles::doji))
}

pub fn evening_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| star_rule(c, i, false, Candles::body_short))
}

pub fn evening_doji_star(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| star_rule(c, i, false, Candles::doji))
}

/// Three white candles with rising closes, each opening at or near the prior close.
fn climbing(c: &Candles<'_>, i: usize) -> Option<bool> {
    let first = i.checked_sub(2)?;
    let second = i - 1;
    Some(
        (first..=i).all(|j| c.color(j) > 0.0)
            && c.close[i] > c.close[second]
            && c.close[second] > c.close[first]
            && c.open[second] > c.open[first]
            && c.open[second] <= c.close[first] + c.near(first)?,
    )
}

/// Two long white candles, then a small one stalling near the second close.
pub fn stalled_pattern(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        if !climbing(c, i)? {
            return None;
        }
        let (first, second) = (i - 2, i - 1);
        matched(
            c.body_long(first)?
                && c.body_long(second)?
                && c.very_short(c.upper_shadow(second), second)?
                && c.body_short(i)?
                && c.open[i] >= c.close[second] - c.body(i) - c.near(second)?,
            PatternSignal::Bearish,
        )
    })
}

/// Three white candles losing strength: shrinking bodies or growing upper shadows.
pub fn advance_block(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        if !climbing(c, i)? {
            return None;
        }
        let (first, second) = (i - 2, i - 1);
        if !(c.open[i] > c.open[second]
            && c.open[i] <= c.close[second] + c.near(second)?
            && c.body_long(first)?
            && c.upper_shadow(first) < c.shadow_short(first)?)
        {
            return None;
        }
        let (b1, b2, b3) = (c.body(first), c.body(second), c.body(i));
        let weakening = (b2 < b1 - c.far(first)? && b3 < b2 + c.near(second)?)
            || b3 < b2 - c.far(second)?
            || (b3 < b2
                && b2 < b1
                && (c.upper_shadow(i) > c.shadow_short(i)?
                    || c.upper_shadow(second) > c.shadow_short(second)?))
            || (b3 < b2 && c.upper_shadow(i) > b3);
        matched(weakening, PatternSignal::Bearish)
    })
}

// ─── Five candles ───────────────────────────────────────────────────

/// Long candle, three small counter-colored candles drifting against it
/// inside its range, then a long candle resuming the trend past the first close.
pub fn rise_fall_three_methods(ohlc: &OhlcvColumns) -> Vec<PatternSignal> {
    scan(ohlc, |c, i| {
        let first = i.checked_sub(4)?;
        let dir = c.color(first);
        if !(c.body_long(first)? && c.body_long(i)? && c.color(i) == dir) {
            return None;
        }
        let mut held = true;
        for j in first + 1..i {
            held &= c.body_short(j)?
                && c.color(j) == -dir
                && c.bottom(j) < c.high[first]
                && c.top(j) > c.low[first];
        }
        let drifting = (first + 2..i).all(|j| c.close[j] * dir < c.close[j - 1] * dir);
        matched(
            held
                && drifting
                && c.open[i] * dir > c.close[i - 1] * dir
                && c.close[i] * dir > c.close[first] * dir,
            signed(dir),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candlestick::{aggregate_patterns, PatternRegistry};
    use crate::indicators::make_ohlc_bars;
    use crate::candlestick::PatternSignal::{Bearish, Bullish, NoMatch};

    /// Ten identical white candles: body 1, range 2.
    fn calm() -> Vec<(f64, f64, f64, f64)> {
        vec![(100.0, 101.5, 99.5, 101.0); 10]
    }

    fn columns(tail: &[(f64, f64, f64, f64)]) -> OhlcvColumns {
        let mut data = calm();
        data.extend_from_slice(tail);
        OhlcvColumns::from_bars(&make_ohlc_bars(&data))
    }

    fn only_at(signals: &[PatternSignal], row: usize, expected: PatternSignal) {
        for (i, s) in signals.iter().enumerate() {
            let want = if i == row { expected } else { NoMatch };
            assert_eq!(*s, want, "row {i}");
        }
    }

    #[test]
    fn hammer_at_prior_low() {
        let cols = columns(&[(99.5, 99.9, 98.5, 99.8)]);
        only_at(&hammer(&cols), 10, Bullish);
        only_at(&hanging_man(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn hanging_man_at_prior_high() {
        let cols = columns(&[(101.3, 101.6, 100.3, 101.5)]);
        only_at(&hanging_man(&cols), 10, Bearish);
        only_at(&hammer(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn shooting_star_gaps_up() {
        let cols = columns(&[(101.5, 102.5, 101.25, 101.3)]);
        only_at(&shooting_star(&cols), 10, Bearish);
        only_at(&inverted_hammer(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn inverted_hammer_gaps_down() {
        let cols = columns(&[(99.7, 100.9, 99.65, 99.9)]);
        only_at(&inverted_hammer(&cols), 10, Bullish);
    }

    #[test]
    fn doji_family() {
        let gravestone = columns(&[(100.0, 101.5, 100.0, 100.05)]);
        only_at(&gravestone_doji(&gravestone), 10, Bullish);
        only_at(&dragonfly_doji(&gravestone), usize::MAX, NoMatch);

        let dragonfly = columns(&[(100.0, 100.05, 98.5, 100.05)]);
        only_at(&dragonfly_doji(&dragonfly), 10, Bullish);
        only_at(&gravestone_doji(&dragonfly), usize::MAX, NoMatch);
    }

    #[test]
    fn harami_signed_against_first_candle() {
        let cols = columns(&[(103.0, 103.5, 98.5, 99.0), (100.0, 100.7, 99.8, 100.5)]);
        only_at(&harami(&cols), 11, Bullish);
        only_at(&harami_cross(&cols), usize::MAX, NoMatch);

        let bearish = columns(&[(99.0, 103.5, 98.5, 103.0), (100.5, 100.7, 99.8, 100.0)]);
        only_at(&harami(&bearish), 11, Bearish);
    }

    #[test]
    fn harami_cross_needs_doji() {
        let cols = columns(&[(103.0, 103.5, 98.5, 99.0), (100.0, 100.3, 99.8, 100.1)]);
        only_at(&harami_cross(&cols), 11, Bullish);
    }

    #[test]
    fn morning_star_and_doji_variants() {
        let cols = columns(&[
            (104.0, 104.2, 99.8, 100.0),
            (98.8, 99.2, 98.6, 99.0),
            (99.5, 103.2, 99.4, 103.0),
        ]);
        only_at(&morning_star(&cols), 12, Bullish);
        only_at(&morning_doji_star(&cols), 12, Bullish);
        only_at(&doji_star(&cols), 11, Bullish);
        only_at(&evening_star(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn evening_star_mirrors_morning_star() {
        let cols = columns(&[
            (100.0, 104.2, 99.8, 104.0),
            (105.0, 105.4, 104.9, 105.2),
            (104.5, 104.6, 100.8, 101.0),
        ]);
        only_at(&evening_star(&cols), 12, Bearish);
        only_at(&morning_star(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn separating_lines_both_ways() {
        let bullish = columns(&[(102.0, 102.5, 99.5, 100.0), (102.0, 105.2, 101.95, 105.0)]);
        only_at(&separating_lines(&bullish), 11, Bullish);

        let bearish = columns(&[(100.0, 102.5, 99.5, 102.0), (100.0, 100.05, 97.0, 97.2)]);
        only_at(&separating_lines(&bearish), 11, Bearish);
    }

    #[test]
    fn separating_lines_needs_same_open() {
        let cols = columns(&[(102.0, 102.5, 99.5, 100.0), (102.5, 105.6, 102.45, 105.5)]);
        only_at(&separating_lines(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn stalled_pattern_after_two_long_white() {
        let cols = columns(&[
            (100.0, 103.2, 99.9, 103.0),
            (102.5, 105.1, 102.4, 105.0),
            (104.9, 105.6, 104.8, 105.3),
        ]);
        only_at(&stalled_pattern(&cols), 12, Bearish);
    }

    #[test]
    fn advance_block_with_weakening_tops() {
        let cols = columns(&[
            (100.0, 103.1, 99.9, 103.0),
            (102.0, 104.6, 101.9, 104.5),
            (104.0, 106.5, 103.9, 105.5),
        ]);
        only_at(&advance_block(&cols), 12, Bearish);
        only_at(&stalled_pattern(&cols), usize::MAX, NoMatch);
    }

    #[test]
    fn rising_three_methods() {
        let cols = columns(&[
            (100.0, 103.1, 99.9, 103.0),
            (102.6, 102.7, 102.1, 102.2),
            (102.2, 102.3, 101.7, 101.8),
            (101.8, 101.9, 101.3, 101.4),
            (101.5, 104.1, 101.4, 104.0),
        ]);
        only_at(&rise_fall_three_methods(&cols), 14, Bullish);
    }

    #[test]
    fn falling_three_methods() {
        let cols = columns(&[
            (103.0, 103.1, 99.9, 100.0),
            (100.4, 100.9, 100.3, 100.8),
            (100.8, 101.3, 100.7, 101.2),
            (101.2, 101.7, 101.1, 101.6),
            (101.5, 101.6, 98.9, 99.0),
        ]);
        only_at(&rise_fall_three_methods(&cols), 14, Bearish);
    }

    #[test]
    fn short_history_never_matches() {
        let cols = OhlcvColumns::from_bars(&make_ohlc_bars(&[(99.5, 99.9, 98.5, 99.8); 5]));
        for detector in BUILTIN {
            let out = (detector.detect)(&cols);
            assert_eq!(out, vec![NoMatch; 5], "{}", detector.name);
        }
    }

    #[test]
    fn registry_aggregates_builtin_hits() {
        let bars = make_ohlc_bars(&{
            let mut data = calm();
            data.push((99.5, 99.9, 98.5, 99.8));
            data
        });
        let m = aggregate_patterns(&bars, &PatternRegistry::builtin()).unwrap();
        assert_eq!(m.bullish_patterns[10], vec!["CDLHAMMER"]);
        assert!(m.bullish_flag[10]);
        assert!(!m.bearish_flag[10]);
        assert!(m.bullish_flag[..10].iter().all(|f| !f));
    }
}
