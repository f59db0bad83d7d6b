use super::IndicatorPoint;
use crate::domain::market::candle::Candle;

/// True range against the previous close; the first bar uses its own range
fn true_range(candle: &Candle, prev_close: Option<f64>) -> f64 {
    let high = candle.high_f64();
    let low = candle.low_f64();
    match prev_close {
        Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
        None => high - low,
    }
}

/// Average True Range with Wilder's smoothing.
///
/// Seeded with the plain mean of the first `period` true ranges, so the first
/// entry is at index `period - 1`.
pub fn atr(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 || candles.len() < period {
        return Vec::new();
    }

    let n = period as f64;
    let mut out = Vec::with_capacity(candles.len() - period + 1);
    let mut prev_close = None;
    let mut seed_sum = 0.0;
    let mut current = 0.0;

    for (i, candle) in candles.iter().enumerate() {
        let tr = true_range(candle, prev_close);
        prev_close = Some(candle.close_f64());

        if i < period {
            seed_sum += tr;
            if i + 1 < period {
                continue;
            }
            current = seed_sum / n;
        } else {
            current = (current * (n - 1.0) + tr) / n;
        }

        out.push(IndicatorPoint {
            timestamp: candle.timestamp,
            value: current,
        });
    }
    out
}

/// Incremental ADX using Wilder's smoothing.
///
/// Accumulates the first `period` directional movements as sums, then smooths.
/// Returns `None` until a full period of movements has been seen.
struct WilderAdx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    tr_smooth: f64,
    plus_dm_smooth: f64,
    minus_dm_smooth: f64,
    adx: f64,
    count: usize,
}

impl WilderAdx {
    fn new(period: usize) -> Self {
        Self {
            period,
            prev: None,
            tr_smooth: 0.0,
            plus_dm_smooth: 0.0,
            minus_dm_smooth: 0.0,
            adx: 0.0,
            count: 0,
        }
    }

    fn next(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return None;
        };

        let tr = (high - low)
            .max((high - prev_close).abs())
            .max((low - prev_close).abs());
        let up_move = high - prev_high;
        let down_move = prev_low - low;
        let plus_dm = if up_move > down_move && up_move > 0.0 {
            up_move
        } else {
            0.0
        };
        let minus_dm = if down_move > up_move && down_move > 0.0 {
            down_move
        } else {
            0.0
        };

        self.count += 1;
        let n = self.period as f64;

        if self.count <= self.period {
            self.tr_smooth += tr;
            self.plus_dm_smooth += plus_dm;
            self.minus_dm_smooth += minus_dm;
        } else {
            self.tr_smooth = self.tr_smooth - self.tr_smooth / n + tr;
            self.plus_dm_smooth = self.plus_dm_smooth - self.plus_dm_smooth / n + plus_dm;
            self.minus_dm_smooth = self.minus_dm_smooth - self.minus_dm_smooth / n + minus_dm;
        }

        if self.count < self.period {
            return None;
        }

        let dx = if self.tr_smooth > 0.0 {
            let plus_di = 100.0 * self.plus_dm_smooth / self.tr_smooth;
            let minus_di = 100.0 * self.minus_dm_smooth / self.tr_smooth;
            let sum_di = plus_di + minus_di;
            if sum_di > 0.0 {
                100.0 * (plus_di - minus_di).abs() / sum_di
            } else {
                0.0
            }
        } else {
            0.0
        };

        self.adx = if self.count == self.period {
            dx
        } else {
            (self.adx * (n - 1.0) + dx) / n
        };
        Some(self.adx)
    }
}

/// Average Directional Index. First entry at index `period`.
pub fn adx(candles: &[Candle], period: usize) -> Vec<IndicatorPoint> {
    if period == 0 {
        return Vec::new();
    }

    let mut indicator = WilderAdx::new(period);
    candles
        .iter()
        .filter_map(|c| {
            indicator
                .next(c.high_f64(), c.low_f64(), c.close_f64())
                .map(|value| IndicatorPoint {
                    timestamp: c.timestamp,
                    value,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicators::test_support::candle_hlc;

    #[test]
    fn test_atr_constant_range() {
        let candles: Vec<Candle> = (0..20).map(|i| candle_hlc(i, 11.0, 9.0, 10.0)).collect();
        let series = atr(&candles, 14);

        assert_eq!(series.len(), 7);
        assert_eq!(series[0].timestamp, candles[13].timestamp);
        assert!(series.iter().all(|p| (p.value - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_atr_accounts_for_gaps() {
        let candles = vec![
            candle_hlc(0, 11.0, 9.0, 10.0),
            // gaps up: TR = 20 - 10
            candle_hlc(1, 20.0, 19.0, 19.5),
        ];
        let series = atr(&candles, 2);
        assert_eq!(series.len(), 1);
        assert!((series[0].value - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_adx_first_index_and_bounds() {
        let candles: Vec<Candle> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64;
                candle_hlc(i, base + 1.0, base - 1.0, base)
            })
            .collect();
        let series = adx(&candles, 14);

        assert_eq!(series.len(), 40 - 14);
        assert_eq!(series[0].timestamp, candles[14].timestamp);
        assert!(series.iter().all(|p| (0.0..=100.0).contains(&p.value)));
        // one-directional market drives ADX to its ceiling
        assert!(series.last().unwrap().value > 90.0);
    }

    #[test]
    fn test_short_input_is_empty() {
        let candles: Vec<Candle> = (0..5).map(|i| candle_hlc(i, 2.0, 1.0, 1.5)).collect();
        assert!(atr(&candles, 14).is_empty());
        assert!(adx(&candles, 14).is_empty());
        assert!(atr(&candles, 0).is_empty());
    }
}
