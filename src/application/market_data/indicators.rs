use std::collections::VecDeque;

/// Manual DX (directional movement index) using Wilder's smoothing.
///
/// Accumulates the first N true-range and directional-movement values as a
/// sum, then smooths. Returns 0.0 until N moves have been seen.
pub struct ManualDx {
    period: usize,
    prev: Option<(f64, f64, f64)>,
    tr_smooth: f64,
    plus_dm_smooth: f64,
    minus_dm_smooth: f64,
    count: usize,
}

impl ManualDx {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            prev: None,
            tr_smooth: 0.0,
            plus_dm_smooth: 0.0,
            minus_dm_smooth: 0.0,
            count: 0,
        }
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let Some((prev_high, prev_low, prev_close)) = self.prev.replace((high, low, close)) else {
            return 0.0;
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
        if self.count <= self.period {
            self.tr_smooth += tr;
            self.plus_dm_smooth += plus_dm;
            self.minus_dm_smooth += minus_dm;
        } else {
            let n = self.period as f64;
            self.tr_smooth = self.tr_smooth - (self.tr_smooth / n) + tr;
            self.plus_dm_smooth = self.plus_dm_smooth - (self.plus_dm_smooth / n) + plus_dm;
            self.minus_dm_smooth = self.minus_dm_smooth - (self.minus_dm_smooth / n) + minus_dm;
        }

        if self.count < self.period || self.tr_smooth <= 0.0 {
            return 0.0;
        }

        let plus_di = 100.0 * self.plus_dm_smooth / self.tr_smooth;
        let minus_di = 100.0 * self.minus_dm_smooth / self.tr_smooth;
        let sum_di = plus_di + minus_di;
        if sum_di > 0.0 {
            100.0 * (plus_di - minus_di).abs() / sum_di
        } else {
            0.0
        }
    }
}

/// Manual CCI (commodity channel index) over the typical price.
///
/// Uses whatever history is available until the window fills.
pub struct ManualCci {
    period: usize,
    window: VecDeque<f64>,
}

impl ManualCci {
    const SCALE: f64 = 0.015;

    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
            window: VecDeque::with_capacity(period.max(1)),
        }
    }

    pub fn next(&mut self, high: f64, low: f64, close: f64) -> f64 {
        let typical = (high + low + close) / 3.0;
        if self.window.len() == self.period {
            self.window.pop_front();
        }
        self.window.push_back(typical);

        let n = self.window.len() as f64;
        let mean = self.window.iter().sum::<f64>() / n;
        let mean_dev = self.window.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / n;

        if mean_dev > 0.0 {
            (typical - mean) / (Self::SCALE * mean_dev)
        } else {
            0.0
        }
    }
}
