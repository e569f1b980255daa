//! Rolling volatility bands (Bollinger bands).
//!
//! For every position `i >= window - 1` the band is computed over the trailing
//! `window` readings `[i + 1 - window, i]`:
//!
//! ```text
//! mean  = Σx / n
//! std   = sqrt(Σ(x - mean)² / (n - 1))      sample standard deviation
//! upper = mean + k·std
//! lower = mean - k·std
//! ```
//!
//! Positions with an incomplete window, or whose window contains a missing
//! reading, have no band.

use serde::Serialize;

use crate::ValidationError;

/// Number of consecutive observations per band window.
pub const DEFAULT_WINDOW: usize = 20;
/// Standard deviations between the mean and each band.
pub const DEFAULT_WIDTH: f64 = 2.0;

/// Band values at one position of the input series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    pub mean: f64,
    pub std_dev: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Rolling mean ± `width` sample standard deviations over `window` readings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    window: usize,
    width: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            width: DEFAULT_WIDTH,
        }
    }
}

impl BollingerBands {
    pub fn new(window: usize, width: f64) -> Result<Self, ValidationError> {
        if window < 2 {
            return Err(ValidationError::BandWindowTooSmall { window });
        }
        if !width.is_finite() || width < 0.0 {
            return Err(ValidationError::InvalidBandWidth);
        }
        Ok(Self { window, width })
    }

    pub const fn window(&self) -> usize {
        self.window
    }

    pub const fn width(&self) -> f64 {
        self.width
    }

    /// Band at every position of `readings`; `None` where it is undefined.
    ///
    /// The output has the same length as the input.
    pub fn compute(&self, readings: &[Option<f64>]) -> Vec<Option<BandPoint>> {
        let mut output = Vec::with_capacity(readings.len());
        for end in 0..readings.len() {
            if end + 1 < self.window {
                output.push(None);
                continue;
            }
            let window = &readings[end + 1 - self.window..=end];
            output.push(self.band(window));
        }
        output
    }

    fn band(&self, window: &[Option<f64>]) -> Option<BandPoint> {
        let values = window.iter().copied().collect::<Option<Vec<f64>>>()?;
        let mean = mean(&values);
        let std_dev = sample_std_dev(&values, mean);
        Some(BandPoint {
            mean,
            std_dev,
            upper: mean + self.width * std_dev,
            lower: mean - self.width * std_dev,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Two-pass sample standard deviation; `values` holds at least two readings.
fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    let squares = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>();
    (squares / (values.len() - 1) as f64).sqrt()
}
