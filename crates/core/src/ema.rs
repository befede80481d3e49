// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 TickRPC contributors

use crate::{Error, Result};

/// An exponential moving average with a fixed smoothing factor, per §2.2 and
/// §4.7 (smoothing factor 0.25 for every statistics-surface counter).
///
/// `value' = alpha * sample + (1 - alpha) * value`. The first sample seeds
/// the average directly rather than smoothing against zero, so a counter
/// does not need an artificial warm-up period before it reflects reality.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    alpha: f64,
    value: Option<f64>,
}

impl Ema {
    pub const DEFAULT_ALPHA: f64 = 0.25;

    pub fn new(alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(Error::InvalidAlpha(alpha.to_string()));
        }
        Ok(Self { alpha, value: None })
    }

    pub fn with_default_alpha() -> Self {
        Self::new(Self::DEFAULT_ALPHA).expect("DEFAULT_ALPHA is always in (0.0, 1.0]")
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(current) => self.alpha * sample + (1.0 - self.alpha) * current,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }
}

impl Default for Ema {
    fn default() -> Self {
        Self::with_default_alpha()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_sample_seeds_the_average() {
        let mut ema = Ema::with_default_alpha();
        assert_eq!(ema.update(100.0), 100.0);
    }

    #[test]
    fn subsequent_samples_are_smoothed() {
        let mut ema = Ema::with_default_alpha();
        ema.update(100.0);
        let second = ema.update(0.0);
        assert_eq!(second, 75.0);
    }

    #[test]
    fn invalid_alpha_is_rejected() {
        assert!(Ema::new(0.0).is_err());
        assert!(Ema::new(1.5).is_err());
        assert!(Ema::new(1.0).is_ok());
    }

    #[test]
    fn converges_toward_a_constant_input() {
        let mut ema = Ema::with_default_alpha();
        for _ in 0..50 {
            ema.update(10.0);
        }
        assert!((ema.value() - 10.0).abs() < 1e-6);
    }
}
