//! Phase-accumulator sine oscillator.

use std::f64::consts::TAU;

/// Sine oscillator with a normalized phase in `[0, 1)`.
#[derive(Debug, Clone, Copy)]
pub struct SineOscillator {
    sample_rate: f64,
    omega: f64,
    delta_omega: f64,
}

impl SineOscillator {
    /// Create an oscillator at `sample_rate` with zero frequency.
    pub fn new(sample_rate: f64) -> Self {
        Self {
            sample_rate,
            omega: 0.0,
            delta_omega: 0.0,
        }
    }

    /// Set the frequency in Hz. Takes effect on the next sample.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.delta_omega = frequency / self.sample_rate;
    }

    /// Current frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.delta_omega * self.sample_rate
    }

    /// Restart at phase zero.
    pub fn reset(&mut self) {
        self.omega = 0.0;
    }

    /// Produce the next sample and advance the phase.
    #[inline]
    pub fn process(&mut self) -> f64 {
        let sample = (self.omega * TAU).sin();
        self.omega += self.delta_omega;
        if self.omega >= 1.0 {
            self.omega -= 1.0;
        }
        sample
    }
}

impl Default for SineOscillator {
    fn default() -> Self {
        Self::new(basic_au_core::DEFAULT_SAMPLE_RATE)
    }
}
