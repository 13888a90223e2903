pub mod oscillator;

pub use oscillator::{LowPhaseNoiseOscillator, Oscillator, PhasorOscillator};

use thiserror::Error;

/// Configuration errors surfaced synchronously by oscillator constructors,
/// setters, and batch operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DspError {
    /// Sample rate must be positive and finite; a zero rate makes the
    /// phase increment undefined and would silently poison every
    /// subsequent rotation with NaN.
    #[error("invalid sample rate {0} Hz: must be positive and finite")]
    InvalidSampleRate(f64),

    /// Frequency must be finite for the same reason. Zero is legal and
    /// means the oscillator is disabled.
    #[error("invalid frequency {0} Hz: must be finite")]
    InvalidFrequency(f64),

    /// Interleaved complex sample slices must contain whole I/Q pairs.
    #[error("interleaved sample slice has odd length {0}")]
    OddSampleLength(usize),
}
