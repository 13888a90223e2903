//! Quadrature oscillators for tone generation and heterodyne mixing.
//!
//! Two conforming variants are provided: [`LowPhaseNoiseOscillator`], a
//! gain-corrected recursive rotation suitable for long-running per-sample
//! use, and [`PhasorOscillator`], a phase accumulator that pays a
//! trigonometric evaluation per sample but is exact by construction. Both
//! implement [`Oscillator`], which carries the batch generation and mixing
//! algorithms as provided methods.

mod low_phase_noise;
mod phasor;

pub use low_phase_noise::LowPhaseNoiseOscillator;
pub use phasor::PhasorOscillator;

use crate::DspError;
use trx_sample::{ComplexBuffer, SampleBuffer};

const TWO_PI: f64 = 2.0 * std::f64::consts::PI;

/// A complex oscillator generating a unit-amplitude tone one sample at a
/// time.
///
/// # Threading
///
/// Implementations hold exclusively-mutated state and provide no internal
/// locking. `rotate()`, the `generate_*`/`fill_*` batch calls, and
/// `mix_complex()` all advance the same phase state and must be confined
/// to one thread. Retuning from a control thread must either be marshaled
/// onto the processing thread (e.g. over a channel drained between sample
/// blocks) or the whole instance must be guarded by an external lock.
///
/// # Mixing convention
///
/// The local tone is `e^(+j*2*pi*f*t)`: mixing with a positive-frequency
/// oscillator shifts input spectral content up by `f` hertz. Down-convert
/// by constructing the oscillator with a negative frequency.
pub trait Oscillator {
    /// Frequency of the generated tone in hertz.
    fn frequency(&self) -> f64;

    /// Set the tone frequency in hertz. Rotation coefficients are
    /// recomputed immediately; the current I/Q state is untouched, so
    /// phase is continuous across the change.
    fn set_frequency(&mut self, frequency: f64) -> Result<(), DspError>;

    /// Sample rate in hertz.
    fn sample_rate(&self) -> f64;

    /// Set the sample rate in hertz. Rejects non-positive or non-finite
    /// rates; rotation coefficients are recomputed immediately.
    fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), DspError>;

    /// True when the oscillator has a non-zero frequency.
    fn is_enabled(&self) -> bool {
        self.frequency() != 0.0
    }

    /// Current inphase value. Reading does not advance the oscillator;
    /// call [`rotate`](Oscillator::rotate) first for each new sample.
    fn inphase(&self) -> f32;

    /// Current quadrature value. Reading does not advance the oscillator.
    fn quadrature(&self) -> f32;

    /// Advance the oscillator by exactly one sample period.
    fn rotate(&mut self);

    /// Generate `count` real samples, each one rotation apart.
    fn generate_real(&mut self, count: usize) -> Vec<f32> {
        let mut samples = Vec::with_capacity(count);
        for _ in 0..count {
            self.rotate();
            samples.push(self.inphase());
        }
        samples
    }

    /// Generate `count` complex samples interleaved as I0,Q0,I1,Q1,...
    /// The returned vector has length `2 * count`; each pair is one
    /// rotation apart.
    fn generate_complex(&mut self, count: usize) -> Vec<f32> {
        let mut samples = Vec::with_capacity(count * 2);
        for _ in 0..count {
            self.rotate();
            samples.push(self.inphase());
            samples.push(self.quadrature());
        }
        samples
    }

    /// Fill a reusable buffer with real samples and stamp it with the
    /// fill time. Buffer capacity determines the sample count.
    fn fill_real(&mut self, buffer: &mut SampleBuffer) {
        for sample in buffer.samples_mut() {
            self.rotate();
            *sample = self.inphase();
        }
        buffer.stamp_now();
    }

    /// Fill a reusable buffer with interleaved complex samples and stamp
    /// it with the fill time.
    fn fill_complex(&mut self, buffer: &mut ComplexBuffer) {
        for pair in buffer.samples_mut().chunks_exact_mut(2) {
            self.rotate();
            pair[0] = self.inphase();
            pair[1] = self.quadrature();
        }
        buffer.stamp_now();
    }

    /// Heterodyne an interleaved complex sample slice against this
    /// oscillator's tone, returning a new vector of equal length.
    ///
    /// Mixing consumes one rotation per input pair; generation and mixing
    /// share the same phase state.
    fn mix_complex(&mut self, samples: &[f32]) -> Result<Vec<f32>, DspError> {
        if samples.len() % 2 != 0 {
            return Err(DspError::OddSampleLength(samples.len()));
        }
        let mut mixed = Vec::with_capacity(samples.len());
        for pair in samples.chunks_exact(2) {
            self.rotate();
            let i_lo = self.inphase();
            let q_lo = self.quadrature();
            mixed.push(pair[0] * i_lo - pair[1] * q_lo);
            mixed.push(pair[0] * q_lo + pair[1] * i_lo);
        }
        Ok(mixed)
    }
}

/// The (frequency, sample rate) pair shared by every oscillator variant,
/// with the validation both setters need.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Tuning {
    frequency: f64,
    sample_rate: f64,
}

impl Tuning {
    pub(crate) fn new(frequency: f64, sample_rate: f64) -> Result<Self, DspError> {
        let mut tuning = Tuning {
            frequency: 0.0,
            sample_rate: 1.0,
        };
        tuning.set_sample_rate(sample_rate)?;
        tuning.set_frequency(frequency)?;
        Ok(tuning)
    }

    pub(crate) fn frequency(&self) -> f64 {
        self.frequency
    }

    pub(crate) fn set_frequency(&mut self, frequency: f64) -> Result<(), DspError> {
        if !frequency.is_finite() {
            return Err(DspError::InvalidFrequency(frequency));
        }
        self.frequency = frequency;
        Ok(())
    }

    pub(crate) fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub(crate) fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), DspError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Rotation angle per sample in radians.
    pub(crate) fn phase_increment(&self) -> f64 {
        TWO_PI * self.frequency / self.sample_rate
    }
}
