//! Phase-accumulator quadrature oscillator.

use std::f64::consts::PI;

use crate::DspError;

use super::{Oscillator, Tuning};

/// Quadrature oscillator driven by a wrapped phase accumulator with a
/// `sin_cos()` evaluation per rotation.
///
/// Exact by construction (the phase never leaves [-pi, pi], so there is
/// nothing to drift), at the cost of a trigonometric evaluation per
/// sample. The recursive variant is tested against this one.
#[derive(Debug, Clone)]
pub struct PhasorOscillator {
    tuning: Tuning,
    phase: f64,
    phase_increment: f64,
    inphase: f64,
    quadrature: f64,
}

impl PhasorOscillator {
    pub fn new(frequency: f64, sample_rate: f64) -> Result<Self, DspError> {
        let tuning = Tuning::new(frequency, sample_rate)?;
        Ok(Self {
            tuning,
            phase: 0.0,
            phase_increment: tuning.phase_increment(),
            inphase: 1.0,
            quadrature: 0.0,
        })
    }

    /// Current accumulator phase in radians, wrapped to [-pi, pi].
    pub fn phase(&self) -> f64 {
        self.phase
    }
}

impl Oscillator for PhasorOscillator {
    fn frequency(&self) -> f64 {
        self.tuning.frequency()
    }

    fn set_frequency(&mut self, frequency: f64) -> Result<(), DspError> {
        self.tuning.set_frequency(frequency)?;
        self.phase_increment = self.tuning.phase_increment();
        Ok(())
    }

    fn sample_rate(&self) -> f64 {
        self.tuning.sample_rate()
    }

    fn set_sample_rate(&mut self, sample_rate: f64) -> Result<(), DspError> {
        self.tuning.set_sample_rate(sample_rate)?;
        self.phase_increment = self.tuning.phase_increment();
        Ok(())
    }

    fn inphase(&self) -> f32 {
        self.inphase as f32
    }

    fn quadrature(&self) -> f32 {
        self.quadrature as f32
    }

    fn rotate(&mut self) {
        self.phase += self.phase_increment;
        if self.phase > PI {
            self.phase -= 2.0 * PI;
        } else if self.phase < -PI {
            self.phase += 2.0 * PI;
        }
        let (sin, cos) = self.phase.sin_cos();
        self.inphase = cos;
        self.quadrature = sin;
    }
}
