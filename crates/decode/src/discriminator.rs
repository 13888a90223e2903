//! Quadrature FM discriminator and bit slicer: the concrete symbol-rate
//! boundary that turns baseband I/Q into the bit stream the framer
//! consumes.

use num_complex::Complex32;

/// FM frequency discriminator: `arg(y[n] * conj(y[n-1]))`, one output
/// sample per complex input sample, in radians per sample.
pub struct FmDiscriminator {
    previous: Complex32,
}

impl FmDiscriminator {
    pub fn new() -> Self {
        Self {
            previous: Complex32::new(0.0, 0.0),
        }
    }

    /// Clear history after a stream discontinuity.
    pub fn reset(&mut self) {
        self.previous = Complex32::new(0.0, 0.0);
    }

    /// Discriminate one complex sample.
    pub fn process(&mut self, inphase: f32, quadrature: f32) -> f32 {
        let sample = Complex32::new(inphase, quadrature);
        let product = sample * self.previous.conj();
        self.previous = sample;
        product.arg()
    }

    /// Discriminate a block of interleaved I/Q samples.
    pub fn process_interleaved(&mut self, samples: &[f32]) -> Vec<f32> {
        assert!(
            samples.len() % 2 == 0,
            "interleaved slice has odd length {}",
            samples.len()
        );
        samples
            .chunks_exact(2)
            .map(|pair| self.process(pair[0], pair[1]))
            .collect()
    }
}

impl Default for FmDiscriminator {
    fn default() -> Self {
        Self::new()
    }
}

/// Slices discriminator output into bits at a fixed samples-per-symbol
/// rate, one bit per symbol period, positive frequency = 1.
pub struct BitSlicer {
    samples_per_symbol: usize,
    position: usize,
}

impl BitSlicer {
    pub fn new(samples_per_symbol: usize) -> Self {
        assert!(samples_per_symbol > 0, "samples per symbol must be non-zero");
        Self {
            samples_per_symbol,
            position: 0,
        }
    }

    /// Feed one discriminator sample; yields a bit once per symbol.
    pub fn process(&mut self, sample: f32) -> Option<bool> {
        self.position += 1;
        if self.position == self.samples_per_symbol {
            self.position = 0;
            Some(sample > 0.0)
        } else {
            None
        }
    }

    /// Restart the symbol clock.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}
