//! Decode-chain plumbing downstream of the mixer: a symbol-rate
//! demodulator boundary, and a message framer that watches the resulting
//! bit stream for a protocol's synchronization pattern.

pub mod discriminator;
pub mod framer;
pub mod sync;

pub use discriminator::{BitSlicer, FmDiscriminator};
pub use framer::{Message, MessageFramer, MessageListener};
pub use sync::SyncPattern;

/// Receiver of a continuous demodulated bit stream, one bit per symbol
/// period. The demodulator side pushes; implementors must not assume any
/// framing beyond bit order.
pub trait BitSink {
    fn receive(&mut self, bit: bool);
}
