//! Fixed-length message framing against a sync pattern.

use trx_sample::now_millis;

use crate::sync::SyncPattern;
use crate::BitSink;

/// A framed message: the accumulated bits (sync pattern included, oldest
/// first) and the wall-clock time at which sync was detected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bits: Vec<bool>,
    timestamp: u64,
}

impl Message {
    fn new(bits: Vec<bool>, timestamp: u64) -> Self {
        Self { bits, timestamp }
    }

    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Millis since epoch at sync detection.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Pack the bits MSB-first into bytes, zero-padding the final byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; self.bits.len().div_ceil(8)];
        for (index, &bit) in self.bits.iter().enumerate() {
            if bit {
                bytes[index / 8] |= 0x80 >> (index % 8);
            }
        }
        bytes
    }
}

/// Receives completed messages from a [`MessageFramer`].
pub trait MessageListener {
    fn receive(&mut self, message: Message);
}

impl<F: FnMut(Message)> MessageListener for F {
    fn receive(&mut self, message: Message) {
        self(message)
    }
}

/// Watches a demodulated bit stream for a sync pattern and, on match,
/// accumulates a fixed-length message before forwarding it to the
/// listener.
///
/// One message is assembled at a time; bits arriving during assembly are
/// not simultaneously searched for a second overlapping sync. After a
/// stream discontinuity (retune, squelch drop) call [`reset`] to discard
/// partial state and force resynchronization.
///
/// [`reset`]: MessageFramer::reset
pub struct MessageFramer<L: MessageListener> {
    sync: SyncPattern,
    message_length: usize,
    listener: L,
    shift_register: u64,
    bits_seen: usize,
    assembly: Option<Vec<bool>>,
    sync_timestamp: u64,
}

impl<L: MessageListener> MessageFramer<L> {
    /// Create a framer for messages of `message_length` bits (counted
    /// from the first sync bit).
    pub fn new(sync: SyncPattern, message_length: usize, listener: L) -> Self {
        assert!(
            message_length >= sync.len(),
            "message length {} shorter than sync pattern ({} bits)",
            message_length,
            sync.len()
        );
        Self {
            sync,
            message_length,
            listener,
            shift_register: 0,
            bits_seen: 0,
            assembly: None,
            sync_timestamp: 0,
        }
    }

    /// Feed one demodulated bit.
    pub fn process(&mut self, bit: bool) {
        if let Some(bits) = self.assembly.as_mut() {
            bits.push(bit);
            if bits.len() == self.message_length {
                let bits = self.assembly.take().expect("assembly in progress");
                self.listener.receive(Message::new(bits, self.sync_timestamp));
            }
            return;
        }

        self.shift_register = (self.shift_register << 1) | bit as u64;
        if self.bits_seen < self.sync.len() {
            self.bits_seen += 1;
            if self.bits_seen < self.sync.len() {
                return;
            }
        }

        if self.sync.matches(self.shift_register) {
            let bits: Vec<bool> = self.sync.bits().collect();
            self.sync_timestamp = now_millis();
            // Fresh search state for the stream after this message.
            self.shift_register = 0;
            self.bits_seen = 0;
            if bits.len() == self.message_length {
                self.listener.receive(Message::new(bits, self.sync_timestamp));
            } else {
                let mut assembly = Vec::with_capacity(self.message_length);
                assembly.extend(bits);
                self.assembly = Some(assembly);
            }
        }
    }

    /// Discard the shift register and any partially-accumulated message,
    /// forcing resynchronization on the next sync pattern.
    pub fn reset(&mut self) {
        self.shift_register = 0;
        self.bits_seen = 0;
        self.assembly = None;
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

impl<L: MessageListener> BitSink for MessageFramer<L> {
    fn receive(&mut self, bit: bool) {
        self.process(bit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    const SYNC: SyncPattern = SyncPattern::new(0b1100_1010, 8);

    fn collect_framer(
        message_length: usize,
    ) -> (MessageFramer<impl FnMut(Message)>, Rc<RefCell<Vec<Message>>>) {
        let messages = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&messages);
        let framer = MessageFramer::new(SYNC, message_length, move |message: Message| {
            sink.borrow_mut().push(message);
        });
        (framer, messages)
    }

    fn feed(framer: &mut MessageFramer<impl FnMut(Message)>, bits: &[u8]) {
        for &bit in bits {
            framer.process(bit == 1);
        }
    }

    #[test]
    fn test_frames_message_after_sync() {
        let (mut framer, messages) = collect_framer(12);

        // Garbage prefix, then the sync pattern, then 4 payload bits.
        feed(&mut framer, &[0, 0, 1, 0, 1]);
        feed(&mut framer, &[1, 1, 0, 0, 1, 0, 1, 0]);
        feed(&mut framer, &[1, 0, 1, 1]);

        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        let message = &messages[0];
        assert_eq!(message.len(), 12);
        assert_eq!(
            &message.bits()[..8],
            &[true, true, false, false, true, false, true, false],
            "message must start with the sync pattern"
        );
        assert_eq!(&message.bits()[8..], &[true, false, true, true]);
        assert!(message.timestamp() > 0);
    }

    #[test]
    fn test_no_message_without_sync() {
        let (mut framer, messages) = collect_framer(12);
        feed(&mut framer, &[0; 64]);
        feed(&mut framer, &[1; 64]);
        assert!(messages.borrow().is_empty());
    }

    #[test]
    fn test_reset_discards_partial_message() {
        let (mut framer, messages) = collect_framer(12);

        feed(&mut framer, &[1, 1, 0, 0, 1, 0, 1, 0]);
        feed(&mut framer, &[1, 1]);
        framer.reset();
        feed(&mut framer, &[0, 0]);

        assert!(
            messages.borrow().is_empty(),
            "reset mid-assembly must discard the partial message"
        );
    }

    #[test]
    fn test_back_to_back_messages() {
        let (mut framer, messages) = collect_framer(10);

        for _ in 0..2 {
            feed(&mut framer, &[1, 1, 0, 0, 1, 0, 1, 0]);
            feed(&mut framer, &[0, 1]);
        }

        assert_eq!(messages.borrow().len(), 2);
    }

    #[test]
    fn test_message_to_bytes() {
        let message = Message::new(
            vec![true, true, false, false, true, false, true, false, true],
            0,
        );
        assert_eq!(message.to_bytes(), vec![0b1100_1010, 0b1000_0000]);
    }

    #[test]
    fn test_sync_only_message_dispatches_immediately() {
        let (mut framer, messages) = collect_framer(8);
        feed(&mut framer, &[1, 1, 0, 0, 1, 0, 1, 0]);
        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].len(), 8);
    }
}
