//! Receive buffer shared between the RX interrupt and the control loop.
//!
//! The communication module's UART raises one interrupt per received byte.
//! The handler must never block and never allocate, so it appends into a
//! fixed buffer; the control loop later scans that buffer for response
//! tokens and remote commands, and clears it.
//!
//! # Discipline
//!
//! ```text
//!  RX interrupt ──append()──> TransportBuffer <──snapshot()/clear()── control loop
//!   (producer, exactly one)                        (consumer, exactly one)
//! ```
//!
//! - Only [`RxProducer::append`] writes bytes. There is exactly one producer
//!   handle per buffer.
//! - Only the consumer reads or clears. Every read first loads the length,
//!   then bounds the scan to it, so a length that is mid-increment is never
//!   read past.
//! - The byte after the last received byte is kept at
//!   [`RX_TERMINATOR`], so the content is always terminator-delimited.
//! - When full, further bytes are dropped (and counted) until the consumer
//!   clears.
//!
//! All storage is atomic, so the producer may run on another thread on host
//! builds (a serial reader task) just as well as in interrupt context.
//!
//! # Example
//!
//! ```
//! use seatlink_protocol::TransportBuffer;
//!
//! let (buffer, producer) = TransportBuffer::with_producer(64);
//! for byte in b"\r\nOK\r\n" {
//!     producer.append(*byte);
//! }
//!
//! let mut scratch = Vec::new();
//! buffer.snapshot_into(&mut scratch);
//! assert_eq!(scratch, b"\r\nOK\r\n");
//!
//! buffer.clear();
//! assert!(buffer.is_empty());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, AtomicUsize, Ordering};

use seatlink_core::constants::{RX_BUFFER_SIZE, RX_TERMINATOR};

/// Bounded, terminator-delimited byte buffer with one producer and one
/// consumer.
#[derive(Debug)]
pub struct TransportBuffer {
    /// Storage; one slot more than the usable capacity for the terminator.
    bytes: Box<[AtomicU8]>,

    /// Number of valid bytes. Published by the producer, reset by the consumer.
    len: AtomicUsize,

    /// Bytes dropped because the buffer was full, since the last
    /// [`take_dropped`](Self::take_dropped).
    dropped: AtomicU32,
}

impl TransportBuffer {
    /// Create a buffer of `size` slots (`size - 1` usable bytes).
    ///
    /// # Panics
    ///
    /// Panics if `size < 2`; a buffer without room for one byte and its
    /// terminator is a construction bug.
    pub fn new(size: usize) -> Self {
        assert!(size >= 2, "receive buffer needs room for a byte and its terminator");
        Self {
            bytes: (0..size).map(|_| AtomicU8::new(RX_TERMINATOR)).collect(),
            len: AtomicUsize::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Create a shared buffer together with its single producer handle.
    pub fn with_producer(size: usize) -> (Arc<Self>, RxProducer) {
        let buffer = Arc::new(Self::new(size));
        let producer = RxProducer {
            buffer: Arc::clone(&buffer),
        };
        (buffer, producer)
    }

    /// Usable capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.bytes.len() - 1
    }

    /// Current length. May grow immediately after the call returns.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when `margin` bytes or fewer remain free.
    pub fn is_nearly_full(&self, margin: usize) -> bool {
        self.len() + margin >= self.capacity()
    }

    fn append(&self, byte: u8) -> bool {
        let mut len = self.len.load(Ordering::Acquire);
        loop {
            if len >= self.capacity() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return false;
            }
            self.bytes[len].store(byte, Ordering::Relaxed);
            self.bytes[len + 1].store(RX_TERMINATOR, Ordering::Relaxed);
            // A concurrent clear() moves len under us; retry at the new end.
            match self
                .len
                .compare_exchange(len, len + 1, Ordering::Release, Ordering::Acquire)
            {
                Ok(_) => return true,
                Err(current) => len = current,
            }
        }
    }

    /// Discard the content.
    pub fn clear(&self) {
        self.bytes[0].store(RX_TERMINATOR, Ordering::Relaxed);
        self.len.store(0, Ordering::Release);
    }

    /// Copy the current content into `out`, replacing what `out` held.
    ///
    /// Returns the snapshotted length.
    pub fn snapshot_into(&self, out: &mut Vec<u8>) -> usize {
        let len = self.len();
        out.clear();
        out.extend(self.bytes[..len].iter().map(|b| b.load(Ordering::Relaxed)));
        len
    }

    /// Owned copy of the current content.
    pub fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.capacity());
        self.snapshot_into(&mut out);
        out
    }

    /// True when the slot after the last byte holds the terminator.
    pub fn is_terminated(&self) -> bool {
        let len = self.len();
        self.bytes[len].load(Ordering::Relaxed) == RX_TERMINATOR
    }

    /// Number of bytes dropped since the last call, resetting the counter.
    pub fn take_dropped(&self) -> u32 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

impl Default for TransportBuffer {
    fn default() -> Self {
        Self::new(RX_BUFFER_SIZE)
    }
}

/// The single write handle of a [`TransportBuffer`].
///
/// Hand this to the RX interrupt (or the serial reader task on host builds).
/// It is `Send` but deliberately not `Clone`: a second producer would break
/// the buffer's single-writer discipline.
#[derive(Debug)]
pub struct RxProducer {
    buffer: Arc<TransportBuffer>,
}

impl RxProducer {
    /// Append one received byte. Returns `false` if it was dropped because
    /// the buffer is full.
    pub fn append(&self, byte: u8) -> bool {
        self.buffer.append(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(producer: &RxProducer, bytes: &[u8]) {
        for byte in bytes {
            producer.append(*byte);
        }
    }

    #[test]
    fn test_new_buffer_is_empty_and_terminated() {
        let buffer = TransportBuffer::new(16);
        assert!(buffer.is_empty());
        assert!(buffer.is_terminated());
        assert_eq!(buffer.capacity(), 15);
    }

    #[test]
    fn test_append_and_snapshot() {
        let (buffer, producer) = TransportBuffer::with_producer(16);
        feed(&producer, b"OK\r\n");
        assert_eq!(buffer.snapshot(), b"OK\r\n");
        assert_eq!(buffer.len(), 4);
        assert!(buffer.is_terminated());
    }

    #[test]
    fn test_overflow_drops_until_cleared() {
        let (buffer, producer) = TransportBuffer::with_producer(5);
        feed(&producer, b"abcdef");
        assert_eq!(buffer.snapshot(), b"abcd");
        assert!(buffer.is_terminated());
        assert_eq!(buffer.take_dropped(), 2);
        assert_eq!(buffer.take_dropped(), 0);

        assert!(!producer.append(b'g'));
        buffer.clear();
        assert!(producer.append(b'h'));
        assert_eq!(buffer.snapshot(), b"h");
    }

    #[test]
    fn test_clear_empties_and_keeps_terminator() {
        let (buffer, producer) = TransportBuffer::with_producer(16);
        feed(&producer, b"+MQTTCONNECTED");
        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.is_terminated());
        assert!(buffer.snapshot().is_empty());
    }

    #[test]
    fn test_nearly_full() {
        let (buffer, producer) = TransportBuffer::with_producer(11);
        feed(&producer, b"12345");
        assert!(!buffer.is_nearly_full(4));
        assert!(buffer.is_nearly_full(5));
    }

    #[test]
    fn test_snapshot_into_reuses_scratch() {
        let (buffer, producer) = TransportBuffer::with_producer(16);
        let mut scratch = b"stale content".to_vec();
        feed(&producer, b"ready");
        assert_eq!(buffer.snapshot_into(&mut scratch), 5);
        assert_eq!(scratch, b"ready");
    }

    #[test]
    fn test_producer_on_other_thread() {
        let (buffer, producer) = TransportBuffer::with_producer(256);
        let writer = std::thread::spawn(move || {
            for byte in b"WIFI CONNECTED\r\nWIFI GOT IP\r\n" {
                producer.append(*byte);
            }
        });
        writer.join().unwrap();
        assert_eq!(buffer.snapshot(), b"WIFI CONNECTED\r\nWIFI GOT IP\r\n");
    }

    #[test]
    #[should_panic(expected = "room for a byte")]
    fn test_too_small_buffer_panics() {
        let _ = TransportBuffer::new(1);
    }
}
