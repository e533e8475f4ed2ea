//! Receive capture queue
//!
//! Filled from the UART receive interrupt, drained by the protocol code.
//! The queue lives in a `static` shared between the two, so all access
//! goes through a critical-section mutex.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use torqvalve_hal::RxFifo;

/// Default queue depth: the longest status reply with room to spare
pub const DEFAULT_CAPACITY: usize = 32;

/// Ring of byte slots; an empty slot reads as `None`
struct Slots<const N: usize> {
    bytes: [Option<u8>; N],
    write: usize,
    read: usize,
    overruns: u32,
}

impl<const N: usize> Slots<N> {
    const fn new() -> Self {
        Self {
            bytes: [None; N],
            write: 0,
            read: 0,
            overruns: 0,
        }
    }

    fn push(&mut self, byte: u8) {
        let slot = &mut self.bytes[self.write];
        if slot.is_some() {
            // Full: the oldest unread byte stays, the new one is dropped
            self.overruns = self.overruns.wrapping_add(1);
            return;
        }
        *slot = Some(byte);
        self.write = (self.write + 1) % N;
    }

    fn take(&mut self) -> Option<u8> {
        let byte = self.bytes[self.read].take()?;
        self.read = (self.read + 1) % N;
        Some(byte)
    }

    fn clear(&mut self) {
        self.bytes = [None; N];
        self.write = 0;
        self.read = 0;
    }
}

/// Bounded queue of bytes captured by the receive interrupt
///
/// Bytes come out in arrival order. Every slot is emptied as it is read,
/// so a read past the last captured byte yields `None`, never stale data.
pub struct CaptureQueue<const N: usize = DEFAULT_CAPACITY> {
    slots: Mutex<CriticalSectionRawMutex, RefCell<Slots<N>>>,
}

impl<const N: usize> Default for CaptureQueue<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CaptureQueue<N> {
    /// Create an empty queue; usable in a `static`
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new(Slots::new())),
        }
    }

    /// Receive interrupt body: move every readable byte into the queue
    pub fn on_receive_interrupt<F: RxFifo + ?Sized>(&self, fifo: &mut F) {
        self.slots.lock(|slots| {
            let mut slots = slots.borrow_mut();
            while let Some(byte) = fifo.read_byte() {
                slots.push(byte);
            }
        });
    }

    /// Store a single byte as if it had been received
    pub fn push(&self, byte: u8) {
        self.slots.lock(|slots| slots.borrow_mut().push(byte));
    }

    /// Check whether the next slot holds a byte
    pub fn is_available(&self) -> bool {
        self.slots.lock(|slots| {
            let slots = slots.borrow();
            slots.bytes[slots.read].is_some()
        })
    }

    /// Take the next captured byte
    pub fn take(&self) -> Option<u8> {
        self.slots.lock(|slots| slots.borrow_mut().take())
    }

    /// Drop everything captured so far
    pub fn clear(&self) {
        self.slots.lock(|slots| slots.borrow_mut().clear());
    }

    /// Bytes dropped because the queue was full
    pub fn overruns(&self) -> u32 {
        self.slots.lock(|slots| slots.borrow().overruns)
    }
}

#[cfg(test)]
mod tests {
    use std::vec::Vec;

    use super::*;

    struct Fifo(Vec<u8>);

    impl RxFifo for Fifo {
        fn read_byte(&mut self) -> Option<u8> {
            if self.0.is_empty() {
                None
            } else {
                Some(self.0.remove(0))
            }
        }

        fn readable(&self) -> bool {
            !self.0.is_empty()
        }
    }

    #[test]
    fn test_arrival_order() {
        let queue: CaptureQueue<8> = CaptureQueue::new();
        queue.on_receive_interrupt(&mut Fifo([1, 2, 3].into()));
        assert!(queue.is_available());
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert_eq!(queue.take(), Some(3));
        assert_eq!(queue.take(), None);
        assert!(!queue.is_available());
    }

    #[test]
    fn test_empty_slot_reads_none_after_wrap() {
        let queue: CaptureQueue<4> = CaptureQueue::new();
        for round in 0..3u8 {
            queue.on_receive_interrupt(&mut Fifo([round, round + 10, round + 20].into()));
            assert_eq!(queue.take(), Some(round));
            assert_eq!(queue.take(), Some(round + 10));
            assert_eq!(queue.take(), Some(round + 20));
            assert_eq!(queue.take(), None);
        }
    }

    #[test]
    fn test_overrun_drops_newest() {
        let queue: CaptureQueue<4> = CaptureQueue::new();
        let mut fifo = Fifo((0..6).collect());
        queue.on_receive_interrupt(&mut fifo);
        // The interrupt always drains the hardware FIFO
        assert!(!fifo.readable());
        assert_eq!(queue.overruns(), 2);
        let drained: Vec<u8> = core::iter::from_fn(|| queue.take()).collect();
        assert_eq!(drained, [0, 1, 2, 3]);
    }

    #[test]
    fn test_clear() {
        let queue: CaptureQueue<4> = CaptureQueue::new();
        queue.push(0xAA);
        queue.push(0xBB);
        queue.take();
        queue.clear();
        assert_eq!(queue.take(), None);
        queue.push(0xCC);
        assert_eq!(queue.take(), Some(0xCC));
    }

    #[test]
    fn test_usable_as_static() {
        static QUEUE: CaptureQueue = CaptureQueue::new();
        QUEUE.push(7);
        assert_eq!(QUEUE.take(), Some(7));
    }
}
