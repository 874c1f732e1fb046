//! Lock-free SPSC event ring between the edge interrupt and the main loop.
//!
//! # Overview
//! - One producer (edge interrupt), one consumer (main loop).
//! - Cursors are free running `u32`s; occupancy is `write - read` in wrapping
//!   arithmetic and the slot for logical index `i` is `i & (P - 1)`.
//! - A full ring rejects the new event instead of overwriting unread data.
//!   Overflow rejections are counted but never reported to the host.
//!   Pushes refused by a closed ring are not overflow and are not counted.
//!
//! # Memory ordering
//! The producer stores the slot, then publishes `write_index` with `Release`.
//! The consumer loads `write_index` with `Acquire` before reading any slot it
//! covers, and publishes `read_index` with `Release` once a slot is consumed so
//! the producer can't reuse it early.
//!
//! # Reset
//! Both cursors return to zero only from [`Consumer::close`], which must run
//! after the producer's interrupt source has been masked.

use atomic_polyfill::{AtomicBool, AtomicU32, Ordering};

#[allow(clippy::declare_interior_mutable_const)]
const EMPTY_SLOT: AtomicU32 = AtomicU32::new(0);

pub struct EventRing<const P: usize> {
    write_index: AtomicU32,
    read_index: AtomicU32,
    dropped: AtomicU32,
    closed: AtomicBool,
    slots: [AtomicU32; P],
}

impl<const P: usize> EventRing<P> {
    const MASK: u32 = {
        assert!(P.is_power_of_two(), "ring capacity must be a power of two");
        assert!(P <= (u32::MAX >> 1) as usize);
        (P - 1) as u32
    };

    pub const fn new() -> Self {
        let _ = Self::MASK;
        Self {
            write_index: AtomicU32::new(0),
            read_index: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
            closed: AtomicBool::new(false),
            slots: [EMPTY_SLOT; P],
        }
    }

    pub const fn capacity(&self) -> usize {
        P
    }

    /// Split into the two role handles.
    ///
    /// Taking `&mut self` for the split makes a second producer or consumer
    /// impossible while the first pair is alive.
    pub fn split(&mut self) -> (Producer<'_, P>, Consumer<'_, P>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    /// Events pending delivery.
    ///
    /// Both cursors are read inside a critical section so the pair is a
    /// single snapshot even when called from a preemptible context.
    pub fn occupancy(&self) -> u32 {
        critical_section::with(|_| {
            let write = self.write_index.load(Ordering::Acquire);
            let read = self.read_index.load(Ordering::Acquire);
            write.wrapping_sub(read)
        })
    }

    /// Events rejected because the ring was full.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Raw cursor values, `(write, read)`.
    pub fn cursors(&self) -> (u32, u32) {
        critical_section::with(|_| {
            (
                self.write_index.load(Ordering::Acquire),
                self.read_index.load(Ordering::Acquire),
            )
        })
    }

    #[inline(always)]
    fn slot(&self, index: u32) -> &AtomicU32 {
        &self.slots[(index & Self::MASK) as usize]
    }

    #[inline]
    fn push_inner(&self, event: u32) -> bool {
        if self.closed.load(Ordering::Acquire) {
            return false;
        }

        let write = self.write_index.load(Ordering::Relaxed);
        let read = self.read_index.load(Ordering::Acquire);
        let next = write.wrapping_add(1);
        if next.wrapping_sub(read) > P as u32 {
            self.count_drop();
            return false;
        }

        // Slot first, then publish: the cursor is the "ready" signal.
        self.slot(write).store(event, Ordering::Relaxed);
        self.write_index.store(next, Ordering::Release);
        true
    }

    #[inline]
    fn count_drop(&self) {
        // Producer is the only writer, load/store is enough.
        let n = self.dropped.load(Ordering::Relaxed);
        self.dropped.store(n.wrapping_add(1), Ordering::Relaxed);
    }
}

impl<const P: usize> Default for EventRing<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Producer half, owned by the edge interrupt.
pub struct Producer<'a, const P: usize> {
    ring: &'a EventRing<P>,
}

impl<'a, const P: usize> Producer<'a, P> {
    /// Queue one event word. Returns `false` and leaves `write_index`
    /// untouched if the ring is full or closed.
    #[inline]
    pub fn try_push(&mut self, event: u32) -> bool {
        self.ring.push_inner(event)
    }

    #[inline]
    pub fn occupancy(&self) -> u32 {
        self.ring.occupancy()
    }

    pub fn ring(&self) -> &'a EventRing<P> {
        self.ring
    }
}

/// Consumer half, owned by the main loop.
pub struct Consumer<'a, const P: usize> {
    ring: &'a EventRing<P>,
}

impl<'a, const P: usize> Consumer<'a, P> {
    #[inline]
    pub fn occupancy(&self) -> u32 {
        self.ring.occupancy()
    }

    /// Drain up to `max` events in arrival order, handing each to `sink`.
    ///
    /// Returns how many events were drained.
    pub fn pop_batch(&mut self, max: u32, mut sink: impl FnMut(u32)) -> u32 {
        let available = self.ring.occupancy();
        let count = available.min(max);

        let mut read = self.ring.read_index.load(Ordering::Relaxed);
        for _ in 0..count {
            let event = self.ring.slot(read).load(Ordering::Relaxed);
            read = read.wrapping_add(1);
            // Hand the slot back before the next one is read.
            self.ring.read_index.store(read, Ordering::Release);
            sink(event);
        }
        count
    }

    /// Drain up to `M` events into a fixed-capacity vector.
    pub fn pop_into<const M: usize>(&mut self, max: u32, out: &mut heapless::Vec<u32, M>) -> u32 {
        let room = (M - out.len()) as u32;
        self.pop_batch(max.min(room), |event| {
            // Bounded by `room` above.
            let _ = out.push(event);
        })
    }

    pub fn dropped(&self) -> u32 {
        self.ring.dropped()
    }

    /// Close the ring and return both cursors to zero.
    ///
    /// The producer's interrupt source must already be masked: this is the
    /// only place the consumer writes `write_index`. Pushes after this are
    /// rejected.
    pub fn close(&mut self) {
        critical_section::with(|_| {
            self.ring.closed.store(true, Ordering::Release);
            self.ring.write_index.store(0, Ordering::Release);
            self.ring.read_index.store(0, Ordering::Release);
        });
    }

    pub fn ring(&self) -> &'a EventRing<P> {
        self.ring
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    fn drain<const P: usize>(consumer: &mut Consumer<'_, P>, max: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let n = consumer.pop_batch(max, |e| out.push(e));
        assert_eq!(n as usize, out.len());
        out
    }

    #[test]
    fn pop_on_empty_returns_nothing() {
        let mut ring = EventRing::<8>::new();
        let (_producer, mut consumer) = ring.split();
        assert!(drain(&mut consumer, 4).is_empty());
        assert_eq!(consumer.occupancy(), 0);
    }

    #[test]
    fn pops_in_push_order() {
        let mut ring = EventRing::<8>::new();
        let (mut producer, mut consumer) = ring.split();

        for e in [10, 11, 12] {
            assert!(producer.try_push(e));
        }
        assert_eq!(consumer.occupancy(), 3);
        assert_eq!(drain(&mut consumer, 10), [10, 11, 12]);
        assert_eq!(consumer.occupancy(), 0);
    }

    #[test]
    fn pop_batch_respects_max() {
        let mut ring = EventRing::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        for e in 0..6 {
            producer.try_push(e);
        }
        assert_eq!(drain(&mut consumer, 4), [0, 1, 2, 3]);
        assert_eq!(drain(&mut consumer, 4), [4, 5]);
    }

    #[test]
    fn fifo_under_interleaving() {
        let mut ring = EventRing::<4>::new();
        let (mut producer, mut consumer) = ring.split();

        // Deterministic interleaving of pushes and partial pops that wraps the
        // physical slots several times.
        let mut pushed = Vec::new();
        let mut popped = Vec::new();
        let mut next = 0u32;
        for round in 0..50u32 {
            for _ in 0..(round % 4) + 1 {
                if producer.try_push(next) {
                    pushed.push(next);
                }
                next += 1;
            }
            popped.extend(drain(&mut consumer, (round % 3) + 1));
        }
        popped.extend(drain(&mut consumer, u32::MAX));

        assert_eq!(popped, pushed);
    }

    #[test]
    fn full_ring_rejects_without_moving_cursor() {
        let mut ring = EventRing::<4>::new();
        let (mut producer, mut consumer) = ring.split();

        for e in 0..4 {
            assert!(producer.try_push(e));
        }
        let before = producer.ring().cursors();
        assert!(!producer.try_push(99));
        assert!(!producer.try_push(100));
        assert_eq!(producer.ring().cursors(), before);
        assert_eq!(producer.occupancy(), 4);
        assert_eq!(consumer.dropped(), 2);

        // Oldest data survives, newest was dropped.
        assert_eq!(drain(&mut consumer, 8), [0, 1, 2, 3]);
        assert!(producer.try_push(4));
        assert_eq!(drain(&mut consumer, 8), [4]);
    }

    #[test]
    fn occupancy_stays_within_capacity() {
        let mut ring = EventRing::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        for step in 0..200u32 {
            producer.try_push(step);
            if step % 5 == 0 {
                drain(&mut consumer, 3);
            }
            let occ = consumer.occupancy();
            assert!(occ <= 8, "occupancy {occ} at step {step}");
        }
    }

    #[test]
    fn cursor_wraparound_keeps_occupancy() {
        let mut ring = EventRing::<4>::new();
        ring.write_index.store(u32::MAX - 1, Ordering::Relaxed);
        ring.read_index.store(u32::MAX - 1, Ordering::Relaxed);
        let (mut producer, mut consumer) = ring.split();

        for e in 0..4 {
            assert!(producer.try_push(e));
        }
        assert!(!producer.try_push(4));
        assert_eq!(consumer.occupancy(), 4);
        assert_eq!(drain(&mut consumer, 8), [0, 1, 2, 3]);
        assert_eq!(producer.ring().cursors(), (2, 2));
    }

    #[test]
    fn close_resets_cursors_and_rejects_pushes() {
        let mut ring = EventRing::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        producer.try_push(1);
        producer.try_push(2);
        drain(&mut consumer, 1);

        consumer.close();
        assert_eq!(consumer.ring().cursors(), (0, 0));
        assert!(consumer.ring().is_closed());
        assert!(!producer.try_push(3));
        // Refused, but not an overflow.
        assert_eq!(consumer.dropped(), 0);
        assert_eq!(consumer.occupancy(), 0);
        assert!(drain(&mut consumer, 8).is_empty());
    }

    #[test]
    fn pop_into_is_bounded_by_vec_capacity() {
        let mut ring = EventRing::<8>::new();
        let (mut producer, mut consumer) = ring.split();
        for e in 0..6 {
            producer.try_push(e);
        }
        let mut out: heapless::Vec<u32, 4> = heapless::Vec::new();
        assert_eq!(consumer.pop_into(16, &mut out), 4);
        assert_eq!(&out[..], &[0, 1, 2, 3]);
        assert_eq!(consumer.occupancy(), 2);
    }

    #[test]
    fn concurrent_producer_and_consumer_preserve_order() {
        use std::sync::atomic::{AtomicBool, Ordering as StdOrdering};

        let mut ring = EventRing::<64>::new();
        let (mut producer, mut consumer) = ring.split();
        let done = AtomicBool::new(false);
        const TOTAL: u32 = 20_000;

        let (accepted, seen) = std::thread::scope(|s| {
            let done = &done;
            let handle = s.spawn(move || {
                let mut accepted = Vec::new();
                for e in 0..TOTAL {
                    if producer.try_push(e) {
                        accepted.push(e);
                    }
                }
                done.store(true, StdOrdering::Release);
                accepted
            });

            let mut seen = Vec::new();
            loop {
                let finished = done.load(StdOrdering::Acquire);
                consumer.pop_batch(16, |e| seen.push(e));
                if finished && consumer.occupancy() == 0 {
                    break;
                }
            }
            (handle.join().unwrap(), seen)
        });

        assert_eq!(seen, accepted);
        assert_eq!(accepted.len() as u32 + consumer.dropped(), TOTAL);
    }
}
