//! 32-bit capture tick composed from two chained 16-bit hardware counters.
//!
//! The low counter runs from the timer clock and its update event clocks the
//! high counter, so `high:low` forms one free-running 32-bit value. The two
//! registers can't be read together, so a read brackets the low counter
//! between two reads of the high counter and re-reads the low counter if the
//! high word moved in between.

/// Access to the two chained counter registers.
///
/// Reads must be side-effect free; they are called from both interrupt and
/// main-loop context.
pub trait ChainedCounter {
    /// Counter that advances once per low counter overflow.
    fn high(&self) -> u16;
    /// Counter clocked by the timer clock.
    fn low(&self) -> u16;
}

#[derive(Debug, Copy, Clone)]
pub struct TimeBase<C> {
    counter: C,
}

impl<C: ChainedCounter> TimeBase<C> {
    pub const fn new(counter: C) -> Self {
        Self { counter }
    }

    /// Consistent snapshot of the composed tick.
    ///
    /// Handles at most one low counter overflow during the call; callers are
    /// short interrupt handlers or the main loop, both far shorter than a
    /// full low counter period.
    #[inline]
    pub fn current_tick(&self) -> u32 {
        let high1 = self.counter.high();
        let mut low = self.counter.low();
        let high2 = self.counter.high();

        let high = if high1 != high2 {
            // Low counter wrapped between the reads, `low` may belong to
            // either side of the wrap.
            low = self.counter.low();
            high2
        } else {
            high1
        };

        compose(high, low)
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }
}

#[inline(always)]
const fn compose(high: u16, low: u16) -> u32 {
    ((high as u32) << 16) | low as u32
}
