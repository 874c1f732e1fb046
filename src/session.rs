//! One-way stop once the tick is about to outrun the timestamp field.

use crate::config::TIMESTAMP_LIMIT;
use crate::ring::Consumer;

/// Interrupt enable controls for the edge sources.
pub trait CaptureControl {
    /// Mask every interrupt that can reach the edge callback. Must take
    /// effect before it returns.
    fn disable_capture(&mut self);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionLifecycle {
    capturing: bool,
}

impl SessionLifecycle {
    pub const fn new() -> Self {
        Self { capturing: true }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Check the tick and stop the session once it reaches `2^29`.
    ///
    /// Returns `true` on the call that performed the stop. The edge sources
    /// are masked before the ring cursors are reset so no producer can
    /// publish into a ring that is being cleared.
    pub fn poll<const P: usize, X: CaptureControl>(
        &mut self,
        tick: u32,
        control: &mut X,
        consumer: &mut Consumer<'_, P>,
    ) -> bool {
        if !self.capturing || tick < TIMESTAMP_LIMIT {
            return false;
        }

        control.disable_capture();
        consumer.close();
        self.capturing = false;
        true
    }
}

impl Default for SessionLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
