//! Host side protocol decoders over a captured edge trace.
//!
//! All decoders take events in capture order, which is also timestamp order:
//! the firmware stamps and queues edges from a single producer. Channels not
//! involved in a decoder are skipped, so a trace holding several buses at once
//! decodes each of them independently.

pub mod i2c;
pub mod spi;
pub mod uart;

pub use i2c::{I2cDecoder, I2cEvent};
pub use spi::{SpiChannels, SpiDecoder, SpiWord};
pub use uart::{Parity, StopBits, UartConfig, UartDecoder, UartFrame};

use crate::event::{Direction, EdgeEvent};

/// One channel of a trace, replayed forward in time.
#[derive(Debug, Clone)]
pub(crate) struct Line<'a> {
    events: &'a [EdgeEvent],
    channel: u8,
    next: usize,
    level: bool,
}

impl<'a> Line<'a> {
    pub(crate) fn new(events: &'a [EdgeEvent], channel: u8, idle: bool) -> Self {
        Self {
            events,
            channel,
            next: 0,
            level: idle,
        }
    }

    /// Level at `tick`, counting edges stamped at `tick` itself.
    ///
    /// Ticks must not go backwards between calls.
    pub(crate) fn level_at(&mut self, tick: u32) -> bool {
        let events = self.events;
        while let Some(ev) = events.get(self.next) {
            if ev.timestamp() > tick {
                break;
            }
            self.apply(ev);
            self.next += 1;
        }
        self.level
    }

    /// Skip ahead to the next `direction` edge on this channel and return its
    /// tick.
    pub(crate) fn next_edge(&mut self, direction: Direction) -> Option<u32> {
        let events = self.events;
        while let Some(ev) = events.get(self.next) {
            self.next += 1;
            if self.apply(ev) && ev.direction() == direction {
                return Some(ev.timestamp());
            }
        }
        None
    }

    fn apply(&mut self, ev: &EdgeEvent) -> bool {
        if ev.channel() != self.channel {
            return false;
        }
        self.level = ev.direction().level_after();
        true
    }
}
