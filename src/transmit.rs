//! Batches ring contents into packets and pushes them at the transport.

use heapless::Vec;

use crate::config::{TransmitConfig, MAX_PACKET_BYTES};
use crate::ring::Consumer;
use crate::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendStatus {
    Sent,
    /// Not taken (or not all of it yet), offer the same bytes again.
    Busy,
}

/// Byte link to the host.
///
/// `send` never blocks. A `Busy` packet is offered again unchanged until it
/// returns `Sent`.
pub trait Transport {
    fn send(&mut self, packet: &[u8]) -> SendStatus;
}

/// Result of one [`Transmitter::poll`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Poll {
    /// Neither the backlog nor the interval triggered.
    Idle,
    /// Triggered with an empty ring.
    Empty,
    Sent { events: usize, busy_retries: u32 },
}

pub struct Transmitter {
    config: TransmitConfig,
    last_send: Instant,
    packet: Vec<u8, MAX_PACKET_BYTES>,
}

impl Transmitter {
    pub fn new(config: TransmitConfig, now: Instant) -> Self {
        Self {
            config,
            last_send: now,
            packet: Vec::new(),
        }
    }

    pub fn config(&self) -> &TransmitConfig {
        &self.config
    }

    /// Time of the last accepted packet.
    pub fn last_send(&self) -> Instant {
        self.last_send
    }

    /// Fires when a full chunk is waiting or the send interval has elapsed.
    pub fn due(&self, occupancy: u32, now: Instant) -> bool {
        occupancy as usize >= self.config.chunk_size()
            || elapsed(self.last_send, now) >= self.config.send_interval().ticks()
    }

    /// One main loop step.
    ///
    /// Spins on a busy transport until the packet is accepted; capture keeps
    /// running in interrupt context meanwhile.
    pub fn poll<const P: usize, T: Transport>(
        &mut self,
        consumer: &mut Consumer<'_, P>,
        now: Instant,
        transport: &mut T,
    ) -> Poll {
        let occupancy = consumer.occupancy();
        if !self.due(occupancy, now) {
            return Poll::Idle;
        }

        self.packet.clear();
        let packet = &mut self.packet;
        let events = consumer.pop_batch(self.config.chunk_size() as u32, |event| {
            // chunk_size <= MAX_CHUNK_SIZE, always fits
            let _ = packet.extend_from_slice(&event.to_le_bytes());
        }) as usize;
        if events == 0 {
            return Poll::Empty;
        }

        let mut busy_retries = 0u32;
        while transport.send(&self.packet) == SendStatus::Busy {
            busy_retries = busy_retries.wrapping_add(1);
        }
        if busy_retries > 0 {
            trace!("transport busy for {=u32} attempts", busy_retries);
        }
        self.last_send = now;

        Poll::Sent {
            events,
            busy_retries,
        }
    }
}

/// Milliseconds from `since` to `now`, tolerant of the u32 clock wrapping.
#[inline]
pub(crate) fn elapsed(since: Instant, now: Instant) -> u32 {
    now.ticks().wrapping_sub(since.ticks())
}
