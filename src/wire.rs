//! Host side of the link: packets back into events and waveforms.
//!
//! A packet is a bare run of little-endian event words with no header or
//! length prefix, so any stream of whole words decodes.

use crate::config::{EVENT_BYTES, TICK_HZ};
use crate::error::WireError;
use crate::event::EdgeEvent;

/// Decode every event word in `bytes`, in order.
pub fn decode(bytes: &[u8]) -> Result<impl Iterator<Item = EdgeEvent> + '_, WireError> {
    if bytes.len() % EVENT_BYTES != 0 {
        return Err(WireError::Misaligned { len: bytes.len() });
    }
    Ok(bytes.chunks_exact(EVENT_BYTES).map(|word| {
        EdgeEvent::decode(u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
    }))
}

/// Logic level of `channel` at `tick`, replaying the channel's edges up to
/// and including `tick`. `idle` is the level before the first edge (high for
/// UART lines).
pub fn level_at(events: &[EdgeEvent], channel: u8, tick: u32, idle: bool) -> bool {
    events
        .iter()
        .filter(|ev| ev.channel() == channel)
        .take_while(|ev| ev.timestamp() <= tick)
        .last()
        .map_or(idle, |ev| ev.direction().level_after())
}

/// Convert a tick count to microseconds at `tick_hz`.
pub fn ticks_to_micros(ticks: u32, tick_hz: u32) -> u64 {
    ticks as u64 * 1_000_000 / tick_hz as u64
}

/// [`ticks_to_micros`] at the firmware's nominal tick rate.
pub fn default_ticks_to_micros(ticks: u32) -> u64 {
    ticks_to_micros(ticks, TICK_HZ)
}
