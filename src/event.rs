//! Edge event and its packed 32-bit word.
//!
//! | bit   | 31        | 30..29  | 28..0            |
//! |-------|-----------|---------|------------------|
//! | field | rising    | channel | tick (low 29)    |

use bitfield_struct::bitfield;

use crate::config::TIMESTAMP_MASK;

pub const CHANNELS: u8 = 4;

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
struct EventWord {
    #[bits(29)]
    timestamp: u32,
    #[bits(2)]
    channel: u8,
    rising: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Falling,
    Rising,
}

impl Direction {
    /// Direction inferred from the level sampled after the transition.
    #[inline]
    pub fn from_level(is_high: bool) -> Self {
        if is_high {
            Direction::Rising
        } else {
            Direction::Falling
        }
    }

    /// Line level after an edge of this direction.
    #[inline]
    pub fn level_after(self) -> bool {
        self == Direction::Rising
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EdgeEvent {
    channel: u8,
    direction: Direction,
    timestamp: u32,
}

impl EdgeEvent {
    /// Builds an event, truncating `tick` to the 29-bit timestamp field.
    ///
    /// Returns `None` for channels outside 0..=3.
    pub fn new(channel: u8, direction: Direction, tick: u32) -> Option<Self> {
        (channel < CHANNELS).then_some(Self {
            channel,
            direction,
            timestamp: tick & TIMESTAMP_MASK,
        })
    }

    /// Same as [`EdgeEvent::new`] for a channel index already known to be in
    /// range.
    #[inline]
    pub(crate) fn for_channel(channel: u8, direction: Direction, tick: u32) -> Self {
        debug_assert!(channel < CHANNELS);
        Self {
            channel: channel & (CHANNELS - 1),
            direction,
            timestamp: tick & TIMESTAMP_MASK,
        }
    }

    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    #[inline]
    pub fn encode(&self) -> u32 {
        EventWord::new()
            .with_timestamp(self.timestamp)
            .with_channel(self.channel)
            .with_rising(self.direction == Direction::Rising)
            .into()
    }

    /// Every 32-bit value is a valid event word.
    #[inline]
    pub fn decode(raw: u32) -> Self {
        let word = EventWord::from(raw);
        Self {
            channel: word.channel(),
            direction: Direction::from_level(word.rising()),
            timestamp: word.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_wire_format() {
        let ev = EdgeEvent::new(2, Direction::Rising, 0x0ABC_DEF1).unwrap();
        assert_eq!(ev.encode(), (1 << 31) | (2 << 29) | 0x0ABC_DEF1);

        let ev = EdgeEvent::new(3, Direction::Falling, 1).unwrap();
        assert_eq!(ev.encode(), 0x6000_0001);
    }

    #[test]
    fn round_trips_every_channel_and_direction() {
        let stamps = [0, 1, 0x1234_567, TIMESTAMP_MASK - 1, TIMESTAMP_MASK];
        for channel in 0..CHANNELS {
            for direction in [Direction::Rising, Direction::Falling] {
                for &ts in &stamps {
                    let ev = EdgeEvent::new(channel, direction, ts).unwrap();
                    let back = EdgeEvent::decode(ev.encode());
                    assert_eq!(back, ev);
                    assert_eq!(
                        (back.channel(), back.direction(), back.timestamp()),
                        (channel, direction, ts)
                    );
                }
            }
        }
    }

    #[test]
    fn tick_is_truncated_to_29_bits() {
        let ev = EdgeEvent::new(1, Direction::Falling, 0xFFFF_FFFF).unwrap();
        assert_eq!(ev.timestamp(), TIMESTAMP_MASK);
        // Truncation must not leak into the channel or direction bits.
        assert_eq!(ev.encode(), (1 << 29) | TIMESTAMP_MASK);
    }

    #[test]
    fn rejects_unknown_channel() {
        assert!(EdgeEvent::new(4, Direction::Rising, 0).is_none());
    }

    #[test]
    fn validated_channel_builds_the_same_event() {
        for channel in 0..CHANNELS {
            assert_eq!(
                Some(EdgeEvent::for_channel(channel, Direction::Rising, 0xFFFF_FFFF)),
                EdgeEvent::new(channel, Direction::Rising, 0xFFFF_FFFF)
            );
        }
    }
}
