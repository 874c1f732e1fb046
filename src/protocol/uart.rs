//! Asynchronous serial frames on one idle-high line.
//!
//! A frame starts at a falling edge. Every later bit is sampled in the middle
//! of its slot, with slot timing derived from the baud rate and the capture
//! tick rate in integer arithmetic, so long frames don't accumulate rounding
//! drift. Data bits arrive LSB first.

use super::Line;
use crate::error::ConfigError;
use crate::event::{Direction, EdgeEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}

impl StopBits {
    fn count(self) -> u32 {
        match self {
            StopBits::One => 1,
            StopBits::Two => 2,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    baud: u32,
    data_bits: u8,
    parity: Parity,
    stop_bits: StopBits,
}

impl UartConfig {
    pub fn new(
        baud: u32,
        data_bits: u8,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, ConfigError> {
        if baud == 0 {
            return Err(ConfigError::ZeroBaud);
        }
        if !(5..=9).contains(&data_bits) {
            return Err(ConfigError::DataBits { bits: data_bits });
        }
        Ok(Self {
            baud,
            data_bits,
            parity,
            stop_bits,
        })
    }

    pub fn baud(&self) -> u32 {
        self.baud
    }

    pub fn data_bits(&self) -> u8 {
        self.data_bits
    }

    pub fn parity(&self) -> Parity {
        self.parity
    }

    pub fn stop_bits(&self) -> StopBits {
        self.stop_bits
    }
}

/// 9600 8N1.
impl Default for UartConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartFrame {
    /// Tick of the falling edge that opened the start bit.
    pub start: u32,
    pub data: u16,
    /// Always `true` without a parity bit.
    pub parity_ok: bool,
    /// Every stop bit sampled high.
    pub stop_ok: bool,
}

impl UartFrame {
    pub fn is_valid(&self) -> bool {
        self.parity_ok && self.stop_ok
    }
}

/// Iterator over the frames on one channel.
#[derive(Debug, Clone)]
pub struct UartDecoder<'a> {
    line: Line<'a>,
    config: UartConfig,
    tick_hz: u32,
}

impl<'a> UartDecoder<'a> {
    /// `tick_hz` is the rate the trace was captured at, see
    /// [`crate::config::TICK_HZ`].
    pub fn new(events: &'a [EdgeEvent], channel: u8, config: UartConfig, tick_hz: u32) -> Self {
        Self {
            line: Line::new(events, channel, true),
            config,
            tick_hz,
        }
    }

    /// Level in the middle of bit slot `slot`, the start bit being slot 0.
    fn sample(&mut self, start: u32, slot: u32) -> bool {
        let half_bits = 2 * slot as u64 + 1;
        let offset = half_bits * self.tick_hz as u64 / (2 * self.config.baud as u64);
        let tick = u32::try_from(offset).map_or(u32::MAX, |offset| start.saturating_add(offset));
        self.line.level_at(tick)
    }
}

impl Iterator for UartDecoder<'_> {
    type Item = UartFrame;

    fn next(&mut self) -> Option<UartFrame> {
        loop {
            let start = self.line.next_edge(Direction::Falling)?;
            // Glitch: back high before the middle of the start bit
            if self.sample(start, 0) {
                continue;
            }

            let mut slot = 1;
            let mut data = 0u16;
            for bit in 0..self.config.data_bits {
                if self.sample(start, slot) {
                    data |= 1 << bit;
                }
                slot += 1;
            }

            let parity_ok = match self.config.parity {
                Parity::None => true,
                parity => {
                    let bit = self.sample(start, slot);
                    slot += 1;
                    let ones = data.count_ones() + u32::from(bit);
                    (ones % 2 == 0) == (parity == Parity::Even)
                }
            };

            let mut stop_ok = true;
            for _ in 0..self.config.stop_bits.count() {
                stop_ok &= self.sample(start, slot);
                slot += 1;
            }

            return Some(UartFrame {
                start,
                data,
                parity_ok,
                stop_ok,
            });
        }
    }
}
