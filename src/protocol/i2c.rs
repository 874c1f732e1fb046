//! I2C bus conditions and bytes from SCL/SDA edges.
//!
//! SDA changing while SCL is high is a bus condition: falling is START
//! (repeated or not), rising is STOP. Inside a transfer SDA is sampled on each
//! SCL rising edge, eight data bits MSB first and then the acknowledge bit.

use crate::event::{Direction, EdgeEvent};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cEvent {
    Start { tick: u32 },
    Stop { tick: u32 },
    /// `ack` is SDA pulled low on the ninth clock.
    Byte { tick: u32, data: u8, ack: bool },
}

#[derive(Debug, Clone)]
pub struct I2cDecoder<'a> {
    events: core::slice::Iter<'a, EdgeEvent>,
    scl: u8,
    sda: u8,
    scl_high: bool,
    sda_high: bool,
    in_transfer: bool,
    bits: u8,
    data: u8,
}

impl<'a> I2cDecoder<'a> {
    pub fn new(events: &'a [EdgeEvent], scl: u8, sda: u8) -> Self {
        Self {
            events: events.iter(),
            scl,
            sda,
            scl_high: true,
            sda_high: true,
            in_transfer: false,
            bits: 0,
            data: 0,
        }
    }

    fn on_sda(&mut self, high: bool, tick: u32) -> Option<I2cEvent> {
        let changed = high != self.sda_high;
        self.sda_high = high;
        if !changed || !self.scl_high {
            return None;
        }

        self.bits = 0;
        self.data = 0;
        self.in_transfer = !high;
        Some(if high {
            I2cEvent::Stop { tick }
        } else {
            I2cEvent::Start { tick }
        })
    }

    fn on_scl_rising(&mut self, tick: u32) -> Option<I2cEvent> {
        if !self.in_transfer {
            return None;
        }
        if self.bits < 8 {
            self.data = (self.data << 1) | u8::from(self.sda_high);
            self.bits += 1;
            return None;
        }

        let byte = I2cEvent::Byte {
            tick,
            data: self.data,
            ack: !self.sda_high,
        };
        self.bits = 0;
        self.data = 0;
        Some(byte)
    }
}

impl Iterator for I2cDecoder<'_> {
    type Item = I2cEvent;

    fn next(&mut self) -> Option<I2cEvent> {
        while let Some(ev) = self.events.next() {
            let high = ev.direction().level_after();
            let decoded = if ev.channel() == self.sda {
                self.on_sda(high, ev.timestamp())
            } else if ev.channel() == self.scl {
                let rising = ev.direction() == Direction::Rising && !self.scl_high;
                self.scl_high = high;
                if rising {
                    self.on_scl_rising(ev.timestamp())
                } else {
                    None
                }
            } else {
                None
            };
            if decoded.is_some() {
                return decoded;
            }
        }
        None
    }
}
