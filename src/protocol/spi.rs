//! SPI words, MSB first, sampled on the clock edge the mode selects.

use embedded_hal::spi::{Mode, Phase, Polarity};

use crate::event::{Direction, EdgeEvent};

/// Channel assignment of the bus. Unused data lines are `None`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiChannels {
    pub sck: u8,
    pub mosi: Option<u8>,
    pub miso: Option<u8>,
    /// Active-low chip select. Without one, bits are counted from the start
    /// of the trace.
    pub cs: Option<u8>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiWord {
    /// Tick of the clock edge that sampled the last bit.
    pub tick: u32,
    pub mosi: Option<u8>,
    pub miso: Option<u8>,
}

/// Clock edge that samples data in `mode`.
pub fn sample_edge(mode: Mode) -> Direction {
    let idle_low = mode.polarity == Polarity::IdleLow;
    let first = mode.phase == Phase::CaptureOnFirstTransition;
    if idle_low == first {
        Direction::Rising
    } else {
        Direction::Falling
    }
}

/// Iterator over the complete 8-bit words on the bus.
#[derive(Debug, Clone)]
pub struct SpiDecoder<'a> {
    events: core::slice::Iter<'a, EdgeEvent>,
    channels: SpiChannels,
    sample: Direction,
    mosi: bool,
    miso: bool,
    selected: bool,
    bits: u8,
    mosi_shift: u8,
    miso_shift: u8,
}

impl<'a> SpiDecoder<'a> {
    pub fn new(events: &'a [EdgeEvent], channels: SpiChannels, mode: Mode) -> Self {
        Self {
            events: events.iter(),
            channels,
            sample: sample_edge(mode),
            mosi: false,
            miso: false,
            selected: channels.cs.is_none(),
            bits: 0,
            mosi_shift: 0,
            miso_shift: 0,
        }
    }

    fn restart_word(&mut self) {
        self.bits = 0;
        self.mosi_shift = 0;
        self.miso_shift = 0;
    }
}

impl Iterator for SpiDecoder<'_> {
    type Item = SpiWord;

    fn next(&mut self) -> Option<SpiWord> {
        while let Some(ev) = self.events.next() {
            let channel = Some(ev.channel());
            let level = ev.direction().level_after();

            if channel == self.channels.cs {
                // Either edge of chip select frames a new transfer
                self.selected = !level;
                self.restart_word();
                continue;
            }
            if channel == self.channels.mosi {
                self.mosi = level;
            }
            if channel == self.channels.miso {
                self.miso = level;
            }
            if ev.channel() != self.channels.sck || ev.direction() != self.sample || !self.selected {
                continue;
            }

            self.mosi_shift = (self.mosi_shift << 1) | u8::from(self.mosi);
            self.miso_shift = (self.miso_shift << 1) | u8::from(self.miso);
            self.bits += 1;
            if self.bits == 8 {
                let word = SpiWord {
                    tick: ev.timestamp(),
                    mosi: self.channels.mosi.map(|_| self.mosi_shift),
                    miso: self.channels.miso.map(|_| self.miso_shift),
                };
                self.restart_word();
                return Some(word);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{MODE_0, MODE_1, MODE_2, MODE_3};
    use std::vec::Vec;

    const BUS: SpiChannels = SpiChannels {
        sck: 0,
        mosi: Some(1),
        miso: Some(2),
        cs: Some(3),
    };

    /// Builds a trace of `(mosi, miso)` byte pairs in `mode`, four ticks per
    /// bit. Data changes ahead of the sampling edge: before the first clock
    /// transition for phase 0, right after it for phase 1.
    struct Bus {
        mode: Mode,
        events: Vec<EdgeEvent>,
        levels: [bool; 4],
        tick: u32,
    }

    impl Bus {
        fn new(mode: Mode) -> Self {
            let idle_high = mode.polarity == Polarity::IdleHigh;
            let mut bus = Self {
                mode,
                events: Vec::new(),
                levels: [false, false, false, true],
                tick: 10,
            };
            if idle_high {
                bus.set(BUS.sck, true);
            }
            bus
        }

        fn set(&mut self, channel: u8, high: bool) {
            if self.levels[channel as usize] != high {
                self.levels[channel as usize] = high;
                self.events
                    .push(EdgeEvent::new(channel, Direction::from_level(high), self.tick).unwrap());
            }
        }

        fn select(&mut self, selected: bool) -> &mut Self {
            self.tick += 4;
            self.set(3, !selected);
            self
        }

        fn clock_bits(&mut self, mosi: u8, miso: u8, count: u32) -> &mut Self {
            let idle = self.mode.polarity == Polarity::IdleHigh;
            let phase1 = self.mode.phase == Phase::CaptureOnSecondTransition;
            for bit in (8 - count..8).rev() {
                self.tick += 4;
                if !phase1 {
                    self.set(1, mosi & (1 << bit) != 0);
                    self.set(2, miso & (1 << bit) != 0);
                }
                self.tick += 1;
                self.set(0, !idle);
                if phase1 {
                    self.set(1, mosi & (1 << bit) != 0);
                    self.set(2, miso & (1 << bit) != 0);
                }
                self.tick += 1;
                self.set(0, idle);
            }
            self
        }

        fn byte(&mut self, mosi: u8, miso: u8) -> &mut Self {
            self.clock_bits(mosi, miso, 8)
        }
    }

    fn bytes(words: &[SpiWord]) -> Vec<(Option<u8>, Option<u8>)> {
        words.iter().map(|w| (w.mosi, w.miso)).collect()
    }

    #[test]
    fn sample_edge_per_mode() {
        assert_eq!(sample_edge(MODE_0), Direction::Rising);
        assert_eq!(sample_edge(MODE_1), Direction::Falling);
        assert_eq!(sample_edge(MODE_2), Direction::Falling);
        assert_eq!(sample_edge(MODE_3), Direction::Rising);
    }

    #[test]
    fn decodes_full_duplex_in_every_mode() {
        for mode in [MODE_0, MODE_1, MODE_2, MODE_3] {
            let mut bus = Bus::new(mode);
            bus.select(true)
                .byte(0xA5, 0x5A)
                .byte(0x3C, 0xFF)
                .select(false);

            let words: Vec<_> = SpiDecoder::new(&bus.events, BUS, mode).collect();
            assert_eq!(
                bytes(&words),
                [(Some(0xA5), Some(0x5A)), (Some(0x3C), Some(0xFF))],
                "{mode:?}"
            );
        }
    }

    #[test]
    fn wrong_phase_misreads_the_data() {
        let mut bus = Bus::new(MODE_1);
        bus.select(true).byte(0xF0, 0x00).select(false);

        let words: Vec<_> = SpiDecoder::new(&bus.events, BUS, MODE_0).collect();
        assert_eq!(words.len(), 1);
        assert_ne!(words[0].mosi, Some(0xF0));
    }

    #[test]
    fn chip_select_discards_partial_words() {
        let mut bus = Bus::new(MODE_0);
        bus.select(true)
            .clock_bits(0xFF, 0xFF, 5)
            .select(false)
            .select(true)
            .byte(0x81, 0x18)
            .select(false)
            // Clocks while deselected are someone else's transfer.
            .byte(0x99, 0x99);

        let words: Vec<_> = SpiDecoder::new(&bus.events, BUS, MODE_0).collect();
        assert_eq!(bytes(&words), [(Some(0x81), Some(0x18))]);
    }

    #[test]
    fn unused_lines_report_none() {
        let mut bus = Bus::new(MODE_0);
        bus.byte(0x42, 0x00);
        let channels = SpiChannels {
            sck: 0,
            mosi: Some(1),
            miso: None,
            cs: None,
        };

        let words: Vec<_> = SpiDecoder::new(&bus.events, channels, MODE_0).collect();
        assert_eq!(bytes(&words), [(Some(0x42), None)]);
        assert_eq!(words[0].tick, bus.events.last().unwrap().timestamp() - 1);
    }
}
