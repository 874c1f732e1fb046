//! Edge classification and encoding, run from the pin interrupt.

use crate::config::TIMESTAMP_LIMIT;
use crate::event::{Direction, EdgeEvent, CHANNELS};
use crate::ring::Producer;
use crate::timebase::{ChainedCounter, TimeBase};

/// Instantaneous level of the monitored input pins.
pub trait PinSampler {
    /// Identity the platform passes to the edge callback.
    type Pin: Copy + PartialEq;

    fn is_high(&mut self, pin: Self::Pin) -> bool;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CaptureOutcome {
    /// Pin is not one of the four channels.
    Unmapped,
    /// Tick is past the timestamp range, the session is over.
    OutOfRange,
    Stored(EdgeEvent),
    /// Ring was full or closed; the event is gone.
    Dropped(EdgeEvent),
}

pub struct EdgeCapture<'a, C, S: PinSampler, const P: usize> {
    channels: [S::Pin; CHANNELS as usize],
    sampler: S,
    timebase: TimeBase<C>,
    producer: Producer<'a, P>,
}

impl<'a, C, S, const P: usize> EdgeCapture<'a, C, S, P>
where
    C: ChainedCounter,
    S: PinSampler,
{
    /// `channels[n]` is the pin feeding channel `n`.
    pub fn new(
        channels: [S::Pin; CHANNELS as usize],
        sampler: S,
        timebase: TimeBase<C>,
        producer: Producer<'a, P>,
    ) -> Self {
        Self {
            channels,
            sampler,
            timebase,
            producer,
        }
    }

    /// Channel fed by `pin`, always below [`CHANNELS`].
    pub fn channel_of(&self, pin: S::Pin) -> Option<u8> {
        self.channels
            .iter()
            .position(|&p| p == pin)
            .map(|index| index as u8)
    }

    /// Edge callback. Bounded time, never blocks, never logs.
    ///
    /// The direction comes from the level sampled *after* the transition, so
    /// a second edge arriving before this runs is reported with the later
    /// level.
    #[inline]
    pub fn on_edge(&mut self, pin: S::Pin) -> CaptureOutcome {
        let Some(channel) = self.channel_of(pin) else {
            return CaptureOutcome::Unmapped;
        };

        let tick = self.timebase.current_tick();
        if tick >= TIMESTAMP_LIMIT {
            return CaptureOutcome::OutOfRange;
        }

        let direction = Direction::from_level(self.sampler.is_high(pin));
        let event = EdgeEvent::for_channel(channel, direction, tick);

        if self.producer.try_push(event.encode()) {
            CaptureOutcome::Stored(event)
        } else {
            CaptureOutcome::Dropped(event)
        }
    }

    pub fn timebase(&self) -> &TimeBase<C> {
        &self.timebase
    }

    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ring::EventRing;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Counter pair driven from a shared cell holding the full tick.
    #[derive(Clone)]
    pub(crate) struct FakeCounter(pub Rc<Cell<u32>>);

    impl ChainedCounter for FakeCounter {
        fn high(&self) -> u16 {
            (self.0.get() >> 16) as u16
        }
        fn low(&self) -> u16 {
            self.0.get() as u16
        }
    }

    /// Pin levels indexed by pin number.
    #[derive(Default)]
    pub(crate) struct Levels(pub [bool; 16]);

    impl PinSampler for Levels {
        type Pin = u8;
        fn is_high(&mut self, pin: u8) -> bool {
            self.0[pin as usize]
        }
    }

    pub(crate) const PINS: [u8; 4] = [4, 5, 6, 7];

    #[test]
    fn stores_encoded_event_for_mapped_pin() {
        let tick = Rc::new(Cell::new(0x0001_0203));
        let mut ring = EventRing::<8>::new();
        let (producer, mut consumer) = ring.split();
        let mut capture = EdgeCapture::new(
            PINS,
            Levels::default(),
            TimeBase::new(FakeCounter(tick.clone())),
            producer,
        );

        capture.sampler_mut().0[6] = true;
        let outcome = capture.on_edge(6);
        let expected = EdgeEvent::new(2, Direction::Rising, 0x0001_0203).unwrap();
        assert_eq!(outcome, CaptureOutcome::Stored(expected));

        tick.set(0x0001_0300);
        capture.sampler_mut().0[4] = false;
        capture.on_edge(4);

        let mut words = Vec::new();
        consumer.pop_batch(8, |w| words.push(w));
        assert_eq!(
            words,
            [
                (1 << 31) | (2 << 29) | 0x0001_0203,
                0x0001_0300,
            ]
        );
    }

    #[test]
    fn every_mapped_pin_stores_its_own_channel() {
        let tick = Rc::new(Cell::new(40));
        let mut ring = EventRing::<8>::new();
        let (producer, mut consumer) = ring.split();
        let mut capture =
            EdgeCapture::new(PINS, Levels::default(), TimeBase::new(FakeCounter(tick)), producer);

        for (channel, pin) in PINS.into_iter().enumerate() {
            assert_eq!(capture.channel_of(pin), Some(channel as u8));
            match capture.on_edge(pin) {
                CaptureOutcome::Stored(ev) => assert_eq!(ev.channel(), channel as u8),
                other => panic!("pin {pin}: unexpected {other:?}"),
            }
        }

        let mut channels = Vec::new();
        consumer.pop_batch(8, |w| channels.push(EdgeEvent::decode(w).channel()));
        assert_eq!(channels, [0, 1, 2, 3]);
    }

    #[test]
    fn unmapped_pin_is_ignored() {
        let tick = Rc::new(Cell::new(10));
        let mut ring = EventRing::<8>::new();
        let (producer, consumer) = ring.split();
        let mut capture =
            EdgeCapture::new(PINS, Levels::default(), TimeBase::new(FakeCounter(tick)), producer);

        assert_eq!(capture.on_edge(3), CaptureOutcome::Unmapped);
        assert_eq!(capture.on_edge(8), CaptureOutcome::Unmapped);
        assert_eq!(consumer.occupancy(), 0);
        assert_eq!(consumer.ring().cursors(), (0, 0));
    }

    #[test]
    fn full_ring_drops_newest() {
        let tick = Rc::new(Cell::new(0));
        let mut ring = EventRing::<2>::new();
        let (producer, mut consumer) = ring.split();
        let mut capture = EdgeCapture::new(
            PINS,
            Levels::default(),
            TimeBase::new(FakeCounter(tick.clone())),
            producer,
        );

        for t in 1..=3 {
            tick.set(t);
            capture.on_edge(5);
        }
        let last = EdgeEvent::new(1, Direction::Falling, 4).unwrap();
        tick.set(4);
        assert_eq!(capture.on_edge(5), CaptureOutcome::Dropped(last));
        assert_eq!(consumer.dropped(), 2);

        let mut stamps = Vec::new();
        consumer.pop_batch(8, |w| stamps.push(EdgeEvent::decode(w).timestamp()));
        assert_eq!(stamps, [1, 2]);
    }

    #[test]
    fn refuses_ticks_past_timestamp_range() {
        let tick = Rc::new(Cell::new(TIMESTAMP_LIMIT - 1));
        let mut ring = EventRing::<8>::new();
        let (producer, consumer) = ring.split();
        let mut capture = EdgeCapture::new(
            PINS,
            Levels::default(),
            TimeBase::new(FakeCounter(tick.clone())),
            producer,
        );

        assert!(matches!(capture.on_edge(7), CaptureOutcome::Stored(_)));
        tick.set(TIMESTAMP_LIMIT);
        assert_eq!(capture.on_edge(7), CaptureOutcome::OutOfRange);
        assert_eq!(consumer.occupancy(), 1);
    }
}
