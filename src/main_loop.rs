//! Main-loop side of the capture pipeline.
//!
//! Owns the consumer end of the ring together with the transmitter and the
//! session state, so the whole non-interrupt context is one value passed to
//! the idle loop.

use crate::config::DROP_SUMMARY_INTERVAL;
use crate::ring::Consumer;
use crate::session::{CaptureControl, SessionLifecycle};
use crate::timebase::{ChainedCounter, TimeBase};
use crate::transmit::{elapsed, Poll, Transmitter, Transport};
use crate::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step {
    pub transmit: Poll,
    /// Drop warning raised this iteration, if any.
    pub drops: Option<DropReport>,
    /// This iteration ended the session.
    pub stopped: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DropReport {
    /// First drops after a clean period.
    Started { dropped: u32 },
    /// Drops since the previous report while the overload lasts.
    Summary { dropped: u32, total: u32 },
}

/// Turns the ring's drop counter into rate-limited reports.
///
/// The first drop is reported straight away. Further drops are folded into
/// one summary per [`DROP_SUMMARY_INTERVAL`]; a full interval without drops
/// ends the overload.
#[derive(Debug, Copy, Clone)]
pub struct DropMonitor {
    reported: u32,
    last_report: Instant,
    overloaded: bool,
}

impl DropMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            reported: 0,
            last_report: now,
            overloaded: false,
        }
    }

    /// Feed the current drop `total`.
    pub fn update(&mut self, total: u32, now: Instant) -> Option<DropReport> {
        let fresh = total.wrapping_sub(self.reported);
        if !self.overloaded {
            if fresh == 0 {
                return None;
            }
            self.overloaded = true;
            self.reported = total;
            self.last_report = now;
            return Some(DropReport::Started { dropped: fresh });
        }

        if elapsed(self.last_report, now) < DROP_SUMMARY_INTERVAL.ticks() {
            return None;
        }
        self.last_report = now;
        if fresh == 0 {
            self.overloaded = false;
            return None;
        }
        self.reported = total;
        Some(DropReport::Summary {
            dropped: fresh,
            total,
        })
    }
}

pub struct MainLoop<'a, C, const P: usize> {
    consumer: Consumer<'a, P>,
    timebase: TimeBase<C>,
    transmitter: Transmitter,
    session: SessionLifecycle,
    drops: DropMonitor,
}

impl<'a, C: ChainedCounter, const P: usize> MainLoop<'a, C, P> {
    pub fn new(consumer: Consumer<'a, P>, timebase: TimeBase<C>, transmitter: Transmitter) -> Self {
        let drops = DropMonitor::new(transmitter.last_send());
        info!(
            "capture started: ring {=usize} events, chunk {=usize}",
            P,
            transmitter.config().chunk_size()
        );
        Self {
            consumer,
            timebase,
            transmitter,
            session: SessionLifecycle::new(),
            drops,
        }
    }

    /// One iteration: transmit if due, then check the session bound.
    pub fn run_once<T: Transport, X: CaptureControl>(
        &mut self,
        now: Instant,
        transport: &mut T,
        control: &mut X,
    ) -> Step {
        let transmit = self.transmitter.poll(&mut self.consumer, now, transport);
        let drops = self.report_drops(now);

        let tick = self.timebase.current_tick();
        let stopped = self.session.poll(tick, control, &mut self.consumer);
        if stopped {
            info!(
                "capture stopped at tick {=u32}, {=u32} events dropped",
                tick,
                self.consumer.dropped()
            );
        }

        Step {
            transmit,
            drops,
            stopped,
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.session.is_capturing()
    }

    pub fn consumer(&self) -> &Consumer<'a, P> {
        &self.consumer
    }

    pub fn transmitter(&self) -> &Transmitter {
        &self.transmitter
    }

    fn report_drops(&mut self, now: Instant) -> Option<DropReport> {
        let report = self.drops.update(self.consumer.dropped(), now);
        match report {
            Some(DropReport::Started { dropped }) => {
                warn!("ring full: {=u32} events dropped", dropped)
            }
            Some(DropReport::Summary { dropped, total }) => {
                warn!(
                    "ring still overflowing: {=u32} more events dropped ({=u32} total)",
                    dropped,
                    total
                )
            }
            None => {}
        }
        report
    }
}
