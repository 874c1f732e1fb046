use super::hal;
use crate::timebase::{ChainedCounter, TimeBase};

/// TIM3 prescaler: 84 MHz timer clock / (15 + 1) = 5.25 MHz, see `TICK_HZ`.
pub const TICK_PRESCALER: u16 = 15;

/// TIM3 (low word) chained into TIM4 (high word).
///
/// TIM3 runs from the APB1 timer clock and emits TRGO on update; TIM4 counts
/// those triggers in external clock mode 1 on ITR2.
#[derive(Debug, Copy, Clone)]
pub struct CounterChain;

impl CounterChain {
    /// Configure and start both counters from zero.
    ///
    /// TIM3EN/TIM4EN must already be set in RCC_APB1ENR.
    pub fn start() -> TimeBase<Self> {
        let low = Self::low_timer();
        let high = Self::high_timer();

        low.cr1.write(|w| w.cen().clear_bit());
        high.cr1.write(|w| w.cen().clear_bit());

        low.psc.write(|w| unsafe { w.bits(TICK_PRESCALER as u32) });
        low.arr.write(|w| unsafe { w.bits(0xFFFF) });
        // MMS = update: TRGO pulses on every low counter overflow
        low.cr2.modify(|_, w| w.mms().update());

        high.psc.write(|w| unsafe { w.bits(0) });
        high.arr.write(|w| unsafe { w.bits(0xFFFF) });
        // TS = ITR2 (TIM3 TRGO), SMS = external clock mode 1
        high.smcr.write(|w| unsafe { w.bits((0b010 << 4) | 0b111) });

        // Latch the prescalers and zero both counters
        low.egr.write(|w| w.ug().set_bit());
        high.egr.write(|w| w.ug().set_bit());
        low.sr.modify(|_, w| w.uif().clear_bit());
        high.sr.modify(|_, w| w.uif().clear_bit());

        // Slave first so no overflow of the master is missed
        high.cr1.modify(|_, w| w.cen().set_bit());
        low.cr1.modify(|_, w| w.cen().set_bit());

        TimeBase::new(Self)
    }

    pub fn stop() {
        Self::low_timer().cr1.modify(|_, w| w.cen().clear_bit());
        Self::high_timer().cr1.modify(|_, w| w.cen().clear_bit());
    }

    fn low_timer() -> &'static hal::pac::tim3::RegisterBlock {
        unsafe { &*hal::pac::TIM3::ptr() }
    }

    fn high_timer() -> &'static hal::pac::tim3::RegisterBlock {
        unsafe { &*hal::pac::TIM4::ptr() }
    }
}

impl ChainedCounter for CounterChain {
    #[inline(always)]
    fn high(&self) -> u16 {
        Self::high_timer().cnt.read().bits() as u16
    }

    #[inline(always)]
    fn low(&self) -> u16 {
        Self::low_timer().cnt.read().bits() as u16
    }
}
