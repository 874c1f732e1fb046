use cortex_m::peripheral::NVIC;
use hal::gpio::{ExtiPin, PB4, PB5, PB6, PB7};
use hal::pac::Interrupt;

use super::hal;
use super::timer::CounterChain;
use crate::capture::{EdgeCapture, PinSampler};
use crate::session::CaptureControl;

/// GPIOB pin numbers for channels 0..=3.
pub const PROBE_PINS: [u8; 4] = [4, 5, 6, 7];

/// Reads GPIOB's input data register directly so sampling is a single load.
#[derive(Debug, Copy, Clone)]
pub struct PortB;

impl PinSampler for PortB {
    type Pin = u8;

    #[inline(always)]
    fn is_high(&mut self, pin: u8) -> bool {
        let port = unsafe { &*hal::pac::GPIOB::ptr() };
        port.idr.read().bits() & (1 << pin) != 0
    }
}

pub type Capture = EdgeCapture<'static, CounterChain, PortB, { crate::config::RING_CAPACITY }>;

/// Channel 0, the only probe on EXTI4.
pub struct ProbeLow {
    pub ch0: PB4,
}

/// Channels 1..=3, sharing EXTI9_5.
pub struct ProbesHigh {
    pub ch1: PB5,
    pub ch2: PB6,
    pub ch3: PB7,
}

impl ProbeLow {
    pub fn service(&mut self, capture: &mut Capture) {
        if take_pending(&mut self.ch0) {
            capture.on_edge(PROBE_PINS[0]);
        }
    }
}

impl ProbesHigh {
    pub fn service(&mut self, capture: &mut Capture) {
        if take_pending(&mut self.ch1) {
            capture.on_edge(PROBE_PINS[1]);
        }
        if take_pending(&mut self.ch2) {
            capture.on_edge(PROBE_PINS[2]);
        }
        if take_pending(&mut self.ch3) {
            capture.on_edge(PROBE_PINS[3]);
        }
    }
}

#[inline(always)]
fn take_pending<P: ExtiPin>(pin: &mut P) -> bool {
    if pin.check_interrupt() {
        pin.clear_interrupt_pending_bit();
        true
    } else {
        false
    }
}

/// Masks both probe EXTI lines and halts the counter chain.
pub struct ExtiMask;

impl CaptureControl for ExtiMask {
    fn disable_capture(&mut self) {
        NVIC::mask(Interrupt::EXTI4);
        NVIC::mask(Interrupt::EXTI9_5);
        // Mask must be in effect before the caller touches the ring
        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        CounterChain::stop();
    }
}
