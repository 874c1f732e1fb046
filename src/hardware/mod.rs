//! Board support for the STM32F405 capture board.
//!
//! Pin assignments:
//! - PB4..PB7: probe channels 0..3, EXTI on both edges
//! - PA11/PA12: USB full-speed (CDC-ACM to the host)

use hal::gpio::Edge;
use hal::otg_fs::{UsbBus, UsbBusType, USB};
use hal::prelude::*;
use stm32f4xx_hal as hal;
use usb_device::class_prelude::UsbBusAllocator;

pub mod inputs;
pub mod timer;
pub mod usb;

use self::inputs::{ProbeLow, ProbesHigh};
use self::timer::CounterChain;
use self::usb::UsbSerial;
use crate::timebase::TimeBase;

pub const HSE_FREQ: u32 = 8_000_000;
pub const SYSCLK_FREQ: u32 = 168_000_000;

/// Endpoint memory for the OTG_FS peripheral.
pub type EndpointMemory = [u32; 1024];

pub struct Board {
    pub probe_low: ProbeLow,
    pub probes_high: ProbesHigh,
    pub usb: UsbSerial,
    pub timebase: TimeBase<CounterChain>,
}

pub fn setup(
    peripherals: hal::pac::Peripherals,
    ep_memory: &'static mut EndpointMemory,
    usb_bus: &'static mut Option<UsbBusAllocator<UsbBusType>>,
) -> Board {
    peripherals
        .RCC
        .apb1enr
        .modify(|_, w| w.tim3en().enabled().tim4en().enabled());
    let rcc = peripherals.RCC.constrain();
    let clocks = rcc
        .cfgr
        .use_hse(HSE_FREQ.Hz())
        .sysclk(SYSCLK_FREQ.Hz())
        .require_pll48clk()
        .freeze();
    defmt::info!(
        "clocks: sysclk {=u32} Hz, pclk1 {=u32} Hz",
        clocks.sysclk().raw(),
        clocks.pclk1().raw()
    );

    let mut syscfg = peripherals.SYSCFG.constrain();
    let mut exti = peripherals.EXTI;

    let gpioa = peripherals.GPIOA.split();
    let gpiob = peripherals.GPIOB.split();

    let mut ch0 = gpiob.pb4.into_input();
    let mut ch1 = gpiob.pb5.into_input();
    let mut ch2 = gpiob.pb6.into_input();
    let mut ch3 = gpiob.pb7.into_input();
    ch0.make_interrupt_source(&mut syscfg);
    ch0.trigger_on_edge(&mut exti, Edge::RisingFalling);
    ch1.make_interrupt_source(&mut syscfg);
    ch1.trigger_on_edge(&mut exti, Edge::RisingFalling);
    ch2.make_interrupt_source(&mut syscfg);
    ch2.trigger_on_edge(&mut exti, Edge::RisingFalling);
    ch3.make_interrupt_source(&mut syscfg);
    ch3.trigger_on_edge(&mut exti, Edge::RisingFalling);

    let usb = USB::new(
        (
            peripherals.OTG_FS_GLOBAL,
            peripherals.OTG_FS_DEVICE,
            peripherals.OTG_FS_PWRCLK,
        ),
        (gpioa.pa11, gpioa.pa12),
        &clocks,
    );
    let usb_bus: &'static UsbBusAllocator<UsbBusType> = usb_bus.insert(UsbBus::new(usb, ep_memory));
    let usb = UsbSerial::new(usb_bus);

    let timebase = CounterChain::start();

    // Unmask EXTI lines last, once the counters run
    ch0.enable_interrupt(&mut exti);
    ch1.enable_interrupt(&mut exti);
    ch2.enable_interrupt(&mut exti);
    ch3.enable_interrupt(&mut exti);

    Board {
        probe_low: ProbeLow { ch0 },
        probes_high: ProbesHigh { ch1, ch2, ch3 },
        usb,
        timebase,
    }
}
