//! Capture core of a four channel logic analyzer.
//!
//! Edge interrupts are timestamped against a 32-bit tick composed from two
//! chained 16-bit counters, queued in a lock-free SPSC ring and drained by the
//! main loop into fixed-width 4 byte words for the host.
//!
//! Everything outside of [`hardware`] is target independent and generic over
//! the small collaborator traits ([`ChainedCounter`], [`PinSampler`],
//! [`Transport`], [`CaptureControl`]), so it runs under `cargo test` on the
//! host.
//!
//! [`wire`] and [`protocol`] are the host end: they turn the received byte
//! stream back into edges and decode UART, SPI and I2C traffic from them.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "firmware", no_main)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod capture;
pub mod config;
pub mod error;
pub mod event;
pub mod main_loop;
pub mod protocol;
pub mod ring;
pub mod session;
pub mod timebase;
pub mod transmit;
pub mod wire;

#[cfg(feature = "firmware")]
pub mod hardware;

pub use capture::{CaptureOutcome, EdgeCapture, PinSampler};
pub use config::TransmitConfig;
pub use error::{ConfigError, WireError};
pub use event::{Direction, EdgeEvent};
pub use main_loop::MainLoop;
pub use ring::{Consumer, EventRing, Producer};
pub use session::{CaptureControl, SessionLifecycle};
pub use timebase::{ChainedCounter, TimeBase};
pub use transmit::{SendStatus, Transmitter, Transport};

/// Millisecond clock used to pace transmissions.
pub type Instant = fugit::Instant<u32, 1, 1000>;
pub type Duration = fugit::Duration<u32, 1, 1000>;

#[cfg(feature = "firmware")]
mod rt {
    use defmt_brtt as _; // global logger

    use panic_probe as _;

    use stm32f4xx_hal as _; // memory layout

    // same panicking *behavior* as `panic-probe` but doesn't print a panic message
    // this prevents the panic message being printed *twice* when `defmt::panic` is
    // invoked
    #[defmt::panic_handler]
    fn panic() -> ! {
        cortex_m::asm::udf()
    }
}
