#![no_main]
#![no_std]

use logic_capture as _; // global logger + panicking-behavior + memory layout
use rtic::app;

#[app(device = stm32f4xx_hal::pac, peripherals = true)]
mod app {
    use logic_capture::config::{TransmitConfig, RING_CAPACITY};
    use logic_capture::hardware::inputs::{Capture, ExtiMask, PortB, ProbeLow, ProbesHigh, PROBE_PINS};
    use logic_capture::hardware::timer::CounterChain;
    use logic_capture::hardware::usb::{SharedLink, UsbSerial};
    use logic_capture::hardware::{self, EndpointMemory, SYSCLK_FREQ};
    use logic_capture::{EdgeCapture, EventRing, MainLoop, TimeBase, Transmitter};
    use rtic_monotonics::systick::*;
    use rtic_monotonics::Monotonic;
    use stm32f4xx_hal::otg_fs::UsbBusType;
    use usb_device::class_prelude::UsbBusAllocator;

    defmt::timestamp!("tick {=u32}", TimeBase::new(CounterChain).current_tick());

    #[shared]
    struct Shared {
        // Both EXTI handlers run at the same priority, so they never preempt
        // each other and together form the single producer.
        #[lock_free]
        capture: Capture,
        usb: UsbSerial,
    }

    #[local]
    struct Local {
        probe_low: ProbeLow,
        probes_high: ProbesHigh,
        main_loop: MainLoop<'static, CounterChain, RING_CAPACITY>,
        exti_mask: ExtiMask,
    }

    #[init(local = [
        ring: EventRing<RING_CAPACITY> = EventRing::new(),
        ep_memory: EndpointMemory = [0; 1024],
        usb_bus: Option<UsbBusAllocator<UsbBusType>> = None,
    ])]
    fn init(cx: init::Context) -> (Shared, Local) {
        defmt::info!("init");

        let board = hardware::setup(cx.device, cx.local.ep_memory, cx.local.usb_bus);

        let systick_mono_token = rtic_monotonics::create_systick_token!();
        Systick::start(cx.core.SYST, SYSCLK_FREQ, systick_mono_token);

        let (producer, consumer) = cx.local.ring.split();
        let capture = EdgeCapture::new(PROBE_PINS, PortB, board.timebase, producer);
        let main_loop = MainLoop::new(
            consumer,
            board.timebase,
            Transmitter::new(TransmitConfig::default(), Systick::now()),
        );

        (
            Shared {
                capture,
                usb: board.usb,
            },
            Local {
                probe_low: board.probe_low,
                probes_high: board.probes_high,
                main_loop,
                exti_mask: ExtiMask,
            },
        )
    }

    #[idle(local = [main_loop, exti_mask], shared = [usb])]
    fn idle(cx: idle::Context) -> ! {
        let main_loop = cx.local.main_loop;
        let mut link = SharedLink(cx.shared.usb);

        loop {
            main_loop.run_once(Systick::now(), &mut link, cx.local.exti_mask);
        }
    }

    #[task(binds = EXTI4, local = [probe_low], shared = [capture], priority = 3)]
    fn exti4(cx: exti4::Context) {
        cx.local.probe_low.service(cx.shared.capture);
    }

    #[task(binds = EXTI9_5, local = [probes_high], shared = [capture], priority = 3)]
    fn exti9_5(cx: exti9_5::Context) {
        cx.local.probes_high.service(cx.shared.capture);
    }

    #[task(binds = OTG_FS, shared = [usb], priority = 2)]
    fn otg_fs(mut cx: otg_fs::Context) {
        cx.shared.usb.lock(|usb| {
            usb.poll();
        });
    }
}
