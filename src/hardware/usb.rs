use hal::otg_fs::UsbBusType;
use usb_device::class_prelude::UsbBusAllocator;
use usb_device::prelude::*;
use usbd_serial::{SerialPort, USB_CLASS_CDC};

use super::hal;
use crate::transmit::{SendStatus, Transport};

/// CDC-ACM port to the host.
pub struct UsbSerial {
    device: UsbDevice<'static, UsbBusType>,
    serial: SerialPort<'static, UsbBusType>,
    // Bytes of the packet in flight already taken by the serial buffer
    accepted: usize,
}

impl UsbSerial {
    pub fn new(bus: &'static UsbBusAllocator<UsbBusType>) -> Self {
        let serial = SerialPort::new(bus);
        let device = UsbDeviceBuilder::new(bus, UsbVidPid(0x16c0, 0x27dd))
            .strings(&[StringDescriptors::default()
                .manufacturer("deltronix")
                .product("logic-capture")
                .serial_number("LC-0001")])
            .unwrap()
            .device_class(USB_CLASS_CDC)
            .build();
        Self {
            device,
            serial,
            accepted: 0,
        }
    }

    /// Service the USB peripheral, call from the OTG_FS interrupt.
    pub fn poll(&mut self) -> bool {
        self.device.poll(&mut [&mut self.serial])
    }

    pub fn is_configured(&self) -> bool {
        self.device.state() == UsbDeviceState::Configured
    }
}

impl Transport for UsbSerial {
    /// The serial class may take part of a packet; the remainder is offered
    /// on the next attempt with the same packet, which only reports `Sent`
    /// once every byte is queued.
    fn send(&mut self, packet: &[u8]) -> SendStatus {
        if !self.is_configured() {
            return SendStatus::Busy;
        }
        match self.serial.write(&packet[self.accepted..]) {
            Ok(n) if self.accepted + n >= packet.len() => {
                self.accepted = 0;
                SendStatus::Sent
            }
            Ok(n) => {
                self.accepted += n;
                SendStatus::Busy
            }
            Err(UsbError::WouldBlock) => SendStatus::Busy,
            Err(_) => SendStatus::Busy,
        }
    }
}

/// [`UsbSerial`] behind an RTIC resource lock, so the main loop and the USB
/// interrupt can both reach it. The lock is held for one attempt only.
pub struct SharedLink<M>(pub M);

impl<M: rtic::Mutex<T = UsbSerial>> Transport for SharedLink<M> {
    fn send(&mut self, packet: &[u8]) -> SendStatus {
        self.0.lock(|usb| usb.send(packet))
    }
}
