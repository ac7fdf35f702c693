/// smoltcp PHY device adapter for the USB network class.
///
/// This bridges the USB class driver (which moves whole Ethernet frames
/// one at a time) and smoltcp (which expects a `Device` trait impl).
/// Received frames are staged here by the service step and pulled by
/// smoltcp through `RxToken`; outgoing frames leave through
/// `UsbLink::link_output`, which waits cooperatively for USB capacity.
use alloc::vec;
use smoltcp::phy::{self, Device, DeviceCapabilities, Medium};
use smoltcp::time::Instant;

use super::frame::Frame;
use super::poll::PollBudget;
use crate::config::NET_MTU;
use crate::error::{InputError, LinkError};
use crate::usb::UsbNetDevice;

/// Interface counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetifStats {
    /// Frames handed to the IP stack.
    pub rx_frames: u64,
    pub rx_bytes: u64,
    /// Received frames released because delivery failed.
    pub rx_dropped: u64,
    /// Frames accepted by the USB class.
    pub tx_frames: u64,
    pub tx_bytes: u64,
    /// Outgoing frames lost to `LinkError`.
    pub tx_dropped: u64,
    /// USB task calls made while waiting for transmit capacity.
    pub tx_busy_polls: u64,
}

/// Transmit side: owns the USB device and the flow-control loop.
pub struct UsbLink<U> {
    usb: U,
    tx_poll_limit: Option<u32>,
    stats: NetifStats,
}

impl<U: UsbNetDevice> UsbLink<U> {
    pub fn new(usb: U, tx_poll_limit: Option<u32>) -> Self {
        Self {
            usb,
            tx_poll_limit,
            stats: NetifStats::default(),
        }
    }

    /// Hand one frame to the USB class.
    ///
    /// Fails fast with `NotReady` until the host has configured the
    /// adapter. Otherwise yields to the USB task until the class has room
    /// for the frame; gives up with `Busy` after `tx_poll_limit` yields.
    pub fn link_output(&mut self, frame: &[u8]) -> Result<(), LinkError> {
        let mut budget = PollBudget::new(self.tx_poll_limit);
        loop {
            if !self.usb.is_ready() {
                return Err(LinkError::NotReady);
            }

            if self.usb.can_transmit(frame.len()) {
                self.usb.transmit(frame, 0);
                self.stats.tx_frames += 1;
                self.stats.tx_bytes += frame.len() as u64;
                return Ok(());
            }

            if !budget.spend() {
                return Err(LinkError::Busy);
            }

            // Let the USB stack finish the previous transfer.
            self.usb.task();
            self.stats.tx_busy_polls += 1;
        }
    }

    pub fn usb(&self) -> &U {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }

    pub fn stats(&self) -> NetifStats {
        self.stats
    }
}

/// The `Device` smoltcp polls: one staged receive frame plus the link.
pub struct UsbNetif<U> {
    link: UsbLink<U>,
    rx: Option<Frame>,
}

impl<U: UsbNetDevice> UsbNetif<U> {
    pub fn new(usb: U, tx_poll_limit: Option<u32>) -> Self {
        Self {
            link: UsbLink::new(usb, tx_poll_limit),
            rx: None,
        }
    }

    /// Stage a received frame for the next interface poll.
    /// The frame is released if one is already staged.
    pub fn stage(&mut self, frame: Frame) -> Result<(), InputError> {
        if self.rx.is_some() {
            return Err(InputError::Occupied);
        }
        self.rx = Some(frame);
        Ok(())
    }

    pub fn has_staged(&self) -> bool {
        self.rx.is_some()
    }

    /// Release a staged frame the IP stack never took. Returns true if
    /// there was one.
    pub fn discard_staged(&mut self) -> bool {
        self.rx.take().is_some()
    }

    pub fn link(&self) -> &UsbLink<U> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut UsbLink<U> {
        &mut self.link
    }

    pub fn usb(&self) -> &U {
        self.link.usb()
    }

    pub fn usb_mut(&mut self) -> &mut U {
        self.link.usb_mut()
    }

    pub fn stats(&self) -> NetifStats {
        self.link.stats
    }

    pub(crate) fn count_rx_dropped(&mut self) {
        self.link.stats.rx_dropped += 1;
    }
}

impl<U: UsbNetDevice> Device for UsbNetif<U> {
    type RxToken<'a> = RxToken where Self: 'a;
    type TxToken<'a> = TxToken<'a, U> where Self: 'a;

    fn receive(&mut self, _timestamp: Instant) -> Option<(Self::RxToken<'_>, Self::TxToken<'_>)> {
        let frame = self.rx.take()?;
        self.link.stats.rx_frames += 1;
        self.link.stats.rx_bytes += frame.len() as u64;
        log::trace!("[usbnet] rx {} bytes", frame.len());
        Some((RxToken { frame }, TxToken { link: &mut self.link }))
    }

    fn transmit(&mut self, _timestamp: Instant) -> Option<Self::TxToken<'_>> {
        // Capacity is waited for inside link_output.
        Some(TxToken { link: &mut self.link })
    }

    fn capabilities(&self) -> DeviceCapabilities {
        let mut caps = DeviceCapabilities::default();
        caps.medium = Medium::Ethernet;
        caps.max_transmission_unit = NET_MTU;
        caps.max_burst_size = Some(1);
        caps
    }
}

/// Receive token — owns the frame taken from the staging slot.
pub struct RxToken {
    frame: Frame,
}

impl phy::RxToken for RxToken {
    fn consume<R, F>(mut self, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        f(self.frame.as_mut_slice())
    }
}

/// Transmit token — fills a buffer and pushes it out over USB.
pub struct TxToken<'a, U> {
    link: &'a mut UsbLink<U>,
}

impl<U: UsbNetDevice> phy::TxToken for TxToken<'_, U> {
    fn consume<R, F>(self, len: usize, f: F) -> R
    where
        F: FnOnce(&mut [u8]) -> R,
    {
        let mut buf = vec![0u8; len];
        let result = f(&mut buf);

        if let Err(e) = self.link.link_output(&buf) {
            self.link.stats.tx_dropped += 1;
            log::debug!("[usbnet] tx {} bytes dropped: {}", len, e);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockUsb;
    use smoltcp::phy::{RxToken as _, TxToken as _};

    fn frame(len: usize) -> Frame {
        let bytes: alloc::vec::Vec<u8> = (0..len).map(|i| i as u8).collect();
        Frame::try_copy(&bytes).unwrap()
    }

    #[test]
    fn link_output_waits_for_capacity() {
        let mut usb = MockUsb::ready();
        usb.script_can_transmit(&[false, false]);
        let mut link = UsbLink::new(usb, None);

        assert_eq!(link.link_output(&[0xAA; 60]), Ok(()));
        assert_eq!(link.usb().task_calls, 2);
        assert_eq!(link.usb().can_transmit_checks, 3);
        assert_eq!(link.usb().sent.len(), 1);
        assert_eq!(link.usb().sent[0], [0xAA; 60]);
        assert_eq!(link.stats().tx_busy_polls, 2);
    }

    #[test]
    fn link_output_immediate_when_capacity_free() {
        let mut link = UsbLink::new(MockUsb::ready(), Some(0));
        assert_eq!(link.link_output(&[1, 2, 3]), Ok(()));
        assert_eq!(link.usb().task_calls, 0);
        assert_eq!(link.stats().tx_frames, 1);
        assert_eq!(link.stats().tx_bytes, 3);
    }

    #[test]
    fn link_output_not_ready_fails_fast() {
        let mut link = UsbLink::new(MockUsb::new(), None);
        assert_eq!(link.link_output(&[0; 60]), Err(LinkError::NotReady));
        assert_eq!(link.usb().task_calls, 0);
        assert_eq!(link.usb().can_transmit_checks, 0);
        assert!(link.usb().sent.is_empty());
    }

    #[test]
    fn link_output_gives_up_after_limit() {
        let mut usb = MockUsb::ready();
        usb.default_can_transmit = false;
        let mut link = UsbLink::new(usb, Some(5));
        assert_eq!(link.link_output(&[0; 60]), Err(LinkError::Busy));
        assert_eq!(link.usb().task_calls, 5);
        assert!(link.usb().sent.is_empty());
    }

    #[test]
    fn link_output_stops_when_host_goes_away() {
        let mut usb = MockUsb::ready();
        usb.default_can_transmit = false;
        usb.unready_after_tasks = Some(3);
        let mut link = UsbLink::new(usb, None);
        assert_eq!(link.link_output(&[0; 60]), Err(LinkError::NotReady));
        assert_eq!(link.usb().task_calls, 3);
    }

    #[test]
    fn stage_holds_one_frame() {
        let mut dev = UsbNetif::new(MockUsb::ready(), None);
        assert!(dev.stage(frame(64)).is_ok());
        assert_eq!(dev.stage(frame(32)), Err(InputError::Occupied));
        assert!(dev.has_staged());
        assert!(dev.discard_staged());
        assert!(!dev.discard_staged());
    }

    #[test]
    fn receive_hands_out_staged_frame() {
        let mut dev = UsbNetif::new(MockUsb::ready(), None);
        assert!(dev.receive(Instant::from_millis(0)).is_none());

        dev.stage(frame(64)).unwrap();
        let (rx, _tx) = dev.receive(Instant::from_millis(0)).unwrap();
        let seen = rx.consume(|buf| (buf.len(), buf[63]));
        assert_eq!(seen, (64, 63));

        assert!(!dev.has_staged());
        assert_eq!(dev.stats().rx_frames, 1);
        assert_eq!(dev.stats().rx_bytes, 64);
    }

    #[test]
    fn tx_token_sends_filled_buffer() {
        let mut dev = UsbNetif::new(MockUsb::ready(), None);
        let tx = dev.transmit(Instant::from_millis(0)).unwrap();
        tx.consume(4, |buf| buf.copy_from_slice(&[9, 8, 7, 6]));
        assert_eq!(dev.usb().sent.len(), 1);
        assert_eq!(dev.usb().sent[0], [9, 8, 7, 6]);
    }

    #[test]
    fn tx_token_counts_dropped_frames() {
        let mut dev = UsbNetif::new(MockUsb::new(), None);
        let tx = dev.transmit(Instant::from_millis(0)).unwrap();
        tx.consume(60, |buf| buf.fill(0));
        assert_eq!(dev.stats().tx_dropped, 1);
        assert!(dev.usb().sent.is_empty());
    }

    #[test]
    fn capabilities_are_ethernet() {
        let dev = UsbNetif::new(MockUsb::new(), None);
        let caps = dev.capabilities();
        assert_eq!(caps.medium, Medium::Ethernet);
        assert_eq!(caps.max_transmission_unit, NET_MTU);
        assert_eq!(caps.max_burst_size, Some(1));
    }
    /// Host that keeps the class busy for a fixed number of checks.
    struct Stalled {
        busy_checks: u64,
        checks: u64,
    }

    impl crate::usb::UsbDeviceStack for Stalled {
        fn init(&mut self) -> bool {
            true
        }
        fn is_ready(&self) -> bool {
            true
        }
        fn task(&mut self) {}
        fn deinit(&mut self) {}
    }

    impl crate::usb::UsbNetClass for Stalled {
        fn can_transmit(&mut self, _len: usize) -> bool {
            self.checks += 1;
            self.checks > self.busy_checks
        }
        fn transmit(&mut self, _frame: &[u8], _arg: u16) {}
        fn signal_receive_ready(&mut self) {}
    }

    #[test]
    #[ignore = "spins through more than u32::MAX USB polls"]
    fn unbounded_wait_outlasts_u32_polls() {
        let usb = Stalled {
            busy_checks: u32::MAX as u64 + 2,
            checks: 0,
        };
        let mut link = UsbLink::new(usb, None);
        assert_eq!(link.link_output(&[0; 60]), Ok(()));
        assert_eq!(link.stats().tx_busy_polls, u32::MAX as u64 + 2);
        assert_eq!(link.stats().tx_frames, 1);
    }
}
