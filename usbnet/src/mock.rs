/// Scripted USB device and board for testing.
///
/// Simulates a USB network class driver entirely in memory. Used by the
/// unit tests and, with the `mock-usb` feature, by downstream crates that
/// want to exercise the bridge without hardware.
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::cell::Cell;

use crate::config::MAX_FRAME_LEN;
use crate::platform::{Platform, BOARD_ID_LEN};
use crate::usb::{callbacks, UsbDeviceStack, UsbNetClass};

/// In-memory USB device stack plus network class.
pub struct MockUsb {
    /// Result of the next `init()`.
    pub init_ok: bool,
    /// Host has configured the device.
    pub ready: bool,
    /// `can_transmit` answers, consumed front to back.
    pub can_transmit_script: VecDeque<bool>,
    /// Answer once the script is exhausted.
    pub default_can_transmit: bool,
    /// Drop `ready` after this many task calls.
    pub unready_after_tasks: Option<u32>,
    /// Frames the host sends; offered to `on_receive` during `task()`.
    pub inbound: VecDeque<Vec<u8>>,
    /// Frames that went out to the host, as copied by `on_transmit_read`.
    pub sent: Vec<Vec<u8>>,
    /// Frames refused by `on_receive` (flow control).
    pub rx_refused: u32,
    pub init_calls: u32,
    pub deinit_calls: u32,
    pub task_calls: u32,
    pub can_transmit_checks: u32,
    pub renew_calls: u32,
    /// Whether the class is waiting for a receive renew.
    waiting_renew: bool,
}

impl MockUsb {
    /// A device the host has not configured yet.
    pub fn new() -> Self {
        Self {
            init_ok: true,
            ready: false,
            can_transmit_script: VecDeque::new(),
            default_can_transmit: true,
            unready_after_tasks: None,
            inbound: VecDeque::new(),
            sent: Vec::new(),
            rx_refused: 0,
            init_calls: 0,
            deinit_calls: 0,
            task_calls: 0,
            can_transmit_checks: 0,
            renew_calls: 0,
            waiting_renew: false,
        }
    }

    /// A device already configured by the host.
    pub fn ready() -> Self {
        Self {
            ready: true,
            ..Self::new()
        }
    }

    /// Answers for the next `can_transmit` calls.
    pub fn script_can_transmit(&mut self, answers: &[bool]) {
        self.can_transmit_script.extend(answers.iter().copied());
    }

    /// Queue a frame from the host.
    pub fn push_inbound(&mut self, frame: &[u8]) {
        self.inbound.push_back(frame.to_vec());
    }
}

impl Default for MockUsb {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbDeviceStack for MockUsb {
    fn init(&mut self) -> bool {
        self.init_calls += 1;
        if self.init_ok {
            self.waiting_renew = false;
            // Class drivers announce (re)initialization from inside init.
            callbacks::on_reinit();
        }
        self.init_ok
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    fn task(&mut self) {
        self.task_calls += 1;
        if self.unready_after_tasks.is_some_and(|n| self.task_calls >= n) {
            self.ready = false;
        }

        if self.waiting_renew {
            return;
        }
        if let Some(frame) = self.inbound.front() {
            if callbacks::on_receive(frame) {
                self.inbound.pop_front();
                self.waiting_renew = true;
            } else {
                self.rx_refused += 1;
            }
        }
    }

    fn deinit(&mut self) {
        self.deinit_calls += 1;
        self.ready = false;
    }
}

impl UsbNetClass for MockUsb {
    fn can_transmit(&mut self, _len: usize) -> bool {
        self.can_transmit_checks += 1;
        self.can_transmit_script
            .pop_front()
            .unwrap_or(self.default_can_transmit)
    }

    fn transmit(&mut self, frame: &[u8], arg: u16) {
        let mut ntb = [0u8; MAX_FRAME_LEN];
        let len = callbacks::on_transmit_read(&mut ntb, frame, arg);
        self.sent.push(ntb[..len].to_vec());
    }

    fn signal_receive_ready(&mut self) {
        self.renew_calls += 1;
        self.waiting_renew = false;
    }
}

/// Board with a fixed id and a hand-cranked clock.
pub struct MockPlatform {
    pub board_id: [u8; BOARD_ID_LEN],
    now_ms: Cell<u64>,
}

impl MockPlatform {
    pub fn new(board_id: [u8; BOARD_ID_LEN]) -> Self {
        Self {
            board_id,
            now_ms: Cell::new(0),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now_ms.set(self.now_ms.get() + ms);
    }
}

impl Platform for MockPlatform {
    fn unique_board_id(&self) -> [u8; BOARD_ID_LEN] {
        self.board_id
    }

    fn now_ms(&self) -> u64 {
        self.now_ms.get()
    }
}
