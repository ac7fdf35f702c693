/// Single-slot receive mailbox between the USB receive callback and the
/// service step.
///
/// The USB class hands over one frame, then waits for a receive renew
/// before it delivers the next one. The slot therefore never needs to hold
/// more than one frame; a second offer while the first is unconsumed is
/// refused so USB flow control pushes back on the host.
///
/// Offers arrive re-entrantly from inside USB servicing, on the same
/// thread as `drain`. The mutex only makes the mailbox reachable from the
/// callback registry: it is held for the copy and never across a call
/// into the USB or IP stack.
use spin::Mutex;

use super::frame::Frame;
use crate::config::MAX_FRAME_LEN;

struct Slot {
    frame: Option<Frame>,
    /// An offer was accepted but its frame was dropped; the USB class
    /// still expects a renew.
    renew_pending: bool,
}

pub struct FrameMailbox {
    slot: Mutex<Slot>,
}

impl FrameMailbox {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: None,
                renew_pending: false,
            }),
        }
    }

    /// Offer a received frame. Returns false if a frame is already held.
    ///
    /// Zero-length notifications are accepted without storing anything.
    /// Frames that are too long or cannot be allocated are accepted and
    /// silently dropped.
    pub fn offer(&self, bytes: &[u8]) -> bool {
        let mut slot = self.slot.lock();
        if slot.frame.is_some() {
            return false;
        }
        if bytes.is_empty() {
            return true;
        }
        match Frame::try_copy(bytes) {
            Some(frame) => slot.frame = Some(frame),
            None => {
                if bytes.len() > MAX_FRAME_LEN {
                    log::warn!("[usbnet] dropping oversize frame ({} bytes)", bytes.len());
                } else {
                    log::warn!("[usbnet] no memory for {}-byte frame, dropped", bytes.len());
                }
                slot.renew_pending = true;
            }
        }
        true
    }

    /// Take the held frame, leaving the slot empty.
    pub fn drain(&self) -> Option<Frame> {
        self.slot.lock().frame.take()
    }

    /// Take the pending-renew marker left by a dropped frame.
    pub fn take_renew(&self) -> bool {
        core::mem::take(&mut self.slot.lock().renew_pending)
    }

    /// Discard any held frame. Called when the USB class (re)initializes so
    /// nothing from an earlier session leaks into the new one.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        if slot.frame.take().is_some() {
            log::debug!("[usbnet] discarded stale frame on USB reinit");
        }
        slot.renew_pending = false;
    }

    pub fn is_occupied(&self) -> bool {
        self.slot.lock().frame.is_some()
    }
}

impl Default for FrameMailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_add(seed)).collect()
    }

    #[test]
    fn starts_empty() {
        let mb = FrameMailbox::new();
        assert!(!mb.is_occupied());
        assert!(mb.drain().is_none());
    }

    #[test]
    fn drain_returns_offered_bytes() {
        let mb = FrameMailbox::new();
        let bytes = pattern(64, 7);
        assert!(mb.offer(&bytes));
        let frame = mb.drain().unwrap();
        assert_eq!(frame.as_slice(), &bytes[..]);
        assert!(!mb.is_occupied());
        assert!(mb.drain().is_none());
    }

    #[test]
    fn second_offer_rejected_and_first_kept() {
        let mb = FrameMailbox::new();
        let first = pattern(60, 1);
        let second = pattern(90, 2);
        assert!(mb.offer(&first));
        assert!(!mb.offer(&second));
        assert!(!mb.offer(&second));
        assert_eq!(mb.drain().unwrap().as_slice(), &first[..]);
        assert!(mb.drain().is_none());
    }

    #[test]
    fn offer_succeeds_again_after_drain() {
        let mb = FrameMailbox::new();
        assert!(mb.offer(&pattern(20, 0)));
        mb.drain();
        let next = pattern(30, 9);
        assert!(mb.offer(&next));
        assert_eq!(mb.drain().unwrap().as_slice(), &next[..]);
    }

    #[test]
    fn zero_length_accepted_without_storing() {
        let mb = FrameMailbox::new();
        assert!(mb.offer(&[]));
        assert!(!mb.is_occupied());
        assert!(!mb.take_renew());
        assert!(mb.drain().is_none());
    }

    #[test]
    fn zero_length_rejected_while_occupied() {
        let mb = FrameMailbox::new();
        assert!(mb.offer(&pattern(10, 0)));
        assert!(!mb.offer(&[]));
    }

    #[test]
    fn oversize_frame_dropped_but_accepted() {
        let mb = FrameMailbox::new();
        assert!(mb.offer(&vec![0xAB; MAX_FRAME_LEN + 1]));
        assert!(mb.drain().is_none());
        assert!(mb.take_renew());
        assert!(!mb.take_renew());
    }

    #[test]
    fn reset_discards_frame() {
        let mb = FrameMailbox::new();
        assert!(mb.offer(&pattern(64, 3)));
        mb.reset();
        assert!(mb.drain().is_none());

        // Also a no-op on an empty mailbox.
        mb.reset();
        assert!(mb.drain().is_none());
    }

    #[test]
    fn reset_clears_pending_renew() {
        let mb = FrameMailbox::new();
        mb.offer(&vec![0; MAX_FRAME_LEN + 10]);
        mb.reset();
        assert!(!mb.take_renew());
    }
}
