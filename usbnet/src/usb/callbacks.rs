/// Callbacks invoked by the USB network class driver.
///
/// The class driver's callback signatures carry no context pointer, so the
/// live bridge publishes its receive mailbox here on start and withdraws it
/// on stop. This registry is the only process-wide state in the crate and
/// holds at most one mailbox.
use alloc::sync::Arc;
use spin::Mutex;

use crate::error::BridgeError;
use crate::net::mailbox::FrameMailbox;

static ACTIVE: Mutex<Option<Arc<FrameMailbox>>> = Mutex::new(None);

/// Publish `mailbox` as the receive target. Fails if another bridge is live.
pub(crate) fn attach(mailbox: Arc<FrameMailbox>) -> Result<(), BridgeError> {
    let mut active = ACTIVE.lock();
    if active.is_some() {
        return Err(BridgeError::InstanceActive);
    }
    *active = Some(mailbox);
    Ok(())
}

/// Withdraw `mailbox` if it is the one currently published.
pub(crate) fn detach(mailbox: &Arc<FrameMailbox>) {
    let mut active = ACTIVE.lock();
    if active.as_ref().is_some_and(|m| Arc::ptr_eq(m, mailbox)) {
        *active = None;
    }
}

/// True while a bridge is attached.
pub fn is_attached() -> bool {
    ACTIVE.lock().is_some()
}

// Clone out of the registry so the registry lock is released before the
// mailbox is touched.
fn active() -> Option<Arc<FrameMailbox>> {
    ACTIVE.lock().clone()
}

/// A frame arrived from the host.
///
/// Returns false if it cannot be accepted yet, which makes the class driver
/// hold it and apply flow control. With no bridge attached nothing is
/// accepted.
pub fn on_receive(bytes: &[u8]) -> bool {
    match active() {
        Some(mailbox) => {
            let accepted = mailbox.offer(bytes);
            if !accepted {
                log::trace!("[usbnet] rx busy, deferring {}-byte frame", bytes.len());
            }
            accepted
        }
        None => false,
    }
}

/// Copy an outgoing frame into the class driver's transfer buffer.
///
/// Returns the number of bytes copied, truncated to `dst`'s length.
pub fn on_transmit_read(dst: &mut [u8], frame: &[u8], _arg: u16) -> usize {
    let len = frame.len().min(dst.len());
    dst[..len].copy_from_slice(&frame[..len]);
    len
}

/// The class driver (re)initialized: drop anything left from the old session.
pub fn on_reinit() {
    if let Some(mailbox) = active() {
        mailbox.reset();
    }
}
