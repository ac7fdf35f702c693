/// Error types for the USB network bridge.
///
/// Start failures are fatal for the caller; link and input errors are
/// handled inside the bridge and only ever surface in statistics and logs.
use core::fmt;

/// Fatal failures of `Bridge::start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeError {
    /// `start` called while the bridge is not `Uninitialized`.
    AlreadyRunning,
    /// Another bridge already owns the USB callback registry.
    InstanceActive,
    /// The USB device stack refused to initialize.
    UsbInit,
    /// The virtual interface could not be registered with the IP stack.
    AddInterface,
    /// The interface never reported up within the configured wait.
    InterfaceDown,
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeError::AlreadyRunning => write!(f, "bridge already running"),
            BridgeError::InstanceActive => write!(f, "another USB network bridge is active"),
            BridgeError::UsbInit => write!(f, "USB device stack init failed"),
            BridgeError::AddInterface => write!(f, "could not add interface"),
            BridgeError::InterfaceDown => write!(f, "interface did not come up"),
        }
    }
}

/// Link-output failures, reported back to the IP stack's transmit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The USB host has not configured the adapter yet.
    NotReady,
    /// Transmit capacity did not free up within the poll limit.
    Busy,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::NotReady => write!(f, "USB link not ready"),
            LinkError::Busy => write!(f, "USB transmit path busy"),
        }
    }
}

/// Frame delivery failures into the IP stack's input path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// A previously delivered frame has not been consumed yet.
    Occupied,
    /// The IP stack polled but did not take the frame.
    NotConsumed,
    /// No interface is registered.
    NoInterface,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::Occupied => write!(f, "input slot occupied"),
            InputError::NotConsumed => write!(f, "frame not consumed by IP stack"),
            InputError::NoInterface => write!(f, "no interface registered"),
        }
    }
}
