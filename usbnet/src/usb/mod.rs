/// USB side of the bridge.
///
/// The USB device stack and its network class driver (ECM/RNDIS or NCM)
/// are external. The bridge consumes them through the two traits below and
/// exposes the class callbacks in [`callbacks`].
///
///   USB host
///       ↓ ↑
///   UsbDeviceStack + UsbNetClass (external)
///       ↓ callbacks::on_receive      ↑ UsbNetClass::transmit
///   FrameMailbox                     UsbLink::link_output
///       ↓ ↑
///   smoltcp Interface
pub mod callbacks;

/// Device-level entry points of the USB stack.
pub trait UsbDeviceStack {
    /// Bring up the device stack. Returns false on failure.
    fn init(&mut self) -> bool;

    /// True once the host has configured the device.
    fn is_ready(&self) -> bool;

    /// Run pending USB work. May call back into [`callbacks::on_receive`],
    /// [`callbacks::on_transmit_read`] or [`callbacks::on_reinit`].
    fn task(&mut self);

    /// Tear down the device stack.
    fn deinit(&mut self);
}

/// Operations of the USB network class driver.
pub trait UsbNetClass {
    /// Whether the class can queue a frame of `len` bytes right now.
    fn can_transmit(&mut self, len: usize) -> bool;

    /// Queue `frame` for the host. The driver copies the data into its own
    /// transfer buffer through [`callbacks::on_transmit_read`]; `arg` is
    /// passed through untouched.
    fn transmit(&mut self, frame: &[u8], arg: u16);

    /// Re-arm reception after the previous frame has been consumed.
    fn signal_receive_ready(&mut self);
}

/// A complete USB network device: stack plus network class.
pub trait UsbNetDevice: UsbDeviceStack + UsbNetClass {}

impl<T: UsbDeviceStack + UsbNetClass> UsbNetDevice for T {}
