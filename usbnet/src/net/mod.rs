/// Network side of the bridge — USB frames to TCP/IP via smoltcp.
///
/// Architecture:
///   USB class driver (raw Ethernet frames)
///       ↓ on_receive              ↑ link_output
///   FrameMailbox (one frame)      UsbLink (waits for USB capacity)
///       ↓                         ↑
///   UsbNetif (implements smoltcp::phy::Device)
///       ↓ ↑
///   smoltcp Interface (ARP, IP, TCP, UDP)
pub mod device;
pub mod frame;
pub mod mailbox;
pub mod netif;
pub mod poll;
pub mod stack;

pub use device::{NetifStats, UsbLink, UsbNetif};
pub use frame::Frame;
pub use mailbox::FrameMailbox;
pub use netif::{Netif, NetifFlags};
pub use poll::PollBudget;
pub use stack::{Bridge, LinkState};
