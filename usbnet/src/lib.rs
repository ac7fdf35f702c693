#![no_std]

//! Bridge between a USB peripheral-mode Ethernet adapter and an on-device
//! smoltcp interface.
//!
//! The application owns one [`Bridge`], starts it once, calls
//! [`Bridge::service`] on every main-loop iteration and stops it on the
//! way out. The USB class driver reaches the bridge through the callbacks
//! in [`usb::callbacks`].

extern crate alloc;

pub mod config;
pub mod error;
pub mod identity;
pub mod net;
pub mod platform;
pub mod usb;

#[cfg(any(test, feature = "mock-usb"))]
pub mod mock;

pub use config::{BridgeConfig, InputMode, MAX_FRAME_LEN, NET_MTU};
pub use error::{BridgeError, InputError, LinkError};
pub use identity::LinkAddresses;
pub use net::{Bridge, Frame, LinkState, NetifFlags, NetifStats};
pub use platform::Platform;
pub use usb::{UsbDeviceStack, UsbNetClass, UsbNetDevice};
