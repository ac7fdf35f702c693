/// USB network bridge built on smoltcp.
///
/// Owns the USB device, the smoltcp interface and the receive mailbox,
/// and provides:
/// - start/stop lifecycle of the virtual interface
/// - the cooperative service step, called once per main-loop iteration
/// - access to the socket set for applications running on the interface
use alloc::sync::Arc;
use alloc::vec;

use smoltcp::iface::{Config, Interface, SocketSet};
use smoltcp::time::Instant;
use smoltcp::wire::{EthernetAddress, IpCidr, Ipv4Cidr};
#[cfg(feature = "ipv6")]
use smoltcp::wire::IpAddress;

use super::device::{NetifStats, UsbNetif};
use super::frame::Frame;
use super::mailbox::FrameMailbox;
use super::netif::{self, Netif, NetifFlags};
use super::poll::PollBudget;
use crate::config::{BridgeConfig, InputMode};
use crate::error::{BridgeError, InputError};
use crate::identity::{self, LinkAddresses};
use crate::platform::Platform;
use crate::usb::{callbacks, UsbNetDevice};

/// Lifecycle of the bridge.
///
/// `Uninitialized → Starting → Running → Stopping → Uninitialized`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Uninitialized,
    Starting,
    Running,
    Stopping,
}

/// Poll `condition` until it holds. `limit` caps the number of failed
/// checks; `None` polls forever. Returns true if the condition was met.
pub fn poll_until<F>(limit: Option<u32>, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let mut budget = PollBudget::new(limit);
    loop {
        if condition() {
            return true;
        }
        if !budget.spend() {
            return false;
        }
        core::hint::spin_loop();
    }
}

/// The USB network bridge. Only one may be started at a time.
pub struct Bridge<U: UsbNetDevice, P: Platform> {
    config: BridgeConfig,
    platform: P,
    device: UsbNetif<U>,
    netif: Netif,
    /// Present exactly while the interface is registered.
    iface: Option<Interface>,
    sockets: SocketSet<'static>,
    mailbox: Arc<FrameMailbox>,
    addresses: Option<LinkAddresses>,
    state: LinkState,
}

impl<U: UsbNetDevice, P: Platform> Bridge<U, P> {
    pub fn new(usb: U, platform: P, config: BridgeConfig) -> Self {
        let device = UsbNetif::new(usb, config.tx_poll_limit);
        Self {
            config,
            platform,
            device,
            netif: Netif::new(EthernetAddress([0; 6])),
            iface: None,
            sockets: SocketSet::new(vec![]),
            mailbox: Arc::new(FrameMailbox::new()),
            addresses: None,
            state: LinkState::Uninitialized,
        }
    }

    /// Bring up USB, register the interface and wait for it to come up.
    ///
    /// On failure everything already brought up is torn down again and the
    /// bridge is back in `Uninitialized`.
    pub fn start(&mut self) -> Result<(), BridgeError> {
        if self.state != LinkState::Uninitialized {
            return Err(BridgeError::AlreadyRunning);
        }
        self.state = LinkState::Starting;

        match self.bring_up() {
            Ok(()) => {
                self.state = LinkState::Running;
                log::info!(
                    "[usbnet] {} up at {}",
                    self.netif.name(),
                    self.config.address
                );
                Ok(())
            }
            Err(e) => {
                log::warn!("[usbnet] start failed: {}", e);
                self.state = LinkState::Uninitialized;
                Err(e)
            }
        }
    }

    fn bring_up(&mut self) -> Result<(), BridgeError> {
        callbacks::attach(self.mailbox.clone())?;
        self.mailbox.reset();

        if !self.device.usb_mut().init() {
            callbacks::detach(&self.mailbox);
            return Err(BridgeError::UsbInit);
        }

        if self.config.init_ip_stack {
            self.sockets = SocketSet::new(vec![]);
        }

        let board_id = self.platform.unique_board_id();
        let addresses = LinkAddresses::from_board_id(&board_id);
        self.addresses = Some(addresses);
        log::info!("[usbnet] using MAC {}", addresses.netif);

        let registered = self
            .add_interface(addresses.netif, identity::random_seed(&board_id))
            .and_then(|()| self.wait_for_up());

        if let Err(e) = registered {
            self.remove_interface();
            self.addresses = None;
            self.device.usb_mut().deinit();
            callbacks::detach(&self.mailbox);
            return Err(e);
        }
        Ok(())
    }

    /// Register the virtual interface with smoltcp.
    fn add_interface(&mut self, hwaddr: EthernetAddress, seed: u64) -> Result<(), BridgeError> {
        let mut netif = Netif::new(hwaddr);
        netif::netif_init(&mut netif);

        let prefix_len = netif::netmask_prefix_len(self.config.netmask).ok_or_else(|| {
            log::warn!("[usbnet] netmask {} is not contiguous", self.config.netmask);
            BridgeError::AddInterface
        })?;
        let cidr = Ipv4Cidr::new(self.config.address, prefix_len);
        netif.ipv4 = Some(cidr);
        netif.gateway = self.config.gateway;

        let mut config = Config::new(hwaddr.into());
        config.random_seed = seed;
        let now = self.now();
        let mut iface = Interface::new(config, &mut self.device, now);

        let mut added = false;
        iface.update_ip_addrs(|addrs| {
            added = addrs.push(IpCidr::Ipv4(cidr)).is_ok();
        });
        if !added {
            log::warn!("[usbnet] error adding netif address");
            return Err(BridgeError::AddInterface);
        }

        #[cfg(feature = "ipv6")]
        if self.config.ipv6_link_local {
            let link_local = netif::link_local_from_mac(hwaddr);
            let mut added = false;
            iface.update_ip_addrs(|addrs| {
                added = addrs.push(IpCidr::new(IpAddress::Ipv6(link_local), 64)).is_ok();
            });
            if !added {
                log::warn!("[usbnet] error adding IPv6 link-local address");
                return Err(BridgeError::AddInterface);
            }
            netif.ipv6_link_local = Some(link_local);
        }

        // Default route. Without a gateway only the local subnet is reachable.
        if !self.config.gateway.is_unspecified() {
            iface
                .routes_mut()
                .add_default_ipv4_route(self.config.gateway)
                .map_err(|_| BridgeError::AddInterface)?;
        }

        self.netif = netif;
        self.iface = Some(iface);
        Ok(())
    }

    // `netif_init` raises UP synchronously while registering, so this
    // normally holds on the first check. `InterfaceDown` means registration
    // left the flag clear.
    fn wait_for_up(&self) -> Result<(), BridgeError> {
        if poll_until(self.config.up_wait_limit, || self.netif.is_up()) {
            Ok(())
        } else {
            Err(BridgeError::InterfaceDown)
        }
    }

    /// Unregister the interface. Returns true if one was registered.
    fn remove_interface(&mut self) -> bool {
        self.device.discard_staged();
        self.iface.take().is_some()
    }

    /// Remove the interface and shut USB down. Safe to call in any state;
    /// only the first call after a start does anything.
    pub fn stop(&mut self) {
        if self.state == LinkState::Uninitialized {
            return;
        }
        self.state = LinkState::Stopping;

        if self.remove_interface() {
            log::info!("[usbnet] {} removed", self.netif.name());
        }
        self.netif.flags = NetifFlags::empty();
        self.device.usb_mut().deinit();
        self.mailbox.reset();
        callbacks::detach(&self.mailbox);

        self.state = LinkState::Uninitialized;
    }

    /// One cooperative tick: run USB, feed a received frame to the IP
    /// stack, advance IP timers. Must be called regularly; does nothing
    /// unless the bridge is running.
    pub fn service(&mut self) {
        if self.state != LinkState::Running {
            return;
        }

        self.device.usb_mut().task();

        let frame = self.mailbox.drain();
        let renew = self.mailbox.take_renew();
        let had_frame = frame.is_some();
        if let Some(frame) = frame {
            let len = frame.len();
            if let Err(e) = self.input(frame) {
                self.device.count_rx_dropped();
                log::debug!("[usbnet] rx {} bytes dropped: {}", len, e);
            }
        }
        if had_frame || renew {
            self.device.usb_mut().signal_receive_ready();
        }

        self.poll();
    }

    /// Deliver one received frame to the interface. The frame is released
    /// on failure.
    fn input(&mut self, frame: Frame) -> Result<(), InputError> {
        let now = self.now();
        let Some(iface) = self.iface.as_mut() else {
            return Err(InputError::NoInterface);
        };
        self.device.stage(frame)?;

        match self.config.input_mode {
            InputMode::Immediate => {
                iface.poll(now, &mut self.device, &mut self.sockets);
                if self.device.discard_staged() {
                    Err(InputError::NotConsumed)
                } else {
                    Ok(())
                }
            }
            InputMode::Deferred => Ok(()),
        }
    }

    /// Advance IP-stack timers and flush pending egress.
    fn poll(&mut self) {
        let now = self.now();
        if let Some(iface) = self.iface.as_mut() {
            iface.poll(now, &mut self.device, &mut self.sockets);
        }
    }

    /// Service the bridge until `should_stop` returns true. The predicate
    /// is checked after every step.
    pub fn run_until<F>(&mut self, mut should_stop: F)
    where
        F: FnMut() -> bool,
    {
        loop {
            self.service();
            if should_stop() {
                break;
            }
        }
    }

    /// Current timestamp for smoltcp.
    fn now(&self) -> Instant {
        Instant::from_millis(self.platform.now_ms() as i64)
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True while running with the interface up.
    pub fn is_up(&self) -> bool {
        self.state == LinkState::Running && self.iface.is_some() && self.netif.is_up()
    }

    pub fn is_registered(&self) -> bool {
        self.iface.is_some()
    }

    pub fn netif(&self) -> &Netif {
        &self.netif
    }

    /// Addresses derived at start, `None` before the first start.
    pub fn addresses(&self) -> Option<LinkAddresses> {
        self.addresses
    }

    /// Address the USB class should report to the host as its own.
    pub fn usb_mac(&self) -> Option<EthernetAddress> {
        self.addresses.map(|a| a.usb)
    }

    pub fn interface(&self) -> Option<&Interface> {
        self.iface.as_ref()
    }

    pub fn sockets_mut(&mut self) -> &mut SocketSet<'static> {
        &mut self.sockets
    }

    /// Interface and socket set together, for opening sockets that need
    /// the interface context (TCP connect).
    pub fn interface_and_sockets(&mut self) -> Option<(&mut Interface, &mut SocketSet<'static>)> {
        let iface = self.iface.as_mut()?;
        Some((iface, &mut self.sockets))
    }

    pub fn stats(&self) -> NetifStats {
        self.device.stats()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn usb(&self) -> &U {
        self.device.usb()
    }

    pub fn usb_mut(&mut self) -> &mut U {
        self.device.usb_mut()
    }
}

impl<U: UsbNetDevice, P: Platform> Drop for Bridge<U, P> {
    fn drop(&mut self) {
        self.stop();
    }
}
