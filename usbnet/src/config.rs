/// Bridge configuration.
///
/// Defaults match the usual USB-gadget setup: the device answers on
/// 192.168.7.1/24 and the host gets its lease from a DHCP server running
/// on top of the bridge. There is no gateway on the virtual segment.
use smoltcp::wire::Ipv4Address;

/// MTU negotiated by the USB network class (full Ethernet frame, no FCS).
pub const NET_MTU: usize = 1514;

/// Largest frame the bridge relays in either direction.
pub const MAX_FRAME_LEN: usize = NET_MTU;

static_assertions::const_assert_eq!(MAX_FRAME_LEN, NET_MTU);
static_assertions::const_assert!(NET_MTU <= u16::MAX as usize);

/// USB task calls allowed while waiting for transmit capacity.
pub const DEFAULT_TX_POLL_LIMIT: u32 = 10_000;

/// Spins allowed while waiting for the interface to report up.
pub const DEFAULT_UP_WAIT_LIMIT: u32 = 1_000;

/// How the service step hands a received frame to the IP stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Stage the frame and poll the interface right away.
    #[default]
    Immediate,
    /// Stage the frame only; the timer poll at the end of the step picks it up.
    Deferred,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address of the on-device interface.
    pub address: Ipv4Address,
    /// Must be a contiguous mask.
    pub netmask: Ipv4Address,
    /// `0.0.0.0` installs no default route.
    pub gateway: Ipv4Address,
    /// Also assign an EUI-64 link-local IPv6 address (needs the `ipv6` feature).
    pub ipv6_link_local: bool,
    /// Start from a fresh socket set. When false, sockets survive a restart.
    pub init_ip_stack: bool,
    pub input_mode: InputMode,
    /// `None` waits for transmit capacity forever.
    pub tx_poll_limit: Option<u32>,
    /// `None` waits for the interface to come up forever.
    pub up_wait_limit: Option<u32>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            address: Ipv4Address::new(192, 168, 7, 1),
            netmask: Ipv4Address::new(255, 255, 255, 0),
            gateway: Ipv4Address::UNSPECIFIED,
            ipv6_link_local: true,
            init_ip_stack: true,
            input_mode: InputMode::Immediate,
            tx_poll_limit: Some(DEFAULT_TX_POLL_LIMIT),
            up_wait_limit: Some(DEFAULT_UP_WAIT_LIMIT),
        }
    }
}

impl BridgeConfig {
    /// Config with the given IPv4 triple and default everything else.
    pub fn with_ipv4(address: Ipv4Address, netmask: Ipv4Address, gateway: Ipv4Address) -> Self {
        Self {
            address,
            netmask,
            gateway,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_usb_gadget_subnet() {
        let cfg = BridgeConfig::default();
        assert_eq!(cfg.address, Ipv4Address::new(192, 168, 7, 1));
        assert_eq!(cfg.netmask, Ipv4Address::new(255, 255, 255, 0));
        assert!(cfg.gateway.is_unspecified());
        assert_eq!(cfg.input_mode, InputMode::Immediate);
    }

    #[test]
    fn with_ipv4_keeps_other_defaults() {
        let cfg = BridgeConfig::with_ipv4(
            Ipv4Address::new(10, 1, 0, 1),
            Ipv4Address::new(255, 255, 0, 0),
            Ipv4Address::new(10, 1, 0, 254),
        );
        assert_eq!(cfg.address, Ipv4Address::new(10, 1, 0, 1));
        assert_eq!(cfg.gateway, Ipv4Address::new(10, 1, 0, 254));
        assert_eq!(cfg.tx_poll_limit, Some(DEFAULT_TX_POLL_LIMIT));
        assert!(cfg.init_ip_stack);
    }
}
