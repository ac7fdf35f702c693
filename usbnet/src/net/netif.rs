/// The virtual network interface record.
///
/// Mirrors what the IP stack knows about the USB interface: link address,
/// MTU, flags, name and configured addresses. The live smoltcp `Interface`
/// is built from this record on registration and dropped on removal.
use bitflags::bitflags;
use smoltcp::wire::{EthernetAddress, Ipv4Address, Ipv4Cidr};
#[cfg(feature = "ipv6")]
use smoltcp::wire::Ipv6Address;

use crate::config::NET_MTU;

bitflags! {
    /// Interface flags, same bit layout as the classic embedded stacks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct NetifFlags: u8 {
        /// Administratively up.
        const UP        = 0x01;
        const BROADCAST = 0x02;
        /// Carrier present.
        const LINK_UP   = 0x04;
        /// IPv4 output resolves through ARP.
        const ETHARP    = 0x08;
    }
}

/// Two-character interface name.
pub const NETIF_NAME: [u8; 2] = *b"EX";

#[derive(Debug, Clone)]
pub struct Netif {
    pub hwaddr: EthernetAddress,
    pub mtu: usize,
    pub flags: NetifFlags,
    pub name: [u8; 2],
    pub ipv4: Option<Ipv4Cidr>,
    pub gateway: Ipv4Address,
    #[cfg(feature = "ipv6")]
    pub ipv6_link_local: Option<Ipv6Address>,
}

impl Netif {
    /// A down, unconfigured interface with the given link address.
    pub fn new(hwaddr: EthernetAddress) -> Self {
        Self {
            hwaddr,
            mtu: 0,
            flags: NetifFlags::empty(),
            name: [0; 2],
            ipv4: None,
            gateway: Ipv4Address::UNSPECIFIED,
            #[cfg(feature = "ipv6")]
            ipv6_link_local: None,
        }
    }

    pub fn is_up(&self) -> bool {
        self.flags.contains(NetifFlags::UP)
    }

    pub fn is_link_up(&self) -> bool {
        self.flags.contains(NetifFlags::LINK_UP)
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name).unwrap_or("??")
    }

    pub fn ipv4_addr(&self) -> Option<Ipv4Address> {
        self.ipv4.map(|cidr| cidr.address())
    }
}

/// Initialization callback run when the interface is registered.
///
/// Output wiring is implied by the Ethernet medium of the USB device:
/// IPv4 goes through ARP resolution and IPv6 through neighbor discovery,
/// both ending in `UsbLink::link_output`.
pub fn netif_init(netif: &mut Netif) {
    netif.mtu = NET_MTU;
    netif.flags = NetifFlags::BROADCAST | NetifFlags::ETHARP | NetifFlags::LINK_UP | NetifFlags::UP;
    netif.name = NETIF_NAME;
}

/// Prefix length of a contiguous netmask, `None` if the mask has holes.
pub fn netmask_prefix_len(netmask: Ipv4Address) -> Option<u8> {
    let bits = u32::from_be_bytes(netmask.0);
    let len = bits.leading_ones();
    if bits.checked_shl(len).unwrap_or(0) == 0 {
        Some(len as u8)
    } else {
        None
    }
}

/// EUI-64 link-local address (fe80::/64) for a MAC address.
#[cfg(feature = "ipv6")]
#[rustfmt::skip]
pub fn link_local_from_mac(mac: EthernetAddress) -> Ipv6Address {
    let m = mac.0;
    let bytes = [
        0xfe, 0x80, 0, 0, 0, 0, 0, 0,
        m[0] ^ 0x02, m[1], m[2], 0xff, 0xfe, m[3], m[4], m[5],
    ];
    Ipv6Address::from_bytes(&bytes)
}
