/// Link-address identity derived from the board's unique id.
///
/// Both ends of the virtual Ethernet segment live on this device: the USB
/// adapter the host sees, and the smoltcp interface behind it. They share
/// one derived address and differ in the last bit so they never collide.
use smoltcp::wire::EthernetAddress;

use crate::platform::BOARD_ID_LEN;

/// Offset of the 6-byte slice taken from the board id.
const MAC_OFFSET: usize = 2;

const MAC_LEN: usize = 6;

static_assertions::const_assert!(MAC_OFFSET + MAC_LEN <= BOARD_ID_LEN);

/// I/G bit: set means multicast.
const MULTICAST_BIT: u8 = 0x01;
/// U/L bit: set means locally administered.
const LOCAL_ADMIN_BIT: u8 = 0x02;

/// Derive the USB-facing adapter address from a board id.
pub fn derive_link_address(board_id: &[u8; BOARD_ID_LEN]) -> EthernetAddress {
    let mut mac = [0u8; MAC_LEN];
    mac.copy_from_slice(&board_id[MAC_OFFSET..MAC_OFFSET + MAC_LEN]);
    mac[0] &= !MULTICAST_BIT;
    mac[0] |= LOCAL_ADMIN_BIT;
    EthernetAddress(mac)
}

/// Address of the on-device interface: the adapter address with the
/// least-significant bit of the last byte flipped.
pub fn netif_link_address(usb: EthernetAddress) -> EthernetAddress {
    let mut mac = usb.0;
    mac[MAC_LEN - 1] ^= 0x01;
    EthernetAddress(mac)
}

/// The two addresses of the virtual segment, computed once at start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkAddresses {
    /// Reported to the USB host as the adapter's own address.
    pub usb: EthernetAddress,
    /// Assigned to the smoltcp interface.
    pub netif: EthernetAddress,
}

impl LinkAddresses {
    pub fn from_board_id(board_id: &[u8; BOARD_ID_LEN]) -> Self {
        let usb = derive_link_address(board_id);
        Self {
            usb,
            netif: netif_link_address(usb),
        }
    }
}

/// Seed for the IP stack's RNG (TCP ISNs, ephemeral ports), unique per board.
pub fn random_seed(board_id: &[u8; BOARD_ID_LEN]) -> u64 {
    u64::from_le_bytes(*board_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDS: [[u8; BOARD_ID_LEN]; 5] = [
        [0; BOARD_ID_LEN],
        [0xFF; BOARD_ID_LEN],
        [0xE6, 0x60, 0x58, 0x38, 0x83, 0x4F, 0x2B, 0x2A],
        [0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06],
        [0x12, 0x34, 0xFD, 0xAA, 0x55, 0x00, 0x01, 0xFE],
    ];

    #[test]
    fn derived_address_is_local_unicast() {
        for id in &IDS {
            let mac = derive_link_address(id);
            assert_eq!(mac.0[0] & MULTICAST_BIT, 0, "{:?}", id);
            assert_eq!(mac.0[0] & LOCAL_ADMIN_BIT, LOCAL_ADMIN_BIT, "{:?}", id);
            assert!(mac.is_unicast());
            assert!(mac.is_local());
        }
    }

    #[test]
    fn exhaustive_first_byte() {
        for b in 0..=u8::MAX {
            let id = [0, 0, b, 1, 2, 3, 4, 5];
            let mac = derive_link_address(&id);
            assert_eq!(mac.0[0], (b & !MULTICAST_BIT) | LOCAL_ADMIN_BIT);
        }
    }

    #[test]
    fn copies_slice_at_offset() {
        let id = [0xAA, 0xBB, 0x10, 0x20, 0x30, 0x40, 0x50, 0x60];
        let mac = derive_link_address(&id);
        assert_eq!(mac.0, [0x12, 0x20, 0x30, 0x40, 0x50, 0x60]);
    }

    #[test]
    fn netif_differs_only_in_last_bit() {
        for id in &IDS {
            let addrs = LinkAddresses::from_board_id(id);
            assert_ne!(addrs.usb, addrs.netif);
            assert_eq!(addrs.usb.0[..5], addrs.netif.0[..5]);
            assert_eq!(addrs.usb.0[5] ^ addrs.netif.0[5], 0x01);
        }
    }

    #[test]
    fn netif_address_stays_local_unicast() {
        for id in &IDS {
            let addrs = LinkAddresses::from_board_id(id);
            assert!(addrs.netif.is_unicast());
            assert!(addrs.netif.is_local());
        }
    }

    #[test]
    fn derivation_is_stable() {
        let id = IDS[2];
        assert_eq!(LinkAddresses::from_board_id(&id), LinkAddresses::from_board_id(&id));
        assert_ne!(random_seed(&IDS[2]), random_seed(&IDS[3]));
    }
}
