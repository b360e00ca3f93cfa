//! Common switch types shared by the ASIC driver surface and the warm-boot
//! reconciliation cache.
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`PortId`] / [`PortBitmap`]: front-panel port numbers and port sets
//! - [`AddressFamily`]: IPv4/IPv6 discrimination and full-width masks
//! - [`IpPrefix`]: an address with its prefix length

mod ip;
mod mac;
mod port;
mod vlan;

pub use ip::{full_mask, is_full_mask, AddressFamily, IpPrefix};
pub use mac::MacAddress;
pub use port::{PortBitmap, PortId};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid port number: {0} (must be below {max})", max = PortBitmap::CAPACITY)]
    InvalidPort(u32),

    #[error("invalid IP prefix: {0}")]
    InvalidIpPrefix(String),
}
