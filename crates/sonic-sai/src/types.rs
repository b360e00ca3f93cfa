//! Hardware object records returned by the switch driver.
//!
//! Each record mirrors what the driver reports for one programmed object.
//! Records are plain data: the warm-boot cache indexes them by canonical key
//! and hands them back to the driver unchanged when deleting.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use sonic_types::{AddressFamily, MacAddress, PortBitmap, PortId, VlanId};
use std::collections::BTreeSet;
use std::fmt;
use std::net::IpAddr;

/// Hardware VRF number.
pub type VrfId = u32;

/// Identifier of an egress object or an ECMP group.
///
/// Both classes share one id space in hardware: a host or route points at
/// either kind through the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EgressId(i32);

impl EgressId {
    /// Marker the driver and persisted dumps use for "no egress".
    pub const INVALID: EgressId = EgressId(-1);

    pub const fn new(id: i32) -> Self {
        EgressId(id)
    }

    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl fmt::Display for EgressId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for EgressId {
    fn from(id: i32) -> Self {
        EgressId(id)
    }
}

/// Member set of an ECMP group. Ordered, so two groups with the same members
/// compare equal regardless of the order the driver listed them in.
pub type EgressIds = BTreeSet<EgressId>;

/// Renders a member set as `"5, 7, 9"` for log lines.
pub fn egress_ids_to_string(ids: &EgressIds) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

bitflags! {
    /// Egress object flag bits. Dumps carry the raw bit value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(from = "u32", into = "u32")]
    pub struct EgressFlags: u32 {
        /// Packets hitting this egress are dropped.
        const DST_DISCARD = 1 << 0;
        /// Packets are redirected to the CPU.
        const L2_TO_CPU = 1 << 1;
        /// Packets are forwarded and a copy goes to the CPU.
        const COPY_TO_CPU = 1 << 2;
    }
}

impl Default for EgressFlags {
    fn default() -> Self {
        EgressFlags::empty()
    }
}

impl From<u32> for EgressFlags {
    fn from(bits: u32) -> Self {
        EgressFlags::from_bits_retain(bits)
    }
}

impl From<EgressFlags> for u32 {
    fn from(flags: EgressFlags) -> Self {
        flags.bits()
    }
}

/// One VLAN as listed by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VlanData {
    pub vlan: VlanId,
    /// Every member port, tagged or not.
    pub port_bitmap: PortBitmap,
    /// Members that egress untagged.
    #[serde(default)]
    pub untagged_bitmap: PortBitmap,
}

/// L3 interface bound to a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Intf {
    pub intf_id: u32,
    pub vid: VlanId,
    pub vrf: VrfId,
    pub mac: MacAddress,
    pub mtu: u32,
}

/// L2 station entry (router MAC termination) for a VLAN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L2Station {
    pub vlan: VlanId,
    pub mac: MacAddress,
}

/// L3 host table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Host {
    pub vrf: VrfId,
    pub ip: IpAddr,
    /// Egress object or ECMP group this host forwards through.
    pub intf: EgressId,
    #[serde(default)]
    pub mac: MacAddress,
    #[serde(default)]
    pub port: PortId,
    #[serde(default)]
    pub flags: u32,
}

impl L3Host {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.ip)
    }
}

/// L3 route table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Route {
    pub vrf: VrfId,
    pub subnet: IpAddr,
    pub mask: IpAddr,
    /// Egress object or ECMP group this route forwards through.
    pub intf: EgressId,
    #[serde(default)]
    pub flags: u32,
}

impl L3Route {
    pub fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.subnet)
    }
}

/// Egress object: the next-hop rewrite a host, route or ECMP group points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Egress {
    /// Raw VLAN; 0 on egresses that punt to the CPU.
    pub vlan: u16,
    pub intf: u32,
    #[serde(default)]
    pub mac: MacAddress,
    #[serde(default)]
    pub port: PortId,
    #[serde(default)]
    pub flags: EgressFlags,
}

impl L3Egress {
    /// True if the egress drops traffic, which is how unresolved next hops
    /// are programmed.
    pub fn programmed_to_drop(&self) -> bool {
        self.flags.contains(EgressFlags::DST_DISCARD)
    }

    /// True if the egress punts or copies traffic to the CPU.
    pub fn sends_to_cpu(&self) -> bool {
        self.flags
            .intersects(EgressFlags::L2_TO_CPU | EgressFlags::COPY_TO_CPU)
    }
}

/// ECMP group header. Members are reported separately by the traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3EcmpGroup {
    pub ecmp_intf: EgressId,
    #[serde(default)]
    pub max_paths: u32,
}

/// L3 table capacities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L3Info {
    pub max_host: u32,
    pub max_route: u32,
}

impl Default for L3Info {
    fn default() -> Self {
        Self {
            max_host: 8192,
            max_route: 16384,
        }
    }
}
