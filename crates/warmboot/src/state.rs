//! Control-plane view of L2/L3 interfaces and neighbors.
//!
//! This is the slice of software switch state the warm-boot path reads from
//! the snapshot and rebuilds from hardware: routed interfaces, VLANs with
//! their member ports, and per-VLAN ARP/NDP tables. All collections are
//! ordered so that serialized output is stable.

use serde::{Deserialize, Serialize};
use sonic_types::{AddressFamily, IpPrefix, MacAddress, PortId, VlanId};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Control-plane interface id. VLAN interfaces use the VLAN number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceId(u32);

impl InterfaceId {
    pub const fn new(id: u32) -> Self {
        InterfaceId(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl From<VlanId> for InterfaceId {
    fn from(vlan: VlanId) -> Self {
        InterfaceId(u32::from(vlan.as_u16()))
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Routing instance id. Maps one to one onto a hardware VRF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterId(u32);

impl RouterId {
    pub const fn new(id: u32) -> Self {
        RouterId(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    pub id: InterfaceId,
    #[serde(default)]
    pub router_id: RouterId,
    pub vlan_id: VlanId,
    #[serde(default)]
    pub name: String,
    pub mac: MacAddress,
    #[serde(default)]
    pub mtu: u32,
    /// Configured prefixes, e.g. `10.0.0.1/24`.
    #[serde(default)]
    pub addresses: Vec<IpPrefix>,
}

/// Interfaces by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Interface>", into = "Vec<Interface>")]
pub struct InterfaceMap {
    interfaces: BTreeMap<InterfaceId, Interface>,
}

impl InterfaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the interface with the same id.
    pub fn add_interface(&mut self, interface: Interface) {
        self.interfaces.insert(interface.id, interface);
    }

    pub fn get_interface(&self, id: InterfaceId) -> Option<&Interface> {
        self.interfaces.get(&id)
    }

    /// First interface bound to `vlan`.
    pub fn get_interface_in_vlan(&self, vlan: VlanId) -> Option<&Interface> {
        self.interfaces.values().find(|intf| intf.vlan_id == vlan)
    }

    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }
}

impl From<Vec<Interface>> for InterfaceMap {
    fn from(list: Vec<Interface>) -> Self {
        let mut map = InterfaceMap::new();
        for interface in list {
            map.add_interface(interface);
        }
        map
    }
}

impl From<InterfaceMap> for Vec<Interface> {
    fn from(map: InterfaceMap) -> Self {
        map.interfaces.into_values().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborState {
    /// Learned and confirmed by the control plane.
    #[default]
    Reachable,
    /// Adopted from hardware; must be re-resolved before it is trusted.
    Unverified,
    /// Resolution in progress. Traffic is dropped until it completes.
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborEntry {
    pub ip: IpAddr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortId>,
    pub interface_id: InterfaceId,
    #[serde(default)]
    pub state: NeighborState,
}

impl NeighborEntry {
    pub fn is_pending(&self) -> bool {
        self.state == NeighborState::Pending
    }
}

/// ARP or NDP table of one VLAN, keyed by neighbor address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<NeighborEntry>", into = "Vec<NeighborEntry>")]
pub struct NeighborTable {
    entries: BTreeMap<IpAddr, NeighborEntry>,
}

impl NeighborTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resolved neighbor.
    pub fn add_entry(
        &mut self,
        ip: IpAddr,
        mac: MacAddress,
        port: PortId,
        interface_id: InterfaceId,
        state: NeighborState,
    ) {
        self.entries.insert(
            ip,
            NeighborEntry {
                ip,
                mac: Some(mac),
                port: Some(port),
                interface_id,
                state,
            },
        );
    }

    /// Adds a neighbor whose resolution has not completed.
    pub fn add_pending_entry(&mut self, ip: IpAddr, interface_id: InterfaceId) {
        self.entries.insert(
            ip,
            NeighborEntry {
                ip,
                mac: None,
                port: None,
                interface_id,
                state: NeighborState::Pending,
            },
        );
    }

    pub fn get_entry(&self, ip: &IpAddr) -> Option<&NeighborEntry> {
        self.entries.get(ip)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NeighborEntry> {
        self.entries.values()
    }
}

impl From<Vec<NeighborEntry>> for NeighborTable {
    fn from(list: Vec<NeighborEntry>) -> Self {
        NeighborTable {
            entries: list.into_iter().map(|entry| (entry.ip, entry)).collect(),
        }
    }
}

impl From<NeighborTable> for Vec<NeighborEntry> {
    fn from(table: NeighborTable) -> Self {
        table.entries.into_values().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vlan {
    pub id: VlanId,
    #[serde(default)]
    pub name: String,
    /// Member ports; the value is true for tagged membership.
    #[serde(default)]
    pub member_ports: BTreeMap<PortId, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface_id: Option<InterfaceId>,
    #[serde(default)]
    pub arp_table: NeighborTable,
    #[serde(default)]
    pub ndp_table: NeighborTable,
}

impl Vlan {
    pub fn new(id: VlanId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            member_ports: BTreeMap::new(),
            interface_id: None,
            arp_table: NeighborTable::new(),
            ndp_table: NeighborTable::new(),
        }
    }

    /// ARP table for IPv4, NDP table for IPv6.
    pub fn neighbor_table(&self, family: AddressFamily) -> &NeighborTable {
        match family {
            AddressFamily::V4 => &self.arp_table,
            AddressFamily::V6 => &self.ndp_table,
        }
    }

    pub fn neighbor_table_mut(&mut self, family: AddressFamily) -> &mut NeighborTable {
        match family {
            AddressFamily::V4 => &mut self.arp_table,
            AddressFamily::V6 => &mut self.ndp_table,
        }
    }
}

/// VLANs by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Vlan>", into = "Vec<Vlan>")]
pub struct VlanMap {
    vlans: BTreeMap<VlanId, Vlan>,
}

impl VlanMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the VLAN with the same id.
    pub fn add_vlan(&mut self, vlan: Vlan) {
        self.vlans.insert(vlan.id, vlan);
    }

    pub fn get_vlan(&self, id: VlanId) -> Option<&Vlan> {
        self.vlans.get(&id)
    }

    pub fn get_vlan_mut(&mut self, id: VlanId) -> Option<&mut Vlan> {
        self.vlans.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.vlans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vlans.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vlan> {
        self.vlans.values()
    }
}

impl From<Vec<Vlan>> for VlanMap {
    fn from(list: Vec<Vlan>) -> Self {
        VlanMap {
            vlans: list.into_iter().map(|vlan| (vlan.id, vlan)).collect(),
        }
    }
}

impl From<VlanMap> for Vec<Vlan> {
    fn from(map: VlanMap) -> Self {
        map.vlans.into_values().collect()
    }
}

/// Software switch state persisted across a warm restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchState {
    #[serde(default)]
    pub interfaces: InterfaceMap,
    #[serde(default)]
    pub vlans: VlanMap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn vlan(id: u16) -> VlanId {
        VlanId::new(id).unwrap()
    }

    #[test]
    fn test_switch_state_from_json() {
        let state: SwitchState = serde_json::from_str(
            r#"{
                "interfaces": [{
                    "id": 10, "routerId": 0, "vlanId": 10, "name": "Vlan10",
                    "mac": "02:00:00:00:00:0a", "mtu": 9100,
                    "addresses": ["10.0.0.1/24"]
                }],
                "vlans": [{
                    "id": 10, "name": "Vlan10",
                    "memberPorts": {"1": false, "2": true},
                    "interfaceId": 10,
                    "arpTable": [{"ip": "10.0.0.2", "mac": "02:00:00:00:00:02",
                                  "port": 1, "interfaceId": 10}]
                }]
            }"#,
        )
        .unwrap();

        let intf = state.interfaces.get_interface_in_vlan(vlan(10)).unwrap();
        assert_eq!(intf.name, "Vlan10");
        assert_eq!(intf.addresses, vec!["10.0.0.1/24".parse::<IpPrefix>().unwrap()]);

        let v10 = state.vlans.get_vlan(vlan(10)).unwrap();
        assert_eq!(v10.member_ports.get(&PortId::new(2)), Some(&true));
        let entry = v10
            .neighbor_table(AddressFamily::V4)
            .get_entry(&"10.0.0.2".parse().unwrap())
            .unwrap();
        assert_eq!(entry.state, NeighborState::Reachable);
        assert!(v10.ndp_table.is_empty());
    }

    #[test]
    fn test_malformed_interface_address_is_rejected() {
        let err = serde_json::from_str::<SwitchState>(
            r#"{"interfaces": [{"id": 10, "vlanId": 10, "mac": "02:00:00:00:00:0a",
                                "addresses": ["10.0.0.1/40"]}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid IP prefix"));
    }

    #[test]
    fn test_pending_entry_has_no_mac() {
        let mut table = NeighborTable::new();
        let ip: IpAddr = "2001:db8::1".parse().unwrap();
        table.add_pending_entry(ip, InterfaceId::new(20));

        let entry = table.get_entry(&ip).unwrap();
        assert!(entry.is_pending());
        assert_eq!(entry.mac, None);

        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"ip": "2001:db8::1", "interfaceId": 20, "state": "pending"}])
        );
    }

    #[test]
    fn test_vlan_map_is_ordered() {
        let mut map = VlanMap::new();
        map.add_vlan(Vlan::new(vlan(30), "Vlan30"));
        map.add_vlan(Vlan::new(vlan(10), "Vlan10"));

        let ids: Vec<u16> = map.iter().map(|v| v.id.as_u16()).collect();
        assert_eq!(ids, vec![10, 30]);
    }
}
