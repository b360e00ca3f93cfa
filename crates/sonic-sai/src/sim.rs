//! In-memory switch ASIC.
//!
//! `SimAsic` holds a programmed forwarding state as plain records and
//! implements the driver traits over it. It is what the warm-boot tests run
//! against, and `warmboot-check` loads one from a JSON dump to dry-run a
//! reconciliation. Every successful delete is appended to a journal so the
//! order of removals can be inspected afterwards.

use crate::api::{EcmpVisitor, EgressVisitor, HostVisitor, L3Api, RouteVisitor, VlanApi};
use crate::error::{SaiError, SaiResult, SaiStatus};
use crate::types::{
    EgressId, L2Station, L3EcmpGroup, L3Egress, L3Host, L3Info, L3Intf, L3Route, VlanData, VrfId,
};
use log::trace;
use serde::{Deserialize, Serialize};
use sonic_types::{AddressFamily, PortBitmap, VlanId};
use std::collections::HashSet;
use std::fmt;
use std::net::IpAddr;

/// Identity of one hardware object, used for the delete journal and for
/// failure injection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum SimObject {
    Vlan { vlan: VlanId },
    Interface { vlan: VlanId },
    Station { vlan: VlanId },
    Host { vrf: VrfId, ip: IpAddr },
    Route { vrf: VrfId, subnet: IpAddr, mask: IpAddr },
    Ecmp { id: EgressId },
    Egress { id: EgressId },
}

impl fmt::Display for SimObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimObject::Vlan { vlan } => write!(f, "vlan {vlan}"),
            SimObject::Interface { vlan } => write!(f, "interface on vlan {vlan}"),
            SimObject::Station { vlan } => write!(f, "station on vlan {vlan}"),
            SimObject::Host { vrf, ip } => write!(f, "host {ip} in vrf {vrf}"),
            SimObject::Route { vrf, subnet, mask } => {
                write!(f, "route {subnet}/{mask} in vrf {vrf}")
            }
            SimObject::Ecmp { id } => write!(f, "ecmp {id}"),
            SimObject::Egress { id } => write!(f, "egress {id}"),
        }
    }
}

/// Egress object together with its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEgress {
    pub id: EgressId,
    #[serde(flatten)]
    pub egress: L3Egress,
}

/// ECMP group together with the members the driver reports as installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimEcmp {
    #[serde(flatten)]
    pub group: L3EcmpGroup,
    #[serde(default)]
    pub members: Vec<EgressId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimAsic {
    pub default_vlan: VlanId,
    pub l3_info: L3Info,
    pub vlans: Vec<VlanData>,
    pub interfaces: Vec<L3Intf>,
    pub stations: Vec<L2Station>,
    pub hosts: Vec<L3Host>,
    pub routes: Vec<L3Route>,
    pub egresses: Vec<SimEgress>,
    pub ecmp_groups: Vec<SimEcmp>,
    #[serde(skip)]
    failing: HashSet<SimObject>,
    #[serde(skip)]
    unreadable: HashSet<SimObject>,
    #[serde(skip)]
    deleted: Vec<SimObject>,
}

impl SimAsic {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vlan(&mut self, vlan: VlanId, ports: PortBitmap, untagged: PortBitmap) -> &mut Self {
        self.vlans.push(VlanData {
            vlan,
            port_bitmap: ports,
            untagged_bitmap: untagged,
        });
        self
    }

    pub fn add_interface(&mut self, intf: L3Intf) -> &mut Self {
        self.interfaces.push(intf);
        self
    }

    pub fn add_station(&mut self, station: L2Station) -> &mut Self {
        self.stations.push(station);
        self
    }

    pub fn add_host(&mut self, host: L3Host) -> &mut Self {
        self.hosts.push(host);
        self
    }

    pub fn add_route(&mut self, route: L3Route) -> &mut Self {
        self.routes.push(route);
        self
    }

    pub fn add_egress(&mut self, id: EgressId, egress: L3Egress) -> &mut Self {
        self.egresses.push(SimEgress { id, egress });
        self
    }

    /// Adds an ECMP group. An empty `members` list models a group whose
    /// links are all down, or the phantom id some drivers report between
    /// double-wide groups.
    pub fn add_ecmp(
        &mut self,
        id: EgressId,
        members: impl IntoIterator<Item = EgressId>,
    ) -> &mut Self {
        let members: Vec<EgressId> = members.into_iter().collect();
        self.ecmp_groups.push(SimEcmp {
            group: L3EcmpGroup {
                ecmp_intf: id,
                max_paths: members.len() as u32,
            },
            members,
        });
        self
    }

    /// Makes every later delete of `object` fail with a driver error.
    pub fn fail_delete(&mut self, object: SimObject) -> &mut Self {
        self.failing.insert(object);
        self
    }

    /// Makes every later read of `object` fail with a driver error. Only
    /// stations are read back one at a time.
    pub fn fail_read(&mut self, object: SimObject) -> &mut Self {
        self.unreadable.insert(object);
        self
    }

    /// Objects deleted so far, in deletion order.
    pub fn deleted(&self) -> &[SimObject] {
        &self.deleted
    }

    /// True if `object` is still programmed.
    pub fn contains(&self, object: &SimObject) -> bool {
        match object {
            SimObject::Vlan { vlan } => self.vlans.iter().any(|v| v.vlan == *vlan),
            SimObject::Interface { vlan } => self.interfaces.iter().any(|i| i.vid == *vlan),
            SimObject::Station { vlan } => self.stations.iter().any(|s| s.vlan == *vlan),
            SimObject::Host { vrf, ip } => {
                self.hosts.iter().any(|h| h.vrf == *vrf && h.ip == *ip)
            }
            SimObject::Route { vrf, subnet, mask } => self
                .routes
                .iter()
                .any(|r| r.vrf == *vrf && r.subnet == *subnet && r.mask == *mask),
            SimObject::Ecmp { id } => self.ecmp_groups.iter().any(|e| e.group.ecmp_intf == *id),
            SimObject::Egress { id } => self.egresses.iter().any(|e| e.id == *id),
        }
    }

    fn remove<T>(
        &mut self,
        object: SimObject,
        select: impl FnOnce(&mut Self) -> &mut Vec<T>,
        matches: impl Fn(&T) -> bool,
    ) -> SaiResult<()> {
        if self.failing.contains(&object) {
            return Err(SaiError::Status {
                status: SaiStatus::Failure,
            });
        }
        let table = select(self);
        let pos = table
            .iter()
            .position(matches)
            .ok_or_else(|| SaiError::not_found(object.to_string()))?;
        table.remove(pos);
        trace!("sim: deleted {}", object);
        self.deleted.push(object);
        Ok(())
    }
}

fn visit_all<T>(
    entries: impl Iterator<Item = T>,
    mut visit: impl FnMut(T) -> SaiStatus,
) -> SaiResult<()> {
    for entry in entries {
        visit(entry).into_result()?;
    }
    Ok(())
}

impl VlanApi for SimAsic {
    fn vlan_list(&self) -> SaiResult<Vec<VlanData>> {
        Ok(self.vlans.clone())
    }

    fn vlan_default_get(&self) -> SaiResult<VlanId> {
        Ok(self.default_vlan)
    }

    fn vlan_destroy(&mut self, vlan: VlanId) -> SaiResult<()> {
        if vlan == self.default_vlan {
            return Err(SaiError::invalid_parameter("cannot destroy the default vlan"));
        }
        self.remove(SimObject::Vlan { vlan }, |s| &mut s.vlans, |v: &VlanData| v.vlan == vlan)
    }
}

impl L3Api for SimAsic {
    fn l3_info(&self) -> SaiResult<L3Info> {
        Ok(self.l3_info)
    }

    fn l3_intf_find_vlan(&self, vlan: VlanId) -> SaiResult<Option<L3Intf>> {
        Ok(self.interfaces.iter().find(|i| i.vid == vlan).cloned())
    }

    fn l3_intf_delete(&mut self, intf: &L3Intf) -> SaiResult<()> {
        let vlan = intf.vid;
        let intf_id = intf.intf_id;
        self.remove(
            SimObject::Interface { vlan },
            |s| &mut s.interfaces,
            |i: &L3Intf| i.vid == vlan && i.intf_id == intf_id,
        )
    }

    fn l2_station_get(&self, vlan: VlanId) -> SaiResult<L2Station> {
        if self.unreadable.contains(&SimObject::Station { vlan }) {
            return Err(SaiError::Status {
                status: SaiStatus::Failure,
            });
        }
        self.stations
            .iter()
            .find(|s| s.vlan == vlan)
            .cloned()
            .ok_or_else(|| SaiError::not_found(format!("station on vlan {vlan}")))
    }

    fn l2_station_delete(&mut self, vlan: VlanId) -> SaiResult<()> {
        self.remove(SimObject::Station { vlan }, |s| &mut s.stations, |s: &L2Station| s.vlan == vlan)
    }

    fn host_traverse(
        &self,
        family: AddressFamily,
        start: u32,
        end: u32,
        visit: &mut HostVisitor<'_>,
    ) -> SaiResult<()> {
        let entries = self
            .hosts
            .iter()
            .filter(|h| h.family() == family)
            .zip(0u32..)
            .filter(|(_, index)| (start..end).contains(index));
        visit_all(entries, |(host, index)| visit(index, host))
    }

    fn route_traverse(
        &self,
        family: AddressFamily,
        start: u32,
        end: u32,
        visit: &mut RouteVisitor<'_>,
    ) -> SaiResult<()> {
        let entries = self
            .routes
            .iter()
            .filter(|r| r.family() == family)
            .zip(0u32..)
            .filter(|(_, index)| (start..end).contains(index));
        visit_all(entries, |(route, index)| visit(index, route))
    }

    fn egress_traverse(&self, visit: &mut EgressVisitor<'_>) -> SaiResult<()> {
        visit_all(self.egresses.iter(), |e| visit(e.id, &e.egress))
    }

    fn ecmp_traverse(&self, visit: &mut EcmpVisitor<'_>) -> SaiResult<()> {
        visit_all(self.ecmp_groups.iter(), |e| visit(&e.group, e.members.as_slice()))
    }

    fn host_delete(&mut self, host: &L3Host) -> SaiResult<()> {
        let (vrf, ip) = (host.vrf, host.ip);
        self.remove(
            SimObject::Host { vrf, ip },
            |s| &mut s.hosts,
            |h: &L3Host| h.vrf == vrf && h.ip == ip,
        )
    }

    fn route_delete(&mut self, route: &L3Route) -> SaiResult<()> {
        let (vrf, subnet, mask) = (route.vrf, route.subnet, route.mask);
        self.remove(
            SimObject::Route { vrf, subnet, mask },
            |s| &mut s.routes,
            |r: &L3Route| r.vrf == vrf && r.subnet == subnet && r.mask == mask,
        )
    }

    fn ecmp_destroy(&mut self, ecmp: &L3EcmpGroup) -> SaiResult<()> {
        let id = ecmp.ecmp_intf;
        self.remove(
            SimObject::Ecmp { id },
            |s| &mut s.ecmp_groups,
            |e: &SimEcmp| e.group.ecmp_intf == id,
        )
    }

    fn egress_destroy(&mut self, id: EgressId) -> SaiResult<()> {
        self.remove(SimObject::Egress { id }, |s| &mut s.egresses, |e: &SimEgress| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EgressFlags;
    use pretty_assertions::assert_eq;
    use sonic_types::{MacAddress, PortId};

    fn host(ip: &str, intf: i32) -> L3Host {
        L3Host {
            vrf: 0,
            ip: ip.parse().unwrap(),
            intf: EgressId::new(intf),
            mac: MacAddress::ZERO,
            port: PortId::new(1),
            flags: 0,
        }
    }

    #[test]
    fn test_host_traverse_respects_family_and_range() {
        let mut asic = SimAsic::new();
        asic.add_host(host("10.0.0.1", 1))
            .add_host(host("2001:db8::1", 2))
            .add_host(host("10.0.0.2", 3))
            .add_host(host("10.0.0.3", 4));

        let mut seen = Vec::new();
        asic.host_traverse(AddressFamily::V4, 0, 2, &mut |index, h| {
            seen.push((index, h.intf.as_i32()));
            SaiStatus::Success
        })
        .unwrap();
        assert_eq!(seen, vec![(0, 1), (1, 3)]);
    }

    #[test]
    fn test_visitor_status_stops_traversal() {
        let mut asic = SimAsic::new();
        asic.add_host(host("10.0.0.1", 1)).add_host(host("10.0.0.2", 2));

        let mut calls = 0;
        let err = asic
            .host_traverse(AddressFamily::V4, 0, 16, &mut |_, _| {
                calls += 1;
                SaiStatus::Failure
            })
            .unwrap_err();
        assert_eq!(calls, 1);
        assert_eq!(
            err,
            SaiError::Status {
                status: SaiStatus::Failure
            }
        );
    }

    #[test]
    fn test_delete_journal_and_failure_injection() {
        let mut asic = SimAsic::new();
        let egress = L3Egress {
            vlan: 10,
            intf: 1,
            mac: MacAddress::ZERO,
            port: PortId::new(1),
            flags: EgressFlags::empty(),
        };
        asic.add_egress(EgressId::new(100001), egress.clone())
            .add_egress(EgressId::new(100002), egress)
            .fail_delete(SimObject::Egress {
                id: EgressId::new(100002),
            });

        asic.egress_destroy(EgressId::new(100001)).unwrap();
        assert!(asic.egress_destroy(EgressId::new(100001)).unwrap_err().is_not_found());
        assert!(asic.egress_destroy(EgressId::new(100002)).is_err());
        assert_eq!(
            asic.deleted(),
            &[SimObject::Egress {
                id: EgressId::new(100001)
            }]
        );
        assert!(asic.contains(&SimObject::Egress {
            id: EgressId::new(100002)
        }));
    }

    #[test]
    fn test_default_vlan_is_protected() {
        let mut asic = SimAsic::new();
        asic.add_vlan(VlanId::DEFAULT, PortBitmap::new(), PortBitmap::new());
        assert!(asic.vlan_destroy(VlanId::DEFAULT).is_err());
    }

    #[test]
    fn test_load_from_json_dump() {
        let asic: SimAsic = serde_json::from_str(
            r#"{
                "defaultVlan": 1,
                "vlans": [{"vlan": 10, "portBitmap": [1, 2], "untaggedBitmap": [1]}],
                "egresses": [{"id": 100002, "vlan": 10, "intf": 10, "flags": 1}],
                "ecmpGroups": [{"ecmpIntf": 200256, "members": [100002]}]
            }"#,
        )
        .unwrap();
        assert_eq!(asic.vlans.len(), 1);
        assert_eq!(asic.egresses[0].egress.flags, EgressFlags::DST_DISCARD);
        assert_eq!(asic.ecmp_groups[0].members, vec![EgressId::new(100002)]);
        assert_eq!(asic.l3_info, L3Info::default());
    }
}
