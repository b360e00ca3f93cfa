//! Lookups and claims made by forwarding-sync code while it replays its
//! configuration against the adopted hardware state.

use super::{CacheState, Discovered, VlanInfo, WarmBootCache};
use crate::error::LookupError;
use crate::state::Vlan;
use log::debug;
use sonic_sai::{EgressId, EgressIds, L2Station, L3EcmpGroup, L3Egress, L3Host, L3Intf, L3Route, VrfId};
use sonic_types::{MacAddress, VlanId};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

static NO_MEMBERS: EgressIds = BTreeSet::new();

fn claim_entry<K: Ord, T>(
    map: &mut BTreeMap<K, Discovered<T>>,
    key: &K,
    describe: impl FnOnce() -> String,
) -> Result<(), LookupError> {
    let what = describe();
    let Some(record) = map.get_mut(key) else {
        return Err(LookupError::NotFound(what));
    };
    if record.claim() {
        debug!("Claimed {}", what);
        Ok(())
    } else {
        Err(LookupError::AlreadyClaimed(what))
    }
}

impl WarmBootCache {
    fn check_lookup(&self) -> Result<(), LookupError> {
        match self.state {
            CacheState::Constructed => Err(LookupError::NotScanned),
            CacheState::Populated => Ok(()),
            CacheState::Swept => Err(LookupError::Released),
        }
    }

    pub fn find_vlan(&self, vlan: VlanId) -> Option<&Discovered<VlanInfo>> {
        self.vlans.get(&vlan)
    }

    pub fn find_interface(&self, vlan: VlanId, mac: MacAddress) -> Option<&Discovered<L3Intf>> {
        self.interfaces.get(&(vlan, mac))
    }

    pub fn find_station(&self, vlan: VlanId) -> Option<&Discovered<L2Station>> {
        self.stations.get(&vlan)
    }

    pub fn find_host(&self, vrf: VrfId, ip: IpAddr) -> Option<&Discovered<L3Host>> {
        self.hosts.get(&(vrf, ip))
    }

    pub fn find_host_route(&self, vrf: VrfId, ip: IpAddr) -> Option<&Discovered<L3Route>> {
        self.host_routes.get(&(vrf, ip))
    }

    pub fn find_prefix_route(
        &self,
        vrf: VrfId,
        subnet: IpAddr,
        mask: IpAddr,
    ) -> Option<&Discovered<L3Route>> {
        self.prefix_routes.get(&(vrf, subnet, mask))
    }

    /// The ECMP group programmed with exactly `members`.
    pub fn find_ecmp(&self, members: &EgressIds) -> Option<&Discovered<L3EcmpGroup>> {
        self.ecmp_groups.get(members)
    }

    pub fn find_egress(&self, id: EgressId) -> Option<&Discovered<L3Egress>> {
        self.egresses.get(&id)
    }

    /// Egress object the host entry `(vrf, ip)` forwards through. Hosts that
    /// point at an ECMP group have none. Does not claim anything.
    pub fn lookup_egress(
        &self,
        vrf: VrfId,
        ip: IpAddr,
    ) -> Option<(EgressId, &Discovered<L3Egress>)> {
        let host = self.hosts.get(&(vrf, ip))?;
        let id = host.hw().intf;
        self.egresses.get(&id).map(|egress| (id, egress))
    }

    /// Member egress ids of ECMP group `ecmp`. When no ECMP group is known at
    /// all the answer is an empty set rather than a miss.
    pub fn lookup_ecmp_members(&self, ecmp: EgressId) -> Result<&EgressIds, LookupError> {
        self.check_lookup()?;
        if self.ecmp_paths.is_empty() {
            return Ok(&NO_MEMBERS);
        }
        self.ecmp_paths
            .get(&ecmp)
            .ok_or_else(|| LookupError::NotFound(format!("ecmp {}", ecmp)))
    }

    /// Egress programmed to drop, shared by every null route.
    pub fn drop_egress_id(&self) -> Option<EgressId> {
        self.drop_egress
    }

    /// Egress that punts to the CPU, shared by every CPU-bound route.
    pub fn to_cpu_egress_id(&self) -> Option<EgressId> {
        self.to_cpu_egress
    }

    /// Overwrites the member ports of `vlan` with the membership found in
    /// hardware. Returns false, leaving `vlan` untouched, if hardware has no
    /// such VLAN.
    pub fn fill_vlan_port_info(&self, vlan: &mut Vlan) -> bool {
        let Some(info) = self.vlans.get(&vlan.id) else {
            return false;
        };
        let info = info.hw();
        vlan.member_ports = info
            .all_ports
            .iter()
            .map(|port| (port, !info.untagged.contains(port)))
            .collect();
        true
    }

    pub fn claim_vlan(&mut self, vlan: VlanId) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.vlans, &vlan, || format!("vlan {}", vlan))
    }

    pub fn claim_interface(&mut self, vlan: VlanId, mac: MacAddress) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.interfaces, &(vlan, mac), || {
            format!("l3 interface {} on vlan {}", mac, vlan)
        })
    }

    pub fn claim_station(&mut self, vlan: VlanId) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.stations, &vlan, || {
            format!("l2 station on vlan {}", vlan)
        })
    }

    pub fn claim_host(&mut self, vrf: VrfId, ip: IpAddr) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.hosts, &(vrf, ip), || {
            format!("host {} in vrf {}", ip, vrf)
        })
    }

    pub fn claim_host_route(&mut self, vrf: VrfId, ip: IpAddr) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.host_routes, &(vrf, ip), || {
            format!("host route {} in vrf {}", ip, vrf)
        })
    }

    pub fn claim_prefix_route(
        &mut self,
        vrf: VrfId,
        subnet: IpAddr,
        mask: IpAddr,
    ) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.prefix_routes, &(vrf, subnet, mask), || {
            format!("route {}/{} in vrf {}", subnet, mask, vrf)
        })
    }

    pub fn claim_ecmp(&mut self, members: &EgressIds) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.ecmp_groups, members, || {
            format!(
                "ecmp group with paths [{}]",
                sonic_sai::types::egress_ids_to_string(members)
            )
        })
    }

    pub fn claim_egress(&mut self, id: EgressId) -> Result<(), LookupError> {
        self.check_lookup()?;
        claim_entry(&mut self.egresses, &id, || format!("egress {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmBootConfig;
    use crate::snapshot::{EcmpPathMap, PriorState};
    use crate::state::SwitchState;
    use pretty_assertions::assert_eq;
    use sonic_sai::sim::SimAsic;
    use sonic_sai::EgressFlags;
    use sonic_types::{PortBitmap, PortId};

    fn ids(raw: &[i32]) -> EgressIds {
        raw.iter().copied().map(EgressId::new).collect()
    }

    fn asic_with_host() -> SimAsic {
        let mut asic = SimAsic::new();
        asic.add_host(L3Host {
            vrf: 1,
            ip: "10.0.0.1".parse().unwrap(),
            intf: EgressId::new(42),
            mac: MacAddress::ZERO,
            port: PortId::new(0),
            flags: 0,
        })
        .add_egress(
            EgressId::new(42),
            L3Egress {
                vlan: 10,
                intf: 10,
                mac: MacAddress::new([2, 0, 0, 0, 0, 2]),
                port: PortId::new(3),
                flags: EgressFlags::empty(),
            },
        );
        asic
    }

    fn populated(asic: &SimAsic, prior: PriorState) -> WarmBootCache {
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.populate_from(prior, asic).unwrap();
        cache
    }

    #[test]
    fn test_lookup_egress_does_not_claim() {
        let asic = asic_with_host();
        let mut cache = populated(&asic, PriorState::default());
        let ip: IpAddr = "10.0.0.1".parse().unwrap();

        let (id, egress) = cache.lookup_egress(1, ip).unwrap();
        assert_eq!(id, EgressId::new(42));
        assert!(!egress.is_claimed());
        assert!(cache.lookup_egress(0, ip).is_none());

        cache.claim_egress(id).unwrap();
        assert_eq!(
            cache.claim_egress(id),
            Err(LookupError::AlreadyClaimed("egress 42".to_string()))
        );
        assert!(cache.find_egress(id).unwrap().is_claimed());
    }

    #[test]
    fn test_claim_missing_object() {
        let asic = SimAsic::new();
        let mut cache = populated(&asic, PriorState::default());
        assert_eq!(
            cache.claim_vlan(VlanId::new(30).unwrap()),
            Err(LookupError::NotFound("vlan 30".to_string()))
        );
        assert!(matches!(
            cache.claim_ecmp(&ids(&[1, 2])),
            Err(LookupError::NotFound(_))
        ));
    }

    #[test]
    fn test_lookups_before_scan() {
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        assert_eq!(
            cache.lookup_ecmp_members(EgressId::new(1)),
            Err(LookupError::NotScanned)
        );
        assert_eq!(cache.claim_egress(EgressId::new(1)), Err(LookupError::NotScanned));
    }

    #[test]
    fn test_lookup_ecmp_members() {
        let mut asic = SimAsic::new();
        asic.add_ecmp(EgressId::new(200), ids(&[9, 5, 7]));

        // Nothing recorded: an empty set for any id.
        let empty = populated(&SimAsic::new(), PriorState::default());
        assert!(empty.lookup_ecmp_members(EgressId::new(200)).unwrap().is_empty());

        let cache = populated(&asic, PriorState::default());
        assert_eq!(
            cache.lookup_ecmp_members(EgressId::new(200)).unwrap(),
            &ids(&[5, 7, 9])
        );
        assert!(matches!(
            cache.lookup_ecmp_members(EgressId::new(300)),
            Err(LookupError::NotFound(_))
        ));
    }

    #[test]
    fn test_recorded_membership_beats_stale_live_list() {
        let mut asic = SimAsic::new();
        asic.add_ecmp(EgressId::new(200), ids(&[5]));

        let mut paths = EcmpPathMap::new();
        paths.insert(EgressId::new(200), ids(&[5, 7, 9]));
        let prior = PriorState {
            switch_state: SwitchState::default(),
            ecmp_paths: paths,
            ecmp_paths_populated: true,
        };

        let mut cache = populated(&asic, prior);
        assert_eq!(
            cache.lookup_ecmp_members(EgressId::new(200)).unwrap(),
            &ids(&[5, 7, 9])
        );
        assert_eq!(
            cache.find_ecmp(&ids(&[5, 7, 9])).unwrap().hw().ecmp_intf,
            EgressId::new(200)
        );
        cache.claim_ecmp(&ids(&[7, 9, 5])).unwrap();
    }

    #[test]
    fn test_fill_vlan_port_info() {
        let vlan_id = VlanId::new(10).unwrap();
        let mut asic = SimAsic::new();
        asic.add_vlan(
            vlan_id,
            PortBitmap::from_ports([1, 2, 3]).unwrap(),
            PortBitmap::from_ports([1]).unwrap(),
        );
        let cache = populated(&asic, PriorState::default());

        let mut vlan = Vlan::new(vlan_id, "Vlan10");
        vlan.member_ports.insert(PortId::new(9), false);
        assert!(cache.fill_vlan_port_info(&mut vlan));
        let ports: Vec<(u32, bool)> = vlan
            .member_ports
            .iter()
            .map(|(port, tagged)| (port.as_u32(), *tagged))
            .collect();
        assert_eq!(ports, vec![(1, false), (2, true), (3, true)]);

        let mut absent = Vlan::new(VlanId::new(20).unwrap(), "Vlan20");
        assert!(!cache.fill_vlan_port_info(&mut absent));
        assert!(absent.member_ports.is_empty());
    }

    #[test]
    fn test_every_object_kind_claims_once() {
        let vlan = VlanId::new(10).unwrap();
        let mac = MacAddress::new([2, 0, 0, 0, 0, 1]);
        let host_ip: IpAddr = "10.0.0.1".parse().unwrap();
        let route_ip: IpAddr = "10.9.0.1".parse().unwrap();
        let subnet: IpAddr = "10.1.0.0".parse().unwrap();
        let mask: IpAddr = "255.255.0.0".parse().unwrap();
        let full: IpAddr = "255.255.255.255".parse().unwrap();
        let route = |subnet, mask| L3Route {
            vrf: 1,
            subnet,
            mask,
            intf: EgressId::new(42),
            flags: 0,
        };

        let mut asic = asic_with_host();
        asic.add_vlan(vlan, PortBitmap::new(), PortBitmap::new())
            .add_interface(L3Intf {
                intf_id: 1,
                vid: vlan,
                vrf: 0,
                mac,
                mtu: 1500,
            })
            .add_station(L2Station { vlan, mac })
            .add_route(route(route_ip, full))
            .add_route(route(subnet, mask))
            .add_ecmp(EgressId::new(200), ids(&[42]));

        let config = WarmBootConfig {
            host_routes_in_host_table: true,
            ..WarmBootConfig::default()
        };
        let mut cache = WarmBootCache::new(config);
        cache.populate_from(PriorState::default(), &asic).unwrap();

        cache.claim_vlan(vlan).unwrap();
        cache.claim_interface(vlan, mac).unwrap();
        cache.claim_station(vlan).unwrap();
        cache.claim_host(1, host_ip).unwrap();
        cache.claim_host_route(1, route_ip).unwrap();
        cache.claim_prefix_route(1, subnet, mask).unwrap();
        cache.claim_ecmp(&ids(&[42])).unwrap();
        cache.claim_egress(EgressId::new(42)).unwrap();

        let again = [
            cache.claim_vlan(vlan),
            cache.claim_interface(vlan, mac),
            cache.claim_station(vlan),
            cache.claim_host(1, host_ip),
            cache.claim_host_route(1, route_ip),
            cache.claim_prefix_route(1, subnet, mask),
            cache.claim_ecmp(&ids(&[42])),
            cache.claim_egress(EgressId::new(42)),
        ];
        let described: Vec<String> = again
            .into_iter()
            .map(|result| match result {
                Err(LookupError::AlreadyClaimed(what)) => what,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(
            described,
            vec![
                "vlan 10".to_string(),
                format!("l3 interface {} on vlan 10", mac),
                "l2 station on vlan 10".to_string(),
                "host 10.0.0.1 in vrf 1".to_string(),
                "host route 10.9.0.1 in vrf 1".to_string(),
                "route 10.1.0.0/255.255.0.0 in vrf 1".to_string(),
                "ecmp group with paths [42]".to_string(),
                "egress 42".to_string(),
            ]
        );
    }
}
