//! Rebuild the interface and VLAN maps of the software state from what was
//! found in hardware, borrowing names and addresses from the state file.

use super::WarmBootCache;
use crate::error::{Result, WarmBootError};
use crate::state::{
    Interface, InterfaceId, InterfaceMap, NeighborState, RouterId, SwitchState, Vlan, VlanMap,
};
use log::{debug, trace};
use sonic_sai::AddressFamily;
use sonic_types::VlanId;

/// Egress objects that punt to the CPU report this pseudo VLAN.
const CPU_EGRESS_VLAN: u16 = 0;

impl WarmBootCache {
    fn prior_state(&self, op: &'static str) -> Result<&SwitchState> {
        self.prior.as_ref().ok_or(WarmBootError::Lifecycle {
            op,
            state: self.state,
        })
    }

    /// One interface per L3 interface found in hardware. Name and addresses
    /// come from the interface on the same VLAN in the state file.
    pub fn reconstruct_interface_map(&self) -> Result<InterfaceMap> {
        let prior = self.prior_state("reconstruct interfaces")?;
        let mut interfaces = InterfaceMap::new();

        for ((vlan, mac), record) in &self.interfaces {
            let intf = record.hw();
            let dumped = prior
                .interfaces
                .get_interface_in_vlan(*vlan)
                .ok_or(WarmBootError::InterfaceMissingFromSnapshot(*vlan))?;

            interfaces.add_interface(Interface {
                id: InterfaceId::from(*vlan),
                router_id: RouterId::new(intf.vrf),
                vlan_id: *vlan,
                name: dumped.name.clone(),
                mac: *mac,
                mtu: intf.mtu,
                addresses: dumped.addresses.clone(),
            });
        }
        Ok(interfaces)
    }

    /// One VLAN per VLAN found in hardware, with its member ports and
    /// interface, and ARP/NDP tables rebuilt from host entries.
    ///
    /// Neighbors adopted from hardware are marked unverified, or pending
    /// when their egress drops traffic.
    pub fn reconstruct_vlan_map(&self) -> Result<VlanMap> {
        let prior = self.prior_state("reconstruct vlans")?;
        let mut vlans = VlanMap::new();

        for (id, record) in &self.vlans {
            let info = record.hw();
            let name = prior
                .vlans
                .get_vlan(*id)
                .map(|dumped| dumped.name.clone())
                .unwrap_or_default();
            let mut vlan = Vlan::new(*id, name);
            vlan.member_ports = info
                .all_ports
                .iter()
                .map(|port| (port, !info.untagged.contains(port)))
                .collect();
            vlan.interface_id = info.intf_id;
            vlans.add_vlan(vlan);
        }

        for ((_, ip), host) in &self.hosts {
            let Some(egress) = self.egresses.get(&host.hw().intf) else {
                trace!("Host {} has no egress object, assuming ecmp", ip);
                continue;
            };
            let egress = egress.hw();
            if egress.vlan == CPU_EGRESS_VLAN {
                continue;
            }

            let family = AddressFamily::of(ip);
            let drop = egress.programmed_to_drop();
            let vlan_id = VlanId::new(egress.vlan).ok();
            if drop {
                let known = vlan_id
                    .and_then(|v| prior.vlans.get_vlan(v))
                    .is_some_and(|v| v.neighbor_table(family).get_entry(ip).is_some());
                if !known {
                    debug!(
                        "Skipping drop entry {} on vlan {}: not a known neighbor",
                        ip, egress.vlan
                    );
                    continue;
                }
            }

            let vlan = vlan_id
                .and_then(|v| vlans.get_vlan_mut(v))
                .ok_or(WarmBootError::NeighborVlanMissing {
                    vlan: egress.vlan,
                    ip: *ip,
                })?;
            let intf_id = InterfaceId::new(u32::from(egress.vlan));
            let table = vlan.neighbor_table_mut(family);
            if drop {
                table.add_pending_entry(*ip, intf_id);
            } else {
                table.add_entry(
                    *ip,
                    egress.mac,
                    egress.port,
                    intf_id,
                    NeighborState::Unverified,
                );
            }
        }
        Ok(vlans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarmBootConfig;
    use crate::snapshot::PriorState;
    use pretty_assertions::assert_eq;
    use sonic_sai::sim::SimAsic;
    use sonic_sai::{EgressFlags, EgressId, L3Egress, L3Host, L3Intf};
    use sonic_types::{MacAddress, PortBitmap, PortId};
    use std::net::IpAddr;

    const MAC: MacAddress = MacAddress::new([2, 0, 0, 0, 0, 10]);

    fn vlan10() -> VlanId {
        VlanId::new(10).unwrap()
    }

    fn prior() -> PriorState {
        PriorState::from_value(serde_json::json!({
            "interfaces": [{
                "id": 10, "vlanId": 10, "name": "Vlan10", "mac": "02:00:00:00:00:10",
                "addresses": ["10.0.0.254/24"]
            }],
            "vlans": [{
                "id": 10, "name": "Vlan10",
                "arpTable": [{"ip": "10.0.0.3", "interfaceId": 10, "state": "pending"}]
            }]
        }))
        .unwrap()
    }

    fn add_neighbor(asic: &mut SimAsic, ip: &str, id: i32, vlan: u16, flags: EgressFlags) {
        asic.add_host(L3Host {
            vrf: 0,
            ip: ip.parse().unwrap(),
            intf: EgressId::new(id),
            mac: MacAddress::ZERO,
            port: PortId::new(0),
            flags: 0,
        })
        .add_egress(
            EgressId::new(id),
            L3Egress {
                vlan,
                intf: u32::from(vlan),
                mac: MacAddress::new([2, 0, 0, 0, 1, id as u8]),
                port: PortId::new(5),
                flags,
            },
        );
    }

    fn base_asic() -> SimAsic {
        let mut asic = SimAsic::new();
        asic.add_vlan(
            vlan10(),
            PortBitmap::from_ports([5, 6]).unwrap(),
            PortBitmap::from_ports([5]).unwrap(),
        )
        .add_interface(L3Intf {
            intf_id: 3,
            vid: vlan10(),
            vrf: 0,
            mac: MAC,
            mtu: 9100,
        });
        asic
    }

    fn populated(asic: &SimAsic) -> WarmBootCache {
        let mut cache = WarmBootCache::new(WarmBootConfig::default());
        cache.populate_from(prior(), asic).unwrap();
        cache
    }

    #[test]
    fn test_interface_map() {
        let cache = populated(&base_asic());
        let interfaces = cache.reconstruct_interface_map().unwrap();

        let intf = interfaces.get_interface(InterfaceId::new(10)).unwrap();
        assert_eq!(intf.name, "Vlan10");
        assert_eq!(intf.mac, MAC);
        assert_eq!(intf.mtu, 9100);
        assert_eq!(intf.addresses.len(), 1);
        assert_eq!(intf.addresses[0].to_string(), "10.0.0.254/24");
        assert_eq!(intf.addresses[0].prefix_len(), 24);
    }

    #[test]
    fn test_interface_missing_from_state_file() {
        let mut asic = base_asic();
        let vlan20 = VlanId::new(20).unwrap();
        asic.add_vlan(vlan20, PortBitmap::new(), PortBitmap::new())
            .add_interface(L3Intf {
                intf_id: 4,
                vid: vlan20,
                vrf: 0,
                mac: MAC,
                mtu: 1500,
            });

        let err = populated(&asic).reconstruct_interface_map().unwrap_err();
        assert!(matches!(err, WarmBootError::InterfaceMissingFromSnapshot(v) if v == vlan20));
    }

    #[test]
    fn test_vlan_map_neighbors() {
        let mut asic = base_asic();
        add_neighbor(&mut asic, "10.0.0.2", 100, 10, EgressFlags::empty());
        add_neighbor(&mut asic, "10.0.0.3", 101, 10, EgressFlags::DST_DISCARD);
        add_neighbor(&mut asic, "10.0.0.4", 102, 10, EgressFlags::DST_DISCARD);
        add_neighbor(&mut asic, "10.0.0.5", 103, 0, EgressFlags::empty());
        add_neighbor(&mut asic, "2001:db8::2", 104, 10, EgressFlags::empty());

        let cache = populated(&asic);
        let vlans = cache.reconstruct_vlan_map().unwrap();
        let vlan = vlans.get_vlan(vlan10()).unwrap();

        assert_eq!(vlan.name, "Vlan10");
        assert_eq!(vlan.interface_id, Some(InterfaceId::new(10)));
        assert_eq!(vlan.member_ports.get(&PortId::new(5)), Some(&false));
        assert_eq!(vlan.member_ports.get(&PortId::new(6)), Some(&true));

        let resolved: IpAddr = "10.0.0.2".parse().unwrap();
        let entry = vlan.arp_table.get_entry(&resolved).unwrap();
        assert_eq!(entry.state, NeighborState::Unverified);
        assert_eq!(entry.port, Some(PortId::new(5)));

        let pending: IpAddr = "10.0.0.3".parse().unwrap();
        assert!(vlan.arp_table.get_entry(&pending).unwrap().is_pending());

        assert_eq!(vlan.arp_table.len(), 2);
        assert_eq!(vlan.ndp_table.len(), 1);
    }

    #[test]
    fn test_neighbor_on_unknown_vlan_is_fatal() {
        let mut asic = base_asic();
        add_neighbor(&mut asic, "10.9.0.2", 100, 30, EgressFlags::empty());

        let err = populated(&asic).reconstruct_vlan_map().unwrap_err();
        assert!(matches!(err, WarmBootError::NeighborVlanMissing { vlan: 30, .. }));
    }

    #[test]
    fn test_reconstruct_before_populate() {
        let cache = WarmBootCache::new(WarmBootConfig::default());
        assert!(matches!(
            cache.reconstruct_vlan_map().unwrap_err(),
            WarmBootError::Lifecycle { .. }
        ));
    }
}
