//! Hardware scan: walk every object class and index what the driver reports.

use super::{Discovered, VlanInfo, WarmBootCache};
use crate::error::{Result, WarmBootError};
use crate::state::InterfaceId;
use log::{debug, trace, warn};
use sonic_sai::types::egress_ids_to_string;
use sonic_sai::{
    AddressFamily, EgressId, EgressIds, L3EcmpGroup, L3Egress, L3Host, L3Intf, L3Route, SaiResult,
    SaiStatus, SwitchAsic,
};
use sonic_types::is_full_mask;
use std::collections::HashSet;

/// Turns the outcome of one visitor step into the status handed back to the
/// driver, keeping the first failure for the caller.
fn visit_step(failure: &mut Option<WarmBootError>, step: Result<()>) -> SaiStatus {
    match step {
        Ok(()) => SaiStatus::Success,
        Err(e) => {
            *failure = Some(e);
            SaiStatus::Failure
        }
    }
}

/// A failure raised inside the visitor takes precedence over the status the
/// driver returned for the aborted walk.
fn finish_traversal(
    rv: SaiResult<()>,
    failure: Option<WarmBootError>,
    context: &str,
) -> Result<()> {
    if let Some(e) = failure {
        return Err(e);
    }
    rv.map_err(|source| WarmBootError::driver(context, source))
}

impl WarmBootCache {
    pub(super) fn scan<A: SwitchAsic + ?Sized>(&mut self, asic: &A) -> Result<()> {
        self.scan_vlans(asic)?;

        let info = asic
            .l3_info()
            .map_err(|e| WarmBootError::driver("get l3 table capacities", e))?;

        // Egress ids used by at least one host. Only needed to classify
        // egress objects below.
        let mut referenced = HashSet::new();
        self.scan_hosts(asic, AddressFamily::V4, info.max_host, &mut referenced)?;
        let v6_hosts = self.config.v6_budget(info.max_host);
        self.scan_hosts(asic, AddressFamily::V6, v6_hosts, &mut referenced)?;

        self.scan_routes(asic, AddressFamily::V4, info.max_route)?;
        let v6_routes = self.config.v6_budget(info.max_route);
        self.scan_routes(asic, AddressFamily::V6, v6_routes)?;

        self.scan_egresses(asic, &referenced)?;
        self.scan_ecmp_groups(asic)
    }

    fn scan_vlans<A: SwitchAsic + ?Sized>(&mut self, asic: &A) -> Result<()> {
        let vlans = asic
            .vlan_list()
            .map_err(|e| WarmBootError::driver("list vlans", e))?;

        for data in vlans {
            debug!(
                "Got vlan {} with {} ports ({} untagged)",
                data.vlan,
                data.port_bitmap.count(),
                data.untagged_bitmap.count()
            );
            if self.vlans.contains_key(&data.vlan) {
                return Err(WarmBootError::DuplicateVlan(data.vlan));
            }

            let intf = asic.l3_intf_find_vlan(data.vlan).map_err(|e| {
                WarmBootError::driver(format!("find l3 interface for vlan {}", data.vlan), e)
            })?;

            self.vlans.insert(
                data.vlan,
                Discovered::new(VlanInfo {
                    vlan: data.vlan,
                    untagged: data.untagged_bitmap,
                    all_ports: data.port_bitmap,
                    intf_id: intf.as_ref().map(|_| InterfaceId::from(data.vlan)),
                }),
            );

            if let Some(intf) = intf {
                self.record_interface(asic, intf)?;
            }
        }
        Ok(())
    }

    fn record_interface<A: SwitchAsic + ?Sized>(&mut self, asic: &A, intf: L3Intf) -> Result<()> {
        let vlan = intf.vid;
        if let Some((_, existing_mac)) = self.interfaces.keys().find(|(v, _)| *v == vlan) {
            return Err(WarmBootError::MultipleInterfacesForVlan {
                vlan,
                existing: *existing_mac,
                mac: intf.mac,
            });
        }

        debug!(
            "Found l3 interface {} for vlan {} with mac {}",
            intf.intf_id, vlan, intf.mac
        );
        self.interfaces
            .insert((vlan, intf.mac), Discovered::new(intf));

        match asic.l2_station_get(vlan) {
            Ok(station) => {
                debug!("Found l2 station for vlan {} with mac {}", vlan, station.mac);
                self.stations.insert(vlan, Discovered::new(station));
            }
            Err(e) if e.is_not_found() => debug!("No l2 station for vlan {}", vlan),
            Err(e) => warn!("Failed to read l2 station for vlan {}: {}", vlan, e),
        }
        Ok(())
    }

    fn scan_hosts<A: SwitchAsic + ?Sized>(
        &mut self,
        asic: &A,
        family: AddressFamily,
        budget: u32,
        referenced: &mut HashSet<EgressId>,
    ) -> Result<()> {
        let rv = asic.host_traverse(family, 0, budget, &mut |_, host| {
            self.record_host(host, referenced);
            SaiStatus::Success
        });
        finish_traversal(rv, None, &format!("traverse {} hosts", family))
    }

    fn record_host(&mut self, host: &L3Host, referenced: &mut HashSet<EgressId>) {
        trace!(
            "Adding host entry vrf {} ip {} egress {}",
            host.vrf,
            host.ip,
            host.intf
        );
        referenced.insert(host.intf);
        self.hosts
            .insert((host.vrf, host.ip), Discovered::new(host.clone()));
    }

    fn scan_routes<A: SwitchAsic + ?Sized>(
        &mut self,
        asic: &A,
        family: AddressFamily,
        budget: u32,
    ) -> Result<()> {
        let rv = asic.route_traverse(family, 0, budget, &mut |_, route| {
            self.record_route(route);
            SaiStatus::Success
        });
        finish_traversal(rv, None, &format!("traverse {} routes", family))
    }

    fn record_route(&mut self, route: &L3Route) {
        if self.config.host_routes_in_host_table && is_full_mask(&route.mask) {
            trace!(
                "Adding host route vrf {} ip {} egress {}",
                route.vrf,
                route.subnet,
                route.intf
            );
            self.host_routes
                .insert((route.vrf, route.subnet), Discovered::new(route.clone()));
        } else {
            trace!(
                "Adding route vrf {} {}/{} egress {}",
                route.vrf,
                route.subnet,
                route.mask,
                route.intf
            );
            self.prefix_routes.insert(
                (route.vrf, route.subnet, route.mask),
                Discovered::new(route.clone()),
            );
        }
    }

    fn scan_egresses<A: SwitchAsic + ?Sized>(
        &mut self,
        asic: &A,
        referenced: &HashSet<EgressId>,
    ) -> Result<()> {
        let mut failure = None;
        let rv = asic.egress_traverse(&mut |id, egress| {
            let step = self.record_egress(id, egress, referenced);
            visit_step(&mut failure, step)
        });
        finish_traversal(rv, failure, "traverse egress objects")
    }

    fn record_egress(
        &mut self,
        id: EgressId,
        egress: &L3Egress,
        referenced: &HashSet<EgressId>,
    ) -> Result<()> {
        if self.egresses.contains_key(&id)
            || self.drop_egress == Some(id)
            || self.to_cpu_egress == Some(id)
        {
            return Err(WarmBootError::DuplicateEgressCallback(id));
        }

        if referenced.contains(&id) {
            debug!(
                "Adding egress {} vlan {} port {} mac {}",
                id, egress.vlan, egress.port, egress.mac
            );
            self.egresses.insert(id, Discovered::new(egress.clone()));
        } else if egress.programmed_to_drop() {
            if let Some(first) = self.drop_egress {
                return Err(WarmBootError::DuplicateDropEgress { first, second: id });
            }
            debug!("Found drop egress {}", id);
            self.drop_egress = Some(id);
        } else if egress.sends_to_cpu() {
            if let Some(first) = self.to_cpu_egress {
                return Err(WarmBootError::DuplicateToCpuEgress { first, second: id });
            }
            debug!("Found generic to-CPU egress {}", id);
            self.to_cpu_egress = Some(id);
        } else {
            return Err(WarmBootError::UnreferencedEgress {
                id,
                vlan: egress.vlan,
                intf: egress.intf,
                flags: format!("{:#x}", egress.flags.bits()),
            });
        }
        Ok(())
    }

    fn scan_ecmp_groups<A: SwitchAsic + ?Sized>(&mut self, asic: &A) -> Result<()> {
        let mut failure = None;
        let rv = asic.ecmp_traverse(&mut |group, live| {
            let step = self.record_ecmp(group, live);
            visit_step(&mut failure, step)
        });
        finish_traversal(rv, failure, "traverse ecmp groups")
    }

    fn record_ecmp(&mut self, group: &L3EcmpGroup, live: &[EgressId]) -> Result<()> {
        let id = group.ecmp_intf;
        let live_set: EgressIds = live.iter().copied().collect();

        let members = if self.ecmp_paths_populated {
            match self.ecmp_paths.get(&id) {
                Some(paths) => {
                    if paths != &live_set {
                        debug!(
                            "Ignoring paths [{}] for ecmp {} from hardware, using [{}]",
                            egress_ids_to_string(&live_set),
                            id,
                            egress_ids_to_string(paths)
                        );
                    }
                    paths.clone()
                }
                None if live_set.is_empty() => {
                    debug!("Skipping ecmp {} with no paths and no recorded membership", id);
                    return Ok(());
                }
                None => {
                    return Err(WarmBootError::EcmpNotInSnapshot {
                        ecmp: id,
                        live: egress_ids_to_string(&live_set),
                    })
                }
            }
        } else if live_set.is_empty() {
            debug!("Skipping ecmp {} with no paths", id);
            return Ok(());
        } else {
            live_set
        };

        if members.is_empty() {
            return Err(WarmBootError::EmptyEcmpGroup(id));
        }
        if let Some(existing) = self.ecmp_groups.get(&members) {
            return Err(WarmBootError::DuplicateEcmpMembers {
                ecmp: id,
                existing: existing.hw().ecmp_intf,
                members: egress_ids_to_string(&members),
            });
        }

        debug!(
            "Added ecmp {} with paths: {}",
            id,
            egress_ids_to_string(&members)
        );
        if !self.ecmp_paths_populated {
            self.ecmp_paths.insert(id, members.clone());
        }
        self.ecmp_groups
            .insert(members, Discovered::new(group.clone()));
        Ok(())
    }
}
