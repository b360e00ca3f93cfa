//! Delete whatever the control plane did not claim.

use super::{CacheState, WarmBootCache};
use crate::error::{Result, WarmBootError};
use log::{debug, info};
use sonic_sai::SwitchAsic;
use std::fmt;

/// Number of objects deleted per class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub prefix_routes: usize,
    pub host_routes: usize,
    pub hosts: usize,
    pub ecmp_groups: usize,
    pub egresses: usize,
    pub interfaces: usize,
    pub stations: usize,
    pub vlans: usize,
}

impl SweepStats {
    pub fn total(&self) -> usize {
        self.prefix_routes
            + self.host_routes
            + self.hosts
            + self.ecmp_groups
            + self.egresses
            + self.interfaces
            + self.stations
            + self.vlans
    }
}

impl fmt::Display for SweepStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "prefix_routes={} host_routes={} hosts={} ecmp_groups={} egresses={} \
             interfaces={} stations={} vlans={}",
            self.prefix_routes,
            self.host_routes,
            self.hosts,
            self.ecmp_groups,
            self.egresses,
            self.interfaces,
            self.stations,
            self.vlans
        )
    }
}

impl WarmBootCache {
    /// Deletes every unclaimed object from `asic` and empties the cache.
    ///
    /// Objects go in dependency order: routes, hosts, ECMP groups, egress
    /// objects, interfaces, stations and finally VLANs. The default VLAN is
    /// never deleted. The first driver failure aborts the sweep.
    pub fn sweep<A: SwitchAsic + ?Sized>(&mut self, asic: &mut A) -> Result<SweepStats> {
        self.expect_state("sweep", CacheState::Populated)?;
        self.state = CacheState::Swept;

        // The previous run's state is of no further use.
        self.prior = None;
        self.ecmp_paths.clear();

        let mut stats = SweepStats::default();

        for ((vrf, subnet, mask), route) in std::mem::take(&mut self.prefix_routes) {
            if route.is_claimed() {
                continue;
            }
            debug!("Deleting unreferenced route {}/{} in vrf {}", subnet, mask, vrf);
            asic.route_delete(route.hw()).map_err(|e| {
                WarmBootError::driver(format!("delete route {}/{} in vrf {}", subnet, mask, vrf), e)
            })?;
            stats.prefix_routes += 1;
        }

        for ((vrf, ip), route) in std::mem::take(&mut self.host_routes) {
            if route.is_claimed() {
                continue;
            }
            debug!("Deleting unreferenced host route {} in vrf {}", ip, vrf);
            asic.route_delete(route.hw()).map_err(|e| {
                WarmBootError::driver(format!("delete host route {} in vrf {}", ip, vrf), e)
            })?;
            stats.host_routes += 1;
        }

        for ((vrf, ip), host) in std::mem::take(&mut self.hosts) {
            if host.is_claimed() {
                continue;
            }
            debug!("Deleting unreferenced host {} in vrf {}", ip, vrf);
            asic.host_delete(host.hw()).map_err(|e| {
                WarmBootError::driver(format!("delete host {} in vrf {}", ip, vrf), e)
            })?;
            stats.hosts += 1;
        }

        for (_, ecmp) in std::mem::take(&mut self.ecmp_groups) {
            if ecmp.is_claimed() {
                continue;
            }
            let id = ecmp.hw().ecmp_intf;
            debug!("Deleting unreferenced ecmp {}", id);
            asic.ecmp_destroy(ecmp.hw())
                .map_err(|e| WarmBootError::driver(format!("destroy ecmp {}", id), e))?;
            stats.ecmp_groups += 1;
        }

        for (id, egress) in std::mem::take(&mut self.egresses) {
            if egress.is_claimed() {
                continue;
            }
            debug!("Deleting unreferenced egress {}", id);
            asic.egress_destroy(id)
                .map_err(|e| WarmBootError::driver(format!("destroy egress {}", id), e))?;
            stats.egresses += 1;
        }
        self.drop_egress = None;
        self.to_cpu_egress = None;

        for ((vlan, mac), intf) in std::mem::take(&mut self.interfaces) {
            if intf.is_claimed() {
                continue;
            }
            debug!("Deleting l3 interface {} on vlan {}", mac, vlan);
            asic.l3_intf_delete(intf.hw()).map_err(|e| {
                WarmBootError::driver(format!("delete l3 interface on vlan {}", vlan), e)
            })?;
            stats.interfaces += 1;
        }

        for (vlan, station) in std::mem::take(&mut self.stations) {
            if station.is_claimed() {
                continue;
            }
            debug!("Deleting l2 station on vlan {}", vlan);
            asic.l2_station_delete(vlan).map_err(|e| {
                WarmBootError::driver(format!("delete l2 station on vlan {}", vlan), e)
            })?;
            stats.stations += 1;
        }

        let default_vlan = asic
            .vlan_default_get()
            .map_err(|e| WarmBootError::driver("get default vlan", e))?;
        for (vlan, info) in std::mem::take(&mut self.vlans) {
            if info.is_claimed() || vlan == default_vlan {
                continue;
            }
            debug!("Deleting vlan {}", vlan);
            asic.vlan_destroy(vlan)
                .map_err(|e| WarmBootError::driver(format!("destroy vlan {}", vlan), e))?;
            stats.vlans += 1;
        }

        info!("Warm boot sweep done: {}", stats);
        Ok(stats)
    }
}
