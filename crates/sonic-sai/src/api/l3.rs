//! L3 driver API: interfaces, stations, hosts, routes, egress objects and
//! ECMP groups.

use crate::error::{SaiResult, SaiStatus};
use crate::types::{EgressId, L2Station, L3EcmpGroup, L3Egress, L3Host, L3Info, L3Intf, L3Route};
use sonic_types::{AddressFamily, VlanId};

/// Visitor for host traversal: table index and entry.
pub type HostVisitor<'a> = dyn FnMut(u32, &L3Host) -> SaiStatus + 'a;

/// Visitor for route traversal: table index and entry.
pub type RouteVisitor<'a> = dyn FnMut(u32, &L3Route) -> SaiStatus + 'a;

/// Visitor for egress traversal.
pub type EgressVisitor<'a> = dyn FnMut(EgressId, &L3Egress) -> SaiStatus + 'a;

/// Visitor for ECMP traversal: group header and the members the driver
/// currently has installed. Members on links that are down are not listed.
pub type EcmpVisitor<'a> = dyn FnMut(&L3EcmpGroup, &[EgressId]) -> SaiStatus + 'a;

pub trait L3Api {
    /// Table capacities, which bound host and route traversals.
    fn l3_info(&self) -> SaiResult<L3Info>;

    /// Finds the L3 interface bound to `vlan`, `Ok(None)` if there is none.
    fn l3_intf_find_vlan(&self, vlan: VlanId) -> SaiResult<Option<L3Intf>>;

    fn l3_intf_delete(&mut self, intf: &L3Intf) -> SaiResult<()>;

    fn l2_station_get(&self, vlan: VlanId) -> SaiResult<L2Station>;

    fn l2_station_delete(&mut self, vlan: VlanId) -> SaiResult<()>;

    /// Visits host entries of `family` whose table index is in `[start, end)`.
    fn host_traverse(
        &self,
        family: AddressFamily,
        start: u32,
        end: u32,
        visit: &mut HostVisitor<'_>,
    ) -> SaiResult<()>;

    /// Visits route entries of `family` whose table index is in `[start, end)`.
    fn route_traverse(
        &self,
        family: AddressFamily,
        start: u32,
        end: u32,
        visit: &mut RouteVisitor<'_>,
    ) -> SaiResult<()>;

    fn egress_traverse(&self, visit: &mut EgressVisitor<'_>) -> SaiResult<()>;

    fn ecmp_traverse(&self, visit: &mut EcmpVisitor<'_>) -> SaiResult<()>;

    fn host_delete(&mut self, host: &L3Host) -> SaiResult<()>;

    fn route_delete(&mut self, route: &L3Route) -> SaiResult<()>;

    fn ecmp_destroy(&mut self, ecmp: &L3EcmpGroup) -> SaiResult<()>;

    fn egress_destroy(&mut self, egress: EgressId) -> SaiResult<()>;
}
