//! VLAN driver API.

use crate::error::SaiResult;
use crate::types::VlanData;
use sonic_types::VlanId;

pub trait VlanApi {
    /// Lists every VLAN programmed in hardware together with its members.
    fn vlan_list(&self) -> SaiResult<Vec<VlanData>>;

    /// Returns the VLAN untagged traffic lands in. It can never be destroyed.
    fn vlan_default_get(&self) -> SaiResult<VlanId>;

    fn vlan_destroy(&mut self, vlan: VlanId) -> SaiResult<()>;
}
