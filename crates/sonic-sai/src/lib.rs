//! Switch ASIC driver surface.
//!
//! This crate describes what the warm-boot path needs from the forwarding
//! ASIC driver: the records the hardware hands back for each L2/L3 object
//! class, and the enumerate/traverse/delete primitives over them.
//!
//! - [`types`]: hardware object records (VLANs, L3 interfaces, stations,
//!   hosts, routes, egress objects, ECMP groups)
//! - [`error`]: driver status codes and error handling
//! - [`api`]: the [`VlanApi`] and [`L3Api`] driver traits
//! - [`sim`]: an in-memory ASIC implementing both traits
//!
//! # Example
//!
//! ```
//! use sonic_sai::{sim::SimAsic, AddressFamily, L3Api, SaiStatus};
//!
//! let asic = SimAsic::new();
//! let mut seen = 0;
//! asic.host_traverse(AddressFamily::V4, 0, 16, &mut |_, _| {
//!     seen += 1;
//!     SaiStatus::Success
//! })
//! .unwrap();
//! assert_eq!(seen, 0);
//! ```

pub mod api;
pub mod error;
pub mod sim;
pub mod types;

pub use api::{EcmpVisitor, EgressVisitor, HostVisitor, L3Api, RouteVisitor, SwitchAsic, VlanApi};
pub use error::{SaiError, SaiResult, SaiStatus};
pub use sonic_types::AddressFamily;
pub use types::{
    EgressFlags, EgressId, EgressIds, L2Station, L3EcmpGroup, L3Egress, L3Host, L3Info, L3Intf,
    L3Route, VlanData, VrfId,
};
