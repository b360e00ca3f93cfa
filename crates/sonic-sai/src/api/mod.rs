//! Driver API traits.
//!
//! The warm-boot path talks to the ASIC through two traits:
//!
//! - [`vlan`]: VLAN enumeration, default VLAN, VLAN removal
//! - [`l3`]: L3 interfaces, stations, host/route/egress/ECMP traversal and removal
//!
//! Traversals take a visitor closure. The driver calls it synchronously for
//! every entry; a visitor returning anything other than
//! [`SaiStatus::Success`](crate::SaiStatus::Success) stops the walk and the
//! traversal returns that status as its error.

pub mod l3;
pub mod vlan;

pub use l3::{EcmpVisitor, EgressVisitor, HostVisitor, L3Api, RouteVisitor};
pub use vlan::VlanApi;

/// Everything the warm-boot cache needs from a switch driver.
pub trait SwitchAsic: VlanApi + L3Api {}

impl<T: VlanApi + L3Api + ?Sized> SwitchAsic for T {}
