//! Warm boot reconciliation cache.
//!
//! After a warm restart the forwarding ASIC keeps every VLAN, L3 interface,
//! host, route, egress object and ECMP group the previous process
//! programmed. This crate lets the restarted control plane adopt that state
//! instead of reprogramming it:
//!
//! 1. [`PriorState`] loads the software state and ECMP membership persisted
//!    by the previous run.
//! 2. [`WarmBootCache::populate`] scans the hardware through the driver
//!    traits and indexes each object by its canonical key.
//! 3. Forwarding-sync code rebuilds the interface and VLAN maps, looks up
//!    hardware objects and claims the ones it keeps.
//! 4. [`WarmBootCache::sweep`] deletes everything left unclaimed, in
//!    dependency order.
//! 5. [`WarmBootCache::to_dump`] produces the ECMP membership document the
//!    next restart reads back.
//!
//! # Example
//!
//! ```
//! use sonic_sai::sim::SimAsic;
//! use sonic_warmboot::{PriorState, WarmBootCache, WarmBootConfig};
//!
//! let mut asic = SimAsic::new();
//! let mut cache = WarmBootCache::new(WarmBootConfig::default());
//! cache.populate_from(PriorState::default(), &asic).unwrap();
//! let stats = cache.sweep(&mut asic).unwrap();
//! assert_eq!(stats.total(), 0);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod snapshot;
pub mod state;

pub use cache::{CacheState, CacheSummary, Claim, Discovered, SweepStats, VlanInfo, WarmBootCache};
pub use config::WarmBootConfig;
pub use error::{LookupError, Result, WarmBootError};
pub use snapshot::{EcmpObject, EcmpPathMap, PriorState, WarmBootCacheDump};
pub use state::{
    Interface, InterfaceId, InterfaceMap, NeighborEntry, NeighborState, NeighborTable, RouterId,
    SwitchState, Vlan, VlanMap,
};
