//! Error types for the warm-boot cache.
//!
//! Every [`WarmBootError`] means hardware and software state can no longer
//! be trusted to agree; the daemon aborts on any of them. Lookups made by
//! forwarding-sync code report through [`LookupError`] instead, where a miss
//! is an ordinary outcome and the caller simply programs the object anew.

use crate::cache::CacheState;
use sonic_sai::{EgressId, SaiError};
use sonic_types::{MacAddress, VlanId};
use std::net::IpAddr;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarmBootError {
    #[error("unable to read switch state from {path}: {source}")]
    SnapshotRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to parse warm boot switch state: {0}")]
    SnapshotParse(#[from] serde_json::Error),

    #[error("was not able to recover software state from warm boot file: {0}")]
    MissingSwitchState(String),

    #[error("invalid ecmp egress id in dumped warm boot cache")]
    InvalidEcmpObject,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to {context}: {source}")]
    Driver {
        context: String,
        #[source]
        source: SaiError,
    },

    #[error("vlan {0} listed twice by the driver")]
    DuplicateVlan(VlanId),

    #[error("vlan {vlan} has a second l3 interface {mac} (already have {existing})")]
    MultipleInterfacesForVlan {
        vlan: VlanId,
        existing: MacAddress,
        mac: MacAddress,
    },

    #[error("double callback for egress id {0}")]
    DuplicateEgressCallback(EgressId),

    #[error("duplicated drop egress found in HW: {second} and {first}")]
    DuplicateDropEgress { first: EgressId, second: EgressId },

    #[error("duplicated generic to-CPU egress found in HW: {second} and {first}")]
    DuplicateToCpuEgress { first: EgressId, second: EgressId },

    #[error(
        "egress {id} is not referenced by any host entry and is neither drop nor to-CPU \
         (vlan: {vlan}, interface: {intf}, flags: {flags})"
    )]
    UnreferencedEgress {
        id: EgressId,
        vlan: u16,
        intf: u32,
        flags: String,
    },

    #[error("ecmp {ecmp} has live paths [{live}] but is missing from the warm boot file")]
    EcmpNotInSnapshot { ecmp: EgressId, live: String },

    #[error("ecmp {0} resolved to an empty set of paths")]
    EmptyEcmpGroup(EgressId),

    #[error("ecmp {ecmp} duplicates paths [{members}] already held by ecmp {existing}")]
    DuplicateEcmpMembers {
        ecmp: EgressId,
        existing: EgressId,
        members: String,
    },

    #[error("interface for vlan {0} found in hardware but not in the warm boot file")]
    InterfaceMissingFromSnapshot(VlanId),

    #[error("neighbor {ip} resolves to vlan {vlan} which was not found in hardware")]
    NeighborVlanMissing { vlan: u16, ip: IpAddr },

    #[error("cannot {op} while cache is {state}")]
    Lifecycle { op: &'static str, state: CacheState },
}

impl WarmBootError {
    pub(crate) fn driver(context: impl Into<String>, source: SaiError) -> Self {
        WarmBootError::Driver {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for warm-boot operations.
pub type Result<T> = std::result::Result<T, WarmBootError>;

/// Outcome of a reconciler query or claim that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// The cache has not scanned hardware yet. A caller bug, not a miss.
    #[error("warm boot cache has not been populated")]
    NotScanned,

    /// The cache was swept and its contents released.
    #[error("warm boot cache has already been swept")]
    Released,

    #[error("{0} not found in warm boot cache")]
    NotFound(String),

    #[error("{0} was already claimed")]
    AlreadyClaimed(String),
}
