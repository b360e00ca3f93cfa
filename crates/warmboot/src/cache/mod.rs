//! The warm-boot cache.
//!
//! [`WarmBootCache`] indexes every object found in hardware after a warm
//! restart. Each record carries a [`Claim`]; forwarding-sync code claims the
//! records it keeps while replaying its configuration, and
//! [`WarmBootCache::sweep`] deletes the rest.
//!
//! The cache moves through three phases, see [`CacheState`]. Operations
//! invoked in the wrong phase fail with a lifecycle error.

mod reconcile;
mod reconstruct;
mod scan;
mod serialize;
mod sweep;

pub use sweep::SweepStats;

use crate::config::WarmBootConfig;
use crate::error::{Result, WarmBootError};
use crate::snapshot::{EcmpPathMap, PriorState};
use crate::state::{InterfaceId, SwitchState};
use log::info;
use sonic_sai::{
    EgressId, EgressIds, L2Station, L3EcmpGroup, L3Egress, L3Host, L3Intf, L3Route, SwitchAsic,
    VrfId,
};
use sonic_types::{MacAddress, PortBitmap, VlanId};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// Whether the control plane has taken ownership of a hardware object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Claim {
    #[default]
    Unclaimed,
    Claimed,
}

/// A hardware record and its claim state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered<T> {
    hw: T,
    claim: Claim,
}

impl<T> Discovered<T> {
    pub(crate) fn new(hw: T) -> Self {
        Self {
            hw,
            claim: Claim::Unclaimed,
        }
    }

    /// The record as reported by the driver.
    pub fn hw(&self) -> &T {
        &self.hw
    }

    pub fn claim_state(&self) -> Claim {
        self.claim
    }

    pub fn is_claimed(&self) -> bool {
        self.claim == Claim::Claimed
    }

    /// Returns false if the record was already claimed.
    pub(crate) fn claim(&mut self) -> bool {
        match self.claim {
            Claim::Unclaimed => {
                self.claim = Claim::Claimed;
                true
            }
            Claim::Claimed => false,
        }
    }
}

/// Port membership of a VLAN found in hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VlanInfo {
    pub vlan: VlanId,
    pub untagged: PortBitmap,
    pub all_ports: PortBitmap,
    /// Set when an L3 interface is bound to the VLAN.
    pub intf_id: Option<InterfaceId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Created, hardware not scanned yet.
    Constructed,
    /// Scanned and open for lookups and claims.
    Populated,
    /// Leftovers deleted. Nothing more to do.
    Swept,
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Constructed => write!(f, "constructed"),
            CacheState::Populated => write!(f, "populated"),
            CacheState::Swept => write!(f, "swept"),
        }
    }
}

/// Object counts per class, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheSummary {
    pub vlans: usize,
    pub interfaces: usize,
    pub stations: usize,
    pub hosts: usize,
    pub host_routes: usize,
    pub prefix_routes: usize,
    pub egresses: usize,
    pub ecmp_groups: usize,
    pub drop_egress: Option<EgressId>,
    pub to_cpu_egress: Option<EgressId>,
}

impl fmt::Display for CacheSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "vlans={} interfaces={} stations={} hosts={} host_routes={} prefix_routes={} \
             egresses={} ecmp_groups={}",
            self.vlans,
            self.interfaces,
            self.stations,
            self.hosts,
            self.host_routes,
            self.prefix_routes,
            self.egresses,
            self.ecmp_groups
        )?;
        if let Some(id) = self.drop_egress {
            write!(f, " drop_egress={}", id)?;
        }
        if let Some(id) = self.to_cpu_egress {
            write!(f, " to_cpu_egress={}", id)?;
        }
        Ok(())
    }
}

type HostKey = (VrfId, IpAddr);
type PrefixKey = (VrfId, IpAddr, IpAddr);

pub struct WarmBootCache {
    config: WarmBootConfig,
    state: CacheState,
    /// Released by the sweep.
    prior: Option<SwitchState>,
    ecmp_paths: EcmpPathMap,
    /// The snapshot carried ECMP membership, so it wins over live lists.
    ecmp_paths_populated: bool,
    vlans: BTreeMap<VlanId, Discovered<VlanInfo>>,
    interfaces: BTreeMap<(VlanId, MacAddress), Discovered<L3Intf>>,
    stations: BTreeMap<VlanId, Discovered<L2Station>>,
    hosts: BTreeMap<HostKey, Discovered<L3Host>>,
    host_routes: BTreeMap<HostKey, Discovered<L3Route>>,
    prefix_routes: BTreeMap<PrefixKey, Discovered<L3Route>>,
    egresses: BTreeMap<EgressId, Discovered<L3Egress>>,
    ecmp_groups: BTreeMap<EgressIds, Discovered<L3EcmpGroup>>,
    drop_egress: Option<EgressId>,
    to_cpu_egress: Option<EgressId>,
}

impl WarmBootCache {
    pub fn new(config: WarmBootConfig) -> Self {
        Self {
            config,
            state: CacheState::Constructed,
            prior: None,
            ecmp_paths: EcmpPathMap::new(),
            ecmp_paths_populated: false,
            vlans: BTreeMap::new(),
            interfaces: BTreeMap::new(),
            stations: BTreeMap::new(),
            hosts: BTreeMap::new(),
            host_routes: BTreeMap::new(),
            prefix_routes: BTreeMap::new(),
            egresses: BTreeMap::new(),
            ecmp_groups: BTreeMap::new(),
            drop_egress: None,
            to_cpu_egress: None,
        }
    }

    pub fn config(&self) -> &WarmBootConfig {
        &self.config
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    /// Loads the state file named by the configuration and scans `asic`.
    pub fn populate<A: SwitchAsic + ?Sized>(&mut self, asic: &A) -> Result<()> {
        self.expect_state("populate", CacheState::Constructed)?;
        let prior = PriorState::load(&self.config.snapshot_path)?;
        self.populate_from(prior, asic)
    }

    /// Scans `asic` against an already loaded prior state.
    pub fn populate_from<A: SwitchAsic + ?Sized>(
        &mut self,
        prior: PriorState,
        asic: &A,
    ) -> Result<()> {
        self.expect_state("populate", CacheState::Constructed)?;

        self.prior = Some(prior.switch_state);
        self.ecmp_paths = prior.ecmp_paths;
        self.ecmp_paths_populated = prior.ecmp_paths_populated;
        self.scan(asic)?;
        self.state = CacheState::Populated;

        info!("Warm boot cache populated: {}", self.summary());
        Ok(())
    }

    pub fn summary(&self) -> CacheSummary {
        CacheSummary {
            vlans: self.vlans.len(),
            interfaces: self.interfaces.len(),
            stations: self.stations.len(),
            hosts: self.hosts.len(),
            host_routes: self.host_routes.len(),
            prefix_routes: self.prefix_routes.len(),
            egresses: self.egresses.len(),
            ecmp_groups: self.ecmp_groups.len(),
            drop_egress: self.drop_egress,
            to_cpu_egress: self.to_cpu_egress,
        }
    }

    /// ECMP membership known to the cache: from the state file, plus groups
    /// resolved from hardware when the file carried none.
    pub fn ecmp_paths(&self) -> &EcmpPathMap {
        &self.ecmp_paths
    }

    fn expect_state(&self, op: &'static str, expected: CacheState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(WarmBootError::Lifecycle {
                op,
                state: self.state,
            })
        }
    }
}

impl fmt::Debug for WarmBootCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmBootCache")
            .field("state", &self.state)
            .field("summary", &self.summary())
            .finish()
    }
}
