//! Persisted state from the previous run.
//!
//! The state file holds the software switch state and, when the previous
//! run got far enough, a hardware section with the ECMP group membership it
//! programmed. Two layouts are accepted:
//!
//! ```text
//! { "swSwitch": { <switch state> }, "hwSwitch": { ... } }
//! { <switch state> }
//! ```
//!
//! Inside `hwSwitch`, ECMP membership may come from the host table dump
//! (`hostTable.ecmpHosts`) and from the dump this cache writes itself
//! (`warmBootCache.ecmpObjects`). Both are merged into one map.

use crate::error::{Result, WarmBootError};
use crate::state::SwitchState;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sonic_sai::{EgressId, EgressIds};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const SW_SWITCH: &str = "swSwitch";
const HW_SWITCH: &str = "hwSwitch";

/// ECMP group id to the egress ids of its members.
pub type EcmpPathMap = BTreeMap<EgressId, EgressIds>;

/// One ECMP group in the dump written by [`crate::WarmBootCache::to_dump`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcmpObject {
    pub ecmp_egress_id: EgressId,
    #[serde(default)]
    pub paths: Vec<EgressId>,
}

/// Document stored under `hwSwitch.warmBootCache`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmBootCacheDump {
    #[serde(default)]
    pub ecmp_objects: Vec<EcmpObject>,
}

impl WarmBootCacheDump {
    pub fn from_paths(paths: &EcmpPathMap) -> Self {
        Self {
            ecmp_objects: paths
                .iter()
                .map(|(id, members)| EcmpObject {
                    ecmp_egress_id: *id,
                    paths: members.iter().copied().collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HwSwitchSection {
    #[serde(default)]
    host_table: HostTableSection,
    #[serde(default)]
    warm_boot_cache: WarmBootCacheDump,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HostTableSection {
    #[serde(default)]
    ecmp_hosts: Vec<EcmpHostEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EcmpHostEntry {
    ecmp_egress_id: EgressId,
    #[serde(default)]
    ecmp_egress: Option<EcmpEgressSection>,
    #[serde(default)]
    paths: Vec<EgressId>,
}

#[derive(Debug, Default, Deserialize)]
struct EcmpEgressSection {
    #[serde(default)]
    paths: Vec<EgressId>,
}

/// Everything recovered from the state file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorState {
    pub switch_state: SwitchState,
    pub ecmp_paths: EcmpPathMap,
    /// True if the file had a hardware section. A populated map that is
    /// empty is different from no map at all: only the former is
    /// authoritative for ECMP membership.
    pub ecmp_paths_populated: bool,
}

impl PriorState {
    /// Prior state with no ECMP membership information.
    pub fn new(switch_state: SwitchState) -> Self {
        Self {
            switch_state,
            ecmp_paths: EcmpPathMap::new(),
            ecmp_paths_populated: false,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| WarmBootError::SnapshotRead {
            path: path.to_path_buf(),
            source,
        })?;
        let prior = Self::from_json_str(&content)?;
        info!(
            "Loaded warm boot state from {}: {} interfaces, {} vlans, {} ecmp groups",
            path.display(),
            prior.switch_state.interfaces.len(),
            prior.switch_state.vlans.len(),
            prior.ecmp_paths.len()
        );
        Ok(prior)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(content)?;
        Self::from_value(doc)
    }

    pub fn from_value(mut doc: Value) -> Result<Self> {
        let Some(top) = doc.as_object_mut() else {
            return Err(WarmBootError::MissingSwitchState(
                "state file is not a JSON object".to_string(),
            ));
        };

        let hw = top.remove(HW_SWITCH);
        let sw = match top.remove(SW_SWITCH) {
            Some(sw) => sw,
            // Older files are the switch state itself.
            None => Value::Object(std::mem::take(top)),
        };
        let switch_state: SwitchState = serde_json::from_value(sw)
            .map_err(|e| WarmBootError::MissingSwitchState(e.to_string()))?;

        let mut prior = PriorState::new(switch_state);
        match hw {
            Some(hw) => {
                let section: HwSwitchSection = serde_json::from_value(hw)?;
                prior.ecmp_paths = ecmp_paths_from(section)?;
                prior.ecmp_paths_populated = true;
            }
            None => debug!("No {} section in warm boot state, skipping ecmp paths", HW_SWITCH),
        }
        Ok(prior)
    }
}

/// Adds `members` to the group `id`. A group is only recorded once it has a
/// member.
fn add_paths(paths: &mut EcmpPathMap, id: EgressId, members: impl IntoIterator<Item = EgressId>) {
    for member in members {
        paths.entry(id).or_default().insert(member);
    }
}

fn ecmp_paths_from(section: HwSwitchSection) -> Result<EcmpPathMap> {
    let mut paths = EcmpPathMap::new();

    for host in section.host_table.ecmp_hosts {
        if !host.ecmp_egress_id.is_valid() {
            continue;
        }
        let nested = host.ecmp_egress.map(|egress| egress.paths).unwrap_or_default();
        add_paths(&mut paths, host.ecmp_egress_id, nested.into_iter().chain(host.paths));
    }

    for object in section.warm_boot_cache.ecmp_objects {
        if !object.ecmp_egress_id.is_valid() {
            return Err(WarmBootError::InvalidEcmpObject);
        }
        add_paths(&mut paths, object.ecmp_egress_id, object.paths);
    }

    for (id, members) in &paths {
        debug!(
            "Recovered ecmp {} with paths: {}",
            id,
            sonic_sai::types::egress_ids_to_string(members)
        );
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sonic_types::VlanId;

    fn ids(raw: &[i32]) -> EgressIds {
        raw.iter().copied().map(EgressId::new).collect()
    }

    #[test]
    fn test_nested_layout_merges_both_sources() {
        let prior = PriorState::from_value(json!({
            "swSwitch": {"vlans": [{"id": 10}]},
            "hwSwitch": {
                "hostTable": {"ecmpHosts": [
                    {"ecmpEgressId": 200, "ecmpEgress": {"paths": [5, 7]}},
                    {"ecmpEgressId": -1, "paths": [1]},
                    {"ecmpEgressId": 300, "paths": [11]}
                ]},
                "warmBootCache": {"ecmpObjects": [
                    {"ecmpEgressId": 200, "paths": [7, 9]}
                ]}
            }
        }))
        .unwrap();

        assert!(prior.ecmp_paths_populated);
        assert_eq!(prior.ecmp_paths.len(), 2);
        assert_eq!(prior.ecmp_paths[&EgressId::new(200)], ids(&[5, 7, 9]));
        assert_eq!(prior.ecmp_paths[&EgressId::new(300)], ids(&[11]));
        assert!(prior
            .switch_state
            .vlans
            .get_vlan(VlanId::new(10).unwrap())
            .is_some());
    }

    #[test]
    fn test_group_without_paths_is_not_recorded() {
        let prior = PriorState::from_value(json!({
            "swSwitch": {},
            "hwSwitch": {
                "hostTable": {"ecmpHosts": [
                    {"ecmpEgressId": 200, "paths": []},
                    {"ecmpEgressId": 300, "paths": [5]}
                ]},
                "warmBootCache": {"ecmpObjects": [
                    {"ecmpEgressId": 400, "paths": []}
                ]}
            }
        }))
        .unwrap();

        assert!(prior.ecmp_paths_populated);
        assert_eq!(prior.ecmp_paths.len(), 1);
        assert_eq!(prior.ecmp_paths[&EgressId::new(300)], ids(&[5]));
        assert!(prior.ecmp_paths.values().all(|members| !members.is_empty()));
    }

    #[test]
    fn test_flat_layout_without_hw_section() {
        let prior = PriorState::from_value(json!({"vlans": [{"id": 20}]})).unwrap();
        assert!(!prior.ecmp_paths_populated);
        assert!(prior.ecmp_paths.is_empty());
        assert_eq!(prior.switch_state.vlans.len(), 1);
    }

    #[test]
    fn test_empty_hw_section_is_populated() {
        let prior = PriorState::from_value(json!({"swSwitch": {}, "hwSwitch": {}})).unwrap();
        assert!(prior.ecmp_paths_populated);
        assert!(prior.ecmp_paths.is_empty());
    }

    #[test]
    fn test_invalid_id_in_cache_dump_is_fatal() {
        let err = PriorState::from_value(json!({
            "swSwitch": {},
            "hwSwitch": {"warmBootCache": {"ecmpObjects": [{"ecmpEgressId": -1, "paths": [5]}]}}
        }))
        .unwrap_err();
        assert!(matches!(err, WarmBootError::InvalidEcmpObject));
    }

    #[test]
    fn test_unusable_documents() {
        assert!(matches!(
            PriorState::from_json_str("[1, 2]").unwrap_err(),
            WarmBootError::MissingSwitchState(_)
        ));
        assert!(matches!(
            PriorState::from_json_str("{not json").unwrap_err(),
            WarmBootError::SnapshotParse(_)
        ));
        assert!(matches!(
            PriorState::from_value(json!({"swSwitch": {"vlans": 5}})).unwrap_err(),
            WarmBootError::MissingSwitchState(_)
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = PriorState::load(dir.path().join("switch_state.json")).unwrap_err();
        assert!(matches!(err, WarmBootError::SnapshotRead { .. }));
    }

    #[test]
    fn test_dump_round_trip() {
        let mut paths = EcmpPathMap::new();
        paths.insert(EgressId::new(1), ids(&[7, 5]));
        paths.insert(EgressId::new(2), ids(&[9]));

        let dump = WarmBootCacheDump::from_paths(&paths);
        let doc = json!({"swSwitch": {}, "hwSwitch": {"warmBootCache": dump}});
        let prior = PriorState::from_value(doc).unwrap();
        assert_eq!(prior.ecmp_paths, paths);
    }
}
