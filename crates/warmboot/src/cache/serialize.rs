//! Persisting the ECMP membership the cache was built from.

use super::WarmBootCache;
use crate::snapshot::WarmBootCacheDump;
use serde_json::Value;

impl WarmBootCache {
    /// ECMP membership to persist under `hwSwitch.warmBootCache`, sorted by
    /// group id.
    pub fn to_dump(&self) -> WarmBootCacheDump {
        WarmBootCacheDump::from_paths(&self.ecmp_paths)
    }

    /// The dump as a JSON value, ready to nest into a larger document.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self.to_dump())
    }
}
