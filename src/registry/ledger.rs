// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// svcmaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! Per-registry bookkeeping of blocked and failed units. The waiting ledger
//! maps a blocked unit name to the set of cause identifiers holding it up;
//! the failure ledger keeps the error captured by the last failed attempt.

use crate::error::Error;
use crate::unit::UnitId;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

#[derive(Default)]
pub struct WaitingLedger {
    t: Mutex<HashMap<String, BTreeSet<String>>>,
}

impl WaitingLedger {
    pub fn new() -> WaitingLedger {
        WaitingLedger::default()
    }

    /// Returns true when the cause was not yet recorded for this unit.
    pub fn add_cause(&self, unit: &str, cause: &str) -> bool {
        self.t
            .lock()
            .expect("waiting ledger lock poisoned")
            .entry(unit.to_string())
            .or_default()
            .insert(cause.to_string())
    }

    /// Drops one cause; the entry disappears when its cause set empties.
    /// Returns true only when this call removed the unit's last cause.
    pub fn remove_cause(&self, unit: &str, cause: &str) -> bool {
        let mut t = self.t.lock().expect("waiting ledger lock poisoned");
        let causes = match t.get_mut(unit) {
            None => return false,
            Some(v) => v,
        };
        if !causes.remove(cause) {
            return false;
        }
        if causes.is_empty() {
            t.remove(unit);
            return true;
        }
        false
    }

    pub fn causes(&self, unit: &str) -> Vec<String> {
        self.t
            .lock()
            .expect("waiting ledger lock poisoned")
            .get(unit)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn is_waiting(&self, unit: &str) -> bool {
        self.t
            .lock()
            .expect("waiting ledger lock poisoned")
            .contains_key(unit)
    }

    /// Removes every cause of the unit, for example when it is destroyed.
    pub fn clear_unit(&self, unit: &str) {
        self.t
            .lock()
            .expect("waiting ledger lock poisoned")
            .remove(unit);
    }

    pub fn is_empty(&self) -> bool {
        self.t
            .lock()
            .expect("waiting ledger lock poisoned")
            .is_empty()
    }

    pub fn snapshot(&self) -> Vec<(String, Vec<String>)> {
        let t = self.t.lock().expect("waiting ledger lock poisoned");
        let mut out: Vec<(String, Vec<String>)> = t
            .iter()
            .map(|(unit, causes)| (unit.clone(), causes.iter().cloned().collect()))
            .collect();
        out.sort();
        out
    }
}

#[derive(Default)]
pub struct FailureLedger {
    t: Mutex<HashMap<String, Arc<Error>>>,
}

impl FailureLedger {
    pub fn new() -> FailureLedger {
        FailureLedger::default()
    }

    pub fn record(&self, unit: &str, error: Arc<Error>) {
        self.t
            .lock()
            .expect("failure ledger lock poisoned")
            .insert(unit.to_string(), error);
    }

    /// Cleared on a successful retry or an explicit reset.
    pub fn clear(&self, unit: &str) -> Option<Arc<Error>> {
        self.t
            .lock()
            .expect("failure ledger lock poisoned")
            .remove(unit)
    }

    pub fn get(&self, unit: &str) -> Option<Arc<Error>> {
        self.t
            .lock()
            .expect("failure ledger lock poisoned")
            .get(unit)
            .map(Arc::clone)
    }

    pub fn is_empty(&self) -> bool {
        self.t
            .lock()
            .expect("failure ledger lock poisoned")
            .is_empty()
    }

    pub fn snapshot(&self) -> Vec<(String, Arc<Error>)> {
        let t = self.t.lock().expect("failure ledger lock poisoned");
        let mut out: Vec<(String, Arc<Error>)> =
            t.iter().map(|(k, v)| (k.clone(), Arc::clone(v))).collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

/// Aggregated "did everything converge" diagnostic: every blocked unit with
/// its causes and every failed unit with its captured error, across the
/// scanned registries.
#[derive(Debug, Default)]
pub struct ConvergeReport {
    pub blocked: Vec<(UnitId, Vec<String>)>,
    pub failed: Vec<(UnitId, String)>,
}

impl ConvergeReport {
    pub fn converged(&self) -> bool {
        self.blocked.is_empty() && self.failed.is_empty()
    }
}

impl std::fmt::Display for ConvergeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.converged() {
            return write!(f, "all units converged");
        }
        for (id, causes) in &self.blocked {
            writeln!(f, "{} waiting on: {}", id, causes.join(", "))?;
        }
        for (id, error) in &self.failed {
            writeln!(f, "{} failed: {}", id, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn causes_accumulate_and_drain() {
        let ledger = WaitingLedger::new();
        assert!(ledger.add_cause("api", "db/main"));
        assert!(ledger.add_cause("api", "cache"));
        assert!(!ledger.add_cause("api", "db/main")); // duplicate

        assert_eq!(ledger.causes("api"), vec!["cache", "db/main"]);
        assert!(!ledger.remove_cause("api", "db/main")); // one left
        assert!(ledger.remove_cause("api", "cache")); // last one
        assert!(!ledger.is_waiting("api"));
        assert!(ledger.is_empty());
    }

    #[test]
    fn removing_unknown_cause_is_harmless() {
        let ledger = WaitingLedger::new();
        assert!(!ledger.remove_cause("ghost", "anything"));
        ledger.add_cause("api", "db");
        assert!(!ledger.remove_cause("api", "not-a-cause"));
        assert!(ledger.is_waiting("api"));
    }

    #[test]
    fn failure_record_and_reset() {
        let ledger = FailureLedger::new();
        ledger.record(
            "api",
            Arc::new(Error::Other {
                msg: "boom".to_string(),
            }),
        );
        assert!(ledger.get("api").is_some());
        assert!(ledger.clear("api").is_some());
        assert!(ledger.is_empty());
    }

    #[test]
    fn report_aggregates_everything() {
        let report = ConvergeReport {
            blocked: vec![(UnitId::new("r", "api"), vec!["r/db".to_string()])],
            failed: vec![(UnitId::new("r", "cache"), "boom".to_string())],
        };
        assert!(!report.converged());
        let text = report.to_string();
        assert!(text.contains("r/api waiting on: r/db"));
        assert!(text.contains("r/cache failed: boom"));
    }
}
