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

//! A registry ("manager") holds the units of one namespace: a pluggable
//! name->unit store kept in declared order, the loaders that contributed
//! units and their dependency edges, the per-registry waiting/failure
//! ledgers, and a channel broadcasting unit (un)registration.

pub mod ledger;

pub use ledger::{ConvergeReport, FailureLedger, WaitingLedger};

use crate::broadcast::{Broadcast, Subscriber};
use crate::deps::DependencySource;
use crate::unit::{UnitEntry, UnitId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Unit (un)registration event, broadcast by the owning registry.
#[derive(Clone, Debug)]
pub enum RegistryOp {
    UnitAdded(UnitId),
    UnitRemoved(UnitId),
}

/// Pluggable unit storage. Implementations must preserve insertion order in
/// `names`, which defines the registry's declared iteration order.
pub trait UnitStore: Send + Sync {
    fn insert(&self, name: String, unit: Arc<UnitEntry>) -> Option<Arc<UnitEntry>>;
    fn remove(&self, name: &str) -> Option<Arc<UnitEntry>>;
    fn get(&self, name: &str) -> Option<Arc<UnitEntry>>;
    fn names(&self) -> Vec<String>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Default store: a mutex-guarded map plus an order vector.
#[derive(Default)]
pub struct MemUnitStore {
    data: Mutex<(HashMap<String, Arc<UnitEntry>>, Vec<String>)>,
}

impl MemUnitStore {
    pub fn new() -> MemUnitStore {
        MemUnitStore::default()
    }
}

impl UnitStore for MemUnitStore {
    fn insert(&self, name: String, unit: Arc<UnitEntry>) -> Option<Arc<UnitEntry>> {
        let mut data = self.data.lock().expect("unit store lock poisoned");
        let old = data.0.insert(name.clone(), unit);
        if old.is_none() {
            data.1.push(name);
        }
        old
    }

    fn remove(&self, name: &str) -> Option<Arc<UnitEntry>> {
        let mut data = self.data.lock().expect("unit store lock poisoned");
        let old = data.0.remove(name);
        if old.is_some() {
            data.1.retain(|n| n != name);
        }
        old
    }

    fn get(&self, name: &str) -> Option<Arc<UnitEntry>> {
        self.data
            .lock()
            .expect("unit store lock poisoned")
            .0
            .get(name)
            .map(Arc::clone)
    }

    fn names(&self) -> Vec<String> {
        self.data.lock().expect("unit store lock poisoned").1.clone()
    }

    fn len(&self) -> usize {
        self.data.lock().expect("unit store lock poisoned").0.len()
    }
}

pub struct UnitRegistry {
    name: String,
    store: Box<dyn UnitStore>,
    subs: Broadcast<RegistryOp>,
    loaders: Mutex<Vec<Arc<dyn DependencySource>>>,
    waiting: WaitingLedger,
    failures: FailureLedger,
}

impl UnitRegistry {
    pub fn new(name: &str) -> Arc<UnitRegistry> {
        Self::with_store(name, Box::new(MemUnitStore::new()))
    }

    pub fn with_store(name: &str, store: Box<dyn UnitStore>) -> Arc<UnitRegistry> {
        Arc::new(UnitRegistry {
            name: name.to_string(),
            store,
            subs: Broadcast::new(),
            loaders: Mutex::new(Vec::new()),
            waiting: WaitingLedger::new(),
            failures: FailureLedger::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a unit, attaching its back-reference to this registry and
    /// broadcasting the registration. Returns a previously stored unit of
    /// the same name.
    pub fn insert_unit(self: &Arc<Self>, unit: Arc<UnitEntry>) -> Option<Arc<UnitEntry>> {
        let id = unit.id().clone();
        unit.attach(Arc::downgrade(self));
        let old = self.store.insert(id.name.clone(), unit);
        if let Some(old) = &old {
            old.detach();
        }
        self.subs.notify(&RegistryOp::UnitAdded(id));
        old
    }

    /// Removes a unit; its waiting causes and failure record go with it.
    /// The unit keeps its back-reference to this registry, so re-creating
    /// it registers it again.
    pub fn remove_unit(&self, name: &str) -> Option<Arc<UnitEntry>> {
        let unit = self.store.remove(name)?;
        self.waiting.clear_unit(name);
        self.failures.clear(name);
        self.subs
            .notify(&RegistryOp::UnitRemoved(unit.id().clone()));
        Some(unit)
    }

    pub fn get(&self, name: &str) -> Option<Arc<UnitEntry>> {
        self.store.get(name)
    }

    /// Unit names in declared (insertion) order.
    pub fn unit_names(&self) -> Vec<String> {
        self.store.names()
    }

    pub fn units(&self) -> Vec<Arc<UnitEntry>> {
        self.store
            .names()
            .iter()
            .filter_map(|n| self.store.get(n))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Registers a loader that contributed units/edges to this registry.
    pub fn add_loader(&self, loader: Arc<dyn DependencySource>) {
        self.loaders
            .lock()
            .expect("loader lock poisoned")
            .push(loader);
    }

    pub fn loaders(&self) -> Vec<Arc<dyn DependencySource>> {
        self.loaders.lock().expect("loader lock poisoned").clone()
    }

    /// Declared dependency edges of one unit, concatenated over all loaders
    /// in registration order. An absent loader is an empty result, not an
    /// error.
    pub fn edges(&self, id: &UnitId) -> Vec<UnitId> {
        let mut out = Vec::new();
        for loader in self.loaders() {
            out.extend(loader.edges(id));
        }
        out
    }

    pub fn waiting(&self) -> &WaitingLedger {
        &self.waiting
    }

    pub fn failures(&self) -> &FailureLedger {
        &self.failures
    }

    pub fn add_listener(&self, listener: Arc<dyn Subscriber<RegistryOp>>) -> u64 {
        self.subs.add(listener)
    }

    pub fn remove_listener(&self, token: u64) -> Option<Arc<dyn Subscriber<RegistryOp>>> {
        self.subs.remove(token)
    }

    /// Best-effort teardown of every unit, reverse declared order. Used when
    /// the registry is replaced in or removed from the global directory.
    pub fn teardown(&self) {
        let mut names = self.unit_names();
        names.reverse();
        for name in names {
            if let Some(unit) = self.get(&name) {
                if let Err(e) = unit.destroy() {
                    log::warn!("teardown of {}/{} failed: {}", self.name, name, e);
                }
            }
        }
    }
}

impl Drop for UnitRegistry {
    fn drop(&mut self) {
        log::debug!("UnitRegistry {} drop.", self.name);
    }
}
