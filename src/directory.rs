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

//! Process-wide name->registry directory. The backing map is replaceable;
//! registration listeners fire when a registry arrives or leaves.

use crate::broadcast::{Broadcast, Subscriber};
use crate::error::*;
use crate::registry::UnitRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Registry (un)registration event.
#[derive(Clone, Debug)]
pub enum RegistryEvent {
    Registered(String),
    Unregistered(String),
}

/// Replaceable backing map of the directory.
pub trait DirectoryBackend: Send + Sync {
    fn insert(&mut self, name: String, registry: Arc<UnitRegistry>) -> Result<()>;
    fn remove(&mut self, name: &str) -> Option<Arc<UnitRegistry>>;
    fn get(&self, name: &str) -> Option<Arc<UnitRegistry>>;
    fn names(&self) -> Vec<String>;
}

#[derive(Default)]
pub struct MemDirectory {
    t: HashMap<String, Arc<UnitRegistry>>,
}

impl MemDirectory {
    pub fn new() -> MemDirectory {
        MemDirectory::default()
    }
}

impl DirectoryBackend for MemDirectory {
    fn insert(&mut self, name: String, registry: Arc<UnitRegistry>) -> Result<()> {
        self.t.insert(name, registry);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Option<Arc<UnitRegistry>> {
        self.t.remove(name)
    }

    fn get(&self, name: &str) -> Option<Arc<UnitRegistry>> {
        self.t.get(name).map(Arc::clone)
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.t.keys().cloned().collect();
        names.sort();
        names
    }
}

pub struct GlobalDirectory {
    backend: Mutex<Box<dyn DirectoryBackend>>,
    subs: Broadcast<RegistryEvent>,
}

impl Default for GlobalDirectory {
    fn default() -> Self {
        GlobalDirectory::new()
    }
}

impl GlobalDirectory {
    pub fn new() -> GlobalDirectory {
        Self::with_backend(Box::new(MemDirectory::new()))
    }

    pub fn with_backend(backend: Box<dyn DirectoryBackend>) -> GlobalDirectory {
        GlobalDirectory {
            backend: Mutex::new(backend),
            subs: Broadcast::new(),
        }
    }

    /// Registers a registry under its name. When a different registry
    /// already occupies the name, the old one is torn down first. Returns
    /// false when the very registry is already registered.
    pub fn register(&self, name: &str, registry: Arc<UnitRegistry>) -> bool {
        let evicted = {
            let mut backend = self.backend.lock().expect("directory lock poisoned");
            match backend.get(name) {
                Some(old) if Arc::ptr_eq(&old, &registry) => return false,
                Some(_) => backend.remove(name),
                None => None,
            }
        };
        if let Some(old) = evicted {
            log::info!("registry '{}' replaced, tearing the old one down", name);
            old.teardown();
        }

        {
            let mut backend = self.backend.lock().expect("directory lock poisoned");
            if backend.insert(name.to_string(), registry).is_err() {
                return false;
            }
        }
        log::debug!("registry '{}' registered", name);
        self.subs.notify(&RegistryEvent::Registered(name.to_string()));
        true
    }

    /// Removes and tears down a registry: all of its units are destroyed in
    /// reverse declaration order.
    pub fn unregister(&self, name: &str) -> bool {
        let removed = self
            .backend
            .lock()
            .expect("directory lock poisoned")
            .remove(name);
        match removed {
            None => false,
            Some(registry) => {
                log::debug!("registry '{}' unregistered", name);
                self.subs
                    .notify(&RegistryEvent::Unregistered(name.to_string()));
                registry.teardown();
                true
            }
        }
    }

    pub fn find(&self, name: &str) -> Option<Arc<UnitRegistry>> {
        self.backend
            .lock()
            .expect("directory lock poisoned")
            .get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.backend.lock().expect("directory lock poisoned").names()
    }

    pub fn registries(&self) -> Vec<Arc<UnitRegistry>> {
        let backend = self.backend.lock().expect("directory lock poisoned");
        backend
            .names()
            .iter()
            .filter_map(|n| backend.get(n))
            .collect()
    }

    /// Swaps the backing map. Every entry is copied into the new backend
    /// first; when any copy fails, the old backend stays in place and the
    /// half-filled new one is discarded.
    pub fn swap_backend(&self, mut new: Box<dyn DirectoryBackend>) -> Result<()> {
        let mut backend = self.backend.lock().expect("directory lock poisoned");
        for name in backend.names() {
            let registry = match backend.get(&name) {
                None => continue,
                Some(v) => v,
            };
            new.insert(name, registry)?;
        }
        *backend = new;
        Ok(())
    }

    pub fn add_listener(&self, listener: Arc<dyn Subscriber<RegistryEvent>>) -> u64 {
        self.subs.add(listener)
    }

    pub fn remove_listener(&self, token: u64) -> Option<Arc<dyn Subscriber<RegistryEvent>>> {
        self.subs.remove(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{NopUnit, UnitEntry, UnitId, UnitState};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn register_find_unregister() {
        let dir = GlobalDirectory::new();
        let reg = UnitRegistry::new("r");
        assert!(dir.register("r", Arc::clone(&reg)));
        assert!(dir.find("r").is_some());
        assert!(!dir.register("r", reg)); // same registry again
        assert!(dir.unregister("r"));
        assert!(!dir.unregister("r"));
        assert!(dir.find("r").is_none());
    }

    #[test]
    fn replacing_tears_down_the_old_registry() {
        let dir = GlobalDirectory::new();
        let old = UnitRegistry::new("r");
        let unit = UnitEntry::new(UnitId::new("r", "a"), Box::new(NopUnit));
        old.insert_unit(Arc::clone(&unit));
        dir.register("r", Arc::clone(&old));

        let new = UnitRegistry::new("r");
        assert!(dir.register("r", Arc::clone(&new)));
        assert_eq!(unit.state(), UnitState::Destroyed);
        assert!(old.is_empty());
        assert!(Arc::ptr_eq(&dir.find("r").unwrap(), &new));
    }

    struct CountRegs {
        hits: AtomicUsize,
    }
    impl Subscriber<RegistryEvent> for CountRegs {
        fn filter(&self, event: &RegistryEvent) -> bool {
            matches!(event, RegistryEvent::Registered(_))
        }
        fn notify(&self, _event: &RegistryEvent) -> Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn listeners_see_registration() {
        let dir = GlobalDirectory::new();
        let sub = Arc::new(CountRegs {
            hits: AtomicUsize::new(0),
        });
        dir.add_listener(sub.clone());
        dir.register("a", UnitRegistry::new("a"));
        dir.unregister("a"); // filtered
        dir.register("b", UnitRegistry::new("b"));
        assert_eq!(sub.hits.load(Ordering::SeqCst), 2);
    }

    struct FailingBackend {
        inner: MemDirectory,
        capacity: usize,
    }
    impl DirectoryBackend for FailingBackend {
        fn insert(&mut self, name: String, registry: Arc<UnitRegistry>) -> Result<()> {
            if self.inner.names().len() >= self.capacity {
                return Err(Error::Other {
                    msg: "backend full".to_string(),
                });
            }
            self.inner.insert(name, registry)
        }
        fn remove(&mut self, name: &str) -> Option<Arc<UnitRegistry>> {
            self.inner.remove(name)
        }
        fn get(&self, name: &str) -> Option<Arc<UnitRegistry>> {
            self.inner.get(name)
        }
        fn names(&self) -> Vec<String> {
            self.inner.names()
        }
    }

    #[test]
    fn swap_copies_entries() {
        let dir = GlobalDirectory::new();
        dir.register("a", UnitRegistry::new("a"));
        dir.register("b", UnitRegistry::new("b"));
        dir.swap_backend(Box::new(MemDirectory::new())).unwrap();
        assert_eq!(dir.names(), vec!["a", "b"]);
    }

    #[test]
    fn failed_swap_leaves_old_backend_in_place() {
        let dir = GlobalDirectory::new();
        dir.register("a", UnitRegistry::new("a"));
        dir.register("b", UnitRegistry::new("b"));
        let cramped = FailingBackend {
            inner: MemDirectory::new(),
            capacity: 1,
        };
        assert!(dir.swap_backend(Box::new(cramped)).is_err());
        // both registries still resolvable through the old backend
        assert!(dir.find("a").is_some());
        assert!(dir.find("b").is_some());
    }
}
