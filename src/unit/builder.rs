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

//! Object Builder collaborator: turns a declarative unit description into
//! the concrete implementation object. The engine only calls it in the
//! `create` body phase and treats any error as a create failure.

use super::{NopUnit, UnitDescriptor, UnitObj};
use crate::error::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub trait ObjectBuilder: Send + Sync {
    fn build(&self, descriptor: &UnitDescriptor) -> Result<Box<dyn UnitObj>>;
}

/// Builds one kind of unit object from its descriptor properties.
pub trait UnitFactory: Send + Sync {
    fn create(&self, descriptor: &UnitDescriptor) -> Result<Box<dyn UnitObj>>;
}

/// Default Object Builder: a name-keyed registry of factories. An empty
/// factory name and "nop" resolve to the no-op unit.
pub struct FactoryRegistry {
    factories: Mutex<HashMap<String, Arc<dyn UnitFactory>>>,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        FactoryRegistry::new()
    }
}

impl FactoryRegistry {
    pub fn new() -> FactoryRegistry {
        FactoryRegistry {
            factories: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&self, name: &str, factory: Arc<dyn UnitFactory>) -> Option<Arc<dyn UnitFactory>> {
        self.factories
            .lock()
            .expect("factory lock poisoned")
            .insert(name.to_string(), factory)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn UnitFactory>> {
        self.factories
            .lock()
            .expect("factory lock poisoned")
            .remove(name)
    }
}

impl ObjectBuilder for FactoryRegistry {
    fn build(&self, descriptor: &UnitDescriptor) -> Result<Box<dyn UnitObj>> {
        if descriptor.factory.is_empty() || descriptor.factory == "nop" {
            return Ok(Box::new(NopUnit));
        }
        let factory = self
            .factories
            .lock()
            .expect("factory lock poisoned")
            .get(&descriptor.factory)
            .map(Arc::clone);
        match factory {
            Some(f) => f.create(descriptor),
            None => Err(Error::FactoryNotFound {
                factory: descriptor.factory.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::UnitId;

    struct Echo;
    struct EchoUnit {
        _tag: String,
    }
    impl UnitObj for EchoUnit {}
    impl UnitFactory for Echo {
        fn create(&self, descriptor: &UnitDescriptor) -> Result<Box<dyn UnitObj>> {
            let tag = descriptor
                .properties
                .get("tag")
                .cloned()
                .unwrap_or_default();
            Ok(Box::new(EchoUnit { _tag: tag }))
        }
    }

    fn descriptor(factory: &str) -> UnitDescriptor {
        UnitDescriptor {
            registry: "r".to_string(),
            name: "u".to_string(),
            factory: factory.to_string(),
            properties: HashMap::new(),
            requires: vec![UnitId::new("r", "dep")],
        }
    }

    #[test]
    fn build_known_factory() {
        let reg = FactoryRegistry::new();
        reg.register("echo", Arc::new(Echo));
        assert!(reg.build(&descriptor("echo")).is_ok());
    }

    #[test]
    fn build_unknown_factory_fails() {
        let reg = FactoryRegistry::new();
        assert!(matches!(
            reg.build(&descriptor("missing")),
            Err(Error::FactoryNotFound { .. })
        ));
    }

    #[test]
    fn empty_factory_is_nop() {
        let reg = FactoryRegistry::new();
        assert!(reg.build(&descriptor("")).is_ok());
        assert!(reg.build(&descriptor("nop")).is_ok());
    }
}
