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

//! Unit identity, the unit implementation contract, and the stateful entry
//! that drives the four-verb lifecycle template.

pub mod builder;
pub mod entry;
pub mod state;

pub use builder::{FactoryRegistry, ObjectBuilder, UnitFactory};
pub use entry::{StateBroadcaster, UnitEntry};
pub use state::{StateEvent, UnitNotifyFlags, UnitState};

use crate::error::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Process-unique unit identity: `(registry, name)`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    pub registry: String,
    pub name: String,
}

impl UnitId {
    pub fn new(registry: &str, name: &str) -> UnitId {
        UnitId {
            registry: registry.to_string(),
            name: name.to_string(),
        }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.registry, self.name)
    }
}

/// The body logic of a unit. Implementations provide the actual work behind
/// each verb; the engine and the entry own the ordering, guarding and state
/// bookkeeping around them.
pub trait UnitObj: Send + Sync {
    fn create(&self) -> Result<()> {
        Ok(())
    }

    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        Ok(())
    }
}

/// A unit with no body logic of its own, useful as a pure grouping node.
pub struct NopUnit;

impl UnitObj for NopUnit {}

/// Already-parsed declarative description of a unit. Configuration parsing
/// lives outside this crate; whatever format it comes from, it arrives here
/// as plain data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub registry: String,
    pub name: String,
    /// key into the factory registry that builds the implementation object
    #[serde(default)]
    pub factory: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// declared dependency edges, in declaration order
    #[serde(default)]
    pub requires: Vec<UnitId>,
}

impl UnitDescriptor {
    pub fn id(&self) -> UnitId {
        UnitId::new(&self.registry, &self.name)
    }
}
