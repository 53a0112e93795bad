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

//! svcmaster: in-process, dependency-ordered unit lifecycle orchestration.
//!
//! Units live in named registries, registries live in a global directory,
//! and the [`engine::Engine`] drives `create/start/stop/destroy` verbs
//! across the declared dependency graph: dependencies come up before their
//! dependents, dependents go down before their dependencies, and anything
//! that cannot proceed yet parks a continuation and resumes on its own when
//! the blocker resolves.

pub mod broadcast;
pub mod config;
pub mod context;
pub mod deps;
pub mod directory;
pub mod engine;
pub mod error;
pub mod logger;
pub mod registry;
pub mod unit;

pub use config::EngineConfig;
pub use context::RunContext;
pub use engine::{Engine, Progress};
pub use error::{Error, Result};
pub use unit::{UnitDescriptor, UnitId, UnitObj, UnitState};
