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

//! The runtime context owns the process-wide collaborators: the global
//! directory, the object builder and the engine configuration. It is
//! constructed once at process start and passed down explicitly; there is
//! no hidden global state.

use crate::config::EngineConfig;
use crate::directory::GlobalDirectory;
use crate::unit::builder::{FactoryRegistry, ObjectBuilder};
use std::sync::Arc;

pub struct RunContext {
    directory: Arc<GlobalDirectory>,
    builder: Arc<dyn ObjectBuilder>,
    config: EngineConfig,
}

impl RunContext {
    pub fn new() -> Arc<RunContext> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Arc<RunContext> {
        Self::with_builder(config, Arc::new(FactoryRegistry::new()))
    }

    pub fn with_builder(config: EngineConfig, builder: Arc<dyn ObjectBuilder>) -> Arc<RunContext> {
        if config.LogTarget == "console" {
            crate::logger::init_log_to_console("svcmaster", config.log_level());
        }
        Arc::new(RunContext {
            directory: Arc::new(GlobalDirectory::new()),
            builder,
            config,
        })
    }

    pub fn directory(&self) -> &GlobalDirectory {
        &self.directory
    }

    pub fn builder(&self) -> &dyn ObjectBuilder {
        self.builder.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
