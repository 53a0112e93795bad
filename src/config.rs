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
//
#![allow(non_snake_case)]

use confique::{Config, FileFormat, Partial};

pub const SYSTEM_CONFIG: &str = "/etc/svcmaster/system.conf";

/// Engine configuration, resolved environment -> file -> built-in defaults.
#[derive(Config, Debug)]
pub struct EngineConfig {
    #[config(default = "info")]
    pub LogLevel: String,
    #[config(default = "console")]
    pub LogTarget: String,

    /// Check every dependency edge for a declared cycle before acting on it.
    #[config(default = true)]
    pub StrictCycleCheck: bool,
}

impl EngineConfig {
    pub fn new(file: Option<&str>) -> EngineConfig {
        type ConfigPartial = <EngineConfig as Config>::Partial;
        let mut partial: ConfigPartial = match Partial::from_env() {
            Err(_) => return EngineConfig::default(),
            Ok(v) => v,
        };
        partial = match confique::File::with_format(file.unwrap_or(SYSTEM_CONFIG), FileFormat::Toml)
            .load()
        {
            Err(_) => return EngineConfig::default(),
            Ok(v) => partial.with_fallback(v),
        };
        partial = partial.with_fallback(ConfigPartial::default_values());
        match EngineConfig::from_partial(partial) {
            Ok(v) => v,
            Err(_) => EngineConfig::default(),
        }
    }

    /// Parsed `LogLevel`; unknown values fall back to `Info`.
    pub fn log_level(&self) -> log::Level {
        match self.LogLevel.to_lowercase().as_str() {
            "error" => log::Level::Error,
            "warn" => log::Level::Warn,
            "debug" => log::Level::Debug,
            "trace" => log::Level::Trace,
            _ => log::Level::Info,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            LogLevel: "info".to_string(),
            LogTarget: "console".to_string(),
            StrictCycleCheck: true,
        }
    }
}
