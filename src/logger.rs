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

//! Console logger behind the `log` facade. The level can be changed after
//! installation; the logger itself is installed at most once per process.

use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicU8, Ordering};

static LOG_LEVEL: AtomicU8 = AtomicU8::new(3);
static LOGGER: OnceCell<()> = OnceCell::new();

fn level_to_u8(level: Level) -> u8 {
    match level {
        Level::Error => 1,
        Level::Warn => 2,
        Level::Info => 3,
        Level::Debug => 4,
        Level::Trace => 5,
    }
}

/// Change the maximum level of the installed logger.
pub fn set_log_level(level: Level) {
    LOG_LEVEL.store(level_to_u8(level), Ordering::SeqCst);
}

struct ConsoleLogger {
    name: String,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        level_to_u8(metadata.level()) <= LOG_LEVEL.load(Ordering::SeqCst)
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let module_path = record.module_path().unwrap_or("unknown");
        println!(
            "{} {} {}: {}",
            self.name,
            record.level(),
            module_path,
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Initialize the console logger. Repeated calls only adjust the level.
pub fn init_log_to_console(name: &str, level: Level) {
    set_log_level(level);
    let name = name.to_string();
    LOGGER.get_or_init(move || {
        // set_boxed_logger fails if a logger is already installed (for
        // example by the embedding application), which is fine.
        let _ = log::set_boxed_logger(Box::new(ConsoleLogger { name }));
        log::set_max_level(LevelFilter::Trace);
    });
}
