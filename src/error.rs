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

//! Unified error definition for the whole crate. The engine, the unit state
//! machine and the registries share one Error in terms of logic and
//! functionality to avoid frequent conversions.

use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::sync::Arc;

/// svcmaster Error: errors inherited from underlying crates (io, confique)
/// plus the error codes unique to lifecycle orchestration.
#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("cannot {} unit '{}' from state '{}'", verb, unit, state))]
    IllegalLifecycleState {
        unit: String,
        state: String,
        verb: String,
    },

    #[snafu(display(
        "dependency cycle: '{}' and '{}' depend on each other",
        source_unit,
        target_unit
    ))]
    DependencyCycle {
        source_unit: String,
        target_unit: String,
    },

    #[snafu(display("activation of unit '{}' failed: {}", unit, source))]
    Activation {
        unit: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[snafu(display("deactivation of unit '{}' failed: {}", unit, source))]
    Deactivation {
        unit: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[snafu(display("unit not found: '{}/{}'", registry, unit))]
    UnitNotFound { registry: String, unit: String },

    #[snafu(display("registry not found: '{}'", name))]
    RegistryNotFound { name: String },

    #[snafu(display("no factory registered for '{}'", factory))]
    FactoryNotFound { factory: String },

    #[snafu(display("Confique error"))]
    Confique { source: confique::Error },

    #[snafu(display("IoError(svcmaster)"))]
    Io { source: std::io::Error },

    #[snafu(display("OtherError(svcmaster): '{}'.", msg))]
    Other { msg: String },

    #[snafu(display("Shared"))]
    Shared { source: Arc<Error> },
}

#[allow(unused_macros)]
macro_rules! errfrom {
    ($($st:ty),* => $variant:ident) => (
        $(
            impl From<$st> for Error {
                fn from(e: $st) -> Error {
                    Error::$variant { source: e.into() }
                }
            }
        )*
    )
}

errfrom!(std::io::Error => Io);
errfrom!(confique::Error => Confique);

impl From<String> for Error {
    fn from(msg: String) -> Error {
        Error::Other { msg }
    }
}

impl From<Arc<Error>> for Error {
    fn from(source: Arc<Error>) -> Error {
        Error::Shared { source }
    }
}

/// new Result
pub type Result<T, E = Error> = std::result::Result<T, E>;
