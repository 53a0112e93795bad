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

use crate::unit::UnitId;
use bitflags::bitflags;

/**Unit states:
```graph LR
Destroyed -> Creating -> Created -> Starting -> Started
Started -> Stopping -> Stopped -> Destroying -> Destroyed
Creating/Starting/Stopping/Destroying -> Failed
```
`Destroyed` is both the initial and the terminal steady state; `Failed`
terminates the attempt that raised it.
*/
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash)]
pub enum UnitState {
    /// unit does not exist as an object; initial and terminal state
    Destroyed,
    /// create in progress
    Creating,
    /// unit object constructed, not running
    Created,
    /// start in progress
    Starting,
    /// unit is running
    Started,
    /// stop in progress
    Stopping,
    /// unit was running and has been stopped
    Stopped,
    /// destroy in progress
    Destroying,
    /// the last transition attempt raised an error
    Failed,
}

impl UnitState {
    /// One of the four transient phases set while a verb is executing.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            UnitState::Creating | UnitState::Starting | UnitState::Stopping | UnitState::Destroying
        )
    }

    ///
    pub fn is_settled(&self) -> bool {
        !self.is_in_progress()
    }

    /// Whether this state satisfies a dependency that requires `required`.
    /// `Created`-level is kept through the whole started/stopped span: a
    /// stopped dependency still exists, it is just not running.
    pub fn has_reached(&self, required: UnitState) -> bool {
        match required {
            UnitState::Created => matches!(
                self,
                UnitState::Created
                    | UnitState::Starting
                    | UnitState::Started
                    | UnitState::Stopping
                    | UnitState::Stopped
            ),
            UnitState::Started => matches!(self, UnitState::Started),
            _ => false,
        }
    }

    /// A dependent in one of these states keeps its dependency from stopping.
    pub fn blocks_stop(&self) -> bool {
        matches!(
            self,
            UnitState::Starting | UnitState::Started | UnitState::Stopping
        )
    }

    /// A dependent in one of these states keeps its dependency from being
    /// destroyed.
    pub fn blocks_destroy(&self) -> bool {
        !matches!(self, UnitState::Destroyed | UnitState::Failed)
    }

    ///
    pub fn is_down(&self) -> bool {
        matches!(self, UnitState::Destroyed | UnitState::Failed)
    }
}

impl std::fmt::Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitState::Destroyed => write!(f, "destroyed"),
            UnitState::Creating => write!(f, "creating"),
            UnitState::Created => write!(f, "created"),
            UnitState::Starting => write!(f, "starting"),
            UnitState::Started => write!(f, "started"),
            UnitState::Stopping => write!(f, "stopping"),
            UnitState::Stopped => write!(f, "stopped"),
            UnitState::Destroying => write!(f, "destroying"),
            UnitState::Failed => write!(f, "failed"),
        }
    }
}

bitflags! {
    /// extra context attached to a state-change notification
    pub struct UnitNotifyFlags: u8 {
        /// the default flags, it means nothing.
        const EMPTY = 0;
        /// the transition raised an error
        const FAILURE = 1 << 0;
        /// the stop was forced by a destroy
        const FORCED = 1 << 1;
    }
}

/// Payload broadcast on every state change of a unit.
#[derive(Clone, Debug)]
pub struct StateEvent {
    pub id: UnitId,
    pub old: UnitState,
    pub new: UnitState,
    pub flags: UnitNotifyFlags,
}
