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

//! One-shot continuations for the three deferred-wait flavors: a registry
//! not yet in the directory, a unit not yet in its registry, and a unit not
//! yet in the required state. Each one removes its waiting cause when it
//! fires and re-enters the engine when that was the blocked unit's last
//! cause. They run on whatever thread triggered the satisfying change.

use super::Engine;
use crate::broadcast::Subscriber;
use crate::context::RunContext;
use crate::directory::RegistryEvent;
use crate::error::*;
use crate::registry::{RegistryOp, UnitRegistry};
use crate::unit::entry::UnitEntry;
use crate::unit::{StateEvent, UnitId, UnitState};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// What a state wait is waiting for.
#[derive(Clone, Copy, Debug)]
pub(super) enum StateCond {
    /// the dependency has come up far enough for the blocked unit to follow
    Reached(UnitState),
    /// the dependent has gone down far enough for the blocked unit to follow
    Released(UnitState),
}

impl StateCond {
    pub(super) fn ok(&self, state: UnitState) -> bool {
        match self {
            StateCond::Reached(required) => state.has_reached(*required),
            StateCond::Released(target) => match target {
                UnitState::Stopped => !state.blocks_stop(),
                UnitState::Destroyed => !state.blocks_destroy(),
                _ => false,
            },
        }
    }
}

fn resume(ctx: &Arc<RunContext>, blocked: &UnitId, cause: &str, target: UnitState) {
    let registry = match ctx.directory().find(&blocked.registry) {
        None => return,
        Some(v) => v,
    };
    if !registry.waiting().remove_cause(&blocked.name, cause) {
        // other causes are still pending, or someone else got here first
        return;
    }
    log::debug!("cause '{}' satisfied, resuming {} toward {}", cause, blocked, target);
    let engine = Engine::new(Arc::clone(ctx));
    let mut visited = HashSet::new();
    if let Err(e) = engine.request_transition(blocked, target, &mut visited) {
        log::warn!("deferred transition of {} failed: {}", blocked, e);
    }
}

pub(super) struct RegistryArrivalWait {
    pub(super) ctx: Weak<RunContext>,
    pub(super) blocked: UnitId,
    pub(super) cause: String,
    pub(super) registry_name: String,
    pub(super) target: UnitState,
    pub(super) token: OnceCell<u64>,
    pub(super) fired: AtomicBool,
}

impl Subscriber<RegistryEvent> for RegistryArrivalWait {
    fn filter(&self, event: &RegistryEvent) -> bool {
        matches!(event, RegistryEvent::Registered(name) if *name == self.registry_name)
    }

    fn notify(&self, _event: &RegistryEvent) -> Result<()> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let ctx = match self.ctx.upgrade() {
            None => return Ok(()),
            Some(v) => v,
        };
        if let Some(token) = self.token.get() {
            ctx.directory().remove_listener(*token);
        }
        resume(&ctx, &self.blocked, &self.cause, self.target);
        Ok(())
    }
}

pub(super) struct UnitArrivalWait {
    pub(super) ctx: Weak<RunContext>,
    pub(super) blocked: UnitId,
    pub(super) cause: String,
    pub(super) registry: Weak<UnitRegistry>,
    pub(super) unit_name: String,
    pub(super) target: UnitState,
    pub(super) token: OnceCell<u64>,
    pub(super) fired: AtomicBool,
}

impl Subscriber<RegistryOp> for UnitArrivalWait {
    fn filter(&self, event: &RegistryOp) -> bool {
        matches!(event, RegistryOp::UnitAdded(id) if id.name == self.unit_name)
    }

    fn notify(&self, _event: &RegistryOp) -> Result<()> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let (Some(registry), Some(token)) = (self.registry.upgrade(), self.token.get()) {
            registry.remove_listener(*token);
        }
        let ctx = match self.ctx.upgrade() {
            None => return Ok(()),
            Some(v) => v,
        };
        resume(&ctx, &self.blocked, &self.cause, self.target);
        Ok(())
    }
}

pub(super) struct StateWait {
    pub(super) ctx: Weak<RunContext>,
    pub(super) blocked: UnitId,
    pub(super) cause: String,
    pub(super) watched: Weak<UnitEntry>,
    pub(super) cond: StateCond,
    pub(super) target: UnitState,
    pub(super) token: OnceCell<u64>,
    pub(super) fired: AtomicBool,
}

impl Subscriber<StateEvent> for StateWait {
    fn filter(&self, event: &StateEvent) -> bool {
        self.cond.ok(event.new)
    }

    fn notify(&self, _event: &StateEvent) -> Result<()> {
        if self.fired.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let (Some(watched), Some(token)) = (self.watched.upgrade(), self.token.get()) {
            watched.remove_state_listener(*token);
        }
        let ctx = match self.ctx.upgrade() {
            None => return Ok(()),
            Some(v) => v,
        };
        resume(&ctx, &self.blocked, &self.cause, self.target);
        Ok(())
    }
}
