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

//! `UnitEntry` is the stateful entity behind one unit name: it runs the
//! four verbs through the common guard / pre-phase / body / post-phase
//! template and broadcasts every state change.
//!
//! Locking: the transition mutex serializes whole verbs on one unit; the
//! state mutex only guards the state word. Notifications are queued while
//! the verb runs and delivered after the transition lock is released, so a
//! listener may re-enter the engine from the notifying thread and take any
//! unit's locks without risking a lock cycle.

use super::builder::ObjectBuilder;
use super::state::{StateEvent, UnitNotifyFlags, UnitState};
use super::{UnitDescriptor, UnitId, UnitObj};
use crate::broadcast::{Broadcast, Subscriber};
use crate::error::*;
use crate::registry::UnitRegistry;
use std::sync::{Arc, Mutex, Weak};

/// The per-unit state-change channel, `(filter, notify)` subscribers keyed
/// by an opaque token.
pub type StateBroadcaster = Broadcast<StateEvent>;

pub struct UnitEntry {
    id: UnitId,
    me: Weak<UnitEntry>,
    state: Mutex<UnitState>,
    // serializes create/start/stop/destroy on this unit
    transition: Mutex<()>,
    broadcaster: StateBroadcaster,
    obj: Mutex<Option<Box<dyn UnitObj>>>,
    descriptor: Option<UnitDescriptor>,
    registry: Mutex<Weak<UnitRegistry>>,
}

impl std::fmt::Debug for UnitEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitEntry")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl UnitEntry {
    /// A unit with an explicit implementation object. The Object Builder is
    /// never consulted for it.
    pub fn new(id: UnitId, obj: Box<dyn UnitObj>) -> Arc<UnitEntry> {
        Self::build(id, Some(obj), None)
    }

    /// A unit built from declarative data; the implementation object is
    /// produced by the Object Builder during `create`.
    pub fn from_descriptor(descriptor: UnitDescriptor) -> Arc<UnitEntry> {
        Self::build(descriptor.id(), None, Some(descriptor))
    }

    fn build(
        id: UnitId,
        obj: Option<Box<dyn UnitObj>>,
        descriptor: Option<UnitDescriptor>,
    ) -> Arc<UnitEntry> {
        Arc::new_cyclic(|me| UnitEntry {
            id,
            me: me.clone(),
            state: Mutex::new(UnitState::Destroyed),
            transition: Mutex::new(()),
            broadcaster: StateBroadcaster::new(),
            obj: Mutex::new(obj),
            descriptor,
            registry: Mutex::new(Weak::new()),
        })
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn state(&self) -> UnitState {
        *self.state.lock().expect("state lock poisoned")
    }

    pub fn descriptor(&self) -> Option<&UnitDescriptor> {
        self.descriptor.as_ref()
    }

    pub fn add_state_listener(&self, listener: Arc<dyn Subscriber<StateEvent>>) -> u64 {
        self.broadcaster.add(listener)
    }

    pub fn remove_state_listener(&self, token: u64) -> Option<Arc<dyn Subscriber<StateEvent>>> {
        self.broadcaster.remove(token)
    }

    /// Called by the registry when the unit is inserted or removed.
    pub(crate) fn attach(&self, registry: Weak<UnitRegistry>) {
        *self.registry.lock().expect("registry ref lock poisoned") = registry;
    }

    pub(crate) fn detach(&self) {
        *self.registry.lock().expect("registry ref lock poisoned") = Weak::new();
    }

    pub fn registry(&self) -> Option<Arc<UnitRegistry>> {
        self.registry
            .lock()
            .expect("registry ref lock poisoned")
            .upgrade()
    }

    /// Records a state change. The state word is updated at once so
    /// concurrent readers see the new value, the notification is queued and
    /// delivered by the verb after it has released the transition lock.
    fn set_state(&self, new: UnitState, flags: UnitNotifyFlags, pending: &mut Vec<StateEvent>) {
        let old = {
            let mut state = self.state.lock().expect("state lock poisoned");
            let old = *state;
            *state = new;
            old
        };
        if old == new {
            return;
        }
        log::debug!("unit {} state {} -> {}", self.id, old, new);
        pending.push(StateEvent {
            id: self.id.clone(),
            old,
            new,
            flags,
        });
    }

    // no transition lock may be held here: listeners re-enter the engine
    // and take other units' locks from the notifying thread
    fn flush(&self, pending: Vec<StateEvent>) {
        for event in pending {
            self.broadcaster.notify(&event);
        }
    }

    /// `create`: guard, set `Creating`, build the implementation object if
    /// needed, run its body, settle at `Created`. Errors settle at `Failed`
    /// and propagate. The unit self-registers into its home registry once
    /// the transition lock is released.
    pub fn create(&self, builder: &dyn ObjectBuilder) -> Result<()> {
        let mut pending = Vec::new();
        let res = self.create_locked(builder, &mut pending);
        if !pending.is_empty() {
            self.register_self();
        }
        self.flush(pending);
        res
    }

    fn create_locked(
        &self,
        builder: &dyn ObjectBuilder,
        pending: &mut Vec<StateEvent>,
    ) -> Result<()> {
        let _t = self.transition.lock().expect("transition lock poisoned");

        match self.state() {
            UnitState::Destroyed | UnitState::Failed => {}
            other => {
                log::debug!("unit {} is already {}, create skipped", self.id, other);
                return Ok(());
            }
        }

        self.set_state(UnitState::Creating, UnitNotifyFlags::EMPTY, pending);

        match self.create_body(builder) {
            Ok(()) => {
                self.set_state(UnitState::Created, UnitNotifyFlags::EMPTY, pending);
                Ok(())
            }
            Err(e) => {
                self.set_state(UnitState::Failed, UnitNotifyFlags::FAILURE, pending);
                Err(Error::Activation {
                    unit: self.id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    fn register_self(&self) {
        let me = match self.me.upgrade() {
            None => return,
            Some(v) => v,
        };
        if let Some(registry) = self.registry() {
            if registry.get(&self.id.name).is_none() {
                registry.insert_unit(me);
            }
        }
    }

    fn create_body(&self, builder: &dyn ObjectBuilder) -> Result<()> {
        let mut obj = self.obj.lock().expect("obj lock poisoned");
        if obj.is_none() {
            if let Some(descriptor) = &self.descriptor {
                *obj = Some(builder.build(descriptor)?);
            }
        }
        match obj.as_ref() {
            Some(o) => o.create(),
            None => Ok(()), // pure grouping node
        }
    }

    /// `start`: only meaningful from `Created` or `Stopped`; from
    /// `Destroyed`/`Failed` it is an error, everything else is a silent
    /// skip. Errors settle at `Failed` and propagate.
    pub fn start(&self) -> Result<()> {
        let mut pending = Vec::new();
        let res = self.start_locked(&mut pending);
        self.flush(pending);
        res
    }

    fn start_locked(&self, pending: &mut Vec<StateEvent>) -> Result<()> {
        let _t = self.transition.lock().expect("transition lock poisoned");

        match self.state() {
            UnitState::Created | UnitState::Stopped => {}
            state @ (UnitState::Destroyed | UnitState::Failed) => {
                return Err(Error::IllegalLifecycleState {
                    unit: self.id.to_string(),
                    state: state.to_string(),
                    verb: "start".to_string(),
                });
            }
            other => {
                log::debug!("unit {} is already {}, start skipped", self.id, other);
                return Ok(());
            }
        }

        self.set_state(UnitState::Starting, UnitNotifyFlags::EMPTY, pending);

        let res = match self.obj.lock().expect("obj lock poisoned").as_ref() {
            Some(o) => o.start(),
            None => Ok(()),
        };
        match res {
            Ok(()) => {
                self.set_state(UnitState::Started, UnitNotifyFlags::EMPTY, pending);
                Ok(())
            }
            Err(e) => {
                self.set_state(UnitState::Failed, UnitNotifyFlags::FAILURE, pending);
                Err(Error::Activation {
                    unit: self.id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// `stop`: only meaningful from `Started`, everything else is a silent
    /// skip. The error is returned so the caller can record it, teardown is
    /// best-effort.
    pub fn stop(&self) -> Result<()> {
        let mut pending = Vec::new();
        let res = {
            let _t = self.transition.lock().expect("transition lock poisoned");

            if self.state() != UnitState::Started {
                log::debug!("unit {} is not started, stop skipped", self.id);
                Ok(())
            } else {
                self.stop_locked(UnitNotifyFlags::EMPTY, &mut pending)
            }
        };
        self.flush(pending);
        res
    }

    // caller holds the transition lock
    fn stop_locked(&self, flags: UnitNotifyFlags, pending: &mut Vec<StateEvent>) -> Result<()> {
        self.set_state(UnitState::Stopping, flags, pending);

        let res = match self.obj.lock().expect("obj lock poisoned").as_ref() {
            Some(o) => o.stop(),
            None => Ok(()),
        };
        match res {
            Ok(()) => {
                self.set_state(UnitState::Stopped, flags, pending);
                Ok(())
            }
            Err(e) => {
                self.set_state(UnitState::Failed, flags | UnitNotifyFlags::FAILURE, pending);
                Err(Error::Deactivation {
                    unit: self.id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// `destroy`: forces a stop when still started, drops the
    /// implementation object and settles at `Destroyed`. The unit is
    /// unregistered from its home registry after the transition lock is
    /// released; its back-reference to that registry survives, so a later
    /// `create` registers it again. The first error met is returned after
    /// the teardown has gone as far as it can.
    pub fn destroy(&self) -> Result<()> {
        let mut pending = Vec::new();
        let res = self.destroy_locked(&mut pending);
        if !pending.is_empty() {
            if let Some(registry) = self.registry() {
                registry.remove_unit(&self.id.name);
            }
        }
        self.flush(pending);
        res
    }

    fn destroy_locked(&self, pending: &mut Vec<StateEvent>) -> Result<()> {
        let _t = self.transition.lock().expect("transition lock poisoned");

        if matches!(self.state(), UnitState::Destroyed) {
            log::debug!("unit {} is already destroyed, destroy skipped", self.id);
            return Ok(());
        }

        let mut first_err = None;
        if self.state() == UnitState::Started {
            if let Err(e) = self.stop_locked(UnitNotifyFlags::FORCED, pending) {
                log::warn!("forced stop of {} failed, destroying anyway: {}", self.id, e);
                first_err = Some(e);
            }
        }

        self.set_state(UnitState::Destroying, UnitNotifyFlags::EMPTY, pending);

        let res = {
            let mut obj = self.obj.lock().expect("obj lock poisoned");
            let res = match obj.as_ref() {
                Some(o) => o.destroy(),
                None => Ok(()),
            };
            // the object is dropped even when its destroy body failed; a
            // later create rebuilds it from the descriptor
            if self.descriptor.is_some() {
                *obj = None;
            }
            res
        };
        match res {
            Ok(()) => {
                self.set_state(UnitState::Destroyed, UnitNotifyFlags::EMPTY, pending);
                match first_err {
                    None => Ok(()),
                    Some(e) => Err(e),
                }
            }
            Err(e) => {
                self.set_state(UnitState::Failed, UnitNotifyFlags::FAILURE, pending);
                Err(Error::Deactivation {
                    unit: self.id.to_string(),
                    source: Box::new(e),
                })
            }
        }
    }
}
