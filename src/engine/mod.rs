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

//! The orchestration engine: dependency-ordered unit transitions.
//!
//! A transition request first resolves the unit's dependency edges (for
//! activation) or its dependents (for deactivation). Anything unresolvable
//! right now records a waiting cause and, except for declared cycles, parks
//! a one-shot continuation on the thing being waited for. When the last
//! cause of a blocked unit drains, the continuation re-enters the engine
//! and the transition runs to completion.

mod wait;

use crate::context::RunContext;
use crate::deps::{dependents_over, is_depends, DependencySource};
use crate::error::*;
use crate::registry::{ConvergeReport, UnitRegistry};
use crate::unit::entry::UnitEntry;
use crate::unit::{UnitId, UnitState};
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use wait::{RegistryArrivalWait, StateCond, StateWait, UnitArrivalWait};

/// What a single transition request accomplished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Progress {
    /// the verb ran
    Done,
    /// blocked on at least one waiting cause, will resume on its own
    Deferred,
    /// nothing to do: already there, already visited, or mid-transition
    Skipped,
}

#[derive(Clone)]
pub struct Engine {
    ctx: Arc<RunContext>,
}

impl Engine {
    pub fn new(ctx: Arc<RunContext>) -> Engine {
        Engine { ctx }
    }

    pub fn context(&self) -> &Arc<RunContext> {
        &self.ctx
    }

    pub fn create_unit(&self, id: &UnitId) -> Result<()> {
        self.request(id, UnitState::Created)
    }

    pub fn start_unit(&self, id: &UnitId) -> Result<()> {
        self.request(id, UnitState::Started)
    }

    pub fn stop_unit(&self, id: &UnitId) -> Result<()> {
        self.request(id, UnitState::Stopped)
    }

    pub fn destroy_unit(&self, id: &UnitId) -> Result<()> {
        self.request(id, UnitState::Destroyed)
    }

    fn request(&self, id: &UnitId, target: UnitState) -> Result<()> {
        let mut visited = HashSet::new();
        self.request_transition(id, target, &mut visited).map(|_| ())
    }

    /// Drive every unit of a registry toward `target`, in declared order for
    /// activation and reverse declared order for deactivation. One unit's
    /// failure never stops the sweep; errors land in the failure ledger.
    pub fn bulk(&self, registry_name: &str, target: UnitState) -> Result<()> {
        let registry = match self.ctx.directory().find(registry_name) {
            Some(v) => v,
            None => {
                return Err(Error::RegistryNotFound {
                    name: registry_name.to_string(),
                })
            }
        };
        let mut names = registry.unit_names();
        if matches!(target, UnitState::Stopped | UnitState::Destroyed) {
            names.reverse();
        }
        let mut visited = HashSet::new();
        for name in names {
            let id = UnitId::new(registry_name, &name);
            match self.request_transition(&id, target, &mut visited) {
                Ok(_) => {}
                Err(e) => log::warn!("bulk {} of {}: {}", target, id, e),
            }
        }
        Ok(())
    }

    /// One dependency-ordered transition. `visited` bounds the recursion: a
    /// unit is looked at once per request, so even an undeclared cycle
    /// terminates. Activation errors are recorded and returned; stop and
    /// destroy errors are recorded and swallowed.
    pub fn request_transition(
        &self,
        id: &UnitId,
        target: UnitState,
        visited: &mut HashSet<UnitId>,
    ) -> Result<Progress> {
        if !visited.insert(id.clone()) {
            return Ok(Progress::Skipped);
        }
        let deactivating = match target {
            UnitState::Created | UnitState::Started => false,
            UnitState::Stopped | UnitState::Destroyed => true,
            other => {
                return Err(Error::Other {
                    msg: format!("{} is not a requestable target state", other),
                })
            }
        };
        let registry = match self.ctx.directory().find(&id.registry) {
            Some(v) => v,
            None if deactivating => return Ok(Progress::Skipped),
            None => {
                return Err(Error::RegistryNotFound {
                    name: id.registry.clone(),
                })
            }
        };
        let unit = match registry.get(&id.name) {
            Some(v) => v,
            None if deactivating => return Ok(Progress::Skipped),
            None => {
                return Err(Error::UnitNotFound {
                    registry: id.registry.clone(),
                    unit: id.name.clone(),
                })
            }
        };
        // a verb is running right now, possibly on this very call stack
        if unit.state().is_in_progress() {
            return Ok(Progress::Skipped);
        }
        if deactivating {
            self.deactivate(&registry, &unit, target, visited)
        } else {
            self.activate(&registry, &unit, target, visited)
        }
    }

    fn activate(
        &self,
        registry: &Arc<UnitRegistry>,
        unit: &Arc<UnitEntry>,
        target: UnitState,
        visited: &mut HashSet<UnitId>,
    ) -> Result<Progress> {
        let id = unit.id().clone();
        if unit.state().has_reached(target) {
            return Ok(Progress::Skipped);
        }
        let mut deferred = false;
        for dep in registry.edges(&id) {
            if !self.activation_edge_ready(registry, &id, &dep, target, visited)? {
                deferred = true;
            }
        }
        if deferred {
            log::debug!("{} deferred toward {}", id, target);
            return Ok(Progress::Deferred);
        }
        let result = match target {
            UnitState::Created => unit.create(self.ctx.builder()),
            // going up drives the full ladder: a unit not yet created is
            // created first, then started
            _ => {
                let created = if unit.state().is_down() {
                    unit.create(self.ctx.builder())
                } else {
                    Ok(())
                };
                created.and_then(|_| unit.start())
            }
        };
        match result {
            Ok(()) => {
                // a fresh success supersedes stale waiting causes (cycle
                // edges since removed) and any failure from an earlier try
                registry.waiting().clear_unit(&id.name);
                registry.failures().clear(&id.name);
                Ok(Progress::Done)
            }
            Err(e) => {
                let shared = Arc::new(e);
                registry.failures().record(&id.name, Arc::clone(&shared));
                Err(Error::Shared { source: shared })
            }
        }
    }

    /// Resolve one `id -> dep` edge for activation. Returns `Ok(true)` when
    /// the dependency already satisfies `target`'s level, `Ok(false)` after
    /// recording a waiting cause (and, unless the edge closes a cycle,
    /// parking a continuation).
    fn activation_edge_ready(
        &self,
        registry: &Arc<UnitRegistry>,
        id: &UnitId,
        dep: &UnitId,
        target: UnitState,
        visited: &mut HashSet<UnitId>,
    ) -> Result<bool> {
        let dep_registry = if dep.registry == id.registry {
            Arc::clone(registry)
        } else {
            match self.ctx.directory().find(&dep.registry) {
                Some(v) => v,
                None => {
                    if self.wait_for_registry(registry, id, &dep.registry, target) {
                        // arrived between lookup and listener registration
                        return self.activation_edge_ready(registry, id, dep, target, visited);
                    }
                    return Ok(false);
                }
            }
        };
        let dep_unit = match dep_registry.get(&dep.name) {
            Some(v) => v,
            None => {
                if self.wait_for_unit(registry, id, &dep_registry, dep, target) {
                    return self.activation_edge_ready(registry, id, dep, target, visited);
                }
                return Ok(false);
            }
        };
        if dep_unit.state().has_reached(target) {
            return Ok(true);
        }
        if self.ctx.config().StrictCycleCheck && is_depends(&self.all_sources(), dep, id) {
            log::warn!("dependency cycle between {} and {}, {} stays blocked", id, dep, id);
            registry.waiting().add_cause(&id.name, &format!("{} (cycle)", dep));
            return Ok(false);
        }
        if dep.registry == id.registry {
            if let Progress::Done = self.request_transition(dep, target, visited)? {
                if dep_unit.state().has_reached(target) {
                    return Ok(true);
                }
            }
        }
        // cross-registry edges are never traversed, only observed
        if self.wait_for_state(registry, id, &dep_unit, StateCond::Reached(target), target) {
            return Ok(true);
        }
        Ok(false)
    }

    fn deactivate(
        &self,
        registry: &Arc<UnitRegistry>,
        unit: &Arc<UnitEntry>,
        target: UnitState,
        visited: &mut HashSet<UnitId>,
    ) -> Result<Progress> {
        let id = unit.id().clone();
        let state = unit.state();
        match target {
            UnitState::Stopped if state != UnitState::Started => return Ok(Progress::Skipped),
            UnitState::Destroyed if state == UnitState::Destroyed => {
                // never created, or already torn down: unregister anyway so
                // stale waiting causes and failures drain with it
                registry.remove_unit(&id.name);
                return Ok(Progress::Skipped);
            }
            _ => {}
        }
        let sources = self.all_sources();
        let mut deferred = false;
        for dependent in dependents_over(&sources, &id) {
            if !self.deactivation_edge_ready(registry, &id, &dependent, target, visited)? {
                deferred = true;
            }
        }
        if deferred {
            log::debug!("{} deferred toward {}", id, target);
            return Ok(Progress::Deferred);
        }
        let result = match target {
            UnitState::Stopped => unit.stop(),
            _ => unit.destroy(),
        };
        match result {
            Ok(()) => {
                registry.waiting().clear_unit(&id.name);
                Ok(Progress::Done)
            }
            Err(e) => {
                log::warn!("{} failed going down: {}", id, e);
                registry.failures().record(&id.name, Arc::new(e));
                Ok(Progress::Done)
            }
        }
    }

    /// Mirror of [`Self::activation_edge_ready`] over a `dependent -> id`
    /// edge: the dependent must have released `id` before `id` may go down.
    fn deactivation_edge_ready(
        &self,
        registry: &Arc<UnitRegistry>,
        id: &UnitId,
        dependent: &UnitId,
        target: UnitState,
        visited: &mut HashSet<UnitId>,
    ) -> Result<bool> {
        let dep_registry = if dependent.registry == id.registry {
            Arc::clone(registry)
        } else {
            match self.ctx.directory().find(&dependent.registry) {
                Some(v) => v,
                // a vanished dependent holds nothing back
                None => return Ok(true),
            }
        };
        let dep_unit = match dep_registry.get(&dependent.name) {
            Some(v) => v,
            None => return Ok(true),
        };
        let cond = StateCond::Released(target);
        if cond.ok(dep_unit.state()) {
            return Ok(true);
        }
        if self.ctx.config().StrictCycleCheck && is_depends(&self.all_sources(), id, dependent) {
            log::warn!(
                "dependency cycle between {} and {}, {} stays blocked",
                id,
                dependent,
                id
            );
            registry
                .waiting()
                .add_cause(&id.name, &format!("{} (cycle)", dependent));
            return Ok(false);
        }
        if dependent.registry == id.registry {
            if let Progress::Done = self.request_transition(dependent, target, visited)? {
                if cond.ok(dep_unit.state()) {
                    return Ok(true);
                }
            }
        }
        if self.wait_for_state(registry, id, &dep_unit, cond, target) {
            return Ok(true);
        }
        Ok(false)
    }

    /// Record a cause and park a continuation on the directory until the
    /// named registry shows up. Returns true when the registry arrived
    /// before the listener was in place, with cause and listener undone.
    fn wait_for_registry(
        &self,
        registry: &Arc<UnitRegistry>,
        id: &UnitId,
        wanted: &str,
        target: UnitState,
    ) -> bool {
        if !registry.waiting().add_cause(&id.name, wanted) {
            return false;
        }
        let wait = Arc::new(RegistryArrivalWait {
            ctx: Arc::downgrade(&self.ctx),
            blocked: id.clone(),
            cause: wanted.to_string(),
            registry_name: wanted.to_string(),
            target,
            token: OnceCell::new(),
            fired: AtomicBool::new(false),
        });
        let token = self.ctx.directory().add_listener(wait.clone());
        let _ = wait.token.set(token);
        if self.ctx.directory().find(wanted).is_some()
            && !wait.fired.swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            self.ctx.directory().remove_listener(token);
            registry.waiting().remove_cause(&id.name, wanted);
            return true;
        }
        false
    }

    /// Same, for a unit missing from an already-present registry.
    fn wait_for_unit(
        &self,
        registry: &Arc<UnitRegistry>,
        id: &UnitId,
        dep_registry: &Arc<UnitRegistry>,
        dep: &UnitId,
        target: UnitState,
    ) -> bool {
        let cause = dep.to_string();
        if !registry.waiting().add_cause(&id.name, &cause) {
            return false;
        }
        let wait = Arc::new(UnitArrivalWait {
            ctx: Arc::downgrade(&self.ctx),
            blocked: id.clone(),
            cause: cause.clone(),
            registry: Arc::downgrade(dep_registry),
            unit_name: dep.name.clone(),
            target,
            token: OnceCell::new(),
            fired: AtomicBool::new(false),
        });
        let token = dep_registry.add_listener(wait.clone());
        let _ = wait.token.set(token);
        if dep_registry.get(&dep.name).is_some()
            && !wait.fired.swap(true, std::sync::atomic::Ordering::SeqCst)
        {
            dep_registry.remove_listener(token);
            registry.waiting().remove_cause(&id.name, &cause);
            return true;
        }
        false
    }

    /// Same, for a present unit that has not reached (or released) the
    /// needed state yet.
    fn wait_for_state(
        &self,
        registry: &Arc<UnitRegistry>,
        id: &UnitId,
        watched: &Arc<UnitEntry>,
        cond: StateCond,
        target: UnitState,
    ) -> bool {
        let cause = watched.id().to_string();
        if !registry.waiting().add_cause(&id.name, &cause) {
            return false;
        }
        let wait = Arc::new(StateWait {
            ctx: Arc::downgrade(&self.ctx),
            blocked: id.clone(),
            cause: cause.clone(),
            watched: Arc::downgrade(watched),
            cond,
            target,
            token: OnceCell::new(),
            fired: AtomicBool::new(false),
        });
        let token = watched.add_state_listener(wait.clone());
        let _ = wait.token.set(token);
        if cond.ok(watched.state()) && !wait.fired.swap(true, std::sync::atomic::Ordering::SeqCst) {
            watched.remove_state_listener(token);
            registry.waiting().remove_cause(&id.name, &cause);
            return true;
        }
        false
    }

    fn all_sources(&self) -> Vec<Arc<dyn DependencySource>> {
        self.ctx
            .directory()
            .registries()
            .iter()
            .flat_map(|r| r.loaders())
            .collect()
    }

    /// Check whether any declared edge of `id` leads back to `id`.
    pub fn verify_acyclic(&self, id: &UnitId) -> Result<()> {
        let registry = match self.ctx.directory().find(&id.registry) {
            Some(v) => v,
            None => {
                return Err(Error::RegistryNotFound {
                    name: id.registry.clone(),
                })
            }
        };
        let sources = self.all_sources();
        for dep in registry.edges(id) {
            if dep == *id || is_depends(&sources, &dep, id) {
                return Err(Error::DependencyCycle {
                    source_unit: id.to_string(),
                    target_unit: dep.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Snapshot of everything still blocked or failed, across the whole
    /// directory.
    pub fn converge_check(&self) -> ConvergeReport {
        let mut report = ConvergeReport::default();
        for registry in self.ctx.directory().registries() {
            collect_into(&registry, &mut report);
        }
        report
    }

    pub fn converge_check_registry(&self, name: &str) -> Result<ConvergeReport> {
        let registry = match self.ctx.directory().find(name) {
            Some(v) => v,
            None => {
                return Err(Error::RegistryNotFound {
                    name: name.to_string(),
                })
            }
        };
        let mut report = ConvergeReport::default();
        collect_into(&registry, &mut report);
        Ok(report)
    }
}

fn collect_into(registry: &Arc<UnitRegistry>, report: &mut ConvergeReport) {
    for (unit, causes) in registry.waiting().snapshot() {
        report
            .blocked
            .push((UnitId::new(registry.name(), &unit), causes));
    }
    for (unit, error) in registry.failures().snapshot() {
        report
            .failed
            .push((UnitId::new(registry.name(), &unit), error.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deps::DepTable;
    use crate::unit::{NopUnit, UnitObj};

    fn ctx_with_registry(name: &str) -> (Arc<RunContext>, Arc<UnitRegistry>, Arc<DepTable>) {
        let ctx = RunContext::new();
        let registry = UnitRegistry::new(name);
        let deps = Arc::new(DepTable::new());
        registry.add_loader(Arc::clone(&deps) as Arc<dyn DependencySource>);
        assert!(ctx.directory().register(name, Arc::clone(&registry)));
        (ctx, registry, deps)
    }

    fn add_nop(registry: &Arc<UnitRegistry>, name: &str) -> Arc<UnitEntry> {
        let id = UnitId::new(registry.name(), name);
        let unit = UnitEntry::new(id, Box::new(NopUnit));
        registry.insert_unit(Arc::clone(&unit));
        unit
    }

    #[test]
    fn create_then_start_round_trip() {
        let (ctx, registry, _deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let unit = add_nop(&registry, "svc");
        let id = unit.id().clone();

        engine.create_unit(&id).unwrap();
        assert_eq!(unit.state(), UnitState::Created);
        engine.start_unit(&id).unwrap();
        assert_eq!(unit.state(), UnitState::Started);
        engine.stop_unit(&id).unwrap();
        assert_eq!(unit.state(), UnitState::Stopped);
        engine.destroy_unit(&id).unwrap();
        assert_eq!(unit.state(), UnitState::Destroyed);
        assert!(registry.get("svc").is_none());
    }

    #[test]
    fn start_orders_dependency_first() {
        let (ctx, registry, deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let a = add_nop(&registry, "a");
        let b = add_nop(&registry, "b");
        deps.add_edge(a.id().clone(), b.id().clone());

        engine.create_unit(a.id()).unwrap();
        engine.create_unit(b.id()).unwrap();
        engine.start_unit(a.id()).unwrap();
        assert_eq!(a.state(), UnitState::Started);
        assert_eq!(b.state(), UnitState::Started);
        assert!(registry.waiting().is_empty());
    }

    #[test]
    fn missing_dependency_defers() {
        let (ctx, registry, deps) = ctx_with_registry("app");
        let engine = Engine::new(Arc::clone(&ctx));
        let a = add_nop(&registry, "a");
        deps.add_edge(a.id().clone(), UnitId::new("app", "b"));

        engine.create_unit(a.id()).unwrap();
        let mut visited = HashSet::new();
        let progress = engine
            .request_transition(a.id(), UnitState::Started, &mut visited)
            .unwrap();
        assert_eq!(progress, Progress::Deferred);
        assert_eq!(registry.waiting().causes("a"), vec!["app/b".to_string()]);
        assert_eq!(a.state(), UnitState::Created);

        // registering b fires the continuation, which brings b all the way
        // up and then drags a after it
        let b = add_nop(&registry, "b");
        assert_eq!(b.state(), UnitState::Started);
        assert_eq!(a.state(), UnitState::Started);
        assert!(registry.waiting().is_empty());
    }

    #[test]
    fn declared_cycle_blocks_without_hanging() {
        let (ctx, registry, deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let a = add_nop(&registry, "a");
        let b = add_nop(&registry, "b");
        deps.add_edge(a.id().clone(), b.id().clone());
        deps.add_edge(b.id().clone(), a.id().clone());

        assert!(engine.verify_acyclic(a.id()).is_err());
        assert!(engine.verify_acyclic(b.id()).is_err());

        // neither create can proceed along the cyclic path, both block
        engine.create_unit(a.id()).unwrap();
        engine.create_unit(b.id()).unwrap();
        assert_eq!(a.state(), UnitState::Destroyed);
        assert_eq!(b.state(), UnitState::Destroyed);
        assert_eq!(
            registry.waiting().causes("a"),
            vec!["app/b (cycle)".to_string()]
        );
        assert_eq!(
            registry.waiting().causes("b"),
            vec!["app/a (cycle)".to_string()]
        );

        let mut visited = HashSet::new();
        let progress = engine
            .request_transition(a.id(), UnitState::Started, &mut visited)
            .unwrap();
        assert_eq!(progress, Progress::Deferred);
        let report = engine.converge_check();
        assert_eq!(report.blocked.len(), 2);
    }

    #[test]
    fn start_drives_through_create() {
        let (ctx, registry, _deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let unit = add_nop(&registry, "svc");
        assert_eq!(unit.state(), UnitState::Destroyed);

        engine.start_unit(unit.id()).unwrap();
        assert_eq!(unit.state(), UnitState::Started);
        // and again, now a no-op
        engine.start_unit(unit.id()).unwrap();
        assert_eq!(unit.state(), UnitState::Started);
    }

    #[test]
    fn stop_waits_for_dependents() {
        let (ctx, registry, deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let a = add_nop(&registry, "a");
        let b = add_nop(&registry, "b");
        deps.add_edge(a.id().clone(), b.id().clone());
        engine.create_unit(a.id()).unwrap();
        engine.create_unit(b.id()).unwrap();
        engine.start_unit(a.id()).unwrap();

        // stopping b pulls a down first
        engine.stop_unit(b.id()).unwrap();
        assert_eq!(a.state(), UnitState::Stopped);
        assert_eq!(b.state(), UnitState::Stopped);
        assert!(registry.waiting().is_empty());
    }

    struct FailingStart;
    impl UnitObj for FailingStart {
        fn start(&self) -> Result<()> {
            Err(Error::Other {
                msg: "refused".to_string(),
            })
        }
    }

    #[test]
    fn activation_failure_is_recorded_and_returned() {
        let (ctx, registry, _deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let id = UnitId::new("app", "bad");
        let unit = UnitEntry::new(id.clone(), Box::new(FailingStart));
        registry.insert_unit(unit);

        engine.create_unit(&id).unwrap();
        let err = engine.start_unit(&id).unwrap_err();
        assert!(matches!(err, Error::Shared { .. }));
        assert!(registry.failures().get("bad").is_some());
        let report = engine.converge_check();
        assert!(!report.converged());
    }

    struct FlakyStart {
        attempts: std::sync::atomic::AtomicUsize,
    }
    impl UnitObj for FlakyStart {
        fn start(&self) -> Result<()> {
            if self
                .attempts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                == 0
            {
                return Err(Error::Other {
                    msg: "not yet".to_string(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn failure_record_clears_on_successful_retry() {
        let (ctx, registry, _deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let id = UnitId::new("app", "flaky");
        registry.insert_unit(UnitEntry::new(
            id.clone(),
            Box::new(FlakyStart {
                attempts: std::sync::atomic::AtomicUsize::new(0),
            }),
        ));

        engine.create_unit(&id).unwrap();
        assert!(engine.start_unit(&id).is_err());
        assert!(registry.failures().get("flaky").is_some());

        // the retry re-creates the failed unit, starts it, and the stale
        // failure record goes away with the success
        engine.start_unit(&id).unwrap();
        assert_eq!(registry.get("flaky").unwrap().state(), UnitState::Started);
        assert!(registry.failures().get("flaky").is_none());
        assert!(engine.converge_check().converged());
    }

    #[test]
    fn cycle_causes_drain_once_the_edge_is_gone() {
        let (ctx, registry, deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let a = add_nop(&registry, "a");
        let b = add_nop(&registry, "b");
        deps.add_edge(a.id().clone(), b.id().clone());
        deps.add_edge(b.id().clone(), a.id().clone());

        engine.start_unit(a.id()).unwrap();
        engine.start_unit(b.id()).unwrap();
        assert!(registry.waiting().is_waiting("a"));
        assert!(registry.waiting().is_waiting("b"));

        // dropping b's edges breaks the cycle in both directions
        deps.remove_unit(b.id());
        engine.start_unit(a.id()).unwrap();
        assert_eq!(a.state(), UnitState::Started);
        assert!(!registry.waiting().is_waiting("a"));

        engine.start_unit(b.id()).unwrap();
        assert_eq!(b.state(), UnitState::Started);
        assert!(registry.waiting().is_empty());
        assert!(engine.converge_check().converged());
    }

    #[test]
    fn unknown_unit_is_an_error_for_activation_only() {
        let (ctx, _registry, _deps) = ctx_with_registry("app");
        let engine = Engine::new(ctx);
        let id = UnitId::new("app", "ghost");
        assert!(matches!(
            engine.create_unit(&id),
            Err(Error::UnitNotFound { .. })
        ));
        // going down, a unit that no longer exists is simply done
        engine.destroy_unit(&id).unwrap();
    }
}
