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

//! Ordered, token-keyed subscriber list. This is the single notification
//! channel shape used everywhere: unit state changes, unit (un)registration
//! inside a registry, and registry (un)registration in the global directory.

use crate::error::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub trait Subscriber<E>: Send + Sync {
    fn filter(&self, _event: &E) -> bool {
        // default: everything is allowed
        true
    }

    fn notify(&self, event: &E) -> Result<()>;
}

pub struct Broadcast<E> {
    subs: Mutex<Vec<(u64, Arc<dyn Subscriber<E>>)>>, // kept in registration order
    next_token: AtomicU64,
}

impl<E> Default for Broadcast<E> {
    fn default() -> Self {
        Broadcast::new()
    }
}

impl<E> Broadcast<E> {
    pub fn new() -> Broadcast<E> {
        Broadcast {
            subs: Mutex::new(Vec::new()),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn add(&self, subscriber: Arc<dyn Subscriber<E>>) -> u64 {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst);
        self.subs
            .lock()
            .expect("broadcast lock poisoned")
            .push((token, subscriber));
        token
    }

    pub fn remove(&self, token: u64) -> Option<Arc<dyn Subscriber<E>>> {
        let mut subs = self.subs.lock().expect("broadcast lock poisoned");
        let pos = subs.iter().position(|(t, _)| *t == token)?;
        Some(subs.remove(pos).1)
    }

    pub fn len(&self) -> usize {
        self.subs.lock().expect("broadcast lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke subscribers in registration order. The list is snapshotted
    /// first, so a subscriber may add or remove subscribers (including
    /// itself) while being notified.
    pub fn notify(&self, event: &E) {
        let snapshot: Vec<(u64, Arc<dyn Subscriber<E>>)> = self
            .subs
            .lock()
            .expect("broadcast lock poisoned")
            .clone();
        for (token, subscriber) in snapshot {
            if !subscriber.filter(event) {
                continue;
            }
            if let Err(e) = subscriber.notify(event) {
                log::warn!("subscriber {} failed on notify: {}", token, e);
            }
        }
    }
}
