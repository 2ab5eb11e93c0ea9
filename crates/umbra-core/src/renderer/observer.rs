// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cross-thread invalidation primitives.
//!
//! A [`DirtyFlag`] is the rebuild signal of a pipeline state. Objects that can
//! invalidate a pipeline (shaders, render targets, source watchers) keep an
//! [`InvalidationList`] of weak references to the flags subscribed to them and
//! set every live flag when they change.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

/// A shared atomic "needs rebuild" flag.
#[derive(Debug, Clone, Default)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl DirtyFlag {
    /// Creates a flag with the given initial value.
    pub fn new(dirty: bool) -> Self {
        Self(Arc::new(AtomicBool::new(dirty)))
    }

    /// Sets the flag.
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns the current value of the flag.
    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clears the flag and returns its previous value.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    fn downgrade(&self) -> Weak<AtomicBool> {
        Arc::downgrade(&self.0)
    }
}

/// A list of subscribed [`DirtyFlag`]s.
///
/// Subscriptions are weak: dropping the owner of a flag unsubscribes it.
#[derive(Debug, Default)]
pub struct InvalidationList {
    listeners: Mutex<Vec<Weak<AtomicBool>>>,
}

impl InvalidationList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `flag`. Subscribing the same flag twice is a no-op.
    pub fn subscribe(&self, flag: &DirtyFlag) {
        let weak = flag.downgrade();
        let mut listeners = self.listeners.lock().unwrap();
        if !listeners.iter().any(|l| Weak::ptr_eq(l, &weak)) {
            listeners.push(weak);
        }
    }

    /// Removes `flag` and any dropped flags.
    ///
    /// Returns `true` if `flag` was subscribed.
    pub fn unsubscribe(&self, flag: &DirtyFlag) -> bool {
        let weak = flag.downgrade();
        let mut listeners = self.listeners.lock().unwrap();
        let found = listeners.iter().any(|l| Weak::ptr_eq(l, &weak));
        listeners.retain(|l| l.strong_count() > 0 && !Weak::ptr_eq(l, &weak));
        found
    }

    /// Marks every live subscriber dirty and prunes dropped ones.
    ///
    /// Returns the number of flags that were marked.
    pub fn notify(&self) -> usize {
        let mut listeners = self.listeners.lock().unwrap();
        listeners.retain(|l| l.strong_count() > 0);
        for flag in listeners.iter().filter_map(Weak::upgrade) {
            flag.store(true, Ordering::Release);
        }
        listeners.len()
    }

    /// Number of subscriptions, including ones whose flag has been dropped
    /// since the last notification.
    pub fn len(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    /// Returns `true` if nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
