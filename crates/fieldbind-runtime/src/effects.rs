#![forbid(unsafe_code)]

//! Deferred, keyed effects.
//!
//! Bindings never write during a read. Work that must follow a read (default
//! hydration) is scheduled here and runs when the host flushes the queue,
//! typically once after each render pass.
//!
//! # Invariants
//!
//! 1. Effects run in scheduling order (FIFO).
//! 2. At most one effect per [`EffectKey`] is pending. Scheduling an existing
//!    key replaces the pending closure in place, keeping its queue position.
//! 3. `flush()` runs only effects pending when it was called. Effects scheduled
//!    by a running effect wait for the next flush.
//! 4. Clones share one queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use fieldbind_core::FieldPath;

/// Identity of a deferred effect: which store, which slot.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EffectKey {
    store: usize,
    path: FieldPath,
}

impl EffectKey {
    /// Key for `path` in the store behind `store`.
    pub fn for_store<S: ?Sized>(store: &Rc<S>, path: FieldPath) -> Self {
        Self {
            store: Rc::as_ptr(store).cast::<()>() as usize,
            path,
        }
    }

    /// The slot this effect targets.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }
}

/// What [`EffectQueue::schedule`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduled {
    /// A new effect was appended.
    Queued,
    /// A pending effect with the same key was replaced.
    Replaced,
}

type Effect = Box<dyn FnOnce()>;

/// Shared FIFO of keyed deferred effects.
#[derive(Clone, Default)]
pub struct EffectQueue {
    pending: Rc<RefCell<VecDeque<(EffectKey, Effect)>>>,
}

impl EffectQueue {
    /// An empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `effect` under `key`.
    pub fn schedule(&self, key: EffectKey, effect: impl FnOnce() + 'static) -> Scheduled {
        let mut pending = self.pending.borrow_mut();
        if let Some(slot) = pending.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = Box::new(effect);
            Scheduled::Replaced
        } else {
            pending.push_back((key, Box::new(effect)));
            Scheduled::Queued
        }
    }

    /// Whether an effect for `key` is waiting.
    #[must_use]
    pub fn is_pending(&self, key: &EffectKey) -> bool {
        self.pending.borrow().iter().any(|(k, _)| k == key)
    }

    /// Number of waiting effects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Run every effect pending at call time. Returns how many ran.
    pub fn flush(&self) -> usize {
        let batch = std::mem::take(&mut *self.pending.borrow_mut());
        let ran = batch.len();
        for (_key, effect) in batch {
            effect();
        }
        ran
    }

    /// Run one host pass, then flush what it scheduled.
    pub fn cycle<R>(&self, pass: impl FnOnce() -> R) -> R {
        let out = pass();
        self.flush();
        out
    }

    /// Drop every pending effect without running it. Returns how many were
    /// dropped.
    pub fn clear(&self) -> usize {
        let mut pending = self.pending.borrow_mut();
        let dropped = pending.len();
        pending.clear();
        dropped
    }
}

impl fmt::Debug for EffectQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pending = self.pending.borrow();
        f.debug_struct("EffectQueue")
            .field(
                "pending",
                &pending.iter().map(|(k, _)| k.path.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
