#![forbid(unsafe_code)]

//! Field bindings: one slot of shared form state, read with a default and
//! written through a stable updater.
//!
//! ```
//! use std::rc::Rc;
//! use fieldbind_runtime::{EffectQueue, FormState, bind};
//! use serde_json::json;
//!
//! let form = Rc::new(FormState::new());
//! let effects = EffectQueue::new();
//!
//! let (country, set_country) = bind(&form, "address.country", json!("Norway"), &effects).unwrap();
//! assert_eq!(country, json!("Norway"));
//!
//! // The default lands in the store only when the host flushes effects.
//! assert_eq!(form.snapshot(), json!({}));
//! effects.flush();
//! assert_eq!(form.snapshot(), json!({ "address": { "country": "Norway" } }));
//!
//! set_country.set(json!("Canada"));
//! let (country, _) = bind(&form, "address.country", json!("Norway"), &effects).unwrap();
//! assert_eq!(country, json!("Canada"));
//! ```
//!
//! # Binding protocol
//!
//! Every bind runs two phases:
//!
//! 1. **Read.** Check the store's capabilities and the path, read the slot,
//!    and fall back to the default when the slot is absent under the
//!    configured [`AbsencePolicy`]. Nothing is written.
//! 2. **Hydrate.** If the slot was absent, schedule a write of the default on
//!    the [`EffectQueue`], keyed by (store, path). The effect re-checks absence
//!    when it runs, so a value that landed in between is never overwritten.
//!
//! # Invariants
//!
//! 1. Invalid paths and under-capable stores fail before any read or write.
//! 2. An updater never returns or panics on a failed transform. The failure
//!    goes to the [`DiagnosticSink`] and the store is left untouched.
//! 3. A [`FieldHook`] hands out the same updater (by `ptr_eq`) for as long as
//!    the store identity and path are unchanged.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | `ConfigurationError` | Empty path, store without read/write | Returned from `bind` |
//! | Transform error | Transformer returned `Err` | Reported, write skipped |
//! | Transform panic | Transformer panicked | Caught, reported, write skipped |
//! | Rejected write | Store refused the value | Reported, default still shown |

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use fieldbind_core::{
    AbsencePolicy, BindingConfig, Capabilities, ConfigurationError, FieldPath, UpdateTransformError,
};

use crate::diagnostics::{Diagnostic, DiagnosticSink, TARGET, TracingSink};
use crate::effects::{EffectKey, EffectQueue, Scheduled};
use crate::reactive::Subscription;
use crate::store::{FieldStore, Scoped};

/// Whether a binding has seen a stored value yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldState {
    /// The slot was absent; the default is shown and hydration is pending.
    NoValueYet,
    /// The slot holds a value.
    HasValue,
}

/// The next value for a field: a literal, or a function of the previous one.
pub enum Next<V> {
    Value(V),
    Derive(Box<dyn FnOnce(&V) -> V>),
}

impl<V> Next<V> {
    /// Derive the next value from the previous one.
    pub fn derive(f: impl FnOnce(&V) -> V + 'static) -> Self {
        Self::Derive(Box::new(f))
    }
}

impl<V> From<V> for Next<V> {
    fn from(value: V) -> Self {
        Self::Value(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Next<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Derive(_) => f.write_str("Derive(..)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Binder
// ---------------------------------------------------------------------------

/// Shared context for binding fields against one store.
///
/// Carries the store, the host's effect queue, the diagnostic sink, and the
/// policy. Cheap to clone.
pub struct Binder<S: FieldStore> {
    store: Rc<S>,
    effects: EffectQueue,
    sink: Rc<dyn DiagnosticSink>,
    config: BindingConfig,
}

impl<S: FieldStore> Clone for Binder<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            effects: self.effects.clone(),
            sink: Rc::clone(&self.sink),
            config: self.config.clone(),
        }
    }
}

impl<S: FieldStore> fmt::Debug for Binder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binder")
            .field("config", &self.config)
            .field("effects", &self.effects)
            .finish_non_exhaustive()
    }
}

impl<S: FieldStore> Binder<S> {
    /// Bind against `store`, scheduling hydration on `effects`. Failures are
    /// reported to [`TracingSink`] under the default [`BindingConfig`].
    pub fn new(store: Rc<S>, effects: EffectQueue) -> Self {
        Self {
            store,
            effects,
            sink: Rc::new(TracingSink),
            config: BindingConfig::default(),
        }
    }

    /// Report swallowed failures to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use `config` for bindings created from now on.
    #[must_use]
    pub fn with_config(mut self, config: BindingConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    #[must_use]
    pub fn effects(&self) -> &EffectQueue {
        &self.effects
    }

    #[must_use]
    pub fn config(&self) -> &BindingConfig {
        &self.config
    }

    /// A binder whose paths resolve below `prefix`, sharing this binder's
    /// effects, sink and config.
    ///
    /// Each call creates a new store identity; keep the returned binder
    /// around instead of re-scoping on every pass if updater identity matters.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::EmptyPath`] if `prefix` is empty.
    pub fn scoped(&self, prefix: impl AsRef<str>) -> Result<Binder<Scoped<S>>, ConfigurationError> {
        let prefix = FieldPath::parse(prefix.as_ref())?;
        Ok(Binder {
            store: Rc::new(Scoped::new(Rc::clone(&self.store), prefix)),
            effects: self.effects.clone(),
            sink: Rc::clone(&self.sink),
            config: self.config.clone(),
        })
    }

    /// Bind the slot at `path`, falling back to `default`.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError`] if the store lacks read/write or `path` is
    /// empty. Nothing is read or written in that case.
    pub fn bind(
        &self,
        path: impl AsRef<str>,
        default: S::Value,
    ) -> Result<FieldHandle<S>, ConfigurationError> {
        let (path, value, state) = self.resolve(path.as_ref(), &default)?;
        Ok(FieldHandle {
            value,
            state,
            updater: FieldUpdater::new(self, path, default),
        })
    }

    fn resolve(
        &self,
        raw: &str,
        default: &S::Value,
    ) -> Result<(FieldPath, S::Value, FieldState), ConfigurationError> {
        self.store.capabilities().require(Capabilities::REQUIRED)?;
        let path = FieldPath::parse(raw)?;

        match self.store.read(&path) {
            Some(value) if !self.config.absence.is_absent(Some(&value)) => {
                Ok((path, value, FieldState::HasValue))
            }
            _ => {
                if self.config.hydrate_defaults {
                    self.schedule_hydration(&path, default.clone());
                }
                Ok((path, default.clone(), FieldState::NoValueYet))
            }
        }
    }

    fn schedule_hydration(&self, path: &FieldPath, default: S::Value) {
        let store = Rc::clone(&self.store);
        let sink = Rc::clone(&self.sink);
        let absence = self.config.absence;
        let target = path.clone();
        let outcome = self.effects.schedule(
            EffectKey::for_store(&self.store, path.clone()),
            move || hydrate(&*store, &target, default, absence, &*sink),
        );
        tracing::debug!(
            target: TARGET,
            path = %path,
            replaced = outcome == Scheduled::Replaced,
            "default hydration scheduled"
        );
    }
}

fn hydrate<S: FieldStore>(
    store: &S,
    path: &FieldPath,
    default: S::Value,
    absence: AbsencePolicy,
    sink: &dyn DiagnosticSink,
) {
    if !absence.is_absent(store.read(path).as_ref()) {
        tracing::trace!(target: TARGET, path = %path, "hydration skipped, value present");
        return;
    }
    match store.write(path, default) {
        Ok(()) => tracing::debug!(target: TARGET, path = %path, "default hydrated"),
        Err(err) => sink.report(err.into()),
    }
}

/// Bind `path` in `store` with the default policy and [`TracingSink`].
///
/// Returns the current value (or `default`) and the field's updater.
///
/// # Errors
///
/// [`ConfigurationError`] if the store lacks read/write or `path` is empty.
pub fn bind<S: FieldStore>(
    store: &Rc<S>,
    path: impl AsRef<str>,
    default: S::Value,
    effects: &EffectQueue,
) -> Result<(S::Value, FieldUpdater<S>), ConfigurationError> {
    Binder::new(Rc::clone(store), effects.clone())
        .bind(path, default)
        .map(FieldHandle::into_parts)
}

// ---------------------------------------------------------------------------
// FieldHandle
// ---------------------------------------------------------------------------

/// Result of one bind: the value seen, and the updater for the slot.
pub struct FieldHandle<S: FieldStore> {
    value: S::Value,
    state: FieldState,
    updater: FieldUpdater<S>,
}

impl<S: FieldStore> fmt::Debug for FieldHandle<S>
where
    S::Value: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHandle")
            .field("path", self.updater.path())
            .field("value", &self.value)
            .field("state", &self.state)
            .finish()
    }
}

impl<S: FieldStore> FieldHandle<S> {
    /// The value seen at bind time.
    #[must_use]
    pub fn value(&self) -> &S::Value {
        &self.value
    }

    #[must_use]
    pub fn state(&self) -> FieldState {
        self.state
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        self.updater.path()
    }

    #[must_use]
    pub fn updater(&self) -> &FieldUpdater<S> {
        &self.updater
    }

    /// Split into `(value, updater)`.
    pub fn into_parts(self) -> (S::Value, FieldUpdater<S>) {
        (self.value, self.updater)
    }

    /// Live view of the slot that re-reads the store on every call.
    #[must_use]
    pub fn reader(&self) -> FieldReader<S> {
        FieldReader {
            updater: self.updater.clone(),
        }
    }

    /// Call `callback` with the shown value (stored or default) whenever the
    /// slot changes. `None` if the store has no change notification.
    pub fn watch(&self, callback: impl Fn(&S::Value) + 'static) -> Option<Subscription> {
        let updater = self.updater.clone();
        let inner = &self.updater.inner;
        inner.store.watch(
            &inner.path,
            Box::new(move |stored: Option<&S::Value>| {
                callback(&updater.present(stored.cloned()));
            }),
        )
    }
}

// ---------------------------------------------------------------------------
// FieldReader
// ---------------------------------------------------------------------------

/// Read side of a bound field, detached from any one bind.
///
/// Shares the updater's default and absence policy, so a reader handed out
/// before a [`FieldHook`] re-bind presents what the latest bind would.
pub struct FieldReader<S: FieldStore> {
    updater: FieldUpdater<S>,
}

impl<S: FieldStore> Clone for FieldReader<S> {
    fn clone(&self) -> Self {
        Self {
            updater: self.updater.clone(),
        }
    }
}

impl<S: FieldStore> fmt::Debug for FieldReader<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldReader")
            .field("path", self.updater.path())
            .finish_non_exhaustive()
    }
}

impl<S: FieldStore> FieldReader<S> {
    /// The stored value, or the default when the slot is absent.
    #[must_use]
    pub fn get(&self) -> S::Value {
        self.updater.current()
    }

    /// The stored value as-is, absent or not.
    #[must_use]
    pub fn stored(&self) -> Option<S::Value> {
        let inner = &self.updater.inner;
        inner.store.read(&inner.path)
    }

    /// Whether the slot currently holds a value under the absence policy.
    #[must_use]
    pub fn state(&self) -> FieldState {
        let inner = &self.updater.inner;
        if inner.absence.get().is_absent(self.stored().as_ref()) {
            FieldState::NoValueYet
        } else {
            FieldState::HasValue
        }
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        self.updater.path()
    }
}

// ---------------------------------------------------------------------------
// FieldUpdater
// ---------------------------------------------------------------------------

struct UpdaterInner<S: FieldStore> {
    store: Rc<S>,
    path: FieldPath,
    fallback: RefCell<S::Value>,
    absence: Cell<AbsencePolicy>,
    sink: RefCell<Rc<dyn DiagnosticSink>>,
}

/// Writes one field. Clones share identity (see [`ptr_eq`](Self::ptr_eq)).
///
/// Every method is fire-and-forget: failures are reported to the binder's
/// [`DiagnosticSink`], never returned.
pub struct FieldUpdater<S: FieldStore> {
    inner: Rc<UpdaterInner<S>>,
}

impl<S: FieldStore> Clone for FieldUpdater<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: FieldStore> fmt::Debug for FieldUpdater<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldUpdater")
            .field("path", &self.inner.path)
            .finish_non_exhaustive()
    }
}

impl<S: FieldStore> FieldUpdater<S> {
    fn new(binder: &Binder<S>, path: FieldPath, fallback: S::Value) -> Self {
        Self {
            inner: Rc::new(UpdaterInner {
                store: Rc::clone(&binder.store),
                path,
                fallback: RefCell::new(fallback),
                absence: Cell::new(binder.config.absence),
                sink: RefCell::new(Rc::clone(&binder.sink)),
            }),
        }
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.inner.path
    }

    /// Whether both updaters are the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The value a transformer would receive: the stored value, or the
    /// default when the slot is absent.
    #[must_use]
    pub fn current(&self) -> S::Value {
        self.present(self.inner.store.read(&self.inner.path))
    }

    /// Write `value`.
    pub fn set(&self, value: S::Value) {
        self.commit(value);
    }

    /// Write a literal or derived value.
    pub fn apply(&self, next: impl Into<Next<S::Value>>) {
        match next.into() {
            Next::Value(value) => self.set(value),
            Next::Derive(f) => self.update(f),
        }
    }

    /// Write `f(previous)`.
    pub fn update(&self, f: impl FnOnce(&S::Value) -> S::Value) {
        self.update_with((), |prev, ()| f(prev));
    }

    /// Write `f(previous, args)`; `args` is forwarded to `f` untouched.
    pub fn update_with<A>(&self, args: A, f: impl FnOnce(&S::Value, A) -> S::Value) {
        let outcome = self.transform(|prev| Ok::<_, Infallible>(f(prev, args)));
        self.finish(outcome);
    }

    /// Write `f(previous)` if it succeeds. An `Err` is reported and nothing
    /// is written.
    pub fn try_update<E: fmt::Display>(&self, f: impl FnOnce(&S::Value) -> Result<S::Value, E>) {
        let outcome = self.transform(f);
        self.finish(outcome);
    }

    fn transform<E: fmt::Display>(
        &self,
        f: impl FnOnce(&S::Value) -> Result<S::Value, E>,
    ) -> Result<S::Value, UpdateTransformError> {
        let prev = self.current();
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(&prev))).map_err(|payload| {
            UpdateTransformError::Panicked {
                path: self.inner.path.clone(),
                message: panic_message(payload.as_ref()),
            }
        })?;
        result.map_err(|err| UpdateTransformError::Failed {
            path: self.inner.path.clone(),
            message: err.to_string(),
        })
    }

    fn finish(&self, outcome: Result<S::Value, UpdateTransformError>) {
        match outcome {
            Ok(value) => self.commit(value),
            Err(err) => self.report(err.into()),
        }
    }

    fn commit(&self, value: S::Value) {
        match self.inner.store.write(&self.inner.path, value) {
            Ok(()) => tracing::trace!(target: TARGET, path = %self.inner.path, "field updated"),
            Err(err) => self.report(err.into()),
        }
    }

    fn report(&self, diagnostic: Diagnostic) {
        let sink = Rc::clone(&*self.inner.sink.borrow());
        sink.report(diagnostic);
    }

    fn present(&self, stored: Option<S::Value>) -> S::Value {
        match stored {
            Some(value) if !self.inner.absence.get().is_absent(Some(&value)) => value,
            _ => self.inner.fallback.borrow().clone(),
        }
    }

    fn targets(&self, store: &Rc<S>, path: &FieldPath) -> bool {
        Rc::ptr_eq(&self.inner.store, store) && self.inner.path == *path
    }

    /// Adopt `binder`'s sink and absence policy and the latest default.
    fn refresh(&self, binder: &Binder<S>, fallback: S::Value) {
        *self.inner.fallback.borrow_mut() = fallback;
        self.inner.absence.set(binder.config.absence);
        *self.inner.sink.borrow_mut() = Rc::clone(&binder.sink);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// FieldHook / FieldScope
// ---------------------------------------------------------------------------

/// Memory for one field occurrence across repeated binds.
///
/// Keeps the updater stable while the store and path stay the same. A reused
/// updater follows the latest bind: its default, and the binder's diagnostic
/// sink and absence policy.
pub struct FieldHook<S: FieldStore> {
    updater: Option<FieldUpdater<S>>,
}

impl<S: FieldStore> Default for FieldHook<S> {
    fn default() -> Self {
        Self { updater: None }
    }
}

impl<S: FieldStore> fmt::Debug for FieldHook<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldHook")
            .field("path", &self.updater.as_ref().map(FieldUpdater::path))
            .finish()
    }
}

impl<S: FieldStore> FieldHook<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind through `binder`, reusing the previous updater when possible.
    ///
    /// # Errors
    ///
    /// Same as [`Binder::bind`].
    pub fn bind(
        &mut self,
        binder: &Binder<S>,
        path: impl AsRef<str>,
        default: S::Value,
    ) -> Result<FieldHandle<S>, ConfigurationError> {
        let (path, value, state) = binder.resolve(path.as_ref(), &default)?;

        if let Some(existing) = self
            .updater
            .as_ref()
            .filter(|updater| updater.targets(&binder.store, &path))
        {
            existing.refresh(binder, default);
            return Ok(FieldHandle {
                value,
                state,
                updater: existing.clone(),
            });
        }

        let updater = FieldUpdater::new(binder, path, default);
        self.updater = Some(updater.clone());
        Ok(FieldHandle {
            value,
            state,
            updater,
        })
    }

    /// The updater handed out by the last successful bind.
    #[must_use]
    pub fn updater(&self) -> Option<&FieldUpdater<S>> {
        self.updater.as_ref()
    }
}

/// Field hooks and subscriptions owned by one component.
///
/// Hooks are addressed by call order: call [`begin_pass`](Self::begin_pass)
/// before each pass, then [`bind`](Self::bind) fields in the same order every
/// time. Dropping the scope (or [`clear`](Self::clear)) releases every held
/// subscription.
pub struct FieldScope<S: FieldStore> {
    hooks: Vec<FieldHook<S>>,
    cursor: usize,
    subscriptions: Vec<Subscription>,
}

impl<S: FieldStore> Default for FieldScope<S> {
    fn default() -> Self {
        Self {
            hooks: Vec::new(),
            cursor: 0,
            subscriptions: Vec::new(),
        }
    }
}

impl<S: FieldStore> fmt::Debug for FieldScope<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldScope")
            .field("field_count", &self.hooks.len())
            .field("subscription_count", &self.subscriptions.len())
            .finish()
    }
}

impl<S: FieldStore> FieldScope<S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new pass: the next `bind` uses the first hook slot again.
    pub fn begin_pass(&mut self) {
        self.cursor = 0;
    }

    /// Bind the next field in call order.
    ///
    /// # Errors
    ///
    /// Same as [`Binder::bind`].
    pub fn bind(
        &mut self,
        binder: &Binder<S>,
        path: impl AsRef<str>,
        default: S::Value,
    ) -> Result<FieldHandle<S>, ConfigurationError> {
        let index = self.cursor;
        self.cursor += 1;
        if index == self.hooks.len() {
            self.hooks.push(FieldHook::new());
        }
        self.hooks[index].bind(binder, path, default)
    }

    /// Keep `sub` alive until the scope is cleared or dropped.
    pub fn hold(&mut self, sub: Subscription) {
        self.subscriptions.push(sub);
    }

    /// Watch `handle`'s slot for the lifetime of this scope. Returns `false`
    /// when the store has no change notification.
    pub fn watch(
        &mut self,
        handle: &FieldHandle<S>,
        callback: impl Fn(&S::Value) + 'static,
    ) -> bool {
        match handle.watch(callback) {
            Some(sub) => {
                self.hold(sub);
                true
            }
            None => false,
        }
    }

    /// Number of hook slots.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.hooks.len()
    }

    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty() && self.subscriptions.is_empty()
    }

    /// Release every subscription and forget every hook.
    pub fn clear(&mut self) {
        self.subscriptions.clear();
        self.hooks.clear();
        self.cursor = 0;
    }
}
