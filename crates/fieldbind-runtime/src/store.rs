#![forbid(unsafe_code)]

//! Field stores: the shared state a binding reads from and writes to.
//!
//! The binding never owns values. It reaches a store only through
//! [`FieldStore`]: `read` and `write` by [`FieldPath`], plus an optional
//! `watch` for hosts that re-invoke bindings on change.
//!
//! Two reference stores ship here:
//!
//! - [`FormState`]: an in-memory JSON tree. Writes create intermediate
//!   objects on demand. Writing through a non-object parent is rejected.
//! - [`Scoped`]: a view of another store under a path prefix, so a subtree can
//!   bind `"country"` while the slot lives at `"address.country"`.
//!
//! # Invariants
//!
//! 1. `read` after a successful `write` at the same path returns the written
//!    value (last write wins).
//! 2. Writes to sibling paths never disturb each other.
//! 3. A `watch` callback fires only when the value at its own path changes.

use std::cell::RefCell;
use std::rc::Rc;

use fieldbind_core::{Capabilities, FieldPath, FieldValue, WriteRejected};
use serde_json::{Map, Value};

use crate::reactive::{Observable, Subscription};

/// Callback registered through [`FieldStore::watch`]. Receives the new value
/// at the watched path (`None` once the slot is removed).
pub type WatchCallback<V> = Box<dyn Fn(Option<&V>)>;

/// Path-addressed shared state.
pub trait FieldStore: 'static {
    /// The value type held in every slot.
    type Value: FieldValue;

    /// What this store supports. Bindings require
    /// [`Capabilities::REQUIRED`].
    fn capabilities(&self) -> Capabilities {
        Capabilities::REQUIRED
    }

    /// Current value at `path`, or `None` if the slot is empty.
    fn read(&self, path: &FieldPath) -> Option<Self::Value>;

    /// Commit `value` at `path`.
    ///
    /// # Errors
    ///
    /// [`WriteRejected`] if the store refuses the write.
    fn write(&self, path: &FieldPath, value: Self::Value) -> Result<(), WriteRejected>;

    /// Subscribe to changes at `path`. Stores without change notification
    /// return `None`.
    fn watch(
        &self,
        path: &FieldPath,
        callback: WatchCallback<Self::Value>,
    ) -> Option<Subscription> {
        let _ = (path, callback);
        None
    }
}

impl<S: FieldStore> FieldStore for Rc<S> {
    type Value = S::Value;

    fn capabilities(&self) -> Capabilities {
        (**self).capabilities()
    }

    fn read(&self, path: &FieldPath) -> Option<Self::Value> {
        (**self).read(path)
    }

    fn write(&self, path: &FieldPath, value: Self::Value) -> Result<(), WriteRejected> {
        (**self).write(path, value)
    }

    fn watch(
        &self,
        path: &FieldPath,
        callback: WatchCallback<Self::Value>,
    ) -> Option<Subscription> {
        (**self).watch(path, callback)
    }
}

// ---------------------------------------------------------------------------
// FormState
// ---------------------------------------------------------------------------

/// In-memory form state: a JSON object tree addressed by dot paths.
///
/// # Example
///
/// ```
/// use fieldbind_core::FieldPath;
/// use fieldbind_runtime::store::{FieldStore, FormState};
/// use serde_json::json;
///
/// let form = FormState::new();
/// let city = FieldPath::parse("address.city").unwrap();
/// form.write(&city, json!("Lyon")).unwrap();
///
/// assert_eq!(form.read(&city), Some(json!("Lyon")));
/// assert_eq!(form.snapshot(), json!({ "address": { "city": "Lyon" } }));
/// ```
#[derive(Clone, Debug)]
pub struct FormState {
    root: Observable<Value>,
    writable: bool,
}

impl Default for FormState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormState {
    /// An empty form.
    #[must_use]
    pub fn new() -> Self {
        Self::from_value(Value::Object(Map::new()))
    }

    /// A form seeded with `initial`. Non-object roots are replaced by an
    /// empty object.
    #[must_use]
    pub fn from_value(initial: Value) -> Self {
        let root = match initial {
            Value::Object(_) => initial,
            _ => Value::Object(Map::new()),
        };
        Self {
            root: Observable::new(root),
            writable: true,
        }
    }

    /// A read-only form. It reports no [`Capabilities::WRITE`], so binding
    /// against it fails, and direct writes are rejected.
    #[must_use]
    pub fn frozen(initial: Value) -> Self {
        Self {
            writable: false,
            ..Self::from_value(initial)
        }
    }

    /// Clone of the whole tree.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        self.root.get()
    }

    /// Number of committed changes.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.root.version()
    }

    /// Clear the slot at `path`. Returns the removed value.
    pub fn remove(&self, path: &FieldPath) -> Option<Value> {
        if !self.writable {
            return None;
        }
        let mut removed = None;
        self.root.update(|root| {
            let (parent, leaf) = match path.parent() {
                Some(parent) => (lookup_mut(root, &parent), path.leaf()),
                None => (Some(root), path.as_str()),
            };
            removed = parent
                .and_then(Value::as_object_mut)
                .and_then(|map| map.remove(leaf));
        });
        removed
    }
}

impl FieldStore for FormState {
    type Value = Value;

    fn capabilities(&self) -> Capabilities {
        if self.writable {
            Capabilities::all()
        } else {
            Capabilities::READ | Capabilities::SUBSCRIBE
        }
    }

    fn read(&self, path: &FieldPath) -> Option<Value> {
        self.root.with(|root| lookup(root, path).cloned())
    }

    fn write(&self, path: &FieldPath, value: Value) -> Result<(), WriteRejected> {
        if !self.writable {
            return Err(WriteRejected::new(path.clone(), "form state is frozen"));
        }
        let mut next = self.root.get();
        insert(&mut next, path, value)?;
        self.root.set(next);
        Ok(())
    }

    fn watch(&self, path: &FieldPath, callback: WatchCallback<Value>) -> Option<Subscription> {
        let path = path.clone();
        let last = RefCell::new(self.read(&path));
        Some(self.root.subscribe(move |root| {
            let current = lookup(root, &path);
            if last.borrow().as_ref() == current {
                return;
            }
            *last.borrow_mut() = current.cloned();
            callback(current);
        }))
    }
}

fn lookup<'a>(root: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    path.segments()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn lookup_mut<'a>(root: &'a mut Value, path: &FieldPath) -> Option<&'a mut Value> {
    path.segments()
        .try_fold(root, |node, segment| node.as_object_mut()?.get_mut(segment))
}

fn insert(root: &mut Value, path: &FieldPath, value: Value) -> Result<(), WriteRejected> {
    let mut node = root;
    let mut walked = String::new();
    let mut segments = path.segments().peekable();
    while let Some(segment) = segments.next() {
        let Some(map) = node.as_object_mut() else {
            let at = if walked.is_empty() {
                "<root>"
            } else {
                walked.as_str()
            };
            return Err(WriteRejected::new(
                path.clone(),
                format!("`{at}` is not an object"),
            ));
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        if !walked.is_empty() {
            walked.push('.');
        }
        walked.push_str(segment);
        node = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Scoped
// ---------------------------------------------------------------------------

/// A store view that resolves every path below `prefix`.
#[derive(Debug)]
pub struct Scoped<S> {
    inner: Rc<S>,
    prefix: FieldPath,
}

impl<S: FieldStore> Scoped<S> {
    /// View `inner` under `prefix`.
    pub fn new(inner: Rc<S>, prefix: FieldPath) -> Self {
        Self { inner, prefix }
    }

    /// The prefix every path is resolved under.
    #[must_use]
    pub fn prefix(&self) -> &FieldPath {
        &self.prefix
    }

    /// The underlying store.
    #[must_use]
    pub fn inner(&self) -> &Rc<S> {
        &self.inner
    }

    fn resolve(&self, path: &FieldPath) -> FieldPath {
        // Both halves are already validated, so the join cannot fail.
        self.prefix
            .join(path.as_str())
            .unwrap_or_else(|_| self.prefix.clone())
    }
}

impl<S: FieldStore> FieldStore for Scoped<S> {
    type Value = S::Value;

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn read(&self, path: &FieldPath) -> Option<Self::Value> {
        self.inner.read(&self.resolve(path))
    }

    fn write(&self, path: &FieldPath, value: Self::Value) -> Result<(), WriteRejected> {
        self.inner.write(&self.resolve(path), value)
    }

    fn watch(
        &self,
        path: &FieldPath,
        callback: WatchCallback<Self::Value>,
    ) -> Option<Subscription> {
        self.inner.watch(&self.resolve(path), callback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn path(raw: &str) -> FieldPath {
        FieldPath::parse(raw).unwrap()
    }

    #[test]
    fn empty_form_reads_none() {
        let form = FormState::new();
        assert_eq!(form.read(&path("name")), None);
        assert_eq!(form.read(&path("address.city")), None);
    }

    #[test]
    fn write_then_read() {
        let form = FormState::new();
        form.write(&path("name"), json!("Ada")).unwrap();
        assert_eq!(form.read(&path("name")), Some(json!("Ada")));
        assert_eq!(form.version(), 1);
    }

    #[test]
    fn nested_writes_create_objects_and_keep_siblings() {
        let form = FormState::new();
        form.write(&path("address.city"), json!("Oslo")).unwrap();
        form.write(&path("address.street"), json!("Karl Johans gate"))
            .unwrap();
        assert_eq!(
            form.snapshot(),
            json!({ "address": { "city": "Oslo", "street": "Karl Johans gate" } })
        );
        assert_eq!(form.read(&path("address")).unwrap()["city"], json!("Oslo"));
    }

    #[test]
    fn write_through_scalar_is_rejected() {
        let form = FormState::from_value(json!({ "address": "n/a" }));
        let err = form.write(&path("address.city"), json!("Oslo")).unwrap_err();
        assert_eq!(err.reason, "`address` is not an object");
        assert_eq!(form.read(&path("address")), Some(json!("n/a")));
    }

    #[test]
    fn equal_write_does_not_bump_version() {
        let form = FormState::new();
        form.write(&path("n"), json!(1)).unwrap();
        form.write(&path("n"), json!(1)).unwrap();
        assert_eq!(form.version(), 1);
    }

    #[test]
    fn non_object_seed_becomes_empty_object() {
        let form = FormState::from_value(json!([1, 2]));
        assert_eq!(form.snapshot(), json!({}));
    }

    #[test]
    fn frozen_form_rejects_writes() {
        let form = FormState::frozen(json!({ "name": "Ada" }));
        assert!(!form.capabilities().contains(Capabilities::WRITE));
        assert!(form.write(&path("name"), json!("Bob")).is_err());
        assert_eq!(form.remove(&path("name")), None);
        assert_eq!(form.read(&path("name")), Some(json!("Ada")));
    }

    #[test]
    fn remove_clears_slot() {
        let form = FormState::from_value(json!({ "address": { "city": "Oslo", "zip": "0150" } }));
        assert_eq!(form.remove(&path("address.city")), Some(json!("Oslo")));
        assert_eq!(form.read(&path("address.city")), None);
        assert_eq!(form.read(&path("address.zip")), Some(json!("0150")));
        assert_eq!(form.remove(&path("missing.leaf")), None);
    }

    #[test]
    fn watch_fires_only_for_own_path() {
        let form = FormState::new();
        let hits = Rc::new(RefCell::new(Vec::new()));
        let h = Rc::clone(&hits);
        let _sub = form
            .watch(
                &path("address.city"),
                Box::new(move |v: Option<&Value>| h.borrow_mut().push(v.cloned())),
            )
            .unwrap();

        form.write(&path("address.street"), json!("Main")).unwrap();
        form.write(&path("address.city"), json!("Oslo")).unwrap();
        form.write(&path("name"), json!("Ada")).unwrap();
        form.remove(&path("address.city"));

        assert_eq!(*hits.borrow(), vec![Some(json!("Oslo")), None]);
    }

    #[test]
    fn watchers_see_value_normalized_by_earlier_watcher() {
        let form = FormState::new();
        let name = path("name");

        let writer = form.clone();
        let target = name.clone();
        let _trim = form
            .watch(
                &name,
                Box::new(move |v: Option<&Value>| {
                    if let Some(raw) = v.and_then(Value::as_str) {
                        let trimmed = raw.trim();
                        if trimmed != raw {
                            writer.write(&target, json!(trimmed)).unwrap();
                        }
                    }
                }),
            )
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _record = form
            .watch(
                &name,
                Box::new(move |v: Option<&Value>| s.borrow_mut().push(v.cloned())),
            )
            .unwrap();

        form.write(&name, json!(" x ")).unwrap();

        assert_eq!(form.read(&name), Some(json!("x")));
        assert_eq!(*seen.borrow(), vec![Some(json!("x"))]);
    }

    #[test]
    fn scoped_resolves_relative_paths() {
        let form = Rc::new(FormState::new());
        let address = Scoped::new(Rc::clone(&form), path("address"));
        address.write(&path("country"), json!("Canada")).unwrap();

        assert_eq!(address.prefix().as_str(), "address");
        assert_eq!(form.read(&path("address.country")), Some(json!("Canada")));
        assert_eq!(address.read(&path("country")), Some(json!("Canada")));
        assert_eq!(address.capabilities(), Capabilities::all());
    }

    #[test]
    fn scoped_watch_delegates() {
        let form = Rc::new(FormState::new());
        let address = Scoped::new(Rc::clone(&form), path("address"));
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = address
            .watch(
                &path("zip"),
                Box::new(move |_: Option<&Value>| c.set(c.get() + 1)),
            )
            .unwrap();

        form.write(&path("address.zip"), json!("0150")).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn rc_store_forwards() {
        let form = Rc::new(FormState::new());
        let shared: Rc<Rc<FormState>> = Rc::new(Rc::clone(&form));
        shared.write(&path("n"), json!(3)).unwrap();
        assert_eq!(form.read(&path("n")), Some(json!(3)));
    }
}
