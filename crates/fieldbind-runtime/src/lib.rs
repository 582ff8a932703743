#![forbid(unsafe_code)]

//! Path-addressed field bindings over shared form state.
//!
//! Components bind one slot of a shared store by path and get back the
//! current value (or a default) plus a stable updater. Components sharing a
//! store and a path share the slot, with no references between them.
//!
//! - [`field`]: [`bind`], [`Binder`], [`FieldHandle`], [`FieldReader`],
//!   [`FieldUpdater`], [`FieldHook`], [`FieldScope`].
//! - [`store`]: the [`FieldStore`] trait, [`FormState`], [`Scoped`].
//! - [`effects`]: the deferred [`EffectQueue`] that runs default hydration.
//! - [`diagnostics`]: where swallowed update failures are reported.
//! - [`reactive`]: the [`Observable`](reactive::Observable) behind
//!   [`FormState`] and its [`Subscription`](reactive::Subscription) guards.

pub mod diagnostics;
pub mod effects;
pub mod field;
pub mod reactive;
pub mod store;

pub use diagnostics::{Diagnostic, DiagnosticSink, RecordingSink, TracingSink};
pub use effects::{EffectKey, EffectQueue, Scheduled};
pub use field::{
    Binder, FieldHandle, FieldHook, FieldReader, FieldScope, FieldState, FieldUpdater, Next, bind,
};
pub use store::{FieldStore, FormState, Scoped};

pub use fieldbind_core::{
    AbsencePolicy, BindingConfig, Capabilities, ConfigurationError, FieldPath, FieldValue,
    UpdateTransformError, WriteRejected,
};
