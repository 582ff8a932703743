#![forbid(unsafe_code)]

//! Change notification for in-memory stores.
//!
//! [`FormState`](crate::FormState) keeps its tree in an [`Observable`] and
//! turns [`FieldStore::watch`](crate::FieldStore::watch) into a filtered
//! [`Observable::subscribe`]. A [`Subscription`] keeps the callback alive;
//! dropping it unsubscribes.
//!
//! # Invariants
//!
//! 1. The version moves only when a write changes the value.
//! 2. Subscribers run in the order they subscribed.
//! 3. Callbacks run with no borrow held, so a watcher may write back. After a
//!    write-back, the remaining subscribers see only the newer value.

pub mod observable;

pub use observable::{Observable, Subscription};
