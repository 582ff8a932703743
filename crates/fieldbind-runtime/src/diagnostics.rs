#![forbid(unsafe_code)]

//! Diagnostic channel for failures a binding swallows.
//!
//! Updaters never return errors to their callers. A failing transformer or a
//! rejected write becomes a [`Diagnostic`] handed to a [`DiagnosticSink`].
//!
//! | Sink | Use |
//! |------|-----|
//! | [`TracingSink`] | Default. Emits `tracing` warnings under target `fieldbind`. |
//! | [`RecordingSink`] | Keeps diagnostics in memory for tests and host inspection. |

use std::cell::RefCell;
use std::fmt;

use fieldbind_core::{FieldPath, UpdateTransformError, WriteRejected};

/// Log target used by every fieldbind event.
pub const TARGET: &str = "fieldbind";

/// A failure that was reported instead of propagated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// An update transformer failed; nothing was written.
    TransformFailed(UpdateTransformError),
    /// The store refused a write (explicit update or hydration).
    WriteRejected(WriteRejected),
}

impl Diagnostic {
    /// The field the diagnostic is about.
    #[must_use]
    pub fn path(&self) -> &FieldPath {
        match self {
            Self::TransformFailed(err) => err.path(),
            Self::WriteRejected(err) => &err.path,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransformFailed(err) => fmt::Display::fmt(err, f),
            Self::WriteRejected(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl From<UpdateTransformError> for Diagnostic {
    fn from(err: UpdateTransformError) -> Self {
        Self::TransformFailed(err)
    }
}

impl From<WriteRejected> for Diagnostic {
    fn from(err: WriteRejected) -> Self {
        Self::WriteRejected(err)
    }
}

/// Receiver for swallowed failures.
pub trait DiagnosticSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at `WARN`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match &diagnostic {
            Diagnostic::TransformFailed(err) => tracing::warn!(
                target: TARGET,
                path = %err.path(),
                error = %err,
                "field update skipped"
            ),
            Diagnostic::WriteRejected(err) => tracing::warn!(
                target: TARGET,
                path = %err.path,
                reason = %err.reason,
                "field write rejected"
            ),
        }
    }
}

/// Collects diagnostics in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Diagnostic>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics received so far.
    #[must_use]
    pub fn events(&self) -> Vec<Diagnostic> {
        self.events.borrow().clone()
    }

    /// Remove and return everything received so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.events.borrow_mut().push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transform_failure() -> Diagnostic {
        UpdateTransformError::Failed {
            path: FieldPath::parse("age").unwrap(),
            message: "not a number".into(),
        }
        .into()
    }

    #[test]
    fn recording_sink_collects_and_drains() {
        let sink = RecordingSink::new();
        assert!(sink.is_empty());
        sink.report(transform_failure());
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.events()[0].path().as_str(), "age");

        let drained = sink.take();
        assert_eq!(drained.len(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn display_delegates_to_error() {
        let rejected: Diagnostic =
            WriteRejected::new(FieldPath::parse("name").unwrap(), "frozen").into();
        assert_eq!(rejected.to_string(), "store rejected write to `name`: frozen");
        assert_eq!(
            transform_failure().to_string(),
            "update of `age` failed: not a number"
        );
    }

    #[test]
    fn tracing_sink_reports_under_subscriber() {
        let subscriber = tracing_subscriber::registry();
        tracing::subscriber::with_default(subscriber, || {
            TracingSink.report(transform_failure());
            TracingSink.report(
                WriteRejected::new(FieldPath::parse("name").unwrap(), "frozen").into(),
            );
        });
    }
}
