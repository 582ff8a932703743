#![forbid(unsafe_code)]

//! Store capability flags.

use std::fmt;

use bitflags::bitflags;

use crate::error::ConfigurationError;

bitflags! {
    /// What a field store supports.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Values can be read by path.
        const READ = 1;
        /// Values can be written by path.
        const WRITE = 1 << 1;
        /// Callers can subscribe to changes at a path.
        const SUBSCRIBE = 1 << 2;
    }
}

impl Capabilities {
    /// What a binding needs from its store.
    pub const REQUIRED: Self = Self::READ.union(Self::WRITE);

    /// Check that every flag in `needed` is present.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MissingCapability`] naming the absent flags.
    pub fn require(self, needed: Self) -> Result<(), ConfigurationError> {
        let missing = needed.difference(self);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigurationError::MissingCapability { missing })
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        for (i, (name, _)) in self.iter_names().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}
