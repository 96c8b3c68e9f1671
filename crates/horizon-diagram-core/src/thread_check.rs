//! Thread affinity checks.
//!
//! A scene and its element registry belong to the thread that created
//! them. Model notifications and gesture queries must arrive on that
//! thread. [`ThreadAffinity`] remembers the owner and checks callers
//! against it, either by panicking or by returning
//! [`CoreError::WrongThread`].
//!
//! ```
//! use horizon_diagram_core::ThreadAffinity;
//!
//! struct Registry {
//!     affinity: ThreadAffinity,
//! }
//!
//! impl Registry {
//!     fn rows_inserted(&self) {
//!         self.affinity.debug_assert_same_thread();
//!     }
//! }
//!
//! let registry = Registry { affinity: ThreadAffinity::current() };
//! registry.rows_inserted();
//! assert!(registry.affinity.check("verify").is_ok());
//! ```

use std::thread::ThreadId;

use crate::error::CoreError;

/// The thread an object belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Affinity for the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: std::thread::current().id(),
        }
    }

    #[inline]
    pub fn is_same_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }

    /// Panics when called off the owning thread.
    #[inline]
    pub fn assert_same_thread(&self) {
        if !self.is_same_thread() {
            self.panic_wrong_thread();
        }
    }

    /// [`assert_same_thread`](Self::assert_same_thread) in debug builds; a
    /// no-op in release builds.
    #[inline]
    pub fn debug_assert_same_thread(&self) {
        #[cfg(debug_assertions)]
        self.assert_same_thread();
    }

    /// Rejects `operation` with [`CoreError::WrongThread`] when called off
    /// the owning thread.
    pub fn check(&self, operation: &str) -> Result<(), CoreError> {
        if self.is_same_thread() {
            return Ok(());
        }
        tracing::warn!(
            target: crate::logging::targets::CORE,
            operation,
            "rejected call from a foreign thread"
        );
        Err(CoreError::WrongThread {
            operation: operation.to_string(),
        })
    }

    #[cold]
    #[inline(never)]
    fn panic_wrong_thread(&self) -> ! {
        let current = std::thread::current();
        panic!(
            "thread affinity violation: owned by {:?}, called from \"{}\" ({:?})",
            self.owner,
            current.name().unwrap_or("<unnamed>"),
            current.id()
        )
    }
}
