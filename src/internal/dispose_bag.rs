//! Internal disposal bag for scope destruction callbacks.

use std::panic::{self, AssertUnwindSafe};

use crate::scope::DestructionCallback;

/// Container for destruction callbacks with LIFO execution order.
#[derive(Default)]
pub(crate) struct DisposeBag {
    callbacks: Vec<(String, DestructionCallback)>,
}

impl DisposeBag {
    /// Add a destruction callback for `name`, replacing an earlier one.
    pub(crate) fn push(&mut self, name: &str, callback: DestructionCallback) {
        self.callbacks.retain(|(n, _)| n != name);
        self.callbacks.push((name.to_owned(), callback));
    }

    /// Take the callback registered for `name`, if any.
    pub(crate) fn take(&mut self, name: &str) -> Option<DestructionCallback> {
        let pos = self.callbacks.iter().position(|(n, _)| n == name)?;
        Some(self.callbacks.remove(pos).1)
    }

    /// Execute all callbacks in reverse order (LIFO).
    ///
    /// A panicking callback is logged and does not stop the remaining ones.
    pub(crate) fn run_all_reverse(&mut self) {
        while let Some((name, f)) = self.callbacks.pop() {
            if panic::catch_unwind(AssertUnwindSafe(f)).is_err() {
                tracing::warn!(target: "ferrous_beans", bean = %name, "destruction callback panicked");
            }
        }
    }
}
