//! Per-thread creation stack.
//!
//! Every bean construction pushes a frame for the duration of its own
//! synchronous extent. The stack answers two questions: "is this thread
//! already building `name`?" (re-entry is a cycle for non-singletons) and
//! "how did we get here?" (the path reported in `CircularReference`).

use std::cell::RefCell;

use crate::error::{BeanError, BeanResult};

thread_local! {
    static CREATION_TLS: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// What kind of construction a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrameKind {
    Singleton,
    /// Prototype or custom-scope construction: re-entry is never legal
    Independent,
}

struct Frame {
    factory: u64,
    name: String,
    kind: FrameKind,
}

/// Guard for one frame of the thread-local creation stack
pub(crate) struct StackGuard {
    factory: u64,
}

impl StackGuard {
    /// Pushes `name` onto this thread's stack.
    ///
    /// Fails with `CircularReference` when an independent frame for the same
    /// bean is already active, and with `DepthExceeded` past `max_depth`.
    pub(crate) fn push(
        factory: u64,
        name: &str,
        kind: FrameKind,
        max_depth: usize,
    ) -> BeanResult<Self> {
        CREATION_TLS.with(|tls| {
            let mut stack = tls.borrow_mut();

            // Cycle detection before pushing the new frame
            if kind == FrameKind::Independent
                && stack
                    .iter()
                    .any(|f| f.factory == factory && f.kind == FrameKind::Independent && f.name == name)
            {
                return Err(BeanError::CircularReference {
                    name: name.to_owned(),
                    path: path_of(&stack, factory, name),
                });
            }

            if stack.len() >= max_depth {
                return Err(BeanError::DepthExceeded(stack.len()));
            }

            stack.push(Frame {
                factory,
                name: name.to_owned(),
                kind,
            });
            Ok(Self { factory })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        CREATION_TLS.with(|tls| {
            let popped = tls.borrow_mut().pop();
            debug_assert!(popped.is_some_and(|f| f.factory == self.factory));
        });
    }
}

/// Returns `true` if this thread has an active independent frame for `name`.
pub(crate) fn is_independent_in_creation(factory: u64, name: &str) -> bool {
    CREATION_TLS.with(|tls| {
        tls.borrow()
            .iter()
            .any(|f| f.factory == factory && f.kind == FrameKind::Independent && f.name == name)
    })
}

/// The chain of beans from the first active frame for `name` to the top of
/// the stack, closed with `name` again.
pub(crate) fn cycle_path(factory: u64, name: &str) -> Vec<String> {
    CREATION_TLS.with(|tls| path_of(&tls.borrow(), factory, name))
}

/// This thread's active frames for `factory`, outermost first.
pub(crate) fn current_chain(factory: u64) -> Vec<String> {
    CREATION_TLS.with(|tls| {
        tls.borrow()
            .iter()
            .filter(|f| f.factory == factory)
            .map(|f| f.name.clone())
            .collect()
    })
}

fn path_of(stack: &[Frame], factory: u64, name: &str) -> Vec<String> {
    let start = stack
        .iter()
        .position(|f| f.factory == factory && f.name == name)
        .unwrap_or(stack.len());
    let mut path: Vec<String> = stack[start..]
        .iter()
        .filter(|f| f.factory == factory)
        .map(|f| f.name.clone())
        .collect();
    path.push(name.to_owned());
    path
}
