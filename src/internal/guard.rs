//! Cross-thread creation guard for singletons.
//!
//! Each singleton name has at most one owning thread while it is being
//! built. Other threads asking for the same name block until the owner
//! releases it. The bookkeeping lock is only held to update ownership,
//! never during construction, so unrelated names build in parallel.

use std::collections::HashMap;
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex};

/// Outcome of trying to take ownership of a name.
pub(crate) enum Acquire<'a> {
    /// The calling thread now owns the name until the ticket drops
    Owned(CreationTicket<'a>),
    /// The calling thread already owns the name: re-entrant request
    AlreadyInCreation,
    /// Waiting would deadlock: the owner (transitively) waits on this thread
    WouldDeadlock,
}

#[derive(Default)]
struct GuardState {
    owners: HashMap<String, ThreadId>,
    waiting: HashMap<ThreadId, String>,
}

#[derive(Default)]
pub(crate) struct CreationGuard {
    state: Mutex<GuardState>,
    released: Condvar,
}

impl CreationGuard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of `name` for the calling thread, blocking while
    /// another thread owns it.
    pub(crate) fn acquire(&self, name: &str) -> Acquire<'_> {
        let me = thread::current().id();
        let mut state = self.state.lock();
        loop {
            match state.owners.get(name).copied() {
                None => {
                    state.owners.insert(name.to_owned(), me);
                    return Acquire::Owned(CreationTicket {
                        guard: self,
                        name: name.to_owned(),
                    });
                }
                Some(owner) if owner == me => return Acquire::AlreadyInCreation,
                Some(owner) => {
                    if waits_on(&state, owner, me) {
                        return Acquire::WouldDeadlock;
                    }
                    state.waiting.insert(me, name.to_owned());
                    self.released.wait(&mut state);
                    state.waiting.remove(&me);
                }
            }
        }
    }

    /// Returns `true` if the calling thread currently owns `name`.
    pub(crate) fn is_owned_by_current_thread(&self, name: &str) -> bool {
        let me = thread::current().id();
        self.state.lock().owners.get(name) == Some(&me)
    }

    /// Returns `true` if any thread currently owns `name`.
    pub(crate) fn is_in_creation(&self, name: &str) -> bool {
        self.state.lock().owners.contains_key(name)
    }

    fn release(&self, name: &str) {
        self.state.lock().owners.remove(name);
        self.released.notify_all();
    }
}

/// Follows the wait-for chain starting at `owner`; `true` if it reaches `me`.
fn waits_on(state: &GuardState, owner: ThreadId, me: ThreadId) -> bool {
    let mut current = owner;
    // Each hop visits a distinct waiting thread, so the chain is bounded.
    for _ in 0..=state.waiting.len() {
        let Some(wanted) = state.waiting.get(&current) else {
            return false;
        };
        match state.owners.get(wanted) {
            Some(next) if *next == me => return true,
            Some(next) => current = *next,
            None => return false,
        }
    }
    false
}

/// Ownership of one name; released and waiters woken on drop.
pub(crate) struct CreationTicket<'a> {
    guard: &'a CreationGuard,
    name: String,
}

impl Drop for CreationTicket<'_> {
    fn drop(&mut self) {
        self.guard.release(&self.name);
    }
}
