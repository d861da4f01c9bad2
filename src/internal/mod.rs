//! Internal implementation details.

pub(crate) mod creation_stack;
pub(crate) mod dispose_bag;
pub(crate) mod guard;

pub(crate) use creation_stack::{FrameKind, StackGuard};
pub(crate) use dispose_bag::DisposeBag;
pub(crate) use guard::{Acquire, CreationGuard};
