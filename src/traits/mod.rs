//! Lifecycle traits implemented by managed objects.

mod lifecycle;

pub use lifecycle::{Dispose, Initialize};
