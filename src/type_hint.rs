//! Type references for definitions and producer products.

use std::any::TypeId;
use std::fmt;

/// Reference to a concrete Rust type, standing in for a class reference.
///
/// Carries the `TypeId` for matching and the `type_name` for diagnostics.
/// Equality, ordering and hashing only look at the `TypeId`.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::TypeHint;
///
/// let hint = TypeHint::of::<String>();
/// assert!(hint.is::<String>());
/// assert!(!hint.is::<u32>());
/// assert_eq!(hint.name(), "alloc::string::String");
/// ```
#[derive(Clone, Copy)]
pub struct TypeHint {
    id: TypeId,
    name: &'static str,
}

impl TypeHint {
    /// Hint for `T`.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The `TypeId` of the referenced type.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// The `std::any::type_name` of the referenced type.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns `true` if this hint refers to `T`.
    #[inline]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Debug for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// TypeId-only comparison; the name is diagnostic
impl PartialEq for TypeHint {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeHint {}

impl std::hash::Hash for TypeHint {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
