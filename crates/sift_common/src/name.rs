//! Interned qualified names for cheap cloning and O(1) equality comparison.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// A fully qualified name of any entity known to the checker.
///
/// Names are interned strings represented as a `u32` index into a string
/// interner. This provides O(1) equality, O(1) cloning, and a total order
/// (intern order, not lexicographic) so names can key ordered sets and maps
/// with deterministic iteration.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Name(u32);

impl Name {
    /// Creates a `Name` from a raw `u32` index.
    ///
    /// This is primarily intended for deserialization and testing.
    /// In normal use, names should be created through [`Interner::get_or_intern`].
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index of this name.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: `Name` wraps a `u32` which is always a valid `usize` on 32-bit and
// 64-bit platforms. `try_from_usize` rejects values that don't fit in `u32`.
unsafe impl lasso::Key for Name {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Name)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// All module qualifiers, class names, and attribute paths are interned to
/// provide O(1) equality, O(1) cloning, and string deduplication across a
/// checking session. The interner is owned by the driver and passed
/// explicitly; it is never a process-wide singleton.
pub struct Interner {
    rodeo: ThreadedRodeo<Name>,
}

impl Interner {
    /// Creates a new empty interner.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns a string, returning its [`Name`]. If the string was already
    /// interned, returns the existing name without allocating.
    pub fn get_or_intern(&self, s: &str) -> Name {
        self.rodeo.get_or_intern(s)
    }

    /// Resolves a [`Name`] back to its string value.
    ///
    /// # Panics
    ///
    /// Panics if the `Name` was not created by this interner.
    pub fn resolve(&self, name: Name) -> &str {
        self.rodeo.resolve(&name)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
