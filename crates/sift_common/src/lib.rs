//! Shared foundational types used across the Sift type checker.
//!
//! This crate provides interned qualified names and the common result types
//! used by every other crate in the workspace.

#![warn(missing_docs)]

pub mod name;
pub mod result;

pub use name::{Interner, Name};
pub use result::{InternalError, SiftResult};
