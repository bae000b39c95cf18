//! Incremental, dependency-tracked environment layers for the Sift checker.
//!
//! Type checking a dynamically typed language builds several layers of
//! derived knowledge over parsed sources (class hierarchies, class metadata,
//! attribute tables, global scopes). Re-deriving everything on each edit is
//! too slow for interactive use, so each layer is an incremental environment:
//! it caches query results over its upstream layer, records which consumer
//! read which fact, and on upstream change evicts only the stale entries,
//! handing the next layer the minimal set of dependency keys whose work must
//! be redone.
//!
//! # Usage
//!
//! ```ignore
//! let source = Arc::new(SourceEnvironment::new());
//! let globals = Environment::create(GlobalsOf::new(interner), Arc::clone(&source));
//!
//! let fact = globals.read_only().fact(Some(&DependencyKey::CheckModule(m)), key);
//!
//! let root_result = source.update(&scheduler, &config, &changed_names);
//! let result = globals.update(&scheduler, &config, root_result);
//! for dep in result.triggered() { /* re-run the named work */ }
//! ```

#![warn(missing_docs)]

pub mod dependency;
pub mod environment;
pub mod source;
mod table;
pub mod update;
pub mod view;

pub use dependency::{DependencyKey, LayerId};
pub use environment::{Derivation, Environment, FactLookup};
pub use source::SourceEnvironment;
pub use table::EnvironmentStats;
pub use update::UpdateResult;
pub use view::{ReadOnly, TrackedReads};
