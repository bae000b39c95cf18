//! Conformance test helpers for the Sift incremental environment stack.
//!
//! Provides a small three-layer checker stack (source facts → class
//! metadata → globals) with stringly-typed facts, so integration tests can
//! drive the full publish → query → update → re-query cycle and assert on
//! triggered dependency sets without depending on real checker semantics.

#![warn(missing_docs)]

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use sift_common::{Interner, Name};
use sift_config::ProjectConfig;
use sift_environment::{
    Derivation, DependencyKey, Environment, LayerId, SourceEnvironment, TrackedReads, UpdateResult,
};
use sift_scheduler::Scheduler;

/// Creates a minimal `ProjectConfig` for driving updates in tests.
pub fn make_config() -> ProjectConfig {
    toml::from_str(
        r#"
[project]
name = "conformance_test"
version = "0.1.0"
"#,
    )
    .unwrap()
}

/// Class metadata derived from raw source facts.
///
/// The metadata for a class named `q` combines the class's own source fact
/// with the fact of its base pointer `q.base`, when one exists. This gives
/// every metadata entry one or two upstream reads, which is enough to
/// exercise multi-key invalidation fan-in.
pub struct MetadataOf {
    interner: Arc<Interner>,
}

impl MetadataOf {
    /// Creates the derivation over the given interner.
    pub fn new(interner: Arc<Interner>) -> Self {
        Self { interner }
    }
}

impl Derivation for MetadataOf {
    type Fact = String;
    type Upstream = SourceEnvironment<String>;
    const LAYER: LayerId = LayerId::ClassMetadata;

    fn derive(&self, upstream: &TrackedReads<'_, Self::Upstream>, key: Name) -> Option<String> {
        let own = upstream.fact(key)?;
        let base_key = self
            .interner
            .get_or_intern(&format!("{}.base", self.interner.resolve(key)));
        match upstream.fact(base_key) {
            Some(base) => Some(format!("{own} <: {base}")),
            None => Some(own.as_ref().clone()),
        }
    }
}

/// Global-name resolution over class metadata: a straight pass-through that
/// places every queried name in the outermost derived layer.
pub struct GlobalsOf;

impl Derivation for GlobalsOf {
    type Fact = String;
    type Upstream = Environment<MetadataOf>;
    const LAYER: LayerId = LayerId::Globals;

    fn derive(&self, upstream: &TrackedReads<'_, Self::Upstream>, key: Name) -> Option<String> {
        upstream.fact(key).map(|v| v.as_ref().clone())
    }
}

/// A derivation whose upstream read plan is supplied by the test.
///
/// The fact for a key concatenates the values of the upstream keys listed
/// for it, with `?` standing in for absent ones. Used by the property tests
/// to build arbitrary read graphs.
pub struct FanIn {
    reads: HashMap<Name, Vec<Name>>,
}

impl FanIn {
    /// Creates the derivation from a key → upstream-reads plan.
    pub fn new(reads: HashMap<Name, Vec<Name>>) -> Self {
        Self { reads }
    }
}

impl Derivation for FanIn {
    type Fact = String;
    type Upstream = SourceEnvironment<String>;
    const LAYER: LayerId = LayerId::Attributes;

    fn derive(&self, upstream: &TrackedReads<'_, Self::Upstream>, key: Name) -> Option<String> {
        let reads = self.reads.get(&key)?;
        let parts: Vec<String> = reads
            .iter()
            .map(|k| match upstream.fact(*k) {
                Some(v) => v.as_ref().clone(),
                None => "?".to_string(),
            })
            .collect();
        Some(parts.join("+"))
    }
}

/// A fully wired three-layer stack: source facts → class metadata → globals.
pub struct CheckerStack {
    /// Interner shared by the stack and the test.
    pub interner: Arc<Interner>,
    /// Configuration forwarded through every update.
    pub config: ProjectConfig,
    /// Scheduler shared by every update.
    pub scheduler: Scheduler,
    /// The root layer.
    pub source: Arc<SourceEnvironment<String>>,
    /// The middle derived layer.
    pub metadata: Arc<Environment<MetadataOf>>,
    /// The outermost derived layer.
    pub globals: Environment<GlobalsOf>,
}

impl CheckerStack {
    /// Builds an empty stack with a sequential scheduler.
    pub fn new() -> Self {
        Self::with_scheduler(Scheduler::sequential().unwrap())
    }

    /// Builds an empty stack over the given scheduler.
    pub fn with_scheduler(scheduler: Scheduler) -> Self {
        let interner = Arc::new(Interner::new());
        let source = Arc::new(SourceEnvironment::new());
        let metadata = Arc::new(Environment::create(
            MetadataOf::new(Arc::clone(&interner)),
            Arc::clone(&source),
        ));
        let globals = Environment::create(GlobalsOf, Arc::clone(&metadata));
        Self {
            interner,
            config: make_config(),
            scheduler,
            source,
            metadata,
            globals,
        }
    }

    /// Interns a qualified name.
    pub fn name(&self, qualified: &str) -> Name {
        self.interner.get_or_intern(qualified)
    }

    /// A `CheckModule` dependency key for the named module.
    pub fn check_module(&self, module: &str) -> DependencyKey {
        DependencyKey::CheckModule(self.name(module))
    }

    /// Publishes a source fact.
    pub fn publish(&self, qualified: &str, value: &str) {
        self.source.publish(self.name(qualified), value.to_string());
    }

    /// Queries the globals layer, optionally on behalf of a dependency.
    pub fn get_global(&self, dependency: Option<&DependencyKey>, qualified: &str) -> Option<String> {
        self.globals
            .read_only()
            .fact(dependency, self.name(qualified))
            .map(|v| v.as_ref().clone())
    }

    /// Runs the update chain for an identifier-level change set and returns
    /// the outermost result. Per-layer results are reachable through
    /// [`UpdateResult::upstream`].
    pub fn update(&self, changed: &[&str]) -> UpdateResult {
        let changed: BTreeSet<Name> = changed.iter().map(|s| self.name(s)).collect();
        let root = self.source.update(&self.scheduler, &self.config, &changed);
        let mid = self.metadata.update(&self.scheduler, &self.config, root);
        self.globals.update(&self.scheduler, &self.config, mid)
    }
}

impl Default for CheckerStack {
    fn default() -> Self {
        Self::new()
    }
}
