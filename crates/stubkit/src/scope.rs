//! Per-test fixture scope.
//!
//! A [`FixtureScope`] carries the harness configuration and the stubber
//! registry for one test, and owns the finalizers fixtures register during
//! setup. Finalizers run in reverse registration order when the scope is
//! finished or dropped.
//!
//! # Example
//!
//! ```rust
//! use stubkit::{FixtureScope, HarnessConfig};
//!
//! let mut scope = FixtureScope::new(HarnessConfig::stubbed());
//! scope.add_finalizer("cleanup", || Ok(()));
//! scope.finish().unwrap();
//! ```

use crate::config::HarnessConfig;
use crate::marker::{self, Marker, SetupOutcome};
use crate::registry::StubberRegistry;
use std::fmt;
use stubkit_util::StubResult;
use tracing::{debug, error, warn};

type Finalizer = Box<dyn FnOnce() -> StubResult<()>>;

pub struct FixtureScope {
    config: HarnessConfig,
    registry: StubberRegistry,
    finalizers: Vec<(String, Finalizer)>,
}

impl FixtureScope {
    /// Create a scope with the built-in stubbers.
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            config,
            registry: StubberRegistry::with_defaults(),
            finalizers: Vec::new(),
        }
    }

    /// Create a scope from the process-wide configuration.
    pub fn from_env() -> StubResult<Self> {
        Ok(Self::new(HarnessConfig::load()?.clone()))
    }

    /// Replace the stubber registry.
    pub fn with_registry(mut self, registry: StubberRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn registry(&self) -> &StubberRegistry {
        &self.registry
    }

    /// Whether the real-service flag is on.
    pub fn use_real_aws(&self) -> bool {
        self.config.use_real_aws
    }

    /// Decide whether a test carrying `markers` runs.
    pub fn setup(&self, markers: &[Marker]) -> SetupOutcome {
        marker::runtest_setup(&self.config, markers)
    }

    /// Schedule a cleanup action to run after the test body.
    pub fn add_finalizer(
        &mut self,
        name: impl Into<String>,
        finalizer: impl FnOnce() -> StubResult<()> + 'static,
    ) {
        let name = name.into();
        debug!(finalizer = %name, "Registered finalizer");
        self.finalizers.push((name, Box::new(finalizer)));
    }

    pub fn finalizer_count(&self) -> usize {
        self.finalizers.len()
    }

    /// Run all finalizers and report the first failure.
    pub fn finish(mut self) -> StubResult<()> {
        self.run_finalizers()
    }

    /// Every finalizer runs even when an earlier one fails.
    fn run_finalizers(&mut self) -> StubResult<()> {
        let mut first_error = None;
        while let Some((name, finalizer)) = self.finalizers.pop() {
            debug!(finalizer = %name, "Running finalizer");
            if let Err(e) = finalizer() {
                warn!(finalizer = %name, error = %e, "Finalizer failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for FixtureScope {
    fn drop(&mut self) {
        if let Err(e) = self.run_finalizers() {
            if std::thread::panicking() {
                error!(error = %e, "Fixture teardown failed while unwinding");
            } else {
                panic!("Fixture teardown failed: {e}");
            }
        }
    }
}

impl fmt::Debug for FixtureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixtureScope")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field(
                "finalizers",
                &self.finalizers.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
