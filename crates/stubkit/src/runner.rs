//! Scoped stub sequencing that stops at a named method.
//!
//! Stubbers and stub functions can come from any stubber. The runner adds
//! stubbed responses in order until it reaches `stop_on_method`, hands that
//! call the configured error code, and adds nothing after it. With no stop
//! method every response is added and the error code is unused, so one test
//! body covers both the success path and each failure point.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stubkit::runner::stub_runner;
//! use stubkit::s3::{S3Resource, S3Stubber};
//! use stubkit::stub_call;
//!
//! let s3 = S3Resource::in_memory("us-west-2");
//! let stubber = Arc::new(S3Stubber::new(s3.client().clone(), true));
//!
//! {
//!     let mut runner = stub_runner(Some("TestException"), Some("stub_put_object"));
//!     runner
//!         .add_call(stub_call!(stubber, stub_create_bucket("b", None)))
//!         .add_call(stub_call!(stubber, stub_put_object("b", "k", "v")));
//! } // the sequence runs here
//!
//! assert_eq!(s3.client().stubs().len(), 2);
//! ```

use crate::controller::StubEntry;
use crate::stubber::Stubber;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use stubkit_util::StubResult;
use tracing::{debug, error, warn};

struct RunnerEntry {
    service: String,
    entry: StubEntry,
}

/// Runs stub calls until the stop method is reached.
pub struct StubRunner {
    stubs: Vec<RunnerEntry>,
    error_code: Option<String>,
    stop_on_method: Option<String>,
}

impl StubRunner {
    pub fn new(error_code: Option<&str>, stop_on_method: Option<&str>) -> Self {
        Self {
            stubs: Vec::new(),
            error_code: error_code.map(String::from),
            stop_on_method: stop_on_method.map(String::from),
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn stop_on_method(&self) -> Option<&str> {
        self.stop_on_method.as_deref()
    }

    /// Add a call to `method` on `stubber`.
    ///
    /// `call` receives the stubber and the error code to pass on. `method` is
    /// only a label matched against `stop_on_method`, so it must name the
    /// stub `call` really makes. Prefer [`add_call`](Self::add_call) with
    /// [`stub_call!`](crate::stub_call), which takes the name from the method.
    pub fn add<S: Stubber>(
        &mut self,
        stubber: &Arc<S>,
        method: &str,
        call: impl Fn(&S, Option<&str>) -> StubResult<()> + 'static,
    ) -> &mut Self {
        let service = stubber.service_name().to_string();
        let stubber = Arc::clone(stubber);
        self.stubs.push(RunnerEntry {
            service,
            entry: StubEntry::new(method, move |error_code| {
                call(stubber.as_ref(), error_code)
            }),
        });
        self
    }

    /// Add a prebuilt entry, typically from [`stub_call!`](crate::stub_call).
    pub fn add_call(&mut self, entry: StubEntry) -> &mut Self {
        self.stubs.push(RunnerEntry {
            service: String::new(),
            entry,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// Names of the added calls, in order.
    pub fn names(&self) -> Vec<&str> {
        self.stubs.iter().map(|s| s.entry.name()).collect()
    }

    /// Run the calls in order and return how many were invoked.
    pub fn run(&self) -> StubResult<usize> {
        if let Some(stop) = self.stop_on_method.as_deref() {
            if !self.names().contains(&stop) {
                warn!(
                    stop_on_method = %stop,
                    stubs = ?self.names(),
                    "No stub matches the stop method, no error will be injected"
                );
            }
        }
        let mut invoked = 0;
        for stub in &self.stubs {
            let stop_here = self.stop_on_method.as_deref() == Some(stub.entry.name());
            let error_code = if stop_here {
                self.error_code.as_deref()
            } else {
                None
            };
            debug!(
                service = %stub.service,
                method = %stub.entry.name(),
                error_code = ?error_code,
                "Adding stubbed response"
            );
            stub.entry.invoke(error_code)?;
            invoked += 1;

            if stop_here {
                break;
            }
        }
        Ok(invoked)
    }
}

impl fmt::Debug for StubRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubRunner")
            .field(
                "stubs",
                &self.stubs.iter().map(|s| s.entry.name()).collect::<Vec<_>>(),
            )
            .field("error_code", &self.error_code)
            .field("stop_on_method", &self.stop_on_method)
            .finish()
    }
}

/// A [`StubRunner`] that runs when it goes out of scope.
///
/// The sequence runs on every exit path, including unwinding. Use
/// [`finish`](Self::finish) to run it early and observe the result.
#[derive(Debug)]
pub struct ScopedStubRunner {
    runner: StubRunner,
    done: bool,
}

impl ScopedStubRunner {
    /// Run the sequence now.
    pub fn finish(mut self) -> StubResult<usize> {
        self.done = true;
        self.runner.run()
    }
}

impl Deref for ScopedStubRunner {
    type Target = StubRunner;

    fn deref(&self) -> &StubRunner {
        &self.runner
    }
}

impl DerefMut for ScopedStubRunner {
    fn deref_mut(&mut self) -> &mut StubRunner {
        &mut self.runner
    }
}

impl Drop for ScopedStubRunner {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        if let Err(e) = self.runner.run() {
            if std::thread::panicking() {
                error!(error = %e, "Stub runner failed while unwinding");
            } else {
                panic!("Stub runner failed: {e}");
            }
        }
    }
}

/// Create a scoped runner.
pub fn stub_runner(error_code: Option<&str>, stop_on_method: Option<&str>) -> ScopedStubRunner {
    ScopedStubRunner {
        runner: StubRunner::new(error_code, stop_on_method),
        done: false,
    }
}

/// Populate a runner in `body`, then run it.
///
/// The sequence still runs if `body` panics.
pub fn with_stub_runner<F>(
    error_code: Option<&str>,
    stop_on_method: Option<&str>,
    body: F,
) -> StubResult<usize>
where
    F: FnOnce(&mut StubRunner),
{
    let mut runner = stub_runner(error_code, stop_on_method);
    body(&mut *runner);
    runner.finish()
}
