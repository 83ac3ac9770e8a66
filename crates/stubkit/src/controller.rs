//! Ordered stub sequencing with error injection.
//!
//! A [`StubController`] collects stub calls in registration order and runs
//! them, injecting an error code into the calls whose name matches
//! [`RunOptions::func_name`]. A test can then walk the same scenario once per
//! step, failing at a different step each time.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stubkit::controller::{RunOptions, StubController};
//! use stubkit::s3::{S3Resource, S3Stubber};
//! use stubkit::stub_call;
//!
//! let s3 = S3Resource::in_memory("us-west-2");
//! let stubber = Arc::new(S3Stubber::new(s3.client().clone(), true));
//!
//! let mut controller = StubController::new();
//! controller.add(stub_call!(stubber, stub_create_bucket("b", Some("us-west-2"))));
//! controller.add(stub_call!(stubber, stub_put_object("b", "k", "v")));
//!
//! // Fail on the upload; nothing after it is stubbed.
//! controller.run(&RunOptions::failing("stub_put_object")).unwrap();
//! ```

use std::fmt;
use stubkit_util::StubResult;
use tracing::debug;

/// Error code injected when none is given.
pub const DEFAULT_ERROR_CODE: &str = "TestException";

type StubFn = Box<dyn Fn(Option<&str>) -> StubResult<()>>;

/// A named stub call that accepts the error code to inject.
pub struct StubEntry {
    name: String,
    call: StubFn,
}

impl StubEntry {
    pub fn new(
        name: impl Into<String>,
        call: impl Fn(Option<&str>) -> StubResult<()> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            call: Box::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, error_code: Option<&str>) -> StubResult<()> {
        (self.call)(error_code)
    }
}

impl fmt::Debug for StubEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Build a [`StubEntry`] from a stubber method call.
///
/// The entry is named after the method, and the error code is appended as
/// the method's last argument when the entry runs.
#[macro_export]
macro_rules! stub_call {
    ($stubber:expr, $method:ident ( $($arg:expr),* $(,)? )) => {{
        let stubber = ::std::sync::Arc::clone(&$stubber);
        $crate::controller::StubEntry::new(
            stringify!($method),
            move |error_code: Option<&str>| stubber.$method($($arg,)* error_code),
        )
    }};
}

/// How [`StubController::run`] injects errors and when it stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Entries with this name receive `error_code`.
    pub func_name: Option<String>,
    pub error_code: String,
    /// Stop after the first entry that received an error.
    pub stop_on_error: bool,
    /// Stop after the first entry.
    pub stop_always: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            func_name: None,
            error_code: DEFAULT_ERROR_CODE.to_string(),
            stop_on_error: true,
            stop_always: false,
        }
    }
}

impl RunOptions {
    /// Inject the default error code into `func_name`.
    pub fn failing(func_name: impl Into<String>) -> Self {
        Self {
            func_name: Some(func_name.into()),
            ..Self::default()
        }
    }

    pub fn with_error_code(mut self, error_code: impl Into<String>) -> Self {
        self.error_code = error_code.into();
        self
    }

    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    pub fn with_stop_always(mut self, stop_always: bool) -> Self {
        self.stop_always = stop_always;
        self
    }
}

/// An ordered list of stub calls.
#[derive(Debug, Default)]
pub struct StubController {
    stubs: Vec<StubEntry>,
}

impl StubController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stub call.
    pub fn add(&mut self, entry: StubEntry) -> &mut Self {
        self.stubs.push(entry);
        self
    }

    /// Append a closure as a stub call named `name`.
    pub fn add_fn(
        &mut self,
        name: impl Into<String>,
        call: impl Fn(Option<&str>) -> StubResult<()> + 'static,
    ) -> &mut Self {
        self.add(StubEntry::new(name, call))
    }

    pub fn len(&self) -> usize {
        self.stubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }

    /// Names of the registered calls, in order.
    pub fn names(&self) -> Vec<&str> {
        self.stubs.iter().map(StubEntry::name).collect()
    }

    /// Run every call with no error injected.
    pub fn run_all(&self) -> StubResult<usize> {
        self.run(&RunOptions::default())
    }

    /// Run the calls in order and return how many were invoked.
    ///
    /// With both stop flags off every entry runs, even after an injected error.
    /// An empty error code does not count as an injected error for
    /// `stop_on_error`.
    pub fn run(&self, options: &RunOptions) -> StubResult<usize> {
        let mut invoked = 0;
        for stub in &self.stubs {
            let stub_error = match &options.func_name {
                Some(name) if name == stub.name() => Some(options.error_code.as_str()),
                _ => None,
            };
            debug!(stub = %stub.name(), error_code = ?stub_error, "Running stub");
            stub.invoke(stub_error)?;
            invoked += 1;

            let injected = stub_error.is_some_and(|code| !code.is_empty());
            if options.stop_always || (options.stop_on_error && injected) {
                break;
            }
        }
        Ok(invoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use stubkit_util::HarnessError;

    type Calls = Rc<RefCell<Vec<(usize, Option<String>)>>>;

    fn recording(controller: &mut StubController, names: &[&str]) -> Calls {
        let calls: Calls = Rc::new(RefCell::new(Vec::new()));
        for (index, name) in names.iter().enumerate() {
            let calls = calls.clone();
            controller.add_fn(*name, move |error_code| {
                calls
                    .borrow_mut()
                    .push((index, error_code.map(String::from)));
                Ok(())
            });
        }
        calls
    }

    #[test]
    fn test_unmatched_name_runs_everything_without_error() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b", "c"]);

        let invoked = controller.run(&RunOptions::failing("zzz")).unwrap();
        assert_eq!(invoked, 3);
        assert_eq!(*calls.borrow(), vec![(0, None), (1, None), (2, None)]);
    }

    #[test]
    fn test_run_all_injects_nothing() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b"]);

        assert_eq!(controller.run_all().unwrap(), 2);
        assert!(calls.borrow().iter().all(|(_, err)| err.is_none()));
    }

    #[test]
    fn test_stop_on_error_stops_at_match() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b", "c"]);

        let invoked = controller.run(&RunOptions::failing("b")).unwrap();
        assert_eq!(invoked, 2);
        assert_eq!(
            *calls.borrow(),
            vec![(0, None), (1, Some(DEFAULT_ERROR_CODE.to_string()))]
        );
    }

    #[test]
    fn test_same_name_entries_stop_after_first() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["op", "op", "op"]);

        let invoked = controller.run(&RunOptions::failing("op")).unwrap();
        assert_eq!(invoked, 1);
        assert_eq!(*calls.borrow(), vec![(0, Some("TestException".to_string()))]);
    }

    #[test]
    fn test_stop_always_runs_one_entry() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b", "c"]);

        let options = RunOptions::default().with_stop_always(true);
        assert_eq!(controller.run(&options).unwrap(), 1);
        assert_eq!(*calls.borrow(), vec![(0, None)]);
    }

    #[test]
    fn test_no_stop_flags_runs_through_error() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b", "c"]);

        let options = RunOptions::failing("b")
            .with_error_code("AccessDenied")
            .with_stop_on_error(false);
        assert_eq!(controller.run(&options).unwrap(), 3);
        assert_eq!(
            *calls.borrow(),
            vec![(0, None), (1, Some("AccessDenied".to_string())), (2, None)]
        );
    }

    #[test]
    fn test_empty_error_code_does_not_stop() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a", "b", "c"]);

        let options = RunOptions::failing("b").with_error_code("");
        assert_eq!(controller.run(&options).unwrap(), 3);
        assert_eq!(
            *calls.borrow(),
            vec![(0, None), (1, Some(String::new())), (2, None)]
        );
    }

    #[test]
    fn test_failing_stub_aborts_run() {
        let mut controller = StubController::new();
        controller.add_fn("bad", |_| Err(HarnessError::Config("broken stub".into())));
        let calls = recording(&mut controller, &["after"]);

        assert!(controller.run_all().is_err());
        assert!(calls.borrow().is_empty());
    }

    #[test]
    fn test_run_is_repeatable() {
        let mut controller = StubController::new();
        let calls = recording(&mut controller, &["a"]);

        controller.run_all().unwrap();
        controller.run_all().unwrap();
        assert_eq!(calls.borrow().len(), 2);
    }

    #[test]
    fn test_names_and_len() {
        let mut controller = StubController::new();
        assert!(controller.is_empty());
        recording(&mut controller, &["x", "y"]);
        assert_eq!(controller.len(), 2);
        assert_eq!(controller.names(), vec!["x", "y"]);
    }

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert_eq!(options.func_name, None);
        assert_eq!(options.error_code, "TestException");
        assert!(options.stop_on_error);
        assert!(!options.stop_always);
    }
}
