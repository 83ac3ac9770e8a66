//! Test doubles and fixtures for code that calls AWS services.
//!
//! This crate provides the testing infrastructure shared by service examples:
//!
//! - **Config & markers**: the real-service switch and the `skip_if_real_aws` marker
//! - **Fixture scope**: per-test fixtures with finalizers that run at teardown
//! - **Stubbers**: per-service helpers that queue expected calls on a client
//! - **Controllers**: ordered stub sequencing with error injection
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use stubkit::s3::{S3Resource, S3Stubber};
//! use stubkit::{assert_service_error, stub_call, FixtureScope};
//! use stubkit::runner::with_stub_runner;
//!
//! #[test]
//! fn test_upload_fails_cleanly() {
//!     let mut scope = FixtureScope::from_env().unwrap();
//!     let s3 = S3Resource::in_memory(&scope.config().default_region);
//!     let stubber = scope.make_stubber::<S3Stubber>(s3.client()).unwrap();
//!     let bucket = scope.make_bucket(&stubber, &s3, None).unwrap();
//!
//!     with_stub_runner(Some("TestException"), Some("stub_put_object"), |runner| {
//!         let name = bucket.name().to_string();
//!         runner.add_call(stub_call!(stubber, stub_put_object(&name, "key", "body")));
//!     })
//!     .unwrap();
//!
//!     assert_service_error!(bucket.put_object("key", "body"), "TestException");
//!     scope.finish().unwrap();
//! }
//! ```

pub mod assertions;
pub mod client;
pub mod config;
pub mod controller;
pub mod fixtures;
pub mod marker;
pub mod registry;
pub mod runner;
pub mod s3;
pub mod scope;
pub mod stub;
pub mod stubber;

// Re-export commonly used items
pub use client::{ServiceBackend, ServiceClient};
pub use config::HarnessConfig;
pub use controller::{RunOptions, StubController, StubEntry, DEFAULT_ERROR_CODE};
pub use marker::{Marker, SetupOutcome};
pub use registry::{stubber_factory, StubberRegistry};
pub use runner::{stub_runner, with_stub_runner, ScopedStubRunner, StubRunner};
pub use scope::FixtureScope;
pub use stubber::{BaseStubber, Stubber};
pub use stubkit_util::{make_unique_name, HarnessError, StubResult};
