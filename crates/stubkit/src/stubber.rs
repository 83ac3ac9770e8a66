//! Stubbers: per-service helpers that queue expected calls on a client.
//!
//! Every stubber is constructed in one of two modes. With `use_stubs` set,
//! its `stub_*` methods queue responses on the client's stub queue. In
//! passthrough mode they do nothing, so the same test body can run against
//! the real service.

use crate::client::ServiceClient;
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use stubkit_util::StubResult;
use tracing::{debug, info};

/// Behaviour shared by all service stubbers.
pub trait Stubber: Send + Sync + 'static {
    /// The service this stubber serves, e.g. `s3`.
    fn service_name(&self) -> &str;

    /// Whether calls are stubbed (`true`) or passed through (`false`).
    fn use_stubs(&self) -> bool;

    /// Start answering client calls from the stub queue.
    fn activate(&self);

    /// Stop answering client calls from the stub queue.
    fn deactivate(&self);

    /// Fail if any queued response was never consumed.
    fn assert_no_pending_responses(&self) -> StubResult<()>;

    /// Convert into `Any` so callers can recover the concrete stubber type.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Common state for service stubbers.
///
/// Service stubbers wrap a `BaseStubber` and describe each operation through
/// [`BaseStubber::stub`], which picks between a response and an error.
#[derive(Debug, Clone)]
pub struct BaseStubber {
    client: ServiceClient,
    use_stubs: bool,
}

impl BaseStubber {
    pub fn new(client: ServiceClient, use_stubs: bool) -> Self {
        Self { client, use_stubs }
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub fn use_stubs(&self) -> bool {
        self.use_stubs
    }

    pub fn activate(&self) {
        info!(service = %self.client.service_name(), "Activating stubber");
        self.client.stubs().activate();
    }

    pub fn deactivate(&self) {
        debug!(service = %self.client.service_name(), "Deactivating stubber");
        self.client.stubs().deactivate();
    }

    pub fn assert_no_pending_responses(&self) -> StubResult<()> {
        self.client.stubs().assert_no_pending_responses()
    }

    /// Queue an expected call.
    ///
    /// Without an error code the call answers with `response`; with one it
    /// fails with that service error code. Nothing is queued in passthrough
    /// mode.
    pub fn stub(
        &self,
        operation: &str,
        expected_params: Option<Value>,
        response: Value,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        if !self.use_stubs {
            return Ok(());
        }
        self.client.check_operation(operation)?;

        let mut stubs = self.client.stubs();
        match error_code {
            None => stubs.add_response(operation, expected_params, response),
            Some(code) => stubs.add_client_error(operation, code, "", expected_params),
        }
        Ok(())
    }
}
