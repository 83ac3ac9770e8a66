//! Service clients that can be switched between stubbing and passthrough.
//!
//! A [`ServiceClient`] forwards every call either to its [`StubQueue`]
//! (while stubbing is active) or to a [`ServiceBackend`], which plays the
//! role of the real service.

use crate::stub::StubQueue;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use stubkit_util::{HarnessError, StubResult};
use tracing::debug;

/// The service a client talks to when calls are not stubbed.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceBackend: Send + Sync {
    /// Execute an operation against the service.
    fn call(&self, operation: &str, params: &Value) -> StubResult<Value>;
}

/// A cloneable handle to a service client.
///
/// Clones share the same stub queue and backend.
#[derive(Clone)]
pub struct ServiceClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    service_name: String,
    region: String,
    operations: Vec<String>,
    backend: Arc<dyn ServiceBackend>,
    stubs: Mutex<StubQueue>,
}

impl ServiceClient {
    /// Create a client for `service_name` in `region`.
    ///
    /// With an empty operation list any operation name is accepted.
    pub fn new(
        service_name: impl Into<String>,
        region: impl Into<String>,
        operations: &[&str],
        backend: Arc<dyn ServiceBackend>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                service_name: service_name.into(),
                region: region.into(),
                operations: operations.iter().map(|op| op.to_string()).collect(),
                backend,
                stubs: Mutex::new(StubQueue::new()),
            }),
        }
    }

    /// The service name used to look up stubbers, e.g. `s3`.
    pub fn service_name(&self) -> &str {
        &self.inner.service_name
    }

    pub fn region(&self) -> &str {
        &self.inner.region
    }

    /// Check whether the service model knows `operation`.
    pub fn supports_operation(&self, operation: &str) -> bool {
        self.inner.operations.is_empty() || self.inner.operations.iter().any(|op| op == operation)
    }

    /// Fail with [`HarnessError::UnknownOperation`] unless `operation` is known.
    pub fn check_operation(&self, operation: &str) -> StubResult<()> {
        if self.supports_operation(operation) {
            Ok(())
        } else {
            Err(HarnessError::UnknownOperation {
                service: self.inner.service_name.clone(),
                operation: operation.to_string(),
            })
        }
    }

    /// Lock the stub queue.
    ///
    /// A poisoned lock is recovered so teardown still works after a panicking test.
    pub fn stubs(&self) -> MutexGuard<'_, StubQueue> {
        self.inner
            .stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Invoke an operation.
    pub fn call(&self, operation: &str, params: Value) -> StubResult<Value> {
        self.check_operation(operation)?;

        {
            let mut stubs = self.stubs();
            if stubs.is_active() {
                debug!(
                    service = %self.inner.service_name,
                    operation,
                    "Answering call from stub queue"
                );
                return stubs.next_response(operation, &params);
            }
        }

        debug!(
            service = %self.inner.service_name,
            operation,
            "Passing call through to backend"
        );
        self.inner.backend.call(operation, &params)
    }
}

impl fmt::Debug for ServiceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceClient")
            .field("service_name", &self.inner.service_name)
            .field("region", &self.inner.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_with(backend: MockServiceBackend) -> ServiceClient {
        ServiceClient::new("s3", "us-west-2", &["HeadBucket"], Arc::new(backend))
    }

    #[test]
    fn test_passthrough_calls_backend() {
        let mut backend = MockServiceBackend::new();
        backend
            .expect_call()
            .withf(|operation, params| {
                operation == "HeadBucket" && params == &json!({"Bucket": "b"})
            })
            .times(1)
            .returning(|_, _| Ok(json!({})));

        let client = client_with(backend);
        assert_eq!(client.call("HeadBucket", json!({"Bucket": "b"})).unwrap(), json!({}));
    }

    #[test]
    fn test_active_stubs_bypass_backend() {
        let mut backend = MockServiceBackend::new();
        backend.expect_call().never();

        let client = client_with(backend);
        {
            let mut stubs = client.stubs();
            stubs.add_response("HeadBucket", None, json!({"stubbed": true}));
            stubs.activate();
        }

        assert_eq!(
            client.call("HeadBucket", json!({})).unwrap(),
            json!({"stubbed": true})
        );
    }

    #[test]
    fn test_unknown_operation_is_rejected() {
        let mut backend = MockServiceBackend::new();
        backend.expect_call().never();

        let client = client_with(backend);
        let err = client.call("LaunchRocket", json!({})).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownOperation { .. }));
    }

    #[test]
    fn test_clones_share_stub_queue() {
        let client = client_with(MockServiceBackend::new());
        let other = client.clone();
        client.stubs().add_response("HeadBucket", None, json!({}));
        assert_eq!(other.stubs().len(), 1);
        assert_eq!(other.service_name(), "s3");
        assert_eq!(other.region(), "us-west-2");
    }

    #[test]
    fn test_empty_operation_list_accepts_anything() {
        let client = ServiceClient::new("custom", "eu-west-1", &[], Arc::new(MockServiceBackend::new()));
        assert!(client.supports_operation("Anything"));
    }
}
