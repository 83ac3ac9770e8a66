//! The queue of stubbed responses behind a service client.
//!
//! A [`StubQueue`] holds the calls a test expects, in order. While the queue
//! is active, each client call must match the operation (and, when given,
//! the parameters) of the entry at the head of the queue. Matching entries
//! are consumed and their response or client error is returned.

use serde_json::Value;
use std::collections::VecDeque;
use stubkit_util::{HarnessError, StubResult};
use tracing::debug;

/// Sentinel that matches any value in expected parameters.
pub const ANY: &str = "<stubkit:any>";

/// Build the [`ANY`] sentinel as a JSON value.
pub fn any() -> Value {
    Value::String(ANY.to_string())
}

/// What a stubbed call produces when consumed.
#[derive(Debug, Clone, PartialEq)]
pub enum StubbedOutcome {
    /// Return this service response.
    Response(Value),
    /// Fail with a service error.
    ClientError { code: String, message: String },
}

/// A single expected call.
#[derive(Debug, Clone, PartialEq)]
pub struct StubbedCall {
    /// Operation name, e.g. `CreateBucket`.
    pub operation: String,
    /// Parameters the call must carry. `None` accepts anything.
    pub expected_params: Option<Value>,
    /// Response or error to produce.
    pub outcome: StubbedOutcome,
}

/// Ordered queue of expected calls for one client.
#[derive(Debug, Default)]
pub struct StubQueue {
    active: bool,
    calls: VecDeque<StubbedCall>,
    consumed: usize,
}

impl StubQueue {
    /// Create an inactive, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start intercepting client calls.
    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Stop intercepting client calls. Queued entries are kept.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Queue a successful response.
    pub fn add_response(
        &mut self,
        operation: impl Into<String>,
        expected_params: Option<Value>,
        response: Value,
    ) {
        let operation = operation.into();
        debug!(operation = %operation, "Queued stubbed response");
        self.calls.push_back(StubbedCall {
            operation,
            expected_params,
            outcome: StubbedOutcome::Response(response),
        });
    }

    /// Queue a service error.
    pub fn add_client_error(
        &mut self,
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        expected_params: Option<Value>,
    ) {
        let operation = operation.into();
        let code = code.into();
        debug!(operation = %operation, code = %code, "Queued stubbed client error");
        self.calls.push_back(StubbedCall {
            operation,
            expected_params,
            outcome: StubbedOutcome::ClientError {
                code,
                message: message.into(),
            },
        });
    }

    /// Consume the head of the queue for a call to `operation` with `params`.
    ///
    /// A mismatched call leaves the queue untouched.
    pub fn next_response(&mut self, operation: &str, params: &Value) -> StubResult<Value> {
        let Some(head) = self.calls.front() else {
            return Err(HarnessError::NoStubbedResponse {
                operation: operation.to_string(),
            });
        };

        if head.operation != operation {
            return Err(HarnessError::UnexpectedCall {
                expected: head.operation.clone(),
                actual: operation.to_string(),
            });
        }

        if let Some(expected) = &head.expected_params {
            if !params_match(expected, params) {
                return Err(HarnessError::ParamMismatch {
                    operation: operation.to_string(),
                    expected: expected.clone(),
                    actual: params.clone(),
                });
            }
        }

        let call = self
            .calls
            .pop_front()
            .ok_or_else(|| HarnessError::NoStubbedResponse {
                operation: operation.to_string(),
            })?;
        self.consumed += 1;
        debug!(operation, remaining = self.calls.len(), "Consumed stubbed call");

        match call.outcome {
            StubbedOutcome::Response(response) => Ok(response),
            StubbedOutcome::ClientError { code, message } => {
                Err(HarnessError::Service { code, message })
            }
        }
    }

    /// Operation names still waiting to be consumed, in order.
    pub fn pending(&self) -> Vec<String> {
        self.calls.iter().map(|c| c.operation.clone()).collect()
    }

    /// Number of calls consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Fail if any queued call was never made.
    pub fn assert_no_pending_responses(&self) -> StubResult<()> {
        if self.calls.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::PendingResponses(self.pending()))
        }
    }
}

/// Structural comparison where [`ANY`] matches any actual value.
pub fn params_match(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::String(s), _) if s == ANY => true,
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len()
                && e.iter()
                    .all(|(k, ev)| a.get(k).is_some_and(|av| params_match(ev, av)))
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(ev, av)| params_match(ev, av))
        }
        _ => expected == actual,
    }
}
