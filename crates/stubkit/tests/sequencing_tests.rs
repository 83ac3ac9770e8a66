//! Stub sequencing integration tests.
//!
//! Walks one scenario through every failure point with both the controller
//! and the scoped runner, and plugs a custom service stubber into the
//! registry.

use serde_json::{json, Value};
use std::any::Any;
use std::sync::{Arc, Mutex};
use stubkit::controller::{RunOptions, StubController};
use stubkit::runner::{stub_runner, with_stub_runner};
use stubkit::s3::{S3Resource, S3Stubber};
use stubkit::{
    stub_call, BaseStubber, FixtureScope, HarnessConfig, ServiceBackend, ServiceClient,
    StubResult, Stubber, StubberRegistry,
};

/// Example code under test: create a bucket, upload, then read back.
fn round_trip(s3: &S3Resource, bucket_name: &str) -> StubResult<String> {
    let bucket = s3.create_bucket(bucket_name, None)?;
    bucket.put_object("greeting", "hello")?;
    bucket.get_object("greeting")
}

const STEPS: &[&str] = &["stub_create_bucket", "stub_put_object", "stub_get_object"];

#[test]
fn test_controller_walks_every_failure_point() {
    for fail_at in std::iter::once(None).chain(STEPS.iter().copied().map(Some)) {
        let s3 = S3Resource::in_memory("us-west-2");
        let mut scope = FixtureScope::new(HarnessConfig::stubbed());
        let stubber = scope.make_stubber::<S3Stubber>(s3.client()).unwrap();

        let mut controller = StubController::new();
        controller
            .add(stub_call!(stubber, stub_create_bucket("rt", None)))
            .add(stub_call!(stubber, stub_put_object("rt", "greeting", "hello")))
            .add(stub_call!(stubber, stub_get_object("rt", "greeting", "hello")));

        let options = match fail_at {
            Some(step) => RunOptions::failing(step),
            None => RunOptions::default(),
        };
        controller.run(&options).unwrap();

        let result = round_trip(&s3, "rt");
        match fail_at {
            None => assert_eq!(result.unwrap(), "hello"),
            Some(step) => {
                let err = result.expect_err(step);
                assert!(err.is_service_error("TestException"), "{step}: {err}");
            }
        }

        scope.finish().unwrap_or_else(|e| panic!("{fail_at:?}: {e}"));
    }
}

#[test]
fn test_runner_walks_every_failure_point() {
    for fail_at in std::iter::once(None).chain(STEPS.iter().copied().map(Some)) {
        let s3 = S3Resource::in_memory("us-west-2");
        let mut scope = FixtureScope::new(HarnessConfig::stubbed());
        let stubber = scope.make_stubber::<S3Stubber>(s3.client()).unwrap();

        with_stub_runner(Some("AccessDenied"), fail_at, |runner| {
            runner
                .add(&stubber, "stub_create_bucket", |s, err| {
                    s.stub_create_bucket("rt", None, err)
                })
                .add(&stubber, "stub_put_object", |s, err| {
                    s.stub_put_object("rt", "greeting", "hello", err)
                })
                .add(&stubber, "stub_get_object", |s, err| {
                    s.stub_get_object("rt", "greeting", "hello", err)
                });
        })
        .unwrap();

        match (fail_at, round_trip(&s3, "rt")) {
            (None, Ok(body)) => assert_eq!(body, "hello"),
            (Some(_), Err(err)) => assert!(err.is_service_error("AccessDenied")),
            (step, result) => panic!("{step:?}: unexpected {result:?}"),
        }

        scope.finish().unwrap();
    }
}

#[test]
fn test_scoped_runner_runs_at_end_of_block() {
    let s3 = S3Resource::in_memory("us-west-2");
    let mut scope = FixtureScope::new(HarnessConfig::stubbed());
    let stubber = scope.make_stubber::<S3Stubber>(s3.client()).unwrap();

    {
        let mut runner = stub_runner(Some("NoSuchBucket"), Some("stub_head_bucket"));
        runner.add_call(stub_call!(stubber, stub_head_bucket("missing")));
        runner.add_call(stub_call!(stubber, stub_delete_bucket("missing")));
    }

    assert!(!s3.bucket("missing").exists().unwrap());
    scope.finish().unwrap();
}

#[test]
fn test_same_named_entries_only_first_runs() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut controller = StubController::new();
    for index in 0..3 {
        let calls = calls.clone();
        controller.add_fn("op", move |error_code| {
            calls
                .lock()
                .unwrap()
                .push((index, error_code.map(String::from)));
            Ok(())
        });
    }

    controller.run(&RunOptions::failing("op")).unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![(0, Some("TestException".to_string()))]
    );
}

/// A queue service stubber defined outside the crate.
struct SqsStubber {
    base: BaseStubber,
}

impl SqsStubber {
    fn stub_send_message(&self, queue_url: &str, body: &str, error_code: Option<&str>) -> StubResult<()> {
        self.base.stub(
            "SendMessage",
            Some(json!({ "QueueUrl": queue_url, "MessageBody": body })),
            json!({ "MessageId": "m-1" }),
            error_code,
        )
    }
}

impl Stubber for SqsStubber {
    fn service_name(&self) -> &str {
        self.base.client().service_name()
    }
    fn use_stubs(&self) -> bool {
        self.base.use_stubs()
    }
    fn activate(&self) {
        self.base.activate();
    }
    fn deactivate(&self) {
        self.base.deactivate();
    }
    fn assert_no_pending_responses(&self) -> StubResult<()> {
        self.base.assert_no_pending_responses()
    }
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

struct Unreachable;

impl ServiceBackend for Unreachable {
    fn call(&self, operation: &str, _params: &Value) -> StubResult<Value> {
        panic!("{operation} reached the backend while stubbed");
    }
}

#[test]
fn test_custom_stubber_from_registry() {
    let registry = StubberRegistry::with_defaults().with_stubber("sqs", |client, use_stubs| {
        SqsStubber {
            base: BaseStubber::new(client.clone(), use_stubs),
        }
    });
    assert_eq!(registry.services(), vec!["s3", "sqs"]);

    let client = ServiceClient::new("sqs", "us-west-2", &["SendMessage"], Arc::new(Unreachable));
    let mut scope = FixtureScope::new(HarnessConfig::stubbed()).with_registry(registry);
    let stubber = scope.make_stubber::<SqsStubber>(&client).unwrap();

    let mut controller = StubController::new();
    controller.add(stub_call!(stubber, stub_send_message("https://queue", "hi")));
    controller.run_all().unwrap();

    let response = client
        .call("SendMessage", json!({ "QueueUrl": "https://queue", "MessageBody": "hi" }))
        .unwrap();
    assert_eq!(response["MessageId"], "m-1");

    scope.finish().unwrap();
}
