//! Amazon S3 test doubles.
//!
//! - [`S3Stubber`] queues expected S3 calls.
//! - [`S3Resource`] and [`Bucket`] are a small resource-style API over an
//!   S3 [`ServiceClient`].
//! - [`InMemoryS3`] is a passthrough backend that keeps buckets and objects
//!   in memory, standing in for the real service.

use crate::client::{ServiceBackend, ServiceClient};
use crate::stubber::{BaseStubber, Stubber};
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use stubkit_util::{HarnessError, StubResult};
use tracing::debug;

/// Service name used for stubber lookup.
pub const SERVICE_NAME: &str = "s3";

/// Operations the S3 doubles understand.
pub const OPERATIONS: &[&str] = &[
    "CreateBucket",
    "HeadBucket",
    "DeleteBucket",
    "PutObject",
    "GetObject",
    "ListObjects",
    "DeleteObject",
];

/// Entity tag reported for an object body.
pub fn etag(body: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(body.as_bytes()));
    format!("\"{}\"", &digest[..32])
}

/// Create an S3 client backed by `backend`.
pub fn s3_client(region: impl Into<String>, backend: Arc<dyn ServiceBackend>) -> ServiceClient {
    ServiceClient::new(SERVICE_NAME, region, OPERATIONS, backend)
}

fn bucket_params(bucket: &str) -> Value {
    json!({ "Bucket": bucket })
}

fn object_params(bucket: &str, key: &str) -> Value {
    json!({ "Bucket": bucket, "Key": key })
}

fn create_bucket_params(bucket: &str, region: Option<&str>) -> Value {
    let mut params = Map::new();
    params.insert("Bucket".to_string(), json!(bucket));
    if let Some(region) = region {
        params.insert(
            "CreateBucketConfiguration".to_string(),
            json!({ "LocationConstraint": region }),
        );
    }
    Value::Object(params)
}

fn list_objects_params(bucket: &str, prefix: Option<&str>) -> Value {
    let mut params = Map::new();
    params.insert("Bucket".to_string(), json!(bucket));
    if let Some(prefix) = prefix {
        params.insert("Prefix".to_string(), json!(prefix));
    }
    Value::Object(params)
}

fn list_objects_response(keys: &[&str]) -> Value {
    let contents: Vec<Value> = keys.iter().map(|key| json!({ "Key": key })).collect();
    json!({ "Contents": contents, "KeyCount": keys.len() })
}

/// Stubber for S3 clients.
#[derive(Debug, Clone)]
pub struct S3Stubber {
    base: BaseStubber,
}

impl S3Stubber {
    pub fn new(client: ServiceClient, use_stubs: bool) -> Self {
        Self {
            base: BaseStubber::new(client, use_stubs),
        }
    }

    pub fn client(&self) -> &ServiceClient {
        self.base.client()
    }

    pub fn stub_create_bucket(
        &self,
        bucket_name: &str,
        region_name: Option<&str>,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "CreateBucket",
            Some(create_bucket_params(bucket_name, region_name)),
            json!({ "Location": format!("/{bucket_name}") }),
            error_code,
        )
    }

    pub fn stub_head_bucket(&self, bucket_name: &str, error_code: Option<&str>) -> StubResult<()> {
        self.base.stub(
            "HeadBucket",
            Some(bucket_params(bucket_name)),
            json!({}),
            error_code,
        )
    }

    pub fn stub_delete_bucket(
        &self,
        bucket_name: &str,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "DeleteBucket",
            Some(bucket_params(bucket_name)),
            json!({}),
            error_code,
        )
    }

    pub fn stub_put_object(
        &self,
        bucket_name: &str,
        key: &str,
        body: &str,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "PutObject",
            Some(json!({ "Bucket": bucket_name, "Key": key, "Body": body })),
            json!({ "ETag": etag(body) }),
            error_code,
        )
    }

    pub fn stub_get_object(
        &self,
        bucket_name: &str,
        key: &str,
        body: &str,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "GetObject",
            Some(object_params(bucket_name, key)),
            json!({ "Body": body, "ContentLength": body.len() }),
            error_code,
        )
    }

    /// Stub a listing that returns `keys`.
    pub fn stub_list_objects(
        &self,
        bucket_name: &str,
        keys: &[&str],
        prefix: Option<&str>,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "ListObjects",
            Some(list_objects_params(bucket_name, prefix)),
            list_objects_response(keys),
            error_code,
        )
    }

    pub fn stub_delete_object(
        &self,
        bucket_name: &str,
        key: &str,
        error_code: Option<&str>,
    ) -> StubResult<()> {
        self.base.stub(
            "DeleteObject",
            Some(object_params(bucket_name, key)),
            json!({}),
            error_code,
        )
    }
}

impl Stubber for S3Stubber {
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

/// Resource-style entry point for S3.
#[derive(Debug, Clone)]
pub struct S3Resource {
    client: ServiceClient,
}

impl S3Resource {
    pub fn new(client: ServiceClient) -> Self {
        Self { client }
    }

    /// A resource over a fresh [`InMemoryS3`] backend.
    pub fn in_memory(region: impl Into<String>) -> Self {
        Self::new(s3_client(region, Arc::new(InMemoryS3::new())))
    }

    pub fn client(&self) -> &ServiceClient {
        &self.client
    }

    pub fn region(&self) -> &str {
        self.client.region()
    }

    /// Create a bucket, optionally pinned to a location constraint.
    pub fn create_bucket(&self, name: &str, location_constraint: Option<&str>) -> StubResult<Bucket> {
        self.client
            .call("CreateBucket", create_bucket_params(name, location_constraint))?;
        Ok(self.bucket(name))
    }

    /// A handle to an existing bucket. No call is made.
    pub fn bucket(&self, name: &str) -> Bucket {
        Bucket {
            client: self.client.clone(),
            name: name.to_string(),
        }
    }
}

/// Handle to a single bucket.
#[derive(Debug, Clone)]
pub struct Bucket {
    client: ServiceClient,
    name: String,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check that the bucket exists.
    ///
    /// `NotFound` and `NoSuchBucket` map to `Ok(false)`; other errors propagate.
    pub fn exists(&self) -> StubResult<bool> {
        match self.client.call("HeadBucket", bucket_params(&self.name)) {
            Ok(_) => Ok(true),
            Err(e) if e.is_service_error("NotFound") || e.is_service_error("NoSuchBucket") => {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn delete(&self) -> StubResult<()> {
        self.client.call("DeleteBucket", bucket_params(&self.name))?;
        Ok(())
    }

    /// Upload an object and return its entity tag.
    pub fn put_object(&self, key: &str, body: &str) -> StubResult<String> {
        let response = self.client.call(
            "PutObject",
            json!({ "Bucket": self.name, "Key": key, "Body": body }),
        )?;
        Ok(response["ETag"].as_str().unwrap_or_default().to_string())
    }

    pub fn get_object(&self, key: &str) -> StubResult<String> {
        let response = self.client.call("GetObject", object_params(&self.name, key))?;
        Ok(response["Body"].as_str().unwrap_or_default().to_string())
    }

    /// List object keys, optionally limited to a prefix.
    pub fn list_objects(&self, prefix: Option<&str>) -> StubResult<Vec<String>> {
        let response = self
            .client
            .call("ListObjects", list_objects_params(&self.name, prefix))?;
        let keys = response["Contents"]
            .as_array()
            .map(|contents| {
                contents
                    .iter()
                    .filter_map(|entry| entry["Key"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(keys)
    }

    pub fn delete_object(&self, key: &str) -> StubResult<()> {
        self.client.call("DeleteObject", object_params(&self.name, key))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct BucketState {
    location: Option<String>,
    objects: BTreeMap<String, String>,
}

/// An in-memory S3 service.
#[derive(Debug, Default)]
pub struct InMemoryS3 {
    buckets: Mutex<BTreeMap<String, BucketState>>,
}

impl InMemoryS3 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the buckets that currently exist.
    pub fn bucket_names(&self) -> Vec<String> {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    /// Location constraint a bucket was created with.
    pub fn bucket_location(&self, bucket: &str) -> Option<String> {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(bucket)
            .and_then(|state| state.location.clone())
    }
}

fn required<'a>(params: &'a Value, name: &str) -> StubResult<&'a str> {
    params[name].as_str().ok_or_else(|| {
        HarnessError::service(
            "MissingParameter",
            format!("Missing required parameter: {name}"),
        )
    })
}

fn no_such_bucket(bucket: &str) -> HarnessError {
    HarnessError::service(
        "NoSuchBucket",
        format!("The specified bucket does not exist: {bucket}"),
    )
}

impl ServiceBackend for InMemoryS3 {
    fn call(&self, operation: &str, params: &Value) -> StubResult<Value> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = required(params, "Bucket")?;
        debug!(operation, bucket, "In-memory S3 call");

        match operation {
            "CreateBucket" => {
                if buckets.contains_key(bucket) {
                    return Err(HarnessError::service(
                        "BucketAlreadyOwnedByYou",
                        format!("Bucket already exists: {bucket}"),
                    ));
                }
                let location = params["CreateBucketConfiguration"]["LocationConstraint"]
                    .as_str()
                    .map(String::from);
                buckets.insert(
                    bucket.to_string(),
                    BucketState {
                        location,
                        objects: BTreeMap::new(),
                    },
                );
                Ok(json!({ "Location": format!("/{bucket}") }))
            }
            "HeadBucket" => {
                if buckets.contains_key(bucket) {
                    Ok(json!({}))
                } else {
                    Err(HarnessError::service("NotFound", "Not Found"))
                }
            }
            "DeleteBucket" => {
                let state = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
                if !state.objects.is_empty() {
                    return Err(HarnessError::service(
                        "BucketNotEmpty",
                        format!("The bucket you tried to delete is not empty: {bucket}"),
                    ));
                }
                buckets.remove(bucket);
                Ok(json!({}))
            }
            "PutObject" => {
                let key = required(params, "Key")?;
                let body = params["Body"].as_str().unwrap_or_default();
                let state = buckets
                    .get_mut(bucket)
                    .ok_or_else(|| no_such_bucket(bucket))?;
                state.objects.insert(key.to_string(), body.to_string());
                Ok(json!({ "ETag": etag(body) }))
            }
            "GetObject" => {
                let key = required(params, "Key")?;
                let state = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
                let body = state.objects.get(key).ok_or_else(|| {
                    HarnessError::service("NoSuchKey", "The specified key does not exist.")
                })?;
                Ok(json!({ "Body": body, "ContentLength": body.len() }))
            }
            "ListObjects" => {
                let prefix = params["Prefix"].as_str().unwrap_or_default();
                let state = buckets.get(bucket).ok_or_else(|| no_such_bucket(bucket))?;
                let keys: Vec<&str> = state
                    .objects
                    .keys()
                    .filter(|key| key.starts_with(prefix))
                    .map(String::as_str)
                    .collect();
                Ok(list_objects_response(&keys))
            }
            "DeleteObject" => {
                let key = required(params, "Key")?;
                let state = buckets
                    .get_mut(bucket)
                    .ok_or_else(|| no_such_bucket(bucket))?;
                state.objects.remove(key);
                Ok(json!({}))
            }
            other => Err(HarnessError::UnknownOperation {
                service: SERVICE_NAME.to_string(),
                operation: other.to_string(),
            }),
        }
    }
}
