//! Fixtures that tests request from a [`FixtureScope`].
//!
//! # Example
//!
//! ```rust
//! use stubkit::s3::{S3Resource, S3Stubber};
//! use stubkit::{FixtureScope, HarnessConfig};
//!
//! let mut scope = FixtureScope::new(HarnessConfig::stubbed());
//! let s3 = S3Resource::in_memory("us-west-2");
//! let stubber = scope.make_stubber::<S3Stubber>(s3.client()).unwrap();
//!
//! let bucket = scope.make_bucket(&stubber, &s3, None).unwrap();
//! assert!(bucket.name().starts_with("bucket"));
//!
//! scope.finish().unwrap();
//! ```

use crate::client::ServiceClient;
use crate::s3::{Bucket, S3Resource, S3Stubber};
use crate::scope::FixtureScope;
use crate::stubber::Stubber;
use std::any::type_name;
use std::sync::Arc;
use stubkit_util::{HarnessError, StubResult};
use tracing::{debug, info};

impl FixtureScope {
    /// Build the registered stubber for `client`.
    ///
    /// When stubbing, the stubber is activated and a finalizer is scheduled
    /// that checks every queued response was consumed and then deactivates
    /// it.
    pub fn make_stubber_dyn(&mut self, client: &ServiceClient) -> StubResult<Arc<dyn Stubber>> {
        let factory = self.registry().stubber_factory(client.service_name())?;
        let stubber = factory(client, self.config().use_stubs());

        if stubber.use_stubs() {
            let teardown = Arc::clone(&stubber);
            self.add_finalizer(format!("{} stubber", client.service_name()), move || {
                let result = teardown.assert_no_pending_responses();
                teardown.deactivate();
                result
            });
            stubber.activate();
        } else {
            info!(
                service = %client.service_name(),
                "Passing calls through to the real service"
            );
        }

        Ok(stubber)
    }

    /// Typed form of [`make_stubber_dyn`](Self::make_stubber_dyn).
    pub fn make_stubber<S: Stubber>(&mut self, client: &ServiceClient) -> StubResult<Arc<S>> {
        let stubber = self.make_stubber_dyn(client)?;
        stubber
            .into_any()
            .downcast::<S>()
            .map_err(|_| HarnessError::StubberTypeMismatch {
                service: client.service_name().to_string(),
                expected: type_name::<S>(),
            })
    }

    /// Create a unique name from `prefix` and the current time in nanoseconds.
    pub fn make_unique_name(&self, prefix: &str) -> String {
        stubkit_util::make_unique_name(prefix)
    }

    /// Create a test bucket.
    ///
    /// An unset or empty region falls back to the resource's client region.
    /// The bucket is deleted at teardown only when calls really reached the
    /// service.
    pub fn make_bucket(
        &mut self,
        s3_stubber: &Arc<S3Stubber>,
        s3_resource: &S3Resource,
        region_name: Option<&str>,
    ) -> StubResult<Bucket> {
        let bucket_name = self.make_unique_name("bucket");
        let region_name = region_name
            .filter(|region| !region.is_empty())
            .unwrap_or_else(|| s3_resource.region())
            .to_string();

        s3_stubber.stub_create_bucket(&bucket_name, Some(&region_name), None)?;
        let bucket = s3_resource.create_bucket(&bucket_name, Some(&region_name))?;
        debug!(bucket = %bucket_name, region = %region_name, "Created test bucket");

        let stubber = Arc::clone(s3_stubber);
        let created = bucket.clone();
        self.add_finalizer(format!("delete bucket {bucket_name}"), move || {
            if stubber.use_stubs() {
                Ok(())
            } else {
                created.delete()
            }
        });

        Ok(bucket)
    }
}
