//! Lookup of stubber constructors by service name.

use crate::client::ServiceClient;
use crate::s3::{self, S3Stubber};
use crate::stubber::Stubber;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use stubkit_util::{HarnessError, StubResult};

/// Builds a stubber for a client. The flag is `use_stubs`.
pub type StubberConstructor = Arc<dyn Fn(&ServiceClient, bool) -> Arc<dyn Stubber> + Send + Sync>;

/// Maps service names to stubber constructors.
#[derive(Clone, Default)]
pub struct StubberRegistry {
    constructors: HashMap<String, StubberConstructor>,
}

impl StubberRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with every built-in stubber.
    pub fn with_defaults() -> Self {
        Self::new().with_stubber(s3::SERVICE_NAME, |client, use_stubs| {
            S3Stubber::new(client.clone(), use_stubs)
        })
    }

    /// Register a constructor, replacing any previous one for the service.
    pub fn register<S, F>(&mut self, service_name: impl Into<String>, constructor: F)
    where
        S: Stubber,
        F: Fn(&ServiceClient, bool) -> S + Send + Sync + 'static,
    {
        let constructor: StubberConstructor = Arc::new(
            move |client: &ServiceClient, use_stubs: bool| -> Arc<dyn Stubber> {
                Arc::new(constructor(client, use_stubs))
            },
        );
        self.constructors.insert(service_name.into(), constructor);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_stubber<S, F>(mut self, service_name: impl Into<String>, constructor: F) -> Self
    where
        S: Stubber,
        F: Fn(&ServiceClient, bool) -> S + Send + Sync + 'static,
    {
        self.register(service_name, constructor);
        self
    }

    /// Find the constructor for a service.
    pub fn stubber_factory(&self, service_name: &str) -> StubResult<StubberConstructor> {
        self.constructors
            .get(service_name)
            .cloned()
            .ok_or_else(|| HarnessError::NoStubberForService(service_name.to_string()))
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for StubberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubberRegistry")
            .field("services", &self.services())
            .finish()
    }
}

/// Find the built-in stubber constructor for a service.
pub fn stubber_factory(service_name: &str) -> StubResult<StubberConstructor> {
    StubberRegistry::with_defaults().stubber_factory(service_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3::S3Resource;

    #[test]
    fn test_defaults_include_s3() {
        let registry = StubberRegistry::with_defaults();
        assert_eq!(registry.services(), vec!["s3"]);
    }

    #[test]
    fn test_lookup_builds_stubber_in_requested_mode() {
        let resource = S3Resource::in_memory("us-west-2");
        let factory = stubber_factory("s3").unwrap();

        let stubbed = factory(resource.client(), true);
        assert!(stubbed.use_stubs());
        let passthrough = factory(resource.client(), false);
        assert!(!passthrough.use_stubs());
    }

    #[test]
    fn test_unknown_service() {
        let err = match stubber_factory("glacier") {
            Ok(_) => panic!("expected lookup to fail"),
            Err(e) => e,
        };
        assert!(matches!(err, HarnessError::NoStubberForService(ref s) if s == "glacier"));
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = StubberRegistry::new();
        registry.register("s3", |client, _| S3Stubber::new(client.clone(), false));
        registry.register("s3", |client, _| S3Stubber::new(client.clone(), true));

        let resource = S3Resource::in_memory("us-west-2");
        let stubber = registry.stubber_factory("s3").unwrap()(resource.client(), false);
        assert!(stubber.use_stubs());
        assert_eq!(registry.services().len(), 1);
    }
}
