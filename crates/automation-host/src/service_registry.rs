//! In-process service registry
//!
//! The plugin exposes its own operations as services in the
//! `automation_api` domain. Handlers are async closures registered once at
//! startup; callers dispatch by `domain.service` key.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Result type for service calls
pub type ServiceResult = Result<serde_json::Value, ServiceError>;

/// Future type for async service handlers
pub type ServiceFuture = Pin<Box<dyn Future<Output = ServiceResult> + Send>>;

/// Service handler function type
pub type ServiceHandler = Arc<dyn Fn(ServiceCall) -> ServiceFuture + Send + Sync>;

/// Errors that can occur when calling services
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("service not found: {domain}.{service}")]
    NotFound { domain: String, service: String },

    #[error("invalid service data: {0}")]
    InvalidData(String),

    #[error("service call failed: {0}")]
    CallFailed(String),
}

/// A call to a registered service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub service_data: serde_json::Value,
}

impl ServiceCall {
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        service_data: serde_json::Value,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            service_data,
        }
    }

    /// Deserialize the service data into a typed request
    pub fn data<T: serde::de::DeserializeOwned>(&self) -> Result<T, ServiceError> {
        serde_json::from_value(self.service_data.clone())
            .map_err(|e| ServiceError::InvalidData(e.to_string()))
    }
}

/// Registered services keyed by `domain.service`
pub struct ServiceRegistry {
    services: DashMap<String, ServiceHandler>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    fn key(domain: &str, service: &str) -> String {
        format!("{}.{}", domain, service)
    }

    /// Register a service handler, replacing any previous one
    pub fn register<F, Fut>(&self, domain: &str, service: &str, handler: F)
    where
        F: Fn(ServiceCall) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ServiceResult> + Send + 'static,
    {
        debug!(domain = %domain, service = %service, "Registering service");

        let handler: ServiceHandler =
            Arc::new(move |call| Box::pin(handler(call)) as ServiceFuture);
        self.services.insert(Self::key(domain, service), handler);
    }

    /// Call a service and return its response
    #[instrument(skip(self, service_data))]
    pub async fn call(
        &self,
        domain: &str,
        service: &str,
        service_data: serde_json::Value,
    ) -> ServiceResult {
        let handler = self
            .services
            .get(&Self::key(domain, service))
            .map(|h| Arc::clone(h.value()))
            .ok_or_else(|| {
                warn!(domain = %domain, service = %service, "Service not found");
                ServiceError::NotFound {
                    domain: domain.to_string(),
                    service: service.to_string(),
                }
            })?;

        handler(ServiceCall::new(domain, service, service_data)).await
    }

    pub fn has_service(&self, domain: &str, service: &str) -> bool {
        self.services.contains_key(&Self::key(domain, service))
    }

    /// Sorted service names registered for a domain
    pub fn domain_services(&self, domain: &str) -> Vec<String> {
        let prefix = format!("{}.", domain);
        let mut services: Vec<String> = self
            .services
            .iter()
            .filter_map(|entry| entry.key().strip_prefix(&prefix).map(String::from))
            .collect();
        services.sort();
        services
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_register_and_call() {
        let registry = ServiceRegistry::new();
        registry.register("test", "echo", |call: ServiceCall| async move {
            Ok(call.service_data)
        });

        let result = registry
            .call("test", "echo", json!({"msg": "hello"}))
            .await
            .unwrap();
        assert_eq!(result, json!({"msg": "hello"}));
    }

    #[tokio::test]
    async fn test_service_not_found() {
        let registry = ServiceRegistry::new();
        let result = registry.call("nonexistent", "service", json!({})).await;
        assert!(matches!(result, Err(ServiceError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_typed_service_data() {
        #[derive(Deserialize)]
        struct Request {
            id: String,
        }

        let registry = ServiceRegistry::new();
        registry.register("test", "typed", |call: ServiceCall| async move {
            let request: Request = call.data()?;
            Ok(json!({"id": request.id}))
        });

        let ok = registry.call("test", "typed", json!({"id": "a1"})).await;
        assert_eq!(ok.unwrap(), json!({"id": "a1"}));

        let bad = registry.call("test", "typed", json!({"other": 1})).await;
        assert!(matches!(bad, Err(ServiceError::InvalidData(_))));
    }

    #[test]
    fn test_domain_services() {
        let registry = ServiceRegistry::new();
        registry.register("automation_api", "delete", |_: ServiceCall| async {
            Ok(json!(null))
        });
        registry.register("automation_api", "create", |_: ServiceCall| async {
            Ok(json!(null))
        });
        registry.register("other", "create", |_: ServiceCall| async { Ok(json!(null)) });

        assert!(registry.has_service("automation_api", "create"));
        assert!(!registry.has_service("automation_api", "trigger"));
        assert_eq!(
            registry.domain_services("automation_api"),
            vec!["create".to_string(), "delete".to_string()]
        );
    }
}
