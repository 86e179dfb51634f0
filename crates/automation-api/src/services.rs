//! Services in the `automation_api` domain
//!
//! | service | data | response |
//! |---|---|---|
//! | `create` | automation payload | `{status, id}` |
//! | `delete` | `{id}` or `{automation_id}` | `{status, id}` |
//! | `trigger` | `{id}`, `{automation_id}` or `{entity_id}` | `{status, entity_id}` |

use std::sync::Arc;

use automation_host::{ServiceCall, ServiceError, ServiceRegistry, ServiceResult};
use automation_store::AutomationPayload;
use serde::Serialize;

use crate::api::{AutomationApi, RecordRef, TriggerTarget};
use crate::DOMAIN;

fn to_response<T: Serialize>(value: T) -> ServiceResult {
    serde_json::to_value(value).map_err(|e| ServiceError::CallFailed(e.to_string()))
}

/// Register `create`, `delete` and `trigger`
pub fn register_services(registry: &ServiceRegistry, api: Arc<AutomationApi>) {
    let create_api = Arc::clone(&api);
    registry.register(DOMAIN, "create", move |call: ServiceCall| {
        let api = Arc::clone(&create_api);
        async move {
            let payload: AutomationPayload = call.data()?;
            to_response(api.create_or_update(payload).await?)
        }
    });

    let delete_api = Arc::clone(&api);
    registry.register(DOMAIN, "delete", move |call: ServiceCall| {
        let api = Arc::clone(&delete_api);
        async move {
            let record: RecordRef = call.data()?;
            let id = record
                .into_id()
                .ok_or_else(|| ServiceError::InvalidData("missing id".to_string()))?;
            to_response(api.delete(&id).await?)
        }
    });

    let trigger_api = api;
    registry.register(DOMAIN, "trigger", move |call: ServiceCall| {
        let api = Arc::clone(&trigger_api);
        async move {
            let target: TriggerTarget = call.data()?;
            to_response(api.trigger(&target).await?)
        }
    });
}
