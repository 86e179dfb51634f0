//! HTTP route handlers

use automation_store::AutomationPayload;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::api::{
    AreaSummary, EntityFilter, EntitySummary, RecordResponse, TriggerResponse, TriggerTarget,
};
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// `?id=` query
#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: Option<String>,
}

fn parse_json(body: &Bytes) -> ApiResult<Value> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidJson(e.to_string()))
}

/// GET /api/automation_api/automations
pub async fn list_automations(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.api.automations(query.id.as_deref()).await?))
}

/// POST /api/automation_api/automations
pub async fn create_automation(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<RecordResponse>> {
    let value = parse_json(&body)?;
    if !value.is_object() {
        return Err(ApiError::InvalidRequest(
            "request body must be a JSON object".to_string(),
        ));
    }
    let payload: AutomationPayload =
        serde_json::from_value(value).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    Ok(Json(state.api.create_or_update(payload).await?))
}

/// DELETE /api/automation_api/automations?id=
pub async fn delete_automation(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<RecordResponse>> {
    let id = query
        .id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("missing 'id' query parameter".to_string()))?;

    Ok(Json(state.api.delete(&id).await?))
}

/// POST /api/automation_api/trigger
///
/// The target may be given in the query string, the JSON body, or both; body
/// fields win.
pub async fn trigger_automation(
    State(state): State<AppState>,
    Query(query): Query<TriggerTarget>,
    body: Bytes,
) -> ApiResult<Json<TriggerResponse>> {
    let mut target = query;
    if !body.is_empty() {
        let from_body: TriggerTarget = serde_json::from_value(parse_json(&body)?)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        target.entity_id = from_body.entity_id.or(target.entity_id);
        target.automation_id = from_body.automation_id.or(target.automation_id);
        target.id = from_body.id.or(target.id);
    }

    Ok(Json(state.api.trigger(&target).await?))
}

/// GET /api/automation_api/areas
pub async fn list_areas(State(state): State<AppState>) -> ApiResult<Json<Vec<AreaSummary>>> {
    Ok(Json(state.api.areas().await?))
}

/// GET /api/automation_api/entities
pub async fn list_entities(
    State(state): State<AppState>,
    Query(filter): Query<EntityFilter>,
) -> ApiResult<Json<Vec<EntitySummary>>> {
    Ok(Json(state.api.entities(&filter).await?))
}

/// GET /api/automation_api/automations_yaml
pub async fn list_definitions(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> ApiResult<Json<Value>> {
    Ok(Json(state.api.definitions(query.id.as_deref()).await?))
}

/// GET /api/automation_api/log
pub async fn read_log(State(state): State<AppState>) -> ApiResult<Response> {
    let content = state.api.read_log().await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        content,
    )
        .into_response())
}

/// Unknown path under the API prefix
pub async fn not_found() -> ApiError {
    ApiError::NotFound("no such endpoint".to_string())
}
