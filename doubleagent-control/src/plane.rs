use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use doubleagent_core::{DoubleAgentError, Resource, ResourceId, ResourceType};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::ServiceState;

/// Builds the `/_doubleagent/*` control-plane surface mounted on every
/// fake service. These routes bypass both idempotency caching and any
/// vendor auth check — a client must be able to reset/seed a namespace
/// regardless of whatever the vendor router requires for its own routes.
pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/_doubleagent/health", get(health))
        .route("/_doubleagent/info", get(info))
        .route("/_doubleagent/reset", post(reset))
        .route("/_doubleagent/bootstrap", post(bootstrap))
        .route("/_doubleagent/seed", post(seed))
        .route("/_doubleagent/namespaces", get(namespaces))
        .route("/_doubleagent/webhooks", get(webhooks))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn info(State(state): State<ServiceState>) -> Json<Value> {
    Json(json!({
        "service": state.service_name.as_ref(),
        "version": env!("CARGO_PKG_VERSION"),
        "features": {
            "idempotency": true,
            "webhooks": true,
        },
    }))
}

#[derive(Debug, Deserialize)]
struct ResetParams {
    #[serde(default)]
    hard: bool,
}

async fn reset(State(state): State<ServiceState>, headers: HeaderMap, Query(params): Query<ResetParams>) -> Json<Value> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);

    if params.hard {
        overlay.reset_hard();
        state.webhooks.clear();
    } else {
        overlay.reset();
    }
    state.idempotency.clear();

    Json(json!({"reset": true, "hard": params.hard, "namespace": ns}))
}

async fn bootstrap(State(state): State<ServiceState>, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let data = parse_baseline(body)?;
    let counts: HashMap<ResourceType, usize> = data.iter().map(|(ty, rows)| (ty.clone(), rows.len())).collect();
    state.namespaces.load_baseline(data);
    Ok(Json(json!({"loaded": counts})))
}

async fn seed(State(state): State<ServiceState>, headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);

    let data = parse_overlay_seed(body)?;
    let mut counts = HashMap::new();
    for (ty, rows) in data {
        counts.insert(ty.clone(), rows.len());
        overlay.seed(&ty, rows);
    }
    Ok(Json(json!({"seeded": counts})))
}

async fn namespaces(State(state): State<ServiceState>) -> Json<Value> {
    let list: Vec<Value> = state
        .namespaces
        .list_namespaces()
        .into_iter()
        .map(|ns| {
            let stats = state.namespaces.namespace_stats(&ns);
            json!({"namespace": ns, "stats": stats})
        })
        .collect();
    Json(json!({"namespaces": list}))
}

#[derive(Debug, Deserialize)]
struct WebhookQuery {
    namespace: Option<String>,
    event_type: Option<String>,
    #[serde(default = "default_webhook_limit")]
    limit: usize,
}

fn default_webhook_limit() -> usize {
    100
}

async fn webhooks(State(state): State<ServiceState>, Query(params): Query<WebhookQuery>) -> Json<Value> {
    let deliveries = state.webhooks.get_deliveries(params.namespace.as_deref(), params.event_type.as_deref(), params.limit);
    Json(json!({"deliveries": deliveries}))
}

fn parse_baseline(body: Value) -> Result<HashMap<ResourceType, HashMap<ResourceId, Resource>>, DoubleAgentError> {
    let Value::Object(types) = body else {
        return Err(DoubleAgentError::Validation("bootstrap body must be an object of {type: {id: resource}}".into()));
    };
    let mut out = HashMap::new();
    for (ty, ids) in types {
        let Value::Object(ids) = ids else {
            return Err(DoubleAgentError::Validation(format!("resource type '{ty}' must map id -> resource")));
        };
        let mut by_id = HashMap::new();
        for (id, resource) in ids {
            let Value::Object(resource) = resource else {
                return Err(DoubleAgentError::Validation(format!("resource '{ty}/{id}' must be an object")));
            };
            by_id.insert(id, resource);
        }
        out.insert(ty, by_id);
    }
    Ok(out)
}

fn parse_overlay_seed(body: Value) -> Result<HashMap<ResourceType, Vec<Resource>>, DoubleAgentError> {
    let Value::Object(types) = body else {
        return Err(DoubleAgentError::Validation("seed body must be an object of {type: [resource, ...]}".into()));
    };
    let mut out = HashMap::new();
    for (ty, rows) in types {
        let Value::Array(rows) = rows else {
            return Err(DoubleAgentError::Validation(format!("resource type '{ty}' must map to an array")));
        };
        let mut resources = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(row) = row else {
                return Err(DoubleAgentError::Validation(format!("every '{ty}' seed row must be an object")));
            };
            resources.push(row);
        }
        out.insert(ty, resources);
    }
    Ok(out)
}
