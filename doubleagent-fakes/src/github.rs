//! A thin GitHub-shaped demonstration router: CRUD on `repos`/`issues`
//! plus hook registration and issue-created webhook firing. Deliberately
//! minimal — real vendor fidelity is explicitly out of scope (spec.md §1);
//! this exists only so the core runtime has one concrete surface to drive
//! end to end.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use axum::routing::{get, patch, post};
use axum::Router;
use doubleagent_control::ApiError;
use doubleagent_core::{DoubleAgentError, Resource};
use serde::Deserialize;
use serde_json::{json, Value};

use doubleagent_control::ServiceState;

pub fn router(state: ServiceState) -> Router {
    Router::new()
        .route("/repos", post(create_repo))
        .route("/repos", get(list_repos))
        .route("/repos/{owner}/{repo}", get(get_repo))
        .route("/repos/{owner}/{repo}", patch(update_repo))
        .route("/repos/{owner}/{repo}", axum::routing::delete(delete_repo))
        .route("/repos/{owner}/{repo}/issues", post(create_issue))
        .route("/repos/{owner}/{repo}/issues", get(list_issues))
        .route("/repos/{owner}/{repo}/issues/{number}", get(get_issue))
        .route("/repos/{owner}/{repo}/issues/{number}", patch(update_issue))
        .route("/repos/{owner}/{repo}/hooks", post(create_hook))
        .route("/repos/{owner}/{repo}/hooks", get(list_hooks))
        .with_state(state)
}

fn full_name(owner: &str, repo: &str) -> String {
    format!("{owner}/{repo}")
}

#[derive(Debug, Deserialize)]
struct CreateRepoBody {
    owner: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    private: bool,
}

async fn create_repo(State(state): State<ServiceState>, headers: HeaderMap, Json(body): Json<CreateRepoBody>) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let id = full_name(&body.owner, &body.name);

    if overlay.get("repos", &id).is_some() {
        return Err(DoubleAgentError::Conflict(format!("repository '{id}' already exists")).into());
    }

    let resource: Resource = json!({
        "id": id,
        "full_name": id,
        "owner": body.owner,
        "name": body.name,
        "description": body.description,
        "private": body.private,
    })
    .as_object()
    .unwrap()
    .clone();

    overlay.put("repos", &id, resource.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(resource))))
}

async fn list_repos(State(state): State<ServiceState>, headers: HeaderMap) -> Json<Value> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    Json(json!(overlay.list_all("repos")))
}

async fn get_repo(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let id = full_name(&owner, &repo);
    overlay
        .get("repos", &id)
        .map(|r| Json(Value::Object(r)))
        .ok_or_else(|| DoubleAgentError::NotFound(format!("repos/{id}")).into())
}

async fn update_repo(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let id = full_name(&owner, &repo);

    let mut existing = overlay
        .get("repos", &id)
        .ok_or_else(|| DoubleAgentError::NotFound(format!("repos/{id}")))?;

    let Value::Object(patch) = patch else {
        return Err(DoubleAgentError::Validation("patch body must be an object".into()).into());
    };
    for (key, value) in patch {
        existing.insert(key, value);
    }

    overlay.put("repos", &id, existing.clone());
    Ok(Json(Value::Object(existing)))
}

async fn delete_repo(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let id = full_name(&owner, &repo);
    if overlay.delete("repos", &id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DoubleAgentError::NotFound(format!("repos/{id}")).into())
    }
}

#[derive(Debug, Deserialize)]
struct CreateIssueBody {
    title: String,
    #[serde(default)]
    body: Option<String>,
}

async fn create_issue(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(input): Json<CreateIssueBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let full = full_name(&owner, &repo);

    if overlay.get("repos", &full).is_none() {
        return Err(DoubleAgentError::NotFound(format!("repos/{full}")).into());
    }

    let number = overlay.next_id("issues");
    let id = number.to_string();
    let resource: Resource = json!({
        "id": id,
        "number": number,
        "repo": full,
        "title": input.title,
        "body": input.body,
        "state": "open",
    })
    .as_object()
    .unwrap()
    .clone();
    overlay.put("issues", &id, resource.clone());

    fire_issue_webhook(&state, &ns, &full, "opened", &resource);

    Ok((StatusCode::CREATED, Json(Value::Object(resource))))
}

async fn list_issues(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
) -> Json<Value> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let full = full_name(&owner, &repo);
    let issues: Vec<Resource> = overlay
        .list_all("issues")
        .into_iter()
        .filter(|i| i.get("repo").and_then(Value::as_str) == Some(full.as_str()))
        .collect();
    Json(json!(issues))
}

async fn get_issue(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((_owner, _repo, number)): Path<(String, String, String)>,
) -> Result<Json<Value>, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    overlay
        .get("issues", &number)
        .map(|r| Json(Value::Object(r)))
        .ok_or_else(|| DoubleAgentError::NotFound(format!("issues/{number}")).into())
}

async fn update_issue(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo, number)): Path<(String, String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let full = full_name(&owner, &repo);

    let mut existing = overlay
        .get("issues", &number)
        .ok_or_else(|| DoubleAgentError::NotFound(format!("issues/{number}")))?;

    let Value::Object(patch) = patch else {
        return Err(DoubleAgentError::Validation("patch body must be an object".into()).into());
    };
    let closing = patch.get("state").and_then(Value::as_str) == Some("closed");
    for (key, value) in patch {
        existing.insert(key, value);
    }
    overlay.put("issues", &number, existing.clone());

    if closing {
        fire_issue_webhook(&state, &ns, &full, "closed", &existing);
    }

    Ok(Json(Value::Object(existing)))
}

#[derive(Debug, Deserialize)]
struct CreateHookBody {
    url: String,
    #[serde(default)]
    secret: Option<String>,
    #[serde(default = "default_hook_events")]
    events: Vec<String>,
}

fn default_hook_events() -> Vec<String> {
    vec!["issues".to_string()]
}

async fn create_hook(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Json(input): Json<CreateHookBody>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let full = full_name(&owner, &repo);

    if overlay.get("repos", &full).is_none() {
        return Err(DoubleAgentError::NotFound(format!("repos/{full}")).into());
    }

    let id = overlay.next_id("hooks").to_string();
    let resource: Resource = json!({
        "id": id,
        "repo": full,
        "url": input.url,
        "secret": input.secret,
        "events": input.events,
    })
    .as_object()
    .unwrap()
    .clone();
    overlay.put("hooks", &id, resource.clone());
    Ok((StatusCode::CREATED, Json(Value::Object(resource))))
}

#[derive(Debug, Deserialize)]
struct HookQuery {
    #[serde(default)]
    #[allow(dead_code)]
    event_type: Option<String>,
}

async fn list_hooks(
    State(state): State<ServiceState>,
    headers: HeaderMap,
    Path((owner, repo)): Path<(String, String)>,
    Query(_params): Query<HookQuery>,
) -> Json<Value> {
    let ns = state.namespace(&headers);
    let overlay = state.namespaces.get_state(&ns);
    let full = full_name(&owner, &repo);
    let hooks: Vec<Resource> = overlay
        .list_all("hooks")
        .into_iter()
        .filter(|h| h.get("repo").and_then(Value::as_str) == Some(full.as_str()))
        .collect();
    Json(json!(hooks))
}

fn fire_issue_webhook(state: &ServiceState, namespace: &str, repo_full_name: &str, action: &str, issue: &Resource) {
    let overlay = state.namespaces.get_state(namespace);
    let hooks: Vec<Resource> = overlay
        .list_all("hooks")
        .into_iter()
        .filter(|h| {
            h.get("repo").and_then(Value::as_str) == Some(repo_full_name)
                && h.get("events")
                    .and_then(Value::as_array)
                    .map(|events| events.iter().any(|e| e.as_str() == Some("issues")))
                    .unwrap_or(false)
        })
        .collect();

    for hook in hooks {
        let Some(url) = hook.get("url").and_then(Value::as_str) else {
            continue;
        };
        let secret = hook.get("secret").and_then(Value::as_str).map(str::to_string);
        let payload = json!({
            "action": action,
            "repository": {"full_name": repo_full_name},
            "issue": issue,
        });
        state
            .webhooks
            .deliver(url, "issues", payload, secret, namespace, HashMap::new());
    }
}
