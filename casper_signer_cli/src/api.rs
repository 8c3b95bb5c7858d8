use axum::{
    extract::{Json, Path, Request, State},
    http::StatusCode,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use casper_signer_core::{AccountProvider, RequestId, SignerError};
use chrono::Utc;
use log::{info, warn};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::error::ApiError;
use crate::state::ApiState;

type ApiResult<T> = Result<T, ApiError>;

/// Header carrying the approval token on approval-facing routes.
pub const APPROVAL_TOKEN_HEADER: &str = "x-approval-token";

#[derive(Debug, Deserialize)]
pub struct SignBody {
    pub deploy: serde_json::Value,
    #[serde(default)]
    pub signing_key: Option<String>,
}

/// Page-facing routes are open to any origin. Approval-facing routes carry no
/// CORS headers and need the approval token, so a web page can neither
/// approve its own deploys nor read the queue.
pub fn create_router(state: ApiState) -> Router {
    let page = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/connection",
            get(connection_status_handler)
                .post(request_connection_handler)
                .delete(disconnect_handler),
        )
        .route("/active-key", get(active_key_handler))
        .route("/active-key/base64", get(active_key_base64_handler))
        .route("/sign", post(sign_handler))
        .layer(CorsLayer::permissive());

    let approval = Router::new()
        .route("/connection/approve", post(approve_connection_handler))
        .route("/accounts", get(accounts_handler))
        .route("/accounts/:name/select", post(select_account_handler))
        .route("/requests", get(requests_handler))
        .route("/requests/pending", get(pending_requests_handler))
        .route("/requests/settled", delete(clear_settled_handler))
        .route("/requests/:id/summary", get(summary_handler))
        .route("/requests/:id/approve", post(approve_handler))
        .route("/requests/:id/reject", post(reject_handler))
        .route_layer(from_fn_with_state(state.clone(), require_approval_token));

    Router::new().merge(page).merge(approval).with_state(state)
}

async fn require_approval_token(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(APPROVAL_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    match presented {
        Some(token) if token_matches(token, &state.approval_token) => Ok(next.run(request).await),
        _ => {
            warn!("Refused {} {}: bad approval token", request.method(), request.uri().path());
            Err(ApiError::Unauthorized)
        }
    }
}

// Compares every byte so timing does not leak the matching prefix.
fn token_matches(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds()
    }))
}

async fn connection_status_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(json!({ "connected": state.bridge.is_connected() }))
}

async fn request_connection_handler(State(state): State<ApiState>) -> impl IntoResponse {
    state.bridge.request_connection();
    Json(json!({
        "status": "success",
        "connected": state.bridge.is_connected()
    }))
}

async fn disconnect_handler(State(state): State<ApiState>) -> impl IntoResponse {
    state.bridge.disconnect_from_site();
    Json(json!({
        "status": "success",
        "message": "Disconnected"
    }))
}

async fn approve_connection_handler(State(state): State<ApiState>) -> impl IntoResponse {
    state.vault.set_connected(true);
    info!("Site connection approved");
    Json(json!({
        "status": "success",
        "message": "Connected"
    }))
}

async fn active_key_handler(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let key = state.bridge.get_active_public_key()?;
    Ok(Json(json!({ "public_key": key })))
}

async fn active_key_base64_handler(
    State(state): State<ApiState>,
) -> ApiResult<impl IntoResponse> {
    let key = state.bridge.get_selected_public_key_base64()?;
    Ok(Json(json!({ "public_key": key })))
}

async fn sign_handler(
    State(state): State<ApiState>,
    Json(body): Json<SignBody>,
) -> ApiResult<impl IntoResponse> {
    let signed = state
        .bridge
        .sign(&body.deploy.to_string(), body.signing_key.as_deref())
        .await?;
    let signed: serde_json::Value = serde_json::from_str(&signed).map_err(SignerError::from)?;
    Ok(Json(signed))
}

async fn accounts_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let selected = state.vault.selected_account().map(|account| account.name);
    Json(json!({
        "accounts": state.vault.account_names(),
        "selected": selected
    }))
}

async fn select_account_handler(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    if !state.vault.select(&name) {
        return Err(ApiError::UnknownAccount(name));
    }
    Ok(Json(json!({
        "status": "success",
        "selected": name
    })))
}

async fn requests_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.manager().snapshot())
}

async fn pending_requests_handler(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.manager().pending())
}

async fn clear_settled_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let removed = state.manager().clear_settled();
    Json(json!({ "removed": removed }))
}

async fn summary_handler(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(state.manager().parse_deploy_data(RequestId(id))?))
}

async fn approve_handler(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    let settled = state.manager().approve(RequestId(id))?;
    Ok(Json(json!({
        "status": settled.status(),
        "error": settled.error_message(),
        "request": settled
    })))
}

async fn reject_handler(
    State(state): State<ApiState>,
    Path(id): Path<u64>,
) -> ApiResult<impl IntoResponse> {
    state.manager().reject(RequestId(id))?;
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": format!("Deploy {} rejected", id)
        })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use casper_signer_core::{InMemoryVault, KeyAlgorithm, KeyPair};
    use std::sync::Arc;
    use tower::ServiceExt;

    const BODY_LIMIT: usize = 1024 * 1024;
    const TOKEN: &str = "0123456789abcdef0123456789abcdef";

    fn transfer_deploy(account_hex: &str) -> serde_json::Value {
        json!({
            "deploy": {
                "hash": "5d2d1e1cdd8a8f1d8a0f5fa7a42a3e19fcfb9c3da0bd0e87c35e7dfe0a2c0b6e",
                "header": {
                    "account": account_hex,
                    "timestamp": "2021-05-04T15:30:05.123Z",
                    "ttl": "30m",
                    "gas_price": 1,
                    "body_hash": "7b5e2ccd1ee2a0f4e0f4b3f6ab0e0c4fb39a9e59c9a67bc1bbdba5b86b59b8c6",
                    "dependencies": [],
                    "chain_name": "casper-test"
                },
                "payment": {
                    "ModuleBytes": {
                        "module_bytes": "",
                        "args": [["amount", {"cl_type": "U512", "bytes": "0400e1f505", "parsed": "100000000"}]]
                    }
                },
                "session": {
                    "Transfer": {
                        "args": [["amount", {"cl_type": "U512", "bytes": "0500f2052a01", "parsed": "5000000000"}]]
                    }
                },
                "approvals": []
            }
        })
    }

    fn app() -> (Router, ApiState, String) {
        let vault = Arc::new(InMemoryVault::new());
        let key_pair = KeyPair::from_secret_bytes(KeyAlgorithm::Ed25519, &[0x42; 32]).unwrap();
        let account_hex = key_pair.public_key().to_account_hex();
        vault.add_account("main", key_pair);
        vault.set_connected(true);
        let state = ApiState::new(vault, 16, TOKEN);
        (create_router(state.clone()), state, account_hex)
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, serde_json::Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(APPROVAL_TOKEN_HEADER, TOKEN);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), BODY_LIMIT).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    async fn first_pending_id(router: &Router) -> u64 {
        loop {
            let (_, pending) = send(router, "GET", "/requests/pending", None).await;
            if let Some(id) = pending.get(0).and_then(|r| r["id"].as_u64()) {
                return id;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (router, _, _) = app();
        let (status, body) = send(&router, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn sign_waits_for_http_approval() {
        let (router, _, account_hex) = app();
        let sign_router = router.clone();
        let deploy = transfer_deploy(&account_hex);
        let signing = tokio::spawn(async move {
            send(&sign_router, "POST", "/sign", Some(json!({ "deploy": deploy }))).await
        });

        let id = first_pending_id(&router).await;
        let (status, summary) = send(&router, "GET", &format!("/requests/{}/summary", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["deployType"], "Transfer");
        assert_eq!(summary["payment"], "100000000");

        let (status, approved) = send(&router, "POST", &format!("/requests/{}/approve", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["status"], "signed");

        let (status, signed) = signing.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(signed["deploy"]["approvals"][0]["signer"], account_hex.as_str());

        let (status, _) = send(&router, "POST", &format!("/requests/{}/approve", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn reject_cancels_the_signer_call() {
        let (router, _, account_hex) = app();
        let sign_router = router.clone();
        let deploy = transfer_deploy(&account_hex);
        let signing = tokio::spawn(async move {
            send(&sign_router, "POST", "/sign", Some(json!({ "deploy": deploy }))).await
        });

        let id = first_pending_id(&router).await;
        let (status, _) = send(&router, "POST", &format!("/requests/{}/reject", id), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = signing.await.unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "User Cancelled Signing");

        let (status, _) = send(&router, "GET", &format!("/requests/{}/summary", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_deploy_is_a_bad_request() {
        let (router, state, _) = app();
        let (status, body) = send(&router, "POST", "/sign", Some(json!({ "deploy": { "nope": 1 } }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(state.manager().snapshot().len(), 1);

        let (_, cleared) = send(&router, "DELETE", "/requests/settled", None).await;
        assert_eq!(cleared["removed"], 1);
    }

    #[tokio::test]
    async fn connection_and_keys() {
        let (router, _, account_hex) = app();
        let (_, key) = send(&router, "GET", "/active-key", None).await;
        assert_eq!(key["public_key"], account_hex.as_str());

        send(&router, "DELETE", "/connection", None).await;
        let (_, connection) = send(&router, "GET", "/connection", None).await;
        assert_eq!(connection["connected"], false);
        let (status, _) = send(&router, "GET", "/active-key/base64", None).await;
        assert_eq!(status, StatusCode::PRECONDITION_FAILED);

        send(&router, "POST", "/connection/approve", None).await;
        let (status, _) = send(&router, "GET", "/active-key/base64", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    async fn from_page(router: &Router, method: &str, uri: &str, token: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("origin", "https://evil.example");
        if let Some(token) = token {
            builder = builder.header(APPROVAL_TOKEN_HEADER, token);
        }
        router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap()
    }

    #[tokio::test]
    async fn cross_origin_page_cannot_approve() {
        let (router, state, account_hex) = app();
        state.vault.disconnect();
        let response = from_page(&router, "POST", "/connection/approve", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(!state.vault.is_connected());

        state.vault.set_connected(true);
        let sign_router = router.clone();
        let deploy = transfer_deploy(&account_hex);
        let signing = tokio::spawn(async move {
            send(&sign_router, "POST", "/sign", Some(json!({ "deploy": deploy }))).await
        });
        let id = first_pending_id(&router).await;

        let response = from_page(&router, "POST", &format!("/requests/{}/approve", id), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("access-control-allow-origin").is_none());
        let response = from_page(&router, "POST", &format!("/requests/{}/approve", id), Some("guess")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let response = from_page(&router, "GET", "/requests/pending", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get("access-control-allow-origin").is_none());
        assert_eq!(state.manager().pending().len(), 1);

        let preflight = Request::builder()
            .method("OPTIONS")
            .uri(format!("/requests/{}/approve", id))
            .header("origin", "https://evil.example")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", APPROVAL_TOKEN_HEADER)
            .body(Body::empty())
            .unwrap();
        let response = router.clone().oneshot(preflight).await.unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());

        let response = from_page(&router, "GET", "/active-key", None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("access-control-allow-origin").is_some());

        send(&router, "POST", &format!("/requests/{}/reject", id), None).await;
        let (status, _) = signing.await.unwrap();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn token_comparison_needs_exact_match() {
        assert!(token_matches(TOKEN, TOKEN));
        assert!(!token_matches("0123456789abcdef", TOKEN));
        assert!(!token_matches("1123456789abcdef0123456789abcdef", TOKEN));
    }

    #[tokio::test]
    async fn selecting_unknown_account_is_not_found() {
        let (router, _, _) = app();
        let (status, _) = send(&router, "POST", "/accounts/ghost/select", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, body) = send(&router, "POST", "/accounts/main/select", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected"], "main");
    }
}
