use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::catalog::{Catalog, Criterion, RatingAssignment, Tool};
use crate::config::Config;
use crate::filter::{filter_catalog, filter_ranked, FilterCondition, FilterMode};
use crate::scoring::{compare_tools, rank_tools, RankedTool, ScoreBreakdown};

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    catalog: Arc<Catalog>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("request failed: {}", self.message);
        }
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Clone, Default, Deserialize)]
struct RankRequest {
    /// Criterion id or name to importance 1..=5, applied over the defaults.
    #[serde(default)]
    ratings: BTreeMap<String, u8>,
    #[serde(default)]
    conditions: Vec<FilterCondition>,
    #[serde(default)]
    mode: FilterMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct FilterRequest {
    #[serde(default)]
    conditions: Vec<FilterCondition>,
    #[serde(default)]
    mode: FilterMode,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CompareRequest {
    tools: Vec<String>,
    #[serde(default)]
    ratings: BTreeMap<String, u8>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct RankResponse {
    criteria: Vec<Criterion>,
    tools: Vec<RankedTool>,
}

#[derive(Debug, Serialize)]
struct FilterResponse {
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct CompareResponse {
    breakdowns: Vec<ScoreBreakdown>,
}

pub fn build_router(config: Config, catalog: Catalog) -> Router {
    let state = ApiState {
        config: Arc::new(config),
        catalog: Arc::new(catalog),
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/tools", get(list_tools))
        .route("/v1/criteria", get(list_criteria))
        .route("/v1/rank", post(rank))
        .route("/v1/filter", post(filter))
        .route("/v1/compare", post(compare))
        .route("/v1/config", get(show_config))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(config: Config, catalog: Catalog, bind: SocketAddr) -> Result<()> {
    let app = build_router(config, catalog);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.as_ref().clone())
}

async fn list_tools(State(state): State<ApiState>) -> Json<ApiResponse<Vec<Tool>>> {
    ok(state.catalog.tools().to_vec())
}

async fn list_criteria(State(state): State<ApiState>) -> ApiResult<Vec<Criterion>> {
    Ok(ok(effective_criteria(&state, &BTreeMap::new())?))
}

async fn rank(
    State(state): State<ApiState>,
    Json(request): Json<RankRequest>,
) -> ApiResult<RankResponse> {
    let criteria = effective_criteria(&state, &request.ratings)?;
    let ranked = rank_tools(&state.catalog, &criteria);
    let tools = filter_ranked(&state.catalog, &ranked, &request.conditions, request.mode);
    Ok(ok(RankResponse { criteria, tools }))
}

async fn filter(
    State(state): State<ApiState>,
    Json(request): Json<FilterRequest>,
) -> ApiResult<FilterResponse> {
    let tools = filter_catalog(&state.catalog, &request.conditions, request.mode)
        .into_iter()
        .cloned()
        .collect();
    Ok(ok(FilterResponse { tools }))
}

async fn compare(
    State(state): State<ApiState>,
    Json(request): Json<CompareRequest>,
) -> ApiResult<CompareResponse> {
    if request.tools.is_empty() {
        return Err(ApiError::bad_request("at least one tool is required"));
    }
    let criteria = effective_criteria(&state, &request.ratings)?;
    let breakdowns = compare_tools(&state.catalog, &request.tools, &criteria)
        .map_err(|err| ApiError::not_found(err.to_string()))?;
    Ok(ok(CompareResponse { breakdowns }))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

/// Catalog criteria with config ratings, then request ratings, applied.
fn effective_criteria(
    state: &ApiState,
    ratings: &BTreeMap<String, u8>,
) -> std::result::Result<Vec<Criterion>, ApiError> {
    let mut assignments = state.config.rating_assignments();
    for (criterion, rating) in ratings {
        if !(1..=5).contains(rating) {
            return Err(ApiError::bad_request(format!(
                "rating for {criterion} must be between 1 and 5, got {rating}"
            )));
        }
        assignments.push(RatingAssignment {
            criterion: criterion.clone(),
            rating: *rating,
        });
    }
    state
        .catalog
        .criteria_with(&assignments)
        .map_err(|err| ApiError::bad_request(err.to_string()))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    fn app() -> Router {
        build_router(Config::default(), Catalog::with_defaults())
    }

    async fn read_json_body(response: Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    fn post_json(uri: &str, payload: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .expect("request")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        assert_eq!(payload["ok"], json!(true));
        assert_eq!(payload["data"]["status"], json!("ok"));
    }

    #[tokio::test]
    async fn lists_catalog_tools() {
        let response = app()
            .oneshot(Request::get("/v1/tools").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        let tools = payload["data"].as_array().expect("tool array");
        assert_eq!(tools.len(), Catalog::with_defaults().tools().len());
    }

    #[tokio::test]
    async fn rank_applies_ratings_and_filters() {
        let response = app()
            .oneshot(post_json(
                "/v1/rank",
                json!({
                    "ratings": { "scalability": 5 },
                    "conditions": [
                        { "id": "m1", "type": "Methodology", "value": "Agile" }
                    ],
                    "mode": "AND"
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = read_json_body(response).await;
        let tools = payload["data"]["tools"].as_array().expect("ranked tools");
        assert!(!tools.is_empty());
        let scalability = payload["data"]["criteria"]
            .as_array()
            .and_then(|c| c.iter().find(|c| c["id"] == json!("scalability")))
            .expect("criterion");
        assert_eq!(scalability["userRating"], json!(5));
    }

    #[tokio::test]
    async fn rank_rejects_out_of_range_ratings() {
        let response = app()
            .oneshot(post_json("/v1/rank", json!({ "ratings": { "scalability": 9 } })))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let payload = read_json_body(response).await;
        assert_eq!(payload["ok"], json!(false));
    }

    #[tokio::test]
    async fn compare_unknown_tool_is_not_found() {
        let response = app()
            .oneshot(post_json("/v1/compare", json!({ "tools": ["jira", "notion"] })))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn compare_returns_breakdowns_in_request_order() {
        let response = app()
            .oneshot(post_json("/v1/compare", json!({ "tools": ["asana", "jira"] })))
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        let breakdowns = payload["data"]["breakdowns"].as_array().expect("breakdowns");
        assert_eq!(breakdowns[0]["tool_id"], json!("asana"));
        assert_eq!(breakdowns[1]["tool_id"], json!("jira"));
    }

    #[tokio::test]
    async fn filter_with_incomplete_conditions_returns_everything() {
        let response = app()
            .oneshot(post_json(
                "/v1/filter",
                json!({ "conditions": [ { "id": "c1", "type": "Criteria", "value": "scalability" } ] }),
            ))
            .await
            .expect("route executes");
        let payload = read_json_body(response).await;
        let tools = payload["data"]["tools"].as_array().expect("tools");
        assert_eq!(tools.len(), Catalog::with_defaults().tools().len());
    }
}
