//! HTTP Endpoints
//!
//! REST API for chat, sessions, search and browsing.

use axum::{
    extract::{Json, Path, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use stylist_agent::Transition;
use stylist_core::{ErrorKind, QualityLevel, Recommendation};
use stylist_rag::{browse, CategoryCount, SearchRequest};

use crate::metrics::{metrics_handler, record_request};
use crate::session::ChatMessage;
use crate::state::AppState;
use crate::ServerError;

const DEFAULT_SUGGESTIONS: usize = 5;
const READINESS_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.read();
    let cors_layer = build_cors_layer(&config.server.cors_origins, config.server.cors_enabled);
    let request_timeout = Duration::from_secs(config.server.request_timeout_secs.max(1));
    drop(config); // Release lock before building router

    Router::new()
        // Chat
        .route("/api/chat", post(chat))
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        .route("/api/sessions/:id/history", get(session_history))
        .route("/api/sessions/:id/feedback", post(behavioral_feedback))
        // Search and browse
        .route("/api/search", post(search))
        .route("/api/search/suggestions", post(suggestions))
        .route("/api/trending", get(trending))
        .route("/api/categories", get(list_categories))
        .route("/api/categories/:category", get(browse_category))
        .route("/api/stats", get(stats))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        // Admin endpoints
        .route("/admin/reload-config", post(reload_config))
        .route("/admin/reindex", post(reindex))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No usable CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

/// Count the request under `endpoint` and pass the result through
fn tracked<T>(endpoint: &'static str, result: Result<T, ServerError>) -> Result<T, ServerError> {
    let status = match result {
        Ok(_) => StatusCode::OK,
        Err(ref e) => e.status(),
    };
    record_request(endpoint, status);
    result
}

/// Requested result count, or the configured default
fn resolve_top_k(state: &AppState, top_k: Option<usize>) -> Result<usize, ServerError> {
    let (default_top_k, max_top_k) = {
        let config = state.get_config();
        (config.retrieval.default_top_k, config.retrieval.max_top_k)
    };
    match top_k {
        None => Ok(default_top_k),
        Some(k) if (1..=max_top_k).contains(&k) => Ok(k),
        Some(k) => Err(ServerError::InvalidRequest(format!(
            "top_k must be between 1 and {}, got {}",
            max_top_k, k
        ))),
    }
}

fn validate_min_rating(min_rating: Option<f32>) -> Result<(), ServerError> {
    match min_rating {
        Some(r) if !(0.0..=5.0).contains(&r) => Err(ServerError::InvalidRequest(format!(
            "min_rating must be within [0, 5], got {}",
            r
        ))),
        _ => Ok(()),
    }
}

/// Recommendation as served to clients
#[derive(Debug, Serialize)]
struct ProductView {
    product_id: String,
    name: String,
    category: String,
    rating: Option<f32>,
    review_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    brand: Option<String>,
    reason: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_url: Option<String>,
    similarity: f32,
    final_score: f32,
}

impl From<Recommendation> for ProductView {
    fn from(rec: Recommendation) -> Self {
        let product = rec.product;
        Self {
            product_id: product.id,
            name: product.name,
            category: product.category,
            rating: product.rating,
            review_count: product.review_count,
            price: product.price,
            brand: product.brand,
            reason: rec.reason,
            url: product.url,
            image_url: product.image_url,
            similarity: rec.similarity,
            final_score: rec.final_score,
        }
    }
}

fn views(recommendations: Vec<Recommendation>) -> Vec<ProductView> {
    recommendations.into_iter().map(ProductView::from).collect()
}

/// Chat request
#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    top_k: Option<usize>,
}

/// Chat response
#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    response: String,
    recommendations: Vec<ProductView>,
    intent: Option<&'static str>,
    quality_level: Option<QualityLevel>,
    retry_count: u32,
    feedback_rounds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorKind>,
    transitions: Vec<Transition>,
}

/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    tracked("chat", chat_turn(&state, request).await).map(Json)
}

async fn chat_turn(state: &AppState, request: ChatRequest) -> Result<ChatResponse, ServerError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ServerError::InvalidRequest("message must not be empty".to_string()));
    }
    let top_k = resolve_top_k(state, request.top_k)?;

    let session = state.sessions.get_or_create(request.session_id.as_deref())?;
    session.touch();

    // Held for the whole run so turns on one session never interleave.
    // A dropped request leaves the context untouched.
    let mut context = session.lock_context().await;
    let outcome = state
        .orchestrator
        .run_with_top_k(message, &context, top_k)
        .await;
    *context = outcome.context;
    drop(context);

    let run = outcome.state;
    let response = run.final_response.unwrap_or_default();
    let recommended_ids: Vec<String> =
        run.recommendations.iter().map(|r| r.product.id.clone()).collect();
    session.record_exchange(
        ChatMessage::user(message),
        ChatMessage::assistant(response.clone(), recommended_ids),
    );
    session.touch();

    tracing::info!(
        session_id = %session.id,
        recommendations = run.recommendations.len(),
        retry_count = run.retry_count,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Chat turn complete"
    );

    Ok(ChatResponse {
        session_id: session.id.clone(),
        response,
        intent: run.conversation_result.as_ref().map(|r| r.intent.as_str()),
        quality_level: run.evaluation.as_ref().map(|e| e.quality_level),
        retry_count: run.retry_count,
        feedback_rounds: run.feedback_rounds,
        error: run.error.as_ref().map(|e| e.kind),
        transitions: outcome.transitions,
        recommendations: views(run.recommendations),
    })
}

/// List sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

/// Get session info
async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(format!("session {}", id)))?;
    let info = session.info().await;
    Ok(Json(serde_json::to_value(info).map_err(|e| {
        ServerError::Internal(format!("Failed to serialize session: {}", e))
    })?))
}

/// Chat history
async fn session_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(format!("session {}", id)))?;
    let history = session.history();
    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "count": history.len(),
        "messages": history,
    })))
}

/// Delete session
async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    if state.sessions.remove(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// POST /api/sessions/:id/reset
async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let result = match state.sessions.get(&id) {
        Some(session) => {
            session.reset().await;
            Ok(Json(serde_json::json!({
                "session_id": session.id,
                "status": "reset",
            })))
        },
        None => Err(ServerError::NotFound(format!("session {}", id))),
    };
    tracked("reset", result)
}

#[derive(Debug, Deserialize)]
struct BehavioralRequest {
    product_id: String,
    signal: String,
}

/// POST /api/sessions/:id/feedback
async fn behavioral_feedback(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<BehavioralRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ServerError::NotFound(format!("session {}", id)))?;

    let feedback = state
        .orchestrator
        .feedback()
        .behavioral(&request.signal, &request.product_id)?;
    let product_id = feedback.product_id.clone().unwrap_or_default();
    if state.index().snapshot().get(&product_id).is_none() {
        return Err(ServerError::NotFound(format!("product {}", product_id)));
    }

    session.lock_context().await.record_feedback(&feedback);
    session.touch();
    metrics::counter!("stylist_feedback_total", "kind" => feedback.kind.as_str()).increment(1);

    tracing::info!(
        session_id = %session.id,
        product_id = %product_id,
        signal = %request.signal,
        "Behavioral feedback recorded"
    );

    Ok(Json(serde_json::json!({
        "session_id": session.id,
        "product_id": product_id,
        "kind": feedback.kind,
        "status": "recorded",
    })))
}

/// Search response with client-facing records
#[derive(Debug, Serialize)]
struct SearchResults {
    results: Vec<ProductView>,
    total_results: usize,
    search_time: f64,
}

/// POST /api/search
async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResults>, ServerError> {
    let result: Result<SearchResults, ServerError> = async {
        validate_min_rating(request.min_rating)?;
        let response = state.retriever().search(&request).await?;
        Ok(SearchResults {
            total_results: response.total_results,
            search_time: response.search_time,
            results: views(response.results),
        })
    }
    .await;
    tracked("search", result).map(Json)
}

#[derive(Debug, Deserialize)]
struct SuggestionRequest {
    query: String,
    #[serde(default)]
    top_k: Option<usize>,
}

/// POST /api/search/suggestions
async fn suggestions(
    State(state): State<AppState>,
    Json(request): Json<SuggestionRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err(ServerError::InvalidRequest("query must not be empty".to_string()));
    }
    let top_k = resolve_top_k(&state, request.top_k.or(Some(DEFAULT_SUGGESTIONS)))?;

    Ok(Json(serde_json::json!({
        "query": query,
        "suggestions": browse::suggestions(query, top_k),
    })))
}

#[derive(Debug, Default, Deserialize)]
struct BrowseParams {
    top_k: Option<usize>,
    category: Option<String>,
    min_rating: Option<f32>,
}

/// GET /api/trending
async fn trending(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let top_k = resolve_top_k(&state, params.top_k)?;
    let category = params
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let index = state.index().snapshot();
    let results = views(browse::trending(&index, top_k, category));
    Ok(Json(serde_json::json!({
        "category": category,
        "total_results": results.len(),
        "results": results,
    })))
}

/// GET /api/categories
async fn list_categories(State(state): State<AppState>) -> Json<serde_json::Value> {
    let categories: Vec<CategoryCount> = state.index().snapshot().categories();
    Json(serde_json::json!({
        "total": categories.len(),
        "categories": categories,
    }))
}

/// GET /api/categories/:category
async fn browse_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let category = category.trim();
    if category.is_empty() {
        return Err(ServerError::InvalidRequest("category must not be empty".to_string()));
    }
    let top_k = resolve_top_k(&state, params.top_k)?;
    validate_min_rating(params.min_rating)?;

    let index = state.index().snapshot();
    let results = views(browse::by_category(&index, category, top_k, params.min_rating));
    Ok(Json(serde_json::json!({
        "category": category,
        "total_results": results.len(),
        "results": results,
    })))
}

/// GET /api/stats
async fn stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let index = state.index().snapshot();
    Json(serde_json::json!({
        "search": state.retriever().stats().snapshot(),
        "evaluation": state.evaluator.summary(chrono::Duration::hours(24)),
        "index": {
            "version": index.version(),
            "products": index.len(),
            "dimension": index.dimension(),
            "categories": index.categories().len(),
            "brands": index.distinct_brands(),
            "built_at": index.built_at(),
        },
        "sessions": state.sessions.count(),
    }))
}

/// Liveness
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness: a non-empty index and reachable model endpoints
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    // Check 1: Catalog index
    let index = state.index().snapshot();
    let index_ok = !index.is_empty();
    checks.insert(
        "index".to_string(),
        serde_json::json!({
            "status": if index_ok { "ok" } else { "empty" },
            "products": index.len(),
            "version": index.version(),
        }),
    );
    ready &= index_ok;

    // Check 2: Ollama embedding endpoint, when configured.
    // Extract config values before any await - parking_lot guards aren't Send
    let embedding_endpoint = {
        let config = state.get_config();
        match config.embedding.provider {
            stylist_config::EmbeddingProviderKind::Ollama => {
                Some(config.embedding.endpoint.trim_end_matches('/').to_string())
            },
            stylist_config::EmbeddingProviderKind::Hash => None,
        }
    };
    if let Some(endpoint) = embedding_endpoint {
        let url = format!("{}/api/tags", endpoint);
        let status = match tokio::time::timeout(READINESS_TIMEOUT, reqwest::get(&url)).await {
            Ok(Ok(resp)) if resp.status().is_success() => "ok",
            Ok(Ok(_)) => "error",
            Ok(Err(_)) => "unreachable",
            Err(_) => "timeout",
        };
        ready &= status == "ok";
        checks.insert(
            "embedding_backend".to_string(),
            serde_json::json!({ "status": status, "url": url }),
        );
    }

    // Check 3: Language model backend, when enabled
    if let Some(ref backend) = state.llm {
        let status = match tokio::time::timeout(READINESS_TIMEOUT, backend.is_available()).await {
            Ok(true) => "ok",
            Ok(false) => "unreachable",
            Err(_) => "timeout",
        };
        ready &= status == "ok";
        checks.insert(
            "llm_backend".to_string(),
            serde_json::json!({ "status": status, "model": backend.model_name() }),
        );
    }

    checks.insert(
        "sessions".to_string(),
        serde_json::json!({ "status": "ok", "count": state.sessions.count() }),
    );

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": checks
        })),
    )
}

/// Config reload endpoint
///
/// POST /admin/reload-config
///
/// Note: CORS and the workflow components are only built at startup.
async fn reload_config(State(state): State<AppState>) -> impl IntoResponse {
    match state.reload_config() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "message": "Configuration reloaded successfully"
            })),
        ),
        Err(e) => {
            tracing::error!("Config reload failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e
                })),
            )
        },
    }
}

/// POST /admin/reindex
///
/// Rebuilds the index from the catalog path and swaps it in atomically.
async fn reindex(State(state): State<AppState>) -> impl IntoResponse {
    match state.reindex().await {
        Ok(report) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "success",
                "report": report,
            })),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Reindex failed, keeping current index");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "message": e.to_string(),
                    "version": state.index().version(),
                })),
            )
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use stylist_config::Settings;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CATALOG: &str = r#"[
        {"id": "t1", "name": "스트릿 오버핏 반팔", "category": "상의", "style_keywords": ["스트릿"],
         "rating": 4.5, "review_count": 120, "url": "https://shop.example/t1"},
        {"id": "t2", "name": "스트릿 로고 반팔", "category": "상의", "style_keywords": ["스트릿"],
         "rating": 4.2, "review_count": 80, "url": "https://shop.example/t2"},
        {"id": "b1", "name": "와이드 데님 팬츠", "category": "하의", "style_keywords": ["캐주얼"],
         "rating": 4.7, "review_count": 300, "price": 39000}
    ]"#;

    async fn loaded_state() -> (AppState, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("catalog.json"), CATALOG).unwrap();

        let mut settings = Settings::default();
        settings.catalog.path = dir.path().to_string_lossy().to_string();
        let state = AppState::new(settings, None).unwrap();
        state.reindex().await.unwrap();
        (state, dir)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[test]
    fn test_router_creation() {
        let state = AppState::new(Settings::default(), None).unwrap();
        let _ = create_router(state);
    }

    #[tokio::test]
    async fn test_chat_turn_and_session_lifecycle() {
        let (state, _dir) = loaded_state().await;
        let app = create_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some(serde_json::json!({ "message": "스트릿 반팔 추천해줘" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["intent"], "recommendation_request");
        let recs = body["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert!(recs.iter().all(|r| r["category"] == "상의"));
        assert!(recs[0].get("embedding").is_none());
        assert!(!body["response"].as_str().unwrap().is_empty());

        let session_id = body["session_id"].as_str().unwrap().to_string();

        let (status, info) =
            send(&app, Method::GET, &format!("/api/sessions/{}", session_id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(info["turn_count"], 1);
        assert_eq!(info["seen_products"], 2);

        let (status, history) = send(
            &app,
            Method::GET,
            &format!("/api/sessions/{}/history", session_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["count"], 2);
        assert_eq!(history["messages"][0]["role"], "user");

        let (status, _) = send(
            &app,
            Method::POST,
            &format!("/api/sessions/{}/reset", session_id),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (_, info) =
            send(&app, Method::GET, &format!("/api/sessions/{}", session_id), None).await;
        assert_eq!(info["turn_count"], 0);

        let (status, _) =
            send(&app, Method::DELETE, &format!("/api/sessions/{}", session_id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) =
            send(&app, Method::GET, &format!("/api/sessions/{}", session_id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_validation_errors() {
        let (state, _dir) = loaded_state().await;
        let app = create_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/chat",
            Some(serde_json::json!({ "message": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("message"));

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/search",
            Some(serde_json::json!({ "query": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/api/search",
            Some(serde_json::json!({ "query": "반팔", "top_k": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::GET, "/api/categories/%EC%83%81%EC%9D%98?min_rating=7", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::POST, "/api/sessions/missing/reset", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_search_and_browse() {
        let (state, _dir) = loaded_state().await;
        let app = create_router(state);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/search",
            Some(serde_json::json!({ "query": "반팔", "top_k": 5, "category": "상의" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_results"], 2);
        assert!(body["search_time"].as_f64().unwrap() >= 0.0);

        let (status, body) = send(&app, Method::GET, "/api/trending?top_k=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["results"][0]["product_id"], "b1");

        let (_, body) = send(&app, Method::GET, "/api/categories", None).await;
        assert_eq!(body["total"], 2);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/search/suggestions",
            Some(serde_json::json!({ "query": "반팔", "top_k": 3 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);

        let (_, body) = send(&app, Method::GET, "/api/stats", None).await;
        assert_eq!(body["index"]["products"], 3);
        assert_eq!(body["search"]["total_searches"], 1);
    }

    #[tokio::test]
    async fn test_behavioral_feedback() {
        let (state, _dir) = loaded_state().await;
        let session = state.sessions.create().unwrap();
        let app = create_router(state);
        let uri = format!("/api/sessions/{}/feedback", session.id);

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(serde_json::json!({ "product_id": "t1", "signal": "click" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "behavioral");
        assert!(session.lock_context().await.seen_ids.contains("t1"));

        let (status, _) = send(
            &app,
            Method::POST,
            &uri,
            Some(serde_json::json!({ "product_id": "t1", "signal": "wave" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            &uri,
            Some(serde_json::json!({ "product_id": "zzz", "signal": "click" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_and_readiness() {
        let app = create_router(AppState::new(Settings::default(), None).unwrap());

        let (status, body) = send(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = send(&app, Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["checks"]["index"]["status"], "empty");

        let (state, _dir) = loaded_state().await;
        let (status, _) = send(&create_router(state), Method::GET, "/ready", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
