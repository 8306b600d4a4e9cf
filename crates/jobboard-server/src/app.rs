use crate::auth::{require_role, Role};
use crate::config::ServerConfig;
use crate::metrics;
use axum::http::{HeaderMap, StatusCode};
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use jobboard_core::{
    BoardError, Filter, Job, NewJob, Projection, RawQuery, CATEGORIES, JOBS, JOB_LISTING_SELECT,
    OWNER_SELECT, USERS,
};
use jobboard_storage::{Expansion, FindOptions, Pager, Shape, Storage};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: Arc<ServerConfig>,
    listing: Arc<Shape>,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, config: ServerConfig) -> anyhow::Result<Self> {
        let expand = config
            .expand_owner
            .then(|| -> anyhow::Result<Expansion> {
                Ok(Expansion {
                    field: "userId".into(),
                    collection: USERS.into(),
                    projection: Projection::parse(OWNER_SELECT)?,
                })
            })
            .transpose()?;
        let listing = Shape {
            projection: Projection::parse(JOB_LISTING_SELECT)?,
            expand,
        };
        Ok(Self {
            store,
            config: Arc::new(config),
            listing: Arc::new(listing),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics_text))
        .route("/v1/jobs", get(list_jobs).post(create_job))
        .route("/v1/jobs/:id", get(get_job))
        .route("/v1/categories", get(list_categories))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn error_response(op: &'static str, e: BoardError) -> Response {
    match e {
        BoardError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "errorType": "Incorrect ID error!",
                "errorMessage": "Job with such ID does not exist.",
            })),
        )
            .into_response(),
        BoardError::Invalid(msg) => (
            StatusCode::BAD_REQUEST,
            Json(json!({"errorType": "Validation error!", "errorMessage": msg})),
        )
            .into_response(),
        other => {
            warn!(op, error = %other, "request failed");
            metrics::STORAGE_ERRORS_TOTAL.with_label_values(&[op]).inc();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "errorType": "Server side error!",
                    "errorMessage": other.to_string(),
                })),
            )
                .into_response()
        }
    }
}

async fn health(State(app): State<AppState>) -> impl IntoResponse {
    Json(json!({"status": "ok", "collections": app.store.collection_sizes()}))
}

async fn metrics_text() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    let _ = encoder.encode(&prometheus::gather(), &mut buf);
    (StatusCode::OK, String::from_utf8(buf).unwrap_or_default())
}

async fn list_jobs(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if let Err(resp) = require_role(&headers, &app.config.auth, Role::Provider) {
        return resp.into_response();
    }
    let style = app.config.pagination;
    let _timer = metrics::LISTING_DURATION_SEC
        .with_label_values(&[&style.to_string()])
        .start_timer();
    let raw: RawQuery = params.into_iter().collect();
    let pager = Pager::new(app.store.as_ref(), JOBS, style);
    match pager.list(&raw, &app.listing).await {
        Ok(envelope) => {
            metrics::OPS_TOTAL.with_label_values(&["list_jobs"]).inc();
            metrics::LISTING_PAGE_SIZE.observe(envelope.data().len() as f64);
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Err(e) => error_response("list_jobs", e),
    }
}

async fn get_job(State(app): State<AppState>, Path(id): Path<String>) -> Response {
    match app.store.get(JOBS, &id, &app.listing.projection).await {
        Ok(job) => {
            metrics::OPS_TOTAL.with_label_values(&["get_job"]).inc();
            (StatusCode::OK, Json(json!({ "data": job }))).into_response()
        }
        Err(e) => error_response("get_job", e),
    }
}

async fn create_job(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewJob>,
) -> Response {
    let caller = match require_role(&headers, &app.config.auth, Role::User) {
        Ok(c) => c,
        Err(resp) => return resp.into_response(),
    };
    let job = Job::create(req, caller.id);
    let doc = match serde_json::to_value(&job) {
        Ok(doc) => doc,
        Err(e) => return error_response("create_job", BoardError::Internal(e.to_string())),
    };
    match app.store.insert(JOBS, doc).await {
        Ok(_) => {
            metrics::OPS_TOTAL.with_label_values(&["create_job"]).inc();
            (
                StatusCode::CREATED,
                Json(json!({"message": "Job successfully created.", "jobId": job.id})),
            )
                .into_response()
        }
        Err(e) => error_response("create_job", e),
    }
}

async fn list_categories(State(app): State<AppState>) -> Response {
    match app
        .store
        .find(CATEGORIES, &Filter::new(), FindOptions::default())
        .await
    {
        Ok(data) => {
            metrics::OPS_TOTAL.with_label_values(&["list_categories"]).inc();
            (
                StatusCode::OK,
                Json(json!({"count": data.len(), "data": data})),
            )
                .into_response()
        }
        Err(e) => error_response("list_categories", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::sign_token;
    use crate::config::AuthKeys;
    use axum::body::Body;
    use axum::http::{header, Request};
    use jobboard_core::{Document, PaginationStyle};
    use jobboard_storage::InMemoryStore;
    use serde_json::Value as JsonValue;
    use tower::ServiceExt;

    fn seeded_store() -> InMemoryStore {
        let store = InMemoryStore::new();
        store.seed(
            USERS,
            [json!({
                "_id": "u1",
                "firstName": "Ann",
                "lastName": "Petrosyan",
                "email": "ann@example.com",
                "password": "hash",
                "phone": "+37400000000",
            })],
        );
        store.seed(
            JOBS,
            (0..30usize).map(|i| -> Document {
                let category = ["cleaning", "ironing", "plumbing"][i % 3];
                json!({
                    "_id": format!("j{i:02}"),
                    "startDate": format!("2022-05-{:02}T10:00", 1 + i % 10),
                    "duration": ((i % 4) + 1).to_string(),
                    "salary": {"cost": 5000 + i * 1000},
                    "address": "Yerevan",
                    "category": category,
                    "subCategories": [],
                    "status": "open",
                    "userId": "u1",
                    "candidatesList": ["p9"],
                })
            }),
        );
        store.seed(
            CATEGORIES,
            [json!({"_id": "c1", "name": "cleaning", "subCategories": ["floors"]})],
        );
        store
    }

    fn app_with(config: ServerConfig) -> Router {
        let state = AppState::new(Arc::new(seeded_store()), config).unwrap();
        router(state)
    }

    async fn call(app: Router, req: Request<Body>) -> (StatusCode, JsonValue) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn offset_listing_filters_projects_and_expands() {
        let (status, body) = call(
            app_with(ServerConfig::default()),
            get("/v1/jobs?salcost%5Bgte%5D=20000&caties=cleaning,ironing&limit=5&offset=2&junk=1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        // costs 20000..=34000 are j15..j29; 10 of those 15 are cleaning or ironing
        assert_eq!(body["total"], 10);
        let data = body["data"].as_array().unwrap();
        assert_eq!(data.len(), 5);
        let first = &data[0];
        assert!(first.get("candidatesList").is_none());
        assert_eq!(
            first["userId"],
            json!({
                "_id": "u1",
                "firstName": "Ann",
                "lastName": "Petrosyan",
                "email": "ann@example.com",
            })
        );
    }

    #[tokio::test]
    async fn page_listing_reports_navigation() {
        let config = ServerConfig {
            pagination: PaginationStyle::Page,
            expand_owner: false,
            ..Default::default()
        };
        let (status, body) = call(app_with(config), get("/v1/jobs?dur=0&limit=12&page=2")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 12);
        assert_eq!(body["next"], json!({"page": 3, "limit": 6}));
        assert_eq!(body["previous"], json!({"page": 1, "limit": 12}));
        assert_eq!(body["data"][0]["userId"], "u1");
    }

    #[tokio::test]
    async fn date_upper_bound_is_inclusive_over_http() {
        let (_, body) = call(
            app_with(ServerConfig::default()),
            get("/v1/jobs?date%5Blte%5D=2022-05-01&limit=100"),
        )
        .await;
        // startDate 2022-05-01T10:00 for i in {0, 10, 20}
        assert_eq!(body["total"], 3);
    }

    #[tokio::test]
    async fn listing_requires_provider_role_when_auth_enabled() {
        let config = ServerConfig {
            auth: AuthKeys {
                active: Some(("active".into(), "s3cret".into())),
                next: None,
            },
            ..Default::default()
        };
        let (status, _) = call(app_with(config.clone()), get("/v1/jobs")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let user = sign_token("active", "s3cret", &json!({"sub": "u1", "activeRole": "user"}));
        let req = Request::builder()
            .uri("/v1/jobs")
            .header(header::AUTHORIZATION, format!("Bearer {user}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app_with(config.clone()), req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["errorType"], "Forbidden!");

        let provider = sign_token(
            "active",
            "s3cret",
            &json!({"sub": "p1", "activeRole": "provider"}),
        );
        let req = Request::builder()
            .uri("/v1/jobs")
            .header(header::AUTHORIZATION, format!("Bearer {provider}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(app_with(config), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 30);
        assert_eq!(body["data"].as_array().unwrap().len(), 20);
    }

    #[tokio::test]
    async fn get_job_by_id_or_404() {
        let (status, body) = call(app_with(ServerConfig::default()), get("/v1/jobs/j03")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["_id"], "j03");
        assert!(body["data"].get("candidatesList").is_none());

        let (status, body) = call(app_with(ServerConfig::default()), get("/v1/jobs/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["errorType"], "Incorrect ID error!");
    }

    #[tokio::test]
    async fn created_job_is_listed() {
        let state = AppState::new(Arc::new(InMemoryStore::new()), ServerConfig::default()).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri("/v1/jobs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({
                    "startDate": "2022-06-01",
                    "startTime": "09:00",
                    "duration": "2",
                    "salary": 12000,
                    "category": "plumbing",
                })
                .to_string(),
            ))
            .unwrap();
        let (status, body) = call(router(state.clone()), req).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["jobId"].as_str().unwrap().to_string();

        let (_, listed) = call(router(state), get("/v1/jobs?caties=plumbing")).await;
        assert_eq!(listed["total"], 1);
        assert_eq!(listed["data"][0]["_id"], id);
        assert_eq!(listed["data"][0]["startDate"], "2022-06-01T09:00");
        assert_eq!(listed["data"][0]["salary"]["cost"], 12000.0);
    }

    #[tokio::test]
    async fn categories_and_health() {
        let (status, body) = call(app_with(ServerConfig::default()), get("/v1/categories")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);

        let (status, body) = call(app_with(ServerConfig::default()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["collections"]["jobs"], 30);
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl Storage for DownStore {
        async fn count(&self, _c: &str, _f: &Filter) -> jobboard_core::Result<u64> {
            Err(BoardError::Storage("unreachable".into()))
        }
        async fn find(
            &self,
            _c: &str,
            _f: &Filter,
            _o: FindOptions,
        ) -> jobboard_core::Result<Vec<Document>> {
            Err(BoardError::Storage("unreachable".into()))
        }
        async fn get(
            &self,
            _c: &str,
            _id: &str,
            _p: &Projection,
        ) -> jobboard_core::Result<Document> {
            Err(BoardError::Storage("unreachable".into()))
        }
        async fn insert(&self, _c: &str, _d: Document) -> jobboard_core::Result<Document> {
            Err(BoardError::Storage("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn storage_failure_is_a_generic_server_error() {
        let state = AppState::new(Arc::new(DownStore), ServerConfig::default()).unwrap();
        let (status, body) = call(router(state), get("/v1/jobs?caties=cleaning")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["errorType"], "Server side error!");
    }
}
