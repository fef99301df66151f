use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use hyper::Server;
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::app::ports::ReportStore;
use crate::error::{EtlError, Result};
use crate::pipeline::processing::quality_gate::{DefaultQualityGate, QualityDecision, QualityGate};
use crate::types::{
    Disease, Localization, NewDisease, NewLocalization, ReportCase, ReportCaseRecord, UnifiedFact,
};

type SharedStore = Arc<dyn ReportStore>;
type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failure of a single API request, rendered as `{"error": "..."}`
#[derive(Debug)]
pub enum ApiError {
    NotFound { entity: &'static str, id: String },
    Invalid(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ApiError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound { entity, id } => {
                (StatusCode::NOT_FOUND, format!("{entity} {id} not found"))
            }
            ApiError::Invalid(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Store operation failed".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<EtlError> for ApiError {
    fn from(err: EtlError) -> Self {
        match &err {
            EtlError::Sink(rusqlite::Error::SqliteFailure(failure, _))
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApiError::Conflict(err.to_string())
            }
            _ => {
                error!("Store operation failed: {}", err);
                ApiError::Internal
            }
        }
    }
}

fn deleted(entity: &str) -> Json<serde_json::Value> {
    Json(json!({ "message": format!("{entity} deleted") }))
}

fn require_text(field: &str, value: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::Invalid(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Written cases obey the same measure rules as loaded ones
fn check_report_case(case: &ReportCase) -> ApiResult<()> {
    let fact = UnifiedFact {
        total_confirmed: Some(case.total_confirmed),
        total_death: Some(case.total_death),
        total_active: case.total_active,
        localization_id: Some(case.localization_id),
        date_info: Some(case.date_info),
        disease_id: case.disease_id,
    };
    match DefaultQualityGate::new().assess(&fact) {
        QualityDecision::Accept(_) => Ok(()),
        QualityDecision::Reject(reason) => Err(ApiError::Invalid(reason.to_string())),
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "epi_etl",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_diseases(State(store): State<SharedStore>) -> ApiResult<Json<Vec<Disease>>> {
    Ok(Json(store.list_diseases()?))
}

async fn show_disease(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Disease>> {
    store
        .get_disease(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Disease", id))
}

async fn create_disease(
    State(store): State<SharedStore>,
    Json(body): Json<NewDisease>,
) -> ApiResult<(StatusCode, Json<Disease>)> {
    require_text("name", &body.name)?;
    Ok((StatusCode::CREATED, Json(store.create_disease(&body)?)))
}

async fn update_disease(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
    Json(body): Json<NewDisease>,
) -> ApiResult<Json<Disease>> {
    require_text("name", &body.name)?;
    store
        .update_disease(id, &body)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Disease", id))
}

async fn delete_disease(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
) -> ApiResult<Json<serde_json::Value>> {
    if store.delete_disease(id)? {
        Ok(deleted("Disease"))
    } else {
        Err(ApiError::not_found("Disease", id))
    }
}

async fn list_localizations(
    State(store): State<SharedStore>,
) -> ApiResult<Json<Vec<Localization>>> {
    Ok(Json(store.list_localizations()?))
}

async fn show_localization(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Localization>> {
    store
        .get_localization(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Localization", id))
}

async fn create_localization(
    State(store): State<SharedStore>,
    Json(body): Json<NewLocalization>,
) -> ApiResult<(StatusCode, Json<Localization>)> {
    require_text("country", &body.country)?;
    require_text("continent", &body.continent)?;
    Ok((StatusCode::CREATED, Json(store.create_localization(&body)?)))
}

async fn update_localization(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
    Json(body): Json<NewLocalization>,
) -> ApiResult<Json<Localization>> {
    require_text("country", &body.country)?;
    require_text("continent", &body.continent)?;
    store
        .update_localization(id, &body)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Localization", id))
}

async fn delete_localization(
    State(store): State<SharedStore>,
    Path(id): Path<u32>,
) -> ApiResult<Json<serde_json::Value>> {
    if store.delete_localization(id)? {
        Ok(deleted("Localization"))
    } else {
        Err(ApiError::not_found("Localization", id))
    }
}

async fn list_report_cases(
    State(store): State<SharedStore>,
) -> ApiResult<Json<Vec<ReportCaseRecord>>> {
    Ok(Json(store.list_report_cases()?))
}

async fn show_report_case(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ReportCaseRecord>> {
    store
        .get_report_case(id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("ReportCase", id))
}

async fn create_report_case(
    State(store): State<SharedStore>,
    Json(body): Json<ReportCase>,
) -> ApiResult<(StatusCode, Json<ReportCaseRecord>)> {
    check_report_case(&body)?;
    Ok((StatusCode::CREATED, Json(store.create_report_case(&body)?)))
}

async fn update_report_case(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
    Json(body): Json<ReportCase>,
) -> ApiResult<Json<ReportCaseRecord>> {
    check_report_case(&body)?;
    store
        .update_report_case(id, &body)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("ReportCase", id))
}

async fn delete_report_case(
    State(store): State<SharedStore>,
    Path(id): Path<i64>,
) -> ApiResult<Json<serde_json::Value>> {
    if store.delete_report_case(id)? {
        Ok(deleted("ReportCase"))
    } else {
        Err(ApiError::not_found("ReportCase", id))
    }
}

/// Build the router: `/health` plus index/show/store/update/destroy for
/// `/api/diseases`, `/api/localizations` and `/api/reportcases`
pub fn create_server(store: SharedStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/diseases", get(list_diseases).post(create_disease))
        .route(
            "/api/diseases/:id",
            get(show_disease)
                .put(update_disease)
                .patch(update_disease)
                .delete(delete_disease),
        )
        .route(
            "/api/localizations",
            get(list_localizations).post(create_localization),
        )
        .route(
            "/api/localizations/:id",
            get(show_localization)
                .put(update_localization)
                .patch(update_localization)
                .delete(delete_localization),
        )
        .route(
            "/api/reportcases",
            get(list_report_cases).post(create_report_case),
        )
        .route(
            "/api/reportcases/:id",
            get(show_report_case)
                .put(update_report_case)
                .patch(update_report_case)
                .delete(delete_report_case),
        )
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(store)
}

/// Serve the API until Ctrl-C
pub async fn start_server(store: SharedStore, addr: SocketAddr) -> Result<()> {
    let app = create_server(store);

    info!("HTTP API listening on {}", addr);
    println!("🚀 HTTP server running on http://{addr}");
    println!("💚 Health check: http://{addr}/health");
    println!("📋 Report cases: http://{addr}/api/reportcases");

    Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down HTTP API");
        })
        .await?;

    Ok(())
}
