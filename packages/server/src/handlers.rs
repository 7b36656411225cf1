//! HTTP handler functions for the incident map API.

use actix_web::error::{InternalError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, web};
use incident_map_database::{DbError, Predicate, compile};
use incident_map_database_models::{FilterError, IncidentFilterParams};
use incident_map_server_models::{
    ApiError, ApiHealth, FILTER_REJECTED_MESSAGE, IncidentCountResponse, IncidentListParams,
    IncidentListResponse, effective_limit,
};

use crate::AppState;

/// Decoded query-string pairs, in request order.
type QueryPairs = web::Query<Vec<(String, String)>>;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth { status: "ok" })
}

/// `GET /api/incidents/count`
///
/// Counts incidents matching the time range, crime type, and bounding box
/// filters.
pub async fn incidents_count(state: web::Data<AppState>, query: QueryPairs) -> HttpResponse {
    let params: IncidentListParams = query.into_inner().into_iter().collect();
    let predicate = match compile(&IncidentFilterParams::from(&params)) {
        Ok(p) => p,
        Err(e) => return rejected(&e),
    };

    match state.store.count(&predicate).await {
        Ok(count) => HttpResponse::Ok().json(IncidentCountResponse::new(count)),
        Err(e) => storage_failure(&e),
    }
}

/// `GET /api/incidents`
///
/// Returns up to `limit` matching incidents (most recent first) along with
/// the true match count.
pub async fn incidents(state: web::Data<AppState>, query: QueryPairs) -> HttpResponse {
    let params: IncidentListParams = query.into_inner().into_iter().collect();
    let predicate = match compile(&IncidentFilterParams::from(&params)) {
        Ok(p) => p,
        Err(e) => return rejected(&e),
    };
    let limit = effective_limit(params.limit.as_deref());

    match list(&state, &predicate, limit).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(e) => storage_failure(&e),
    }
}

async fn list(
    state: &AppState,
    predicate: &Predicate,
    limit: u32,
) -> Result<IncidentListResponse, DbError> {
    let total = state.store.count(predicate).await?;
    let rows = state.store.select(predicate, limit).await?;
    Ok(IncidentListResponse::new(rows, total))
}

/// Error handler for query strings that cannot be decoded at all.
pub fn query_rejected(e: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    log::debug!("Rejected incident query string: {e}");
    let response = HttpResponse::BadRequest().json(ApiError::new(FILTER_REJECTED_MESSAGE));
    InternalError::from_response(e, response).into()
}

fn rejected(e: &FilterError) -> HttpResponse {
    log::debug!("Rejected incident filter: {e}");
    HttpResponse::BadRequest().json(ApiError::new(FILTER_REJECTED_MESSAGE))
}

fn storage_failure(e: &DbError) -> HttpResponse {
    log::error!("Failed to query incidents: {e}");
    HttpResponse::InternalServerError().json(ApiError::new("Failed to query incidents"))
}
