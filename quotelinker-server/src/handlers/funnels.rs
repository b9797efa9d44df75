//! Funnel tables, so a client can render the wizard without hard-coding steps.

use axum::{extract::Path, http::StatusCode, Json};
use quotelinker_core::{FunnelSpec, FunnelType};

use super::ApiResponse;

/// GET /api/funnels
pub async fn list_funnels() -> Json<ApiResponse<Vec<&'static FunnelSpec>>> {
    let specs = FunnelType::all().iter().map(|f| f.spec()).collect();
    Json(ApiResponse::ok("Available funnels", specs))
}

/// GET /api/funnels/:funnel (slug or page path, e.g. `term-life`)
pub async fn get_funnel(
    Path(funnel): Path<String>,
) -> Result<Json<ApiResponse<&'static FunnelSpec>>, (StatusCode, Json<ApiResponse<()>>)> {
    match FunnelType::parse(&funnel) {
        Some(funnel) => Ok(Json(ApiResponse::ok(funnel.insurance_type(), funnel.spec()))),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiResponse::err(format!("Unknown funnel: {funnel}"))),
        )),
    }
}
