//! Admin statistics endpoints

use axum::{extract::State, Json};

use super::ApiError;
use crate::auth::Caller;
use crate::policy::{Operation, Resource};
use crate::state::AppState;
use crate::stats::{DashboardStats, ProductStats};

pub async fn dashboard(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<DashboardStats>, ApiError> {
    caller.authorize(Resource::Dashboard, Operation::Retrieve)?;
    Ok(Json(DashboardStats::compute(state.store()).await?))
}

pub async fn product_stats(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ProductStats>, ApiError> {
    caller.authorize(Resource::ProductStats, Operation::Retrieve)?;
    Ok(Json(ProductStats::compute(state.store()).await?))
}
