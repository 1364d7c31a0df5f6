//! `POST /login/`

use axum::{extract::State, Json};
use serde::Deserialize;

use super::extract::{parse_body, JsonBody};
use super::ApiError;
use crate::auth::{authenticate, Login};
use crate::state::AppState;

/// Login credentials; missing fields are treated as empty
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    body: JsonBody,
) -> Result<Json<Login>, ApiError> {
    let credentials: LoginRequest = parse_body(body)?;
    let login = authenticate(&state, &credentials.username, &credentials.password).await?;
    Ok(Json(login))
}
