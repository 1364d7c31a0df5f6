//! Profile endpoints
//!
//! `/profiles/` lists every profile for admins. `/profile/` always addresses
//! the caller's own profile; it takes no id, so no other profile is reachable
//! through it.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    Json,
};

use super::extract::{parse_body, JsonBody};
use super::{ApiError, ApiErrorKind};
use crate::auth::{Actor, Caller};
use crate::models::{NewProfile, ProfileDetail, ProfilePatch, Validate};
use crate::pagination::{paginate, PageEnvelope, PageRequest};
use crate::policy::{Operation, Resource};
use crate::repository::{FilterCondition, Predicate, Repository};
use crate::state::AppState;

fn profile_not_found() -> ApiError {
    ApiError::new(ApiErrorKind::NotFound, "Profile not found")
}

async fn own_profile(state: &AppState, actor: &Actor) -> Result<ProfileDetail, ApiError> {
    let owned_by: Predicate = FilterCondition::eq("user.id", actor.id).into();
    state
        .store()
        .profiles()
        .find_first(&owned_by)
        .await?
        .ok_or_else(profile_not_found)
}

pub async fn list_profiles(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Result<PageEnvelope<ProfileDetail>, ApiError> {
    caller.authorize(Resource::ProfileList, Operation::List)?;
    let request = PageRequest::from_params(&params)?;
    let profiles = state.store().profiles();
    let page =
        paginate::<_, ProfileDetail, NewProfile, ProfilePatch>(&profiles, &Predicate::all(), request)
            .await?;
    Ok(page)
}

pub async fn retrieve_own_profile(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<ProfileDetail>, ApiError> {
    let actor = caller.authorize(Resource::OwnProfile, Operation::Retrieve)?;
    Ok(Json(own_profile(&state, actor).await?))
}

pub async fn update_own_profile(
    State(state): State<AppState>,
    caller: Caller,
    body: JsonBody,
) -> Result<Json<ProfileDetail>, ApiError> {
    let actor = caller.authorize(Resource::OwnProfile, Operation::Update)?;
    let profile = own_profile(&state, actor).await?;
    let patch: ProfilePatch = parse_body(body)?;
    patch.validate()?;

    let updated = state.store().profiles().update(&profile.id, patch).await?;
    tracing::info!(actor = actor.id, profile = profile.id, "profile updated");
    Ok(Json(updated))
}
