//! Generic REST handlers for catalog collections
//!
//! Every collection resource is served by the same five handlers:
//!
//! | route          | method        | operation |
//! |----------------|---------------|-----------|
//! | `{path}`       | `GET`         | list (paginated, optionally filtered) |
//! | `{path}`       | `POST`        | create (201 with `Location`) |
//! | `{path}{id}/`  | `GET`         | retrieve |
//! | `{path}{id}/`  | `PUT`/`PATCH` | partial update |
//! | `{path}{id}/`  | `DELETE`      | delete (204) |
//!
//! Each handler consults the access policy before resolving the path id,
//! reading the request body or touching the store. A resource opts in by implementing [`CollectionEndpoint`].

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};

use super::extract::{parse_body, JsonBody};
use super::{ApiError, Created, EntityId, NoContent};
use crate::auth::Caller;
use crate::models::{Id, Validate};
use crate::pagination::{paginate, PageEnvelope, PageRequest};
use crate::policy::{self, Operation};
use crate::repository::{FilterCondition, Predicate, Repository, Resource};
use crate::state::AppState;

/// A [`Resource`] exposed as a REST collection
pub trait CollectionEndpoint: Resource {
    /// Policy row guarding the collection
    const POLICY: policy::Resource;

    /// Collection path with leading and trailing slash, e.g. `/tags/`
    const PATH: &'static str;

    /// Restriction derived from the query string. Applies to listing and to
    /// item lookups, so an id outside the filtered set is not found.
    fn filter(_params: &HashMap<String, String>) -> Result<Predicate, ApiError> {
        Ok(Predicate::all())
    }

    fn view_id(view: &Self::View) -> Id;
}

/// Look up `id` inside the (possibly filtered) collection
async fn find_in_collection<E>(
    state: &AppState,
    id: Id,
    params: &HashMap<String, String>,
) -> Result<E::View, ApiError>
where
    E: CollectionEndpoint,
{
    let filter = E::filter(params)?;
    let repository = state.store().repository::<E>();
    let found = if filter.is_all() {
        repository.find_by_id(&id).await?
    } else {
        repository
            .find_first(&filter.and(FilterCondition::eq("id", id)))
            .await?
    };
    found.ok_or_else(|| ApiError::not_found().with_entity(E::NAME, id.to_string()))
}

pub async fn list<E>(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<HashMap<String, String>>,
) -> Result<PageEnvelope<E::View>, ApiError>
where
    E: CollectionEndpoint,
    E::View: Serialize,
{
    caller.authorize(E::POLICY, Operation::List)?;
    let filter = E::filter(&params)?;
    let request = PageRequest::from_params(&params)?;

    let repository = state.store().repository::<E>();
    let page = paginate::<_, E::View, E::Create, E::Update>(&repository, &filter, request).await?;
    Ok(page)
}

pub async fn retrieve<E>(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<EntityId, ApiError>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<E::View>, ApiError>
where
    E: CollectionEndpoint,
    E::View: Serialize,
{
    caller.authorize(E::POLICY, Operation::Retrieve)?;
    let EntityId(id) = id?;
    let record = find_in_collection::<E>(&state, id, &params).await?;
    Ok(Json(record))
}

pub async fn create<E>(
    State(state): State<AppState>,
    caller: Caller,
    body: JsonBody,
) -> Result<Created<E::View>, ApiError>
where
    E: CollectionEndpoint,
    E::View: Serialize,
    E::Create: DeserializeOwned + Validate,
{
    let actor = caller.authorize(E::POLICY, Operation::Create)?;
    let payload: E::Create = parse_body(body)?;
    payload.validate()?;

    let record = state.store().repository::<E>().create(payload).await?;
    let id = E::view_id(&record);
    tracing::info!(actor = actor.id, entity = E::NAME, id, "record created");

    Ok(Created::new(record).with_location(format!("{}{id}/", E::PATH)))
}

/// `PUT` and `PATCH` alike: only the supplied fields change
pub async fn update<E>(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<EntityId, ApiError>,
    Query(params): Query<HashMap<String, String>>,
    body: JsonBody,
) -> Result<Json<E::View>, ApiError>
where
    E: CollectionEndpoint,
    E::View: Serialize,
    E::Update: DeserializeOwned + Validate,
{
    let actor = caller.authorize(E::POLICY, Operation::Update)?;
    let EntityId(id) = id?;
    find_in_collection::<E>(&state, id, &params).await?;
    let patch: E::Update = parse_body(body)?;
    patch.validate()?;

    // The filter is checked again under the write
    let filter = E::filter(&params)?;
    let record = state
        .store()
        .repository::<E>()
        .update_matching(&id, &filter, patch)
        .await?
        .ok_or_else(|| ApiError::not_found().with_entity(E::NAME, id.to_string()))?;
    tracing::info!(actor = actor.id, entity = E::NAME, id, "record updated");
    Ok(Json(record))
}

pub async fn destroy<E>(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<EntityId, ApiError>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<NoContent, ApiError>
where
    E: CollectionEndpoint,
{
    let actor = caller.authorize(E::POLICY, Operation::Delete)?;
    let EntityId(id) = id?;
    let filter = E::filter(&params)?;

    if !state
        .store()
        .repository::<E>()
        .delete_matching(&id, &filter)
        .await?
    {
        return Err(ApiError::not_found().with_entity(E::NAME, id.to_string()));
    }
    tracing::info!(actor = actor.id, entity = E::NAME, id, "record deleted");
    Ok(NoContent)
}

/// Collection and item routes for `E`
pub fn collection_routes<E>() -> Router<AppState>
where
    E: CollectionEndpoint,
    E::View: Serialize,
    E::Create: DeserializeOwned + Validate,
    E::Update: DeserializeOwned + Validate,
{
    let item = format!("{}{{id}}/", E::PATH);
    Router::new()
        .route(E::PATH, get(list::<E>).post(create::<E>))
        .route(
            &item,
            get(retrieve::<E>)
                .put(update::<E>)
                .patch(update::<E>)
                .delete(destroy::<E>),
        )
}
