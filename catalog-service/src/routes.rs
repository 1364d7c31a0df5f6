//! Route table

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{collection_routes, health, login, profiles, stats, ApiError};
use crate::repository::{Categories, ProductImages, Products, Tags};
use crate::state::AppState;

/// Every endpoint, bound to `state`. Server middleware is applied separately.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .route("/login/", post(login::login))
        .merge(collection_routes::<Categories>())
        .merge(collection_routes::<Tags>())
        .merge(collection_routes::<Products>())
        .merge(collection_routes::<ProductImages>())
        .route("/profiles/", get(profiles::list_profiles))
        .route(
            "/profile/",
            get(profiles::retrieve_own_profile)
                .put(profiles::update_own_profile)
                .patch(profiles::update_own_profile),
        )
        .route("/dashboard/", get(stats::dashboard))
        .route("/product_stats/", get(stats::product_stats))
        .fallback(|| async { ApiError::not_found() })
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use crate::handlers::test_support::{send, test_app};

    #[tokio::test]
    async fn test_unknown_route_is_structured_404() {
        let (app, _, tokens) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/nowhere/", Some(&tokens.admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found.");
    }

    #[tokio::test]
    async fn test_pagination_example() {
        let (app, state, tokens) = test_app().await;
        let tags = state.store().tags();
        for n in 1..=25 {
            crate::repository::Repository::create(
                &tags,
                crate::models::NewTag {
                    name: Some(format!("tag-{n:02}")),
                },
            )
            .await
            .unwrap();
        }

        let (status, page) = send(
            &app,
            Method::GET,
            "/tags/?page=3&page_size=10",
            Some(&tokens.plain),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_records"], 25);
        assert_eq!(page["total_pages"], 3);
        let results = page["results"].as_array().unwrap();
        assert_eq!(results.len(), 5);
        assert_eq!(results[0]["name"], "tag-21");
        assert_eq!(results[4]["name"], "tag-25");

        let (status, page) = send(&app, Method::GET, "/tags/?page=9", Some(&tokens.plain), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["results"], serde_json::json!([]));
    }
}
