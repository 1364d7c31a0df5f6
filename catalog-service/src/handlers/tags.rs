//! `/tags/` endpoints

use super::CollectionEndpoint;
use crate::models::{Id, Tag};
use crate::policy;
use crate::repository::Tags;

impl CollectionEndpoint for Tags {
    const POLICY: policy::Resource = policy::Resource::Tag;
    const PATH: &'static str = "/tags/";

    fn view_id(view: &Tag) -> Id {
        view.id
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::handlers::test_support::{send, test_app};

    #[tokio::test]
    async fn test_tag_listing_is_paginated() {
        let (app, _, tokens) = test_app().await;
        for name in ["new", "sale", "eco", "local"] {
            let (status, _) = send(
                &app,
                Method::POST,
                "/tags/",
                Some(&tokens.staff),
                Some(json!({ "name": name })),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, page) = send(&app, Method::GET, "/tags/?page=2&page_size=3", Some(&tokens.plain), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total_records"], 4);
        assert_eq!(page["total_pages"], 2);
        assert_eq!(page["current_page"], 2);
        assert_eq!(page["page_size"], 3);
        assert_eq!(page["results"][0]["name"], "local");
        assert_eq!(page["results"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let (app, _, tokens) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/tags/?page_size=0", Some(&tokens.plain), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_PAGINATION");
    }

    #[tokio::test]
    async fn test_deleting_tag_detaches_it_from_products() {
        let (app, _, tokens) = test_app().await;
        let staff = Some(tokens.staff.as_str());
        send(&app, Method::POST, "/categories/", staff, Some(json!({"name": "Kitchen"}))).await;
        send(&app, Method::POST, "/tags/", staff, Some(json!({"name": "sale"}))).await;
        send(
            &app,
            Method::POST,
            "/products/",
            staff,
            Some(json!({
                "name": "Kettle", "price": 30, "released_on": "2024-01-05",
                "category_id": 1, "tag_ids": [1]
            })),
        )
        .await;

        let (status, _) = send(&app, Method::DELETE, "/tags/1/", staff, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, product) = send(&app, Method::GET, "/products/1/", staff, None).await;
        assert_eq!(product["tags"], json!([]));
    }

    #[tokio::test]
    async fn test_delete_missing_tag() {
        let (app, _, tokens) = test_app().await;
        let (status, _) = send(&app, Method::DELETE, "/tags/9/", Some(&tokens.staff), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
