//! `/productimages/` endpoints

use super::CollectionEndpoint;
use crate::models::{Id, ProductImage};
use crate::policy;
use crate::repository::ProductImages;

impl CollectionEndpoint for ProductImages {
    const POLICY: policy::Resource = policy::Resource::ProductImage;
    const PATH: &'static str = "/productimages/";

    fn view_id(view: &ProductImage) -> Id {
        view.id
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::handlers::test_support::{send, test_app};

    #[tokio::test]
    async fn test_image_lifecycle() {
        let (app, _, tokens) = test_app().await;
        let staff = Some(tokens.staff.as_str());
        send(&app, Method::POST, "/categories/", staff, Some(json!({"name": "Kitchen"}))).await;
        send(
            &app,
            Method::POST,
            "/products/",
            staff,
            Some(json!({
                "name": "Kettle", "price": 30, "released_on": "2024-01-05",
                "category_id": 1, "tag_ids": []
            })),
        )
        .await;

        let (status, image) = send(
            &app,
            Method::POST,
            "/productimages/",
            staff,
            Some(json!({"product": 1, "image": "products/kettle.jpg", "caption": "Front"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(image["product"], 1);

        let (status, image) = send(
            &app,
            Method::PUT,
            "/productimages/1/",
            staff,
            Some(json!({"caption": "Side"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(image["caption"], "Side");
        assert_eq!(image["image"], "products/kettle.jpg");

        let (status, _) = send(&app, Method::DELETE, "/productimages/1/", staff, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_image_requires_existing_product() {
        let (app, _, tokens) = test_app().await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/productimages/",
            Some(&tokens.staff),
            Some(json!({"product": 5, "image": "products/ghost.jpg"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["fields"]["product"][0], "Invalid pk \"5\" - object does not exist.");
    }
}
