//! JSON API served under `/api`.
//!
//! | method | path | |
//! |--------|------|-|
//! | GET    | `/api/restaurants` | full collection |
//! | POST   | `/api/restaurants` | create, 201 |
//! | GET    | `/api/restaurants/{id}` | one record |
//! | PUT    | `/api/restaurants/{id}` | replace all but `id`/`createdAt` |
//! | DELETE | `/api/restaurants/{id}` | `{message, deleted}` |
//! | GET    | `/api/og-image?url=` | `{imageUrl}` |
//!
//! Errors are `{"error": "..."}` with 400, 404, 409 or 500.

mod error;
mod handlers;

use axum::routing::get;
use axum::Router;

use crate::service::RecordService;
use crate::thumbnail::ThumbnailResolver;

pub use error::ApiError;
pub use handlers::{DeleteResponse, PreviewResponse};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Record operations over the configured store.
    pub records: RecordService,
    /// Preview image lookup.
    pub thumbnails: ThumbnailResolver,
}

/// Routes of the JSON API.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/restaurants",
            get(handlers::list_restaurants).post(handlers::create_restaurant),
        )
        .route(
            "/api/restaurants/{id}",
            get(handlers::get_restaurant)
                .put(handlers::update_restaurant)
                .delete(handlers::delete_restaurant),
        )
        .route("/api/og-image", get(handlers::preview_image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::test_support::spawn_router;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Html;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState {
            records: RecordService::new(Arc::new(MemoryStore::new())),
            thumbnails: ThumbnailResolver::new("test-agent", None).unwrap(),
        };
        router().with_state(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn cafe(name: &str) -> Value {
        json!({ "name": name, "category": "Cafe", "nearestStation": "X", "address": "Y" })
    }

    #[tokio::test]
    async fn test_create_on_empty_collection() {
        let app = app();

        let (status, created) = send(&app, Method::POST, "/api/restaurants", Some(cafe("A"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["id"].as_str().is_some_and(|id| !id.is_empty()));
        assert!(created["createdAt"].as_str().is_some_and(|t| t.ends_with('Z')));
        assert_eq!(created["author"], "anonymous");
        assert_eq!(created["rating"], 0.0);
        assert_eq!(created["budget"], "");

        let (status, all) = send(&app, Method::GET, "/api/restaurants", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(all, json!([created]));
    }

    #[tokio::test]
    async fn test_list_empty_is_array() {
        let (status, body) = send(&app(), Method::GET, "/api/restaurants", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_create_missing_fields_is_400() {
        let app = app();
        let (status, body) = send(
            &app,
            Method::POST,
            "/api/restaurants",
            Some(json!({ "name": "A", "category": "" })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().unwrap();
        assert!(message.contains("category"));
        assert!(message.contains("nearestStation"));

        let (_, all) = send(&app, Method::GET, "/api/restaurants", None).await;
        assert_eq!(all, json!([]));
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let app = app();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/restaurants")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_put_delete_flow() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/api/restaurants", Some(cafe("A"))).await;
        let uri = format!("/api/restaurants/{}", created["id"].as_str().unwrap());

        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let mut changes = cafe("A2");
        changes["id"] = json!("forged");
        changes["createdAt"] = json!("2001-01-01T00:00:00.000Z");
        changes["rating"] = json!("4");
        let (status, updated) = send(&app, Method::PUT, &uri, Some(changes)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["createdAt"], created["createdAt"]);
        assert_eq!(updated["name"], "A2");
        assert_eq!(updated["rating"], 4.0);

        let (status, deleted) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(deleted["deleted"], updated);
        assert!(deleted["message"].is_string());

        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_unknown_id_is_404() {
        let app = app();
        for method in [Method::GET, Method::DELETE] {
            let (status, _) = send(&app, method, "/api/restaurants/nope", None).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
        let (status, _) = send(&app, Method::PUT, "/api/restaurants/nope", Some(cafe("A"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_put_missing_field_is_400_and_keeps_record() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/api/restaurants", Some(cafe("A"))).await;
        let uri = format!("/api/restaurants/{}", created["id"].as_str().unwrap());

        let mut changes = cafe("Renamed");
        changes["address"] = json!("");
        let (status, body) = send(&app, Method::PUT, &uri, Some(changes)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("address"));

        let (_, stored) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(stored, created);
    }

    #[tokio::test]
    async fn test_put_then_put_reflects_last() {
        let app = app();
        let (_, created) = send(&app, Method::POST, "/api/restaurants", Some(cafe("A"))).await;
        let uri = format!("/api/restaurants/{}", created["id"].as_str().unwrap());

        let mut first = cafe("A");
        first["comment"] = json!("from A");
        send(&app, Method::PUT, &uri, Some(first)).await;
        let mut second = cafe("B");
        second["phone"] = json!("03-0000");
        let (_, written) = send(&app, Method::PUT, &uri, Some(second)).await;

        let (_, stored) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(stored, written);
        assert_eq!(stored["comment"], "");
    }

    #[tokio::test]
    async fn test_og_image_requires_url() {
        let app = app();
        for uri in ["/api/og-image", "/api/og-image?url="] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["error"], "URL parameter is required");
        }
    }

    #[tokio::test]
    async fn test_og_image_resolves_and_fails() {
        let page = Router::new()
            .route(
                "/shop",
                get(|| async { Html(r#"<meta property="og:image" content="https://img/a.png">"#) }),
            )
            .route("/down", get(|| async { StatusCode::BAD_GATEWAY }));
        let addr = spawn_router(page).await;
        let app = app();

        let (status, body) =
            send(&app, Method::GET, &format!("/api/og-image?url=http://{addr}/shop"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "imageUrl": "https://img/a.png" }));

        let (status, body) =
            send(&app, Method::GET, &format!("/api/og-image?url=http://{addr}/down"), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch preview image");
    }
}
