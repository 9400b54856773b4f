pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::state::AppState;
use crate::{admissions, content, interview, storage};

/// Multipart framing allowance on top of the configured image size.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/login", post(auth::handle_login))
        .route("/api/v1/auth/logout", post(auth::handle_logout))
        .route("/api/v1/auth/me", get(auth::handle_me))
        // Uploads
        .route(
            "/api/v1/admin/uploads",
            post(storage::handle_upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .merge(content::routes())
        .merge(admissions::routes())
        .merge(interview::routes())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
    use serde_json::{json, Value};
    use sqlx::{postgres::PgPoolOptions, PgPool};
    use tower::ServiceExt;

    use crate::auth::accounts::{create_user, grant_role};
    use crate::auth::sessions::create_session;
    use crate::cache::PublicCache;
    use crate::config::Config;
    use crate::models::user::AppRole;

    /// A router whose backing services are never dialled unless a handler
    /// gets past validation and authentication.
    fn test_router() -> Router {
        let config = Config::for_tests();
        let db = PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .unwrap();
        router_with(db)
    }

    fn router_with(db: PgPool) -> Router {
        let config = Config::for_tests();
        let redis = redis::Client::open(config.redis_url.clone()).unwrap();
        let s3 = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(BehaviorVersion::latest())
                .region(Region::new("us-east-1"))
                .credentials_provider(Credentials::new("minio", "minio123", None, None, "test"))
                .endpoint_url(&config.s3_endpoint)
                .build(),
        );
        build_router(AppState {
            db,
            cache: PublicCache::new(redis, 0),
            s3,
            config,
        })
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "schoolsite-api");
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        for uri in [
            "/api/v1/admin/hero-slides",
            "/api/v1/admin/applications",
            "/api/v1/admin/interview-templates",
            "/api/v1/admin/contact-submissions",
            "/api/v1/admin/contact-addresses",
            "/api/v1/admin/contact-locations",
            "/api/v1/admin/contact-content",
        ] {
            let response = test_router()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_bearer_is_unauthorized() {
        let request = Request::get("/api/v1/auth/me")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let response = test_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_tracking_requires_both_fields() {
        let response = test_router()
            .oneshot(json_request(
                "POST",
                "/api/v1/admissions/track",
                json!({ "application_number": "MHS2025-1234", "mobile_number": " " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_kg_submission_with_unknown_stage_is_rejected() {
        let response = test_router()
            .oneshot(json_request(
                "POST",
                "/api/v1/admissions/kg-std",
                json!({
                    "full_name": "Aisha Rahman",
                    "gender": "female",
                    "date_of_birth": "2019-06-12",
                    "stage": "Doctorate",
                    "father_name": "Rahman",
                    "mother_name": "Safiya",
                    "house_name": "Noor Manzil",
                    "post_office": "Edappal",
                    "village": "Kalady",
                    "pincode": "679576",
                    "district": "Malappuram",
                    "mobile_number": "9847012345"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = test_router()
            .oneshot(Request::get("/api/v1/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_admin_routes_require_admin_role(pool: PgPool) {
        let user = create_user(&pool, "staff@example.com", "long enough", Some("Office staff"))
            .await
            .unwrap();
        let (token, _) = create_session(&pool, user.id, 1).await.unwrap();
        let request = || {
            Request::get("/api/v1/admin/hero-slides")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap()
        };

        let response = router_with(pool.clone()).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "FORBIDDEN");

        grant_role(&pool, user.id, AppRole::Admin).await.unwrap();
        let response = router_with(pool.clone()).oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[cfg_attr(not(feature = "db-tests"), ignore = "needs Postgres via DATABASE_URL")]
    async fn test_login_failures_look_alike(pool: PgPool) {
        create_user(&pool, "office@example.com", "Modern#2025", None)
            .await
            .unwrap();

        for (email, password) in [
            ("office@example.com", "wrong password"),
            ("nobody@example.com", "Modern#2025"),
        ] {
            let response = router_with(pool.clone())
                .oneshot(json_request(
                    "POST",
                    "/api/v1/auth/login",
                    json!({ "email": email, "password": password }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{email}");
        }

        let response = router_with(pool.clone())
            .oneshot(json_request(
                "POST",
                "/api/v1/auth/login",
                json!({ "email": " Office@Example.com ", "password": "Modern#2025" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_json(response).await["token"].is_string());
    }
}
