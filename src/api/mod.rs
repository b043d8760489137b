//! HTTP API served under `/api/v1`.
//!
//! Handlers are thin: they extract identity and input, call into [`crate::core`],
//! and wrap the result as `{"success": true, "data": ...}`. Failures render
//! through the `IntoResponse` impl in [`error`].

mod catalog;
mod dashboards;
mod error;
pub mod extractors;
mod orders;
mod payments;
mod users;

pub use extractors::{AdminUser, ApiJson, AuthUser, SellerUser};

use crate::{
    cache::CatalogCache,
    config::{MarketplaceConfig, MentorConfig, Settings},
    core::mentor::{self, MentorQuery},
    errors::{Error, Result},
    gateway::PaymentGateway,
};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, Method, header},
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: DatabaseConnection,
    /// Payment gateway (Stripe or in-memory)
    pub gateway: Arc<dyn PaymentGateway>,
    /// Deployment settings
    pub settings: Arc<Settings>,
    /// Static marketplace data from config.toml
    pub marketplace: Arc<MarketplaceConfig>,
    /// Published course listing memo
    pub catalog_cache: CatalogCache,
}

impl AppState {
    /// Percentage of each sale credited to sellers.
    #[must_use]
    pub fn seller_share_percent(&self) -> u8 {
        self.marketplace.marketplace.seller_share_percent
    }
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Always `true`
    pub success: bool,
    /// Payload
    pub data: T,
}

/// Handler result carrying a success envelope.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>>;

/// Wraps `data` in the success envelope.
pub fn ok<T>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<ApiResponse<Health>> {
    ok(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn mentors(
    State(state): State<AppState>,
    Query(query): Query<MentorQuery>,
) -> Json<ApiResponse<Vec<MentorConfig>>> {
    ok(mentor::match_mentors(&state.marketplace.mentors, &query))
}

fn cors_layer(settings: &Settings) -> Result<CorsLayer> {
    let Some(origin) = settings.client_origin.as_deref() else {
        return Ok(CorsLayer::permissive());
    };
    let origin = origin.parse::<HeaderValue>().map_err(|e| Error::Config {
        message: format!("Invalid CLIENT_ORIGIN '{origin}': {e}"),
    })?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

/// Builds the complete router.
///
/// # Errors
/// Returns [`Error::Config`] if the configured client origin is not a valid header value.
pub fn router(state: AppState) -> Result<Router> {
    let cors = cors_layer(&state.settings)?;

    let api = Router::new()
        .route("/health", get(health))
        // Accounts
        .route("/user/register", post(users::register))
        .route("/user/login", post(users::login))
        .route("/user/logout", post(users::logout))
        .route("/user/me", get(users::me))
        .route("/user/enrolled-courses", get(users::enrolled_courses))
        .route("/user/subscriptions", get(users::subscriptions))
        .route("/user/subscriptions/:id", delete(users::cancel_subscription))
        .route("/user/:id", get(users::profile))
        // Catalog
        .route(
            "/products",
            get(catalog::list_products).post(catalog::create_product),
        )
        .route(
            "/products/:id",
            get(catalog::get_product)
                .put(catalog::update_product)
                .delete(catalog::delete_product),
        )
        .route(
            "/course",
            get(catalog::list_courses).post(catalog::create_course),
        )
        .route(
            "/course/:id",
            get(catalog::get_course)
                .put(catalog::update_course)
                .delete(catalog::delete_course),
        )
        .route("/course/:id/publish", post(catalog::publish_course))
        .route("/course/:id/lectures", post(catalog::add_lecture))
        .route("/course/:id/subscribe", post(catalog::subscribe))
        // Orders and payments
        .route("/order", post(orders::create_order))
        .route("/order/mine", get(orders::my_orders))
        .route("/order/:id", get(orders::get_order))
        .route("/order/:id/status", put(orders::update_status))
        .route("/order/:id/tracking", put(orders::set_tracking))
        .route("/payment/intent", post(payments::create_intent))
        .route("/payment/verify", post(payments::verify))
        .route("/payment/webhook", post(payments::webhook))
        // Dashboards
        .route("/seller/dashboard", get(dashboards::seller_dashboard))
        .route("/seller/orders", get(dashboards::seller_orders))
        .route("/seller/earnings", get(dashboards::seller_earnings))
        .route("/seller/products", get(dashboards::seller_products))
        .route("/seller/courses", get(dashboards::seller_courses))
        .route("/admin/dashboard", get(dashboards::admin_dashboard))
        .route("/admin/orders", get(dashboards::admin_orders))
        .route("/admin/users", get(dashboards::admin_users))
        // Mentors
        .route("/mentors", get(mentors));

    Ok(Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::payment::IntentStatus;
    use crate::gateway::MockGateway;
    use crate::test_utils::{init_test_tracing, setup_test_db};
    use axum::{
        body::Body,
        http::{HeaderMap, Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    const WEBHOOK_SECRET: &str = "whsec_router_test";

    const MENTORS_TOML: &str = r#"
[marketplace]
seller_share_percent = 80

[[mentors]]
name = "Ada"
expertise = ["Rust", "Databases"]
years_experience = 10
hourly_rate = 12000
rating = 4.9
languages = ["English"]

[[mentors]]
name = "Bo"
expertise = ["React"]
years_experience = 4
hourly_rate = 6000
rating = 4.5
languages = ["English", "French"]
"#;

    struct TestApp {
        router: Router,
        gateway: MockGateway,
    }

    async fn test_app() -> TestApp {
        init_test_tracing();
        let db = setup_test_db().await.unwrap();
        let gateway = MockGateway::new();
        let settings = Settings {
            stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
            ..Settings::default()
        };
        let state = AppState {
            db,
            gateway: Arc::new(gateway.clone()),
            settings: Arc::new(settings),
            marketplace: Arc::new(MarketplaceConfig::from_toml_str(MENTORS_TOML).unwrap()),
            catalog_cache: CatalogCache::new(),
        };
        TestApp {
            router: router(state).unwrap(),
            gateway,
        }
    }

    async fn call(
        app: &TestApp,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value, HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json, headers)
    }

    /// Registers and logs in, returning the session token.
    async fn sign_up(app: &TestApp, email: &str, role: &str) -> String {
        let (status, _, _) = call(
            app,
            Method::POST,
            "/api/v1/user/register",
            None,
            Some(json!({ "name": "Test", "email": email, "password": "password123", "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body, _) = call(
            app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": email, "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app().await;
        let (status, body, _) = call(&app, Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["status"], "ok");
    }

    #[tokio::test]
    async fn test_cookie_session_lifecycle() {
        let app = test_app().await;
        call(
            &app,
            Method::POST,
            "/api/v1/user/register",
            None,
            Some(json!({ "name": "Lee", "email": "lee@example.com", "password": "password123" })),
        )
        .await;
        let (status, _, headers) = call(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "lee@example.com", "password": "password123" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let cookie = headers
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("token="));

        let request = |uri: &str, method: Method| {
            Request::builder()
                .method(method)
                .uri(uri)
                .header(header::COOKIE, cookie.clone())
                .body(Body::empty())
                .unwrap()
        };
        let response = app
            .router
            .clone()
            .oneshot(request("/api/v1/user/me", Method::GET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router
            .clone()
            .oneshot(request("/api/v1/user/logout", Method::POST))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .router
            .clone()
            .oneshot(request("/api/v1/user/me", Method::GET))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_errors_use_failure_envelope() {
        let app = test_app().await;

        let (status, body, _) = call(&app, Method::GET, "/api/v1/user/me", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert!(body["message"].is_string());

        let (status, body, _) = call(&app, Method::GET, "/api/v1/products/42", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/user/login",
            None,
            Some(json!({ "email": "missing-password@example.com" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_checkout_flow_credits_seller() {
        let app = test_app().await;
        let seller = sign_up(&app, "seller@example.com", "seller").await;
        let buyer = sign_up(&app, "buyer@example.com", "user").await;

        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/products",
            Some(&seller),
            Some(json!({ "name": "Keyboard", "price": 7500, "stock": 4 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let product_id = body["data"]["id"].as_i64().unwrap();

        // Buyers cannot list products.
        let (status, _, _) = call(
            &app,
            Method::POST,
            "/api/v1/products",
            Some(&buyer),
            Some(json!({ "name": "Nope", "price": 1, "stock": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/order",
            Some(&buyer),
            Some(json!({
                "kind": "product",
                "items": [{ "product_id": product_id, "quantity": 2 }],
                "shipping_address": {
                    "line1": "9 Elm Row", "city": "Leeds", "postal_code": "LS1", "country": "GB"
                },
                "expected_total": 15000
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "Pending");
        let order_id = body["data"]["id"].as_i64().unwrap();

        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/payment/intent",
            Some(&buyer),
            Some(json!({ "order_id": order_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let intent_id = body["data"]["intent_id"].as_str().unwrap().to_string();
        assert!(body["data"]["client_secret"].is_string());

        app.gateway.set_status(&intent_id, IntentStatus::Succeeded).unwrap();
        let (status, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/payment/verify",
            Some(&buyer),
            Some(json!({ "intent_id": intent_id })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["order"]["payment_status"], "Paid");
        assert_eq!(body["data"]["order"]["status"], "Processing");

        let (status, body, _) =
            call(&app, Method::GET, "/api/v1/seller/dashboard", Some(&seller), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_revenue"], 12000);
        assert_eq!(body["data"]["balance"], 12000);

        let (status, body, _) = call(
            &app,
            Method::PUT,
            &format!("/api/v1/order/{order_id}/status"),
            Some(&seller),
            Some(json!({ "status": "Pending" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);

        let (status, _, _) =
            call(&app, Method::GET, "/api/v1/admin/dashboard", Some(&seller), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_course_listing_tracks_writes() {
        let app = test_app().await;
        let seller = sign_up(&app, "instructor@example.com", "seller").await;

        let (_, body, _) = call(&app, Method::GET, "/api/v1/course", None, None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 0);

        let (_, body, _) = call(
            &app,
            Method::POST,
            "/api/v1/course",
            Some(&seller),
            Some(json!({ "title": "Rust for Web Developers", "price": 4900 })),
        )
        .await;
        let course_id = body["data"]["id"].as_i64().unwrap();
        call(
            &app,
            Method::POST,
            &format!("/api/v1/course/{course_id}/lectures"),
            Some(&seller),
            Some(json!({ "title": "Setup", "video_url": "https://cdn.example.com/setup.mp4" })),
        )
        .await;
        let (status, _, _) = call(
            &app,
            Method::POST,
            &format!("/api/v1/course/{course_id}/publish"),
            Some(&seller),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body, _) = call(&app, Method::GET, "/api/v1/course", None, None).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        // Anonymous viewers see the outline without video links.
        let (_, body, _) =
            call(&app, Method::GET, &format!("/api/v1/course/{course_id}"), None, None).await;
        assert_eq!(body["data"]["lectures"][0]["title"], "Setup");
        assert_eq!(body["data"]["lectures"][0]["video_url"], "");
    }

    #[tokio::test]
    async fn test_webhook_rejects_bad_signature() {
        let app = test_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/payment/webhook")
            .header(payments::SIGNATURE_HEADER, "t=1,v1=deadbeef")
            .body(Body::from(r#"{"type":"payment_intent.succeeded","data":{"object":{}}}"#))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_mentor_search() {
        let app = test_app().await;
        let (status, body, _) =
            call(&app, Method::GET, "/api/v1/mentors?skill=rust", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Ada");

        let (_, body, _) =
            call(&app, Method::GET, "/api/v1/mentors?language=french&max_rate=7000", None, None)
                .await;
        assert_eq!(body["data"][0]["name"], "Bo");
    }
}
