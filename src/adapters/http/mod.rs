//! HTTP API - axum Router over the Use Cases
//!
//! Routes live under `/api/v1`. Every response, success or failure,
//! uses the `{status, data, message, heading}` envelope. Requests are
//! traced with `TraceLayer` and bounded by `TimeoutLayer`; a request that
//! runs out of time answers with the `Internal` envelope. CORS admits only
//! the configured client origin, with credentials.

pub mod handlers;
pub mod response;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use axum::http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument, warn};

use crate::config::ServerConfig;
use crate::domain::ServiceError;
use crate::usecases::{
    AuthService, FootballMetaService, MarketService, OrderIntake, TokenService, WalletService,
};

pub use response::ApiResponse;
pub use session::AuthUser;

/// Services reachable from handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    pub tokens: Arc<TokenService>,
    pub orders: Arc<OrderIntake>,
    pub markets: Arc<MarketService>,
    pub wallets: Arc<WalletService>,
    pub football: Arc<FootballMetaService>,
    /// Set `Secure` on session cookies.
    pub cookie_secure: bool,
}

/// Preflight cache lifetime.
const CORS_MAX_AGE: Duration = Duration::from_secs(300);

/// CORS for a single browser origin that sends cookies.
pub fn cors_layer(client_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(client_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            ACCEPT,
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([SET_COOKIE])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

/// `TimeoutLayer` answers with a bare 408; give it the error envelope.
async fn timeout_envelope(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        warn!("Request exceeded the server timeout");
        return ServiceError::internal("request timed out, retry later").into_response();
    }
    response
}

/// Wrap routes in the tracing, timeout and CORS layers.
fn with_layers(
    routes: Router<AppState>,
    request_timeout: Duration,
    client_origin: HeaderValue,
) -> Router<AppState> {
    routes
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::map_response(timeout_envelope))
        .layer(cors_layer(client_origin))
}

pub fn router(state: AppState, request_timeout: Duration, client_origin: HeaderValue) -> Router {
    let routes = Router::new()
        .route("/api/v1/auth/signup", post(handlers::sign_up))
        .route("/api/v1/auth/signin", post(handlers::sign_in))
        .route("/api/v1/auth/signout", post(handlers::sign_out))
        .route("/api/v1/auth/refresh", post(handlers::refresh))
        .route("/api/v1/auth/otp/send", post(handlers::send_otp))
        .route("/api/v1/auth/otp/verify", post(handlers::verify_otp))
        .route("/api/v1/auth/me", get(handlers::me))
        .route("/api/v1/markets", get(handlers::markets))
        .route("/api/v1/markets/create-order", post(handlers::create_order))
        .route("/api/v1/wallet", get(handlers::wallet))
        .route("/api/v1/football/competitions", get(handlers::competitions))
        .route("/api/v1/football/standings", get(handlers::standings))
        .route("/api/v1/football/seasons", get(handlers::seasons));
    with_layers(routes, request_timeout, client_origin).with_state(state)
}

/// Public API server.
pub struct ApiServer {
    router: Router,
    bind_address: String,
}

impl ApiServer {
    pub fn new(state: AppState, server: &ServerConfig) -> anyhow::Result<Self> {
        let origin = HeaderValue::from_str(server.client_base_url.trim_end_matches('/'))
            .context("server.client_base_url is not a valid origin")?;
        Ok(Self {
            router: router(
                state,
                Duration::from_secs(server.request_timeout_seconds),
                origin,
            ),
            bind_address: server.bind_address.clone(),
        })
    }

    /// Serve until the shutdown broadcast fires, letting in-flight
    /// requests finish.
    #[instrument(skip(self, shutdown_rx), fields(address = %self.bind_address))]
    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.bind_address).await?;
        info!(address = %self.bind_address, "API server started");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::{Backends, Services};
    use crate::config::Secrets;
    use crate::config::loader::parse_config;
    use crate::ports::mail::{MailDispatcher, OutboundMail};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE};
    use axum::http::Request;
    use crate::domain::ErrorKind;
    use serde_json::{Value, json};
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const CONFIG: &str = r#"
        [server]
        client_base_url = "http://localhost:3000"

        [storage]
        backend = "memory"

        [auth]
        bcrypt_cost = 4

        [mail]
        server_url = "http://localhost:4000/api/mail"

        [football]
    "#;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutboundMail>>);

    #[async_trait]
    impl MailDispatcher for Outbox {
        async fn send(&self, mail: &OutboundMail) -> anyhow::Result<()> {
            self.0.lock().await.push(mail.clone());
            Ok(())
        }
    }

    const CLIENT_ORIGIN: &str = "http://localhost:3000";

    struct Harness {
        app: Router,
        state: AppState,
        outbox: Arc<Outbox>,
    }

    fn harness() -> Harness {
        let config = parse_config(CONFIG).unwrap();
        let secrets = Secrets {
            auth_secret: "http-test-secret".into(),
            football_api_keys: vec![],
        };
        let outbox = Arc::new(Outbox::default());
        let services =
            Services::build(&config, &secrets, &Backends::in_memory(), outbox.clone(), None).unwrap();
        let state = services.app_state(false);
        Harness {
            app: router(
                state.clone(),
                Duration::from_secs(60),
                HeaderValue::from_static(CLIENT_ORIGIN),
            ),
            state,
            outbox,
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<String>, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let cookies = resp
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, cookies, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn cookie(cookies: &[String], name: &str) -> String {
        cookies
            .iter()
            .find_map(|c| c.strip_prefix(&format!("{name}=")))
            .and_then(|rest| rest.split(';').next())
            .unwrap()
            .to_string()
    }

    async fn sign_up(app: &Router) -> (String, String, String) {
        let (status, cookies, body) = send(
            app,
            post_json(
                "/api/v1/auth/signup",
                json!({"email": "ada@rivon.io", "name": "Ada", "password": "hunter22"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        (id, cookie(&cookies, "access_token"), cookie(&cookies, "refresh_token"))
    }

    #[tokio::test]
    async fn test_sign_up_sets_cookies_and_envelope() {
        let h = harness();
        let (status, cookies, body) = send(
            &h.app,
            post_json(
                "/api/v1/auth/signup",
                json!({"email": "ada@rivon.io", "name": "Ada", "password": "hunter22"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], 201);
        assert_eq!(body["heading"], "Request Processed");
        assert_eq!(body["data"]["verified"], false);
        assert!(cookies.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
        assert!(cookies.iter().any(|c| c.starts_with("refresh_token=") && c.contains("Max-Age=1296000")));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let h = harness();
        let (status, _, body) = send(
            &h.app,
            Request::get("/api/v1/auth/me").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], 401);
        assert_eq!(body["heading"], "Unauthorized ");
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_me_accepts_bearer_or_cookie() {
        let h = harness();
        let (_, access, _) = sign_up(&h.app).await;

        let by_header = Request::get("/api/v1/auth/me")
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&h.app, by_header).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["email"], "ada@rivon.io");

        let by_cookie = Request::get("/api/v1/auth/me")
            .header(COOKIE, format!("access_token={access}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, _) = send(&h.app, by_cookie).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unverified_order_is_forbidden() {
        let h = harness();
        let (_, access, _) = sign_up(&h.app).await;
        let req = Request::post("/api/v1/markets/create-order")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::from(
                json!({
                    "marketId": "7f1b6a9e-3c44-4d2a-9b8e-0e7f8a1c2d3e",
                    "price": 100, "quantity": 5, "orderType": "BUY"
                })
                .to_string(),
            ))
            .unwrap();
        let (status, _, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["heading"], "You are Forbidden for this service");
    }

    #[tokio::test]
    async fn test_verify_refresh_then_order() {
        let h = harness();
        let (id, access, refresh) = sign_up(&h.app).await;
        let auth = format!("Bearer {access}");

        let req = Request::post("/api/v1/auth/otp/send")
            .header(AUTHORIZATION, &auth)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&h.app, req).await.0, StatusCode::OK);
        let mail = h.outbox.0.lock().await.pop().unwrap();
        let code: String = mail
            .body
            .split("otp-text\">")
            .nth(1)
            .unwrap()
            .chars()
            .take(6)
            .collect();

        let mut wrong = post_json("/api/v1/auth/otp/verify", json!({"otp": "abcdef"}));
        wrong.headers_mut().insert(AUTHORIZATION, auth.parse().unwrap());
        assert_eq!(send(&h.app, wrong).await.0, StatusCode::UNPROCESSABLE_ENTITY);

        let mut verify = post_json("/api/v1/auth/otp/verify", json!({"otp": code}));
        verify.headers_mut().insert(AUTHORIZATION, auth.parse().unwrap());
        assert_eq!(send(&h.app, verify).await.0, StatusCode::OK);

        // The old access token still says unverified; refresh picks up the new row.
        let mut refresh_req = post_json("/api/v1/auth/refresh", json!({"id": id}));
        refresh_req
            .headers_mut()
            .insert(COOKIE, format!("refresh_token={refresh}").parse().unwrap());
        let (status, cookies, _) = send(&h.app, refresh_req).await;
        assert_eq!(status, StatusCode::OK);
        let fresh = cookie(&cookies, "access_token");

        let order = Request::post("/api/v1/markets/create-order")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {fresh}"))
            .body(Body::from(
                json!({
                    "marketId": "7f1b6a9e-3c44-4d2a-9b8e-0e7f8a1c2d3e",
                    "price": 100, "quantity": 5, "orderType": "BUY"
                })
                .to_string(),
            ))
            .unwrap();
        let (status, _, body) = send(&h.app, order).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(body["data"]["orderId"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_sign_out_requires_refresh_cookie_and_clears() {
        let h = harness();
        let (_, access, refresh) = sign_up(&h.app).await;

        let bare = Request::post("/api/v1/auth/signout")
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&h.app, bare).await.0, StatusCode::UNAUTHORIZED);

        let req = Request::post("/api/v1/auth/signout")
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .header(COOKIE, format!("refresh_token={refresh}"))
            .body(Body::empty())
            .unwrap();
        let (status, cookies, _) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let h = harness();
        let req = Request::post("/api/v1/auth/signin")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["heading"], "BadRequest");
    }

    #[tokio::test]
    async fn test_market_lookup_errors() {
        let h = harness();
        let req = Request::get("/api/v1/markets?marketId=nope").body(Body::empty()).unwrap();
        assert_eq!(send(&h.app, req).await.0, StatusCode::BAD_REQUEST);

        let req = Request::get("/api/v1/markets?marketId=7f1b6a9e-3c44-4d2a-9b8e-0e7f8a1c2d3e")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&h.app, req).await.0, StatusCode::NOT_FOUND);

        let req = Request::get("/api/v1/markets").body(Body::empty()).unwrap();
        let (status, _, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
    }

    #[tokio::test]
    async fn test_wallet_of_new_user_is_empty() {
        let h = harness();
        let (id, access, _) = sign_up(&h.app).await;
        let req = Request::get("/api/v1/wallet")
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = send(&h.app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["balance"], 0);
        assert_eq!(body["data"]["userId"], id);
    }

    fn authed_get(uri: &str, access: &str) -> Request<Body> {
        Request::get(uri)
            .header(AUTHORIZATION, format!("Bearer {access}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_football_routes_require_auth() {
        let h = harness();
        for uri in [
            "/api/v1/football/competitions",
            "/api/v1/football/standings",
            "/api/v1/football/seasons",
        ] {
            let req = Request::get(uri).body(Body::empty()).unwrap();
            assert_eq!(send(&h.app, req).await.0, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_football_ids_malformed_or_unknown() {
        let h = harness();
        let (_, access, _) = sign_up(&h.app).await;
        let unknown = "7f1b6a9e-3c44-4d2a-9b8e-0e7f8a1c2d3e";

        let (status, _, body) =
            send(&h.app, authed_get("/api/v1/football/competitions?leagueId=PL", &access)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["heading"], "BadRequest");

        let uri = format!("/api/v1/football/competitions?leagueId={unknown}");
        let (status, _, body) = send(&h.app, authed_get(&uri, &access)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["data"].is_null());

        let uri = "/api/v1/football/standings?seasonId=2025-PL";
        assert_eq!(send(&h.app, authed_get(uri, &access)).await.0, StatusCode::BAD_REQUEST);

        let uri = format!("/api/v1/football/standings?leagueId={unknown}");
        assert_eq!(send(&h.app, authed_get(&uri, &access)).await.0, StatusCode::NOT_FOUND);

        let uri = format!("/api/v1/football/standings?seasonId={unknown}");
        assert_eq!(send(&h.app, authed_get(&uri, &access)).await.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_football_lists_start_empty() {
        let h = harness();
        let (_, access, _) = sign_up(&h.app).await;
        for uri in [
            "/api/v1/football/competitions",
            "/api/v1/football/standings",
            "/api/v1/football/seasons",
        ] {
            let (status, _, body) = send(&h.app, authed_get(uri, &access)).await;
            assert_eq!(status, StatusCode::OK, "{uri}");
            assert_eq!(body["data"], json!([]), "{uri}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_uses_envelope() {
        async fn stall() -> &'static str {
            tokio::time::sleep(Duration::from_secs(5)).await;
            "late"
        }

        let h = harness();
        let app = with_layers(
            Router::new().route("/stall", get(stall)),
            Duration::from_millis(10),
            HeaderValue::from_static(CLIENT_ORIGIN),
        )
        .with_state(h.state);

        let req = Request::get("/stall").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], 500);
        assert_eq!(body["heading"], ErrorKind::Internal.descriptor().heading);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_preflight_admits_client_origin_with_credentials() {
        let h = harness();
        let preflight = |origin: &str| {
            Request::options("/api/v1/auth/signin")
                .header("origin", origin)
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type")
                .body(Body::empty())
                .unwrap()
        };

        let resp = h.app.clone().oneshot(preflight(CLIENT_ORIGIN)).await.unwrap();
        let headers = resp.headers();
        assert_eq!(headers["access-control-allow-origin"], CLIENT_ORIGIN);
        assert_eq!(headers["access-control-allow-credentials"], "true");

        let resp = h.app.clone().oneshot(preflight("http://evil.test")).await.unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_error_responses_carry_cors_headers() {
        let h = harness();
        let req = Request::get("/api/v1/auth/me")
            .header("origin", CLIENT_ORIGIN)
            .body(Body::empty())
            .unwrap();
        let resp = h.app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()["access-control-allow-origin"], CLIENT_ORIGIN);
    }
}
