//! HTTP host for the lookup handler.
//!
//! One route, `GET|POST /api/getWeather`. The name is historical: the endpoint
//! performs a place-name search, not a weather lookup.

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use geosearch_core::{LocationLookup, LocationResult, LookupError};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub const LOOKUP_ROUTE: &str = "/api/getWeather";

/// Largest request body read when looking for a `location` field.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Application state injected into handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub lookup: Arc<LocationLookup>,
}

/// First `location` value in a raw query string.
///
/// A repeated parameter resolves to its first value. A query string that does
/// not decode yields `None`.
pub fn query_location(raw: Option<&str>) -> Option<String> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw?).ok()?;
    pairs
        .into_iter()
        .find(|(name, _)| name == "location")
        .map(|(_, value)| value)
}

/// Client-facing wrapper so lookup failures render as JSON with the right status.
#[derive(Debug)]
pub struct ApiError(pub LookupError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status()).unwrap_or(StatusCode::BAD_GATEWAY);
        (status, Json(self.0.body())).into_response()
    }
}

/// Build the router with tracing and the request timeout applied.
///
/// The timeout is a backstop: the upstream client gives up first and answers 502.
pub fn router(lookup: LocationLookup, request_timeout: Duration) -> Router {
    let state = AppState {
        lookup: Arc::new(lookup),
    };

    Router::new()
        .route(LOOKUP_ROUTE, get(lookup_location).post(lookup_location))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::GATEWAY_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

// If the caller disconnects, this future is dropped along with the pending upstream request.
async fn lookup_location(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
    body: Body,
) -> Result<Json<LocationResult>, ApiError> {
    let location = query_location(raw_query.as_deref());

    // The body is only a fallback source, so skip reading it when the query already resolves.
    let body = match location.as_deref() {
        Some(q) if !q.trim().is_empty() => Bytes::new(),
        _ => read_body(body).await,
    };

    state
        .lookup
        .handle(location.as_deref(), &body)
        .await
        .map(Json)
        .map_err(ApiError)
}

/// Buffer up to [`MAX_BODY_BYTES`]. An oversized or broken body counts as empty.
async fn read_body(body: Body) -> Bytes {
    match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unreadable request body");
            Bytes::new()
        }
    }
}

/// Serve until Ctrl-C.
pub async fn serve(listener: TcpListener, app: Router) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{Request, header};
    use geosearch_core::{Config, SearchClient, TransportError, UpstreamReply};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct StubClient {
        reply: Result<UpstreamReply, TransportError>,
        locations: Mutex<Vec<String>>,
    }

    impl StubClient {
        fn replying(status: u16, body: &str) -> Arc<Self> {
            Self::with(Ok(UpstreamReply {
                status,
                body: body.to_string(),
            }))
        }

        fn failing(message: &str) -> Arc<Self> {
            Self::with(Err(TransportError::new(message)))
        }

        fn with(reply: Result<UpstreamReply, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                locations: Mutex::new(Vec::new()),
            })
        }

        fn locations(&self) -> Vec<String> {
            self.locations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SearchClient for StubClient {
        async fn find(
            &self,
            location: &str,
            _api_key: &str,
        ) -> Result<UpstreamReply, TransportError> {
            self.locations.lock().unwrap().push(location.to_string());
            self.reply.clone()
        }
    }

    fn app(key: Option<&str>, client: &Arc<StubClient>) -> Router {
        let config = Config {
            api_key: key.map(str::to_string),
            ..Config::default()
        };
        router(
            LocationLookup::new(config, client.clone()),
            Duration::from_secs(5),
        )
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, String, String) {
        let res = app.oneshot(request).await.unwrap();
        let status = res.status();
        let content_type = res
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (
            status,
            content_type,
            String::from_utf8(bytes.to_vec()).unwrap(),
        )
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_request(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn get_with_query_returns_wrapped_upstream_json() {
        let client = StubClient::replying(200, r#"{"DEPTH1": "neath"}"#);
        let (status, content_type, body) = send(
            app(Some("KEY"), &client),
            get_request("/api/getWeather?location=Bristol"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/json");
        assert_eq!(
            body,
            r#"{"location":"Bristol","source":"OS Data Hub – Ordnance Survey","data":{"DEPTH1":"neath"}}"#
        );
    }

    #[tokio::test]
    async fn post_with_json_body_is_accepted() {
        let client = StubClient::replying(200, "{}");
        let (status, _, _) = send(
            app(Some("KEY"), &client),
            post_request("/api/getWeather", r#"{"location":"Swansea"}"#),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(client.locations(), vec!["Swansea"]);
    }

    #[tokio::test]
    async fn query_wins_over_body_and_is_decoded() {
        let client = StubClient::replying(200, "{}");
        let (status, _, _) = send(
            app(Some("KEY"), &client),
            post_request(
                "/api/getWeather?location=St%20Ives",
                r#"{"location":"Swansea"}"#,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(client.locations(), vec!["St Ives"]);
    }

    #[tokio::test]
    async fn missing_location_is_bad_request() {
        let client = StubClient::replying(200, "{}");
        let (status, _, body) = send(
            app(Some("KEY"), &client),
            post_request("/api/getWeather", "definitely not json"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            r#"{"error":"Missing required parameter 'location'. Pass it as a query string or JSON body."}"#
        );
        assert!(client.locations().is_empty());
    }

    #[tokio::test]
    async fn placeholder_key_is_server_error_without_upstream_call() {
        let client = StubClient::replying(200, "{}");
        let (status, _, body) = send(
            app(Some("<OS_DATA_HUB_API_KEY>"), &client),
            get_request("/api/getWeather?location=Bristol"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"Server configuration error: API key not set."}"#);
        assert!(client.locations().is_empty());
    }

    #[tokio::test]
    async fn upstream_status_is_passed_through() {
        let client = StubClient::replying(404, "not found");
        let (status, _, body) = send(
            app(Some("KEY"), &client),
            get_request("/api/getWeather?location=Atlantis"),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            r#"{"error":"OS Data Hub API returned 404.","detail":"not found"}"#
        );
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let client = StubClient::failing("connection refused");
        let (status, _, body) = send(
            app(Some("KEY"), &client),
            get_request("/api/getWeather?location=Bristol"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body,
            r#"{"error":"Unable to reach OS Data Hub API.","detail":"connection refused"}"#
        );
    }

    #[tokio::test]
    async fn identical_requests_get_identical_responses() {
        let client = StubClient::replying(200, r#"{"results":[{"NAME1":"Bristol"}]}"#);
        let app = app(Some("KEY"), &client);

        let uri = "/api/getWeather?location=Bristol";
        let first = send(app.clone(), get_request(uri)).await;
        let second = send(app, get_request(uri)).await;

        assert_eq!(first, second);
        assert_eq!(client.locations().len(), 2);
    }

    #[test]
    fn invalid_upstream_status_falls_back_to_bad_gateway() {
        let res = ApiError(LookupError::Upstream {
            status: 42,
            body: String::new(),
        })
        .into_response();

        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn query_location_takes_first_value() {
        assert_eq!(
            query_location(Some("location=Bath&location=Leeds")).as_deref(),
            Some("Bath")
        );
        assert_eq!(
            query_location(Some("q=1&location=St+Ives")).as_deref(),
            Some("St Ives")
        );
        assert_eq!(query_location(Some("q=1")), None);
        assert_eq!(query_location(None), None);
    }

    #[tokio::test]
    async fn repeated_location_parameter_uses_the_first() {
        let client = StubClient::replying(200, "{}");
        let (status, content_type, _) = send(
            app(Some("KEY"), &client),
            get_request("/api/getWeather?location=Bath&location=Leeds"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/json");
        assert_eq!(client.locations(), vec!["Bath"]);
    }

    #[tokio::test]
    async fn large_body_is_ignored_when_query_has_location() {
        let client = StubClient::replying(200, "{}");
        let (status, content_type, _) = send(
            app(Some("KEY"), &client),
            post_request("/api/getWeather?location=Bath", vec![b'x'; 3 * 1024 * 1024]),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type, "application/json");
        assert_eq!(client.locations(), vec!["Bath"]);
    }

    #[tokio::test]
    async fn oversized_body_without_query_is_missing_location() {
        let mut body = br#"{"location":"Leeds","padding":""#.to_vec();
        body.resize(MAX_BODY_BYTES + 1, b'x');
        body.extend_from_slice(br#""}"#);

        let client = StubClient::replying(200, "{}");
        let (status, content_type, body) = send(
            app(Some("KEY"), &client),
            post_request("/api/getWeather", body),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(content_type, "application/json");
        assert!(body.contains("Missing required parameter 'location'"));
        assert!(client.locations().is_empty());
    }
}
