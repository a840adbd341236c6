//! HTTP middleware for request identification and metrics tracking.
//!
//! This module provides middleware for attaching request IDs and for
//! tracking request metrics including duration, status codes, and the
//! model served.

use crate::core::metrics::get_metrics;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

/// Extension type for storing the model name in the response.
///
/// Handlers insert this so the metrics middleware can label request
/// metrics with the model actually served.
#[derive(Clone, Debug)]
pub struct ModelName(pub String);

/// Extension type carrying the request ID through the handler chain
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Generate a new unique request ID using UUID v4.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Middleware attaching a request ID to every request and response.
///
/// An inbound `x-request-id` header is reused so callers can correlate
/// their logs with ours; otherwise a fresh UUID v4 is generated. The ID
/// is stored as a request extension and echoed in the `x-request-id`
/// response header.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(generate_request_id);

    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Middleware for tracking request metrics.
pub struct MetricsMiddleware;

impl MetricsMiddleware {
    /// Track metrics for incoming requests.
    ///
    /// This middleware:
    /// - Measures request duration
    /// - Records request count by status code and model
    /// - Logs request details
    ///
    /// For streaming responses the measured duration is time to first
    /// byte, since `next.run()` returns once response headers are ready.
    ///
    /// # Arguments
    ///
    /// * `request` - Incoming HTTP request
    /// * `next` - Next middleware/handler in the chain
    pub async fn track_metrics(request: Request, next: Next) -> Response {
        let endpoint = request.uri().path().to_string();
        let method = request.method().to_string();

        // Skip metrics endpoint itself to avoid recursion
        if endpoint == "/metrics" {
            return next.run(request).await;
        }

        let metrics = get_metrics();
        let start = Instant::now();

        let response = next.run(request).await;

        let duration = start.elapsed().as_secs_f64();
        let status_code = response.status().as_u16().to_string();

        // Model is set by completion handlers via response extensions
        let model = response
            .extensions()
            .get::<ModelName>()
            .map(|m| m.0.as_str())
            .unwrap_or("unknown");

        metrics
            .request_count
            .with_label_values(&[&method, &endpoint, model, &status_code])
            .inc();

        metrics
            .request_duration
            .with_label_values(&[&method, &endpoint, model])
            .observe(duration);

        let is_streaming = response
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/event-stream"))
            .unwrap_or(false);

        if is_streaming {
            tracing::info!(
                "{} {} - status={} model={} ttfb={:.3}s",
                method,
                endpoint,
                status_code,
                model,
                duration
            );
        } else {
            tracing::info!(
                "{} {} - status={} duration={:.3}s",
                method,
                endpoint,
                status_code,
                duration
            );
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::init_metrics;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        middleware,
        response::Response,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_middleware_tracks_request() {
        init_metrics();

        async fn handler() -> &'static str {
            "ok"
        }

        let app = Router::new()
            .route("/test", get(handler))
            .layer(middleware::from_fn(MetricsMiddleware::track_metrics));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_skips_metrics_endpoint() {
        init_metrics();

        async fn handler() -> &'static str {
            "metrics"
        }

        let app = Router::new()
            .route("/metrics", get(handler))
            .layer(middleware::from_fn(MetricsMiddleware::track_metrics));

        let request = Request::builder()
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_records_model_from_extensions() {
        init_metrics();
        let metrics = get_metrics();

        async fn handler() -> Response<Body> {
            let mut response = Response::new(Body::from("ok"));
            response
                .extensions_mut()
                .insert(ModelName("gpt-4o-mini".to_string()));
            response
        }

        let app = Router::new()
            .route("/test-model", get(handler))
            .layer(middleware::from_fn(MetricsMiddleware::track_metrics));

        let request = Request::builder()
            .uri("/test-model")
            .body(Body::empty())
            .unwrap();

        let _response = app.oneshot(request).await.unwrap();

        let metric = metrics
            .request_duration
            .with_label_values(&["GET", "/test-model", "gpt-4o-mini"]);
        assert!(metric.get_sample_count() > 0);
    }

    #[tokio::test]
    async fn test_request_id_added_to_response() {
        async fn handler() -> &'static str {
            "ok"
        }

        let app = Router::new()
            .route("/test", get(handler))
            .layer(middleware::from_fn(request_id_middleware));

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        let request_id = response.headers().get("x-request-id");
        assert!(request_id.is_some());
        assert!(!request_id.unwrap().to_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_request_id_reuses_inbound_header() {
        async fn handler() -> &'static str {
            "ok"
        }

        let app = Router::new()
            .route("/test", get(handler))
            .layer(middleware::from_fn(request_id_middleware));

        let request = Request::builder()
            .uri("/test")
            .header("x-request-id", "client-supplied-id")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(
            response.headers().get("x-request-id").unwrap(),
            "client-supplied-id"
        );
    }

    #[test]
    fn test_generate_request_id_unique() {
        let a = generate_request_id();
        let b = generate_request_id();
        assert_ne!(a, b);
    }
}
