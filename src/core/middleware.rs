use crate::core::error::AppError;
use crate::features::auth::model::AuthenticatedUser;
use crate::features::auth::JwtValidator;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::now_v7().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request span carrying the x-request-id; `user_id` and `session` are
/// filled in once the bearer token is validated
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
            session = tracing::field::Empty,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

/// Guards the Swagger UI; `credentials` is "username:password"
pub async fn basic_auth_middleware(
    State(credentials): State<Arc<String>>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Basic "))
        .and_then(|encoded| BASE64_STANDARD.decode(encoded).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .is_some_and(|creds| creds == *credentials);

    if authorized {
        return next.run(req).await;
    }

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
        "Unauthorized",
    )
        .into_response()
}

fn record_caller(span: &Span, user: &AuthenticatedUser) {
    span.record("user_id", user.user_id());
    if let Some(session) = user.session_uid.as_deref() {
        span.record("session", session);
    }
}

pub async fn auth_middleware(
    State(validator): State<Arc<JwtValidator>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AppError::Unauthorized("Invalid authorization header format".to_string())
        })?;

    let user = validator.validate_token(token.trim()).await?;
    record_caller(&Span::current(), &user);

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::auth::JwksClient;
    use crate::shared::test_helpers::create_test_user;
    use axum::{middleware::from_fn_with_state, routing::get, Router};
    use axum_test::TestServer;
    use std::sync::Mutex;
    use std::time::Duration;
    use tower_http::trace::MakeSpan;

    async fn ok() -> &'static str {
        "ok"
    }

    fn basic_auth_server() -> TestServer {
        let app = Router::new()
            .route("/docs", get(ok))
            .layer(from_fn_with_state(
                Arc::new("admin:secret".to_string()),
                basic_auth_middleware,
            ));
        TestServer::new(app).unwrap()
    }

    fn bearer_server() -> TestServer {
        let jwks = Arc::new(JwksClient::new("http://127.0.0.1:9", Duration::from_secs(60)));
        let validator = Arc::new(JwtValidator::new(
            jwks,
            "http://127.0.0.1:9".to_string(),
            "filegate".to_string(),
            Duration::from_secs(0),
        ));
        let app = Router::new()
            .route("/private", get(ok))
            .route_layer(from_fn_with_state(validator, auth_middleware));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_basic_auth_accepts_matching_credentials() {
        let server = basic_auth_server();
        let encoded = BASE64_STANDARD.encode("admin:secret");

        let response = server
            .get("/docs")
            .add_header(header::AUTHORIZATION, format!("Basic {}", encoded))
            .await;

        response.assert_status_ok();
        response.assert_text("ok");
    }

    #[tokio::test]
    async fn test_basic_auth_rejects_wrong_credentials() {
        let server = basic_auth_server();
        let encoded = BASE64_STANDARD.encode("admin:wrong");

        let response = server
            .get("/docs")
            .add_header(header::AUTHORIZATION, format!("Basic {}", encoded))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_auth_middleware_requires_bearer_header() {
        let server = bearer_server();

        server
            .get("/private")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/private")
            .add_header(header::AUTHORIZATION, "Token abc")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        server
            .get("/private")
            .add_header(header::AUTHORIZATION, "Bearer ")
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_with_caller(user: &AuthenticatedUser) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let request = axum::http::Request::builder()
                .uri("/api/files/f1")
                .header("x-request-id", "req-1")
                .body(())
                .unwrap();
            let span = MakeSpanWithRequestId.make_span(&request);
            record_caller(&span, user);
            let _entered = span.enter();
            tracing::info!("handled");
        });

        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_request_span_records_caller() {
        let user = create_test_user("user-1");
        let line = logged_with_caller(&user);

        assert!(line.contains("request_id=req-1"));
        assert!(line.contains("user_id=\"user-1\"") || line.contains("user_id=user-1"));
        assert!(line.contains("test-session-uid"));
    }

    #[test]
    fn test_request_span_without_session() {
        let user = AuthenticatedUser {
            sub: "service-a".to_string(),
            session_uid: None,
        };
        let line = logged_with_caller(&user);

        assert!(line.contains("service-a"));
        assert!(!line.contains("session="));
    }

    #[test]
    fn test_request_id_is_uuid() {
        let request = axum::http::Request::builder().body(()).unwrap();
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let value = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(value).is_ok());
    }
}
