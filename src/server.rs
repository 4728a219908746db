//! HTTP surface (feature `server`).
//!
//! - `GET /ping?token=…` — liveness check behind a shared secret. Answers a
//!   fixed string when the token matches, `403` otherwise. With no secret
//!   configured every request is forbidden.
//! - `POST /convert?filename=…` — raw PDF body in, JSON artifact out with a
//!   `Content-Disposition: attachment` header. Every request gets its own
//!   controller, so uploads never share session state.

use crate::config::ResumeConfig;
use crate::convert::convert_file;
use crate::error::Resume2JsonError;
use crate::pipeline::input::SelectedFile;
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

/// Body of a successful `/ping`.
pub const PING_RESPONSE: &str = "Server is alive and secure!";

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

const DEFAULT_UPLOAD_NAME: &str = "resume.pdf";

/// State shared across routes.
#[derive(Clone)]
pub struct ServerState {
    config: Arc<ResumeConfig>,
    ping_secret: Option<Arc<str>>,
}

impl ServerState {
    pub fn new(config: ResumeConfig, ping_secret: Option<String>) -> Self {
        Self {
            config: Arc::new(config),
            ping_secret: ping_secret.filter(|s| !s.is_empty()).map(Arc::from),
        }
    }
}

/// Build the application router.
pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/ping", get(ping))
        .route("/convert", post(convert_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Bind `addr` and serve until the process stops.
#[instrument(skip(state))]
pub async fn serve(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await
}

#[derive(Deserialize)]
struct PingQuery {
    token: Option<String>,
}

async fn ping(State(state): State<ServerState>, Query(query): Query<PingQuery>) -> (StatusCode, &'static str) {
    match (&state.ping_secret, query.token) {
        (Some(secret), Some(token)) if token.as_bytes() == secret.as_bytes() => {
            (StatusCode::OK, PING_RESPONSE)
        }
        _ => {
            warn!("Rejected /ping with a missing or wrong token");
            (StatusCode::FORBIDDEN, "Forbidden")
        }
    }
}

#[derive(Deserialize)]
struct ConvertQuery {
    filename: Option<String>,
}

async fn convert_upload(
    State(state): State<ServerState>,
    Query(query): Query<ConvertQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let name = query
        .filename
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());

    let declared = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .filter(|ct| !ct.starts_with("application/octet-stream"));
    let file = match declared {
        Some(content_type) => SelectedFile::with_mime_type(name, content_type, body.to_vec()),
        None => SelectedFile::from_bytes(name, body.to_vec()),
    };

    match convert_file(file, &state.config).await {
        Ok(output) => {
            let disposition = format!(
                "attachment; filename=\"{}\"",
                output.artifact.file_name.replace(['"', '\\'], "_")
            );
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, output.artifact.content_type.to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                output.artifact.bytes,
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

fn error_response(error: Resume2JsonError) -> Response {
    let status = match &error {
        Resume2JsonError::InvalidFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        Resume2JsonError::Extract(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Resume2JsonError::Structure(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": error.to_string() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app(secret: Option<&str>) -> Router {
        router(ServerState::new(
            ResumeConfig::default(),
            secret.map(str::to_string),
        ))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn ping_with_matching_token() {
        let response = app(Some("s3cret"))
            .oneshot(Request::get("/ping?token=s3cret").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, PING_RESPONSE);
    }

    #[tokio::test]
    async fn ping_with_wrong_or_missing_token() {
        for uri in ["/ping?token=nope", "/ping"] {
            let response = app(Some("s3cret"))
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
        }
    }

    #[tokio::test]
    async fn ping_without_configured_secret_is_forbidden() {
        let response = app(None)
            .oneshot(Request::get("/ping?token=").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn non_pdf_upload_is_unsupported_media_type() {
        let request = Request::post("/convert?filename=notes.txt")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let response = app(None).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body_text(response).await.contains("valid PDF"));
    }

    #[test]
    fn pipeline_errors_map_to_statuses() {
        use crate::error::{ExtractError, StructureError};

        let extract = error_response(ExtractError::PasswordRequired.into());
        assert_eq!(extract.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let structure = error_response(StructureError::transport("boom").into());
        assert_eq!(structure.status(), StatusCode::BAD_GATEWAY);
    }
}
