use crate::services::token_service::TokenPurpose;
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

/// Identity established by the session middleware, available to handlers as
/// a request extension.
#[derive(Debug, Clone, Copy)]
pub struct AuthSession {
    pub user_id: i64,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
        .into_response()
}

pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return unauthorized("Missing authorization header");
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return unauthorized("Malformed authorization header");
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return unauthorized("Unsupported authorization scheme");
    };

    match state.token_service.verify(token, TokenPurpose::Session) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthSession {
                user_id: claims.sub,
            });
            next.run(req).await
        }
        Err(_) => unauthorized("Invalid or expired session token"),
    }
}
