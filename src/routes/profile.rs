use crate::{
    dto::response::ApiResponse,
    dto::user_dto::{ChangePasswordRequest, UpdateProfileRequest},
    error::Result,
    middleware::auth::AuthSession,
    AppState,
};
use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/users/profile",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current profile", body = ApiResponse),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse> {
    let user = state.auth_service.get_profile(session.user_id).await?;
    Ok(Json(ApiResponse::with_data(
        "Profile",
        json!({ "user": user }),
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/profile",
    security(("bearer" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse),
        (status = 400, description = "Validation failure or empty update")
    )
)]
#[axum::debug_handler]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth_service
        .update_profile(session.user_id, payload)
        .await?;
    Ok(Json(ApiResponse::with_data(
        "Profile updated",
        json!({ "user": user }),
    )))
}

#[utoipa::path(
    put,
    path = "/api/users/change-password",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse),
        (status = 401, description = "Current password incorrect"),
        (status = 404, description = "User not found")
    )
)]
#[axum::debug_handler]
pub async fn change_password(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth_service
        .change_password(session.user_id, payload)
        .await?;
    Ok(Json(ApiResponse::ok("Password changed")))
}
