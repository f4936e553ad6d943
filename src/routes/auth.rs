use crate::{
    dto::auth_dto::{
        ForgotPasswordRequest, LoginRequest, RegisterRequest, ResendVerificationRequest,
        ResetPasswordRequest, VerifyEmailRequest,
    },
    dto::response::ApiResponse,
    error::Result,
    middleware::auth::AuthSession,
    AppState,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json};
use serde_json::json;
use validator::Validate;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse),
        (status = 400, description = "Validation failure or duplicate email")
    )
)]
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let (user, token) = state.auth_service.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_data(
            "Account created",
            json!({ "user": user, "token": token }),
        )),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse),
        (status = 400, description = "Validation failure"),
        (status = 401, description = "Invalid credentials, deactivated or unverified account")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let (user, token) = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(ApiResponse::with_data(
        "Logged in",
        json!({ "user": user, "token": token }),
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Logged out", body = ApiResponse),
        (status = 401, description = "Missing or invalid session token")
    )
)]
#[axum::debug_handler]
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
) -> Result<impl IntoResponse> {
    state.auth_service.logout(session.user_id).await?;
    Ok(Json(ApiResponse::ok("Logged out")))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset email sent", body = ApiResponse),
        (status = 400, description = "Validation failure"),
        (status = 404, description = "No active account for this email")
    )
)]
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.auth_service.forgot_password(&payload.email).await?;
    Ok(Json(ApiResponse::ok(
        "A password reset link has been sent to your email",
    )))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = ApiResponse),
        (status = 400, description = "Invalid, expired or superseded token")
    )
)]
#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .auth_service
        .reset_password(&payload.token, &payload.new_password)
        .await?;
    Ok(Json(ApiResponse::ok("Password has been reset")))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-email",
    request_body = VerifyEmailRequest,
    responses(
        (status = 200, description = "Email verified", body = ApiResponse),
        (status = 400, description = "Invalid token or already verified")
    )
)]
#[axum::debug_handler]
pub async fn verify_email(
    State(state): State<AppState>,
    Json(payload): Json<VerifyEmailRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state.auth_service.verify_email(&payload.token).await?;
    Ok(Json(ApiResponse::ok("Email address verified")))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-verification",
    request_body = ResendVerificationRequest,
    responses(
        (status = 200, description = "Verification email sent", body = ApiResponse),
        (status = 400, description = "Already verified"),
        (status = 404, description = "No active account for this email")
    )
)]
#[axum::debug_handler]
pub async fn resend_verification(
    State(state): State<AppState>,
    Json(payload): Json<ResendVerificationRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    state
        .auth_service
        .resend_verification(&payload.email)
        .await?;
    Ok(Json(ApiResponse::ok(
        "A verification link has been sent to your email",
    )))
}
