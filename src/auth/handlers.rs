use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    auth::{
        dto::{
            is_valid_email, EmailQuery, EmailRequest, MessageResponse, ResetPasswordRequest,
            TokenQuery, VerifyRequest,
        },
        error::AuthError,
        verification::{ConfirmOutcome, RequestOutcome, VerificationStatus},
    },
    error::{AppError, Result},
    state::AppState,
};

const VERIFICATION_SENT: &str = "A verification email has been sent. Please check your inbox.";
const ALREADY_VERIFIED: &str = "Your email is already verified!";
const RESET_REQUESTED: &str = "If the email exists, a reset link will be sent.";
const RESEND_REQUESTED: &str = "If the email exists, a verification email will be resent.";
const RESET_DONE: &str = "Password reset successful! You can now log in.";
const INVALID_RESET_LINK: &str = "Invalid or expired reset link.";

pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(verify_form).post(request_verification))
        .route("/verify", get(confirm_verification))
        .route("/check-verified", get(check_verified))
        .route("/resend-verification", post(resend_verification))
}

pub fn reset_routes() -> Router<AppState> {
    Router::new()
        .route("/forgot-password", get(forgot_form).post(request_reset))
        .route("/reset-password", get(reset_form).post(confirm_reset))
}

/// Malformed JSON is handled like an empty body so every endpoint answers
/// with its own "required fields" message.
fn body_or_default<T: Default>(payload: std::result::Result<Json<T>, JsonRejection>) -> T {
    match payload {
        Ok(Json(body)) => body,
        Err(e) => {
            warn!(error = %e, "unreadable json body");
            T::default()
        }
    }
}

pub async fn verify_form(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.verify_request())
}

#[instrument(skip(state, payload))]
pub async fn request_verification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let req = body_or_default(payload);
    if req.email.is_empty() || req.password.is_empty() {
        return Err(AuthError::Validation("Email and password required.".into()).into());
    }
    if !is_valid_email(&req.email) {
        warn!(email = %req.email, "invalid email");
        return Err(AuthError::Validation("Invalid email.".into()).into());
    }

    let message = match state
        .verification
        .request_verification(&req.email, &req.password)
        .await?
    {
        RequestOutcome::VerificationSent => VERIFICATION_SENT,
        RequestOutcome::AlreadyVerified => ALREADY_VERIFIED,
    };
    Ok(Json(MessageResponse::success(message)))
}

#[instrument(skip_all)]
pub async fn confirm_verification(
    State(state): State<AppState>,
    Query(q): Query<TokenQuery>,
) -> (StatusCode, Html<String>) {
    let page = |status, title, message| (status, Html(state.pages.message(title, message)));

    if q.token.is_empty() {
        return page(StatusCode::OK, "Invalid Link", "Verification token is missing.");
    }

    match state.verification.confirm_verification(&q.token).await {
        Ok(ConfirmOutcome::VerifiedSuccessfully) => page(
            StatusCode::OK,
            "Email Verified",
            "Your email is verified successfully!",
        ),
        Ok(ConfirmOutcome::AlreadyVerified) => {
            page(StatusCode::OK, "Already Verified", ALREADY_VERIFIED)
        }
        Err(AuthError::LinkExpired) => page(
            StatusCode::OK,
            "Verification Failed",
            "Email verification failed. The link has expired.",
        ),
        Err(AuthError::InvalidOrExpiredLink) => page(
            StatusCode::OK,
            "Invalid Link",
            "Invalid or expired verification link.",
        ),
        Err(e) => {
            error!(error = %e, "confirm verification failed");
            page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error",
                "Could not verify your email. Please try again later.",
            )
        }
    }
}

#[instrument(skip(state))]
pub async fn check_verified(
    State(state): State<AppState>,
    Query(q): Query<EmailQuery>,
) -> (StatusCode, Json<VerificationStatus>) {
    let unknown = VerificationStatus {
        verified: false,
        expired: false,
    };
    if q.email.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(unknown));
    }
    match state.verification.check_verified(&q.email).await {
        Ok(Some(status)) => (StatusCode::OK, Json(status)),
        Ok(None) => (StatusCode::NOT_FOUND, Json(unknown)),
        Err(e) => {
            error!(error = %e, "check verified failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(unknown))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn resend_verification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let req = body_or_default(payload);
    if req.email.is_empty() {
        return Err(AppError::bad_request("Email is required."));
    }
    state.verification.resend_verification(&req.email).await?;
    Ok(Json(MessageResponse::plain(RESEND_REQUESTED)))
}

pub async fn forgot_form(State(state): State<AppState>) -> Html<String> {
    Html(state.pages.forgot_password())
}

#[instrument(skip(state, payload))]
pub async fn request_reset(
    State(state): State<AppState>,
    payload: std::result::Result<Json<EmailRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let req = body_or_default(payload);
    if req.email.is_empty() {
        return Err(AppError::bad_request("Email is required."));
    }
    state.reset.request_reset(&req.email).await?;
    Ok(Json(MessageResponse::plain(RESET_REQUESTED)))
}

#[instrument(skip_all)]
pub async fn reset_form(
    State(state): State<AppState>,
    Query(q): Query<TokenQuery>,
) -> (StatusCode, Html<String>) {
    match state.reset.reset_form(&q.token).await {
        Ok(token) => (StatusCode::OK, Html(state.pages.reset_password(&token))),
        Err(AuthError::InvalidOrExpiredLink) => (
            StatusCode::OK,
            Html(state.pages.message("Invalid Link", INVALID_RESET_LINK)),
        ),
        Err(e) => {
            error!(error = %e, "reset form lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(state.pages.message("Error", "Please try again later.")),
            )
        }
    }
}

#[instrument(skip_all)]
pub async fn confirm_reset(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let req = body_or_default(payload);
    if req.email.is_empty() || req.password.is_empty() || req.token.is_empty() {
        return Err(AppError::bad_request(
            "Email, new password, and token are required.",
        ));
    }

    match state
        .reset
        .confirm_reset(&req.token, &req.email, &req.password)
        .await
    {
        Ok(()) => Ok(Json(MessageResponse::success(RESET_DONE))),
        Err(AuthError::InvalidOrExpiredLink) => Err(AppError::bad_request(INVALID_RESET_LINK)),
        Err(e) => Err(e.into()),
    }
}
