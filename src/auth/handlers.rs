use actix_web::{web, HttpRequest, HttpResponse};
use tracing::{error, info};

use crate::auth::types::{AuthPayload, MePayload, PublicUser, SignInRequest, SignUpRequest, TokenStatus};
use crate::error::{AppError, AuthError};
use crate::AppState;

/// Pulls the bearer token out of the `Authorization` header, if any.
fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

fn require_bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    bearer_token(req).ok_or_else(|| AppError::AuthError(AuthError::MalformedToken))
}

pub async fn signup(
    req: web::Json<SignUpRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received signup request for email: {}", req.email);
    req.validate()?;

    match state.auth_service.register(&req.email, &req.password, &req.full_name).await {
        Ok((user, token)) => {
            info!("Signup successful for email: {}", req.email);
            Ok(HttpResponse::Created().json(AuthPayload {
                token,
                user: PublicUser::from(&user),
            }))
        }
        Err(e) => {
            error!("Signup failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

pub async fn signin(
    req: web::Json<SignInRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received signin request for email: {}", req.email);
    req.validate()?;

    match state.auth_service.authenticate(&req.email, &req.password).await {
        Ok((user, token)) => {
            info!("Signin successful for email: {}", req.email);
            Ok(HttpResponse::Ok().json(AuthPayload {
                token,
                user: PublicUser::from(&user),
            }))
        }
        Err(e) => {
            error!("Signin failed for email: {}: {}", req.email, e);
            Err(e)
        }
    }
}

/// Bearer-gated: token verification runs before any lookup.
pub async fn me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = require_bearer_token(&req)?;
    let user = state.auth_service.current_user(token).await?;

    Ok(HttpResponse::Ok().json(MePayload {
        user: PublicUser::from(&user),
    }))
}

/// There is no server-side session state to destroy; tokens die at their
/// encoded expiry. Acknowledge so the client can clear its own state.
pub async fn signout(req: HttpRequest) -> Result<HttpResponse, AppError> {
    if let Some(token) = bearer_token(&req) {
        info!("Signout acknowledged for presented token ({} bytes)", token.len());
    } else {
        info!("Signout acknowledged without token");
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Successfully signed out"
    })))
}

pub async fn verify_token(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = require_bearer_token(&req)?;
    let claims = state.auth_service.verify_token(token)?;

    Ok(HttpResponse::Ok().json(TokenStatus { valid: true, claims }))
}
