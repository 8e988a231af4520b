use reqwest::StatusCode;
use serde::Deserialize;
use tracing::error;

use crate::auth::types::{AuthPayload, MePayload, PublicUser, SignInRequest, SignUpRequest, TokenStatus};
use crate::error::{AppError, AuthError};

/// Typed HTTP client for the auth endpoints. Transport details never leak
/// past this module; callers see the shared error taxonomy.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[allow(dead_code)]
    status: u16,
    code: String,
    message: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn signup(&self, req: &SignUpRequest) -> Result<AuthPayload, AppError> {
        let resp = self
            .http
            .post(self.url("/auth/signup"))
            .json(req)
            .send()
            .await
            .map_err(transport)?;

        Self::decode(resp).await
    }

    pub async fn signin(&self, req: &SignInRequest) -> Result<AuthPayload, AppError> {
        let resp = self
            .http
            .post(self.url("/auth/signin"))
            .json(req)
            .send()
            .await
            .map_err(transport)?;

        Self::decode(resp).await
    }

    pub async fn me(&self, token: &str) -> Result<PublicUser, AppError> {
        let resp = self
            .http
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let payload: MePayload = Self::decode(resp).await?;
        Ok(payload.user)
    }

    pub async fn signout(&self, token: Option<&str>) -> Result<(), AppError> {
        let mut request = self.http.post(self.url("/auth/signout"));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await.map_err(transport)?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_from_response(resp).await)
        }
    }

    pub async fn verify_token(&self, token: &str) -> Result<TokenStatus, AppError> {
        let resp = self
            .http
            .post(self.url("/auth/verify-token"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        Self::decode(resp).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, AppError> {
        if resp.status().is_success() {
            resp.json().await.map_err(transport)
        } else {
            Err(Self::error_from_response(resp).await)
        }
    }

    /// Maps an error response back into the shared taxonomy: the `code` tag
    /// in the body when present, the status code otherwise.
    async fn error_from_response(resp: reqwest::Response) -> AppError {
        let status = resp.status();
        let body = resp.json::<ErrorBody>().await.ok();

        if let Some(body) = body {
            if let Some(auth) = AuthError::from_code(&body.error.code) {
                return auth.into();
            }
            if body.error.code == "validation_failure" {
                return AppError::ValidationError(body.error.message);
            }
        }

        match status {
            StatusCode::UNAUTHORIZED => AuthError::InvalidCredentials.into(),
            StatusCode::CONFLICT => AuthError::DuplicateIdentifier.into(),
            StatusCode::BAD_REQUEST => AppError::ValidationError("invalid input".into()),
            _ => AppError::InternalError(format!("server returned {}", status)),
        }
    }
}

fn transport(err: reqwest::Error) -> AppError {
    // Specifics go to the log; callers get the generic failure.
    error!("transport error: {}", err);
    AppError::NetworkFailure
}
