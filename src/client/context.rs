use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::types::{AuthPayload, PublicUser, SignInRequest, SignUpRequest};
use crate::client::api::ApiClient;
use crate::client::session::SessionStore;
use crate::error::{AppError, AuthError};

/// Client-side façade over the auth flows. Explicitly constructed and
/// passed down to whatever needs the current identity; there is no ambient
/// global.
///
/// Callers should await [`AuthContext::bootstrap`] to completion before
/// accepting sign-in attempts or rendering anything protected.
pub struct AuthContext {
    api: ApiClient,
    store: SessionStore,
    identity: RwLock<Option<PublicUser>>,
}

impl AuthContext {
    pub fn new(api: ApiClient, store: SessionStore) -> Self {
        Self {
            api,
            store,
            identity: RwLock::new(None),
        }
    }

    /// Restores a persisted session, if one exists and still verifies.
    /// An expired or invalid token clears the store and resolves to an
    /// anonymous state; only a network failure is surfaced as an error, in
    /// which case the stored session is kept for a later retry.
    pub async fn bootstrap(&self) -> Result<Option<PublicUser>, AppError> {
        let Some(session) = self.store.load()? else {
            *self.identity.write().await = None;
            return Ok(None);
        };

        match self.api.verify_token(&session.token).await {
            Ok(_) => {
                info!("Restored session for {}", session.user.email);
                *self.identity.write().await = Some(session.user.clone());
                Ok(Some(session.user))
            }
            Err(e) if e.is_auth_failure() => {
                info!("Stored session no longer valid, clearing");
                self.discard().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthPayload, AppError> {
        let request = SignUpRequest {
            email: email.to_string(),
            password: password.to_string(),
            full_name: full_name.to_string(),
        };
        request.validate()?;

        let payload = self.api.signup(&request).await?;
        self.establish(&payload).await?;
        Ok(payload)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthPayload, AppError> {
        let request = SignInRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let payload = self.api.signin(&request).await?;
        self.establish(&payload).await?;
        Ok(payload)
    }

    /// Never fails from the caller's perspective: the server notification
    /// is best-effort and local state is cleared regardless.
    pub async fn sign_out(&self) {
        let token = self
            .store
            .load()
            .ok()
            .flatten()
            .map(|session| session.token);

        if let Err(e) = self.api.signout(token.as_deref()).await {
            warn!("Server signout notification failed: {}", e);
        }

        self.discard().await;
    }

    /// Re-fetches the authoritative identity snapshot with the stored
    /// token, refreshing the persisted copy. Any 401-class failure clears
    /// the session before the error is returned, so stale cached data is
    /// never served afterwards.
    pub async fn current_identity(&self) -> Result<PublicUser, AppError> {
        let Some(session) = self.store.load()? else {
            return Err(AuthError::InvalidCredentials.into());
        };

        match self.api.me(&session.token).await {
            Ok(user) => {
                self.store.save(&session.token, &user)?;
                *self.identity.write().await = Some(user.clone());
                Ok(user)
            }
            Err(e) => {
                if e.is_auth_failure() {
                    self.discard().await;
                }
                Err(e)
            }
        }
    }

    /// The cached identity snapshot, if a session is established.
    pub async fn identity(&self) -> Option<PublicUser> {
        self.identity.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.identity.read().await.is_some()
    }

    async fn establish(&self, payload: &AuthPayload) -> Result<(), AppError> {
        self.store.save(&payload.token, &payload.user)?;
        *self.identity.write().await = Some(payload.user.clone());
        Ok(())
    }

    async fn discard(&self) {
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear session store: {}", e);
        }
        *self.identity.write().await = None;
    }
}
