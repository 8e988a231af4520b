use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::auth::token::{Claims, TokenIssuer, TokenVerifier};
use crate::auth::types::normalize_email;
use crate::db::models::User;
use crate::db::store::UserStore;
use crate::error::{AppError, AuthError};

pub struct AuthService {
    store: Arc<dyn UserStore>,
    issuer: TokenIssuer,
    verifier: TokenVerifier,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            store,
            issuer: TokenIssuer::new(jwt_secret, token_ttl_hours),
            verifier: TokenVerifier::new(jwt_secret),
        }
    }

    /// Creates the credential record and signs the first token for it.
    /// Input shape is validated at the HTTP edge, not here.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<(User, String), AppError> {
        let password_hash = hash(password, DEFAULT_COST)?;
        let user = User::new(
            normalize_email(email),
            full_name.trim().to_string(),
            password_hash,
        );

        let user = self.store.create_user(&user).await?;
        let token = self.issuer.issue(user.id)?;

        Ok((user, token))
    }

    /// Validates submitted credentials against the stored hash. An unknown
    /// email and a wrong password fail identically, so callers cannot probe
    /// which accounts exist.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(User, String), AppError> {
        let user = self
            .store
            .find_by_email(&normalize_email(email))
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let token = self.issuer.issue(user.id)?;
        Ok((user, token))
    }

    /// Resolves the authoritative user record behind a bearer token. A
    /// token whose subject no longer exists is treated as invalid, not as
    /// an infrastructure error.
    pub async fn current_user(&self, token: &str) -> Result<User, AppError> {
        let claims = self.verifier.verify(token)?;
        let id = claims.subject_id()?;

        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AuthError::InvalidCredentials.into())
    }

    /// Gatekeeping check for protected routes. Side-effect free.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        self.verifier.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MemoryUserStore;

    fn service() -> AuthService {
        AuthService::new(Arc::new(MemoryUserStore::new()), "test_secret", 1)
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let service = service();

        let (user, token) = service
            .register("a@x.com", "secret1", "A")
            .await
            .unwrap();
        assert_eq!(user.email, "a@x.com");
        assert!(!token.is_empty());

        let (user2, token2) = service.authenticate("a@x.com", "secret1").await.unwrap();
        assert_eq!(user2.id, user.id);

        let claims = service.verify_token(&token2).unwrap();
        assert_eq!(claims.subject_id().unwrap(), user.id);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_fail_identically() {
        let service = service();
        service.register("a@x.com", "secret1", "A").await.unwrap();

        let wrong_password = service.authenticate("a@x.com", "wrong-password").await;
        let unknown_email = service.authenticate("nobody@x.com", "secret1").await;

        for result in [wrong_password, unknown_email] {
            match result {
                Err(AppError::AuthError(AuthError::InvalidCredentials)) => {}
                other => panic!("expected InvalidCredentials, got {:?}", other.map(|_| ())),
            }
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let service = service();
        service.register("a@x.com", "secret1", "A").await.unwrap();

        let err = service.register("a@x.com", "other-pass", "B").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AuthError(AuthError::DuplicateIdentifier)
        ));

        // First account still authenticates
        assert!(service.authenticate("a@x.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_email_lookup_is_case_insensitive() {
        let service = service();
        service.register("A@X.com", "secret1", "A").await.unwrap();
        assert!(service.authenticate("a@x.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn test_current_user_resolves_token_subject() {
        let service = service();
        let (user, token) = service.register("a@x.com", "secret1", "A").await.unwrap();

        let resolved = service.current_user(&token).await.unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_current_user_rejects_garbage_token() {
        let service = service();
        let err = service.current_user("garbage").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AuthError(AuthError::MalformedToken)
        ));
    }

    #[tokio::test]
    async fn test_token_for_deleted_subject_rejected() {
        let service = service();
        // Issued by a service over an empty store: valid signature, no user.
        let other = AuthService::new(Arc::new(MemoryUserStore::new()), "test_secret", 1);
        let (_, token) = other.register("a@x.com", "secret1", "A").await.unwrap();

        let err = service.current_user(&token).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AuthError(AuthError::InvalidCredentials)
        ));
    }
}
