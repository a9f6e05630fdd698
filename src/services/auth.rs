use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use rand::RngCore;
use uuid::Uuid;

use crate::clients::GoogleVerifier;
use crate::clock::Clock;
use crate::error::{AppError, StoreError};
use crate::models::{AuthPayload, AuthProvider, NewUser, PasswordResetToken, User, UserProfile, UserRole};
use crate::security::{JwtService, PasswordHasher};
use crate::services::courier::Courier;
use crate::store::Store;

const RESET_TOKEN_BYTES: usize = 32;
const RESET_TOKEN_TTL_HOURS: i64 = 1;
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Fields accepted by local registration
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
    pub name: Option<String>,
    pub social_id: Option<String>,
}

/// Social login request as received from the client
#[derive(Debug, Clone)]
pub struct SocialLogin {
    pub provider: String,
    pub access_token: String,
    pub email: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug)]
struct SocialIdentity {
    provider: AuthProvider,
    email: String,
    name: Option<String>,
    avatar_url: Option<String>,
    social_id: Option<String>,
}

/// Registration, credentials and session issuance
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn PasswordHasher>,
    jwt: JwtService,
    google: Arc<dyn GoogleVerifier>,
    courier: Courier,
    clock: Arc<dyn Clock>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn PasswordHasher>,
        jwt: JwtService,
        google: Arc<dyn GoogleVerifier>,
        courier: Courier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, hasher, jwt, google, courier, clock }
    }

    pub async fn register(&self, registration: Registration) -> Result<User, AppError> {
        let email = registration.email.trim().to_string();
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(already_registered());
        }

        let password_hash = self.hash_password(&registration.password).await?;
        let new_user = NewUser {
            id: Uuid::new_v4(),
            email,
            phone: non_empty(registration.phone),
            password_hash,
            name: non_empty(registration.name),
            role: UserRole::User,
            auth_provider: AuthProvider::Local,
            social_id: non_empty(registration.social_id),
            avatar_url: None,
            created_at: self.clock.now(),
        };

        let user = match self.store.insert_user(new_user).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(already_registered()),
            Err(err) => return Err(err.into()),
        };
        log::info!("Registered user {}", user.id);

        self.courier.welcome(&user.email, user.name.as_deref()).await;
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(|| AppError::Unauthorized(INVALID_CREDENTIALS.into()))?;

        if !self.verify_password(password, &user.password_hash).await? {
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.into()));
        }
        Ok(user)
    }

    /// Signs a bearer token for the user and pairs it with the public profile.
    pub fn issue_token(&self, user: &User) -> Result<AuthPayload, AppError> {
        Ok(AuthPayload {
            token: self.jwt.issue(user)?,
            user: UserProfile::from(user),
        })
    }

    /// Creates and emails a reset token. Unknown emails yield `InvalidOperation`,
    /// which the HTTP layer hides behind the same success response.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .store
            .find_user_by_email(email.trim())
            .await?
            .ok_or_else(|| {
                AppError::InvalidOperation("If the email exists, a reset link will be sent".into())
            })?;

        let now = self.clock.now();
        let token = PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: user.id,
            token: generate_reset_token(),
            expires_at: now + Duration::hours(RESET_TOKEN_TTL_HOURS),
            is_used: false,
            created_at: now,
        };
        self.store.insert_reset_token(&token).await?;
        log::info!("Issued password reset token for user {}", user.id);

        self.courier.password_reset(&user.email, &token.token).await;
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        let reset = self
            .store
            .find_reset_token(token.trim())
            .await?
            .filter(|t| !t.is_used)
            .ok_or_else(|| AppError::InvalidOperation("Invalid or expired reset token".into()))?;

        let now = self.clock.now();
        if now > reset.expires_at {
            return Err(AppError::InvalidOperation("Reset token has expired".into()));
        }

        let password_hash = self.hash_password(new_password).await?;
        let consumed = self
            .store
            .consume_reset_token(reset.id, reset.user_id, &password_hash, now)
            .await?;
        if !consumed {
            return Err(AppError::InvalidOperation("Invalid or expired reset token".into()));
        }
        log::info!("Password reset for user {}", reset.user_id);
        Ok(())
    }

    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if !self.verify_password(current_password, &user.password_hash).await? {
            return Err(AppError::Unauthorized("Current password is incorrect".into()));
        }

        user.password_hash = self.hash_password(new_password).await?;
        user.updated_at = self.clock.now();
        self.store.update_user(&user).await?;
        Ok(())
    }

    pub async fn social_login(&self, request: SocialLogin) -> Result<User, AppError> {
        let identity = self.resolve_identity(request).await?;

        let existing = self
            .store
            .find_user_by_email_or_social(
                &identity.email,
                identity.provider,
                identity.social_id.as_deref(),
            )
            .await?;

        if let Some(mut user) = existing {
            if reconcile(&mut user, &identity) {
                user.updated_at = self.clock.now();
                user = self.store.update_user(&user).await?;
            }
            return Ok(user);
        }

        // Random secret nobody knows, so password login never matches.
        let unusable = generate_reset_token();
        let new_user = NewUser {
            id: Uuid::new_v4(),
            email: identity.email,
            phone: None,
            password_hash: self.hash_password(&unusable).await?,
            name: identity.name,
            role: UserRole::User,
            auth_provider: identity.provider,
            social_id: identity.social_id,
            avatar_url: identity.avatar_url,
            created_at: self.clock.now(),
        };

        let user = match self.store.insert_user(new_user).await {
            Ok(user) => user,
            Err(StoreError::Conflict(_)) => return Err(already_registered()),
            Err(err) => return Err(err.into()),
        };
        log::info!("Created {:?} account {}", user.auth_provider, user.id);

        self.courier.welcome(&user.email, user.name.as_deref()).await;
        Ok(user)
    }

    async fn resolve_identity(&self, request: SocialLogin) -> Result<SocialIdentity, AppError> {
        let provider = AuthProvider::parse(&request.provider)
            .filter(|p| *p != AuthProvider::Local)
            .ok_or_else(|| AppError::InvalidOperation("Unsupported provider".into()))?;

        match provider {
            AuthProvider::Google => {
                let profile = self
                    .google
                    .verify_id_token(&request.access_token)
                    .await
                    .map_err(|err| {
                        log::warn!("Google token validation failed: {err}");
                        AppError::Unauthorized("Invalid Google token".into())
                    })?;
                // Accounts are matched by email, so it must belong to the caller.
                if !profile.email_verified {
                    return Err(AppError::Unauthorized("Google email is not verified".into()));
                }
                Ok(SocialIdentity {
                    provider,
                    email: profile.email,
                    name: profile.name,
                    avatar_url: profile.picture,
                    social_id: Some(profile.google_id),
                })
            }
            _ => {
                let email = non_empty(request.email).ok_or_else(|| {
                    AppError::Validation("Email is required for this provider".into())
                })?;
                Ok(SocialIdentity {
                    provider,
                    email,
                    name: non_empty(request.name),
                    avatar_url: non_empty(request.photo_url),
                    social_id: None,
                })
            }
        }
    }

    async fn hash_password(&self, plain: &str) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        let plain = plain.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| AppError::Internal(format!("password hashing task failed: {e}")))?
    }

    async fn verify_password(&self, plain: &str, hash: &str) -> Result<bool, AppError> {
        let hasher = self.hasher.clone();
        let (plain, hash) = (plain.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("password verification task failed: {e}")))
    }
}

/// Applies a fresh social identity to an existing account. Returns true when
/// anything changed.
fn reconcile(user: &mut User, identity: &SocialIdentity) -> bool {
    let mut changed = false;
    if user.auth_provider != identity.provider {
        user.auth_provider = identity.provider;
        changed = true;
    }
    if identity.social_id.is_some() && user.social_id != identity.social_id {
        user.social_id = identity.social_id.clone();
        changed = true;
    }
    if user.name.as_deref().map_or(true, |n| n.trim().is_empty()) && identity.name.is_some() {
        user.name = identity.name.clone();
        changed = true;
    }
    if identity.avatar_url.is_some() && user.avatar_url != identity.avatar_url {
        user.avatar_url = identity.avatar_url.clone();
        changed = true;
    }
    changed
}

fn generate_reset_token() -> String {
    let mut bytes = [0u8; RESET_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn already_registered() -> AppError {
    AppError::AlreadyExists("User with this email already exists".into())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
