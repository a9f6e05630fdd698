use actix_web::{dev::Payload, http::header, web, FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use futures_util::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::JwtConfig,
    error::AppError,
    models::{User, UserRole},
};

// ============================================================================
// PASSWORDS
// ============================================================================

/// One-way password hashing primitive
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, AppError>;
    /// Returns false for a mismatch and for hashes that cannot be parsed.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, AppError> {
        bcrypt::hash(plain, self.cost)
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        bcrypt::verify(plain, hash).unwrap_or(false)
    }
}

// ============================================================================
// TOKENS
// ============================================================================

/// JWT claims carried by every bearer token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    pub exp: i64,
    pub iat: i64,
    pub iss: String,
    pub aud: String,
}

/// Signs and verifies HS256 bearer tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
    expiry: Duration,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            expiry: Duration::minutes(config.expiry_minutes),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            role: user.role,
            exp: (now + self.expiry).timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Rejected bearer token: {e}");
                AppError::Unauthorized("Invalid or expired token".into())
            })
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Caller identity resolved from a valid bearer token
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// An authenticated caller whose role is `admin`
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

fn authenticate(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let jwt = req
        .app_data::<web::Data<JwtService>>()
        .ok_or_else(|| AppError::Internal("token service not configured".into()))?;

    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let claims = jwt.verify(token)?;
    let id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    Ok(AuthenticatedUser {
        id,
        email: claims.email,
        role: claims.role,
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|user| {
            if user.is_admin() {
                Ok(AdminUser(user))
            } else {
                Err(AppError::Forbidden("Admin access required".into()))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuthProvider, NewUser};
    use actix_web::test::TestRequest;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            issuer: "linkoja".into(),
            audience: "linkoja-clients".into(),
            expiry_minutes: 60,
        }
    }

    fn user(role: UserRole) -> User {
        NewUser {
            id: Uuid::new_v4(),
            email: "owner@example.com".into(),
            phone: None,
            password_hash: String::new(),
            name: None,
            role,
            auth_provider: AuthProvider::Local,
            social_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
        .into_user()
    }

    #[test]
    fn issued_token_round_trips_identity() {
        let service = JwtService::new(&config("secret"));
        let user = user(UserRole::BusinessOwner);

        let claims = service.verify(&service.issue(&user).unwrap()).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, "owner@example.com");
        assert_eq!(claims.role, UserRole::BusinessOwner);
        assert_eq!(claims.aud, "linkoja-clients");
        assert!(claims.exp - claims.iat <= 3600);
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = JwtService::new(&config("one")).issue(&user(UserRole::User)).unwrap();
        let err = JwtService::new(&config("two")).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn bcrypt_hasher_verifies_only_the_original_password() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("s3cret!").unwrap();
        assert!(hasher.verify("s3cret!", &hash));
        assert!(!hasher.verify("wrong", &hash));
        assert!(!hasher.verify("s3cret!", "not-a-hash"));
    }

    #[actix_web::test]
    async fn extractors_enforce_presence_and_role() {
        let service = JwtService::new(&config("secret"));
        let data = web::Data::new(service.clone());

        let req = TestRequest::default().app_data(data.clone()).to_http_request();
        let err = AuthenticatedUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let token = service.issue(&user(UserRole::User)).unwrap();
        let req = TestRequest::default()
            .app_data(data.clone())
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        assert!(AuthenticatedUser::extract(&req).await.is_ok());
        let err = AdminUser::extract(&req).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let token = service.issue(&user(UserRole::Admin)).unwrap();
        let req = TestRequest::default()
            .app_data(data)
            .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
            .to_http_request();
        assert!(AdminUser::extract(&req).await.is_ok());
    }
}
