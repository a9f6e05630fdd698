use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidateEmail, ValidationError};

// ============================================================================
// ENUMS
// ============================================================================

/// Account role (this is also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    BusinessOwner,
    Admin,
}

/// Identity provider a user signed up with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "auth_provider", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuthProvider {
    Local,
    Google,
    Facebook,
    Apple,
}

impl AuthProvider {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "local" => Some(Self::Local),
            "google" => Some(Self::Google),
            "facebook" => Some(Self::Facebook),
            "apple" => Some(Self::Apple),
            _ => None,
        }
    }
}

/// Business lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "business_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    Pending,
    Verified,
    Rejected,
}

impl BusinessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }
}

/// Decision an admin can take on a pending business. `pending` is not a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Verify,
    Reject,
}

impl ApprovalDecision {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "verified" => Some(Self::Verify),
            "rejected" => Some(Self::Reject),
            _ => None,
        }
    }

    pub fn status(self) -> BusinessStatus {
        match self {
            Self::Verify => BusinessStatus::Verified,
            Self::Reject => BusinessStatus::Rejected,
        }
    }
}

/// In-app notification category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Follower,
    Review,
    Approval,
    Comment,
}

/// Why a review was reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Spam,
    Inappropriate,
    Fake,
    Offensive,
}

/// Moderation state of a review report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

/// Admin resolution for a reported review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Dismiss,
    DeleteReview,
}

impl ReportAction {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "dismiss" => Some(Self::Dismiss),
            "delete-review" => Some(Self::DeleteReview),
            _ => None,
        }
    }

    pub fn resulting_status(self) -> ReportStatus {
        match self {
            Self::Dismiss => ReportStatus::Dismissed,
            Self::DeleteReview => ReportStatus::Resolved,
        }
    }
}

// ============================================================================
// USERS & CREDENTIALS
// ============================================================================

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub is_phone_verified: bool,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub social_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: String,
    pub name: Option<String>,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub social_id: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            email: self.email,
            phone: self.phone,
            is_phone_verified: false,
            password_hash: self.password_hash,
            name: self.name,
            role: self.role,
            auth_provider: self.auth_provider,
            social_id: self.social_id,
            avatar_url: self.avatar_url,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// One-time code issued to a phone number
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerification {
    pub id: Uuid,
    pub phone_number: String,
    #[serde(skip_serializing, default)]
    pub otp_code: String,
    pub is_verified: bool,
    pub expires_at: DateTime<Utc>,
    pub attempt_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Single-use password reset token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing, default)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// BUSINESSES
// ============================================================================

/// Business listed in the directory
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub status: BusinessStatus,
    pub verification_doc_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Helper for creating new business
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub cover_photo_url: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub verification_doc_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewBusiness {
    pub fn into_business(self) -> Business {
        Business {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            logo_url: self.logo_url,
            cover_photo_url: self.cover_photo_url,
            description: self.description,
            category: self.category,
            address: self.address,
            latitude: self.latitude,
            longitude: self.longitude,
            email: self.email,
            website: self.website,
            status: BusinessStatus::Pending,
            verification_doc_url: self.verification_doc_url,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Business with owner name and engagement aggregates, used for read endpoints
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessSummary {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub business: Business,
    pub owner_name: Option<String>,
    pub review_count: i64,
    pub average_rating: f64,
    pub follower_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessReview {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessFollower {
    pub id: Uuid,
    pub business_id: Uuid,
    pub user_id: Uuid,
    pub followed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BusinessPost {
    pub id: Uuid,
    pub business_id: Uuid,
    pub content: String,
    pub image_url: Option<String>,
    pub video_url: Option<String>,
    pub likes: i32,
    pub comments: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Owner-facing engagement numbers for one business
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInsights {
    pub profile_views: i64,
    pub follower_count: i64,
    pub review_count: i64,
    pub average_rating: f64,
    pub post_count: i64,
}

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformAnalytics {
    pub total_businesses: i64,
    pub pending_businesses: i64,
    pub verified_businesses: i64,
    pub rejected_businesses: i64,
    pub total_users: i64,
    pub total_reviews: i64,
}

// ============================================================================
// NOTIFICATIONS & MODERATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub related_business_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Notification joined with the name of the business it refers to
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub notification: Notification,
    pub related_business_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReport {
    pub id: Uuid,
    pub review_id: Option<Uuid>,
    pub reported_by_user_id: Uuid,
    pub reason: ReportReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Report joined with the reporter's display name, for the moderation queue
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReportView {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub report: ReviewReport,
    pub reported_by_name: Option<String>,
}

// ============================================================================
// RESPONSE ENVELOPE
// ============================================================================

/// Machine-readable outcome code carried by every response
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ResponseCode {
    #[serde(rename = "00")]
    Success,
    #[serde(rename = "01")]
    BadRequest,
    #[serde(rename = "02")]
    Unauthorized,
    #[serde(rename = "03")]
    Forbidden,
    #[serde(rename = "04")]
    NotFound,
    #[serde(rename = "99")]
    Unexpected,
}

impl ResponseCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "00",
            Self::BadRequest => "01",
            Self::Unauthorized => "02",
            Self::Forbidden => "03",
            Self::NotFound => "04",
            Self::Unexpected => "99",
        }
    }
}

/// API response wrapper
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub is_successful: bool,
    pub response: ResponseStatus<T>,
}

#[derive(Debug, Serialize)]
pub struct ResponseStatus<T> {
    pub code: ResponseCode,
    pub description: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(description: impl Into<String>, data: T) -> Self {
        Self {
            is_successful: true,
            response: ResponseStatus {
                code: ResponseCode::Success,
                description: description.into(),
                data: Some(data),
            },
        }
    }

    pub fn failure(code: ResponseCode, description: impl Into<String>) -> Self {
        Self {
            is_successful: false,
            response: ResponseStatus {
                code,
                description: description.into(),
                data: None,
            },
        }
    }
}

impl ApiResponse<()> {
    /// Success without a payload
    pub fn message(description: impl Into<String>) -> Self {
        Self {
            is_successful: true,
            response: ResponseStatus {
                code: ResponseCode::Success,
                description: description.into(),
                data: None,
            },
        }
    }
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

fn validate_phone(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    if allowed && (7..=15).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

/// Blank means "not supplied", so only non-blank values must be addresses.
fn validate_optional_email(value: &str) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(custom(function = "validate_phone"))]
    pub phone: Option<String>,
    #[validate(length(max = 120))]
    pub name: Option<String>,
    pub social_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1))]
    pub current_password: String,
    #[validate(length(min = 6, max = 128))]
    pub new_password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SocialLoginRequest {
    #[validate(length(min = 1))]
    pub provider: String,
    #[validate(length(min = 1))]
    pub access_token: String,
    #[validate(custom(function = "validate_optional_email"))]
    pub email: Option<String>,
    pub name: Option<String>,
    pub photo_url: Option<String>,
}

/// User as exposed to API clients
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub phone: Option<String>,
    pub is_phone_verified: bool,
    pub name: Option<String>,
    pub role: UserRole,
    pub auth_provider: AuthProvider,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
            is_phone_verified: user.is_phone_verified,
            name: user.name.clone(),
            role: user.role,
            auth_provider: user.auth_provider,
            avatar_url: user.avatar_url.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    pub token: String,
    pub user: UserProfile,
}

/// Request to create a business
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBusinessRequest {
    #[validate(length(max = 120), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
    #[validate(length(max = 1024))]
    pub cover_photo_url: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 120))]
    pub category: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(custom(function = "validate_optional_email"))]
    pub email: Option<String>,
    #[validate(length(max = 1024))]
    pub website: Option<String>,
    pub verification_doc_url: Option<String>,
}

impl CreateBusinessRequest {
    pub fn into_new_business(self, owner_id: Uuid, created_at: DateTime<Utc>) -> NewBusiness {
        NewBusiness {
            id: Uuid::new_v4(),
            owner_id,
            name: self.name.trim().to_string(),
            logo_url: non_blank(self.logo_url),
            cover_photo_url: non_blank(self.cover_photo_url),
            description: non_blank(self.description),
            category: non_blank(self.category),
            address: non_blank(self.address),
            latitude: self.latitude,
            longitude: self.longitude,
            email: non_blank(self.email),
            website: non_blank(self.website),
            verification_doc_url: non_blank(self.verification_doc_url),
            created_at,
        }
    }
}

/// Request to update a business. Absent or blank fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBusinessRequest {
    #[validate(length(max = 120))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub logo_url: Option<String>,
    #[validate(length(max = 1024))]
    pub cover_photo_url: Option<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 120))]
    pub category: Option<String>,
    pub address: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(custom(function = "validate_optional_email"))]
    pub email: Option<String>,
    #[validate(length(max = 1024))]
    pub website: Option<String>,
}

impl UpdateBusinessRequest {
    pub fn apply_to_existing(&self, existing: &mut Business, updated_at: DateTime<Utc>) {
        if let Some(name) = filled(&self.name) {
            existing.name = name;
        }
        if let Some(logo_url) = filled(&self.logo_url) {
            existing.logo_url = Some(logo_url);
        }
        if let Some(cover) = filled(&self.cover_photo_url) {
            existing.cover_photo_url = Some(cover);
        }
        if let Some(description) = filled(&self.description) {
            existing.description = Some(description);
        }
        if let Some(category) = filled(&self.category) {
            existing.category = Some(category);
        }
        if let Some(address) = filled(&self.address) {
            existing.address = Some(address);
        }
        if self.latitude.is_some() {
            existing.latitude = self.latitude;
        }
        if self.longitude.is_some() {
            existing.longitude = self.longitude;
        }
        if let Some(email) = filled(&self.email) {
            existing.email = Some(email);
        }
        if let Some(website) = filled(&self.website) {
            existing.website = Some(website);
        }
        existing.updated_at = updated_at;
    }
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_blank(value: Option<String>) -> Option<String> {
    filled(&value)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessListQuery {
    pub category: Option<String>,
    pub status: Option<BusinessStatus>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    pub status: Option<BusinessStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportStatusQuery {
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 4000))]
    pub comment: Option<String>,
    #[validate(length(max = 1024))]
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
    #[validate(length(max = 1024))]
    pub image_url: Option<String>,
    #[validate(length(max = 1024))]
    pub video_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReportReviewRequest {
    pub reason: ReportReason,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportReceipt {
    pub report_id: Uuid,
}

/// Result of a follow/unfollow call. `changed == false` is the no-op signal.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
    pub is_following: bool,
    pub changed: bool,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBusinessRequest {
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 2000))]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveReportRequest {
    #[validate(length(min = 1))]
    pub action: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone_number: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[validate(custom(function = "validate_phone"))]
    pub phone_number: String,
    #[validate(length(min = 1, max = 16))]
    pub otp_code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_wire_field_names() {
        let body = serde_json::to_value(ApiResponse::success("ok", UnreadCount { count: 3 })).unwrap();
        assert_eq!(body["isSuccessful"], true);
        assert_eq!(body["response"]["code"], "00");
        assert_eq!(body["response"]["description"], "ok");
        assert_eq!(body["response"]["data"]["count"], 3);

        let failure = serde_json::to_value(ApiResponse::<()>::failure(ResponseCode::NotFound, "gone")).unwrap();
        assert_eq!(failure["isSuccessful"], false);
        assert_eq!(failure["response"]["code"], "04");
        assert!(failure["response"]["data"].is_null());
    }

    #[test]
    fn password_hash_never_leaves_the_process() {
        let user = NewUser {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            phone: None,
            password_hash: "$2b$secret".into(),
            name: Some("A".into()),
            role: UserRole::User,
            auth_provider: AuthProvider::Local,
            social_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        }
        .into_user();

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("passwordHash"));
    }

    #[test]
    fn update_request_only_overwrites_filled_fields() {
        let mut business = CreateBusinessRequest {
            name: "Joe's Cafe".into(),
            logo_url: None,
            cover_photo_url: None,
            description: Some("Coffee".into()),
            category: Some("food".into()),
            address: None,
            latitude: Some(6.5),
            longitude: Some(3.3),
            email: None,
            website: None,
            verification_doc_url: None,
        }
        .into_new_business(Uuid::new_v4(), Utc::now())
        .into_business();

        let update = UpdateBusinessRequest {
            description: Some("   ".into()),
            category: Some("cafe".into()),
            ..Default::default()
        };
        let edited_at = Utc::now();
        update.apply_to_existing(&mut business, edited_at);

        assert_eq!(business.name, "Joe's Cafe");
        assert_eq!(business.description.as_deref(), Some("Coffee"));
        assert_eq!(business.category.as_deref(), Some("cafe"));
        assert_eq!(business.latitude, Some(6.5));
        assert_eq!(business.updated_at, edited_at);
    }

    #[test]
    fn blank_email_counts_as_not_supplied() {
        let update = UpdateBusinessRequest {
            description: Some("New".into()),
            email: Some("".into()),
            ..Default::default()
        };
        assert!(update.validate().is_ok());

        let update = UpdateBusinessRequest {
            email: Some("not-an-address".into()),
            ..Default::default()
        };
        assert!(update.validate().is_err());

        let social = SocialLoginRequest {
            provider: "apple".into(),
            access_token: "t".into(),
            email: Some("  ".into()),
            name: None,
            photo_url: None,
        };
        assert!(social.validate().is_ok());
    }

    #[test]
    fn whitespace_only_business_name_is_rejected() {
        let request = |name: &str| CreateBusinessRequest {
            name: name.into(),
            logo_url: None,
            cover_photo_url: None,
            description: None,
            category: None,
            address: None,
            latitude: None,
            longitude: None,
            email: Some(" ".into()),
            website: None,
            verification_doc_url: None,
        };
        assert!(request("   ").validate().is_err());
        assert!(request("").validate().is_err());
        assert!(request(" Joe's Cafe ").validate().is_ok());
    }

    #[test]
    fn rating_outside_one_to_five_is_rejected() {
        for rating in [0, 6, -1] {
            let request = CreateReviewRequest { rating, comment: None, photo_url: None };
            assert!(request.validate().is_err(), "rating {rating} should be invalid");
        }
        let request = CreateReviewRequest { rating: 5, comment: None, photo_url: None };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn approval_and_report_actions_are_closed_sets() {
        assert_eq!(ApprovalDecision::parse("verified"), Some(ApprovalDecision::Verify));
        assert_eq!(ApprovalDecision::parse("rejected"), Some(ApprovalDecision::Reject));
        assert_eq!(ApprovalDecision::parse("pending"), None);
        assert_eq!(ApprovalDecision::parse("approved"), None);

        assert_eq!(ReportAction::parse("dismiss"), Some(ReportAction::Dismiss));
        assert_eq!(ReportAction::parse("delete-review"), Some(ReportAction::DeleteReview));
        assert_eq!(ReportAction::parse("ban-user"), None);
    }

    #[test]
    fn phone_validation_accepts_common_formats() {
        assert!(validate_phone("+2348012345678").is_ok());
        assert!(validate_phone("0801 234 5678").is_ok());
        assert!(validate_phone("12ab").is_err());
        assert!(validate_phone("123").is_err());
    }
}
