use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AuthProvider, Business, BusinessFollower, BusinessInsights, BusinessPost, BusinessReview,
    BusinessStatus, BusinessSummary, NewBusiness, NewUser, Notification, NotificationView,
    OtpVerification, PasswordResetToken, PlatformAnalytics, ReportAction, ReportStatus,
    ReviewReport, ReviewReportView, User,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Business columns that must be globally unique when present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueBusinessField {
    Email,
    Website,
    LogoUrl,
    CoverPhotoUrl,
}

impl UniqueBusinessField {
    pub fn column(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Website => "website",
            Self::LogoUrl => "logo_url",
            Self::CoverPhotoUrl => "cover_photo_url",
        }
    }

    pub fn value_of(self, business: &Business) -> Option<&str> {
        match self {
            Self::Email => business.email.as_deref(),
            Self::Website => business.website.as_deref(),
            Self::LogoUrl => business.logo_url.as_deref(),
            Self::CoverPhotoUrl => business.cover_photo_url.as_deref(),
        }
    }
}

/// Filters for business listings. Every set field must match.
#[derive(Debug, Clone, Default)]
pub struct BusinessFilter {
    pub category: Option<String>,
    pub status: Option<BusinessStatus>,
    pub owner_id: Option<Uuid>,
}

/// Persistence for every entity of the directory.
///
/// Listings are returned newest first. Text lookups on email, business names and
/// unique business fields are case-insensitive and ignore surrounding whitespace.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<User>>;
    async fn find_user_by_email_or_social(
        &self,
        email: &str,
        provider: AuthProvider,
        social_id: Option<&str>,
    ) -> StoreResult<Option<User>>;
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn update_user(&self, user: &User) -> StoreResult<User>;

    // Businesses
    async fn insert_business(&self, business: NewBusiness) -> StoreResult<Business>;
    async fn get_business(&self, id: Uuid) -> StoreResult<Option<Business>>;
    async fn update_business(&self, business: &Business) -> StoreResult<Business>;
    /// Deletes the business together with its reviews, followers and posts.
    async fn delete_business(&self, id: Uuid) -> StoreResult<bool>;
    async fn business_name_taken(
        &self,
        owner_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool>;
    async fn business_field_taken(
        &self,
        field: UniqueBusinessField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool>;
    async fn get_business_summary(&self, id: Uuid) -> StoreResult<Option<BusinessSummary>>;
    async fn list_business_summaries(
        &self,
        filter: &BusinessFilter,
    ) -> StoreResult<Vec<BusinessSummary>>;
    async fn business_insights(&self, business_id: Uuid) -> StoreResult<BusinessInsights>;
    async fn platform_analytics(&self) -> StoreResult<PlatformAnalytics>;

    // Reviews
    async fn insert_review(&self, review: &BusinessReview) -> StoreResult<()>;
    async fn get_review(&self, id: Uuid) -> StoreResult<Option<BusinessReview>>;
    async fn find_review(
        &self,
        business_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BusinessReview>>;

    // Followers
    async fn insert_follower(&self, follower: &BusinessFollower) -> StoreResult<()>;
    async fn is_following(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn delete_follower(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool>;

    // Posts
    async fn insert_post(&self, post: &BusinessPost) -> StoreResult<()>;

    // Notifications
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<NotificationView>>;
    async fn unread_notification_count(&self, user_id: Uuid) -> StoreResult<i64>;
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool>;
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64>;

    // One-time codes
    async fn latest_unverified_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>>;
    async fn latest_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>>;
    async fn insert_otp(&self, otp: &OtpVerification) -> StoreResult<()>;
    /// Replaces code, expiry, attempt counter and creation time of a record
    /// that is still unverified. Returns false when no such record remains.
    async fn reissue_otp(&self, otp: &OtpVerification) -> StoreResult<bool>;
    /// Counts one verification attempt against an unverified record, unless
    /// it already reached `max_attempts`. Returns the updated record, or
    /// `None` when the attempt was refused.
    async fn record_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> StoreResult<Option<OtpVerification>>;
    /// Returns false when the record was already verified.
    async fn mark_otp_verified(&self, id: Uuid) -> StoreResult<bool>;

    // Password reset
    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()>;
    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>>;
    /// Stores the new hash and marks the token used atomically. Returns false,
    /// changing nothing, when the token was already used.
    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    // Review reports
    async fn insert_report(&self, report: &ReviewReport) -> StoreResult<()>;
    async fn find_report(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<ReviewReport>>;
    async fn get_report(&self, id: Uuid) -> StoreResult<Option<ReviewReport>>;
    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<ReviewReportView>>;
    /// Applies the action atomically: `DeleteReview` removes the review and
    /// marks the report resolved, `Dismiss` only marks it dismissed.
    async fn resolve_report(
        &self,
        report_id: Uuid,
        action: ReportAction,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReviewReport>>;
}
