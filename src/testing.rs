//! In-memory implementations of the crate's seams, for tests and local runs
//! without Postgres or outbound providers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::clients::{ClientError, EmailMessage, EmailSender, GoogleProfile, GoogleVerifier, SmsSender};
use crate::clock::Clock;
use crate::error::StoreError;
use crate::models::{
    AuthProvider, Business, BusinessFollower, BusinessInsights, BusinessPost, BusinessReview,
    BusinessStatus, BusinessSummary, NewBusiness, NewUser, Notification, NotificationView,
    OtpVerification, PasswordResetToken, PlatformAnalytics, ReportAction, ReportStatus,
    ReviewReport, ReviewReportView, User, UserRole,
};
use crate::store::{BusinessFilter, Store, StoreResult, UniqueBusinessField};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

fn same_text(stored: Option<&str>, value: &str) -> bool {
    stored
        .map(normalized)
        .is_some_and(|s| !s.is_empty() && s == normalized(value))
}

fn conflict(what: &str) -> StoreError {
    StoreError::Conflict(what.to_string())
}

/// Orders newest first. Rows created at the same instant keep the most recent insert first.
fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, created: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    businesses: Vec<Business>,
    reviews: Vec<BusinessReview>,
    followers: Vec<BusinessFollower>,
    posts: Vec<BusinessPost>,
    notifications: Vec<Notification>,
    otps: Vec<OtpVerification>,
    reset_tokens: Vec<PasswordResetToken>,
    reports: Vec<ReviewReport>,
}

impl Tables {
    fn summary(&self, business: &Business) -> BusinessSummary {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|r| r.business_id == business.id)
            .map(|r| r.rating)
            .collect();
        let average_rating = if ratings.is_empty() {
            0.0
        } else {
            ratings.iter().map(|r| f64::from(*r)).sum::<f64>() / ratings.len() as f64
        };

        BusinessSummary {
            business: business.clone(),
            owner_name: self
                .users
                .iter()
                .find(|u| u.id == business.owner_id)
                .and_then(|u| u.name.clone()),
            review_count: ratings.len() as i64,
            average_rating,
            follower_count: self
                .followers
                .iter()
                .filter(|f| f.business_id == business.id)
                .count() as i64,
        }
    }

    fn field_taken(&self, field: UniqueBusinessField, value: &str, exclude: Option<Uuid>) -> bool {
        self.businesses
            .iter()
            .filter(|b| Some(b.id) != exclude)
            .any(|b| same_text(field.value_of(b), value))
    }

    fn remove_review(&mut self, review_id: Uuid) {
        self.reviews.retain(|r| r.id != review_id);
        for report in self.reports.iter_mut().filter(|r| r.review_id == Some(review_id)) {
            report.review_id = None;
        }
    }
}

/// [`Store`] backed by in-process vectors, mirroring the Postgres constraints
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn otps_for(&self, phone: &str) -> Vec<OtpVerification> {
        lock(&self.tables)
            .otps
            .iter()
            .filter(|o| o.phone_number == phone)
            .cloned()
            .collect()
    }

    /// Reset tokens in issue order
    pub fn reset_tokens(&self) -> Vec<PasswordResetToken> {
        lock(&self.tables).reset_tokens.clone()
    }

    /// Overwrites a user's role, e.g. to create an administrator.
    pub fn set_role(&self, user_id: Uuid, role: UserRole) {
        if let Some(user) = lock(&self.tables).users.iter_mut().find(|u| u.id == user_id) {
            user.role = role;
        }
    }
}

/// Inserts a local user with an unusable password hash.
pub async fn seed_user(store: &MemoryStore, email: &str, name: Option<&str>) -> StoreResult<User> {
    store
        .insert_user(NewUser {
            id: Uuid::new_v4(),
            email: email.to_string(),
            phone: None,
            password_hash: "!".to_string(),
            name: name.map(str::to_string),
            role: UserRole::User,
            auth_provider: AuthProvider::Local,
            social_id: None,
            avatar_url: None,
            created_at: Utc::now(),
        })
        .await
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(lock(&self.tables).users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = normalized(email);
        Ok(lock(&self.tables)
            .users
            .iter()
            .find(|u| normalized(&u.email) == email)
            .cloned())
    }

    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        Ok(lock(&self.tables)
            .users
            .iter()
            .find(|u| u.phone.as_deref() == Some(phone))
            .cloned())
    }

    async fn find_user_by_email_or_social(
        &self,
        email: &str,
        provider: AuthProvider,
        social_id: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let email = normalized(email);
        Ok(lock(&self.tables)
            .users
            .iter()
            .find(|u| {
                normalized(&u.email) == email
                    || (social_id.is_some()
                        && u.auth_provider == provider
                        && u.social_id.as_deref() == social_id)
            })
            .cloned())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        let mut tables = lock(&self.tables);
        if tables
            .users
            .iter()
            .any(|u| normalized(&u.email) == normalized(&user.email))
        {
            return Err(conflict("users_email_key"));
        }
        let user = user.into_user();
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        let mut tables = lock(&self.tables);
        let slot = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(StoreError::Backend(sqlx::Error::RowNotFound))?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn insert_business(&self, business: NewBusiness) -> StoreResult<Business> {
        let mut tables = lock(&self.tables);
        let business = business.into_business();
        let name_taken = tables
            .businesses
            .iter()
            .any(|b| b.owner_id == business.owner_id && normalized(&b.name) == normalized(&business.name));
        if name_taken {
            return Err(conflict("businesses_owner_name_key"));
        }
        for field in [
            UniqueBusinessField::Email,
            UniqueBusinessField::Website,
            UniqueBusinessField::LogoUrl,
            UniqueBusinessField::CoverPhotoUrl,
        ] {
            if let Some(value) = field.value_of(&business) {
                if tables.field_taken(field, value, None) {
                    return Err(conflict(field.column()));
                }
            }
        }
        tables.businesses.push(business.clone());
        Ok(business)
    }

    async fn get_business(&self, id: Uuid) -> StoreResult<Option<Business>> {
        Ok(lock(&self.tables).businesses.iter().find(|b| b.id == id).cloned())
    }

    async fn update_business(&self, business: &Business) -> StoreResult<Business> {
        let mut tables = lock(&self.tables);
        let slot = tables
            .businesses
            .iter_mut()
            .find(|b| b.id == business.id)
            .ok_or(StoreError::Backend(sqlx::Error::RowNotFound))?;
        *slot = business.clone();
        Ok(business.clone())
    }

    async fn delete_business(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let before = tables.businesses.len();
        tables.businesses.retain(|b| b.id != id);
        if tables.businesses.len() == before {
            return Ok(false);
        }

        let review_ids: Vec<Uuid> = tables
            .reviews
            .iter()
            .filter(|r| r.business_id == id)
            .map(|r| r.id)
            .collect();
        for review_id in review_ids {
            tables.remove_review(review_id);
        }
        tables.followers.retain(|f| f.business_id != id);
        tables.posts.retain(|p| p.business_id != id);
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.related_business_id == Some(id))
        {
            notification.related_business_id = None;
        }
        Ok(true)
    }

    async fn business_name_taken(
        &self,
        owner_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool> {
        let name = normalized(name);
        Ok(lock(&self.tables)
            .businesses
            .iter()
            .any(|b| b.owner_id == owner_id && Some(b.id) != exclude && normalized(&b.name) == name))
    }

    async fn business_field_taken(
        &self,
        field: UniqueBusinessField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool> {
        Ok(lock(&self.tables).field_taken(field, value, exclude))
    }

    async fn get_business_summary(&self, id: Uuid) -> StoreResult<Option<BusinessSummary>> {
        let tables = lock(&self.tables);
        Ok(tables
            .businesses
            .iter()
            .find(|b| b.id == id)
            .map(|b| tables.summary(b)))
    }

    async fn list_business_summaries(
        &self,
        filter: &BusinessFilter,
    ) -> StoreResult<Vec<BusinessSummary>> {
        let tables = lock(&self.tables);
        let matching = tables.businesses.iter().filter(|b| {
            filter.status.map_or(true, |s| b.status == s)
                && filter.owner_id.map_or(true, |o| b.owner_id == o)
                && filter
                    .category
                    .as_deref()
                    .map_or(true, |c| b.category.as_deref() == Some(c))
        });
        Ok(newest_first(matching, |b| b.created_at)
            .into_iter()
            .map(|b| tables.summary(b))
            .collect())
    }

    async fn business_insights(&self, business_id: Uuid) -> StoreResult<BusinessInsights> {
        let tables = lock(&self.tables);
        let (review_count, average_rating, follower_count) = tables
            .businesses
            .iter()
            .find(|b| b.id == business_id)
            .map(|b| {
                let summary = tables.summary(b);
                (summary.review_count, summary.average_rating, summary.follower_count)
            })
            .unwrap_or((0, 0.0, 0));

        Ok(BusinessInsights {
            profile_views: 0,
            follower_count,
            review_count,
            average_rating,
            post_count: tables
                .posts
                .iter()
                .filter(|p| p.business_id == business_id)
                .count() as i64,
        })
    }

    async fn platform_analytics(&self) -> StoreResult<PlatformAnalytics> {
        let tables = lock(&self.tables);
        let with_status =
            |status: BusinessStatus| tables.businesses.iter().filter(|b| b.status == status).count() as i64;
        Ok(PlatformAnalytics {
            total_businesses: tables.businesses.len() as i64,
            pending_businesses: with_status(BusinessStatus::Pending),
            verified_businesses: with_status(BusinessStatus::Verified),
            rejected_businesses: with_status(BusinessStatus::Rejected),
            total_users: tables.users.len() as i64,
            total_reviews: tables.reviews.len() as i64,
        })
    }

    async fn insert_review(&self, review: &BusinessReview) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        if tables
            .reviews
            .iter()
            .any(|r| r.business_id == review.business_id && r.user_id == review.user_id)
        {
            return Err(conflict("business_reviews_business_id_user_id_key"));
        }
        tables.reviews.push(review.clone());
        Ok(())
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<BusinessReview>> {
        Ok(lock(&self.tables).reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn find_review(
        &self,
        business_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BusinessReview>> {
        Ok(lock(&self.tables)
            .reviews
            .iter()
            .find(|r| r.business_id == business_id && r.user_id == user_id)
            .cloned())
    }

    async fn insert_follower(&self, follower: &BusinessFollower) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        if tables
            .followers
            .iter()
            .any(|f| f.business_id == follower.business_id && f.user_id == follower.user_id)
        {
            return Err(conflict("business_followers_business_id_user_id_key"));
        }
        tables.followers.push(follower.clone());
        Ok(())
    }

    async fn is_following(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        Ok(lock(&self.tables)
            .followers
            .iter()
            .any(|f| f.business_id == business_id && f.user_id == user_id))
    }

    async fn delete_follower(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let before = tables.followers.len();
        tables
            .followers
            .retain(|f| !(f.business_id == business_id && f.user_id == user_id));
        Ok(tables.followers.len() != before)
    }

    async fn insert_post(&self, post: &BusinessPost) -> StoreResult<()> {
        lock(&self.tables).posts.push(post.clone());
        Ok(())
    }

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        lock(&self.tables).notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<NotificationView>> {
        let tables = lock(&self.tables);
        let matching = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read));
        Ok(newest_first(matching, |n| n.created_at)
            .into_iter()
            .map(|n| NotificationView {
                notification: n.clone(),
                related_business_name: n.related_business_id.and_then(|id| {
                    tables
                        .businesses
                        .iter()
                        .find(|b| b.id == id)
                        .map(|b| b.name.clone())
                }),
            })
            .collect())
    }

    async fn unread_notification_count(&self, user_id: Uuid) -> StoreResult<i64> {
        Ok(lock(&self.tables)
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && !n.is_read)
            .count() as i64)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        match tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(notification) => {
                notification.is_read = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut tables = lock(&self.tables);
        let mut updated = 0;
        for notification in tables
            .notifications
            .iter_mut()
            .filter(|n| n.user_id == user_id && !n.is_read)
        {
            notification.is_read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn latest_unverified_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>> {
        Ok(lock(&self.tables)
            .otps
            .iter()
            .enumerate()
            .filter(|(_, o)| o.phone_number == phone && !o.is_verified)
            .max_by_key(|(i, o)| (o.created_at, *i))
            .map(|(_, o)| o.clone()))
    }

    async fn latest_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>> {
        Ok(lock(&self.tables)
            .otps
            .iter()
            .enumerate()
            .filter(|(_, o)| o.phone_number == phone)
            .max_by_key(|(i, o)| (o.created_at, *i))
            .map(|(_, o)| o.clone()))
    }

    async fn insert_otp(&self, otp: &OtpVerification) -> StoreResult<()> {
        lock(&self.tables).otps.push(otp.clone());
        Ok(())
    }

    async fn reissue_otp(&self, otp: &OtpVerification) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let Some(slot) = tables.otps.iter_mut().find(|o| o.id == otp.id && !o.is_verified) else {
            return Ok(false);
        };
        slot.otp_code = otp.otp_code.clone();
        slot.expires_at = otp.expires_at;
        slot.attempt_count = otp.attempt_count;
        slot.created_at = otp.created_at;
        Ok(true)
    }

    async fn record_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> StoreResult<Option<OtpVerification>> {
        let mut tables = lock(&self.tables);
        Ok(tables
            .otps
            .iter_mut()
            .find(|o| o.id == id && !o.is_verified && o.attempt_count < max_attempts)
            .map(|slot| {
                slot.attempt_count += 1;
                slot.clone()
            }))
    }

    async fn mark_otp_verified(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        match tables.otps.iter_mut().find(|o| o.id == id && !o.is_verified) {
            Some(slot) => {
                slot.is_verified = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        if tables.reset_tokens.iter().any(|t| t.token == token.token) {
            return Err(conflict("password_reset_tokens_token_key"));
        }
        tables.reset_tokens.push(token.clone());
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        Ok(lock(&self.tables)
            .reset_tokens
            .iter()
            .find(|t| t.token == token)
            .cloned())
    }

    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tables = lock(&self.tables);
        let user_index = tables
            .users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or(StoreError::Backend(sqlx::Error::RowNotFound))?;
        let token_index = tables
            .reset_tokens
            .iter()
            .position(|t| t.id == token_id)
            .ok_or(StoreError::Backend(sqlx::Error::RowNotFound))?;
        if tables.reset_tokens[token_index].is_used {
            return Ok(false);
        }

        let user = &mut tables.users[user_index];
        user.password_hash = password_hash.to_string();
        user.updated_at = at;
        tables.reset_tokens[token_index].is_used = true;
        Ok(true)
    }

    async fn insert_report(&self, report: &ReviewReport) -> StoreResult<()> {
        let mut tables = lock(&self.tables);
        if tables.reports.iter().any(|r| {
            r.review_id.is_some()
                && r.review_id == report.review_id
                && r.reported_by_user_id == report.reported_by_user_id
        }) {
            return Err(conflict("review_reports_review_id_reported_by_user_id_key"));
        }
        tables.reports.push(report.clone());
        Ok(())
    }

    async fn find_report(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<ReviewReport>> {
        Ok(lock(&self.tables)
            .reports
            .iter()
            .find(|r| r.review_id == Some(review_id) && r.reported_by_user_id == user_id)
            .cloned())
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<ReviewReport>> {
        Ok(lock(&self.tables).reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<ReviewReportView>> {
        let tables = lock(&self.tables);
        let matching = tables
            .reports
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s));
        Ok(newest_first(matching, |r| r.created_at)
            .into_iter()
            .map(|r| ReviewReportView {
                report: r.clone(),
                reported_by_name: tables
                    .users
                    .iter()
                    .find(|u| u.id == r.reported_by_user_id)
                    .and_then(|u| u.name.clone()),
            })
            .collect())
    }

    async fn resolve_report(
        &self,
        report_id: Uuid,
        action: ReportAction,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReviewReport>> {
        let mut tables = lock(&self.tables);
        let Some(index) = tables.reports.iter().position(|r| r.id == report_id) else {
            return Ok(None);
        };

        if action == ReportAction::DeleteReview {
            if let Some(review_id) = tables.reports[index].review_id {
                tables.remove_review(review_id);
            }
        }

        let report = &mut tables.reports[index];
        report.status = action.resulting_status();
        report.resolved_at = Some(at);
        Ok(Some(report.clone()))
    }
}

// ============================================================================
// OUTBOUND DOUBLES
// ============================================================================

/// SMS transport that records every message; optionally fails after recording.
#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingSms {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    /// `(phone, message)` pairs in send order
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl SmsSender for RecordingSms {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<(), ClientError> {
        lock(&self.sent).push((phone_number.to_string(), message.to_string()));
        if self.fail {
            return Err(ClientError::Rejected("sms gateway unavailable".into()));
        }
        Ok(())
    }
}

/// Email transport that records every message; optionally fails after recording.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        lock(&self.sent).clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), ClientError> {
        lock(&self.sent).push(message.clone());
        if self.fail {
            return Err(ClientError::Rejected("mail relay unavailable".into()));
        }
        Ok(())
    }
}

/// Google verifier answering with a fixed profile, or rejecting every token
pub struct StubGoogleVerifier {
    profile: Option<GoogleProfile>,
}

impl StubGoogleVerifier {
    pub fn accepting(profile: GoogleProfile) -> Self {
        Self { profile: Some(profile) }
    }

    pub fn rejecting() -> Self {
        Self { profile: None }
    }
}

#[async_trait]
impl GoogleVerifier for StubGoogleVerifier {
    async fn verify_id_token(&self, _id_token: &str) -> Result<GoogleProfile, ClientError> {
        self.profile
            .clone()
            .ok_or_else(|| ClientError::Rejected("Invalid token audience".into()))
    }
}

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}
