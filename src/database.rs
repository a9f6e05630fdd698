use std::{borrow::Cow, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    Connection, Executor, PgPool, Row,
};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    AuthProvider, Business, BusinessFollower, BusinessInsights, BusinessPost, BusinessReview,
    BusinessSummary, NewBusiness, NewUser, Notification, NotificationView, OtpVerification,
    PasswordResetToken, PlatformAnalytics, ReportAction, ReportStatus, ReviewReport,
    ReviewReportView, User,
};
use crate::store::{BusinessFilter, Store, StoreResult, UniqueBusinessField};

const SUMMARY_SELECT: &str = r#"
    SELECT
        b.*,
        u.name AS owner_name,
        (SELECT COUNT(*) FROM business_reviews r WHERE r.business_id = b.id) AS review_count,
        COALESCE(
            (SELECT AVG(r.rating)::DOUBLE PRECISION FROM business_reviews r WHERE r.business_id = b.id),
            0
        ) AS average_rating,
        (SELECT COUNT(*) FROM business_followers f WHERE f.business_id = b.id) AS follower_count
    FROM businesses b
    JOIN users u ON u.id = b.owner_id
"#;

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match pool_options().connect(database_url).await {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;
                pool_options().connect(database_url).await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Some(Duration::from_secs(600)))
        .test_before_acquire(true)
}

#[async_trait]
impl Store for Database {
    // ========================================================================
    // USERS
    // ========================================================================

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER(TRIM($1))",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_phone(&self, phone: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE phone = $1 ORDER BY created_at LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email_or_social(
        &self,
        email: &str,
        provider: AuthProvider,
        social_id: Option<&str>,
    ) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE LOWER(email) = LOWER(TRIM($1))
               OR ($3::TEXT IS NOT NULL AND auth_provider = $2 AND social_id = $3)
            ORDER BY (LOWER(email) = LOWER(TRIM($1))) DESC
            LIMIT 1
            "#,
        )
        .bind(email)
        .bind(provider)
        .bind(social_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, phone, is_phone_verified, password_hash, name, role,
                auth_provider, social_id, avatar_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, FALSE, $4, $5, $6, $7, $8, $9, $10, $10)
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.auth_provider)
        .bind(&user.social_id)
        .bind(&user.avatar_url)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn update_user(&self, user: &User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = $2,
                phone = $3,
                is_phone_verified = $4,
                password_hash = $5,
                name = $6,
                role = $7,
                auth_provider = $8,
                social_id = $9,
                avatar_url = $10,
                updated_at = $11
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.is_phone_verified)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role)
        .bind(user.auth_provider)
        .bind(&user.social_id)
        .bind(&user.avatar_url)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    // ========================================================================
    // BUSINESSES
    // ========================================================================

    async fn insert_business(&self, business: NewBusiness) -> StoreResult<Business> {
        let NewBusiness {
            id,
            owner_id,
            name,
            logo_url,
            cover_photo_url,
            description,
            category,
            address,
            latitude,
            longitude,
            email,
            website,
            verification_doc_url,
            created_at,
        } = business;

        sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (
                id, owner_id, name, logo_url, cover_photo_url, description, category,
                address, latitude, longitude, email, website, status,
                verification_doc_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 'pending', $13, $14, $14)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(name)
        .bind(logo_url)
        .bind(cover_photo_url)
        .bind(description)
        .bind(category)
        .bind(address)
        .bind(latitude)
        .bind(longitude)
        .bind(email)
        .bind(website)
        .bind(verification_doc_url)
        .bind(created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn get_business(&self, id: Uuid) -> StoreResult<Option<Business>> {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(business)
    }

    async fn update_business(&self, business: &Business) -> StoreResult<Business> {
        sqlx::query_as::<_, Business>(
            r#"
            UPDATE businesses
            SET name = $2,
                logo_url = $3,
                cover_photo_url = $4,
                description = $5,
                category = $6,
                address = $7,
                latitude = $8,
                longitude = $9,
                email = $10,
                website = $11,
                status = $12,
                verification_doc_url = $13,
                updated_at = $14
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(business.id)
        .bind(&business.name)
        .bind(&business.logo_url)
        .bind(&business.cover_photo_url)
        .bind(&business.description)
        .bind(&business.category)
        .bind(&business.address)
        .bind(business.latitude)
        .bind(business.longitude)
        .bind(&business.email)
        .bind(&business.website)
        .bind(business.status)
        .bind(&business.verification_doc_url)
        .bind(business.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)
    }

    async fn delete_business(&self, id: Uuid) -> StoreResult<bool> {
        // Reviews, followers and posts go with the row via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM businesses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn business_name_taken(
        &self,
        owner_id: Uuid,
        name: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM businesses
                WHERE owner_id = $1
                  AND LOWER(TRIM(name)) = LOWER(TRIM($2))
                  AND ($3::UUID IS NULL OR id <> $3)
            )
            "#,
        )
        .bind(owner_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await?;
        Ok(taken)
    }

    async fn business_field_taken(
        &self,
        field: UniqueBusinessField,
        value: &str,
        exclude: Option<Uuid>,
    ) -> StoreResult<bool> {
        let column = field.column();
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM businesses \
             WHERE LOWER(TRIM({column})) = LOWER(TRIM($1)) AND ($2::UUID IS NULL OR id <> $2))"
        );
        let taken = sqlx::query_scalar::<_, bool>(&sql)
            .bind(value)
            .bind(exclude)
            .fetch_one(&self.pool)
            .await?;
        Ok(taken)
    }

    async fn get_business_summary(&self, id: Uuid) -> StoreResult<Option<BusinessSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE b.id = $1");
        let summary = sqlx::query_as::<_, BusinessSummary>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(summary)
    }

    async fn list_business_summaries(
        &self,
        filter: &BusinessFilter,
    ) -> StoreResult<Vec<BusinessSummary>> {
        let sql = format!(
            r#"{SUMMARY_SELECT}
            WHERE ($1::business_status IS NULL OR b.status = $1)
              AND ($2::UUID IS NULL OR b.owner_id = $2)
              AND ($3::TEXT IS NULL OR b.category = $3)
            ORDER BY b.created_at DESC"#
        );
        let summaries = sqlx::query_as::<_, BusinessSummary>(&sql)
            .bind(filter.status)
            .bind(filter.owner_id)
            .bind(filter.category.as_deref())
            .fetch_all(&self.pool)
            .await?;
        Ok(summaries)
    }

    async fn business_insights(&self, business_id: Uuid) -> StoreResult<BusinessInsights> {
        let record = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM business_followers WHERE business_id = $1) AS follower_count,
                (SELECT COUNT(*) FROM business_reviews WHERE business_id = $1) AS review_count,
                COALESCE(
                    (SELECT AVG(rating)::DOUBLE PRECISION FROM business_reviews WHERE business_id = $1),
                    0
                ) AS average_rating,
                (SELECT COUNT(*) FROM business_posts WHERE business_id = $1) AS post_count
            "#,
        )
        .bind(business_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(BusinessInsights {
            // TODO: record profile views once the listing endpoints track them
            profile_views: 0,
            follower_count: record.try_get::<i64, _>("follower_count")?,
            review_count: record.try_get::<i64, _>("review_count")?,
            average_rating: record.try_get::<f64, _>("average_rating")?,
            post_count: record.try_get::<i64, _>("post_count")?,
        })
    }

    async fn platform_analytics(&self) -> StoreResult<PlatformAnalytics> {
        let record = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_businesses,
                COUNT(*) FILTER (WHERE status = 'pending') AS pending_businesses,
                COUNT(*) FILTER (WHERE status = 'verified') AS verified_businesses,
                COUNT(*) FILTER (WHERE status = 'rejected') AS rejected_businesses,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM business_reviews) AS total_reviews
            FROM businesses
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(PlatformAnalytics {
            total_businesses: record.try_get::<i64, _>("total_businesses")?,
            pending_businesses: record.try_get::<i64, _>("pending_businesses")?,
            verified_businesses: record.try_get::<i64, _>("verified_businesses")?,
            rejected_businesses: record.try_get::<i64, _>("rejected_businesses")?,
            total_users: record.try_get::<i64, _>("total_users")?,
            total_reviews: record.try_get::<i64, _>("total_reviews")?,
        })
    }

    // ========================================================================
    // REVIEWS, FOLLOWERS & POSTS
    // ========================================================================

    async fn insert_review(&self, review: &BusinessReview) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO business_reviews (
                id, business_id, user_id, rating, comment, photo_url, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(review.id)
        .bind(review.business_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(&review.photo_url)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn get_review(&self, id: Uuid) -> StoreResult<Option<BusinessReview>> {
        let review =
            sqlx::query_as::<_, BusinessReview>("SELECT * FROM business_reviews WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(review)
    }

    async fn find_review(
        &self,
        business_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<BusinessReview>> {
        let review = sqlx::query_as::<_, BusinessReview>(
            "SELECT * FROM business_reviews WHERE business_id = $1 AND user_id = $2",
        )
        .bind(business_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(review)
    }

    async fn insert_follower(&self, follower: &BusinessFollower) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO business_followers (id, business_id, user_id, followed_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(follower.id)
        .bind(follower.business_id)
        .bind(follower.user_id)
        .bind(follower.followed_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn is_following(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let following = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM business_followers WHERE business_id = $1 AND user_id = $2)",
        )
        .bind(business_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(following)
    }

    async fn delete_follower(&self, business_id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM business_followers WHERE business_id = $1 AND user_id = $2")
                .bind(business_id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_post(&self, post: &BusinessPost) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO business_posts (
                id, business_id, content, image_url, video_url, likes, comments,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(post.id)
        .bind(post.business_id)
        .bind(&post.content)
        .bind(&post.image_url)
        .bind(&post.video_url)
        .bind(post.likes)
        .bind(post.comments)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    // ========================================================================
    // NOTIFICATIONS
    // ========================================================================

    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, user_id, notification_type, title, message, related_business_id,
                is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id)
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.related_business_id)
        .bind(notification.is_read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> StoreResult<Vec<NotificationView>> {
        let notifications = sqlx::query_as::<_, NotificationView>(
            r#"
            SELECT n.*, b.name AS related_business_name
            FROM notifications n
            LEFT JOIN businesses b ON b.id = n.related_business_id
            WHERE n.user_id = $1 AND (NOT $2 OR n.is_read = FALSE)
            ORDER BY n.created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn unread_notification_count(&self, user_id: Uuid) -> StoreResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND is_read = FALSE",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // ONE-TIME CODES & RESET TOKENS
    // ========================================================================

    async fn latest_unverified_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>> {
        let otp = sqlx::query_as::<_, OtpVerification>(
            r#"
            SELECT * FROM otp_verifications
            WHERE phone_number = $1 AND is_verified = FALSE
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn latest_otp(&self, phone: &str) -> StoreResult<Option<OtpVerification>> {
        let otp = sqlx::query_as::<_, OtpVerification>(
            "SELECT * FROM otp_verifications WHERE phone_number = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn insert_otp(&self, otp: &OtpVerification) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO otp_verifications (
                id, phone_number, otp_code, is_verified, expires_at, attempt_count, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(otp.id)
        .bind(&otp.phone_number)
        .bind(&otp.otp_code)
        .bind(otp.is_verified)
        .bind(otp.expires_at)
        .bind(otp.attempt_count)
        .bind(otp.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn reissue_otp(&self, otp: &OtpVerification) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE otp_verifications
            SET otp_code = $2,
                expires_at = $3,
                attempt_count = $4,
                created_at = $5
            WHERE id = $1 AND is_verified = FALSE
            "#,
        )
        .bind(otp.id)
        .bind(&otp.otp_code)
        .bind(otp.expires_at)
        .bind(otp.attempt_count)
        .bind(otp.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_otp_attempt(
        &self,
        id: Uuid,
        max_attempts: i32,
    ) -> StoreResult<Option<OtpVerification>> {
        let otp = sqlx::query_as::<_, OtpVerification>(
            r#"
            UPDATE otp_verifications
            SET attempt_count = attempt_count + 1
            WHERE id = $1 AND is_verified = FALSE AND attempt_count < $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(max_attempts)
        .fetch_optional(&self.pool)
        .await?;
        Ok(otp)
    }

    async fn mark_otp_verified(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE otp_verifications SET is_verified = TRUE WHERE id = $1 AND is_verified = FALSE",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_reset_token(&self, token: &PasswordResetToken) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (id, user_id, token, expires_at, is_used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.is_used)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn find_reset_token(&self, token: &str) -> StoreResult<Option<PasswordResetToken>> {
        let record = sqlx::query_as::<_, PasswordResetToken>(
            "SELECT * FROM password_reset_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn consume_reset_token(
        &self,
        token_id: Uuid,
        user_id: Uuid,
        password_hash: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE password_reset_tokens SET is_used = TRUE WHERE id = $1 AND is_used = FALSE",
        )
        .bind(token_id)
        .execute(tx.as_mut())
        .await?;
        if claimed.rows_affected() == 0 {
            return Ok(false);
        }

        sqlx::query("UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1")
            .bind(user_id)
            .bind(password_hash)
            .bind(at)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    // ========================================================================
    // REVIEW REPORTS
    // ========================================================================

    async fn insert_report(&self, report: &ReviewReport) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO review_reports (
                id, review_id, reported_by_user_id, reason, description, status,
                created_at, resolved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(report.id)
        .bind(report.review_id)
        .bind(report.reported_by_user_id)
        .bind(report.reason)
        .bind(&report.description)
        .bind(report.status)
        .bind(report.created_at)
        .bind(report.resolved_at)
        .execute(&self.pool)
        .await
        .map_err(StoreError::from_sqlx)?;
        Ok(())
    }

    async fn find_report(
        &self,
        review_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<ReviewReport>> {
        let report = sqlx::query_as::<_, ReviewReport>(
            "SELECT * FROM review_reports WHERE review_id = $1 AND reported_by_user_id = $2",
        )
        .bind(review_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(report)
    }

    async fn get_report(&self, id: Uuid) -> StoreResult<Option<ReviewReport>> {
        let report = sqlx::query_as::<_, ReviewReport>("SELECT * FROM review_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<ReviewReportView>> {
        let reports = sqlx::query_as::<_, ReviewReportView>(
            r#"
            SELECT rr.*, u.name AS reported_by_name
            FROM review_reports rr
            JOIN users u ON u.id = rr.reported_by_user_id
            WHERE ($1::report_status IS NULL OR rr.status = $1)
            ORDER BY rr.created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn resolve_report(
        &self,
        report_id: Uuid,
        action: ReportAction,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<ReviewReport>> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, ReviewReport>(
            "SELECT * FROM review_reports WHERE id = $1 FOR UPDATE",
        )
        .bind(report_id)
        .fetch_optional(tx.as_mut())
        .await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        if action == ReportAction::DeleteReview {
            if let Some(review_id) = existing.review_id {
                sqlx::query("DELETE FROM business_reviews WHERE id = $1")
                    .bind(review_id)
                    .execute(tx.as_mut())
                    .await?;
            }
        }

        let report = sqlx::query_as::<_, ReviewReport>(
            r#"
            UPDATE review_reports
            SET status = $2, resolved_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(report_id)
        .bind(action.resulting_status())
        .bind(at)
        .fetch_one(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(Some(report))
    }
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // Already on the maintenance database.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");
    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let escaped_name = database_name.replace('"', "\"\"");
    let create_stmt = format!("CREATE DATABASE \"{}\"", escaped_name);

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}
