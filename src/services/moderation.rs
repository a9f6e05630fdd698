use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::{
    ApprovalDecision, Business, BusinessStatus, BusinessSummary, NotificationType,
    PlatformAnalytics, ReportAction, ReportStatus, ReviewReport, ReviewReportView,
};
use crate::services::business::business_not_found;
use crate::services::courier::Courier;
use crate::services::notifications::NotificationService;
use crate::store::{BusinessFilter, Store};

/// Admin workflows: business approval and review report resolution
#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
    courier: Courier,
    clock: Arc<dyn Clock>,
}

impl ModerationService {
    pub fn new(
        store: Arc<dyn Store>,
        notifications: NotificationService,
        courier: Courier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { store, notifications, courier, clock }
    }

    pub async fn list_pending(&self) -> Result<Vec<BusinessSummary>, AppError> {
        self.list_all(Some(BusinessStatus::Pending)).await
    }

    pub async fn list_all(&self, status: Option<BusinessStatus>) -> Result<Vec<BusinessSummary>, AppError> {
        let filter = BusinessFilter {
            status,
            ..Default::default()
        };
        Ok(self.store.list_business_summaries(&filter).await?)
    }

    /// Moves a business to `verified` or `rejected`, notifies the owner in-app
    /// and by email.
    pub async fn approve(
        &self,
        business_id: Uuid,
        status: &str,
        reason: Option<&str>,
    ) -> Result<Business, AppError> {
        let mut business = self
            .store
            .get_business(business_id)
            .await?
            .ok_or_else(business_not_found)?;

        let decision = ApprovalDecision::parse(status).ok_or_else(|| {
            AppError::Validation("Status must be 'verified' or 'rejected'".into())
        })?;

        business.status = decision.status();
        business.updated_at = self.clock.now();
        let business = self.store.update_business(&business).await?;
        log::info!("Business {business_id} marked {}", business.status.as_str());

        let reason = reason.map(str::trim).filter(|r| !r.is_empty());
        let (title, message) = match decision {
            ApprovalDecision::Verify => (
                "Business Approved",
                format!(
                    "Congratulations! Your business '{}' has been verified and is now live.",
                    business.name
                ),
            ),
            ApprovalDecision::Reject => (
                "Business Rejected",
                format!(
                    "Your business '{}' was not approved. {}",
                    business.name,
                    reason.unwrap_or_default()
                )
                .trim_end()
                .to_string(),
            ),
        };
        self.notifications
            .notify_best_effort(
                business.owner_id,
                NotificationType::Approval,
                title,
                &message,
                Some(business.id),
            )
            .await;

        match self.store.find_user_by_id(business.owner_id).await {
            Ok(Some(owner)) if !owner.email.trim().is_empty() => {
                self.courier
                    .business_decision(&owner.email, &business.name, business.status, reason)
                    .await;
            }
            Ok(_) => {}
            Err(err) => log::warn!("Could not load owner of business {business_id}: {err}"),
        }

        Ok(business)
    }

    pub async fn analytics(&self) -> Result<PlatformAnalytics, AppError> {
        Ok(self.store.platform_analytics().await?)
    }

    pub async fn delete_business(&self, business_id: Uuid) -> Result<(), AppError> {
        if !self.store.delete_business(business_id).await? {
            return Err(business_not_found());
        }
        log::info!("Business {business_id} deleted by an administrator");
        Ok(())
    }

    pub async fn list_reports(&self, status: Option<ReportStatus>) -> Result<Vec<ReviewReportView>, AppError> {
        Ok(self.store.list_reports(status).await?)
    }

    pub async fn resolve_report(&self, report_id: Uuid, action: &str) -> Result<ReviewReport, AppError> {
        if self.store.get_report(report_id).await?.is_none() {
            return Err(report_not_found());
        }
        let action = ReportAction::parse(action).ok_or_else(|| {
            AppError::Validation("Action must be 'dismiss' or 'delete-review'".into())
        })?;

        let report = self
            .store
            .resolve_report(report_id, action, self.clock.now())
            .await?
            .ok_or_else(report_not_found)?;
        log::info!("Report {report_id} resolved as {:?}", report.status);
        Ok(report)
    }
}

fn report_not_found() -> AppError {
    AppError::NotFound("Report not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CreateBusinessRequest, CreateReviewRequest, ReportReason, ReportReviewRequest};
    use crate::services::business::BusinessService;
    use crate::testing::{seed_user, ManualClock, MemoryStore, RecordingMailer, RecordingSms};
    use chrono::Utc;

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<RecordingMailer>,
        clock: Arc<ManualClock>,
        businesses: BusinessService,
        moderation: ModerationService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifications = NotificationService::new(store.clone(), clock.clone());
        let courier = Courier::new(Arc::new(RecordingSms::default()), mailer.clone());
        Fixture {
            businesses: BusinessService::new(store.clone(), notifications.clone(), clock.clone()),
            moderation: ModerationService::new(store.clone(), notifications, courier, clock.clone()),
            store,
            mailer,
            clock,
        }
    }

    fn cafe() -> CreateBusinessRequest {
        CreateBusinessRequest {
            name: "Joe's Cafe".into(),
            logo_url: None,
            cover_photo_url: None,
            description: None,
            category: None,
            address: None,
            latitude: None,
            longitude: None,
            email: None,
            website: None,
            verification_doc_url: None,
        }
    }

    #[actix_web::test]
    async fn approval_notifies_and_emails_the_owner() {
        let f = fixture();
        let owner = seed_user(&f.store, "joe@example.com", Some("Joe")).await.unwrap();
        let business = f.businesses.create_business(owner.id, cafe()).await.unwrap();
        assert_eq!(f.moderation.list_pending().await.unwrap().len(), 1);

        let approved = f.moderation.approve(business.id, "verified", None).await.unwrap();
        assert_eq!(approved.status, BusinessStatus::Verified);
        assert!(f.moderation.list_pending().await.unwrap().is_empty());

        let notes = f.store.list_notifications(owner.id, true).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].notification.notification_type, NotificationType::Approval);
        assert_eq!(notes[0].notification.title, "Business Approved");
        assert_eq!(notes[0].related_business_name.as_deref(), Some("Joe's Cafe"));

        let mails = f.mailer.sent();
        assert_eq!(mails.len(), 1);
        assert_eq!(mails[0].to, "joe@example.com");
    }

    #[actix_web::test]
    async fn rejection_carries_the_reason() {
        let f = fixture();
        let owner = seed_user(&f.store, "joe@example.com", None).await.unwrap();
        let business = f.businesses.create_business(owner.id, cafe()).await.unwrap();

        f.moderation.approve(business.id, "rejected", Some("Missing documents")).await.unwrap();
        let notes = f.store.list_notifications(owner.id, true).await.unwrap();
        assert_eq!(
            notes[0].notification.message,
            "Your business 'Joe's Cafe' was not approved. Missing documents"
        );
    }

    #[actix_web::test]
    async fn approval_checks_existence_before_status() {
        let f = fixture();
        let err = f.moderation.approve(Uuid::new_v4(), "bogus", None).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let owner = seed_user(&f.store, "joe@example.com", None).await.unwrap();
        let business = f.businesses.create_business(owner.id, cafe()).await.unwrap();
        for status in ["pending", "approved", ""] {
            let err = f.moderation.approve(business.id, status, None).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{status}");
        }
    }

    #[actix_web::test]
    async fn analytics_count_every_status() {
        let f = fixture();
        let owner = seed_user(&f.store, "joe@example.com", None).await.unwrap();
        let customer = seed_user(&f.store, "c@example.com", None).await.unwrap();
        let first = f.businesses.create_business(owner.id, cafe()).await.unwrap();
        let mut second = cafe();
        second.name = "Joe's Bakery".into();
        let second = f.businesses.create_business(owner.id, second).await.unwrap();
        f.moderation.approve(first.id, "verified", None).await.unwrap();
        f.businesses
            .add_review(first.id, customer.id, CreateReviewRequest { rating: 5, comment: None, photo_url: None })
            .await
            .unwrap();

        let analytics = f.moderation.analytics().await.unwrap();
        assert_eq!(
            analytics,
            PlatformAnalytics {
                total_businesses: 2,
                pending_businesses: 1,
                verified_businesses: 1,
                rejected_businesses: 0,
                total_users: 2,
                total_reviews: 1,
            }
        );

        f.moderation.delete_business(second.id).await.unwrap();
        let err = f.moderation.delete_business(second.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    async fn reported_review(f: &Fixture) -> (Uuid, Uuid, Uuid) {
        let owner = seed_user(&f.store, "joe@example.com", None).await.unwrap();
        let critic = seed_user(&f.store, "c@example.com", Some("Critic")).await.unwrap();
        let business = f.businesses.create_business(owner.id, cafe()).await.unwrap();
        let review = f
            .businesses
            .add_review(business.id, critic.id, CreateReviewRequest { rating: 1, comment: None, photo_url: None })
            .await
            .unwrap();
        let report_id = f
            .businesses
            .report_review(review.id, owner.id, ReportReviewRequest { reason: ReportReason::Offensive, description: None })
            .await
            .unwrap();
        (business.id, review.id, report_id)
    }

    #[actix_web::test]
    async fn delete_review_resolution_removes_the_review() {
        let f = fixture();
        let (_, review_id, report_id) = reported_review(&f).await;

        let pending = f.moderation.list_reports(Some(ReportStatus::Pending)).await.unwrap();
        assert_eq!(pending.len(), 1);

        let report = f.moderation.resolve_report(report_id, "delete-review").await.unwrap();
        assert_eq!(report.status, ReportStatus::Resolved);
        assert!(report.resolved_at.is_some());
        assert!(f.store.get_review(review_id).await.unwrap().is_none());

        let resolved = f.moderation.list_reports(Some(ReportStatus::Resolved)).await.unwrap();
        assert_eq!(resolved.len(), 1);
    }

    #[actix_web::test]
    async fn dismissal_keeps_the_review() {
        let f = fixture();
        let (_, review_id, report_id) = reported_review(&f).await;

        let report = f.moderation.resolve_report(report_id, "dismiss").await.unwrap();
        assert_eq!(report.status, ReportStatus::Dismissed);
        assert_eq!(report.resolved_at, Some(f.clock.now()));
        assert!(f.store.get_review(review_id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn unknown_action_or_report_is_rejected() {
        let f = fixture();
        let (_, review_id, report_id) = reported_review(&f).await;

        let err = f.moderation.resolve_report(report_id, "ban-user").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.store.get_review(review_id).await.unwrap().is_some());

        let err = f.moderation.resolve_report(Uuid::new_v4(), "dismiss").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
