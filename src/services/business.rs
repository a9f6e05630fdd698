use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, StoreError};
use crate::models::{
    Business, BusinessFollower, BusinessInsights, BusinessListQuery, BusinessPost, BusinessReview,
    BusinessStatus, BusinessSummary, CreateBusinessRequest, CreatePostRequest, CreateReviewRequest,
    NotificationType, ReportReviewRequest, ReportStatus, ReviewReport, UpdateBusinessRequest,
};
use crate::services::geo::GeoFilter;
use crate::services::notifications::NotificationService;
use crate::store::{BusinessFilter, Store, UniqueBusinessField};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfollowOutcome {
    Unfollowed,
    NotFollowing,
}

struct DuplicateMessages {
    name: &'static str,
    email: &'static str,
    website: &'static str,
    logo: &'static str,
    cover: &'static str,
}

const CREATE_DUPLICATES: DuplicateMessages = DuplicateMessages {
    name: "You already have a business with this name.",
    email: "A business with this email already exists.",
    website: "A business with this website already exists.",
    logo: "Logo URL already in use by another business.",
    cover: "Cover photo URL already in use by another business.",
};

const UPDATE_DUPLICATES: DuplicateMessages = DuplicateMessages {
    name: "You already have another business with this name.",
    email: "Another business already uses this email.",
    website: "Another business already uses this website.",
    logo: "Logo URL is already used by another business.",
    cover: "Cover photo URL is already used by another business.",
};

impl DuplicateMessages {
    fn for_field(&self, field: UniqueBusinessField) -> &'static str {
        match field {
            UniqueBusinessField::Email => self.email,
            UniqueBusinessField::Website => self.website,
            UniqueBusinessField::LogoUrl => self.logo,
            UniqueBusinessField::CoverPhotoUrl => self.cover,
        }
    }
}

/// Business profiles and the social interactions around them
#[derive(Clone)]
pub struct BusinessService {
    store: Arc<dyn Store>,
    notifications: NotificationService,
    clock: Arc<dyn Clock>,
}

impl BusinessService {
    pub fn new(store: Arc<dyn Store>, notifications: NotificationService, clock: Arc<dyn Clock>) -> Self {
        Self { store, notifications, clock }
    }

    pub async fn create_business(
        &self,
        owner_id: Uuid,
        request: CreateBusinessRequest,
    ) -> Result<Business, AppError> {
        if request.name.trim().is_empty() {
            return Err(AppError::Validation("Business name is required".into()));
        }

        let new_business = request.into_new_business(owner_id, self.clock.now());
        let candidate = new_business.clone().into_business();
        self.ensure_unique(&candidate, None, &CREATE_DUPLICATES).await?;

        let business = match self.store.insert_business(new_business).await {
            Ok(business) => business,
            Err(StoreError::Conflict(_)) => {
                return Err(AppError::InvalidOperation(
                    "A business with these details already exists.".into(),
                ))
            }
            Err(err) => return Err(err.into()),
        };
        log::info!("Business {} created by {owner_id} (pending)", business.id);
        Ok(business)
    }

    pub async fn update_business(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        request: UpdateBusinessRequest,
    ) -> Result<Business, AppError> {
        let mut business = self.load(business_id).await?;
        if business.owner_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to update this business".into(),
            ));
        }

        request.apply_to_existing(&mut business, self.clock.now());
        self.ensure_unique(&business, Some(business_id), &UPDATE_DUPLICATES).await?;

        match self.store.update_business(&business).await {
            Ok(updated) => Ok(updated),
            Err(StoreError::Conflict(_)) => Err(AppError::InvalidOperation(
                "Another business already uses these details.".into(),
            )),
            Err(err) => Err(err.into()),
        }
    }

    /// Owners may delete their own business, admins any business.
    pub async fn delete_business(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        is_admin: bool,
    ) -> Result<(), AppError> {
        let business = self.load(business_id).await?;
        if business.owner_id != user_id && !is_admin {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this business".into(),
            ));
        }

        self.store.delete_business(business_id).await?;
        log::info!("Business {business_id} deleted by {user_id}");
        Ok(())
    }

    pub async fn get_business(&self, business_id: Uuid) -> Result<BusinessSummary, AppError> {
        self.store
            .get_business_summary(business_id)
            .await?
            .ok_or_else(business_not_found)
    }

    /// Public listing. Without an explicit status only verified businesses are shown.
    pub async fn list_businesses(
        &self,
        query: BusinessListQuery,
    ) -> Result<Vec<BusinessSummary>, AppError> {
        let filter = BusinessFilter {
            category: query.category.filter(|c| !c.trim().is_empty()),
            status: Some(query.status.unwrap_or(BusinessStatus::Verified)),
            owner_id: None,
        };
        let businesses = self.store.list_business_summaries(&filter).await?;

        Ok(match GeoFilter::from_parts(query.latitude, query.longitude, query.radius_km) {
            Some(geo) => businesses
                .into_iter()
                .filter(|s| geo.contains(s.business.latitude, s.business.longitude))
                .collect(),
            None => businesses,
        })
    }

    pub async fn get_owner_businesses(&self, user_id: Uuid) -> Result<Vec<BusinessSummary>, AppError> {
        let filter = BusinessFilter {
            owner_id: Some(user_id),
            ..Default::default()
        };
        Ok(self.store.list_business_summaries(&filter).await?)
    }

    pub async fn add_review(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        request: CreateReviewRequest,
    ) -> Result<BusinessReview, AppError> {
        if !(1..=5).contains(&request.rating) {
            return Err(AppError::Validation("Rating must be between 1 and 5".into()));
        }

        let business = self.load(business_id).await?;
        if business.owner_id == user_id {
            return Err(AppError::InvalidOperation(
                "You cannot review your own business".into(),
            ));
        }
        if self.store.find_review(business_id, user_id).await?.is_some() {
            return Err(already_reviewed());
        }

        let now = self.clock.now();
        let review = BusinessReview {
            id: Uuid::new_v4(),
            business_id,
            user_id,
            rating: request.rating,
            comment: request.comment,
            photo_url: request.photo_url,
            created_at: now,
            updated_at: now,
        };
        match self.store.insert_review(&review).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(already_reviewed()),
            Err(err) => return Err(err.into()),
        }

        self.notifications
            .notify_best_effort(
                business.owner_id,
                NotificationType::Review,
                "New Review",
                &format!(
                    "Your business '{}' received a new {}-star review",
                    business.name, review.rating
                ),
                Some(business_id),
            )
            .await;

        Ok(review)
    }

    pub async fn follow(&self, business_id: Uuid, user_id: Uuid) -> Result<FollowOutcome, AppError> {
        let business = self.load(business_id).await?;
        if self.store.is_following(business_id, user_id).await? {
            return Ok(FollowOutcome::AlreadyFollowing);
        }

        let follower = BusinessFollower {
            id: Uuid::new_v4(),
            business_id,
            user_id,
            followed_at: self.clock.now(),
        };
        match self.store.insert_follower(&follower).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Ok(FollowOutcome::AlreadyFollowing),
            Err(err) => return Err(err.into()),
        }

        let follower_name = match self.store.find_user_by_id(user_id).await {
            Ok(Some(user)) => user.name.filter(|n| !n.trim().is_empty()),
            _ => None,
        };
        self.notifications
            .notify_best_effort(
                business.owner_id,
                NotificationType::Follower,
                "New Follower",
                &format!(
                    "{} started following your business '{}'",
                    follower_name.as_deref().unwrap_or("Someone"),
                    business.name
                ),
                Some(business_id),
            )
            .await;

        Ok(FollowOutcome::Followed)
    }

    pub async fn unfollow(&self, business_id: Uuid, user_id: Uuid) -> Result<UnfollowOutcome, AppError> {
        Ok(if self.store.delete_follower(business_id, user_id).await? {
            UnfollowOutcome::Unfollowed
        } else {
            UnfollowOutcome::NotFollowing
        })
    }

    pub async fn create_post(
        &self,
        business_id: Uuid,
        user_id: Uuid,
        request: CreatePostRequest,
    ) -> Result<BusinessPost, AppError> {
        let business = self.load(business_id).await?;
        if business.owner_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to post for this business".into(),
            ));
        }

        let now = self.clock.now();
        let post = BusinessPost {
            id: Uuid::new_v4(),
            business_id,
            content: request.content,
            image_url: request.image_url,
            video_url: request.video_url,
            likes: 0,
            comments: 0,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_post(&post).await?;
        Ok(post)
    }

    pub async fn get_insights(&self, business_id: Uuid, user_id: Uuid) -> Result<BusinessInsights, AppError> {
        let business = self.load(business_id).await?;
        if business.owner_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to view insights for this business".into(),
            ));
        }
        Ok(self.store.business_insights(business_id).await?)
    }

    pub async fn report_review(
        &self,
        review_id: Uuid,
        user_id: Uuid,
        request: ReportReviewRequest,
    ) -> Result<Uuid, AppError> {
        if self.store.get_review(review_id).await?.is_none() {
            return Err(AppError::NotFound("Review not found".into()));
        }
        if self.store.find_report(review_id, user_id).await?.is_some() {
            return Err(already_reported());
        }

        let report = ReviewReport {
            id: Uuid::new_v4(),
            review_id: Some(review_id),
            reported_by_user_id: user_id,
            reason: request.reason,
            description: request.description,
            status: ReportStatus::Pending,
            created_at: self.clock.now(),
            resolved_at: None,
        };
        match self.store.insert_report(&report).await {
            Ok(()) => Ok(report.id),
            Err(StoreError::Conflict(_)) => Err(already_reported()),
            Err(err) => Err(err.into()),
        }
    }

    async fn load(&self, business_id: Uuid) -> Result<Business, AppError> {
        self.store
            .get_business(business_id)
            .await?
            .ok_or_else(business_not_found)
    }

    async fn ensure_unique(
        &self,
        candidate: &Business,
        exclude: Option<Uuid>,
        messages: &DuplicateMessages,
    ) -> Result<(), AppError> {
        if self
            .store
            .business_name_taken(candidate.owner_id, &candidate.name, exclude)
            .await?
        {
            return Err(AppError::InvalidOperation(messages.name.into()));
        }

        for field in [
            UniqueBusinessField::Email,
            UniqueBusinessField::Website,
            UniqueBusinessField::LogoUrl,
            UniqueBusinessField::CoverPhotoUrl,
        ] {
            let Some(value) = field.value_of(candidate).map(str::trim).filter(|v| !v.is_empty()) else {
                continue;
            };
            if self.store.business_field_taken(field, value, exclude).await? {
                return Err(AppError::InvalidOperation(messages.for_field(field).into()));
            }
        }
        Ok(())
    }
}

pub(crate) fn business_not_found() -> AppError {
    AppError::NotFound("Business not found".into())
}

fn already_reviewed() -> AppError {
    AppError::InvalidOperation("You have already reviewed this business".into())
}

fn already_reported() -> AppError {
    AppError::InvalidOperation("You have already reported this review".into())
}
