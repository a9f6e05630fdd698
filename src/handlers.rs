use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{
    ApiResponse, ApproveBusinessRequest, BusinessListQuery, ChangePasswordRequest,
    CreateBusinessRequest, CreatePostRequest, CreateReviewRequest, FollowState,
    ForgotPasswordRequest, LoginRequest, NotificationQuery, RegisterRequest, ReportReceipt,
    ReportReviewRequest, ReportStatusQuery, ResetPasswordRequest, ResolveReportRequest,
    SendOtpRequest, SocialLoginRequest, StatusQuery, UnreadCount, UpdateBusinessRequest,
    VerifyOtpRequest,
};
use crate::security::{AdminUser, AuthenticatedUser};
use crate::services::auth::{Registration, SocialLogin};
use crate::services::business::{FollowOutcome, UnfollowOutcome};
use crate::services::{AuthService, BusinessService, ModerationService, NotificationService, OtpService};

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "linkoja-directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// AUTH
// ============================================================================

#[post("/auth/register")]
pub async fn register(
    auth: web::Data<AuthService>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let user = auth
        .register(Registration {
            email: body.email,
            password: body.password,
            phone: body.phone,
            name: body.name,
            social_id: body.social_id,
        })
        .await?;
    let session = auth.issue_token(&user)?;

    Ok(HttpResponse::Created().json(ApiResponse::success("User registered successfully", session)))
}

#[post("/auth/login")]
pub async fn login(
    auth: web::Data<AuthService>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let user = auth.login(&body.email, &body.password).await?;
    let session = auth.issue_token(&user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", session)))
}

#[post("/auth/forgot-password")]
pub async fn forgot_password(
    auth: web::Data<AuthService>,
    payload: web::Json<ForgotPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    // Unknown addresses get the same answer as known ones.
    match auth.request_password_reset(&body.email).await {
        Ok(()) | Err(AppError::InvalidOperation(_)) => {}
        Err(err) => return Err(err),
    }
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message(
        "If the email exists, a reset link will be sent",
    )))
}

#[post("/auth/reset-password")]
pub async fn reset_password(
    auth: web::Data<AuthService>,
    payload: web::Json<ResetPasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    auth.reset_password(&body.token, &body.new_password).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Password reset successfully")))
}

#[post("/auth/change-password")]
pub async fn change_password(
    auth: web::Data<AuthService>,
    caller: AuthenticatedUser,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    auth.change_password(caller.id, &body.current_password, &body.new_password)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Password changed successfully")))
}

#[post("/auth/social-login")]
pub async fn social_login(
    auth: web::Data<AuthService>,
    payload: web::Json<SocialLoginRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let user = auth
        .social_login(SocialLogin {
            provider: body.provider,
            access_token: body.access_token,
            email: body.email,
            name: body.name,
            photo_url: body.photo_url,
        })
        .await?;
    let session = auth.issue_token(&user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Login successful", session)))
}

// ============================================================================
// BUSINESSES
// ============================================================================

#[get("/business")]
pub async fn list_businesses(
    businesses: web::Data<BusinessService>,
    query: web::Query<BusinessListQuery>,
) -> Result<HttpResponse, AppError> {
    let found = businesses.list_businesses(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Businesses retrieved successfully", found)))
}

#[get("/business/my-businesses")]
pub async fn my_businesses(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let owned = businesses.get_owner_businesses(caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Businesses retrieved successfully", owned)))
}

#[get("/business/{business_id}")]
pub async fn get_business(
    businesses: web::Data<BusinessService>,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let business = businesses.get_business(business_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Business retrieved successfully", business)))
}

#[post("/business")]
pub async fn create_business(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    payload: web::Json<CreateBusinessRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let business = businesses.create_business(caller.id, body).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(
        "Business created successfully and is pending verification",
        business,
    )))
}

#[put("/business/{business_id}")]
pub async fn update_business(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
    payload: web::Json<UpdateBusinessRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let business = businesses
        .update_business(business_id.into_inner(), caller.id, body)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Business updated successfully", business)))
}

#[delete("/business/{business_id}")]
pub async fn delete_business(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    businesses
        .delete_business(business_id.into_inner(), caller.id, caller.is_admin())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Business deleted successfully")))
}

#[post("/business/{business_id}/reviews")]
pub async fn add_review(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
    payload: web::Json<CreateReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let review = businesses
        .add_review(business_id.into_inner(), caller.id, body)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Review added successfully", review)))
}

#[post("/business/{business_id}/follow")]
pub async fn follow_business(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (description, changed) = match businesses.follow(business_id.into_inner(), caller.id).await? {
        FollowOutcome::Followed => ("Business followed successfully", true),
        FollowOutcome::AlreadyFollowing => ("You are already following this business", false),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        description,
        FollowState { is_following: true, changed },
    )))
}

#[delete("/business/{business_id}/follow")]
pub async fn unfollow_business(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let (description, changed) = match businesses.unfollow(business_id.into_inner(), caller.id).await? {
        UnfollowOutcome::Unfollowed => ("Business unfollowed successfully", true),
        UnfollowOutcome::NotFollowing => ("You are not following this business", false),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        description,
        FollowState { is_following: false, changed },
    )))
}

#[post("/business/{business_id}/posts")]
pub async fn create_post(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let post = businesses
        .create_post(business_id.into_inner(), caller.id, body)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success("Post created successfully", post)))
}

#[get("/business/{business_id}/insights")]
pub async fn business_insights(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let insights = businesses
        .get_insights(business_id.into_inner(), caller.id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Insights retrieved successfully", insights)))
}

#[post("/business/reviews/{review_id}/report")]
pub async fn report_review(
    businesses: web::Data<BusinessService>,
    caller: AuthenticatedUser,
    review_id: web::Path<Uuid>,
    payload: web::Json<ReportReviewRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let report_id = businesses
        .report_review(review_id.into_inner(), caller.id, body)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(
        "Review reported successfully",
        ReportReceipt { report_id },
    )))
}

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[get("/notification")]
pub async fn list_notifications(
    notifications: web::Data<NotificationService>,
    caller: AuthenticatedUser,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse, AppError> {
    let found = notifications.list(caller.id, query.unread_only).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Notifications retrieved successfully", found)))
}

#[get("/notification/unread-count")]
pub async fn unread_count(
    notifications: web::Data<NotificationService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let count = notifications.unread_count(caller.id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Unread count retrieved successfully",
        UnreadCount { count },
    )))
}

#[put("/notification/read-all")]
pub async fn mark_all_read(
    notifications: web::Data<NotificationService>,
    caller: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let updated = notifications.mark_all_read(caller.id).await?;
    log::debug!("Marked {updated} notifications read for {}", caller.id);
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("All notifications marked as read")))
}

#[put("/notification/{notification_id}/read")]
pub async fn mark_read(
    notifications: web::Data<NotificationService>,
    caller: AuthenticatedUser,
    notification_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    if !notifications
        .mark_read(notification_id.into_inner(), caller.id)
        .await?
    {
        return Err(AppError::NotFound("Notification not found".into()));
    }
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Notification marked as read")))
}

// ============================================================================
// PHONE VERIFICATION
// ============================================================================

#[post("/verification/send-otp")]
pub async fn send_otp(
    otp: web::Data<OtpService>,
    payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    otp.send(body.phone_number.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("OTP sent successfully")))
}

#[post("/verification/verify-otp")]
pub async fn verify_otp(
    otp: web::Data<OtpService>,
    _caller: AuthenticatedUser,
    payload: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    otp.verify(body.phone_number.trim(), &body.otp_code).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Phone number verified successfully")))
}

#[post("/verification/resend-otp")]
pub async fn resend_otp(
    otp: web::Data<OtpService>,
    payload: web::Json<SendOtpRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    otp.resend(body.phone_number.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("OTP resent successfully")))
}

// ============================================================================
// ADMIN
// ============================================================================

#[get("/admin/businesses/pending")]
pub async fn pending_businesses(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let pending = moderation.list_pending().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Pending businesses retrieved successfully", pending)))
}

#[post("/admin/businesses/{business_id}/approve")]
pub async fn approve_business(
    moderation: web::Data<ModerationService>,
    AdminUser(admin): AdminUser,
    business_id: web::Path<Uuid>,
    payload: web::Json<ApproveBusinessRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let business = moderation
        .approve(business_id.into_inner(), &body.status, body.reason.as_deref())
        .await?;
    log::info!("Admin {} set business {} to {}", admin.id, business.id, business.status.as_str());

    let description = format!("Business {} successfully", business.status.as_str());
    Ok(HttpResponse::Ok().json(ApiResponse::success(description, business)))
}

#[get("/admin/analytics")]
pub async fn platform_analytics(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let analytics = moderation.analytics().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Analytics retrieved successfully", analytics)))
}

#[get("/admin/businesses")]
pub async fn all_businesses(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
    query: web::Query<StatusQuery>,
) -> Result<HttpResponse, AppError> {
    let found = moderation.list_all(query.status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Businesses retrieved successfully", found)))
}

#[delete("/admin/businesses/{business_id}")]
pub async fn admin_delete_business(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
    business_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    moderation.delete_business(business_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::message("Business deleted successfully")))
}

#[get("/admin/reports/reviews")]
pub async fn review_reports(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
    query: web::Query<ReportStatusQuery>,
) -> Result<HttpResponse, AppError> {
    let reports = moderation.list_reports(query.status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Reports retrieved successfully", reports)))
}

#[put("/admin/reports/reviews/{report_id}/resolve")]
pub async fn resolve_report(
    moderation: web::Data<ModerationService>,
    _admin: AdminUser,
    report_id: web::Path<Uuid>,
    payload: web::Json<ResolveReportRequest>,
) -> Result<HttpResponse, AppError> {
    let body = payload.into_inner();
    body.validate()?;

    let report = moderation
        .resolve_report(report_id.into_inner(), &body.action)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success("Report resolved successfully", report)))
}
