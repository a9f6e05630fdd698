//! Local business directory backend: accounts, phone verification, business
//! listings with reviews and followers, notifications and admin moderation.

pub mod clients;
pub mod clock;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;
pub mod store;
pub mod testing;

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    web, HttpRequest,
};

use crate::error::AppError;
use crate::services::Services;

fn json_error(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid request body: {err}")).into()
}

fn query_error(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid query string: {err}")).into()
}

fn path_error(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(format!("Invalid path parameter: {err}")).into()
}

/// Registers the services, extractor settings and every route of the API.
pub fn configure(services: Services) -> impl Fn(&mut web::ServiceConfig) + Clone {
    move |cfg: &mut web::ServiceConfig| {
        cfg.app_data(web::Data::new(services.auth.clone()))
            .app_data(web::Data::new(services.otp.clone()))
            .app_data(web::Data::new(services.businesses.clone()))
            .app_data(web::Data::new(services.moderation.clone()))
            .app_data(web::Data::new(services.notifications.clone()))
            .app_data(web::Data::new(services.jwt.clone()))
            .app_data(web::JsonConfig::default().error_handler(json_error))
            .app_data(web::QueryConfig::default().error_handler(query_error))
            .app_data(web::PathConfig::default().error_handler(path_error))
            .service(handlers::health_check)
            .service(
                web::scope("/api")
                    // Auth
                    .service(handlers::register)
                    .service(handlers::login)
                    .service(handlers::forgot_password)
                    .service(handlers::reset_password)
                    .service(handlers::change_password)
                    .service(handlers::social_login)
                    // Businesses (static segments before `{business_id}`)
                    .service(handlers::list_businesses)
                    .service(handlers::my_businesses)
                    .service(handlers::report_review)
                    .service(handlers::get_business)
                    .service(handlers::create_business)
                    .service(handlers::update_business)
                    .service(handlers::delete_business)
                    .service(handlers::add_review)
                    .service(handlers::follow_business)
                    .service(handlers::unfollow_business)
                    .service(handlers::create_post)
                    .service(handlers::business_insights)
                    // Notifications
                    .service(handlers::list_notifications)
                    .service(handlers::unread_count)
                    .service(handlers::mark_all_read)
                    .service(handlers::mark_read)
                    // Phone verification
                    .service(handlers::send_otp)
                    .service(handlers::verify_otp)
                    .service(handlers::resend_otp)
                    // Admin
                    .service(handlers::pending_businesses)
                    .service(handlers::approve_business)
                    .service(handlers::platform_analytics)
                    .service(handlers::all_businesses)
                    .service(handlers::admin_delete_business)
                    .service(handlers::review_reports)
                    .service(handlers::resolve_report),
            );
    }
}
