pub mod auth;
pub mod business;
pub mod courier;
pub mod geo;
pub mod moderation;
pub mod notifications;
pub mod otp;

use std::sync::Arc;

use crate::clients::{EmailSender, GoogleVerifier, SmsSender};
use crate::clock::Clock;
use crate::security::{JwtService, PasswordHasher};
use crate::store::Store;

pub use auth::AuthService;
pub use business::BusinessService;
pub use courier::Courier;
pub use moderation::ModerationService;
pub use notifications::NotificationService;
pub use otp::OtpService;

/// External collaborators every workflow is built from
pub struct Collaborators {
    pub store: Arc<dyn Store>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub jwt: JwtService,
    pub google: Arc<dyn GoogleVerifier>,
    pub sms: Arc<dyn SmsSender>,
    pub email: Arc<dyn EmailSender>,
    pub clock: Arc<dyn Clock>,
}

/// All workflow services, wired once at start-up
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub otp: OtpService,
    pub businesses: BusinessService,
    pub moderation: ModerationService,
    pub notifications: NotificationService,
    pub jwt: JwtService,
}

impl Services {
    pub fn new(deps: Collaborators) -> Self {
        let courier = Courier::new(deps.sms, deps.email);
        let notifications = NotificationService::new(deps.store.clone(), deps.clock.clone());

        Self {
            auth: AuthService::new(
                deps.store.clone(),
                deps.hasher,
                deps.jwt.clone(),
                deps.google,
                courier.clone(),
                deps.clock.clone(),
            ),
            otp: OtpService::new(deps.store.clone(), courier.clone(), deps.clock.clone()),
            businesses: BusinessService::new(
                deps.store.clone(),
                notifications.clone(),
                deps.clock.clone(),
            ),
            moderation: ModerationService::new(deps.store, notifications.clone(), courier, deps.clock),
            notifications,
            jwt: deps.jwt,
        }
    }
}
