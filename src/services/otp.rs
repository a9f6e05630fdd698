use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::OtpVerification;
use crate::services::courier::Courier;
use crate::store::Store;

pub const OTP_TTL_MINUTES: i64 = 10;
pub const MAX_VERIFY_ATTEMPTS: i32 = 3;
pub const RESEND_COOLDOWN_SECONDS: i64 = 60;

/// Phone verification by one-time code.
///
/// A phone has at most one live unverified code; sending again overwrites it
/// and resets the attempt counter. Expiry is checked lazily on verification.
#[derive(Clone)]
pub struct OtpService {
    store: Arc<dyn Store>,
    courier: Courier,
    clock: Arc<dyn Clock>,
}

impl OtpService {
    pub fn new(store: Arc<dyn Store>, courier: Courier, clock: Arc<dyn Clock>) -> Self {
        Self { store, courier, clock }
    }

    pub async fn send(&self, phone_number: &str) -> Result<(), AppError> {
        let code = generate_code();
        let now = self.clock.now();
        let expires_at = now + Duration::minutes(OTP_TTL_MINUTES);

        let reissued = match self.store.latest_unverified_otp(phone_number).await? {
            Some(mut existing) => {
                existing.otp_code = code.clone();
                existing.expires_at = expires_at;
                existing.attempt_count = 0;
                existing.created_at = now;
                self.store.reissue_otp(&existing).await?
            }
            None => false,
        };
        if !reissued {
            let otp = OtpVerification {
                id: Uuid::new_v4(),
                phone_number: phone_number.to_string(),
                otp_code: code.clone(),
                is_verified: false,
                expires_at,
                attempt_count: 0,
                created_at: now,
            };
            self.store.insert_otp(&otp).await?;
        }
        log::info!("Issued OTP for {phone_number}");

        self.courier.otp_sms(phone_number, &code).await;

        match self.store.find_user_by_phone(phone_number).await {
            Ok(Some(user)) if !user.email.trim().is_empty() => {
                self.courier.otp_email(&user.email, &code).await;
            }
            Ok(_) => {}
            Err(err) => log::warn!("Could not look up user for OTP email to {phone_number}: {err}"),
        }

        Ok(())
    }

    /// Each call spends one attempt before the code is compared, so parallel
    /// guesses share the same limit.
    pub async fn verify(&self, phone_number: &str, code: &str) -> Result<(), AppError> {
        let otp = self
            .store
            .latest_unverified_otp(phone_number)
            .await?
            .ok_or_else(no_live_code)?;

        let now = self.clock.now();
        if now > otp.expires_at {
            return Err(AppError::Expired("OTP has expired".into()));
        }

        let otp = self
            .store
            .record_otp_attempt(otp.id, MAX_VERIFY_ATTEMPTS)
            .await?
            .ok_or_else(|| {
                AppError::TooManyAttempts("Maximum verification attempts exceeded".into())
            })?;
        if otp.otp_code != code.trim() {
            return Err(AppError::InvalidCode("Invalid OTP code".into()));
        }

        if !self.store.mark_otp_verified(otp.id).await? {
            return Err(no_live_code());
        }

        if let Some(mut user) = self.store.find_user_by_phone(phone_number).await? {
            user.is_phone_verified = true;
            user.updated_at = now;
            self.store.update_user(&user).await?;
        }
        log::info!("Verified phone number {phone_number}");

        Ok(())
    }

    pub async fn resend(&self, phone_number: &str) -> Result<(), AppError> {
        if let Some(last) = self.store.latest_otp(phone_number).await? {
            let elapsed = self.clock.now() - last.created_at;
            if elapsed < Duration::seconds(RESEND_COOLDOWN_SECONDS) {
                return Err(AppError::RateLimited(
                    "Please wait before requesting a new OTP".into(),
                ));
            }
        }
        self.send(phone_number).await
    }
}

fn no_live_code() -> AppError {
    AppError::NotFound("No OTP found for this phone number".into())
}

fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}
