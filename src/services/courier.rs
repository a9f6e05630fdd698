use std::sync::Arc;

use html_escape::encode_text;

use crate::clients::{EmailMessage, EmailSender, SmsSender};
use crate::models::BusinessStatus;

const FOOTER: &str = "<p style='color: #666; font-size: 12px;'>This is an automated message from Linkoja. Please do not reply to this email.</p>";

/// Best-effort delivery of SMS and email. Failures are logged and never
/// propagate to the caller.
#[derive(Clone)]
pub struct Courier {
    sms: Arc<dyn SmsSender>,
    email: Arc<dyn EmailSender>,
}

impl Courier {
    pub fn new(sms: Arc<dyn SmsSender>, email: Arc<dyn EmailSender>) -> Self {
        Self { sms, email }
    }

    pub async fn otp_sms(&self, phone_number: &str, code: &str) {
        let message = format!(
            "Your Linkoja verification code is {code}. It expires in 10 minutes."
        );
        if let Err(err) = self.sms.send_sms(phone_number, &message).await {
            log::warn!("Failed to send OTP SMS to {phone_number}: {err}");
        }
    }

    pub async fn otp_email(&self, to: &str, code: &str) {
        let body = format!(
            "<html><body><h2>Phone Number Verification</h2>\
             <p>Your verification code for Linkoja is:</p>\
             <p style='font-size: 24px; font-weight: bold; letter-spacing: 5px;'>{code}</p>\
             <p>This code will expire in 10 minutes.</p>\
             <p>If you didn't request this code, please ignore this email.</p>{FOOTER}</body></html>"
        );
        self.deliver(to, "Your Verification Code - Linkoja", body).await;
    }

    pub async fn welcome(&self, to: &str, name: Option<&str>) {
        let name = encode_text(name.filter(|n| !n.trim().is_empty()).unwrap_or("there"));
        let body = format!(
            "<html><body><h2>Welcome to Linkoja, {name}!</h2>\
             <p>Thank you for joining Linkoja, your local business connection platform.</p>\
             <p>Discover local businesses near you, read reviews and follow your favourites.</p>\
             <p>If you're a business owner, you can register your business and start connecting with customers today!</p>\
             {FOOTER}</body></html>"
        );
        self.deliver(to, "Welcome to Linkoja!", body).await;
    }

    pub async fn password_reset(&self, to: &str, token: &str) {
        let body = format!(
            "<html><body><h2>Password Reset Request</h2>\
             <p>You have requested to reset your password for your Linkoja account.</p>\
             <p>Your password reset token is:</p>\
             <p style='font-size: 18px; font-weight: bold;'>{token}</p>\
             <p>This token will expire in 1 hour.</p>\
             <p>If you didn't request this password reset, please ignore this email.</p>{FOOTER}</body></html>"
        );
        self.deliver(to, "Password Reset Request - Linkoja", body).await;
    }

    pub async fn business_decision(
        &self,
        to: &str,
        business_name: &str,
        status: BusinessStatus,
        reason: Option<&str>,
    ) {
        let subject_name = business_name;
        let business_name = encode_text(business_name);
        let (subject, body) = match status {
            BusinessStatus::Verified => (
                format!("Congratulations! Your Business '{subject_name}' Has Been Approved - Linkoja"),
                format!(
                    "<html><body><h2>Business Approved!</h2>\
                     <p>Great news! Your business <strong>{business_name}</strong> has been verified and approved.</p>\
                     <p>Your business is now live on Linkoja and customers can find and connect with you.</p>\
                     <p>Welcome to the Linkoja community!</p>{FOOTER}</body></html>"
                ),
            ),
            _ => {
                let reason = reason
                    .filter(|r| !r.trim().is_empty())
                    .map(|r| format!("<h3>Reason:</h3><p>{}</p>", encode_text(r)))
                    .unwrap_or_default();
                (
                    format!("Business Registration Update - {subject_name}"),
                    format!(
                        "<html><body><h2>Business Registration Update</h2>\
                         <p>We've reviewed your business registration for <strong>{business_name}</strong>.</p>\
                         <p>Unfortunately, we were unable to approve your business at this time.</p>\
                         {reason}\
                         <p>If you believe this is an error or have questions, please contact our support team.</p>\
                         {FOOTER}</body></html>"
                    ),
                )
            }
        };
        self.deliver(to, &subject, body).await;
    }

    async fn deliver(&self, to: &str, subject: &str, html_body: String) {
        let message = EmailMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html_body,
        };
        if let Err(err) = self.email.send_email(&message).await {
            log::warn!("Failed to send email '{subject}' to {to}: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingMailer, RecordingSms};

    #[actix_web::test]
    async fn failing_transports_are_swallowed() {
        let sms = Arc::new(RecordingSms::failing());
        let mailer = Arc::new(RecordingMailer::failing());
        let courier = Courier::new(sms.clone(), mailer.clone());

        courier.otp_sms("+2348000000000", "123456").await;
        courier.welcome("a@example.com", Some("Ada")).await;

        assert_eq!(sms.sent().len(), 1);
        assert_eq!(mailer.sent().len(), 1);
    }

    #[actix_web::test]
    async fn rejection_email_carries_the_reason() {
        let mailer = Arc::new(RecordingMailer::default());
        let courier = Courier::new(Arc::new(RecordingSms::default()), mailer.clone());

        courier
            .business_decision("o@example.com", "Joe's Cafe", BusinessStatus::Rejected, Some("Blurry documents"))
            .await;

        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Business Registration Update - Joe's Cafe");
        assert!(sent[0].html_body.contains("Blurry documents"));
    }

    #[actix_web::test]
    async fn owner_supplied_text_is_escaped_in_html() {
        let mailer = Arc::new(RecordingMailer::default());
        let courier = Courier::new(Arc::new(RecordingSms::default()), mailer.clone());

        courier
            .business_decision(
                "o@example.com",
                "<b>Joe</b> & Sons",
                BusinessStatus::Rejected,
                Some("<script>alert(1)</script>"),
            )
            .await;
        courier.welcome("a@example.com", Some("<img src=x>")).await;

        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Business Registration Update - <b>Joe</b> & Sons");
        assert!(sent[0].html_body.contains("&lt;b&gt;Joe&lt;/b&gt; &amp; Sons"));
        assert!(sent[0].html_body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!sent[0].html_body.contains("<script>"));
        assert!(sent[1].html_body.contains("Welcome to Linkoja, &lt;img src=x&gt;!"));
    }
}
