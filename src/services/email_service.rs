use crate::config::SmtpConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Transactional mail seam. Like the audit sink, dispatch is best-effort:
/// a delivery failure is logged by the caller, never surfaced.
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| Error::Config(format!("invalid SMTP host: {}", e)))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .port(config.port)
            .build();
        let from = config
            .from_address
            .parse()
            .map_err(|e| Error::Config(format!("invalid SMTP from address: {}", e)))?;
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailDispatcher for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse()
                .map_err(|e| Error::Internal(format!("invalid recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Internal(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::Internal(format!("failed to send email: {}", e)))?;
        Ok(())
    }
}

pub fn verification_email(first_name: &str, link: &str) -> (String, String) {
    (
        "Verify your email address".to_string(),
        format!(
            "Hi {},\n\n\
             Welcome aboard! Please confirm your email address by opening the link below:\n\n\
             {}\n\n\
             The link is valid for 24 hours. If you did not create this account, you can \
             ignore this message.\n",
            first_name, link
        ),
    )
}

pub fn password_reset_email(first_name: &str, link: &str) -> (String, String) {
    (
        "Reset your password".to_string(),
        format!(
            "Hi {},\n\n\
             A password reset was requested for your account. Open the link below to choose \
             a new password:\n\n\
             {}\n\n\
             The link is valid for 1 hour. If you did not request a reset, no action is \
             needed and your password remains unchanged.\n",
            first_name, link
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_embed_the_link() {
        let (subject, body) = verification_email("Alice", "https://app.test/verify?token=abc");
        assert!(subject.contains("Verify"));
        assert!(body.contains("https://app.test/verify?token=abc"));

        let (subject, body) = password_reset_email("Alice", "https://app.test/reset?token=abc");
        assert!(subject.contains("Reset"));
        assert!(body.contains("https://app.test/reset?token=abc"));
    }
}
