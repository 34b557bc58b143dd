use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info, instrument};

use crate::config::{ConfigError, EmailConfig};

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("SMTP error: {0}")]
    SmtpError(String),

    #[error("Message building error: {0}")]
    MessageError(String),

    #[error("Address error: {0}")]
    AddressError(String),
}

impl From<ConfigError> for EmailError {
    fn from(err: ConfigError) -> Self {
        EmailError::ConfigError(err.to_string())
    }
}

/// Outbound notifications sent to account holders.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_otp_email(&self, to: &str, username: &str, code: &str, ttl_minutes: i64) -> Result<(), EmailError>;
}

#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

pub struct SmtpEmailService {
    pub config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailService {
    #[instrument(skip(config), fields(host = %config.smtp_host, port = config.smtp_port))]
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        config.validate()?;

        let mut transport_builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
            .port(config.smtp_port)
            .timeout(Some(std::time::Duration::from_secs(config.connection_timeout_secs)));

        if config.use_tls {
            let tls_parameters = TlsParameters::new(config.smtp_host.clone())
                .map_err(|e| EmailError::ConfigError(format!("TLS configuration error: {}", e)))?;

            transport_builder = if config.use_starttls {
                transport_builder.tls(Tls::Required(tls_parameters))
            } else {
                transport_builder.tls(Tls::Wrapper(tls_parameters))
            };
        } else {
            transport_builder = transport_builder.tls(Tls::None);
        }

        if !config.smtp_username.is_empty() && !config.smtp_password.is_empty() {
            let credentials = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
            transport_builder = transport_builder.credentials(credentials);
        }

        info!("SMTP email service initialized");
        Ok(Self {
            transport: transport_builder.build(),
            config,
        })
    }

    #[instrument(skip(self, message), fields(to = %message.to, subject = %message.subject))]
    pub async fn send_email(&self, message: EmailMessage) -> Result<(), EmailError> {
        validate_email_address(&message.to)?;
        let email_message = self.build_message(message)?;

        self.transport.send(email_message).await.map_err(|e| {
            error!("Failed to send email: {}", e);
            EmailError::SmtpError(format!("Failed to send email: {}", e))
        })?;

        info!("Email sent successfully");
        Ok(())
    }

    fn build_message(&self, email_message: EmailMessage) -> Result<Message, EmailError> {
        let from_mailbox: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid from address: {}", e)))?;

        let to_mailbox: Mailbox = email_message
            .to
            .parse()
            .map_err(|e| EmailError::AddressError(format!("Invalid to address: {}", e)))?;

        Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(&email_message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email_message.text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email_message.html_body),
                    ),
            )
            .map_err(|e| EmailError::MessageError(format!("Failed to build multipart message: {}", e)))
    }
}

#[async_trait]
impl Mailer for SmtpEmailService {
    #[instrument(skip(self, code), fields(to = %to))]
    async fn send_otp_email(&self, to: &str, username: &str, code: &str, ttl_minutes: i64) -> Result<(), EmailError> {
        let message = otp_email(to, username, code, ttl_minutes);
        self.send_email(message).await
    }
}

pub fn validate_email_address(email: &str) -> Result<(), EmailError> {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(EmailError::AddressError("Invalid email format".to_string())),
    }
}

/// Verification email carrying the one-time code, as plain text and HTML.
pub fn otp_email(to: &str, username: &str, code: &str, ttl_minutes: i64) -> EmailMessage {
    let text_body = format!(
        r#"Hello {username},

Thank you for registering with Bookstore.

Your verification code is: {code}

The code expires in {ttl_minutes} minutes and can only be used once.

If you did not create an account, please ignore this email.

The Bookstore Team"#,
    );

    let html_body = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Verify your email</title>
    <style>
        body {{ font-family: Arial, sans-serif; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; }}
        .code {{ font-size: 28px; letter-spacing: 6px; font-weight: bold; background-color: #f8f9fa; padding: 12px 20px; border-radius: 4px; display: inline-block; }}
        .footer {{ font-size: 12px; color: #6c757d; margin-top: 30px; }}
    </style>
</head>
<body>
    <h2>Verify your email</h2>
    <p>Hello {username},</p>
    <p>Thank you for registering with Bookstore. Your verification code is:</p>
    <p class="code">{code}</p>
    <p>The code expires in {ttl_minutes} minutes and can only be used once.</p>
    <p>If you did not create an account, please ignore this email.</p>
    <div class="footer">This is an automated message. Please do not reply to this email.</div>
</body>
</html>"#,
        username = html_escape::encode_text(username),
        code = html_escape::encode_text(code),
    );

    EmailMessage {
        to: to.to_string(),
        subject: "Your Bookstore verification code".to_string(),
        text_body,
        html_body,
    }
}
