use std::sync::Arc;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use pickup_core::config::{NotificationConfig, NotificationTransportType};
use pickup_core::{PickupError, PickupResult};
use pickup_domain::notification::EmailTransport;
use tracing::{debug, info};

/// 通过SMTP(STARTTLS)发送邮件
pub struct SmtpEmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailTransport {
    pub fn new(config: &NotificationConfig) -> PickupResult<Self> {
        let from = config
            .from_address
            .parse::<Mailbox>()
            .map_err(|e| PickupError::Configuration(format!("无效的发件人地址: {e}")))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .map_err(|e| PickupError::Configuration(format!("无效的SMTP服务器: {e}")))?
            .port(config.smtp_port);

        if let Some(password) = &config.password {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                password.clone(),
            ));
        }

        info!(
            "SMTP邮件通道已配置: {}:{}",
            config.smtp_host, config.smtp_port
        );
        Ok(Self {
            mailer: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl EmailTransport for SmtpEmailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PickupResult<()> {
        let to_mailbox = to
            .parse::<Mailbox>()
            .map_err(|e| PickupError::Notification(format!("无效的收件人地址 {to}: {e}")))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| PickupError::Notification(format!("构建邮件失败: {e}")))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| PickupError::Notification(format!("发送邮件到 {to} 失败: {e}")))?;

        debug!("邮件已发送到 {}: {}", to, subject);
        Ok(())
    }
}

/// 只写日志不发信的邮件通道，用于本地运行
#[derive(Debug, Default)]
pub struct LogEmailTransport;

#[async_trait]
impl EmailTransport for LogEmailTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PickupResult<()> {
        info!(to = %to, subject = %subject, "邮件通知: {}", body);
        Ok(())
    }
}

pub fn create_email_transport(config: &NotificationConfig) -> PickupResult<Arc<dyn EmailTransport>> {
    match config.transport {
        NotificationTransportType::Smtp => Ok(Arc::new(SmtpEmailTransport::new(config)?)),
        NotificationTransportType::Log => Ok(Arc::new(LogEmailTransport)),
    }
}
