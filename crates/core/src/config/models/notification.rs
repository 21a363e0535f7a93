use serde::{Deserialize, Serialize};

/// 通知发送方式
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTransportType {
    #[default]
    Smtp,
    /// 只写日志，不真正发送邮件
    Log,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub transport: NotificationTransportType,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub from_address: String,
    /// 邮件正文落款
    pub signature: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            transport: NotificationTransportType::default(),
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            username: String::new(),
            password: None,
            from_address: String::new(),
            signature: "Xphora AI".to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.transport != NotificationTransportType::Smtp {
            return Ok(());
        }

        if self.smtp_host.is_empty() {
            return Err(anyhow::anyhow!("SMTP主机地址不能为空"));
        }

        if self.smtp_port == 0 {
            return Err(anyhow::anyhow!("SMTP端口必须大于0"));
        }

        if self.username.is_empty() {
            return Err(anyhow::anyhow!("SMTP用户名不能为空"));
        }

        if !self.from_address.contains('@') {
            return Err(anyhow::anyhow!("发件人地址无效: {}", self.from_address));
        }

        Ok(())
    }
}
