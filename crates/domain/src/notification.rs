//! 通知相关抽象

use async_trait::async_trait;
use pickup_core::PickupResult;

/// 可接收邮件通知的参与方
pub trait EmailRecipient: Send + Sync {
    fn email(&self) -> &str;

    /// 邮件称呼中使用的名称
    fn display_name(&self) -> &str;
}

/// 邮件发送通道
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PickupResult<()>;
}
