use serde::{Deserialize, Serialize};

/// 事件订阅者配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// 接收消息出错后等待多久再重试（毫秒）
    pub receive_retry_delay_ms: u64,
    /// 关闭时等待所有订阅任务退出的最长时间（秒）
    pub shutdown_timeout_seconds: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            receive_retry_delay_ms: 1000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl ListenerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.receive_retry_delay_ms == 0 {
            return Err(anyhow::anyhow!("接收重试间隔必须大于0"));
        }

        if self.shutdown_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("关闭超时时间必须大于0"));
        }

        Ok(())
    }
}
