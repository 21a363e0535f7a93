use thiserror::Error;

/// 取件协调器错误类型定义
#[derive(Debug, Error)]
pub enum PickupError {
    /// 创建请求时引用的商户或收运商不存在，发生在任何写入之前
    #[error("引用的{entity}不存在: {id}")]
    Validation { entity: &'static str, id: i64 },

    #[error("取件请求未找到: {id}")]
    PickupRequestNotFound { id: i64 },

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("持久化失败: {0}")]
    Persistence(String),

    /// 数据已经写入存储，但事件没有发布出去
    #[error("事件发布到主题 {topic} 失败 (request_id: {request_id}): {message}")]
    Publish {
        topic: String,
        request_id: i64,
        message: String,
    },

    #[error("消息队列错误: {0}")]
    MessageQueue(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("通知发送失败: {0}")]
    Notification(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl PickupError {
    /// 存储写入本身失败
    pub fn is_persistence(&self) -> bool {
        matches!(self, PickupError::Database(_) | PickupError::Persistence(_))
    }

    /// 调用方修正输入后可以重试的错误
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PickupError::Validation { .. } | PickupError::PickupRequestNotFound { .. }
        )
    }
}

/// 统一的Result类型
pub type Result<T> = std::result::Result<T, PickupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = PickupError::Validation {
            entity: "business",
            id: 42,
        };
        assert!(err.is_client_error());
        assert!(!err.is_persistence());
        assert_eq!(err.to_string(), "引用的business不存在: 42");

        let err = PickupError::Persistence("disk full".to_string());
        assert!(err.is_persistence());
        assert!(!err.is_client_error());

        let err = PickupError::Publish {
            topic: "PICKUP-REQUESTS".to_string(),
            request_id: 7,
            message: "broker unavailable".to_string(),
        };
        assert!(!err.is_persistence());
        assert!(err.to_string().contains("request_id: 7"));
    }
}
