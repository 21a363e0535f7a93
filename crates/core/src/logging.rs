use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// 初始化日志系统
///
/// `RUST_LOG` 存在时优先于配置中的日志级别。
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.log_format.as_str() {
        "json" => {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .context("初始化JSON日志格式失败")?;
        }
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
                .context("初始化Pretty日志格式失败")?;
        }
        other => {
            return Err(anyhow::anyhow!("不支持的日志格式: {other}"));
        }
    }

    Ok(())
}

/// 隐藏连接串中的密码部分
pub fn mask_url_credentials(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.rsplit_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_url_credentials() {
        assert_eq!(
            mask_url_credentials("postgresql://pickup:secret@db:5432/pickup"),
            "postgresql://pickup:***@db:5432/pickup"
        );
        assert_eq!(
            mask_url_credentials("amqp://localhost:5672"),
            "amqp://localhost:5672"
        );
        assert_eq!(mask_url_credentials("not a url"), "not a url");
    }
}
