//! 配置管理
//!
//! 配置按以下顺序合并:
//!
//! 1. 内置默认值 ([`AppConfig::default`])
//! 2. TOML 配置文件
//! 3. 以 `PICKUP_` 为前缀的环境变量，层级之间使用 `__` 分隔，
//!    例如 `PICKUP_DATABASE__URL`
//!
//! 加载完成后会对每个配置段执行 `validate()`。主题与订阅名称只在这里
//! 构造一次，之后作为参数传入需要它们的组件。

pub mod models;

pub use models::*;
