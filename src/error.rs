// src/error.rs

use thiserror::Error;

/// 播放器核心错误类型
///
/// 所有错误都在本地恢复（固定间隔重试或降级），不会导致进程退出。
/// 持久化和布局配置的失败在各自源头记日志并降级（当作无缓存 / 回退
/// 默认布局），不会以错误值的形式传播出来。
#[derive(Error, Debug)]
pub enum PlayerError {
    /// 网络错误（campaign 拉取、通道握手）
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// 单个媒体文件缓存失败，调用方决定重试整批还是降级远端地址
    #[error("cache error for {url}: {reason}")]
    Cache { url: String, reason: String },

    /// 载荷解析失败
    #[error("payload parse error: {0}")]
    Parse(String),
}

impl PlayerError {
    pub fn cache(url: &str, reason: impl ToString) -> Self {
        Self::Cache {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// 本 crate 统一的 Result 类型
pub type Result<T> = std::result::Result<T, PlayerError>;
