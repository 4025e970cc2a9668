//! 框架级错误类型
//!
//! 配置错误在构造期或缓存写入时立即失败，不做重试。

use thiserror::Error;

/// 启动与装配阶段的错误
#[derive(Error, Debug)]
pub enum ApplicationError {
    /// 配置错误：目录不可用、缓存不可写、配置值非法等
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),

    #[error("{0}")]
    Other(String),
}

impl ApplicationError {
    pub fn config(message: impl Into<String>) -> Self {
        ApplicationError::Config(message.into())
    }
}

pub type ApplicationResult<T> = std::result::Result<T, ApplicationError>;

/// 通用 Result，业务代码沿用 anyhow
pub use anyhow::Result;
