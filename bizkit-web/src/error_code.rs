//! 固定错误码
//!
//! 业务异常自带的错误码（大于 0）优先于这里的固定码

/// 错误响应中 `code` 字段使用的固定错误码
pub struct ErrorCode;

impl ErrorCode {
    /// 未分类错误（兜底 500）
    pub const SERVICE_UNAVAILABLE: i64 = 1;

    pub const INVALID_ARGUMENT: i64 = 2;

    pub const INVALID_AUTHENTICATION: i64 = 3;

    pub const ACCESS_DENIED: i64 = 4;

    pub const NOT_FOUND: i64 = 5;
}
