//! Web 层错误类型
//!
//! 控制器与提取器返回的错误都归一到 `WebError`，再由异常订阅者
//! 按固定顺序分类为 HTTP 状态码与错误码。
//!
//! ## 错误来源
//!
//! 1. **业务层** - `ServiceError`，可携带大于 0 的业务错误码
//! 2. **提取器层** - 路径、查询、JSON 解析失败，归为 `InvalidArgument`
//! 3. **认证层** - `Authentication`
//! 4. **程序逻辑** - `Logic`，例如控制器返回了非结构化的值
//! 5. **其他** - panic 与任意 `anyhow::Error`

use axum::response::{IntoResponse, Response};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

use crate::exception::classify;
use crate::response::json_response;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 业务错误的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    General,
    NotFound,
    InvalidArgument,
    AccessDenied,
}

impl ServiceErrorKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            ServiceErrorKind::General => "ServiceError",
            ServiceErrorKind::NotFound => "ServiceError::NotFound",
            ServiceErrorKind::InvalidArgument => "ServiceError::InvalidArgument",
            ServiceErrorKind::AccessDenied => "ServiceError::AccessDenied",
        }
    }
}

/// 业务错误
///
/// 构造时记录调用位置；`RUST_BACKTRACE` 开启时同时记录调用栈，
/// 调试模式下会出现在错误响应的 `detail` 中。
///
/// ```ignore
/// return Err(ServiceError::with_code(1001, "quota exceeded").into());
/// ```
#[derive(Error, Debug)]
#[error("{message}")]
pub struct ServiceError {
    kind: ServiceErrorKind,
    code: i64,
    message: String,
    #[source]
    source: Option<BoxError>,
    location: &'static Location<'static>,
    trace: Vec<String>,
}

impl ServiceError {
    #[track_caller]
    fn build(kind: ServiceErrorKind, code: i64, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            source: None,
            location: Location::caller(),
            trace: capture_trace(),
        }
    }

    /// 不带错误码的通用业务错误，对外表现为 500
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::General, 0, message)
    }

    /// 带业务错误码的错误，错误码与消息会原样返回给调用方
    #[track_caller]
    pub fn with_code(code: i64, message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::General, code, message)
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::NotFound, 0, message)
    }

    #[track_caller]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::InvalidArgument, 0, message)
    }

    #[track_caller]
    pub fn access_denied(message: impl Into<String>) -> Self {
        Self::build(ServiceErrorKind::AccessDenied, 0, message)
    }

    pub fn with_error_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn kind(&self) -> ServiceErrorKind {
        self.kind
    }

    pub fn error_code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }
}

/// Web 层统一错误
#[derive(Error, Debug)]
pub enum WebError {
    /// 资源不存在 - 404
    #[error("{0}")]
    NotFound(String),

    /// 参数非法 - 400（路径、查询、请求体解析失败也归到这里）
    #[error("{message}")]
    InvalidArgument {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 认证失败 - 401，code 为 0 时使用固定错误码
    #[error("{message}")]
    Authentication { code: i64, message: String },

    /// 程序逻辑错误 - 500
    #[error("{0}")]
    Logic(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Handler panic - 500
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl WebError {
    pub fn not_found(message: impl Into<String>) -> Self {
        WebError::NotFound(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        WebError::InvalidArgument {
            message: message.into(),
            source: None,
        }
    }

    pub fn authentication(code: i64, message: impl Into<String>) -> Self {
        WebError::Authentication {
            code,
            message: message.into(),
        }
    }

    pub fn logic(message: impl Into<String>) -> Self {
        WebError::Logic(message.into())
    }

    /// 错误类型名称，用于错误详情
    pub fn type_name(&self) -> &'static str {
        match self {
            WebError::NotFound(_) => "WebError::NotFound",
            WebError::InvalidArgument { .. } => "WebError::InvalidArgument",
            WebError::Authentication { .. } => "WebError::Authentication",
            WebError::Logic(_) => "WebError::Logic",
            WebError::Service(e) => e.kind().type_name(),
            WebError::Internal(_) => "WebError::Internal",
            WebError::Other(_) => "anyhow::Error",
        }
    }

    /// 错误自带的错误码（没有则为 0）
    pub fn error_code(&self) -> i64 {
        match self {
            WebError::Authentication { code, .. } => *code,
            WebError::Service(e) => e.error_code(),
            _ => 0,
        }
    }
}

/// 从 anyhow::Error 还原出具体的错误类型
///
/// 控制器使用 `anyhow::Result` 时，内部携带的 ServiceError / WebError 依然按原类型分类
impl From<anyhow::Error> for WebError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<WebError>() {
            Ok(web_error) => return web_error,
            Err(err) => err,
        };

        match err.downcast::<ServiceError>() {
            Ok(service_error) => WebError::Service(service_error),
            Err(err) => WebError::Other(err),
        }
    }
}

/// 实现 IntoResponse，使 WebError 可以直接作为 Handler 返回值
///
/// 响应的 Extension 中会带上 `Arc<WebError>`，`web_events` 中间件据此派发
/// EXCEPTION 事件并替换为最终响应；未挂载中间件时返回不含调试信息的错误体。
impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let classification = classify(&self, false);
        let body = serde_json::json!({
            "error": {
                "code": classification.code,
                "message": classification.message,
            }
        });

        let mut response = json_response(classification.status, &body);
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}

/// 仅在 `RUST_BACKTRACE` / `RUST_LIB_BACKTRACE` 开启时采集
pub(crate) fn capture_trace() -> Vec<String> {
    let backtrace = Backtrace::capture();
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }

    backtrace
        .to_string()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_service_error_records_caller() {
        let err = ServiceError::with_code(1001, "quota exceeded");
        assert_eq!(err.location().file(), file!());
        assert_eq!(err.error_code(), 1001);
        assert_eq!(err.kind(), ServiceErrorKind::General);
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[test]
    fn test_service_error_source_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = ServiceError::new("save failed").with_source(io);
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn test_from_anyhow_recovers_service_error() {
        let err: anyhow::Error = ServiceError::not_found("no such user").into();
        let web_error = WebError::from(err);
        assert!(matches!(
            web_error,
            WebError::Service(ref e) if e.kind() == ServiceErrorKind::NotFound
        ));
    }

    #[test]
    fn test_from_anyhow_recovers_web_error() {
        let err: anyhow::Error = WebError::logic("bad shape").into();
        assert!(matches!(WebError::from(err), WebError::Logic(_)));
    }

    #[test]
    fn test_from_anyhow_keeps_unknown_error() {
        let web_error = WebError::from(anyhow::anyhow!("boom"));
        assert!(matches!(web_error, WebError::Other(_)));
        assert_eq!(web_error.type_name(), "anyhow::Error");
    }

    #[test]
    fn test_into_response_carries_error_extension() {
        let response = WebError::not_found("").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.extensions().get::<Arc<WebError>>().is_some());
    }
}
