//! 异常转换
//!
//! 把请求处理中未捕获的错误转换为统一的 JSON 错误响应：
//!
//! ```json
//! {"error": {"code": 5, "message": "Not Found.", "trace_id": "1700000000_3f2a9c01bd", "detail": ...}}
//! ```
//!
//! `detail` 只在调试模式下返回，但总会随完整的错误信息写入日志。

use axum::{http::StatusCode, response::Response};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::error::Error as StdError;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{ServiceError, ServiceErrorKind, WebError};
use crate::error_code::ErrorCode;
use crate::event::{EventSubscriber, ExceptionEvent, WebEvents};
use crate::response::json_response;

const NOT_FOUND_MESSAGE: &str = "Not Found.";
const ACCESS_DENIED_MESSAGE: &str = "Access denied.";
const INVALID_AUTHENTICATION_MESSAGE: &str = "Invalid authentication.";
const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service unavailable.";

/// 错误分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub status: StatusCode,
    pub code: i64,
    pub message: String,
}

impl Classification {
    fn new(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

fn or_default(message: &str, default: &str) -> String {
    if message.is_empty() {
        default.to_string()
    } else {
        message.to_string()
    }
}

/// 按固定顺序对错误分类，先匹配者生效
///
/// 未识别的错误一律为 500，非调试模式下隐藏原始消息
pub fn classify(error: &WebError, debug: bool) -> Classification {
    if let WebError::Service(e) = error {
        if e.error_code() > 0 {
            return Classification::new(StatusCode::BAD_REQUEST, e.error_code(), e.message());
        }
    }

    match error {
        WebError::NotFound(message) => {
            Classification::new(StatusCode::NOT_FOUND, ErrorCode::NOT_FOUND, or_default(message, NOT_FOUND_MESSAGE))
        }
        WebError::Service(e) if e.kind() == ServiceErrorKind::NotFound => Classification::new(
            StatusCode::NOT_FOUND,
            ErrorCode::NOT_FOUND,
            or_default(e.message(), NOT_FOUND_MESSAGE),
        ),
        WebError::InvalidArgument { message, .. } => {
            Classification::new(StatusCode::BAD_REQUEST, ErrorCode::INVALID_ARGUMENT, message.as_str())
        }
        WebError::Service(e) if e.kind() == ServiceErrorKind::InvalidArgument => {
            Classification::new(StatusCode::BAD_REQUEST, ErrorCode::INVALID_ARGUMENT, e.message())
        }
        WebError::Service(e) if e.kind() == ServiceErrorKind::AccessDenied => Classification::new(
            StatusCode::FORBIDDEN,
            ErrorCode::ACCESS_DENIED,
            or_default(e.message(), ACCESS_DENIED_MESSAGE),
        ),
        WebError::Authentication { code, message } => Classification::new(
            StatusCode::UNAUTHORIZED,
            if *code != 0 { *code } else { ErrorCode::INVALID_AUTHENTICATION },
            or_default(message, INVALID_AUTHENTICATION_MESSAGE),
        ),
        other => Classification::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::SERVICE_UNAVAILABLE,
            if debug {
                other.to_string()
            } else {
                SERVICE_UNAVAILABLE_MESSAGE.to_string()
            },
        ),
    }
}

/// 错误响应体中 `error` 字段的内容
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub code: i64,
    pub message: String,
    pub trace_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

/// 生成 trace_id：`{unix 秒}_{随机摘要前 10 位}`
pub fn generate_trace_id() -> String {
    let digest = hex::encode(Sha256::digest(Uuid::new_v4().as_bytes()));
    format!("{}_{}", Utc::now().timestamp(), &digest[..10])
}

/// 生成错误详情
///
/// 没有下层错误时为单个帧；否则为 `[下层错误的详情, 本层帧]`，由内向外嵌套
pub fn error_detail(error: &WebError) -> Value {
    let mut frames = Vec::new();
    collect_frames(error, &mut frames);

    // frames 由外向内，从最内层开始折叠
    let mut frames = frames.into_iter().rev();
    let Some(innermost) = frames.next() else {
        return Value::Null;
    };
    frames.fold(innermost, |inner, frame| json!([inner, frame]))
}

fn collect_frames(error: &(dyn StdError + 'static), frames: &mut Vec<Value>) {
    let mut current = Some(error);

    while let Some(err) = current {
        if let Some(web_error) = err.downcast_ref::<WebError>() {
            match web_error {
                WebError::Service(e) => {
                    current = Some(e as &(dyn StdError + 'static));
                    continue;
                }
                WebError::Other(e) => {
                    for (depth, cause) in e.chain().enumerate() {
                        let fallback = if depth == 0 { "anyhow::Error" } else { "dyn std::error::Error" };
                        frames.push(frame(foreign_type_name(cause, fallback), 0, cause, None, &[]));
                    }
                    return;
                }
                _ => frames.push(frame(web_error.type_name(), web_error.error_code(), err, None, &[])),
            }
        } else if let Some(service_error) = err.downcast_ref::<ServiceError>() {
            let location = service_error.location();
            frames.push(frame(
                service_error.kind().type_name(),
                service_error.error_code(),
                err,
                Some((location.file(), location.line())),
                service_error.trace(),
            ));
        } else {
            frames.push(frame(foreign_type_name(err, "dyn std::error::Error"), 0, err, None, &[]));
        }

        current = err.source();
    }
}

fn frame(
    type_name: &str,
    code: i64,
    error: &(dyn StdError + 'static),
    location: Option<(&str, u32)>,
    trace: &[String],
) -> Value {
    json!({
        "type": type_name,
        "code": code,
        "message": error.to_string(),
        "file": location.map(|(file, _)| file),
        "line": location.map(|(_, line)| line),
        "trace": trace,
    })
}

fn foreign_type_name(error: &(dyn StdError + 'static), fallback: &'static str) -> &'static str {
    if error.is::<std::io::Error>() {
        "std::io::Error"
    } else if error.is::<serde_json::Error>() {
        "serde_json::Error"
    } else if error.is::<std::num::ParseIntError>() {
        "std::num::ParseIntError"
    } else {
        fallback
    }
}

/// 错误日志输出
pub trait ErrorLogger: Send + Sync {
    fn error(&self, message: &str, payload: &ErrorPayload);
}

/// 基于 tracing 的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingErrorLogger;

impl ErrorLogger for TracingErrorLogger {
    fn error(&self, message: &str, payload: &ErrorPayload) {
        let payload_json = match serde_json::to_string(payload) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(
                    target: "bizkit::exception",
                    trace_id = %payload.trace_id,
                    error = %e,
                    "Failed to encode error payload"
                );
                String::new()
            }
        };
        tracing::error!(
            target: "bizkit::exception",
            code = payload.code,
            trace_id = %payload.trace_id,
            payload = %payload_json,
            "{}",
            message
        );
    }
}

/// 异常转换订阅者
pub struct ExceptionSubscriber {
    debug: bool,
    logger: Arc<dyn ErrorLogger>,
}

impl ExceptionSubscriber {
    pub fn new(debug: bool, logger: Arc<dyn ErrorLogger>) -> Self {
        Self { debug, logger }
    }

    pub fn with_tracing(debug: bool) -> Self {
        Self::new(debug, Arc::new(TracingErrorLogger))
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// 分类并生成完整的错误信息（包含 detail）
    pub fn translate(&self, error: &WebError) -> (StatusCode, ErrorPayload) {
        let classification = classify(error, self.debug);
        let payload = ErrorPayload {
            code: classification.code,
            message: classification.message,
            trace_id: generate_trace_id(),
            detail: Some(error_detail(error)),
        };
        (classification.status, payload)
    }

    /// 记录日志并生成响应，非调试模式下去掉 detail
    pub fn render(&self, error: &WebError) -> Response {
        let (status, mut payload) = self.translate(error);

        self.logger.error("exception", &payload);

        if !self.debug {
            payload.detail = None;
        }

        json_response(status, &json!({ "error": payload }))
    }
}

impl EventSubscriber for ExceptionSubscriber {
    fn name(&self) -> &str {
        "ExceptionSubscriber"
    }

    fn subscribed_events(&self) -> Vec<WebEvents> {
        vec![WebEvents::Exception]
    }

    fn on_exception(&self, event: &mut ExceptionEvent) {
        tracing::debug!(path = %event.path, error_type = event.error.type_name(), "Translating exception");
        event.response = Some(self.render(&event.error));
    }
}
