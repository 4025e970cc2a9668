//! 结果序列化
//!
//! 控制器的返回值只能是 JSON 对象或数组，由 `ResponseSubscriber` 序列化为 200 响应。

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::WebError;
use crate::event::{EventSubscriber, ViewEvent, WebEvents};

/// 所有 JSON 响应使用的 Content-Type
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// 构造 JSON 响应
pub fn json_response(status: StatusCode, body: &Value) -> Response {
    let mut response = (status, body.to_string()).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}

/// 控制器返回值的序列化订阅者
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseSubscriber;

impl ResponseSubscriber {
    pub const INVALID_RESULT_MESSAGE: &'static str =
        "The controller must return array or response instance.";

    pub fn new() -> Self {
        Self
    }
}

impl EventSubscriber for ResponseSubscriber {
    fn name(&self) -> &str {
        "ResponseSubscriber"
    }

    fn subscribed_events(&self) -> Vec<WebEvents> {
        vec![WebEvents::View]
    }

    fn on_view(&self, event: &mut ViewEvent) -> Result<(), WebError> {
        if !(event.result.is_object() || event.result.is_array()) {
            tracing::debug!(path = %event.path, "Controller returned a non-structured value");
            return Err(WebError::logic(Self::INVALID_RESULT_MESSAGE));
        }

        event.response = Some(json_response(StatusCode::OK, &event.result));
        Ok(())
    }
}
