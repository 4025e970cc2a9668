//! Web 生命周期事件
//!
//! 每个请求最多产生一个事件：处理成功派发 VIEW，出错或 panic 派发 EXCEPTION。
//! VIEW 订阅者返回的错误会转为 EXCEPTION 再派发一次。

use axum::{http::StatusCode, response::Response};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::WebError;
use crate::error_code::ErrorCode;
use crate::response::json_response;

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebEvents {
    /// 请求处理过程中出现未捕获的错误
    Exception,
    /// 控制器返回了结果
    View,
}

impl WebEvents {
    pub fn name(&self) -> &'static str {
        match self {
            WebEvents::Exception => "web.exception",
            WebEvents::View => "web.view",
        }
    }
}

impl fmt::Display for WebEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// EXCEPTION 事件
pub struct ExceptionEvent {
    pub error: Arc<WebError>,
    pub path: String,
    /// 订阅者设置的响应，设置后停止派发
    pub response: Option<Response>,
}

impl ExceptionEvent {
    pub fn new(error: Arc<WebError>, path: impl Into<String>) -> Self {
        Self {
            error,
            path: path.into(),
            response: None,
        }
    }
}

/// VIEW 事件
pub struct ViewEvent {
    pub result: Value,
    pub path: String,
    pub response: Option<Response>,
}

impl ViewEvent {
    pub fn new(result: Value, path: impl Into<String>) -> Self {
        Self {
            result,
            path: path.into(),
            response: None,
        }
    }
}

/// 事件订阅者
pub trait EventSubscriber: Send + Sync {
    /// 订阅者名称（用于日志）
    fn name(&self) -> &str;

    /// 优先级，数值越小越先执行
    fn priority(&self) -> i32 {
        100
    }

    fn subscribed_events(&self) -> Vec<WebEvents>;

    fn on_exception(&self, event: &mut ExceptionEvent) {
        let _ = event;
    }

    fn on_view(&self, event: &mut ViewEvent) -> Result<(), WebError> {
        let _ = event;
        Ok(())
    }
}

/// 事件派发器
///
/// 启动时装配订阅者，之后在请求间只读共享
#[derive(Default)]
pub struct WebEventDispatcher {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl WebEventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriber(mut self, subscriber: impl EventSubscriber + 'static) -> Self {
        self.add_subscriber(Arc::new(subscriber));
        self
    }

    /// 添加订阅者，同优先级按添加顺序执行
    pub fn add_subscriber(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        tracing::debug!(
            subscriber = subscriber.name(),
            priority = subscriber.priority(),
            "Adding event subscriber"
        );
        self.subscribers.push(subscriber);
        self.subscribers.sort_by_key(|s| s.priority());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// 订阅了指定事件的订阅者，按执行顺序
    pub fn listeners(&self, event: WebEvents) -> Vec<Arc<dyn EventSubscriber>> {
        self.subscribers
            .iter()
            .filter(|s| s.subscribed_events().contains(&event))
            .cloned()
            .collect()
    }

    /// 派发 EXCEPTION 事件，始终返回一个响应
    pub fn dispatch_exception(&self, error: Arc<WebError>, path: &str) -> Response {
        let mut event = ExceptionEvent::new(error, path);

        for subscriber in self.listeners(WebEvents::Exception) {
            subscriber.on_exception(&mut event);
            if event.response.is_some() {
                break;
            }
        }

        match event.response {
            Some(response) => response,
            None => {
                tracing::warn!(
                    path,
                    error = %event.error,
                    "No subscriber produced a response for {}",
                    WebEvents::Exception
                );
                fallback_error_response()
            }
        }
    }

    /// 派发 VIEW 事件；订阅者报错或没有订阅者处理时转为 EXCEPTION
    pub fn dispatch_view(&self, result: Value, path: &str) -> Response {
        let mut event = ViewEvent::new(result, path);

        for subscriber in self.listeners(WebEvents::View) {
            if let Err(error) = subscriber.on_view(&mut event) {
                tracing::debug!(
                    subscriber = subscriber.name(),
                    error = %error,
                    "View subscriber failed, dispatching {}",
                    WebEvents::Exception
                );
                return self.dispatch_exception(Arc::new(error), path);
            }
            if event.response.is_some() {
                break;
            }
        }

        match event.response {
            Some(response) => response,
            None => self.dispatch_exception(
                Arc::new(WebError::logic(format!(
                    "No subscriber produced a response for {}",
                    WebEvents::View
                ))),
                path,
            ),
        }
    }
}

fn fallback_error_response() -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        &json!({
            "error": {
                "code": ErrorCode::SERVICE_UNAVAILABLE,
                "message": "Service unavailable.",
            }
        }),
    )
}
