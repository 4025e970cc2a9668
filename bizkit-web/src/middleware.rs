//! 中间件
//!
//! `web_events` 把处理结果转为生命周期事件，`request_logging` 记录请求摘要。

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures_util::FutureExt;
use std::{sync::Arc, time::Instant};

use crate::controller::View;
use crate::error::WebError;
use crate::event::WebEventDispatcher;

/// 请求日志中间件
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let uri = req.uri().clone();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed = ?start.elapsed(),
        "Request completed"
    );

    response
}

/// 生命周期事件中间件
///
/// - panic：转为 `WebError::Internal`，派发 EXCEPTION
/// - 响应中带 `Arc<WebError>`：派发 EXCEPTION
/// - 响应中带 `View`：派发 VIEW
/// - 其他响应原样返回
///
/// ```ignore
/// let app = router.layer(axum::middleware::from_fn_with_state(dispatcher, web_events));
/// ```
pub async fn web_events(
    State(dispatcher): State<Arc<WebEventDispatcher>>,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();

    let mut response = match std::panic::AssertUnwindSafe(next.run(req)).catch_unwind().await {
        Ok(response) => response,
        Err(panic) => {
            let message = if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else {
                "Unknown panic occurred".to_string()
            };

            tracing::error!(path = %path, error = %message, "Handler panicked");

            return dispatcher.dispatch_exception(Arc::new(WebError::Internal(message)), &path);
        }
    };

    if let Some(error) = response.extensions_mut().remove::<Arc<WebError>>() {
        return dispatcher.dispatch_exception(error, &path);
    }

    if let Some(view) = response.extensions_mut().remove::<View>() {
        return dispatcher.dispatch_view(view.into_inner(), &path);
    }

    response
}
