//! 自定义提取器
//!
//! 对 Axum 提取器的语义化封装，解析失败统一转换为 `WebError::InvalidArgument`，
//! 由异常订阅者返回 400。

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::WebError;

/// 路径参数
///
/// ```ignore
/// async fn get_user(PathVariable(id): PathVariable<u32>) -> ControllerResult {
///     Ok(View::new(json!({"id": id})))
/// }
/// ```
pub struct PathVariable<T>(pub T);

impl<T> PathVariable<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for PathVariable<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Path parse error");
                WebError::InvalidArgument {
                    message: format!("Invalid path parameter: {}", e.body_text()),
                    source: Some(Box::new(e)),
                }
            })?;

        Ok(PathVariable(value))
    }
}

/// JSON 请求体
pub struct RequestBody<T>(pub T);

impl<T> RequestBody<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
impl<S, T> FromRequest<S> for RequestBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await.map_err(|e| {
            tracing::debug!(error = %e, "JSON parse error");
            WebError::InvalidArgument {
                message: e.body_text(),
                source: Some(Box::new(e)),
            }
        })?;

        Ok(RequestBody(data))
    }
}

/// 查询参数
pub struct QueryParam<T>(pub T);

impl<T> QueryParam<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[async_trait]
impl<S, T> FromRequestParts<S> for QueryParam<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Query parse error");
                WebError::InvalidArgument {
                    message: e.body_text(),
                    source: Some(Box::new(e)),
                }
            })?;

        Ok(QueryParam(value))
    }
}
