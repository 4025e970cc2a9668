//! # Bizkit Web
//!
//! 基于 Axum 的 Web 集成层
//!
//! ## 核心特性
//!
//! - **注解路由发现** - 扫描控制器目录，按 `RoutePrefix` 注解挂载路由，可缓存到磁盘
//! - **统一错误响应** - 未捕获的错误转换为 `{"error": {...}}` JSON，带 trace_id
//! - **统一结果序列化** - 控制器返回的 JSON 对象或数组直接作为响应体
//! - **生命周期事件** - EXCEPTION / VIEW 事件与可插拔的订阅者

pub mod annotation;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod error_code;
pub mod event;
pub mod exception;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod router;
pub mod server;

// controller! 宏展开时使用
#[doc(hidden)]
pub use inventory;

pub use annotation::{Annotation, AnnotationReader, InventoryAnnotationReader, StaticAnnotationReader, ROUTE_PREFIX};
pub use controller::{ControllerResult, View};
pub use discovery::{AnnotationRouteDiscovery, RouteEntry};
pub use error::{ServiceError, ServiceErrorKind, WebError};
pub use error_code::ErrorCode;
pub use event::{EventSubscriber, WebEventDispatcher, WebEvents};
pub use exception::{ErrorLogger, ErrorPayload, ExceptionSubscriber, TracingErrorLogger};
pub use response::ResponseSubscriber;
pub use router::{AnnotationRouter, ResourceRouter};
pub use server::{ServerProperties, WebApplication};

pub mod prelude {
    //! 预导入模块

    pub use crate::controller::{ControllerResult, View};
    pub use crate::error::{ServiceError, WebError};
    pub use crate::error_code::ErrorCode;
    pub use crate::extractors::*;
    pub use crate::server::{ServerProperties, WebApplication};

    pub use axum;
    pub use axum::routing::{delete, get, patch, post, put};
    pub use axum::Router;
    pub use serde_json::json;
}
