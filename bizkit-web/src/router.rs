//! 资源路由
//!
//! 路由发现把 (控制器, 前缀) 交给 `ResourceRouter`；`AnnotationRouter` 记录这些资源，
//! 最终把每个控制器的路由表挂载到前缀下，组装成 axum Router。

use axum::Router;
use bizkit_core::{ApplicationError, ApplicationResult};

use crate::controller::{find_controller, ControllerRegistration};

/// 路由注册接口
pub trait ResourceRouter {
    /// 在前缀下挂载一个控制器
    fn add_resource(&mut self, class: &str, prefix: &str);
}

/// 已登记的资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResource {
    pub class: String,
    pub prefix: String,
}

/// 基于注解的资源路由
///
/// 重复的前缀不在这里检测，冲突由 axum 在组装时报告
#[derive(Debug, Default)]
pub struct AnnotationRouter {
    resources: Vec<RouteResource>,
}

impl AnnotationRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按登记顺序返回所有资源
    pub fn resources(&self) -> &[RouteResource] {
        &self.resources
    }

    /// 使用 inventory 中注册的控制器组装路由
    pub fn build(&self) -> ApplicationResult<Router> {
        self.build_with(find_controller)
    }

    /// 使用自定义的控制器查找函数组装路由
    pub fn build_with<F>(&self, lookup: F) -> ApplicationResult<Router>
    where
        F: Fn(&str) -> Option<&'static ControllerRegistration>,
    {
        let mut router = Router::new();

        for resource in &self.resources {
            let registration = lookup(&resource.class).ok_or_else(|| {
                ApplicationError::config(format!(
                    "Controller '{}' is not registered",
                    resource.class
                ))
            })?;

            let routes = (registration.routes)();
            let prefix = normalize_prefix(&resource.prefix);

            let mount_point = if prefix.is_empty() { "/" } else { prefix.as_str() };
            tracing::info!(
                controller = registration.type_name,
                class = %resource.class,
                prefix = mount_point,
                "Mounted controller"
            );

            router = if prefix.is_empty() {
                router.merge(routes)
            } else {
                router.nest(&prefix, routes)
            };
        }

        Ok(router)
    }
}

impl ResourceRouter for AnnotationRouter {
    fn add_resource(&mut self, class: &str, prefix: &str) {
        tracing::debug!(class, prefix, "Registering route resource");
        self.resources.push(RouteResource {
            class: class.to_string(),
            prefix: prefix.to_string(),
        });
    }
}

/// 规范化前缀：保证以 `/` 开头、去掉末尾的 `/`；根路径返回空串
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::View;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use serde_json::json;
    use tower::ServiceExt;

    pub struct PingController;

    impl PingController {
        fn routes() -> Router {
            Router::new().route("/ping", get(|| async { View::new(json!({"pong": true})) }))
        }
    }

    crate::controller!(PingController, routes = PingController::routes);

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("/users"), "/users");
        assert_eq!(normalize_prefix("users/"), "/users");
        assert_eq!(normalize_prefix("/api/v1/"), "/api/v1");
        assert_eq!(normalize_prefix("/"), "");
        assert_eq!(normalize_prefix(""), "");
    }

    #[test]
    fn test_add_resource_keeps_order() {
        let mut router = AnnotationRouter::new();
        router.add_resource("app::b", "/b");
        router.add_resource("app::a", "/a");
        router.add_resource("app::c", "/a");

        let classes: Vec<_> = router.resources().iter().map(|r| r.class.as_str()).collect();
        assert_eq!(classes, vec!["app::b", "app::a", "app::c"]);
    }

    #[test]
    fn test_build_unknown_controller_is_config_error() {
        let mut router = AnnotationRouter::new();
        router.add_resource("app::missing", "/missing");

        let err = router.build().err().unwrap();
        assert!(matches!(err, ApplicationError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_nests_under_prefix() {
        let mut router = AnnotationRouter::new();
        router.add_resource(module_path!(), "/health/");

        let app = router.build().unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], br#"{"pong":true}"#);
    }

    #[tokio::test]
    async fn test_build_merges_root_prefix() {
        let mut router = AnnotationRouter::new();
        router.add_resource(module_path!(), "/");

        let app = router.build().unwrap();
        let response = app
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
