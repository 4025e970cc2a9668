//! Web 服务器
//!
//! 根据 Environment 中的配置完成路由发现，装配生命周期事件与中间件，启动 Axum 服务。

use axum::{middleware, Router};
use bizkit_core::{constants, ApplicationError, ApplicationResult, Environment};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::annotation::{AnnotationReader, InventoryAnnotationReader};
use crate::discovery::{AnnotationRouteDiscovery, DEFAULT_EXTENSION};
use crate::error::WebError;
use crate::event::WebEventDispatcher;
use crate::exception::{ErrorLogger, ExceptionSubscriber, TracingErrorLogger};
use crate::middleware::{request_logging, web_events};
use crate::response::ResponseSubscriber;
use crate::router::AnnotationRouter;

/// Web 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProperties {
    pub host: String,
    pub port: u16,
    pub enable_request_logging: bool,
}

impl Default for ServerProperties {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_request_logging: true,
        }
    }
}

impl ServerProperties {
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: env.get_string_or(constants::SERVER_HOST, &defaults.host),
            port: env.get_port_or(constants::SERVER_PORT, defaults.port)?,
            enable_request_logging: env.get_bool_or(
                constants::SERVER_ENABLE_REQUEST_LOGGING,
                defaults.enable_request_logging,
            ),
        })
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 路由发现配置
#[derive(Debug, Clone)]
pub struct RoutingProperties {
    /// 路由缓存目录，默认为系统临时目录
    pub cache_dir: PathBuf,
    pub extension: String,
    /// 配置文件中声明的控制器位置
    pub namespace: Option<String>,
    pub directory: Option<PathBuf>,
    pub debug: bool,
}

impl Default for RoutingProperties {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir(),
            extension: DEFAULT_EXTENSION.to_string(),
            namespace: None,
            directory: None,
            debug: false,
        }
    }
}

impl RoutingProperties {
    pub fn from_environment(env: &Environment) -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env
                .get_path(constants::ROUTING_CACHE_DIR)
                .unwrap_or(defaults.cache_dir),
            extension: env.get_string_or(constants::ROUTING_EXTENSION, &defaults.extension),
            namespace: env.get_string(constants::ROUTING_NAMESPACE),
            directory: env.get_path(constants::ROUTING_DIRECTORY),
            debug: env.get_bool_or(constants::APP_DEBUG, defaults.debug),
        }
    }

    /// 配置文件中声明的控制器位置，namespace 与 directory 需同时存在
    fn configured_mount(&self) -> ApplicationResult<Option<ControllerMount>> {
        match (&self.namespace, &self.directory) {
            (Some(namespace), Some(directory)) => Ok(Some(ControllerMount::new(namespace, directory))),
            (None, None) => Ok(None),
            _ => Err(ApplicationError::config(format!(
                "'{}' and '{}' must be configured together",
                constants::ROUTING_NAMESPACE,
                constants::ROUTING_DIRECTORY
            ))),
        }
    }
}

/// 一组控制器：模块路径 + 源文件目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerMount {
    pub namespace: String,
    pub directory: PathBuf,
}

impl ControllerMount {
    pub fn new(namespace: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            namespace: namespace.into(),
            directory: directory.into(),
        }
    }
}

/// 未匹配任何路由时的兜底处理
pub async fn not_found() -> WebError {
    WebError::not_found("")
}

/// Web 应用
///
/// ```ignore
/// let env = BizApplication::new("demo").run()?;
/// WebApplication::new(env)?
///     .mount("web_demo::controller", "src/controller")
///     .run()
///     .await?;
/// ```
pub struct WebApplication {
    server: ServerProperties,
    routing: RoutingProperties,
    mounts: Vec<ControllerMount>,
    reader: Option<Arc<dyn AnnotationReader>>,
    logger: Arc<dyn ErrorLogger>,
}

impl WebApplication {
    pub fn new(env: Arc<Environment>) -> ApplicationResult<Self> {
        Ok(Self {
            server: ServerProperties::from_environment(&env)?,
            routing: RoutingProperties::from_environment(&env),
            mounts: Vec::new(),
            reader: None,
            logger: Arc::new(TracingErrorLogger),
        })
    }

    pub fn with_properties(server: ServerProperties, routing: RoutingProperties) -> Self {
        Self {
            server,
            routing,
            mounts: Vec::new(),
            reader: None,
            logger: Arc::new(TracingErrorLogger),
        }
    }

    /// 添加一组控制器
    pub fn mount(mut self, namespace: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        self.mounts.push(ControllerMount::new(namespace, directory));
        self
    }

    /// 替换注解读取器，默认使用编译期注册的控制器
    pub fn reader(mut self, reader: Arc<dyn AnnotationReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn logger(mut self, logger: Arc<dyn ErrorLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn server_properties(&self) -> &ServerProperties {
        &self.server
    }

    pub fn routing_properties(&self) -> &RoutingProperties {
        &self.routing
    }

    /// 路由发现 + 事件派发 + 中间件，组装完整的 Router
    pub fn router(&self) -> ApplicationResult<Router> {
        let reader = self
            .reader
            .clone()
            .unwrap_or_else(|| Arc::new(InventoryAnnotationReader::new()));

        let mut discovery = AnnotationRouteDiscovery::new(
            AnnotationRouter::new(),
            reader,
            &self.routing.cache_dir,
            self.routing.debug,
        )?
        .with_extension(self.routing.extension.clone());

        let configured = self.routing.configured_mount()?;
        for mount in self.mounts.iter().chain(configured.iter()) {
            discovery.discover(&mount.namespace, &mount.directory)?;
        }

        let routes = discovery.into_router().build()?;

        let dispatcher = Arc::new(
            WebEventDispatcher::new()
                .with_subscriber(ExceptionSubscriber::new(self.routing.debug, self.logger.clone()))
                .with_subscriber(ResponseSubscriber::new()),
        );

        let mut app = routes
            .fallback(not_found)
            .layer(middleware::from_fn_with_state(dispatcher, web_events));

        if self.server.enable_request_logging {
            app = app.layer(middleware::from_fn(request_logging));
        }

        Ok(app.layer(TraceLayer::new_for_http()))
    }

    /// 启动服务器
    pub async fn run(self) -> ApplicationResult<()> {
        let app = self.router()?;
        let addr = self.server.address();

        tracing::info!("Starting web server on {}", addr);

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ApplicationError::Other(format!("Failed to bind to {}: {}", addr, e)))?;

        tracing::info!("Server listening on http://{}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| ApplicationError::Other(format!("Server error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizkit_core::MapPropertySource;

    fn env(source: MapPropertySource) -> Environment {
        Environment::new().with_source(source)
    }

    #[test]
    fn test_server_properties_defaults() {
        let props = ServerProperties::from_environment(&Environment::new()).unwrap();
        assert_eq!(props.address(), "0.0.0.0:8080");
        assert!(props.enable_request_logging);
    }

    #[test]
    fn test_server_properties_invalid_port() {
        let env = env(MapPropertySource::new("test").with_property(constants::SERVER_PORT, 70000i64));
        assert!(matches!(
            ServerProperties::from_environment(&env),
            Err(ApplicationError::Config(_))
        ));
    }

    #[test]
    fn test_routing_properties() {
        let env = env(
            MapPropertySource::new("test")
                .with_property(constants::APP_DEBUG, true)
                .with_property(constants::ROUTING_CACHE_DIR, "/var/cache/app")
                .with_property(constants::ROUTING_NAMESPACE, "app::controller")
                .with_property(constants::ROUTING_DIRECTORY, "src/controller"),
        );

        let props = RoutingProperties::from_environment(&env);
        assert!(props.debug);
        assert_eq!(props.cache_dir, PathBuf::from("/var/cache/app"));
        assert_eq!(props.extension, "rs");
        assert_eq!(
            props.configured_mount().unwrap(),
            Some(ControllerMount::new("app::controller", "src/controller"))
        );
    }

    #[test]
    fn test_routing_mount_requires_both_keys() {
        let env = env(MapPropertySource::new("test").with_property(constants::ROUTING_NAMESPACE, "app"));
        let props = RoutingProperties::from_environment(&env);
        assert!(props.configured_mount().is_err());
    }

    #[test]
    fn test_router_fails_on_missing_cache_dir() {
        let routing = RoutingProperties {
            cache_dir: PathBuf::from("/definitely/not/here"),
            ..RoutingProperties::default()
        };
        let app = WebApplication::with_properties(ServerProperties::default(), routing);
        assert!(matches!(app.router(), Err(ApplicationError::Config(_))));
    }
}
