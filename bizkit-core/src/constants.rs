//! 配置键常量
//!
//! 所有组件读取 Environment 时使用的键名集中在这里，避免硬编码

// ==================== 应用 ====================

/// 应用名称
pub const APP_NAME: &str = "app.name";

/// 调试模式：同时控制路由缓存旁路与错误详情暴露
pub const APP_DEBUG: &str = "app.debug";

// ==================== 路由发现 ====================

/// 路由缓存目录
pub const ROUTING_CACHE_DIR: &str = "routing.cache-dir";

/// 控制器源文件扩展名
pub const ROUTING_EXTENSION: &str = "routing.extension";

/// 控制器模块路径（命名空间）
pub const ROUTING_NAMESPACE: &str = "routing.namespace";

/// 控制器源文件目录
pub const ROUTING_DIRECTORY: &str = "routing.directory";

// ==================== Server ====================

/// 服务器监听地址
pub const SERVER_HOST: &str = "server.host";

/// 服务器监听端口
pub const SERVER_PORT: &str = "server.port";

/// 是否启用请求日志
pub const SERVER_ENABLE_REQUEST_LOGGING: &str = "server.enable-request-logging";

// ==================== 日志 ====================

pub const LOGGING_LEVEL: &str = "logging.level";

pub const LOGGING_FORMAT: &str = "logging.format";

/// 默认的环境变量前缀
pub const DEFAULT_ENV_PREFIX: &str = "APP_";

/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "application.toml";
