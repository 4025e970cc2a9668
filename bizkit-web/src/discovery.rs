//! 基于注解的路由发现
//!
//! 在指定目录下搜寻控制器源文件，读取 `RoutePrefix` 注解，生成路由表并注册到路由中。
//! 非调试模式下路由表会缓存到磁盘，每个命名空间一个文件。
//!
//! ## 缓存文件格式
//!
//! ```text
//! {cache_dir}/{namespace 小写，:: 与 \ 替换为 _}__routes.json
//!
//! {"version": 1, "namespace": "app::controller", "routes": [{"class": "...", "routePrefix": "/users"}]}
//! ```
//!
//! 缓存没有过期时间，只有删除文件或切换到调试模式才会重新扫描。

use bizkit_core::{ApplicationError, ApplicationResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::annotation::{AnnotationReader, ROUTE_PREFIX};
use crate::router::ResourceRouter;

/// 缓存文件格式版本
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// 默认的控制器源文件扩展名
pub const DEFAULT_EXTENSION: &str = "rs";

const CACHE_FILE_SUFFIX: &str = "__routes.json";

/// 路由表条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub class: String,
    #[serde(rename = "routePrefix")]
    pub route_prefix: String,
}

/// 缓存文件内容
#[derive(Debug, Serialize, Deserialize)]
struct CachedRouteTable {
    version: u32,
    namespace: String,
    routes: Vec<RouteEntry>,
}

/// 路由发现器
pub struct AnnotationRouteDiscovery<R: ResourceRouter> {
    router: R,
    reader: Arc<dyn AnnotationReader>,
    cache_dir: PathBuf,
    extension: String,
    /// 调试模式下每次都重新扫描，不读写缓存
    debug: bool,
}

impl<R: ResourceRouter> AnnotationRouteDiscovery<R> {
    /// 缓存目录必须存在且可写，否则立即返回配置错误
    pub fn new(
        router: R,
        reader: Arc<dyn AnnotationReader>,
        cache_dir: impl AsRef<Path>,
        debug: bool,
    ) -> ApplicationResult<Self> {
        let cache_dir = trim_trailing_separators(cache_dir.as_ref());
        ensure_writable_dir(&cache_dir)?;

        Ok(Self {
            router,
            reader,
            cache_dir,
            extension: DEFAULT_EXTENSION.to_string(),
            debug,
        })
    }

    /// 设置控制器源文件扩展名（不含点）
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn router(&self) -> &R {
        &self.router
    }

    pub fn into_router(self) -> R {
        self.router
    }

    /// 在指定目录下搜寻控制器，查找路由，并添加到路由表中去
    ///
    /// * `namespace` - 控制器所在模块路径，例如 `app::controller`
    /// * `directory` - 控制器源文件目录
    pub fn discover(&mut self, namespace: &str, directory: impl AsRef<Path>) -> ApplicationResult<()> {
        let directory = directory.as_ref();
        let routes = if self.debug {
            self.scan_routes(namespace, directory)?
        } else {
            self.get_routes_from_cache(namespace, directory)?
        };

        tracing::info!(
            namespace,
            directory = %directory.display(),
            routes = routes.len(),
            debug = self.debug,
            "Route discovery completed"
        );

        for route in &routes {
            self.router.add_resource(&route.class, &route.route_prefix);
        }

        Ok(())
    }

    /// 缓存文件路径
    pub fn cache_path(&self, namespace: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}{}", normalize_namespace(namespace), CACHE_FILE_SUFFIX))
    }

    /// 从缓存中读取路由表，如不存在则扫描并生成缓存
    pub fn get_routes_from_cache(
        &self,
        namespace: &str,
        directory: impl AsRef<Path>,
    ) -> ApplicationResult<Vec<RouteEntry>> {
        let cache_path = self.cache_path(namespace);

        if cache_path.exists() {
            match load_cache(&cache_path) {
                Ok(Some(routes)) => {
                    tracing::debug!(path = %cache_path.display(), "Route table loaded from cache");
                    return Ok(routes);
                }
                Ok(None) => {
                    tracing::warn!(
                        path = %cache_path.display(),
                        "Route cache has an unsupported schema version, rebuilding"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %cache_path.display(),
                        error = %e,
                        "Route cache is unreadable, rebuilding"
                    );
                }
            }
        }

        let routes = self.scan_routes(namespace, directory)?;
        let table = CachedRouteTable {
            version: CACHE_SCHEMA_VERSION,
            namespace: namespace.to_string(),
            routes,
        };

        let content = serde_json::to_vec_pretty(&table)
            .map_err(|e| ApplicationError::config(format!("Failed to encode route cache: {}", e)))?;
        fs::write(&cache_path, content).map_err(|e| {
            ApplicationError::config(format!(
                "Cache directory can not be written: {}: {}",
                cache_path.display(),
                e
            ))
        })?;

        tracing::info!(path = %cache_path.display(), "Route cache written");

        Ok(table.routes)
    }

    /// 在目录下扫描所有控制器，以获取路由表
    ///
    /// 只扫描目录本身（不递归），按文件名升序；无法解析或没有 `RoutePrefix` 的控制器被忽略
    pub fn scan_routes(
        &self,
        namespace: &str,
        directory: impl AsRef<Path>,
    ) -> ApplicationResult<Vec<RouteEntry>> {
        let mut routes = Vec::new();

        for stem in self.list_source_files(directory.as_ref())? {
            let class = class_name(namespace, &stem);

            if !self.reader.resolve(&class) {
                tracing::trace!(class = %class, "Skipping unresolvable controller");
                continue;
            }

            let annotations = self.reader.class_annotations(&class);
            if annotations.is_empty() {
                continue;
            }

            let Some(annotation) = annotations.get(ROUTE_PREFIX) else {
                continue;
            };

            routes.push(RouteEntry {
                class,
                route_prefix: annotation.argument(0).unwrap_or_default().to_string(),
            });
        }

        Ok(routes)
    }

    /// 列出目录下匹配扩展名的文件，返回按文件名排序后的文件名主干
    fn list_source_files(&self, directory: &Path) -> ApplicationResult<Vec<String>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(directory)? {
            let entry = entry?;
            let path = entry.path();

            if !entry.file_type()?.is_file() {
                continue;
            }

            let matches_extension = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext == self.extension);
            if !matches_extension {
                continue;
            }

            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                files.push(file_name.to_string());
            }
        }

        files.sort();

        Ok(files
            .into_iter()
            .filter_map(|name| {
                Path::new(&name)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .map(String::from)
            })
            .collect())
    }
}

/// 命名空间 + 文件名主干 -> 控制器标识
fn class_name(namespace: &str, stem: &str) -> String {
    let namespace = namespace.trim_end_matches(':');
    if namespace.is_empty() {
        stem.to_string()
    } else {
        format!("{}::{}", namespace, stem)
    }
}

/// 小写并把 `::` 与 `\` 替换为 `_`
pub fn normalize_namespace(namespace: &str) -> String {
    namespace.to_lowercase().replace("::", "_").replace('\\', "_")
}

/// 版本不匹配时返回 None
fn load_cache(path: &Path) -> anyhow::Result<Option<Vec<RouteEntry>>> {
    let content = fs::read(path)?;
    let table: CachedRouteTable = serde_json::from_slice(&content)?;

    if table.version != CACHE_SCHEMA_VERSION {
        return Ok(None);
    }

    Ok(Some(table.routes))
}

fn trim_trailing_separators(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() {
        path.to_path_buf()
    } else {
        PathBuf::from(trimmed)
    }
}

/// 写入并删除一个临时文件来确认目录可写
fn ensure_writable_dir(dir: &Path) -> ApplicationResult<()> {
    let not_usable = || {
        ApplicationError::config(format!(
            "Cache directory {} is not exist or not writeable.",
            dir.display()
        ))
    };

    if !dir.is_dir() {
        return Err(not_usable());
    }

    let canary = dir.join(format!(".bizkit-write-check-{}", std::process::id()));
    fs::write(&canary, b"").map_err(|_| not_usable())?;
    if let Err(e) = fs::remove_file(&canary) {
        tracing::warn!(path = %canary.display(), error = %e, "Failed to remove cache directory write-check file");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Annotation, StaticAnnotationReader};
    use crate::router::{AnnotationRouter, RouteResource};

    const NS: &str = "app::controller";

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), "// controller\n").unwrap();
    }

    fn reader() -> Arc<dyn AnnotationReader> {
        Arc::new(
            StaticAnnotationReader::new()
                .with_route_prefix("app::controller::user_controller", "/users")
                .with_route_prefix("app::controller::order_controller", "/orders")
                .with_class("app::controller::plain_controller")
                .with_annotation(
                    "app::controller::audit_controller",
                    Annotation::new("Deprecated", ["since 1.2"]),
                ),
        )
    }

    fn discovery(cache_dir: &Path, debug: bool) -> AnnotationRouteDiscovery<AnnotationRouter> {
        AnnotationRouteDiscovery::new(AnnotationRouter::new(), reader(), cache_dir, debug).unwrap()
    }

    #[test]
    fn test_new_rejects_missing_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let result =
            AnnotationRouteDiscovery::new(AnnotationRouter::new(), reader(), &missing, true);
        assert!(matches!(result, Err(ApplicationError::Config(_))));
    }

    #[test]
    fn test_new_rejects_file_as_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "not_a_dir");

        let result = AnnotationRouteDiscovery::new(
            AnnotationRouter::new(),
            reader(),
            dir.path().join("not_a_dir"),
            true,
        );
        assert!(matches!(result, Err(ApplicationError::Config(_))));
    }

    #[test]
    fn test_new_leaves_cache_dir_empty() {
        let dir = tempfile::tempdir().unwrap();
        discovery(dir.path(), false);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_new_trims_trailing_separator() {
        let dir = tempfile::tempdir().unwrap();
        let with_slash = format!("{}/", dir.path().display());

        let discovery =
            AnnotationRouteDiscovery::new(AnnotationRouter::new(), reader(), &with_slash, true)
                .unwrap();
        assert_eq!(discovery.cache_dir(), dir.path());
    }

    #[test]
    fn test_scan_routes_sorted_and_filtered() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        for name in [
            "user_controller.rs",
            "order_controller.rs",
            "plain_controller.rs",
            "audit_controller.rs",
            "ghost_controller.rs",
            "mod.rs",
            "README.md",
        ] {
            touch(controllers.path(), name);
        }
        fs::create_dir(controllers.path().join("nested")).unwrap();
        touch(&controllers.path().join("nested"), "user_controller.rs");

        let routes = discovery(cache.path(), true)
            .scan_routes(NS, controllers.path())
            .unwrap();

        assert_eq!(
            routes,
            vec![
                RouteEntry {
                    class: "app::controller::order_controller".to_string(),
                    route_prefix: "/orders".to_string(),
                },
                RouteEntry {
                    class: "app::controller::user_controller".to_string(),
                    route_prefix: "/users".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_scan_routes_ignores_other_extensions() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.php");
        touch(controllers.path(), "order_controller.txt");

        let mut discovery = discovery(cache.path(), true);
        assert!(discovery.scan_routes(NS, controllers.path()).unwrap().is_empty());

        discovery.discover(NS, controllers.path()).unwrap();
        assert!(discovery.router().resources().is_empty());
    }

    #[test]
    fn test_custom_extension() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.php");

        let routes = discovery(cache.path(), true)
            .with_extension(".php")
            .scan_routes(NS, controllers.path())
            .unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].route_prefix, "/users");
    }

    #[test]
    fn test_scan_missing_directory_is_io_error() {
        let cache = tempfile::tempdir().unwrap();
        let result = discovery(cache.path(), true).scan_routes(NS, cache.path().join("nope"));
        assert!(matches!(result, Err(ApplicationError::Io(_))));
    }

    #[test]
    fn test_discover_debug_registers_without_cache() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");

        let mut discovery = discovery(cache.path(), true);
        discovery.discover(NS, controllers.path()).unwrap();

        assert_eq!(
            discovery.router().resources(),
            &[RouteResource {
                class: "app::controller::user_controller".to_string(),
                prefix: "/users".to_string(),
            }]
        );
        assert!(!discovery.cache_path(NS).exists());
    }

    #[test]
    fn test_cache_path_normalization() {
        let cache = tempfile::tempdir().unwrap();
        let discovery = discovery(cache.path(), false);

        assert_eq!(
            discovery.cache_path("App::Controller"),
            cache.path().join("app_controller__routes.json")
        );
        assert_eq!(
            discovery.cache_path("Biz\\Controller"),
            cache.path().join("biz_controller__routes.json")
        );
    }

    #[test]
    fn test_cache_is_written_once_and_reused() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");

        let discovery = discovery(cache.path(), false);
        let first = discovery.get_routes_from_cache(NS, controllers.path()).unwrap();
        assert!(discovery.cache_path(NS).exists());

        // 缓存生成后目录的变化不再生效
        touch(controllers.path(), "order_controller.rs");
        let second = discovery.get_routes_from_cache(NS, controllers.path()).unwrap();

        assert_eq!(first, second);
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_cache_file_format() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");

        let discovery = discovery(cache.path(), false);
        discovery.get_routes_from_cache(NS, controllers.path()).unwrap();

        let content = fs::read_to_string(discovery.cache_path(NS)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "version": CACHE_SCHEMA_VERSION,
                "namespace": NS,
                "routes": [{"class": "app::controller::user_controller", "routePrefix": "/users"}],
            })
        );
    }

    #[test]
    fn test_cache_is_trusted_verbatim() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();

        let discovery = discovery(cache.path(), false);
        fs::write(
            discovery.cache_path(NS),
            r#"{"version":1,"namespace":"app::controller","routes":[{"class":"app::controller::legacy","routePrefix":"/legacy"}]}"#,
        )
        .unwrap();

        let routes = discovery.get_routes_from_cache(NS, controllers.path()).unwrap();
        assert_eq!(routes[0].class, "app::controller::legacy");
    }

    #[test]
    fn test_cache_with_foreign_version_is_rebuilt() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "order_controller.rs");

        let discovery = discovery(cache.path(), false);
        fs::write(
            discovery.cache_path(NS),
            r#"{"version":99,"namespace":"app::controller","routes":[]}"#,
        )
        .unwrap();

        let routes = discovery.get_routes_from_cache(NS, controllers.path()).unwrap();
        assert_eq!(routes.len(), 1);

        let content = fs::read_to_string(discovery.cache_path(NS)).unwrap();
        assert!(content.contains("\"version\": 1"));
    }

    #[test]
    fn test_unwritable_cache_file_is_config_error() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");

        let discovery = discovery(cache.path(), false);
        // 缓存路径被目录占用：读取失败后重新扫描，写入同样失败
        fs::create_dir(discovery.cache_path(NS)).unwrap();

        let result = discovery.get_routes_from_cache(NS, controllers.path());
        assert!(matches!(result, Err(ApplicationError::Config(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_new_rejects_read_only_cache_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let read_only = dir.path().join("read_only");
        fs::create_dir(&read_only).unwrap();
        fs::set_permissions(&read_only, fs::Permissions::from_mode(0o555)).unwrap();

        // root 不受目录权限限制
        let canary = read_only.join("canary");
        if fs::write(&canary, b"").is_ok() {
            fs::remove_file(&canary).unwrap();
            return;
        }

        let result =
            AnnotationRouteDiscovery::new(AnnotationRouter::new(), reader(), &read_only, true);
        fs::set_permissions(&read_only, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(matches!(result, Err(ApplicationError::Config(_))));
    }

    #[test]
    fn test_corrupt_cache_is_rebuilt() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");

        let discovery = discovery(cache.path(), false);
        fs::write(discovery.cache_path(NS), "<?php return array();").unwrap();

        let routes = discovery.get_routes_from_cache(NS, controllers.path()).unwrap();
        assert_eq!(routes.len(), 1);
    }

    #[test]
    fn test_discover_uses_cache_outside_debug() {
        let controllers = tempfile::tempdir().unwrap();
        let cache = tempfile::tempdir().unwrap();
        touch(controllers.path(), "user_controller.rs");
        touch(controllers.path(), "order_controller.rs");

        let mut discovery = discovery(cache.path(), false);
        discovery.discover(NS, controllers.path()).unwrap();

        let prefixes: Vec<_> = discovery
            .router()
            .resources()
            .iter()
            .map(|r| r.prefix.as_str())
            .collect();
        assert_eq!(prefixes, vec!["/orders", "/users"]);
        assert!(discovery.cache_path(NS).exists());
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("app::controller", "user"), "app::controller::user");
        assert_eq!(class_name("app::controller::", "user"), "app::controller::user");
        assert_eq!(class_name("", "user"), "user");
    }
}
