//! 控制器目录
//!
//! 路由发现扫描本目录下的 `*.rs`，按文件名得到 `web_demo::controller::{文件名}`，
//! 只有带 `RoutePrefix` 的控制器会被挂载（`mod.rs` 本身无法解析，被忽略）。

pub mod health_controller;
pub mod user_controller;

/// 控制器所在的模块路径
pub const NAMESPACE: &str = module_path!();

/// 控制器源文件目录
pub const DIRECTORY: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/src/controller");
