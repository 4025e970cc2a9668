//! 控制器支持
//!
//! 控制器通过 `controller!` 宏在编译期登记自己所在的模块路径、类级注解与路由表，
//! 路由发现按模块路径找到它们。

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::annotation::AnnotationDef;
use crate::error::WebError;
use crate::response::json_response;

/// 控制器注册信息
pub struct ControllerRegistration {
    /// 控制器标识：注册所在模块的完整路径（`module_path!()`）
    pub class: &'static str,

    /// 控制器类型名称（用于日志）
    pub type_name: &'static str,

    /// 类级注解
    pub annotations: &'static [AnnotationDef],

    /// 路由表，路径相对于路由前缀
    pub routes: fn() -> Router,
}

inventory::collect!(ControllerRegistration);

/// 获取所有注册的控制器
pub fn get_all_controllers() -> impl Iterator<Item = &'static ControllerRegistration> {
    inventory::iter::<ControllerRegistration>()
}

/// 按控制器标识查找
pub fn find_controller(class: &str) -> Option<&'static ControllerRegistration> {
    get_all_controllers().find(|registration| registration.class == class)
}

/// 注册控制器
///
/// 在控制器所在的源文件中调用，模块路径即控制器标识：
///
/// ```ignore
/// pub struct UserController;
///
/// impl UserController {
///     fn routes() -> Router {
///         Router::new().route("/", get(list_users))
///     }
/// }
///
/// bizkit_web::controller!(UserController, routes = UserController::routes, RoutePrefix("/users"));
/// ```
#[macro_export]
macro_rules! controller {
    ($ty:ident, routes = $routes:expr $(, $name:ident ( $($arg:literal),* $(,)? ))* $(,)?) => {
        $crate::inventory::submit! {
            $crate::controller::ControllerRegistration {
                class: module_path!(),
                type_name: stringify!($ty),
                annotations: &[
                    $(
                        $crate::annotation::AnnotationDef {
                            name: stringify!($name),
                            arguments: &[$($arg),*],
                        }
                    ),*
                ],
                routes: $routes,
            }
        }
    };
}

/// 控制器的成功返回值
///
/// 必须是结构化的 JSON 值（对象或数组），由 VIEW 事件序列化为响应体；
/// 其他形状会被当作程序逻辑错误。
#[derive(Debug, Clone, PartialEq)]
pub struct View(Value);

impl View {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// 序列化任意结构体作为返回值
    pub fn json<T: Serialize>(value: &T) -> Result<Self, WebError> {
        serde_json::to_value(value)
            .map(Self)
            .map_err(|e| WebError::logic(format!("Failed to serialize controller result: {}", e)))
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for View {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// 响应的 Extension 中带上 View 本身，`web_events` 中间件据此派发 VIEW 事件
impl IntoResponse for View {
    fn into_response(self) -> Response {
        let mut response = json_response(StatusCode::OK, &self.0);
        response.extensions_mut().insert(self);
        response
    }
}

/// 控制器方法的返回类型
pub type ControllerResult = Result<View, WebError>;
