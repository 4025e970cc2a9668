//! 注解读取能力
//!
//! 路由发现只依赖 `AnnotationReader`：能否解析出控制器、控制器上有哪些类级注解。
//! 注解既可以来自编译期注册（`controller!` 宏 + inventory），也可以来自运行时的静态配置。

use std::collections::HashMap;

use crate::controller::{get_all_controllers, ControllerRegistration};

/// 路由前缀注解名称
pub const ROUTE_PREFIX: &str = "RoutePrefix";

/// 编译期注解定义，由 `controller!` 宏生成
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnnotationDef {
    pub name: &'static str,
    pub arguments: &'static [&'static str],
}

/// 单个注解：名称 + 位置参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    name: String,
    arguments: Vec<String>,
}

impl Annotation {
    pub fn new<I, S>(name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 按位置读取参数
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(String::as_str)
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }
}

impl From<&AnnotationDef> for Annotation {
    fn from(def: &AnnotationDef) -> Self {
        Annotation::new(def.name, def.arguments.iter().copied())
    }
}

/// 类级注解集合，保持声明顺序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    items: Vec<Annotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.items.push(annotation);
    }

    pub fn has(&self, name: &str) -> bool {
        self.items.iter().any(|a| a.name == name)
    }

    /// 同名注解出现多次时返回第一个
    pub fn get(&self, name: &str) -> Option<&Annotation> {
        self.items.iter().find(|a| a.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.items.iter()
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<T: IntoIterator<Item = Annotation>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// 注解读取器
pub trait AnnotationReader: Send + Sync {
    /// 控制器是否存在（能否被加载）
    fn resolve(&self, class: &str) -> bool;

    /// 控制器的类级注解，无法解析或没有注解时返回空集合
    fn class_annotations(&self, class: &str) -> Annotations;

    fn has_annotation(&self, class: &str, name: &str) -> bool {
        self.class_annotations(class).has(name)
    }

    fn annotation_argument(&self, class: &str, name: &str, index: usize) -> Option<String> {
        self.class_annotations(class)
            .get(name)
            .and_then(|a| a.argument(index))
            .map(String::from)
    }
}

/// 基于编译期注册的读取器
///
/// 创建时对 inventory 中的全部控制器建立索引
pub struct InventoryAnnotationReader {
    controllers: HashMap<&'static str, &'static ControllerRegistration>,
}

impl InventoryAnnotationReader {
    pub fn new() -> Self {
        let controllers = get_all_controllers()
            .map(|registration| (registration.class, registration))
            .collect::<HashMap<_, _>>();

        tracing::debug!(
            "Indexed {} controller registration(s) for annotation lookup",
            controllers.len()
        );

        Self { controllers }
    }
}

impl Default for InventoryAnnotationReader {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationReader for InventoryAnnotationReader {
    fn resolve(&self, class: &str) -> bool {
        self.controllers.contains_key(class)
    }

    fn class_annotations(&self, class: &str) -> Annotations {
        self.controllers
            .get(class)
            .map(|registration| registration.annotations.iter().map(Annotation::from).collect())
            .unwrap_or_default()
    }
}

/// 基于运行时配置的读取器
#[derive(Debug, Clone, Default)]
pub struct StaticAnnotationReader {
    classes: HashMap<String, Annotations>,
}

impl StaticAnnotationReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// 声明一个控制器（可以没有任何注解）
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.entry(class.into()).or_default();
        self
    }

    pub fn with_annotation(mut self, class: impl Into<String>, annotation: Annotation) -> Self {
        self.classes.entry(class.into()).or_default().push(annotation);
        self
    }

    /// 便捷方法：声明带路由前缀的控制器
    pub fn with_route_prefix(self, class: impl Into<String>, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.with_annotation(class, Annotation::new(ROUTE_PREFIX, [prefix]))
    }
}

impl AnnotationReader for StaticAnnotationReader {
    fn resolve(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    fn class_annotations(&self, class: &str) -> Annotations {
        self.classes.get(class).cloned().unwrap_or_default()
    }
}
