// bizkit-core: Bizkit 的基础设施
//
// 提供 Web 集成层共用的基础能力：
// - 多配置源叠加的 Environment（TOML / 环境变量 / 内存）
// - 基于 tracing-subscriber 的日志初始化
// - 应用引导（配置文件、profile、日志）
// - 统一的启动期错误类型

pub mod app;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

pub use app::BizApplication;
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use error::{ApplicationError, ApplicationResult, Result};
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的类型
pub mod prelude {
    pub use crate::app::BizApplication;
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
        TomlPropertySource,
    };
    pub use crate::constants;
    pub use crate::error::{ApplicationError, ApplicationResult};
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    pub use anyhow::{anyhow, Context};
}
