use crate::config::{Environment, EnvironmentPropertySource, TomlPropertySource};
use crate::constants;
use crate::error::ApplicationResult;
use crate::logging::LoggingConfig;
use std::path::Path;
use std::sync::Arc;

/// Bizkit 应用引导
///
/// 负责加载配置、初始化日志，产出供各组件读取的 Environment
pub struct BizApplication {
    name: String,

    config_files: Vec<String>,

    env_prefix: String,

    profiles: Vec<String>,

    /// 未设置时按 Environment 中的 `logging.*` 推导
    logging_config: Option<LoggingConfig>,

    /// 测试环境下日志通常已由其他用例初始化
    init_logging: bool,
}

impl BizApplication {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config_files: vec![constants::DEFAULT_CONFIG_FILE.to_string()],
            env_prefix: constants::DEFAULT_ENV_PREFIX.to_string(),
            profiles: Vec::new(),
            logging_config: None,
            init_logging: true,
        }
    }

    pub fn config_file(mut self, path: impl Into<String>) -> Self {
        self.config_files = vec![path.into()];
        self
    }

    pub fn config_files(mut self, paths: Vec<String>) -> Self {
        self.config_files = paths;
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn profiles(mut self, profiles: Vec<String>) -> Self {
        self.profiles = profiles;
        self
    }

    pub fn logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = Some(config);
        self
    }

    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// 构建 Environment 并初始化日志
    pub fn run(self) -> ApplicationResult<Arc<Environment>> {
        let start_time = std::time::Instant::now();
        let environment = Environment::new();

        // 优先级：代码设置 > 环境变量 {prefix}PROFILES_ACTIVE
        let mut active_profiles = self.profiles.clone();
        if active_profiles.is_empty() {
            if let Ok(profiles_str) = std::env::var(format!("{}PROFILES_ACTIVE", self.env_prefix)) {
                active_profiles = profiles_str
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }

        let loaded = self.load_configurations(&environment, &active_profiles)?;

        environment.add_property_source(Box::new(EnvironmentPropertySource::new(&self.env_prefix)));
        environment.set_active_profiles(active_profiles.clone());

        if self.init_logging {
            let logging_config = self
                .logging_config
                .clone()
                .unwrap_or_else(|| LoggingConfig::from_environment(&environment));
            logging_config.init()?;
        }

        for file in &loaded {
            tracing::info!("Loaded configuration from: {}", file);
        }
        if active_profiles.is_empty() {
            tracing::info!("No active profiles set, using default configuration");
        } else {
            tracing::info!("Active profiles: {:?}", active_profiles);
        }

        tracing::info!(
            "Started {} in {}ms",
            self.name,
            start_time.elapsed().as_millis()
        );

        Ok(Arc::new(environment))
    }

    /// 加载顺序（优先级从低到高）：
    /// 1. application.toml
    /// 2. application-{profile}.toml
    fn load_configurations(
        &self,
        environment: &Environment,
        active_profiles: &[String],
    ) -> ApplicationResult<Vec<String>> {
        let mut loaded = Vec::new();

        for base_config in &self.config_files {
            if Self::try_load_config_file(environment, base_config, 0)? {
                loaded.push(base_config.clone());
            }
        }

        for (index, profile) in active_profiles.iter().enumerate() {
            for base_config in &self.config_files {
                let profile_config = Self::profile_config_path(base_config, profile);
                if Self::try_load_config_file(environment, &profile_config, 10 + index as i32)? {
                    loaded.push(profile_config);
                }
            }
        }

        Ok(loaded)
    }

    /// application.toml -> application-dev.toml
    fn profile_config_path(base_path: &str, profile: &str) -> String {
        if let Some(dot_pos) = base_path.rfind('.') {
            let (name, ext) = base_path.split_at(dot_pos);
            format!("{}-{}{}", name, profile, ext)
        } else {
            format!("{}-{}", base_path, profile)
        }
    }

    /// 文件不存在时跳过；存在但无法解析视为配置错误
    fn try_load_config_file(
        environment: &Environment,
        config_file: &str,
        priority: i32,
    ) -> ApplicationResult<bool> {
        if !Path::new(config_file).exists() {
            return Ok(false);
        }

        let source = TomlPropertySource::from_file(config_file)?.with_priority(priority);
        environment.add_property_source(Box::new(source));
        Ok(true)
    }
}

impl Default for BizApplication {
    fn default() -> Self {
        Self::new("BizApplication")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_profile_config_path() {
        assert_eq!(
            BizApplication::profile_config_path("application.toml", "dev"),
            "application-dev.toml"
        );
        assert_eq!(
            BizApplication::profile_config_path("conf/app", "prod"),
            "conf/app-prod"
        );
    }

    #[test]
    fn test_profile_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("application.toml");
        fs::write(&base, "[app]\ndebug = true\nname = \"base\"\n").unwrap();
        fs::write(
            dir.path().join("application-prod.toml"),
            "[app]\ndebug = false\n",
        )
        .unwrap();

        let env = BizApplication::new("test")
            .config_file(base.to_string_lossy().to_string())
            .env_prefix("BIZKIT_APP_TEST_")
            .profiles(vec!["prod".to_string()])
            .without_logging()
            .run()
            .unwrap();

        assert_eq!(env.get_bool(constants::APP_DEBUG), Some(false));
        assert_eq!(env.get_string(constants::APP_NAME).as_deref(), Some("base"));
        assert!(env.accepts_profiles("prod"));
    }

    #[test]
    fn test_missing_config_file_is_skipped() {
        let env = BizApplication::new("test")
            .config_file("/nonexistent/bizkit/application.toml")
            .env_prefix("BIZKIT_APP_TEST_MISSING_")
            .without_logging()
            .run()
            .unwrap();

        assert!(env.get(constants::APP_DEBUG).is_none());
    }

    #[test]
    fn test_broken_config_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("application.toml");
        fs::write(&base, "[app\n").unwrap();

        let result = BizApplication::new("test")
            .config_file(base.to_string_lossy().to_string())
            .without_logging()
            .run();

        assert!(result.is_err());
    }
}
