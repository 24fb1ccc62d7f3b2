/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量和运行时动态调整
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub mod appearance;
pub mod backend;
pub mod simulation;

pub use appearance::{hex_color, AppearanceParams};
pub use backend::{BackendConfig, BackendKind};
pub use simulation::SimulationParams;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 粒子系统主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleFlowConfig {
    /// 模拟参数
    #[serde(default)]
    pub simulation: SimulationParams,

    /// 外观参数
    #[serde(default)]
    pub appearance: AppearanceParams,

    /// 计算后端
    #[serde(default)]
    pub backend: BackendConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ParticleFlowConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    ///
    /// 无法解析的值会被忽略并记录警告。
    pub fn apply_env_overrides(&mut self) {
        override_from_env("PARTICLE_FLOW_COUNT", &mut self.simulation.particle_count);
        override_from_env("PARTICLE_FLOW_SEED", &mut self.simulation.seed);
        override_from_env(
            "PARTICLE_FLOW_DECAY_FREQUENCY",
            &mut self.simulation.decay_frequency,
        );
        override_from_env(
            "PARTICLE_FLOW_TURBULENCE_STRENGTH",
            &mut self.simulation.turbulence_strength,
        );
        override_from_env("PARTICLE_FLOW_WORKER_THREADS", &mut self.backend.worker_threads);

        if let Ok(val) = env::var("PARTICLE_FLOW_BACKEND") {
            match val.to_ascii_lowercase().as_str() {
                "cpu" => self.backend.kind = BackendKind::Cpu,
                "gpu" => self.backend.kind = BackendKind::Gpu,
                other => {
                    tracing::warn!(target: "particles::config", "Unknown backend override: {}", other)
                }
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.simulation.validate()?;
        self.appearance.validate()?;
        self.backend.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particle_flow.toml
    /// 2. ./particle_flow.json
    /// 3. ~/.config/particle_flow/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        let home = env::var_os("HOME").map(PathBuf::from);
        Self::load_from_dirs(Path::new("."), home.as_deref())
    }

    /// 在工作目录和用户目录中按 [`ParticleFlowConfig::load_or_default`] 的顺序查找
    ///
    /// 文件存在但无法解析时记录警告并继续查找。
    pub fn load_from_dirs(working_dir: &Path, home_dir: Option<&Path>) -> Self {
        let mut candidates = vec![
            working_dir.join("particle_flow.toml"),
            working_dir.join("particle_flow.json"),
        ];
        if let Some(home) = home_dir {
            candidates.push(home.join(".config").join("particle_flow").join("config.toml"));
        }

        for path in candidates {
            let loaded = if path.extension().is_some_and(|ext| ext == "json") {
                Self::from_json_file(&path)
            } else {
                Self::from_toml_file(&path)
            };
            match loaded {
                Ok(config) => {
                    tracing::info!(target: "particles::config", "Loaded config from {:?}", path);
                    return config;
                }
                Err(ConfigError::FileError(_)) => {}
                Err(e) => {
                    tracing::warn!(target: "particles::config", "Skipping {:?}: {}", path, e);
                }
            }
        }

        tracing::info!(target: "particles::config", "Using default configuration");
        Self::default()
    }
}

fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    if let Ok(val) = env::var(key) {
        match val.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => {
                tracing::warn!(target: "particles::config", "Ignoring unparsable {}={}", key, val)
            }
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到文件
    pub log_to_file: bool,

    /// 日志文件路径
    pub log_file_path: String,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_file: false,
    log_file_path: "particle_flow.log".to_string(),
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParticleFlowConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = ParticleFlowConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ParticleFlowConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = ParticleFlowConfig::from_toml_str(
            r#"
            [simulation]
            particle_count = 4
            decay_frequency = 1.0
            gravity = [0.0, -9.81, 0.0]

            [appearance]
            opacity = 0.8
            "#,
        )
        .unwrap();

        assert_eq!(parsed.simulation.particle_count, 4);
        assert_eq!(parsed.simulation.gravity.y, -9.81);
        assert_eq!(parsed.simulation.floor_damping, 0.1);
        assert_eq!(parsed.appearance.opacity, 0.8);
        assert_eq!(parsed.appearance.fade_in, 0.1);
    }

    #[test]
    fn test_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("particles.json");

        let mut config = ParticleFlowConfig::default();
        config.simulation.emitter_radius = 0.25;
        config.backend.kind = BackendKind::Gpu;
        config.save_json(&path).unwrap();

        let loaded = ParticleFlowConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.simulation.emitter_radius, 0.25);
        assert_eq!(loaded.backend.kind, BackendKind::Gpu);
    }

    #[test]
    fn test_malformed_toml() {
        let result = ParticleFlowConfig::from_toml_str("[simulation\nparticle_count = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_from_dirs_search_order() {
        let work = tempfile::tempdir().unwrap();
        let home = tempfile::tempdir().unwrap();

        // 没有任何文件时使用默认配置
        let config = ParticleFlowConfig::load_from_dirs(work.path(), Some(home.path()));
        assert_eq!(config, ParticleFlowConfig::default());

        // 用户目录
        let user_dir = home.path().join(".config").join("particle_flow");
        fs::create_dir_all(&user_dir).unwrap();
        fs::write(user_dir.join("config.toml"), "[simulation]\nparticle_count = 3\n").unwrap();
        let config = ParticleFlowConfig::load_from_dirs(work.path(), Some(home.path()));
        assert_eq!(config.simulation.particle_count, 3);

        // 工作目录的 JSON 优先于用户目录
        let mut json = ParticleFlowConfig::default();
        json.simulation.particle_count = 2;
        json.save_json(work.path().join("particle_flow.json")).unwrap();
        let config = ParticleFlowConfig::load_from_dirs(work.path(), Some(home.path()));
        assert_eq!(config.simulation.particle_count, 2);

        // 工作目录的 TOML 优先于 JSON
        fs::write(
            work.path().join("particle_flow.toml"),
            "[simulation]\nparticle_count = 1\n",
        )
        .unwrap();
        let config = ParticleFlowConfig::load_from_dirs(work.path(), Some(home.path()));
        assert_eq!(config.simulation.particle_count, 1);
    }

    #[test]
    fn test_load_from_dirs_skips_malformed_file() {
        let work = tempfile::tempdir().unwrap();
        fs::write(work.path().join("particle_flow.toml"), "[simulation\n").unwrap();

        let mut json = ParticleFlowConfig::default();
        json.simulation.seed = 99;
        json.save_json(work.path().join("particle_flow.json")).unwrap();

        let config = ParticleFlowConfig::load_from_dirs(work.path(), None);
        assert_eq!(config.simulation.seed, 99);
    }

    // 环境变量是进程级状态，所有覆盖场景放在同一个测试里
    #[test]
    fn test_env_overrides() {
        let keys = [
            "PARTICLE_FLOW_COUNT",
            "PARTICLE_FLOW_SEED",
            "PARTICLE_FLOW_DECAY_FREQUENCY",
            "PARTICLE_FLOW_TURBULENCE_STRENGTH",
            "PARTICLE_FLOW_WORKER_THREADS",
            "PARTICLE_FLOW_BACKEND",
        ];

        env::set_var("PARTICLE_FLOW_COUNT", "1024");
        env::set_var("PARTICLE_FLOW_SEED", "7");
        env::set_var("PARTICLE_FLOW_DECAY_FREQUENCY", "2.5");
        env::set_var("PARTICLE_FLOW_TURBULENCE_STRENGTH", "0.2");
        env::set_var("PARTICLE_FLOW_WORKER_THREADS", "3");
        env::set_var("PARTICLE_FLOW_BACKEND", "GPU");

        let mut config = ParticleFlowConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.simulation.particle_count, 1024);
        assert_eq!(config.simulation.seed, 7);
        assert_eq!(config.simulation.decay_frequency, 2.5);
        assert_eq!(config.simulation.turbulence_strength, 0.2);
        assert_eq!(config.backend.worker_threads, 3);
        assert_eq!(config.backend.kind, BackendKind::Gpu);

        // 无法解析的值保留原值
        env::set_var("PARTICLE_FLOW_COUNT", "lots");
        env::set_var("PARTICLE_FLOW_DECAY_FREQUENCY", "fast");
        env::set_var("PARTICLE_FLOW_BACKEND", "vulkan");

        let mut config = ParticleFlowConfig::default();
        config.apply_env_overrides();
        let defaults = ParticleFlowConfig::default();
        assert_eq!(config.simulation.particle_count, defaults.simulation.particle_count);
        assert_eq!(config.simulation.decay_frequency, defaults.simulation.decay_frequency);
        assert_eq!(config.backend.kind, BackendKind::Cpu);
        assert_eq!(config.simulation.seed, 7);

        for key in keys {
            env::remove_var(key);
        }

        let mut config = ParticleFlowConfig::default();
        config.apply_env_overrides();
        assert_eq!(config, ParticleFlowConfig::default());
    }
}
