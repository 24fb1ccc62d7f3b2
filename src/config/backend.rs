use super::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 计算后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// CPU 线程池
    Cpu,
    /// wgpu 计算着色器
    Gpu,
}

/// 计算后端配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// 后端类型
    pub kind: BackendKind,

    /// CPU 工作线程数
    pub worker_threads: usize,

    /// GPU 工作组大小（编译着色器时注入，受默认设备限制最大 256）
    pub workgroup_size: u32,
}

impl_default!(BackendConfig {
    kind: BackendKind::Cpu,
    worker_threads: num_cpus::get(),
    workgroup_size: 256,
});

impl BackendConfig {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if self.worker_threads == 0 {
            return Err(ConfigError::ValidationError(
                "worker_threads must be greater than zero".to_string(),
            ));
        }
        if self.workgroup_size == 0 || self.workgroup_size > 256 {
            return Err(ConfigError::ValidationError(format!(
                "workgroup_size must be within [1, 256], got {}",
                self.workgroup_size
            )));
        }
        Ok(())
    }
}
