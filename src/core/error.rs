//! 统一错误处理模块
//!
//! 粒子系统几乎没有可恢复的错误面：内核数学对所有输入都是全函数。
//! 这里的错误只覆盖三类情况：
//!
//! - **配置误用**：粒子数量为 0、参数超出文档范围（在构造/配置时报告）
//! - **生命周期违规**：释放后继续使用粒子池（快速失败）
//! - **计算后端失败**：GPU 适配器不可用、提交被拒绝、回读失败

use crate::config::ConfigError;
use thiserror::Error;

/// 粒子系统错误类型
#[derive(Error, Debug)]
pub enum ParticleError {
    #[error("Invalid particle count: {0} (must be greater than zero)")]
    InvalidParticleCount(u32),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Particle count {count} exceeds backend capacity {max}")]
    CapacityExceeded { count: u32, max: u32 },

    #[error("Particle buffer allocation failed: {0}")]
    BufferAllocation(String),

    #[error("Particle pool used after dispose")]
    Disposed,

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("Failed to request adapter: no compatible GPU found")]
    NoAdapter,

    #[error("Failed to request device: {0}")]
    DeviceRequest(String),

    #[error("Compute dispatch rejected: {0}")]
    Dispatch(String),

    #[error("Particle buffer readback failed: {0}")]
    Readback(String),
}

/// 粒子系统结果类型
pub type ParticleResult<T> = Result<T, ParticleError>;
