//! 计算后端
//!
//! 内核没有跨槽位读写，因此任何数量的并行工作者都可以执行它：
//!
//! - [`CpuBackend`]: rayon 线程池按槽位并行
//! - [`GpuBackend`]: wgpu 计算着色器，每槽位一个调用
//!
//! 两个后端都在 `dispatch` 返回前等待调度完成，`release` 可重复调用。

pub mod cpu;
pub mod gpu;

pub use cpu::CpuBackend;
pub use gpu::{GpuBackend, GpuContext};

use crate::config::{BackendConfig, BackendKind};
use crate::core::error::{ParticleError, ParticleResult};
use crate::simulation::{GpuParticle, SimulationUniforms};
use std::sync::Arc;

/// 模拟后端
pub trait SimulationBackend {
    /// 后端名称（日志用）
    fn label(&self) -> &'static str;

    /// 当前分配的槽位数，释放后为 0
    fn capacity(&self) -> u32;

    /// 可分配的最大槽位数
    fn max_capacity(&self) -> u32 {
        u32::MAX
    }

    /// 检查槽位数是否可分配，不触碰现有分配
    fn validate_count(&self, count: u32) -> ParticleResult<()> {
        if count == 0 {
            return Err(ParticleError::InvalidParticleCount(count));
        }
        let max = self.max_capacity();
        if count > max {
            return Err(ParticleError::CapacityExceeded { count, max });
        }
        Ok(())
    }

    /// 分配 `count` 个槽位
    ///
    /// 先调用 [`SimulationBackend::validate_count`]，检查通过后才释放已有分配。
    fn allocate(&mut self, count: u32) -> ParticleResult<()>;

    /// 运行初始化内核（哨兵位置 + 错开的生命）
    fn initialize(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()>;

    /// 运行一帧更新内核并等待完成
    fn dispatch(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()>;

    /// 读取全部槽位
    fn read_particles(&self) -> ParticleResult<Vec<GpuParticle>>;

    /// 覆盖全部槽位，长度必须等于容量
    fn write_particles(&mut self, particles: &[GpuParticle]) -> ParticleResult<()>;

    /// 释放缓冲区
    fn release(&mut self);
}

/// 按配置创建后端
///
/// GPU 后端会阻塞等待适配器和设备。
pub fn create_backend(config: &BackendConfig) -> ParticleResult<Box<dyn SimulationBackend>> {
    match config.kind {
        BackendKind::Cpu => Ok(Box::new(CpuBackend::new(config.worker_threads)?)),
        BackendKind::Gpu => {
            let context = Arc::new(GpuContext::new_headless_blocking()?);
            Ok(Box::new(GpuBackend::new(context, config.workgroup_size)?))
        }
    }
}
