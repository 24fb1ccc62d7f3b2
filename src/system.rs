//! 粒子系统
//!
//! 持有计算后端与发射器状态，负责每帧的调度顺序：
//! 写入发射器位置 → 组装 uniform → 调度内核 → 提交发射器上一帧值。

use crate::backend::{create_backend, SimulationBackend};
use crate::config::{AppearanceParams, ParticleFlowConfig, SimulationParams};
use crate::core::error::{ParticleError, ParticleResult};
use crate::render::projection::{self, RenderAttributes};
use crate::simulation::{frame_seed, EmitterState, FrameInput, GpuParticle, SimulationUniforms};
use glam::Vec3;
use std::time::Instant;

/// 粒子系统统计
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct ParticleSystemStats {
    /// 已完成的更新帧数
    pub frame_count: u64,
    /// 当前槽位数
    pub particle_count: u32,
    /// 最近一次调度耗时（ms）
    pub last_dispatch_ms: f32,
    /// 累计调度耗时（ms）
    pub total_dispatch_ms: f64,
}

/// 粒子系统
pub struct ParticleSystem {
    backend: Box<dyn SimulationBackend>,
    params: SimulationParams,
    appearance: AppearanceParams,
    emitter: EmitterState,
    stats: ParticleSystemStats,
    disposed: bool,
}

impl ParticleSystem {
    /// 按配置创建后端并初始化粒子池
    pub fn new(config: &ParticleFlowConfig) -> ParticleResult<Self> {
        config.validate()?;
        let backend = create_backend(&config.backend)?;
        Self::with_backend(backend, config.simulation.clone(), config.appearance.clone())
    }

    /// 使用已有后端创建
    pub fn with_backend(
        backend: Box<dyn SimulationBackend>,
        params: SimulationParams,
        appearance: AppearanceParams,
    ) -> ParticleResult<Self> {
        params.validate()?;
        appearance.validate()?;

        let mut system = Self {
            backend,
            params,
            appearance,
            emitter: EmitterState::default(),
            stats: ParticleSystemStats::default(),
            disposed: false,
        };
        system.reallocate(system.params.particle_count)?;
        Ok(system)
    }

    fn ensure_alive(&self) -> ParticleResult<()> {
        if self.disposed {
            Err(ParticleError::Disposed)
        } else {
            Ok(())
        }
    }

    /// 检查 → 释放 → 分配 → 初始化；初始化完成前不会有任何更新读取粒子池
    ///
    /// 槽位数在释放旧分配之前由后端检查。检查通过但分配仍失败时，
    /// 尝试按原槽位数恢复；恢复也失败则系统进入已释放状态。
    fn reallocate(&mut self, count: u32) -> ParticleResult<()> {
        self.backend.validate_count(count)?;

        let previous = self.backend.capacity();
        self.backend.release();

        if let Err(e) = self.allocate_pool(count) {
            tracing::error!(target: "particles", count, error = %e, "Particle pool allocation failed");
            if previous > 0 && self.allocate_pool(previous).is_ok() {
                tracing::warn!(target: "particles", count = previous, "Previous particle pool restored");
            } else {
                self.backend.release();
                self.disposed = true;
            }
            return Err(e);
        }

        self.params.particle_count = count;
        // 新粒子池没有历史，下一帧的发射器位置按瞬移处理
        self.emitter.unplace();
        Ok(())
    }

    fn allocate_pool(&mut self, count: u32) -> ParticleResult<()> {
        self.backend.allocate(count)?;

        let uniforms = SimulationUniforms::new(
            &self.params,
            &self.emitter,
            0.0,
            0.0,
            frame_seed(self.params.seed, 0),
            count,
        );
        self.backend.initialize(&uniforms)?;

        self.stats.particle_count = count;
        tracing::info!(
            target: "particles",
            count,
            backend = self.backend.label(),
            "Particle pool initialized"
        );
        Ok(())
    }

    /// 推进一帧
    ///
    /// 调度失败时发射器状态回滚，粒子池保持上一帧的内容。
    pub fn update(&mut self, input: FrameInput) -> ParticleResult<()> {
        self.ensure_alive()?;

        let previous_emitter = self.emitter;
        self.emitter.set_position(input.emitter_position, input.delta_time);

        let frame = self.stats.frame_count + 1;
        let uniforms = SimulationUniforms::new(
            &self.params,
            &self.emitter,
            input.delta_time,
            input.time,
            frame_seed(self.params.seed, frame),
            self.params.particle_count,
        );

        let start = Instant::now();
        if let Err(e) = self.backend.dispatch(&uniforms) {
            self.emitter = previous_emitter;
            return Err(e);
        }
        let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;

        // 调度完成后上一帧值才前进
        self.emitter.commit();

        self.stats.frame_count = frame;
        self.stats.last_dispatch_ms = elapsed_ms;
        self.stats.total_dispatch_ms += elapsed_ms as f64;

        tracing::trace!(target: "particles", frame, elapsed_ms, "Particle frame dispatched");
        Ok(())
    }

    /// 改变槽位数：完全重新分配并初始化，不迁移旧状态
    pub fn resize(&mut self, count: u32) -> ParticleResult<()> {
        self.ensure_alive()?;
        tracing::info!(
            target: "particles",
            from = self.params.particle_count,
            to = count,
            "Resizing particle pool"
        );
        self.reallocate(count)
    }

    /// 释放所有后端资源，可重复调用
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.backend.release();
            self.disposed = true;
            tracing::info!(target: "particles", "Particle system disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// 读取全部槽位
    pub fn particles(&self) -> ParticleResult<Vec<GpuParticle>> {
        self.ensure_alive()?;
        self.backend.read_particles()
    }

    /// 覆盖全部槽位
    pub fn write_particles(&mut self, particles: &[GpuParticle]) -> ParticleResult<()> {
        self.ensure_alive()?;
        self.backend.write_particles(particles)
    }

    /// 计算渲染属性
    pub fn project(&self) -> ParticleResult<Vec<RenderAttributes>> {
        let particles = self.particles()?;
        Ok(projection::project(&particles, &self.appearance, self.params.seed))
    }

    /// 更新模拟参数，槽位数变化时重新分配
    ///
    /// 失败时参数不变。
    pub fn set_params(&mut self, params: SimulationParams) -> ParticleResult<()> {
        self.ensure_alive()?;
        params.validate()?;
        if params.particle_count == self.params.particle_count {
            self.params = params;
            return Ok(());
        }

        // 初始化内核使用新种子；失败时参数与后端一起保持原状
        let previous = std::mem::replace(&mut self.params, params);
        if let Err(e) = self.reallocate(self.params.particle_count) {
            self.params = previous;
            return Err(e);
        }
        Ok(())
    }

    /// 更新外观参数
    pub fn set_appearance(&mut self, appearance: AppearanceParams) -> ParticleResult<()> {
        appearance.validate()?;
        self.appearance = appearance;
        Ok(())
    }

    /// 瞬移发射器（不沿路径插值）
    pub fn teleport_emitter(&mut self, position: Vec3) {
        self.emitter.teleport(position);
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn appearance(&self) -> &AppearanceParams {
        &self.appearance
    }

    pub fn emitter(&self) -> &EmitterState {
        &self.emitter
    }

    pub fn stats(&self) -> ParticleSystemStats {
        self.stats
    }

    pub fn backend_label(&self) -> &'static str {
        self.backend.label()
    }
}

impl Drop for ParticleSystem {
    fn drop(&mut self) {
        self.dispose();
    }
}
