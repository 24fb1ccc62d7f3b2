//! GPU 粒子数据结构
//!
//! 布局与 `backend/shader_particles.wgsl` 中的结构体逐字节对应，CPU 与 GPU 后端共用。

use crate::config::SimulationParams;
use crate::simulation::emitter::EmitterState;
use glam::Vec3;

/// 初始化时的哨兵位置，远离可见区域且高于任何地面
pub const SENTINEL_POSITION: Vec3 = Vec3::splat(99_999.0);

/// 湍流采样前加到缩放位置上的常量偏移
pub const TURBULENCE_OFFSET: Vec3 = Vec3::new(12.34, 56.78, 90.12);

/// 粒子槽（对应 WGSL struct Particle）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuParticle {
    /// 位置
    pub position: [f32; 3],
    /// 归一化生命 [0, 1)
    pub life: f32,
    /// 速度
    pub velocity: [f32; 3],
    /// 填充
    pub _padding: f32,
}

impl Default for GpuParticle {
    fn default() -> Self {
        Self {
            position: SENTINEL_POSITION.to_array(),
            life: 0.0,
            velocity: [0.0; 3],
            _padding: 0.0,
        }
    }
}

impl GpuParticle {
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn velocity(&self) -> Vec3 {
        Vec3::from_array(self.velocity)
    }
}

/// 每帧输入
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInput {
    /// 帧间隔（秒）
    pub delta_time: f32,
    /// 单调递增的全局时间（秒）
    pub time: f32,
    /// 本帧发射器位置
    pub emitter_position: Vec3,
}

/// 模拟 Uniform（对应 WGSL struct SimulationUniforms）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SimulationUniforms {
    pub emitter_position: [f32; 3],
    pub emitter_radius: f32,
    pub emitter_previous_position: [f32; 3],
    pub emitter_velocity_strength: f32,
    pub emitter_velocity: [f32; 3],
    pub initial_random_velocity: f32,
    pub emitter_previous_velocity: [f32; 3],
    pub velocity_damping: f32,
    pub initial_velocity: [f32; 3],
    pub turbulence_strength: f32,
    pub gravity: [f32; 3],
    pub floor_y: f32,
    pub delta_time: f32,
    pub time: f32,
    pub decay_frequency: f32,
    pub floor_damping: f32,
    pub turbulence_position_frequency: f32,
    pub turbulence_time_frequency: f32,
    pub frame_seed: u32,
    pub particle_count: u32,
}

impl SimulationUniforms {
    /// 由配置、发射器和帧输入组装
    pub fn new(
        params: &SimulationParams,
        emitter: &EmitterState,
        delta_time: f32,
        time: f32,
        frame_seed: u32,
        particle_count: u32,
    ) -> Self {
        Self {
            emitter_position: emitter.position.to_array(),
            emitter_radius: params.emitter_radius,
            emitter_previous_position: emitter.previous_position.to_array(),
            emitter_velocity_strength: params.emitter_velocity_strength,
            emitter_velocity: emitter.velocity.to_array(),
            initial_random_velocity: params.initial_random_velocity,
            emitter_previous_velocity: emitter.previous_velocity.to_array(),
            velocity_damping: params.velocity_damping,
            initial_velocity: params.initial_velocity.to_array(),
            turbulence_strength: params.turbulence_strength,
            gravity: params.gravity.to_array(),
            floor_y: params.floor_y,
            delta_time,
            time,
            decay_frequency: params.decay_frequency,
            floor_damping: params.floor_damping,
            turbulence_position_frequency: params.turbulence_position_frequency,
            turbulence_time_frequency: params.turbulence_time_frequency,
            frame_seed,
            particle_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_wgsl() {
        // WGSL: vec3<f32> 对齐 16 字节，后随 f32 填满
        assert_eq!(std::mem::size_of::<GpuParticle>(), 32);
        assert_eq!(std::mem::size_of::<SimulationUniforms>(), 128);
        assert_eq!(std::mem::size_of::<SimulationUniforms>() % 16, 0);
    }

    #[test]
    fn test_uniforms_from_emitter() {
        let params = SimulationParams::default();
        let mut emitter = EmitterState::new(Vec3::ZERO);
        emitter.set_position(Vec3::new(0.0, 1.0, 0.0), 0.5);

        let uniforms = SimulationUniforms::new(&params, &emitter, 0.5, 10.0, 7, 4);
        assert_eq!(uniforms.emitter_position, [0.0, 1.0, 0.0]);
        assert_eq!(uniforms.emitter_previous_position, [0.0, 0.0, 0.0]);
        assert_eq!(uniforms.emitter_velocity, [0.0, 2.0, 0.0]);
        assert_eq!(uniforms.particle_count, 4);
    }
}
