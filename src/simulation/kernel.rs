//! 粒子生命周期内核
//!
//! 每次调用只读取 uniform 与自身槽位，只写自身槽位，
//! 因此可以在任意数量的工作线程上并行执行。
//! `backend/shader_particles.wgsl` 的 `update_main` / `init_main` 是同一算法的 GPU 版本。

use super::particle::{GpuParticle, SimulationUniforms, SENTINEL_POSITION, TURBULENCE_OFFSET};
use super::random::{
    hash01, SALT_DIRECTION_X, SALT_DIRECTION_Y, SALT_DIRECTION_Z, SALT_INITIAL_LIFE, SALT_PATH_MIX,
};
use crate::noise::curl4;
use glam::Vec3;

/// 初始化槽位：哨兵位置 + 按索引错开的初始生命
pub fn initialize_slot(index: u32, seed: u32) -> GpuParticle {
    GpuParticle {
        position: SENTINEL_POSITION.to_array(),
        life: hash01(index, seed, SALT_INITIAL_LIFE),
        velocity: [0.0; 3],
        _padding: 0.0,
    }
}

/// 重生采样结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Respawn {
    pub position: Vec3,
    pub velocity: Vec3,
    /// 沿发射器路径的插值权重
    pub mix: f32,
}

/// 在发射器上一帧到本帧的路径上采样重生位置与速度
pub fn respawn(index: u32, u: &SimulationUniforms) -> Respawn {
    let seed = u.frame_seed;
    let direction = Vec3::new(
        hash01(index, seed, SALT_DIRECTION_X) - 0.5,
        hash01(index, seed, SALT_DIRECTION_Y) - 0.5,
        hash01(index, seed, SALT_DIRECTION_Z) - 0.5,
    )
    .normalize_or_zero();
    let mix = hash01(index, seed, SALT_PATH_MIX);

    let emitter_position = Vec3::from_array(u.emitter_position);
    let emitter_previous_position = Vec3::from_array(u.emitter_previous_position);
    let emitter_velocity = Vec3::from_array(u.emitter_velocity);
    let emitter_previous_velocity = Vec3::from_array(u.emitter_previous_velocity);

    let position =
        emitter_position.lerp(emitter_previous_position, mix) + direction * u.emitter_radius;
    let velocity = emitter_velocity.lerp(emitter_previous_velocity, mix)
        * u.emitter_velocity_strength
        + direction * u.initial_random_velocity
        + Vec3::from_array(u.initial_velocity);

    Respawn {
        position,
        velocity,
        mix,
    }
}

/// 湍流加速度
#[inline]
pub fn turbulence(position: Vec3, u: &SimulationUniforms) -> Vec3 {
    let p = position * u.turbulence_position_frequency + TURBULENCE_OFFSET;
    curl4(p, u.time * u.turbulence_time_frequency) * u.turbulence_strength
}

/// 单个槽位的一帧更新
pub fn update_slot(index: u32, particle: &mut GpuParticle, u: &SimulationUniforms) {
    let mut position = particle.position();
    let mut velocity = particle.velocity();

    velocity += turbulence(position, u);
    velocity += Vec3::from_array(u.gravity) * u.delta_time;
    velocity *= 1.0 - u.velocity_damping;

    position += velocity * u.delta_time;

    // 地面碰撞
    if position.y < u.floor_y {
        position.y = u.floor_y;
        velocity.y *= -(1.0 - u.floor_damping);
    }

    let new_life = particle.life + u.delta_time * u.decay_frequency;
    if new_life > 1.0 {
        let spawn = respawn(index, u);
        // 贴近地面的发射器可能把抖动后的位置放到地面以下
        position = Vec3::new(spawn.position.x, spawn.position.y.max(u.floor_y), spawn.position.z);
        velocity = spawn.velocity;
    }

    particle.position = position.to_array();
    particle.velocity = velocity.to_array();
    // 重生帧同样取模，大步长时新粒子的生命可能不从 0 开始
    particle.life = wrap_life(new_life);
}

/// 取小数部分，结果总在 [0, 1)
#[inline]
fn wrap_life(life: f32) -> f32 {
    let wrapped = life - life.floor();
    // 浮点舍入可能让极小负数的小数部分等于 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
