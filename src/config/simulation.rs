use super::{ConfigError, ConfigResult};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 模拟参数
///
/// 每帧只读的全局配置，由内核通过 uniform 读取。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// 粒子槽数量（池的生命周期内固定）
    pub particle_count: u32,

    /// 重生位置围绕发射器的半径
    pub emitter_radius: f32,

    /// 继承发射器速度的比例
    pub emitter_velocity_strength: f32,

    /// 重生时附加的固定速度
    pub initial_velocity: Vec3,

    /// 重生时随机方向速度的大小
    pub initial_random_velocity: f32,

    /// 每帧速度衰减比例
    pub velocity_damping: f32,

    /// 湍流强度
    pub turbulence_strength: f32,

    /// 湍流时间频率
    pub turbulence_time_frequency: f32,

    /// 湍流空间频率
    pub turbulence_position_frequency: f32,

    /// 老化速率（平均寿命的倒数）
    pub decay_frequency: f32,

    /// 重力加速度
    pub gravity: Vec3,

    /// 地面高度
    pub floor_y: f32,

    /// 地面反弹衰减
    pub floor_damping: f32,

    /// 随机种子，与帧序号组合成每帧种子
    pub seed: u32,
}

impl_default!(SimulationParams {
    particle_count: 65_536,
    emitter_radius: 0.1,
    emitter_velocity_strength: 0.4,
    initial_velocity: Vec3::new(0.0, 0.5, 0.0),
    initial_random_velocity: 0.5,
    velocity_damping: 0.01,
    turbulence_strength: 0.01,
    turbulence_time_frequency: 0.1,
    turbulence_position_frequency: 0.5,
    decay_frequency: 0.5,
    gravity: Vec3::new(0.0, -0.5, 0.0),
    floor_y: 0.0,
    floor_damping: 0.1,
    seed: 0x5EED,
});

impl SimulationParams {
    /// 验证配置
    ///
    /// 内核本身不做任何校验，这里是宿主侧的前置条件检查。
    pub fn validate(&self) -> ConfigResult<()> {
        if self.particle_count == 0 {
            return Err(ConfigError::ValidationError(
                "particle_count must be greater than zero".to_string(),
            ));
        }
        if !(self.decay_frequency > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "decay_frequency must be positive, got {}",
                self.decay_frequency
            )));
        }
        if self.emitter_radius < 0.0 {
            return Err(ConfigError::ValidationError(
                "emitter_radius must not be negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.velocity_damping) {
            return Err(ConfigError::ValidationError(
                "velocity_damping must be within [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.floor_damping) {
            return Err(ConfigError::ValidationError(
                "floor_damping must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn test_zero_decay_rejected() {
        let params = SimulationParams {
            decay_frequency: 0.0,
            ..Default::default()
        };
        assert!(params.validate().is_err());

        let params = SimulationParams {
            decay_frequency: f32::NAN,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_zero_count_rejected() {
        let params = SimulationParams {
            particle_count: 0,
            ..Default::default()
        };
        assert!(matches!(
            params.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
