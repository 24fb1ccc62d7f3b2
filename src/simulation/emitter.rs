//! 发射器状态
//!
//! 当前/上一帧成对保存。顺序约定：
//!
//! 1. [`EmitterState::set_position`] 写入本帧位置并推导速度
//! 2. 内核读取当前值与上一帧值，在两者之间插值重生位置
//! 3. 内核完成后调用 [`EmitterState::commit`]，上一帧值才前进到本帧
//!
//! 上一帧值在内核运行期间保持“落后一帧”是有意的。
//!
//! 默认构造的发射器没有已知位置：第一次 `set_position` 按瞬移处理，
//! 不会从原点推导出速度。

use glam::Vec3;

/// 发射器状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmitterState {
    /// 本帧位置
    pub position: Vec3,
    /// 上一帧位置
    pub previous_position: Vec3,
    /// 本帧速度
    pub velocity: Vec3,
    /// 上一帧速度
    pub previous_velocity: Vec3,
    /// 是否已有可用于推导速度的上一帧位置
    placed: bool,
}

impl Default for EmitterState {
    fn default() -> Self {
        Self {
            placed: false,
            ..Self::new(Vec3::ZERO)
        }
    }
}

impl EmitterState {
    /// 在给定位置创建静止的发射器
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            previous_position: position,
            velocity: Vec3::ZERO,
            previous_velocity: Vec3::ZERO,
            placed: true,
        }
    }

    /// 上一帧位置是否有效
    pub fn is_placed(&self) -> bool {
        self.placed
    }

    /// 丢弃位置历史，下一次 `set_position` 按瞬移处理
    pub fn unplace(&mut self) {
        self.placed = false;
    }

    /// 写入本帧位置，速度由与上一帧的位移推导
    ///
    /// `delta_time` 非正时保留原速度；尚无位置历史时等同于 [`EmitterState::teleport`]。
    pub fn set_position(&mut self, position: Vec3, delta_time: f32) {
        if !self.placed {
            self.teleport(position);
            return;
        }
        self.position = position;
        if delta_time > 0.0 {
            self.velocity = (position - self.previous_position) / delta_time;
        } else {
            tracing::warn!(
                target: "particles",
                delta_time,
                "Non-positive delta time, keeping previous emitter velocity"
            );
        }
    }

    /// 内核完成后推进上一帧值
    pub fn commit(&mut self) {
        self.previous_position = self.position;
        self.previous_velocity = self.velocity;
    }

    /// 瞬移到新位置，不产生速度，也不沿路径插值
    pub fn teleport(&mut self, position: Vec3) {
        *self = Self::new(position);
    }
}
