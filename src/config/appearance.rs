use super::{ConfigError, ConfigResult};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// 外观参数
///
/// 只被渲染反馈投影读取，不影响模拟状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppearanceParams {
    /// 生命起点颜色
    pub color_in: Vec3,
    /// 生命终点颜色
    pub color_out: Vec3,
    /// 基础尺寸
    pub size: f32,
    /// 实心核心占精灵半径的比例
    pub solid_ratio: f32,
    /// 实心核心透明度
    pub solid_alpha: f32,
    /// 光晕扩散
    pub glow_spread: f32,
    /// 淡入占生命的比例
    pub fade_in: f32,
    /// 淡出占生命的比例
    pub fade_out: f32,
    /// 整体不透明度
    pub opacity: f32,
    /// 闪烁时的透明度倍率
    pub sparkling_alpha: f32,
    /// 每个生命周期内的闪烁次数
    pub sparkling_frequency: f32,
    /// 闪烁窗口宽度（相位比例）
    pub sparkling_duration: f32,
}

impl_default!(AppearanceParams {
    color_in: hex_color(0xffa575),
    color_out: hex_color(0x0062ff),
    size: 0.05,
    solid_ratio: 0.05,
    solid_alpha: 5.0,
    glow_spread: 0.01,
    fade_in: 0.1,
    fade_out: 0.2,
    opacity: 0.5,
    sparkling_alpha: 4.0,
    sparkling_frequency: 1.0,
    sparkling_duration: 0.01,
});

impl AppearanceParams {
    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        for (name, value) in [("fade_in", self.fade_in), ("fade_out", self.fade_out)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        if self.size < 0.0 {
            return Err(ConfigError::ValidationError(
                "size must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// 将 0xRRGGBB 转换为 [0, 1] 颜色
pub const fn hex_color(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}
