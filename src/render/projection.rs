//! 渲染反馈投影
//!
//! 由生命值和槽位哈希推导渲染属性（尺寸包络、闪烁、颜色、透明度）。
//! 只读模拟状态，结果不回流到内核。

use crate::config::AppearanceParams;
use crate::simulation::random::{hash01, SALT_SPARKLE};
use crate::simulation::GpuParticle;
use glam::Vec3;
use rayon::prelude::*;

/// 单个槽位的渲染属性
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderAttributes {
    /// 世界空间位置
    pub position: Vec3,
    /// 尺寸（已乘以基础尺寸）
    pub scale: f32,
    /// 颜色
    pub color: Vec3,
    /// 透明度
    pub alpha: f32,
    /// 是否处于闪烁窗口
    pub sparkle: bool,
}

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// `span` 内从 0 线性升到 1，`span` 为 0 时恒为 1
#[inline]
fn ramp(value: f32, span: f32) -> f32 {
    if span > 0.0 {
        (value / span).clamp(0.0, 1.0)
    } else {
        1.0
    }
}

/// 尺寸包络：淡入与淡出曲线取最小值后做 smoothstep
pub fn scale_envelope(life: f32, appearance: &AppearanceParams) -> f32 {
    let fade_in = ramp(life, appearance.fade_in);
    let fade_out = ramp(1.0 - life, appearance.fade_out);
    smoothstep(0.0, 1.0, fade_in.min(fade_out))
}

/// 闪烁标记：生命推导的相位落在按槽位随机偏移的窄窗口内
pub fn is_sparkling(index: u32, life: f32, sparkle_seed: u32, appearance: &AppearanceParams) -> bool {
    let phase = life * appearance.sparkling_frequency + hash01(index, sparkle_seed, SALT_SPARKLE);
    let phase = phase - phase.floor();
    phase < appearance.sparkling_duration
}

/// 投影单个槽位
pub fn project_slot(
    index: u32,
    particle: &GpuParticle,
    appearance: &AppearanceParams,
    sparkle_seed: u32,
) -> RenderAttributes {
    let life = particle.life;
    let sparkle = is_sparkling(index, life, sparkle_seed, appearance);
    let alpha = if sparkle {
        appearance.opacity * appearance.sparkling_alpha
    } else {
        appearance.opacity
    };

    RenderAttributes {
        position: particle.position(),
        scale: appearance.size * scale_envelope(life, appearance),
        color: appearance.color_in.lerp(appearance.color_out, life),
        alpha,
        sparkle,
    }
}

/// 并行投影整个粒子池
pub fn project(
    particles: &[GpuParticle],
    appearance: &AppearanceParams,
    sparkle_seed: u32,
) -> Vec<RenderAttributes> {
    particles
        .par_iter()
        .enumerate()
        .map(|(index, particle)| project_slot(index as u32, particle, appearance, sparkle_seed))
        .collect()
}

/// 精灵内部的透明度形状
///
/// `distance` 是片元到精灵中心的距离（精灵半径为 0.5）。
/// 实心核心内为 `solid_alpha`，外部为双曲光晕 `glow_spread / d - 2 * glow_spread`。
pub fn sprite_alpha(distance: f32, appearance: &AppearanceParams) -> f32 {
    if distance < appearance.solid_ratio {
        return appearance.solid_alpha;
    }
    let d = distance.max(1e-4);
    (appearance.glow_spread / d - 2.0 * appearance.glow_spread).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn particle(life: f32) -> GpuParticle {
        GpuParticle {
            position: [1.0, 2.0, 3.0],
            life,
            velocity: [0.0; 3],
            _padding: 0.0,
        }
    }

    #[test]
    fn test_scale_envelope() {
        let appearance = AppearanceParams::default();
        assert_eq!(scale_envelope(0.0, &appearance), 0.0);
        assert_eq!(scale_envelope(0.5, &appearance), 1.0);
        assert!(scale_envelope(0.999, &appearance) < 0.01);
        // 淡入中点
        let mid = scale_envelope(appearance.fade_in * 0.5, &appearance);
        assert!((mid - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_zero_fade_fractions() {
        let appearance = AppearanceParams {
            fade_in: 0.0,
            fade_out: 0.0,
            ..Default::default()
        };
        assert_eq!(scale_envelope(0.0, &appearance), 1.0);
        assert_eq!(scale_envelope(0.7, &appearance), 1.0);
    }

    #[test]
    fn test_color_gradient() {
        let appearance = AppearanceParams::default();
        let start = project_slot(0, &particle(0.0), &appearance, 1);
        assert_eq!(start.color, appearance.color_in);

        let half = project_slot(0, &particle(0.5), &appearance, 1);
        let expected = (appearance.color_in + appearance.color_out) * 0.5;
        assert!(half.color.abs_diff_eq(expected, 1e-6));
        assert_eq!(half.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_sparkle_window_fraction() {
        let appearance = AppearanceParams {
            sparkling_duration: 0.1,
            ..Default::default()
        };
        let n = 10_000;
        let sparkling = (0..n)
            .filter(|&i| is_sparkling(i, 0.3, 7, &appearance))
            .count();
        // 约 10% 的槽位处于窗口内
        assert!((800..1200).contains(&sparkling), "sparkling = {}", sparkling);
    }

    #[test]
    fn test_sparkle_boosts_alpha() {
        let appearance = AppearanceParams {
            sparkling_duration: 1.0,
            ..Default::default()
        };
        let attrs = project_slot(3, &particle(0.4), &appearance, 1);
        assert!(attrs.sparkle);
        assert_eq!(attrs.alpha, appearance.opacity * appearance.sparkling_alpha);
    }

    #[test]
    fn test_project_preserves_order() {
        let appearance = AppearanceParams::default();
        let particles: Vec<_> = (0..64).map(|i| particle(i as f32 / 64.0)).collect();
        let attrs = project(&particles, &appearance, 1);
        assert_eq!(attrs.len(), 64);
        for (i, a) in attrs.iter().enumerate() {
            assert_eq!(*a, project_slot(i as u32, &particles[i], &appearance, 1));
        }
    }

    #[test]
    fn test_sprite_alpha() {
        let appearance = AppearanceParams::default();
        assert_eq!(sprite_alpha(0.0, &appearance), appearance.solid_alpha);
        assert_eq!(sprite_alpha(0.5, &appearance), 0.0);
        let near = sprite_alpha(0.1, &appearance);
        let far = sprite_alpha(0.3, &appearance);
        assert!(near > far);
    }
}
