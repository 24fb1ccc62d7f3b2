//! 单纯形梯度噪声（3D / 4D）
//!
//! 纯函数，无内部状态。格点哈希使用模 289 的多项式置换，
//! 因此任意大的坐标都不会溢出置换表。4D 版本在
//! `backend/shader_particles.wgsl` 中有逐步对应的 GPU 实现。

use glam::{Vec2, Vec3, Vec3Swizzles, Vec4, Vec4Swizzles};

/// 3D 输出归一化常数
const NORMALIZE_3D: f32 = 42.0;
/// 4D 输出归一化常数
const NORMALIZE_4D: f32 = 49.0;
/// 衰减半径平方
const FALLOFF: f32 = 0.6;

/// 4D 斜切常数 (sqrt(5) - 1) / 4
const F4: f32 = 0.309_017;

#[inline]
fn mod289_3(x: Vec3) -> Vec3 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289_4(x: Vec4) -> Vec4 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn mod289(x: f32) -> f32 {
    x - (x * (1.0 / 289.0)).floor() * 289.0
}

#[inline]
fn permute_4(x: Vec4) -> Vec4 {
    mod289_4((x * 34.0 + 1.0) * x)
}

#[inline]
fn permute(x: f32) -> f32 {
    mod289((x * 34.0 + 1.0) * x)
}

#[inline]
fn taylor_inv_sqrt_4(r: Vec4) -> Vec4 {
    Vec4::splat(1.792_842_9) - 0.853_734_7 * r
}

#[inline]
fn taylor_inv_sqrt(r: f32) -> f32 {
    1.792_842_9 - 0.853_734_7 * r
}

/// GLSL 风格的 step：`x >= edge` 时为 1
#[inline]
fn step_3(edge: Vec3, x: Vec3) -> Vec3 {
    Vec3::select(x.cmpge(edge), Vec3::ONE, Vec3::ZERO)
}

#[inline]
fn step_4(edge: Vec4, x: Vec4) -> Vec4 {
    Vec4::select(x.cmpge(edge), Vec4::ONE, Vec4::ZERO)
}

/// 3D 单纯形噪声，输出约在 [-1, 1]
pub fn simplex3(v: Vec3) -> f32 {
    const C: Vec2 = Vec2::new(1.0 / 6.0, 1.0 / 3.0);

    // 斜切到单纯形网格
    let mut i = (v + v.dot(Vec3::splat(C.y))).floor();
    let x0 = v - i + i.dot(Vec3::splat(C.x));

    // 所在单纯形的角点顺序
    let g = step_3(x0.yzx(), x0);
    let l = Vec3::ONE - g;
    let i1 = g.min(l.zxy());
    let i2 = g.max(l.zxy());

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - 0.5;

    i = mod289_3(i);
    let p = permute_4(
        permute_4(
            permute_4(i.z + Vec4::new(0.0, i1.z, i2.z, 1.0)) + i.y + Vec4::new(0.0, i1.y, i2.y, 1.0),
        ) + i.x
            + Vec4::new(0.0, i1.x, i2.x, 1.0),
    );

    // 7x7 梯度环：整数部分给出轴向符号
    let n_ = 1.0 / 7.0;
    let ns = Vec3::new(2.0 * n_, 0.5 * n_ - 1.0, n_);

    let j = p - 49.0 * (p * ns.z * ns.z).floor();
    let x_ = (j * ns.z).floor();
    let y_ = (j - 7.0 * x_).floor();

    let x = x_ * ns.x + ns.y;
    let y = y_ * ns.x + ns.y;
    let h = Vec4::ONE - x.abs() - y.abs();

    let b0 = Vec4::new(x.x, x.y, y.x, y.y);
    let b1 = Vec4::new(x.z, x.w, y.z, y.w);

    let s0 = b0.floor() * 2.0 + 1.0;
    let s1 = b1.floor() * 2.0 + 1.0;
    let sh = -step_4(h, Vec4::ZERO);

    let a0 = b0.xzyw() + s0.xzyw() * sh.xxyy();
    let a1 = b1.xzyw() + s1.xzyw() * sh.zzww();

    let mut p0 = Vec3::new(a0.x, a0.y, h.x);
    let mut p1 = Vec3::new(a0.z, a0.w, h.y);
    let mut p2 = Vec3::new(a1.x, a1.y, h.z);
    let mut p3 = Vec3::new(a1.z, a1.w, h.w);

    let norm = taylor_inv_sqrt_4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    let mut m = (Vec4::splat(FALLOFF) - Vec4::new(x0.dot(x0), x1.dot(x1), x2.dot(x2), x3.dot(x3)))
        .max(Vec4::ZERO);
    m = m * m;
    NORMALIZE_3D * (m * m).dot(Vec4::new(p0.dot(x0), p1.dot(x1), p2.dot(x2), p3.dot(x3)))
}

/// 4D 梯度：前三个分量来自哈希，第四个分量使三者绝对值和为 1.5，
/// 为负时翻转前三个分量的符号
#[inline]
fn grad4(j: f32, ip: Vec4) -> Vec4 {
    let scaled = Vec3::splat(j) * ip.xyz();
    let xyz = ((scaled - scaled.floor()) * 7.0).floor() * ip.z - 1.0;
    let w = 1.5 - xyz.abs().dot(Vec3::ONE);
    let p = xyz.extend(w);

    let s = Vec4::select(p.cmplt(Vec4::ZERO), Vec4::ONE, Vec4::ZERO);
    let flipped = p.xyz() + (s.xyz() * 2.0 - 1.0) * s.w;
    flipped.extend(w)
}

/// 4D 单纯形噪声，输出约在 [-1, 1]
pub fn simplex4(v: Vec4) -> f32 {
    const C: Vec4 = Vec4::new(
        0.138_196_6,  // (5 - sqrt(5)) / 20  G4
        0.276_393_2,  // 2 * G4
        0.414_589_8,  // 3 * G4
        -0.447_213_6, // -1 + 4 * G4
    );

    let mut i = (v + v.dot(Vec4::splat(F4))).floor();
    let x0 = v - i + i.dot(Vec4::splat(C.x));

    // 按坐标差的大小排序，累积每个轴的序号
    let is_x = step_3(x0.yzw(), x0.xxx());
    let is_yz = step_3(x0.zww(), x0.yyz());
    let mut i0 = Vec4::ZERO;
    i0.x = is_x.x + is_x.y + is_x.z;
    i0.y = 1.0 - is_x.x;
    i0.z = 1.0 - is_x.y;
    i0.w = 1.0 - is_x.z;
    i0.y += is_yz.x + is_yz.y;
    i0.z += 1.0 - is_yz.x;
    i0.w += 1.0 - is_yz.y;
    i0.z += is_yz.z;
    i0.w += 1.0 - is_yz.z;

    let i3 = i0.clamp(Vec4::ZERO, Vec4::ONE);
    let i2 = (i0 - 1.0).clamp(Vec4::ZERO, Vec4::ONE);
    let i1 = (i0 - 2.0).clamp(Vec4::ZERO, Vec4::ONE);

    let x1 = x0 - i1 + C.x;
    let x2 = x0 - i2 + C.y;
    let x3 = x0 - i3 + C.z;
    let x4 = x0 + C.w;

    i = mod289_4(i);
    let j0 = permute(permute(permute(permute(i.w) + i.z) + i.y) + i.x);
    let j1 = permute_4(
        permute_4(
            permute_4(
                permute_4(i.w + Vec4::new(i1.w, i2.w, i3.w, 1.0)) + i.z
                    + Vec4::new(i1.z, i2.z, i3.z, 1.0),
            ) + i.y
                + Vec4::new(i1.y, i2.y, i3.y, 1.0),
        ) + i.x
            + Vec4::new(i1.x, i2.x, i3.x, 1.0),
    );

    let ip = Vec4::new(1.0 / 294.0, 1.0 / 49.0, 1.0 / 7.0, 0.0);

    let mut p0 = grad4(j0, ip);
    let mut p1 = grad4(j1.x, ip);
    let mut p2 = grad4(j1.y, ip);
    let mut p3 = grad4(j1.z, ip);
    let mut p4 = grad4(j1.w, ip);

    let norm = taylor_inv_sqrt_4(Vec4::new(p0.dot(p0), p1.dot(p1), p2.dot(p2), p3.dot(p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;
    p4 *= taylor_inv_sqrt(p4.dot(p4));

    let mut m0 = (Vec3::splat(FALLOFF) - Vec3::new(x0.dot(x0), x1.dot(x1), x2.dot(x2))).max(Vec3::ZERO);
    let mut m1 = (Vec2::splat(FALLOFF) - Vec2::new(x3.dot(x3), x4.dot(x4))).max(Vec2::ZERO);
    m0 = m0 * m0;
    m1 = m1 * m1;

    NORMALIZE_4D
        * ((m0 * m0).dot(Vec3::new(p0.dot(x0), p1.dot(x1), p2.dot(x2)))
            + (m1 * m1).dot(Vec2::new(p3.dot(x3), p4.dot(x4))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_simplex3_deterministic() {
        let p = Vec3::new(1.3, -4.7, 0.25);
        assert_eq!(simplex3(p).to_bits(), simplex3(p).to_bits());
    }

    #[test]
    fn test_simplex4_deterministic() {
        let p = Vec4::new(0.1, 2.2, -3.3, 17.0);
        assert_eq!(simplex4(p).to_bits(), simplex4(p).to_bits());
    }

    #[test]
    fn test_simplex3_reference_values() {
        // 固定输入的基准输出，哈希或梯度环改动后这里会失败
        let cases = [
            (Vec3::new(0.3, 0.7, 1.1), -0.085_152_92),
            (Vec3::new(1.3, -4.7, 0.25), 0.697_957_5),
            (Vec3::new(-3.5, 2.25, 7.125), 0.316_192_3),
        ];
        for (p, expected) in cases {
            let n = simplex3(p);
            assert!((n - expected).abs() < 1e-5, "simplex3({}) = {}, expected {}", p, n, expected);
        }
    }

    #[test]
    fn test_simplex4_reference_values() {
        let cases = [
            (Vec4::new(0.3, 0.7, 1.1, 0.0), 0.066_038_99),
            (Vec4::new(0.1, 2.2, -3.3, 17.0), -0.456_237_6),
            (Vec4::new(-3.5, 2.25, 7.125, 1.75), -0.207_324_95),
        ];
        for (p, expected) in cases {
            let n = simplex4(p);
            assert!((n - expected).abs() < 1e-5, "simplex4({}) = {}, expected {}", p, n, expected);
        }
    }

    #[test]
    fn test_not_constant() {
        let a = simplex4(Vec4::new(0.3, 0.7, 1.1, 0.0));
        let b = simplex4(Vec4::new(5.3, -2.7, 8.1, 0.5));
        assert!((a - b).abs() > 1e-4);
    }

    #[test]
    fn test_continuity() {
        let p = Vec3::new(3.21, -1.5, 0.77);
        let d = simplex3(p) - simplex3(p + Vec3::splat(1e-3));
        assert!(d.abs() < 0.05);

        let q = Vec4::new(3.21, -1.5, 0.77, 9.0);
        let d = simplex4(q) - simplex4(q + Vec4::splat(1e-3));
        assert!(d.abs() < 0.05);
    }

    #[test]
    fn test_large_coordinates_are_finite() {
        assert!(simplex3(Vec3::splat(1.0e5)).is_finite());
        assert!(simplex4(Vec4::new(99_999.0, -99_999.0, 5.0e4, 1.0e4)).is_finite());
    }

    #[test]
    fn test_mean_near_zero() {
        let mut sum = 0.0;
        let n = 4096;
        for k in 0..n {
            let t = k as f32;
            sum += simplex4(Vec4::new(t * 0.37, t * 0.11, t * 0.73, t * 0.05));
        }
        assert!((sum / n as f32).abs() < 0.15);
    }

    proptest! {
        #[test]
        fn test_simplex3_bounded(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            z in -500.0f32..500.0,
        ) {
            let n = simplex3(Vec3::new(x, y, z));
            prop_assert!((-1.05..=1.05).contains(&n));
        }

        #[test]
        fn test_simplex4_bounded(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            z in -500.0f32..500.0,
            w in -500.0f32..500.0,
        ) {
            let n = simplex4(Vec4::new(x, y, z, w));
            prop_assert!((-1.05..=1.05).contains(&n));
        }
    }
}
