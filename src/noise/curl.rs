//! 旋度噪声场
//!
//! 用两个去相关的噪声梯度做叉积，得到近似无散度的单位向量场。
//! 比对向量势求解析旋度便宜得多，只需要标量噪声。

use super::simplex::{simplex3, simplex4};
use glam::Vec3;

/// 有限差分步长
pub const CURL_EPSILON: f32 = 1e-4;

/// 第二个梯度的采样偏移，避开噪声在原点附近的奇点并与第一个梯度去相关
pub const CURL_DECORRELATION_OFFSET: Vec3 = Vec3::new(31.416, -47.853, 12.679);

/// 叉积长度低于此值时视为退化（两个梯度近乎平行）
pub const DEGENERATE_THRESHOLD: f32 = 1e-6;

/// 中心差分梯度（未归一化）
fn gradient<F: Fn(Vec3) -> f32>(noise: &F, p: Vec3) -> Vec3 {
    let dx = Vec3::new(CURL_EPSILON, 0.0, 0.0);
    let dy = Vec3::new(0.0, CURL_EPSILON, 0.0);
    let dz = Vec3::new(0.0, 0.0, CURL_EPSILON);

    let x = noise(p + dx) - noise(p - dx);
    let y = noise(p + dy) - noise(p - dy);
    let z = noise(p + dz) - noise(p - dz);

    Vec3::new(x, y, z) / (2.0 * CURL_EPSILON)
}

fn curl_from<F: Fn(Vec3) -> f32>(noise: F, p: Vec3) -> Option<Vec3> {
    let a = gradient(&noise, p).try_normalize()?;
    let b = gradient(&noise, p + CURL_DECORRELATION_OFFSET).try_normalize()?;
    let c = a.cross(b);
    if c.length_squared() < DEGENERATE_THRESHOLD * DEGENERATE_THRESHOLD {
        return None;
    }
    Some(c.normalize())
}

/// 3D 旋度噪声
///
/// 两个梯度近乎平行或为零时返回 `None`，不会产生 NaN。
pub fn try_curl3(p: Vec3) -> Option<Vec3> {
    curl_from(simplex3, p)
}

/// 4D 旋度噪声，时间坐标在六次采样中保持不变
pub fn try_curl4(p: Vec3, time: f32) -> Option<Vec3> {
    curl_from(|q: Vec3| simplex4(q.extend(time)), p)
}

/// [`try_curl3`] 的退化情况返回零向量
pub fn curl3(p: Vec3) -> Vec3 {
    try_curl3(p).unwrap_or(Vec3::ZERO)
}

/// [`try_curl4`] 的退化情况返回零向量（即本帧没有湍流）
pub fn curl4(p: Vec3, time: f32) -> Vec3 {
    try_curl4(p, time).unwrap_or(Vec3::ZERO)
}
