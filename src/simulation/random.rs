//! 确定性的槽位随机数
//!
//! 内核中的所有随机量都由 (槽位索引, 帧种子, 盐) 哈希得到，
//! 不读取任何全局 RNG 状态，因此整个更新是 (状态, uniform) 的纯函数。

/// 重生方向 X 分量
pub const SALT_DIRECTION_X: u32 = 0x68e3_1da4;
/// 重生方向 Y 分量
pub const SALT_DIRECTION_Y: u32 = 0xb529_7a4d;
/// 重生方向 Z 分量
pub const SALT_DIRECTION_Z: u32 = 0x1b56_c4e9;
/// 发射器路径插值权重
pub const SALT_PATH_MIX: u32 = 0x7f4a_7c15;
/// 初始化时的错开生命
pub const SALT_INITIAL_LIFE: u32 = 0x2c1b_3c6d;
/// 闪烁窗口偏移
pub const SALT_SPARKLE: u32 = 0x9e37_79b9;

/// PCG 整数哈希
#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// 返回 [0, 1) 的均匀值
///
/// 只取高 24 位，保证转换为 f32 时不会舍入到 1.0。
#[inline]
pub fn hash01(index: u32, seed: u32, salt: u32) -> f32 {
    let h = pcg_hash(index ^ pcg_hash(seed.wrapping_add(salt)));
    (h >> 8) as f32 / 16_777_216.0
}

/// 第 `frame` 帧的种子
#[inline]
pub fn frame_seed(base_seed: u32, frame: u64) -> u32 {
    let folded = (frame as u32) ^ ((frame >> 32) as u32);
    pcg_hash(base_seed ^ pcg_hash(folded))
}
