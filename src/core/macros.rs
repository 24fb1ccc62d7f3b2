//! 核心宏定义
//!
//! 提供统一的宏来减少配置结构体的样板代码

/// 为结构体实现Default trait的宏
///
/// 使用示例:
/// ```rust
/// use particle_flow::impl_default;
///
/// struct Damping {
///     velocity: f32,
///     floor: f32,
/// }
///
/// impl_default!(Damping {
///     velocity: 0.01,
///     floor: 0.1,
/// });
///
/// assert_eq!(Damping::default().floor, 0.1);
/// ```
#[macro_export]
macro_rules! impl_default {
    ($struct_name:ident {
        $($field:ident: $value:expr),* $(,)?
    }) => {
        impl Default for $struct_name {
            fn default() -> Self {
                Self {
                    $($field: $value),*
                }
            }
        }
    };
}
