//! 渲染接口
//!
//! 渲染管线本身（实例化、混合、材质）由宿主负责；
//! 这里只提供从模拟状态推导渲染属性的投影。

pub mod projection;

pub use projection::{project, project_slot, scale_envelope, sprite_alpha, RenderAttributes};
