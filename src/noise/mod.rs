//! 程序化噪声
//!
//! - [`simplex`]: 3D / 4D 单纯形梯度噪声
//! - [`curl`]: 基于噪声梯度叉积的旋度场，用作湍流力

pub mod curl;
pub mod simplex;

pub use curl::{curl3, curl4, try_curl3, try_curl4, CURL_EPSILON};
pub use simplex::{simplex3, simplex4};
