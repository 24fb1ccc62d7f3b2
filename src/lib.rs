//! # Particle Flow
//!
//! GPU-resident particle simulation driven by curl-noise turbulence.
//!
//! ## Features
//!
//! - **Procedural Noise**: 3D / 4D simplex noise and a curl field built from two decorrelated noise gradients
//! - **Lifecycle Kernel**: per-slot integrate → age → respawn, with respawns spread along the emitter's last-frame path
//! - **Backends**: wgpu compute shader or a rayon CPU pool, both running the same per-slot kernel
//! - **Render Feedback**: scale envelope, sparkle, colour gradient and alpha derived from life
//! - **Configuration**: TOML/JSON files and environment overrides
//!
//! ## Frame Loop
//!
//! ```no_run
//! use glam::Vec3;
//! use particle_flow::config::ParticleFlowConfig;
//! use particle_flow::simulation::FrameInput;
//! use particle_flow::system::ParticleSystem;
//!
//! # fn main() -> Result<(), particle_flow::core::ParticleError> {
//! let config = ParticleFlowConfig::load_or_default();
//! particle_flow::core::init_logging(&config.logging);
//!
//! let mut system = ParticleSystem::new(&config)?;
//! for frame in 0..600 {
//!     let time = frame as f32 / 60.0;
//!     system.update(FrameInput {
//!         delta_time: 1.0 / 60.0,
//!         time,
//!         emitter_position: Vec3::new(time.sin(), 1.0, time.cos()),
//!     })?;
//!     let _attributes = system.project()?;
//! }
//! system.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`noise`]: simplex noise and curl field
//! - [`simulation`]: emitter state, slot layout and the lifecycle kernel
//! - [`backend`]: CPU and GPU compute backends
//! - [`render`]: render-feedback projection
//! - [`system`]: particle system façade
//! - [`config`]: configuration
//! - [`core`]: errors, logging, macros

/// Errors, logging and shared macros
#[macro_use]
pub mod core;
/// Configuration system
pub mod config;
/// Procedural noise
pub mod noise;
/// Particle simulation core
pub mod simulation;
/// Compute backends
pub mod backend;
/// Render-feedback projection
pub mod render;
/// Particle system façade
pub mod system;

pub use crate::core::error::{ParticleError, ParticleResult};
pub use system::{ParticleSystem, ParticleSystemStats};
