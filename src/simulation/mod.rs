//! 粒子模拟核心
//!
//! ## 帧流程
//!
//! ```text
//! host: emitter.set_position(p, dt)
//!        │
//!        ▼
//! SimulationUniforms::new(params, emitter, dt, time, frame_seed, count)
//!        │
//!        ▼
//! dispatch: update_slot(i) for i in 0..count   (并行，槽位之间无读写依赖)
//!        │
//!        ▼
//! host: emitter.commit()                        (上一帧值此时才前进)
//! ```

pub mod emitter;
pub mod kernel;
pub mod particle;
pub mod random;

pub use emitter::EmitterState;
pub use kernel::{initialize_slot, respawn, turbulence, update_slot, Respawn};
pub use particle::{FrameInput, GpuParticle, SimulationUniforms, SENTINEL_POSITION, TURBULENCE_OFFSET};
pub use random::{frame_seed, hash01, pcg_hash};
