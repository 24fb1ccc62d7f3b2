//! CPU 计算后端
//!
//! 在独立的 rayon 线程池中按槽位并行执行内核。

use super::SimulationBackend;
use crate::core::error::{ParticleError, ParticleResult};
use crate::simulation::{initialize_slot, update_slot, GpuParticle, SimulationUniforms};
use rayon::prelude::*;

/// CPU 后端
pub struct CpuBackend {
    pool: rayon::ThreadPool,
    worker_threads: usize,
    particles: Option<Vec<GpuParticle>>,
}

impl CpuBackend {
    /// 创建后端（尚未分配粒子）
    pub fn new(worker_threads: usize) -> ParticleResult<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads)
            .thread_name(|i| format!("particle-worker-{}", i))
            .build()
            .map_err(|e| ParticleError::WorkerPool(e.to_string()))?;

        Ok(Self {
            pool,
            worker_threads,
            particles: None,
        })
    }

    /// 工作线程数
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    fn particles_mut(&mut self) -> ParticleResult<&mut Vec<GpuParticle>> {
        self.particles.as_mut().ok_or(ParticleError::Disposed)
    }
}

impl SimulationBackend for CpuBackend {
    fn label(&self) -> &'static str {
        "cpu"
    }

    fn capacity(&self) -> u32 {
        self.particles.as_ref().map_or(0, |p| p.len() as u32)
    }

    fn allocate(&mut self, count: u32) -> ParticleResult<()> {
        self.validate_count(count)?;
        self.release();

        let mut particles = Vec::new();
        particles
            .try_reserve_exact(count as usize)
            .map_err(|e| ParticleError::BufferAllocation(e.to_string()))?;
        particles.resize(count as usize, GpuParticle::default());
        self.particles = Some(particles);
        tracing::info!(target: "particles", count, threads = self.worker_threads, "CPU particle pool allocated");
        Ok(())
    }

    fn initialize(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()> {
        let seed = uniforms.frame_seed;
        let pool = &self.pool;
        let particles = self.particles.as_mut().ok_or(ParticleError::Disposed)?;
        pool.install(|| {
            particles
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, particle)| *particle = initialize_slot(index as u32, seed));
        });
        Ok(())
    }

    fn dispatch(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()> {
        let pool = &self.pool;
        let particles = self.particles.as_mut().ok_or(ParticleError::Disposed)?;
        pool.install(|| {
            particles
                .par_iter_mut()
                .enumerate()
                .for_each(|(index, particle)| update_slot(index as u32, particle, uniforms));
        });
        Ok(())
    }

    fn read_particles(&self) -> ParticleResult<Vec<GpuParticle>> {
        self.particles.clone().ok_or(ParticleError::Disposed)
    }

    fn write_particles(&mut self, particles: &[GpuParticle]) -> ParticleResult<()> {
        let slots = self.particles_mut()?;
        if slots.len() != particles.len() {
            return Err(ParticleError::InvalidParticleCount(particles.len() as u32));
        }
        slots.copy_from_slice(particles);
        Ok(())
    }

    fn release(&mut self) {
        if self.particles.take().is_some() {
            tracing::info!(target: "particles", "CPU particle pool released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationParams;
    use crate::simulation::{EmitterState, SENTINEL_POSITION};
    use glam::Vec3;

    fn uniforms(count: u32) -> SimulationUniforms {
        SimulationUniforms::new(
            &SimulationParams::default(),
            &EmitterState::new(Vec3::ZERO),
            0.016,
            0.0,
            42,
            count,
        )
    }

    #[test]
    fn test_allocate_and_initialize() {
        let mut backend = CpuBackend::new(2).unwrap();
        backend.allocate(16).unwrap();
        backend.initialize(&uniforms(16)).unwrap();

        let particles = backend.read_particles().unwrap();
        assert_eq!(particles.len(), 16);
        assert!(particles.iter().all(|p| p.position() == SENTINEL_POSITION));
        assert!(particles.iter().all(|p| (0.0..1.0).contains(&p.life)));
    }

    #[test]
    fn test_zero_count_rejected() {
        let mut backend = CpuBackend::new(1).unwrap();
        assert!(matches!(
            backend.allocate(0),
            Err(ParticleError::InvalidParticleCount(0))
        ));
    }

    #[test]
    fn test_rejected_count_keeps_pool() {
        let mut backend = CpuBackend::new(1).unwrap();
        backend.allocate(8).unwrap();
        assert!(backend.allocate(0).is_err());
        assert_eq!(backend.capacity(), 8);
        assert_eq!(backend.read_particles().unwrap().len(), 8);
    }

    #[test]
    fn test_parallel_matches_serial() {
        let u = uniforms(512);
        let mut backend = CpuBackend::new(4).unwrap();
        backend.allocate(512).unwrap();
        backend.initialize(&u).unwrap();
        backend.dispatch(&u).unwrap();

        let mut serial: Vec<GpuParticle> = (0..512).map(|i| initialize_slot(i, 42)).collect();
        for (i, p) in serial.iter_mut().enumerate() {
            update_slot(i as u32, p, &u);
        }
        assert_eq!(backend.read_particles().unwrap(), serial);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut backend = CpuBackend::new(1).unwrap();
        backend.allocate(4).unwrap();
        backend.release();
        backend.release();
        assert_eq!(backend.capacity(), 0);
        assert!(matches!(
            backend.dispatch(&uniforms(4)),
            Err(ParticleError::Disposed)
        ));
    }
}
