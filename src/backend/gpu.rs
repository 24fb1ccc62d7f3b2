//! GPU 计算后端
//!
//! 一个存储缓冲区保存全部粒子槽，一个 uniform 缓冲区保存每帧参数，
//! `init_main` / `update_main` 两个计算入口共享同一个着色器模块。
//! 每次提交都同步等待完成：释放缓冲区前不会有仍在执行的调度。

use super::SimulationBackend;
use crate::core::error::{ParticleError, ParticleResult};
use crate::simulation::{GpuParticle, SimulationUniforms};
use std::sync::Arc;

const SHADER_SOURCE: &str = include_str!("shader_particles.wgsl");
const DEFAULT_WORKGROUP_LINE: &str = "const WORKGROUP_SIZE: u32 = 256u;";

/// wgpu 设备与队列
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// 请求无窗口的计算设备
    pub async fn new_headless() -> ParticleResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(ParticleError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Particle Compute Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| ParticleError::DeviceRequest(e.to_string()))?;

        tracing::info!(
            target: "particles::gpu",
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            "GPU compute device acquired"
        );

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// [`GpuContext::new_headless`] 的阻塞版本
    pub fn new_headless_blocking() -> ParticleResult<Self> {
        pollster::block_on(Self::new_headless())
    }
}

/// 设备限制允许的最大槽位数
///
/// 同时受单维工作组数量、存储缓冲区绑定大小和缓冲区大小限制。
fn max_slots(limits: &wgpu::Limits, workgroup_size: u32) -> u32 {
    let slot = std::mem::size_of::<GpuParticle>() as u64;
    let by_dispatch = limits.max_compute_workgroups_per_dimension as u64 * workgroup_size as u64;
    let by_binding = limits.max_storage_buffer_binding_size as u64 / slot;
    let by_buffer = limits.max_buffer_size / slot;
    by_dispatch
        .min(by_binding)
        .min(by_buffer)
        .min(u32::MAX as u64) as u32
}

/// 粒子池占用的 GPU 缓冲区
struct GpuBuffers {
    particle_buffer: wgpu::Buffer,
    staging_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    count: u32,
}

impl GpuBuffers {
    fn destroy(self) {
        self.particle_buffer.destroy();
        self.staging_buffer.destroy();
    }
}

/// GPU 后端
pub struct GpuBackend {
    context: Arc<GpuContext>,
    init_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    workgroup_size: u32,
    buffers: Option<GpuBuffers>,
}

impl GpuBackend {
    /// 编译着色器并创建管线（尚未分配粒子）
    pub fn new(context: Arc<GpuContext>, workgroup_size: u32) -> ParticleResult<Self> {
        let device = &context.device;

        let source = SHADER_SOURCE.replacen(
            DEFAULT_WORKGROUP_LINE,
            &format!("const WORKGROUP_SIZE: u32 = {}u;", workgroup_size),
            1,
        );

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Kernel Shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Particle Kernel BGL"),
            entries: &[
                // Uniform
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                // 粒子槽
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Particle Kernel Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let init_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Init Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "init_main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        let update_pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("Particle Update Pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "update_main",
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Simulation Uniforms"),
            size: std::mem::size_of::<SimulationUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(ParticleError::DeviceRequest(format!(
                "particle kernel pipeline creation failed: {}",
                error
            )));
        }

        Ok(Self {
            context,
            init_pipeline,
            update_pipeline,
            bind_group_layout,
            uniform_buffer,
            workgroup_size,
            buffers: None,
        })
    }

    /// 设备信息
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.context.adapter_info
    }

    /// 供渲染器直接绑定的粒子存储缓冲区
    pub fn particle_buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffers.as_ref().map(|b| &b.particle_buffer)
    }

    fn buffers(&self) -> ParticleResult<&GpuBuffers> {
        self.buffers.as_ref().ok_or(ParticleError::Disposed)
    }

    fn workgroup_count(&self, count: u32) -> u32 {
        count.div_ceil(self.workgroup_size)
    }

    /// 写入 uniform 并以单个计算通道执行入口，等待完成
    ///
    /// 验证错误在错误作用域中捕获：提交被拒绝时缓冲区内容保持上一帧的状态。
    fn run(&self, pipeline: &wgpu::ComputePipeline, uniforms: &SimulationUniforms, label: &str) -> ParticleResult<()> {
        let buffers = self.buffers()?;
        let device = &self.context.device;
        let queue = &self.context.queue;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(uniforms));

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some(label),
        });
        {
            let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            cpass.set_pipeline(pipeline);
            cpass.set_bind_group(0, &buffers.bind_group, &[]);
            cpass.dispatch_workgroups(self.workgroup_count(buffers.count), 1, 1);
        }

        let submission = queue.submit(std::iter::once(encoder.finish()));
        device.poll(wgpu::Maintain::WaitForSubmissionIndex(submission));

        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::error!(target: "particles::gpu", "{} rejected: {}", label, error);
            return Err(ParticleError::Dispatch(error.to_string()));
        }

        tracing::trace!(target: "particles::gpu", count = buffers.count, "{} completed", label);
        Ok(())
    }
}

impl SimulationBackend for GpuBackend {
    fn label(&self) -> &'static str {
        "gpu"
    }

    fn capacity(&self) -> u32 {
        self.buffers.as_ref().map_or(0, |b| b.count)
    }

    fn max_capacity(&self) -> u32 {
        max_slots(&self.context.device.limits(), self.workgroup_size)
    }

    fn allocate(&mut self, count: u32) -> ParticleResult<()> {
        self.validate_count(count)?;
        self.release();

        let device = &self.context.device;
        let size = std::mem::size_of::<GpuParticle>() as u64 * count as u64;

        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let particle_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Buffer"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::VERTEX,
            mapped_at_creation: false,
        });

        let staging_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Readback Buffer"),
            size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Particle Kernel BG"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: particle_buffer.as_entire_binding(),
                },
            ],
        });

        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(error) = validation.or(out_of_memory) {
            particle_buffer.destroy();
            staging_buffer.destroy();
            tracing::error!(target: "particles::gpu", count, "GPU particle buffer allocation failed: {}", error);
            return Err(ParticleError::BufferAllocation(error.to_string()));
        }

        self.buffers = Some(GpuBuffers {
            particle_buffer,
            staging_buffer,
            bind_group,
            count,
        });

        tracing::info!(target: "particles::gpu", count, bytes = size, "GPU particle buffers allocated");
        Ok(())
    }

    fn initialize(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()> {
        self.run(&self.init_pipeline, uniforms, "Particle Init Pass")
    }

    fn dispatch(&mut self, uniforms: &SimulationUniforms) -> ParticleResult<()> {
        self.run(&self.update_pipeline, uniforms, "Particle Update Pass")
    }

    fn read_particles(&self) -> ParticleResult<Vec<GpuParticle>> {
        let buffers = self.buffers()?;
        let device = &self.context.device;
        let size = std::mem::size_of::<GpuParticle>() as u64 * buffers.count as u64;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Particle Readback"),
        });
        encoder.copy_buffer_to_buffer(&buffers.particle_buffer, 0, &buffers.staging_buffer, 0, size);
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffers.staging_buffer.slice(..);
        let (sender, receiver) = futures::channel::oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);

        match pollster::block_on(receiver) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ParticleError::Readback(e.to_string())),
            Err(_) => return Err(ParticleError::Readback("map callback dropped".to_string())),
        }

        let particles = {
            let data = slice.get_mapped_range();
            bytemuck::cast_slice::<u8, GpuParticle>(&data).to_vec()
        };
        buffers.staging_buffer.unmap();

        Ok(particles)
    }

    fn write_particles(&mut self, particles: &[GpuParticle]) -> ParticleResult<()> {
        let buffers = self.buffers()?;
        if particles.len() != buffers.count as usize {
            return Err(ParticleError::InvalidParticleCount(particles.len() as u32));
        }
        self.context
            .queue
            .write_buffer(&buffers.particle_buffer, 0, bytemuck::cast_slice(particles));
        let submission = self.context.queue.submit(std::iter::empty());
        self.context
            .device
            .poll(wgpu::Maintain::WaitForSubmissionIndex(submission));
        Ok(())
    }

    fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            // 等待所有仍引用这些缓冲区的提交完成
            self.context.device.poll(wgpu::Maintain::Wait);
            buffers.destroy();
            tracing::info!(target: "particles::gpu", "GPU particle buffers released");
        }
    }
}

impl Drop for GpuBackend {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_line_present() {
        // 工作组大小通过替换这一行注入
        assert!(SHADER_SOURCE.contains(DEFAULT_WORKGROUP_LINE));
        assert!(SHADER_SOURCE.contains("fn init_main"));
        assert!(SHADER_SOURCE.contains("fn update_main"));
    }

    #[test]
    fn test_max_slots_default_limits() {
        let limits = wgpu::Limits::default();
        // 默认 128 MiB 绑定上限 / 32 字节
        assert_eq!(max_slots(&limits, 256), 4_194_304);
        // 小工作组时受调度维度限制
        assert_eq!(max_slots(&limits, 1), 65_535);
    }

    #[test]
    fn test_max_slots_buffer_limit() {
        let limits = wgpu::Limits {
            max_storage_buffer_binding_size: u32::MAX,
            max_buffer_size: 32 * 1000,
            ..wgpu::Limits::default()
        };
        assert_eq!(max_slots(&limits, 256), 1000);
    }

    #[test]
    fn test_shader_constants_match_cpu() {
        use crate::simulation::random::*;
        for (name, salt) in [
            ("SALT_DIRECTION_X", SALT_DIRECTION_X),
            ("SALT_DIRECTION_Y", SALT_DIRECTION_Y),
            ("SALT_DIRECTION_Z", SALT_DIRECTION_Z),
            ("SALT_PATH_MIX", SALT_PATH_MIX),
            ("SALT_INITIAL_LIFE", SALT_INITIAL_LIFE),
        ] {
            let line = format!("const {}: u32 = {:#010x}u;", name, salt);
            assert!(SHADER_SOURCE.contains(&line), "missing {}", line);
        }
    }
}
