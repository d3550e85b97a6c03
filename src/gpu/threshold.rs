// gpu/threshold.rs -- The binarization kernel and its execution strategies.
//
// One WGSL module, two entry points:
//   binarize_words  -- data-parallel, one invocation per packed word
//   binarize_serial -- one invocation looping over every word in order
//
// and three ways to run it, selected by `Strategy`:
//   ParallelScoped   -- parallel kernel over `ScopedPlanes` (write-back to
//                       the host planes at scope end)
//   ParallelExplicit -- parallel kernel over `DeviceArray`s (explicit
//                       copies in and out, release on drop)
//   SequentialScoped -- serial kernel over `ScopedPlanes`
//
// All three produce byte-identical host planes; the CPU reference in
// `crate::threshold` is the authority they are tested against.

use std::fmt;
use std::str::FromStr;

use wgpu::util::DeviceExt;

use crate::gpu::buffers::{word_count, DeviceArray, ScopedPlanes};
use crate::gpu::device::{GpuDevice, GpuError};
use crate::planes::PlanarImage;

// ---------------------------------------------------------------------------
// Uniform params (must match WGSL struct Params exactly)
// ---------------------------------------------------------------------------

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct Params {
    n_words: u32,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// How the kernel executes and how device memory is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Data-parallel kernel; scoped buffers with write-back at scope end.
    ParallelScoped,
    /// Data-parallel kernel; explicit device arrays, explicit copies.
    ParallelExplicit,
    /// Single sequential kernel invocation; scoped buffers.
    SequentialScoped,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::ParallelScoped,
        Strategy::ParallelExplicit,
        Strategy::SequentialScoped,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::ParallelScoped => "parallel-scoped",
            Strategy::ParallelExplicit => "parallel-explicit",
            Strategy::SequentialScoped => "sequential",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognized strategy name.
#[derive(Debug)]
pub struct ParseStrategyError {
    input: String,
}

impl fmt::Display for ParseStrategyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown strategy '{}' (expected parallel-scoped, parallel-explicit or sequential)",
            self.input
        )
    }
}

impl std::error::Error for ParseStrategyError {}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parallel-scoped" | "parallel" => Ok(Strategy::ParallelScoped),
            "parallel-explicit" | "explicit" => Ok(Strategy::ParallelExplicit),
            "sequential" | "serial" => Ok(Strategy::SequentialScoped),
            other => Err(ParseStrategyError { input: other.to_string() }),
        }
    }
}

// ---------------------------------------------------------------------------
// ThresholdKernel
// ---------------------------------------------------------------------------

/// The compiled binarization pipelines.
///
/// Create once per `GpuDevice`; `run` can be called any number of times
/// with any strategy.
pub struct ThresholdKernel {
    pipeline_parallel: wgpu::ComputePipeline,
    pipeline_serial: wgpu::ComputePipeline,
    bgl: wgpu::BindGroupLayout,
}

impl ThresholdKernel {
    pub fn new(gpu: &GpuDevice) -> Self {
        let shader_template = include_str!("../shaders/threshold.wgsl");
        let shader_src = shader_template.replace("{{WG_X}}", &gpu.workgroup_size.to_string());

        let shader = gpu
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("threshold.wgsl"),
                source: wgpu::ShaderSource::Wgsl(shader_src.into()),
            });

        let storage_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only: false },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let bgl = gpu
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Threshold BGL"),
                entries: &[
                    // 0..=2 -- the three channel planes (storage read_write)
                    storage_entry(0),
                    storage_entry(1),
                    storage_entry(2),
                    // 3 -- params uniform
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = gpu
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Threshold pipeline layout"),
                bind_group_layouts: &[&bgl],
                push_constant_ranges: &[],
            });

        let make_pipeline = |entry: &str| {
            gpu.device
                .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(entry),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point: entry,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    cache: None,
                })
        };

        ThresholdKernel {
            pipeline_parallel: make_pipeline("binarize_words"),
            pipeline_serial: make_pipeline("binarize_serial"),
            bgl,
        }
    }

    /// Binarize `img` in place using the given strategy.
    ///
    /// On return the host planes hold the kernel's output regardless of
    /// strategy; the strategies differ only in when and how the results
    /// became host-visible.
    pub fn run(
        &self,
        gpu: &GpuDevice,
        img: &mut PlanarImage,
        strategy: Strategy,
    ) -> Result<(), GpuError> {
        if img.pixel_count() == 0 {
            return Ok(());
        }
        match strategy {
            Strategy::ParallelScoped => self.run_scoped(gpu, img, false),
            Strategy::SequentialScoped => self.run_scoped(gpu, img, true),
            Strategy::ParallelExplicit => self.run_explicit(gpu, img),
        }
    }

    /// Scoped-buffer path: upload, dispatch, wait, and let the scope end
    /// perform the write-back. Until `sync_back` completes the host planes
    /// hold stale data even though the kernel has finished.
    fn run_scoped(
        &self,
        gpu: &GpuDevice,
        img: &mut PlanarImage,
        serial: bool,
    ) -> Result<(), GpuError> {
        let n_words = word_count(img.pixel_count());
        if !serial {
            gpu.check_dispatch(n_words)?;
        }
        let planes = ScopedPlanes::bind(gpu, img);
        let [r, g, b] = planes.buffers();
        self.dispatch(gpu, r, g, b, n_words, serial);
        planes.sync_back()
    }

    /// Explicit-memory path: allocate, copy in, dispatch, wait, copy out.
    /// The arrays release their device memory when they drop, on every
    /// path out of this function.
    fn run_explicit(&self, gpu: &GpuDevice, img: &mut PlanarImage) -> Result<(), GpuError> {
        let n = img.pixel_count();
        let n_words = word_count(n);
        gpu.check_dispatch(n_words)?;

        let dev_r = DeviceArray::alloc(gpu, "threshold R", n);
        let dev_g = DeviceArray::alloc(gpu, "threshold G", n);
        let dev_b = DeviceArray::alloc(gpu, "threshold B", n);
        dev_r.write_from(gpu, img.r());
        dev_g.write_from(gpu, img.g());
        dev_b.write_from(gpu, img.b());

        self.dispatch(gpu, dev_r.buffer(), dev_g.buffer(), dev_b.buffer(), n_words, false);

        let (r, g, b) = img.planes_mut();
        dev_r.read_into(gpu, r)?;
        dev_g.read_into(gpu, g)?;
        dev_b.read_into(gpu, b)?;
        Ok(())
    }

    /// Encode one kernel invocation over the given plane buffers, submit
    /// it, and block until the device has finished. Host visibility of the
    /// results is the memory strategy's business, not this function's.
    fn dispatch(
        &self,
        gpu: &GpuDevice,
        buf_r: &wgpu::Buffer,
        buf_g: &wgpu::Buffer,
        buf_b: &wgpu::Buffer,
        n_words: u32,
        serial: bool,
    ) {
        let params = Params { n_words };
        let params_buf = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Threshold params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Threshold BG"),
            layout: &self.bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: buf_r.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: buf_g.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: buf_b.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: params_buf.as_entire_binding() },
            ],
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Threshold dispatch"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(if serial { "binarize_serial" } else { "binarize_words" }),
                timestamp_writes: None,
            });
            pass.set_pipeline(if serial {
                &self.pipeline_serial
            } else {
                &self.pipeline_parallel
            });
            pass.set_bind_group(0, &bind_group, &[]);
            if serial {
                pass.dispatch_workgroups(1, 1, 1);
            } else {
                pass.dispatch_workgroups(gpu.dispatch_groups(n_words), 1, 1);
            }
        }
        gpu.queue.submit(std::iter::once(encoder.finish()));

        // The wait: block the host until the submitted job completes.
        gpu.device.poll(wgpu::Maintain::Wait);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
