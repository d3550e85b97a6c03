// gpu/device.rs -- wgpu device abstraction.
//
// Responsibilities:
//   - Enumerate Vulkan adapters and select the first non-CPU one.
//   - Expose `AdapterInfo` so the pipeline can report which device it is
//     running on.
//   - Hold the validated 1-D workgroup size used when creating the compute
//     pipeline, and compute dispatch sizes from it.
//
// ADAPTER SELECTION:
// wgpu's default `request_adapter` uses power preference heuristics that
// may grab llvmpipe/softpipe on WSL2 (where the software renderer appears
// as a valid Vulkan device). We enumerate explicitly and prefer real
// hardware, taking a software renderer only as a last resort.
//
// WORKGROUP SIZE:
// The threshold kernel is a flat 1-D dispatch over packed words, so a
// single dimension suffices. The size is validated against the device's
// invocation limit before any pipeline is built; the WGSL source is
// specialised by string substitution at pipeline creation time.

use std::fmt;

/// Default invocations per workgroup for the 1-D threshold dispatch.
/// 256 divides evenly into warps/wavefronts on desktop GPUs and sits
/// within wgpu's default invocation limit.
const DEFAULT_WORKGROUP_SIZE: u32 = 256;

/// Cached adapter information for logging and debugging.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    pub name: String,
    pub vendor: u32,
    pub device: u32,
    pub device_type: wgpu::DeviceType,
    pub backend: wgpu::Backend,
}

impl fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:?}, {:?})",
            self.name, self.backend, self.device_type
        )
    }
}

/// The core GPU context: adapter, device, queue.
///
/// Create once per run via `GpuDevice::new()`; it is expensive to create
/// (Vulkan instance + device initialization) and every kernel dispatch
/// borrows it.
///
/// # Field drop order
/// Rust drops struct fields in declaration order (top to bottom).
/// `_instance` is declared last so the `wgpu::Instance` (and its internal
/// Vulkan instance handle) outlives `device` and `queue`. This prevents a
/// crash in dzn (the D3D12-to-Vulkan layer on WSL2) that occurs when the
/// Vulkan instance is destroyed while device-level objects still hold
/// back-references to it.
pub struct GpuDevice {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: AdapterInfo,
    pub workgroup_size: u32,
    limits: wgpu::Limits,
    /// Keeps the `wgpu::Instance` alive until `device` and `queue` are
    /// dropped. Never accessed directly.
    _instance: wgpu::Instance,
}

impl GpuDevice {
    /// Create a `GpuDevice` using the first non-CPU Vulkan adapter found.
    ///
    /// # Errors
    /// Returns `Err` if no adapter is found or the device request fails.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self, GpuError> {
        // Request only Vulkan. On WSL2, Microsoft's dzn (D3D12-to-Vulkan)
        // declares itself non-conformant and wgpu drops it by default;
        // ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER keeps it enumerable so it
        // can be selected over llvmpipe. Compute-only dispatches do not
        // touch any conformance-required rendering behaviour.
        let flags = if cfg!(debug_assertions) {
            // Validation layer in debug builds for shader error feedback.
            wgpu::InstanceFlags::VALIDATION
                | wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        } else {
            wgpu::InstanceFlags::ALLOW_UNDERLYING_NONCOMPLIANT_ADAPTER
        };

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::VULKAN,
            flags,
            ..Default::default()
        });

        // Enumerate all Vulkan adapters:
        //   DiscreteGpu   -- dedicated NVIDIA/AMD card      <- ideal
        //   IntegratedGpu -- iGPU (AMD APU, Intel)          <- good
        //   VirtualGpu    -- VM pass-through                <- acceptable
        //   Other         -- dzn (D3D12->Vulkan) on WSL2    <- acceptable
        //   Cpu           -- llvmpipe / software rasterizer <- last resort
        let all_adapters: Vec<wgpu::Adapter> = instance
            .enumerate_adapters(wgpu::Backends::VULKAN)
            .into_iter()
            .collect();

        if all_adapters.is_empty() {
            return Err(GpuError::NoSuitableAdapter);
        }

        for a in &all_adapters {
            let info = a.get_info();
            eprintln!(
                "[monobit] Vulkan adapter: {} ({:?}, {:?})",
                info.name, info.backend, info.device_type
            );
        }

        // Tier 1: real or passthrough hardware. Tier 2: anything at all,
        // software renderers included (the adapter name is logged above so
        // the user knows what was chosen).
        let adapter = all_adapters
            .into_iter()
            .find(|a| {
                matches!(
                    a.get_info().device_type,
                    wgpu::DeviceType::DiscreteGpu
                        | wgpu::DeviceType::IntegratedGpu
                        | wgpu::DeviceType::VirtualGpu
                        | wgpu::DeviceType::Other
                )
            })
            .or_else(|| {
                instance
                    .enumerate_adapters(wgpu::Backends::VULKAN)
                    .into_iter()
                    .next()
            })
            .ok_or(GpuError::NoSuitableAdapter)?;

        let raw_info = adapter.get_info();
        let adapter_info = AdapterInfo {
            name: raw_info.name.clone(),
            vendor: raw_info.vendor,
            device: raw_info.device,
            device_type: raw_info.device_type,
            backend: raw_info.backend,
        };

        let limits = wgpu::Limits::default();

        let (device, queue): (wgpu::Device, wgpu::Queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("monobit"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(GpuError::DeviceRequest)?;

        Ok(GpuDevice {
            device,
            queue,
            adapter_info,
            workgroup_size: DEFAULT_WORKGROUP_SIZE,
            limits,
            _instance: instance,
        })
    }

    /// Override the default workgroup size, validating against the
    /// device's invocation limit.
    pub fn set_workgroup_size(&mut self, size: u32) -> Result<(), GpuError> {
        let max = self.limits.max_compute_invocations_per_workgroup;
        if size == 0 || size > max {
            return Err(GpuError::WorkgroupTooLarge { size, max });
        }
        self.workgroup_size = size;
        Ok(())
    }

    /// Number of workgroups needed to cover `n_items` with the active
    /// workgroup size (ceiling division). The shader must guard against
    /// out-of-bounds global IDs in the final group.
    pub fn dispatch_groups(&self, n_items: u32) -> u32 {
        (n_items + self.workgroup_size - 1) / self.workgroup_size
    }

    /// Validate that a 1-D dispatch of `n_items` fits within the device's
    /// per-dimension workgroup-count limit, returning the group count.
    pub fn check_dispatch(&self, n_items: u32) -> Result<u32, GpuError> {
        let groups = self.dispatch_groups(n_items);
        let max = self.limits.max_compute_workgroups_per_dimension;
        if groups > max {
            return Err(GpuError::DispatchTooLarge { groups, max });
        }
        Ok(groups)
    }
}

impl fmt::Display for GpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "GpuDevice {{ adapter: {}, workgroup: {} }}",
            self.adapter_info, self.workgroup_size
        )
    }
}

// ============================================================
// Error type
// ============================================================

/// Errors from GPU initialization, configuration and execution.
#[derive(Debug)]
pub enum GpuError {
    /// No Vulkan adapter found at all. On WSL2: check that Vulkan is
    /// installed and `vulkaninfo` lists a device.
    NoSuitableAdapter,
    /// wgpu device request failed (driver issue, unsupported limits, ...).
    DeviceRequest(wgpu::RequestDeviceError),
    /// Requested workgroup size exceeds the device's invocation limit.
    WorkgroupTooLarge { size: u32, max: u32 },
    /// The image needs more workgroups than one dispatch dimension allows.
    DispatchTooLarge { groups: u32, max: u32 },
    /// Mapping a readback buffer failed; the kernel's results never became
    /// host-visible.
    Readback(wgpu::BufferAsyncError),
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::NoSuitableAdapter => write!(
                f,
                "no Vulkan adapter found. On WSL2: ensure Vulkan is installed \
                 and `vulkaninfo` lists a device."
            ),
            GpuError::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            GpuError::WorkgroupTooLarge { size, max } => write!(
                f,
                "workgroup size {size} outside the device limit of {max} invocations"
            ),
            GpuError::DispatchTooLarge { groups, max } => write!(
                f,
                "dispatch needs {groups} workgroups, device allows {max} per dimension"
            ),
            GpuError::Readback(e) => write!(f, "readback map failed: {e}"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::DeviceRequest(e) => Some(e),
            GpuError::Readback(e) => Some(e),
            _ => None,
        }
    }
}

// ============================================================
// Tests
// ============================================================
