// gpu/buffers.rs -- Device memory for channel planes, two ways.
//
// RESPONSIBILITIES
// 1. `ScopedPlanes` -- borrows the three host planes, uploads them on
//    creation, and guarantees a host write-back when the value leaves
//    scope. Kernel results are NOT visible in the host planes between
//    dispatch and scope exit; `sync_back()` is the explicit (and fallible)
//    way to end the scope.
// 2. `DeviceArray` -- one explicitly allocated device buffer with explicit
//    host-to-device and device-to-host copies. The device allocation is
//    released when the value drops, so no exit path (early return, `?`,
//    panic unwind) can leak it.
// 3. Word packing -- WGSL storage buffers cannot address single bytes, so
//    planes travel as little-endian u32 words, four samples per word,
//    zero-padded up to a word boundary. The padding never reaches the host
//    planes: uploads extend, readbacks take only the real length.
//
// A u32 word in buffer memory is byte-identical to four consecutive plane
// bytes (little-endian), so packing is a plain copy plus padding and
// unpacking is a truncating copy.

use wgpu::util::DeviceExt;

use crate::gpu::device::{GpuDevice, GpuError};
use crate::planes::PlanarImage;

/// Samples per storage word.
const WORD_BYTES: usize = 4;

/// Plane length rounded up to a whole number of storage words, in bytes.
#[inline]
pub(crate) fn padded_len(n: usize) -> usize {
    (n + WORD_BYTES - 1) / WORD_BYTES * WORD_BYTES
}

/// Number of u32 words covering `n` samples.
#[inline]
pub(crate) fn word_count(n: usize) -> u32 {
    ((n + WORD_BYTES - 1) / WORD_BYTES) as u32
}

/// Copy a plane into a word-aligned byte vector, zero-padding the tail.
pub(crate) fn pack_plane(plane: &[u8]) -> Vec<u8> {
    let mut out = plane.to_vec();
    out.resize(padded_len(plane.len()), 0);
    out
}

/// Request a read-mapping of `slice` and block until the GPU timeline
/// reaches it. This is the single blocking point of every strategy: the
/// poll waits for all previously submitted work (kernel included) before
/// the map callback can fire.
fn block_on_map(gpu: &GpuDevice, slice: wgpu::BufferSlice<'_>) -> Result<(), GpuError> {
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |r| {
        let _ = tx.send(r);
    });
    gpu.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .expect("readback map callback never fired")
        .map_err(GpuError::Readback)
}

// ---------------------------------------------------------------------------
// ScopedPlanes
// ---------------------------------------------------------------------------

/// The three channel planes resident on the device for the lifetime of one
/// scope, with write-back to the borrowed host planes guaranteed at scope
/// end.
///
/// # Contract
/// Between `bind()` and the end of the scope, the host planes hold stale
/// (pre-kernel) data; the device buffers are the authority. Dropping the
/// value performs the write-back unconditionally. Prefer consuming the
/// value with [`ScopedPlanes::sync_back`], which performs the same
/// write-back but surfaces failures as `Err` instead of a panic.
pub struct ScopedPlanes<'a> {
    gpu: &'a GpuDevice,
    host: &'a mut PlanarImage,
    buf_r: wgpu::Buffer,
    buf_g: wgpu::Buffer,
    buf_b: wgpu::Buffer,
    padded: usize,
    n_words: u32,
    synced: bool,
}

impl<'a> ScopedPlanes<'a> {
    /// Upload the host planes into three device storage buffers.
    ///
    /// The upload is staged on the queue; it is ordered before any later
    /// submission, so a kernel dispatched afterwards sees the data.
    pub fn bind(gpu: &'a GpuDevice, host: &'a mut PlanarImage) -> Self {
        let n = host.pixel_count();
        let padded = padded_len(n);
        let n_words = word_count(n);

        let make = |label: &str, plane: &[u8]| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents: &pack_plane(plane),
                    usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
                })
        };
        let buf_r = make("ScopedPlanes R", host.r());
        let buf_g = make("ScopedPlanes G", host.g());
        let buf_b = make("ScopedPlanes B", host.b());

        ScopedPlanes {
            gpu,
            host,
            buf_r,
            buf_g,
            buf_b,
            padded,
            n_words,
            synced: false,
        }
    }

    /// The device buffers in (R, G, B) order, for bind-group creation.
    pub fn buffers(&self) -> [&wgpu::Buffer; 3] {
        [&self.buf_r, &self.buf_g, &self.buf_b]
    }

    #[inline]
    pub fn n_words(&self) -> u32 {
        self.n_words
    }

    /// End the scope explicitly: copy device results into the host planes
    /// and consume the value. After this returns `Ok`, the host planes
    /// hold the kernel's output.
    pub fn sync_back(mut self) -> Result<(), GpuError> {
        self.write_back()?;
        self.synced = true;
        Ok(())
    }

    fn write_back(&mut self) -> Result<(), GpuError> {
        let padded = self.padded as u64;
        let readback = self.gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("ScopedPlanes readback"),
            size: 3 * padded,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("ScopedPlanes write-back"),
            });
        encoder.copy_buffer_to_buffer(&self.buf_r, 0, &readback, 0, padded);
        encoder.copy_buffer_to_buffer(&self.buf_g, 0, &readback, padded, padded);
        encoder.copy_buffer_to_buffer(&self.buf_b, 0, &readback, 2 * padded, padded);
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = readback.slice(..);
        block_on_map(self.gpu, slice)?;

        let mapped = slice.get_mapped_range();
        let n = self.host.pixel_count();
        let stride = self.padded;
        let (r, g, b) = self.host.planes_mut();
        r.copy_from_slice(&mapped[0..n]);
        g.copy_from_slice(&mapped[stride..stride + n]);
        b.copy_from_slice(&mapped[2 * stride..2 * stride + n]);
        drop(mapped);
        readback.unmap();
        Ok(())
    }
}

impl Drop for ScopedPlanes<'_> {
    fn drop(&mut self) {
        if !self.synced {
            // Last-resort write-back. A failure here is fatal by contract
            // (the results can never become host-visible); callers that
            // want an Err use sync_back() instead of dropping.
            self.write_back().expect("scoped plane write-back failed");
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceArray
// ---------------------------------------------------------------------------

/// One explicitly managed device-resident array of `u8` samples.
///
/// Nothing moves implicitly: `write_from` copies host data in,
/// `read_into` copies device data out and blocks until the copy (and all
/// queued work before it) has finished. The underlying allocation is
/// released when the value drops, which covers every exit path including
/// `?` returns from a failed copy.
pub struct DeviceArray {
    buf: wgpu::Buffer,
    len: usize,
    padded: usize,
}

impl DeviceArray {
    /// Allocate device memory for `len` samples (rounded up to a word).
    pub fn alloc(gpu: &GpuDevice, label: &str, len: usize) -> Self {
        let padded = padded_len(len);
        let buf = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: padded as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        DeviceArray { buf, len, padded }
    }

    /// Queue a host-to-device copy of `src`. Ordered before any later
    /// queue submission, so a kernel dispatched afterwards sees the data.
    ///
    /// # Panics
    /// Panics if `src.len()` differs from the allocated length.
    pub fn write_from(&self, gpu: &GpuDevice, src: &[u8]) {
        assert_eq!(
            src.len(),
            self.len,
            "host slice length ({}) must equal device array length ({})",
            src.len(),
            self.len,
        );
        gpu.queue.write_buffer(&self.buf, 0, &pack_plane(src));
    }

    /// Copy the device contents back into `dst`, blocking until complete.
    ///
    /// # Panics
    /// Panics if `dst.len()` differs from the allocated length.
    pub fn read_into(&self, gpu: &GpuDevice, dst: &mut [u8]) -> Result<(), GpuError> {
        assert_eq!(
            dst.len(),
            self.len,
            "host slice length ({}) must equal device array length ({})",
            dst.len(),
            self.len,
        );
        let staging = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("DeviceArray readback"),
            size: self.padded as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("DeviceArray read_into"),
            });
        encoder.copy_buffer_to_buffer(&self.buf, 0, &staging, 0, self.padded as u64);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        block_on_map(gpu, slice)?;

        let mapped = slice.get_mapped_range();
        dst.copy_from_slice(&mapped[..self.len]);
        drop(mapped);
        staging.unmap();
        Ok(())
    }

    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buf
    }

    #[inline]
    pub fn n_words(&self) -> u32 {
        word_count(self.len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
