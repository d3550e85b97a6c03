// gpu/mod.rs -- wgpu execution layer.
//
// The CPU implementation in `crate::threshold` is the authoritative
// reference; everything in this module exists to reproduce it on a compute
// device, byte for byte, under three memory/execution strategies.
//
//   device    -- adapter selection, device/queue, dispatch sizing
//   buffers   -- scoped (write-back-on-drop) and explicit device memory
//   threshold -- the kernel pipelines and strategy selection

pub mod buffers;
pub mod device;
pub mod threshold;
